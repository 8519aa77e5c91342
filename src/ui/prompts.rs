//! Interactive prompts with CI/non-interactive fallback

use super::context::UiContext;
use crate::error::{StorefrontError, StorefrontResult};

fn prompt_failed(e: impl std::fmt::Display) -> StorefrontError {
    StorefrontError::User(format!("Prompt failed: {}", e))
}

/// Run a blocking cliclack widget off the async runtime
async fn blocking<T, F>(prompt: F) -> StorefrontResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> std::io::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(prompt)
        .await
        .map_err(|e| StorefrontError::User(format!("Prompt task failed: {}", e)))?
        .map_err(prompt_failed)
}

/// Prompt for confirmation, returns default if non-interactive or auto-yes
pub async fn confirm(ctx: &UiContext, message: &str, default: bool) -> StorefrontResult<bool> {
    if ctx.auto_yes() {
        println!("  {} (auto-approved)", message);
        return Ok(true);
    }

    if !ctx.is_interactive() {
        return Ok(default);
    }

    let message = message.to_string();
    blocking(move || cliclack::confirm(&message).initial_value(default).interact()).await
}

/// Prompt for selection from a list of options.
/// Returns the first option if non-interactive.
pub async fn select<T: Clone + Send + Eq + 'static>(
    ctx: &UiContext,
    message: &str,
    options: &[(T, &str, &str)], // (value, label, hint)
) -> StorefrontResult<T> {
    let Some(first) = options.first() else {
        return Err(StorefrontError::Internal("select called without options".to_string()));
    };
    if !ctx.is_interactive() || ctx.auto_yes() {
        return Ok(first.0.clone());
    }

    let message = message.to_string();
    let items: Vec<(T, String, String)> = options
        .iter()
        .map(|(v, l, h)| (v.clone(), l.to_string(), h.to_string()))
        .collect();

    blocking(move || {
        let mut select = cliclack::select(&message);
        for (value, label, hint) in items {
            select = select.item(value, label, hint);
        }
        select.interact()
    })
    .await
}

/// Use `given` when present, otherwise ask for it.
///
/// Fails with `missing` when the value is absent and nobody can be asked.
pub async fn input(
    ctx: &UiContext,
    message: &str,
    given: Option<String>,
    missing: &str,
) -> StorefrontResult<String> {
    if let Some(value) = given.filter(|v| !v.trim().is_empty()) {
        return Ok(value);
    }
    if !ctx.is_interactive() {
        return Err(StorefrontError::User(missing.to_string()));
    }

    let message = message.to_string();
    let value: String = blocking(move || cliclack::input(&message).interact()).await?;
    if value.trim().is_empty() {
        return Err(StorefrontError::User(missing.to_string()));
    }
    Ok(value.trim().to_string())
}

/// Masked secret entry; never falls back to a default
pub async fn password(ctx: &UiContext, message: &str) -> StorefrontResult<String> {
    if !ctx.is_interactive() {
        return Err(StorefrontError::User(
            "Password required. Pass --password-stdin when not on a terminal".to_string(),
        ));
    }

    let message = message.to_string();
    blocking(move || cliclack::password(&message).mask('▪').interact()).await
}
