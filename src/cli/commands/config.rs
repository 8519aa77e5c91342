//! Config command - show or edit configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager, VALID_KEYS};
use crate::error::StorefrontResult;
use crate::ui::{self, UiContext};

pub async fn execute(args: ConfigArgs, manager: &ConfigManager, config: &Config) -> StorefrontResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
        Some(ConfigAction::Set { key, value }) => set_value(manager, &key, &value).await?,
    }
    Ok(())
}

fn show_config(config: &Config) -> StorefrontResult<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

async fn init_config(manager: &ConfigManager, force: bool) -> StorefrontResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if path.exists() && !force {
        ui::step_warn_hint(
            &ctx,
            &format!("Config already exists at {}", path.display()),
            "Use --force to overwrite",
        );
        return Ok(());
    }

    manager.save(&Config::default()).await?;
    ui::step_ok(&ctx, &format!("Configuration initialized at {}", path.display()));
    Ok(())
}

async fn set_value(manager: &ConfigManager, key: &str, value: &str) -> StorefrontResult<()> {
    let ctx = UiContext::detect();

    if !VALID_KEYS.contains(&key) {
        ui::step_warn_hint(
            &ctx,
            &format!("Unknown config key: {}", key),
            &format!("Valid keys: {}", VALID_KEYS.join(", ")),
        );
        return Ok(());
    }

    manager.set_value(key, value).await?;
    ui::step_ok(&ctx, &format!("Set {} = {}", key, value));
    Ok(())
}
