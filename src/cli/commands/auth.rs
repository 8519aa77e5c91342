//! Sign-in commands: login, register, logout, whoami

use super::signed_in;
use crate::api::models::UserProfile;
use crate::auth::{LoginCredentials, Registration};
use crate::cli::args::{FormatArgs, LoginArgs, OutputFormat, RegisterArgs};
use crate::error::{StorefrontError, StorefrontResult};
use crate::gateway::Gateway;
use crate::ui::{self, TaskSpinner, UiContext};
use std::io::BufRead;

/// First line of stdin, without its line ending
async fn password_from_stdin() -> StorefrontResult<String> {
    let line = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line).map(|_| line)
    })
    .await
    .map_err(|e| StorefrontError::Internal(format!("stdin task failed: {}", e)))?
    .map_err(|e| StorefrontError::io("reading password from stdin", e))?;

    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        return Err(StorefrontError::User("No password on stdin".to_string()));
    }
    Ok(password)
}

async fn read_password(ctx: &UiContext, from_stdin: bool, message: &str) -> StorefrontResult<String> {
    if from_stdin {
        password_from_stdin().await
    } else {
        ui::password(ctx, message).await
    }
}

fn welcome(ctx: &UiContext, user: &UserProfile) {
    ui::outro_success(ctx, &format!("Signed in as {}", user.display_name()));
}

pub async fn login(args: LoginArgs, gateway: &Gateway) -> StorefrontResult<()> {
    let ctx = UiContext::detect();
    ui::intro(&ctx, "Sign in");

    let email = ui::input(&ctx, "Email", args.email, "Email required. Pass --email").await?;
    let password = read_password(&ctx, args.password_stdin, "Password").await?;

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start("Signing in...");
    let result = gateway
        .auth()
        .login(&LoginCredentials::new(email, password))
        .await;
    match result {
        Ok(_) => spinner.clear(),
        Err(_) => spinner.stop_error("Sign in failed"),
    }

    let user = result?;
    welcome(&ctx, &user);
    Ok(())
}

pub async fn register(args: RegisterArgs, gateway: &Gateway) -> StorefrontResult<()> {
    let ctx = UiContext::detect();
    ui::intro(&ctx, "Create account");

    let email = ui::input(&ctx, "Email", args.email, "Email required. Pass --email").await?;
    let username = ui::input(
        &ctx,
        "Username",
        args.username,
        "Username required. Pass --username",
    )
    .await?;
    let password = read_password(&ctx, args.password_stdin, "Password").await?;
    let password_confirm = if args.password_stdin {
        password.clone()
    } else {
        ui::password(&ctx, "Confirm password").await?
    };
    if password != password_confirm {
        return Err(StorefrontError::User("Passwords do not match".to_string()));
    }

    let registration = Registration {
        email,
        username,
        password,
        password_confirm,
        first_name: args.first_name.unwrap_or_default(),
        last_name: args.last_name.unwrap_or_default(),
    };

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start("Creating account...");
    let result = gateway.auth().register(&registration).await;
    spinner.clear();

    let user = result?;
    welcome(&ctx, &user);
    Ok(())
}

pub async fn logout(gateway: &Gateway) -> StorefrontResult<()> {
    let ctx = UiContext::detect();
    let was_signed_in = gateway.session().is_present();
    gateway.auth().logout().await?;

    if was_signed_in {
        ui::step_ok(&ctx, "Signed out");
    } else {
        ui::step_info(&ctx, "Not signed in");
    }
    Ok(())
}

pub async fn whoami(args: FormatArgs, gateway: &Gateway) -> StorefrontResult<()> {
    let user = signed_in(gateway).await?;

    match args.format {
        OutputFormat::Json => ui::print_json(&user)?,
        OutputFormat::Plain => println!("{}", user.email),
        OutputFormat::Table => {
            let ctx = UiContext::detect();
            ui::section(&ctx, &user.display_name());
            ui::key_value(&ctx, "Email", &user.email);
            ui::key_value(&ctx, "Username", &user.username);
            if let Some(joined) = user.date_joined {
                ui::key_value(&ctx, "Member since", &joined.format("%Y-%m-%d").to_string());
            }
        }
    }
    Ok(())
}
