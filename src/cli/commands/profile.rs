//! Profile command - show or update the signed-in user's profile

use super::signed_in;
use crate::api::models::ProfileUpdate;
use crate::cli::args::{OutputFormat, ProfileArgs};
use crate::error::StorefrontResult;
use crate::gateway::Gateway;
use crate::ui::{self, UiContext};

pub async fn execute(args: ProfileArgs, gateway: &Gateway) -> StorefrontResult<()> {
    signed_in(gateway).await?;
    let ctx = UiContext::detect();
    let profile = gateway.profile();

    let changes = ProfileUpdate {
        username: args.username,
        first_name: args.first_name,
        last_name: args.last_name,
    };
    let user = if changes.is_empty() {
        profile.get().await?
    } else {
        let user = profile.update(&changes).await?;
        ui::step_ok(&ctx, "Profile updated");
        user
    };

    match args.format {
        OutputFormat::Json => ui::print_json(&user)?,
        OutputFormat::Plain => println!("{}\t{}", user.email, user.username),
        OutputFormat::Table => {
            ui::key_value(&ctx, "Email", &user.email);
            ui::key_value(&ctx, "Username", &user.username);
            ui::key_value(&ctx, "First name", &user.first_name);
            ui::key_value(&ctx, "Last name", &user.last_name);
        }
    }
    Ok(())
}
