//! Status command - check API reachability and session state

use crate::auth::AuthState;
use crate::error::StorefrontResult;
use crate::gateway::Gateway;
use console::{style, Emoji};

static CHECK: Emoji<'_, '_> = Emoji("✓ ", "[OK] ");
static CROSS: Emoji<'_, '_> = Emoji("✗ ", "[FAIL] ");
static WARN: Emoji<'_, '_> = Emoji("⚠ ", "[WARN] ");

pub async fn execute(gateway: &Gateway) -> StorefrontResult<()> {
    println!("{}", style("Storefront Status").bold().magenta());
    println!();

    let api_ok = check_api(gateway).await;
    println!();
    check_session(gateway).await;

    println!();
    if api_ok {
        println!("{}", style("API reachable").green().bold());
    } else {
        println!(
            "{}",
            style("API unreachable - see above for details").yellow().bold()
        );
    }
    Ok(())
}

async fn check_api(gateway: &Gateway) -> bool {
    println!("{}", style("API:").bold());
    println!("  Base URL: {}", gateway.transport().base_url());

    match gateway.catalog().categories().await {
        Ok(categories) => {
            println!("  {} Catalog answered ({} categories)", CHECK, categories.len());
            true
        }
        Err(e) => {
            println!("  {} {}", CROSS, style(e.to_string()).red());
            if let Some(hint) = e.hint() {
                println!("     {}", style(hint).dim());
            }
            false
        }
    }
}

async fn check_session(gateway: &Gateway) {
    println!("{}", style("Session:").bold());

    if !gateway.config().session.persist {
        println!("  {} Persistence disabled, sessions end with each command", WARN);
    }
    if !gateway.session().is_present() {
        println!("  {} Not signed in", WARN);
        println!("     {}", style("Run: storefront login").dim());
        return;
    }

    match gateway.auth().restore().await {
        Ok(Some(user)) => println!(
            "  {} Signed in as {} <{}>",
            CHECK,
            user.display_name(),
            user.email
        ),
        Ok(None) if gateway.auth().state() == AuthState::SessionExpired => {
            println!("  {} Session expired", CROSS);
            println!("     {}", style("Run: storefront login").dim());
        }
        Ok(None) => println!("  {} Not signed in", WARN),
        Err(e) => println!("  {} Could not load profile: {}", CROSS, e),
    }
}
