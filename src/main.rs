//! Storefront - shop from the terminal
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use storefront::cli::{commands, Cli, Commands};
use storefront::config::{Config, ConfigManager};
use storefront::error::StorefrontResult;
use storefront::Gateway;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8, config: &Config) {
    // RUST_LOG wins; otherwise 0 = warn, 1 = info, 2+ = debug
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("storefront=warn"),
        1 => EnvFilter::new("storefront=info"),
        _ => EnvFilter::new("storefront=debug"),
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}

async fn run() -> StorefrontResult<()> {
    let cli = Cli::parse();

    // Completions need neither config nor network
    if let Commands::Completions(args) = cli.command {
        return commands::completions(args);
    }

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let mut config = config_manager.load().await?;
    if let Some(url) = cli.api_url {
        config.api.base_url = url;
    }

    init_logging(cli.verbose, &config);
    storefront::ui::init_theme();
    debug!("Using config at {}", config_manager.path().display());

    if let Commands::Config(args) = cli.command {
        return commands::config(args, &config_manager, &config).await;
    }

    let gateway = Gateway::connect(&config).await?;
    let result = dispatch(cli.command, &gateway).await;
    gateway.shutdown().await;
    result
}

async fn dispatch(command: Commands, gateway: &Gateway) -> StorefrontResult<()> {
    match command {
        Commands::Completions(_) | Commands::Config(_) => unreachable!("handled above"),
        Commands::Login(args) => commands::login(args, gateway).await,
        Commands::Register(args) => commands::register(args, gateway).await,
        Commands::Logout => commands::logout(gateway).await,
        Commands::Whoami(args) => commands::whoami(args, gateway).await,
        Commands::Status => commands::status(gateway).await,
        Commands::Categories(args) => commands::categories(args, gateway).await,
        Commands::Products(args) => commands::products(args, gateway).await,
        Commands::Product(args) => commands::product(args, gateway).await,
        Commands::Cart(args) => commands::cart(args, gateway).await,
        Commands::Orders(args) => commands::orders(args, gateway).await,
        Commands::Receipt(args) => commands::receipt(args, gateway).await,
        Commands::Checkout(args) => commands::checkout(args, gateway).await,
        Commands::MyProducts(args) => commands::my_products(args, gateway).await,
        Commands::Sell(args) => commands::sell(args, gateway).await,
        Commands::EditProduct(args) => commands::edit_product(args, gateway).await,
        Commands::Profile(args) => commands::profile(args, gateway).await,
    }
}
