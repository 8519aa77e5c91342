//! CLI argument definitions using clap derive

use crate::api::models::PaymentMethod;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

/// Storefront - shop from the terminal
///
/// Talks to a storefront REST API with a persisted, auto-refreshing session
/// and a local response cache.
#[derive(Parser, Debug)]
#[command(name = "storefront")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "STOREFRONT_CONFIG")]
    pub config: Option<PathBuf>,

    /// API base URL, overriding config and STOREFRONT_API_URL
    #[arg(long, global = true)]
    pub api_url: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in with email and password
    Login(LoginArgs),

    /// Create an account and sign in
    Register(RegisterArgs),

    /// Sign out and forget the stored session
    Logout,

    /// Show the signed-in user
    Whoami(FormatArgs),

    /// Check API reachability and session state
    Status,

    /// List product categories
    Categories(FormatArgs),

    /// Browse products
    Products(ProductsArgs),

    /// Show one product
    Product(ProductArgs),

    /// Show or edit the cart
    Cart(CartArgs),

    /// Purchase history
    Orders(FormatArgs),

    /// Show one purchase
    Receipt(ReceiptArgs),

    /// Pay for the cart
    Checkout(CheckoutArgs),

    /// Products you are selling
    MyProducts(FormatArgs),

    /// List a new product for sale
    Sell(SellArgs),

    /// Change one of your products
    EditProduct(EditProductArgs),

    /// Show or update your profile
    Profile(ProfileArgs),

    /// Show or edit configuration
    Config(ConfigArgs),

    /// Print shell completions
    Completions(CompletionsArgs),
}

/// Output format for listings
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

#[derive(Args, Debug, Default)]
pub struct FormatArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Account email (prompted when omitted)
    #[arg(short, long)]
    pub email: Option<String>,

    /// Read the password from the first line of stdin
    #[arg(long)]
    pub password_stdin: bool,
}

#[derive(Args, Debug)]
pub struct RegisterArgs {
    #[arg(short, long)]
    pub email: Option<String>,

    #[arg(short, long)]
    pub username: Option<String>,

    #[arg(long)]
    pub first_name: Option<String>,

    #[arg(long)]
    pub last_name: Option<String>,

    /// Read the password from the first line of stdin
    #[arg(long)]
    pub password_stdin: bool,
}

#[derive(Args, Debug)]
pub struct ProductsArgs {
    /// Only products in this category (slug)
    #[arg(long)]
    pub category: Option<String>,

    /// Free-text search
    #[arg(short, long)]
    pub search: Option<String>,

    /// Only featured products
    #[arg(long, conflicts_with = "offers")]
    pub featured: bool,

    /// Only discounted products
    #[arg(long)]
    pub offers: bool,

    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct ProductArgs {
    /// Product slug
    pub slug: String,

    /// Also list recommended products
    #[arg(long)]
    pub recommended: bool,

    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct CartArgs {
    /// Cart action (defaults to show)
    #[command(subcommand)]
    pub action: Option<CartAction>,
}

#[derive(Subcommand, Debug)]
pub enum CartAction {
    /// Show cart contents
    Show(FormatArgs),

    /// Add a product to the cart
    Add {
        /// Product ID
        product_id: u64,

        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },

    /// Set the quantity of a cart line (0 removes it)
    Set {
        /// Cart item ID
        item_id: u64,

        quantity: u32,
    },

    /// Remove a cart line
    Remove {
        /// Cart item ID
        item_id: u64,
    },

    /// Empty the cart
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Args, Debug)]
pub struct ReceiptArgs {
    /// Purchase ID
    pub id: u64,

    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct CheckoutArgs {
    /// ID of a payment intent that has already been confirmed. Without it a
    /// new intent is created and its client secret printed.
    #[arg(long)]
    pub payment_intent: Option<String>,

    /// Payment method used to confirm the intent
    #[arg(long, value_parser = parse_payment_method)]
    pub method: Option<PaymentMethod>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

fn parse_payment_method(s: &str) -> Result<PaymentMethod, String> {
    s.parse()
}

#[derive(Args, Debug)]
pub struct SellArgs {
    #[arg(long)]
    pub name: String,

    #[arg(long, default_value = "")]
    pub description: String,

    /// Price, e.g. 19.99
    #[arg(long)]
    pub price: String,

    #[arg(long)]
    pub discount_price: Option<String>,

    /// Category ID
    #[arg(long)]
    pub category: Option<u64>,

    #[arg(long, default_value_t = 0)]
    pub stock: u32,

    #[arg(long)]
    pub image_url: Option<String>,

    #[arg(long)]
    pub featured: bool,
}

#[derive(Args, Debug)]
pub struct EditProductArgs {
    /// Product ID
    pub id: u64,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub price: Option<String>,

    #[arg(long)]
    pub discount_price: Option<String>,

    /// Category ID
    #[arg(long)]
    pub category: Option<u64>,

    #[arg(long)]
    pub stock: Option<u32>,

    #[arg(long)]
    pub image_url: Option<String>,

    /// Mark as featured (true/false)
    #[arg(long)]
    pub featured: Option<bool>,

    /// List or unlist the product (true/false)
    #[arg(long)]
    pub active: Option<bool>,
}

#[derive(Args, Debug)]
pub struct ProfileArgs {
    #[arg(long)]
    pub username: Option<String>,

    #[arg(long)]
    pub first_name: Option<String>,

    #[arg(long)]
    pub last_name: Option<String>,

    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., api.base_url)
        key: String,

        value: String,
    },
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    pub shell: Shell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn cli_parses_status() {
        let cli = Cli::parse_from(["storefront", "status"]);
        assert!(matches!(cli.command, Commands::Status));
    }

    #[test]
    fn cli_parses_login() {
        let cli = Cli::parse_from(["storefront", "login", "-e", "ana@shop.test", "--password-stdin"]);
        match cli.command {
            Commands::Login(args) => {
                assert_eq!(args.email.as_deref(), Some("ana@shop.test"));
                assert!(args.password_stdin);
            }
            _ => panic!("expected Login command"),
        }
    }

    #[test]
    fn cli_parses_products_filters() {
        let cli = Cli::parse_from([
            "storefront", "products", "--category", "hats", "--search", "wool", "-f", "json",
        ]);
        match cli.command {
            Commands::Products(args) => {
                assert_eq!(args.category.as_deref(), Some("hats"));
                assert_eq!(args.search.as_deref(), Some("wool"));
                assert_eq!(args.format, OutputFormat::Json);
                assert!(!args.featured);
            }
            _ => panic!("expected Products command"),
        }
    }

    #[test]
    fn featured_and_offers_conflict() {
        let result = Cli::try_parse_from(["storefront", "products", "--featured", "--offers"]);
        assert!(result.is_err());
    }

    #[test]
    fn cart_defaults_to_show() {
        let cli = Cli::parse_from(["storefront", "cart"]);
        match cli.command {
            Commands::Cart(args) => assert!(args.action.is_none()),
            _ => panic!("expected Cart command"),
        }
    }

    #[test]
    fn cli_parses_cart_set() {
        let cli = Cli::parse_from(["storefront", "cart", "set", "7", "3"]);
        match cli.command {
            Commands::Cart(CartArgs {
                action: Some(CartAction::Set { item_id, quantity }),
            }) => {
                assert_eq!(item_id, 7);
                assert_eq!(quantity, 3);
            }
            _ => panic!("expected cart set"),
        }
    }

    #[test]
    fn cli_parses_checkout_method() {
        let cli = Cli::parse_from([
            "storefront", "checkout", "--payment-intent", "pi_1", "--method", "google-pay", "-y",
        ]);
        match cli.command {
            Commands::Checkout(args) => {
                assert_eq!(args.payment_intent.as_deref(), Some("pi_1"));
                assert_eq!(args.method, Some(PaymentMethod::GooglePay));
                assert!(args.yes);
            }
            _ => panic!("expected Checkout command"),
        }
    }

    #[test]
    fn unknown_payment_method_is_rejected() {
        let result = Cli::try_parse_from(["storefront", "checkout", "--method", "cash"]);
        assert!(result.is_err());
    }

    #[test]
    fn cli_parses_edit_product() {
        let cli = Cli::parse_from(["storefront", "edit-product", "4", "--stock", "0", "--active", "false"]);
        match cli.command {
            Commands::EditProduct(args) => {
                assert_eq!(args.id, 4);
                assert_eq!(args.stock, Some(0));
                assert_eq!(args.active, Some(false));
                assert!(args.name.is_none());
            }
            _ => panic!("expected EditProduct command"),
        }
    }

    #[test]
    fn cli_parses_config_set() {
        let cli = Cli::parse_from(["storefront", "config", "set", "api.base_url", "https://shop.test"]);
        match cli.command {
            Commands::Config(ConfigArgs {
                action: Some(ConfigAction::Set { key, value }),
            }) => {
                assert_eq!(key, "api.base_url");
                assert_eq!(value, "https://shop.test");
            }
            _ => panic!("expected config set"),
        }
    }

    #[test]
    fn cli_global_api_url() {
        let cli = Cli::parse_from(["storefront", "categories", "--api-url", "http://localhost:8000"]);
        assert_eq!(cli.api_url.as_deref(), Some("http://localhost:8000"));
    }

    #[test]
    fn cli_verbose_levels() {
        let cli = Cli::parse_from(["storefront", "-vv", "status"]);
        assert_eq!(cli.verbose, 2);
    }
}
