//! Terminal output for the storefront CLI
//!
//! Uses `cliclack` widgets on a terminal and falls back to plain,
//! prefix-tagged lines (`[OK]`, `[WARN]`) in CI or when piped.
//!
//! # Example
//!
//! ```rust,ignore
//! use storefront::ui::{self, UiContext, TaskSpinner};
//!
//! let ctx = UiContext::detect().with_auto_yes(args.yes);
//!
//! let mut spinner = TaskSpinner::new(&ctx);
//! spinner.start("Loading cart...");
//! let cart = gateway.cart().get().await?;
//! spinner.clear();
//!
//! if ui::confirm(&ctx, "Place order?", false).await? {
//!     ui::outro_success(&ctx, "Order placed");
//! }
//! ```

mod context;
mod output;
mod progress;
mod prompts;
mod theme;

pub use context::{UiContext, PLAIN_ENV};
pub use output::{
    intro, key_value, key_value_status, note, outro_success, print_json, remark, render_table,
    section, step_error, step_info, step_ok, step_warn, step_warn_hint, table,
};
pub use progress::TaskSpinner;
pub use prompts::{confirm, input, password, select};
pub use theme::{init_theme, StorefrontTheme};
