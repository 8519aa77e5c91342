//! Cart command

use super::{money, signed_in};
use crate::api::models::Cart;
use crate::cli::args::{CartAction, CartArgs, FormatArgs, OutputFormat};
use crate::error::StorefrontResult;
use crate::gateway::Gateway;
use crate::ui::{self, UiContext};

pub async fn execute(args: CartArgs, gateway: &Gateway) -> StorefrontResult<()> {
    signed_in(gateway).await?;
    let ctx = UiContext::detect();
    let cart = gateway.cart();

    match args.action.unwrap_or(CartAction::Show(FormatArgs::default())) {
        CartAction::Show(format) => print_cart(&cart.get().await?, format.format)?,
        CartAction::Add {
            product_id,
            quantity,
        } => {
            let item = cart.add(product_id, quantity).await?;
            ui::step_ok(
                &ctx,
                &format!("Added {} x {} (line {})", quantity, item.product.name, item.id),
            );
        }
        CartAction::Set { item_id, quantity } => match cart.set_quantity(item_id, quantity).await? {
            Some(item) => ui::step_ok(
                &ctx,
                &format!("{} quantity set to {}", item.product.name, item.quantity),
            ),
            None => ui::step_ok(&ctx, &format!("Removed line {}", item_id)),
        },
        CartAction::Remove { item_id } => {
            cart.remove(item_id).await?;
            ui::step_ok(&ctx, &format!("Removed line {}", item_id));
        }
        CartAction::Clear { yes } => {
            let ctx = ctx.with_auto_yes(yes);
            if !ui::confirm(&ctx, "Remove everything from the cart?", false).await? {
                ui::step_info(&ctx, "Cart left unchanged");
                return Ok(());
            }
            cart.clear().await?;
            ui::step_ok(&ctx, "Cart emptied");
        }
    }
    Ok(())
}

pub(crate) fn print_cart(cart: &Cart, format: OutputFormat) -> StorefrontResult<()> {
    match format {
        OutputFormat::Json => ui::print_json(cart)?,
        OutputFormat::Plain => {
            for item in &cart.items {
                println!("{}\t{}\t{}", item.id, item.product.slug, item.quantity);
            }
        }
        OutputFormat::Table => {
            let rows: Vec<Vec<String>> = cart
                .items
                .iter()
                .map(|item| {
                    vec![
                        item.id.to_string(),
                        item.product.name.clone(),
                        item.quantity.to_string(),
                        money(item.product.effective_price()),
                        item.subtotal.as_deref().map(money).unwrap_or_default(),
                    ]
                })
                .collect();
            ui::table(
                &["LINE", "PRODUCT", "QTY", "PRICE", "SUBTOTAL"],
                &rows,
                "Your cart is empty",
            );
            if !cart.is_empty() {
                println!();
                println!("{} item(s), total {}", cart.total_items, money(&cart.total_amount));
            }
        }
    }
    Ok(())
}
