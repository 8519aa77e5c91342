//! Order history, receipts and checkout

use super::cart::print_cart;
use super::{money, signed_in};
use crate::api::models::{PaymentMethod, Purchase};
use crate::cli::args::{CheckoutArgs, FormatArgs, OutputFormat, ReceiptArgs};
use crate::error::{StorefrontError, StorefrontResult};
use crate::gateway::Gateway;
use crate::ui::{self, TaskSpinner, UiContext};

fn placed_on(purchase: &Purchase) -> String {
    purchase
        .created_at
        .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

pub async fn orders(args: FormatArgs, gateway: &Gateway) -> StorefrontResult<()> {
    signed_in(gateway).await?;
    let history = gateway.purchases().history().await?;

    match args.format {
        OutputFormat::Json => ui::print_json(&history)?,
        OutputFormat::Plain => {
            for purchase in &history {
                println!("{}\t{}\t{}", purchase.id, purchase.status, purchase.total_amount);
            }
        }
        OutputFormat::Table => {
            let rows: Vec<Vec<String>> = history
                .iter()
                .map(|p| {
                    vec![
                        p.id.to_string(),
                        placed_on(p),
                        p.status.clone(),
                        p.items.len().to_string(),
                        money(&p.total_amount),
                    ]
                })
                .collect();
            ui::table(
                &["ORDER", "PLACED", "STATUS", "ITEMS", "TOTAL"],
                &rows,
                "No orders yet",
            );
        }
    }
    Ok(())
}

pub async fn receipt(args: ReceiptArgs, gateway: &Gateway) -> StorefrontResult<()> {
    signed_in(gateway).await?;
    let purchase = gateway.purchases().get(args.id).await?;

    match args.format {
        OutputFormat::Json => ui::print_json(&purchase)?,
        OutputFormat::Plain => {
            for item in &purchase.items {
                println!("{}\t{}\t{}", item.product_name, item.quantity, item.price);
            }
        }
        OutputFormat::Table => print_receipt(&purchase),
    }
    Ok(())
}

fn print_receipt(purchase: &Purchase) {
    let ctx = UiContext::detect();
    ui::section(&ctx, &format!("Order #{}", purchase.id));
    ui::key_value(&ctx, "Placed", &placed_on(purchase));
    ui::key_value(&ctx, "Status", &purchase.status);
    ui::key_value(&ctx, "Paid with", &purchase.payment_method);
    println!();

    let rows: Vec<Vec<String>> = purchase
        .items
        .iter()
        .map(|item| {
            vec![
                item.product_name.clone(),
                item.quantity.to_string(),
                money(&item.price),
            ]
        })
        .collect();
    ui::table(&["PRODUCT", "QTY", "PRICE"], &rows, "No items");
    println!();
    println!("Total {}", money(&purchase.total_amount));
}

async fn choose_method(ctx: &UiContext, given: Option<PaymentMethod>) -> StorefrontResult<PaymentMethod> {
    if let Some(method) = given {
        return Ok(method);
    }
    let options: Vec<(PaymentMethod, &str, &str)> = vec![
        (PaymentMethod::Card, "Card", "credit or debit"),
        (PaymentMethod::GooglePay, "Google Pay", ""),
        (PaymentMethod::ApplePay, "Apple Pay", ""),
        (PaymentMethod::Paypal, "PayPal", ""),
    ];
    ui::select(ctx, "How was the payment confirmed?", &options).await
}

pub async fn checkout(args: CheckoutArgs, gateway: &Gateway) -> StorefrontResult<()> {
    signed_in(gateway).await?;
    let ctx = UiContext::detect().with_auto_yes(args.yes);
    let purchases = gateway.purchases();

    let cart = gateway.cart().get().await?;
    if cart.is_empty() {
        return Err(StorefrontError::User("Your cart is empty".to_string()));
    }

    ui::intro(&ctx, "Checkout");
    print_cart(&cart, OutputFormat::Table)?;
    println!();

    let Some(intent_id) = args.payment_intent else {
        let mut spinner = TaskSpinner::new(&ctx);
        spinner.start("Creating payment intent...");
        let intent = purchases.create_payment_intent(&cart.total_amount).await;
        spinner.clear();
        let intent = intent?;

        ui::note(&ctx, "Payment intent", &intent.payment_intent_id);
        ui::key_value(&ctx, "Client secret", &intent.client_secret);
        ui::remark(
            &ctx,
            &format!(
                "Confirm the payment, then run: storefront checkout --payment-intent {} --method card",
                intent.payment_intent_id
            ),
        );
        return Ok(());
    };

    let method = choose_method(&ctx, args.method).await?;
    let prompt = format!("Place order for {}?", money(&cart.total_amount));
    if !ui::confirm(&ctx, &prompt, false).await? {
        ui::step_warn_hint(&ctx, "Order not placed", "Pass --yes to confirm without a prompt");
        return Ok(());
    }

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start("Placing order...");
    let placed = purchases.checkout(&cart, &intent_id, method).await;
    match placed {
        Ok(_) => spinner.stop("Payment recorded"),
        Err(_) => spinner.stop_error("Order not placed"),
    }
    let purchase = placed?;

    ui::outro_success(
        &ctx,
        &format!("Order #{} placed, total {}", purchase.id, money(&purchase.total_amount)),
    );
    Ok(())
}
