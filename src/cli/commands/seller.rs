//! Seller commands: list, create and edit your own products

use super::catalog::print_products;
use super::{money, signed_in};
use crate::api::models::{NewProduct, ProductUpdate};
use crate::cli::args::{EditProductArgs, FormatArgs, SellArgs};
use crate::error::StorefrontResult;
use crate::gateway::Gateway;
use crate::ui::{self, UiContext};

pub async fn my_products(args: FormatArgs, gateway: &Gateway) -> StorefrontResult<()> {
    signed_in(gateway).await?;
    let products = gateway.seller().my_products().await?;
    print_products(&products, args.format, "You are not selling anything yet")
}

pub async fn sell(args: SellArgs, gateway: &Gateway) -> StorefrontResult<()> {
    signed_in(gateway).await?;
    let ctx = UiContext::detect();

    let listing = NewProduct {
        name: args.name,
        description: args.description,
        price: args.price,
        discount_price: args.discount_price,
        stock: args.stock,
        category_id: args.category,
        image_url: args.image_url,
        is_featured: args.featured,
    };
    let product = gateway.seller().create(&listing).await?;

    ui::step_ok(
        &ctx,
        &format!("Listed {} (#{}) at {}", product.name, product.id, money(&product.price)),
    );
    if !product.is_active {
        ui::remark(&ctx, "The listing becomes visible once it is approved");
    }
    Ok(())
}

pub async fn edit_product(args: EditProductArgs, gateway: &Gateway) -> StorefrontResult<()> {
    signed_in(gateway).await?;
    let ctx = UiContext::detect();

    let changes = ProductUpdate {
        name: args.name,
        description: args.description,
        price: args.price,
        discount_price: args.discount_price,
        stock: args.stock,
        category_id: args.category,
        image_url: args.image_url,
        is_featured: args.featured,
        is_active: args.active,
    };
    let product = gateway.seller().update(args.id, &changes).await?;

    ui::step_ok(&ctx, &format!("Saved {} (#{})", product.name, product.id));
    Ok(())
}
