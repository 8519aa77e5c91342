//! Catalog browsing commands

use super::money;
use crate::api::models::{Category, Product, ProductFilter};
use crate::cli::args::{FormatArgs, OutputFormat, ProductArgs, ProductsArgs};
use crate::error::StorefrontResult;
use crate::gateway::Gateway;
use crate::ui::{self, UiContext};
use console::style;

pub async fn categories(args: FormatArgs, gateway: &Gateway) -> StorefrontResult<()> {
    let categories = gateway.catalog().categories().await?;

    match args.format {
        OutputFormat::Json => ui::print_json(&categories)?,
        OutputFormat::Plain => {
            for category in &categories {
                println!("{}", category.slug);
            }
        }
        OutputFormat::Table => print_categories(&categories),
    }
    Ok(())
}

fn print_categories(categories: &[Category]) {
    let rows: Vec<Vec<String>> = categories
        .iter()
        .map(|c| {
            vec![
                c.slug.clone(),
                c.name.clone(),
                c.products_count.to_string(),
            ]
        })
        .collect();
    ui::table(&["SLUG", "NAME", "PRODUCTS"], &rows, "No categories");
}

pub async fn products(args: ProductsArgs, gateway: &Gateway) -> StorefrontResult<()> {
    let catalog = gateway.catalog();
    let products = match (args.search, args.category, args.featured) {
        _ if args.offers => catalog.offers().await?,
        (None, Some(slug), false) => catalog.by_category(&slug).await?,
        (None, None, true) => catalog.featured().await?,
        (search, category, featured) => {
            let filter = ProductFilter {
                search,
                category,
                featured,
            };
            catalog.products(&filter).await?
        }
    };

    print_products(&products, args.format, "No products found")
}

pub(crate) fn print_products(
    products: &[Product],
    format: OutputFormat,
    empty: &str,
) -> StorefrontResult<()> {
    match format {
        OutputFormat::Json => ui::print_json(products)?,
        OutputFormat::Plain => {
            for product in products {
                println!("{}", product.slug);
            }
        }
        OutputFormat::Table => {
            let rows: Vec<Vec<String>> = products.iter().map(product_row).collect();
            ui::table(&["ID", "SLUG", "NAME", "PRICE", "STOCK"], &rows, empty);
        }
    }
    Ok(())
}

fn product_row(product: &Product) -> Vec<String> {
    let price = if product.has_discount {
        format!(
            "{} {}",
            money(product.effective_price()),
            style(format!("(-{}%)", product.discount_percentage)).green()
        )
    } else {
        money(product.effective_price())
    };
    let stock = if product.stock == 0 {
        style("sold out").red().to_string()
    } else {
        product.stock.to_string()
    };
    vec![
        product.id.to_string(),
        product.slug.clone(),
        product.name.clone(),
        price,
        stock,
    ]
}

pub async fn product(args: ProductArgs, gateway: &Gateway) -> StorefrontResult<()> {
    let catalog = gateway.catalog();
    let product = catalog.product(&args.slug).await?;
    let recommended = if args.recommended {
        Some(catalog.recommended(product.id).await?)
    } else {
        None
    };

    match args.format {
        OutputFormat::Json => match recommended {
            Some(ref recommended) => ui::print_json(&serde_json::json!({
                "product": product,
                "recommended": recommended,
            }))?,
            None => ui::print_json(&product)?,
        },
        OutputFormat::Plain => {
            println!("{}\t{}\t{}", product.id, product.slug, product.effective_price());
            for other in recommended.iter().flatten() {
                println!("{}", other.slug);
            }
        }
        OutputFormat::Table => {
            let ctx = UiContext::detect();
            ui::section(&ctx, &product.name);
            ui::key_value(&ctx, "ID", &product.id.to_string());
            if let Some(ref category) = product.category {
                ui::key_value(&ctx, "Category", &category.name);
            }
            if product.has_discount {
                ui::key_value(
                    &ctx,
                    "Price",
                    &format!(
                        "{} (was {})",
                        money(product.effective_price()),
                        money(&product.price)
                    ),
                );
            } else {
                ui::key_value(&ctx, "Price", &money(&product.price));
            }
            ui::key_value_status(
                &ctx,
                "Stock",
                &product.stock.to_string(),
                product.stock > 0,
            );
            if !product.description.is_empty() {
                ui::remark(&ctx, &product.description);
            }

            if let Some(recommended) = recommended {
                println!();
                print_products(&recommended, OutputFormat::Table, "No recommendations")?;
            }
        }
    }
    Ok(())
}
