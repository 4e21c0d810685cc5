//! Product search command.

use super::Context;
use crate::output::{self, OutputFormat};
use anyhow::Result;
use storefront_catalog::CatalogClient;

/// Search products and print them.
pub async fn search(ctx: &Context, query: &str, format: &OutputFormat) -> Result<()> {
    let client = CatalogClient::from_config(&ctx.config)?;

    let items = match client.search_products(query).await {
        Ok(items) => items,
        Err(e) => {
            output::print_error(&e.to_string(), format);
            return Ok(());
        }
    };

    match format {
        OutputFormat::Json => output::print_json(&items),
        OutputFormat::Text => {
            if items.is_empty() {
                println!("No products found.");
                return Ok(());
            }
            output::print_heading(&format!("{} products for \"{}\"", items.len(), query.trim()));
            for item in &items {
                println!("{}", item.display_name());
                output::print_row("Marketplace", &item.marketplace);
                if let Some(price) = &item.price {
                    output::print_row("Price", price);
                }
                if let Some(rating) = &item.rating {
                    let reviews = item.reviews.as_deref().unwrap_or("0");
                    output::print_row("Rating", &format!("{} ({} reviews)", rating, reviews));
                }
                if let Some(url) = &item.url {
                    output::print_row("Link", url);
                }
            }
        }
    }
    Ok(())
}
