//! # Seed Data Generator
//!
//! Populates the database with a demo catalog for development.
//!
//! ## Usage
//! ```bash
//! # Generate 40 products (default), database from TIENDA_DB_PATH
//! cargo run -p tienda-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p tienda-db --bin seed -- --count 200
//!
//! # Specify database path
//! cargo run -p tienda-db --bin seed -- --db ./data/tienda.db
//!
//! # More logging
//! RUST_LOG=tienda_db=debug cargo run -p tienda-db --bin seed
//! ```
//!
//! ## Generated Products
//! Names are `{base} {variant}` (e.g. "Laptop Pro"), unique per catalog.
//! - Price: base price + variant add-on
//! - Stock: 0 - 60, so some products start below their threshold
//! - Restock threshold: 2 - 10

use std::env;

use tienda_core::{NewProduct, Product};
use tienda_db::{Database, DbConfig, OrderError, OrderService, ProductRepository, TxContext};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Base products with their price in cents.
const BASE_PRODUCTS: &[(&str, i64)] = &[
    ("Laptop", 1_200_000),
    ("Mouse", 25_000),
    ("Teclado", 45_000),
    ("Monitor", 320_000),
    ("Audífonos", 89_000),
    ("Webcam", 65_000),
    ("Impresora", 280_000),
    ("Router", 110_000),
    ("Disco SSD", 150_000),
    ("Memoria USB", 18_000),
];

/// Variants with their price add-on in cents.
const VARIANTS: &[(&str, i64)] = &[
    ("Básico", 0),
    ("Plus", 10_000),
    ("Pro", 35_000),
    ("Max", 60_000),
    ("Negro", 0),
    ("Blanco", 0),
    ("Inalámbrico", 15_000),
    ("Edición 2026", 50_000),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 40;
    let mut db_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(40);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tienda Orders Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 40)");
                println!("  -d, --db <PATH>    Database file path (default: $TIENDA_DB_PATH or ./tienda.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let config = match db_path {
        Some(path) => DbConfig::new(path),
        None => DbConfig::from_env()?,
    };

    info!(path = %config.database_path.display(), count, "Seeding demo catalog");

    let db = Database::new(config).await?;
    let service = OrderService::new(db.clone());

    let existing = service.list_products().await?.len();
    if existing > 0 {
        warn!(existing, "Database already has products, skipping seed");
        println!("Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let mut generated = 0;

    'outer: for (base_idx, (base, base_price)) in BASE_PRODUCTS.iter().enumerate() {
        for (variant_idx, (variant, addon)) in VARIANTS.iter().enumerate() {
            if generated >= count {
                break 'outer;
            }

            let product = generate_product(base, *base_price, variant, *addon, base_idx * 10 + variant_idx);
            let name = product.name.clone();

            let inserted: Result<Product, OrderError> = db
                .run_in_transaction(&TxContext::new("seed_product").with("product", &name), move |conn| {
                    Box::pin(async move {
                        ProductRepository::new(conn)
                            .insert(&product)
                            .await
                            .map_err(OrderError::from)
                    })
                })
                .await;

            match inserted {
                Ok(_) => generated += 1,
                Err(e) => warn!(product = %name, error = %e, "Failed to insert product"),
            }
        }
    }

    let elapsed = start.elapsed();
    info!(generated, ?elapsed, "Catalog generated");

    let summary = service.get_summary().await?;
    println!();
    println!("✓ Generated {} products in {:?}", generated, elapsed);
    println!(
        "  {} products at or below their restock threshold",
        summary.low_stock_products.len()
    );

    db.close().await;
    Ok(())
}

/// Generates one catalog entry with deterministic pseudo-random values.
fn generate_product(base: &str, base_price: i64, variant: &str, addon: i64, seed: usize) -> NewProduct {
    let stock = ((seed * 37) % 61) as i64;
    let min_stock = 2 + (seed % 9) as i64;

    let mut product = NewProduct::new(format!("{base} {variant}"), base_price + addon, stock, min_stock);
    product.description = Some(format!("{base}, variante {variant}"));
    product
}
