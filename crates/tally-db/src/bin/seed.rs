//! # Seed Data Generator
//!
//! Populates the database with workshop catalog data for development.
//!
//! ## Usage
//! ```bash
//! # Seed into the default dev database
//! cargo run -p tally-db --bin seed
//!
//! # Specify database path
//! cargo run -p tally-db --bin seed -- --db ./data/tally.db
//! ```
//!
//! ## Generated Data
//! - Auto parts across categories (filters, brakes, electrical, fluids),
//!   each with a deterministic sale price and low-stock threshold
//! - Initial stock received through the inventory movement recorder, so
//!   every seeded product starts with a correct weighted-average cost and
//!   a ledger entry backing it
//! - Workshop services (labor) with fixed prices
//!
//! Settings defaults (tax rate, business identity) come from the
//! migrations, not from this binary.

use std::env;

use tally_core::{MovementType, NewMovement};
use tally_db::{Database, DbConfig, NewProduct, NewService};

/// Parts catalog grouped by category.
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "Filters",
        &[
            "Oil filter",
            "Air filter",
            "Cabin filter",
            "Fuel filter",
            "Transmission filter",
        ],
    ),
    (
        "Brakes",
        &[
            "Front brake pads",
            "Rear brake pads",
            "Front brake disc",
            "Rear brake disc",
            "Brake fluid DOT 4",
            "Brake caliper kit",
        ],
    ),
    (
        "Electrical",
        &[
            "Spark plug",
            "Ignition coil",
            "Battery 45Ah",
            "Battery 60Ah",
            "Alternator belt",
            "Headlight bulb H4",
            "Fuse assortment",
        ],
    ),
    (
        "Fluids",
        &[
            "Engine oil 5W-30 (1L)",
            "Engine oil 10W-40 (1L)",
            "Coolant (1L)",
            "Transmission fluid (1L)",
            "Power steering fluid",
            "Windshield washer fluid",
        ],
    ),
];

/// Workshop services with prices in cents.
const SERVICES: &[(&str, i64)] = &[
    ("Oil change", 2_500),
    ("Tire rotation", 2_000),
    ("Wheel alignment", 6_500),
    ("Brake inspection", 1_500),
    ("Engine diagnostic", 4_500),
    ("A/C recharge", 8_900),
    ("Battery replacement", 1_800),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./tally_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tally Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./tally_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Tally Seed Data Generator");
    println!("============================");
    println!("Database: {}", db_path);
    println!();

    // Connect to database
    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Check existing products
    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Generate catalog
    println!();
    println!("Generating catalog...");

    let start = std::time::Instant::now();
    let mut products = 0usize;
    let mut seed = 0usize;

    for (category, names) in CATEGORIES {
        for name in *names {
            seed += 1;

            // Deterministic pseudo-variety: sale price $4.99-$94.99,
            // cost 55-79% of it, stock 0-59 units
            let sale_price_cents = 499 + ((seed * 37) % 9_000) as i64;
            let purchase_price_cents = sale_price_cents * (55 + (seed % 25) as i64) / 100;
            let stock = ((seed * 7) % 60) as i64;
            let min_stock = 5 + (seed % 10) as i64;

            let product = db
                .products()
                .insert(&NewProduct {
                    name: name.to_string(),
                    description: Some(format!("{} ({})", name, category)),
                    sale_price_cents,
                    min_stock,
                })
                .await?;

            // Stock goes in through the recorder so the weighted-average
            // cost and the ledger stay consistent with real receipts
            if stock > 0 {
                db.inventory()
                    .record_movement(
                        &NewMovement {
                            product_id: product.id.clone(),
                            kind: MovementType::In,
                            quantity: stock,
                            unit_price_cents: Some(purchase_price_cents),
                            reason: Some("Initial stock".to_string()),
                        },
                        "seed",
                    )
                    .await?;
            }

            products += 1;
        }

        println!("  {} - {} products", category, names.len());
    }

    println!();
    println!("Generating services...");

    for (name, price_cents) in SERVICES {
        db.services()
            .insert(&NewService {
                name: name.to_string(),
                description: None,
                price_cents: *price_cents,
            })
            .await?;
    }
    println!("  {} services", SERVICES.len());

    let elapsed = start.elapsed();
    println!();
    println!(
        "✓ Seeded {} products and {} services in {:?}",
        products,
        SERVICES.len(),
        elapsed
    );

    // Quick sanity checks against the seeded data
    let low = db.products().low_stock().await?;
    let out = db.products().out_of_stock().await?;
    println!("  Low stock: {} products", low.len());
    println!("  Out of stock: {} products", out.len());

    let tax_rate = db.settings().tax_rate().await?;
    println!("  Tax rate: {}%", tax_rate.percentage());

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
