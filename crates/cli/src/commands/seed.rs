//! Seed the database with demo data.
//!
//! Inserts a small catalog plus two verified accounts: a demo customer and
//! an admin. Running it again changes nothing; existing rows are left as
//! they are, passwords included.

use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;
use tracing::info;

use shopfront_api::services::auth::{AuthError, hash_password};

use super::ConnectError;

/// Demo customer login.
pub const DEMO_EMAIL: &str = "demo@example.com";
/// Admin login.
pub const ADMIN_EMAIL: &str = "admin@example.com";

const BRANDS: &[&str] = &["Acme", "Lumen", "Northwind", "Tessera"];
const CATEGORIES: &[&str] = &["Home", "Lighting", "Kitchen", "Outdoors"];

struct DemoProduct {
    title: &'static str,
    description: &'static str,
    price: &'static str,
    discount: &'static str,
    category: &'static str,
    brand: &'static str,
    stock: i32,
}

const PRODUCTS: &[DemoProduct] = &[
    DemoProduct {
        title: "Stoneware Mug",
        description: "Glazed 350 ml mug, dishwasher safe.",
        price: "14.00",
        discount: "0",
        category: "Kitchen",
        brand: "Acme",
        stock: 120,
    },
    DemoProduct {
        title: "Desk Lamp",
        description: "Adjustable arm, warm white LED.",
        price: "49.99",
        discount: "10",
        category: "Lighting",
        brand: "Lumen",
        stock: 25,
    },
    DemoProduct {
        title: "Pendant Light",
        description: "Spun aluminium shade, 1.5 m cord.",
        price: "89.00",
        discount: "0",
        category: "Lighting",
        brand: "Lumen",
        stock: 8,
    },
    DemoProduct {
        title: "Linen Throw",
        description: "Washed linen, 130 x 170 cm.",
        price: "65.00",
        discount: "15",
        category: "Home",
        brand: "Northwind",
        stock: 40,
    },
    DemoProduct {
        title: "Camp Kettle",
        description: "1 l stainless steel kettle for gas stoves.",
        price: "32.50",
        discount: "0",
        category: "Outdoors",
        brand: "Northwind",
        stock: 0,
    },
    DemoProduct {
        title: "Mosaic Coasters",
        description: "Set of four ceramic coasters.",
        price: "18.00",
        discount: "5",
        category: "Home",
        brand: "Tessera",
        stock: 60,
    },
];

/// Errors that can occur while seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Could not hash password: {0}")]
    Password(#[from] AuthError),

    #[error("Invalid demo price: {0}")]
    Price(#[from] rust_decimal::Error),
}

/// Seed everything.
///
/// # Errors
///
/// Returns an error if the database is unreachable or an insert fails.
pub async fn run(demo_password: &str, admin_password: &str) -> Result<(), SeedError> {
    let pool = super::connect().await?;

    let catalog = seed_catalog(&pool).await?;
    let products = seed_products(&pool).await?;
    let users = seed_user(&pool, "Demo User", DEMO_EMAIL, demo_password, false).await?
        + seed_user(&pool, "Admin", ADMIN_EMAIL, admin_password, true).await?;

    info!("Seeding complete!");
    info!("  Brands/categories inserted: {catalog}");
    info!("  Products inserted: {products}");
    info!("  Users inserted: {users}");
    Ok(())
}

async fn seed_catalog(pool: &PgPool) -> Result<u64, SeedError> {
    let mut inserted = 0;
    for name in BRANDS {
        inserted += sqlx::query("INSERT INTO shop.brand (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(name)
            .execute(pool)
            .await?
            .rows_affected();
    }
    for name in CATEGORIES {
        inserted += sqlx::query(
            "INSERT INTO shop.category (name) VALUES ($1) ON CONFLICT (name) DO NOTHING",
        )
        .bind(name)
        .execute(pool)
        .await?
        .rows_affected();
    }
    Ok(inserted)
}

async fn seed_products(pool: &PgPool) -> Result<u64, SeedError> {
    let mut inserted = 0;
    for product in PRODUCTS {
        // Products have no natural key, so the title stands in for one
        inserted += sqlx::query(
            r"
            INSERT INTO shop.product
                (title, description, price, discount_percentage, category_id, brand_id, stock_quantity)
            SELECT $1, $2, $3, $4, c.id, b.id, $7
            FROM shop.category c, shop.brand b
            WHERE c.name = $5 AND b.name = $6
              AND NOT EXISTS (SELECT 1 FROM shop.product WHERE title = $1)
            ",
        )
        .bind(product.title)
        .bind(product.description)
        .bind(Decimal::from_str(product.price)?)
        .bind(Decimal::from_str(product.discount)?)
        .bind(product.category)
        .bind(product.brand)
        .bind(product.stock)
        .execute(pool)
        .await?
        .rows_affected();
    }
    Ok(inserted)
}

async fn seed_user(
    pool: &PgPool,
    name: &str,
    email: &str,
    password: &str,
    is_admin: bool,
) -> Result<u64, SeedError> {
    let hash = hash_password(password)?;
    let inserted = sqlx::query(
        r#"
        INSERT INTO shop."user" (name, email, password_hash, is_verified, is_admin)
        VALUES ($1, $2, $3, TRUE, $4)
        ON CONFLICT (email) DO NOTHING
        "#,
    )
    .bind(name)
    .bind(email)
    .bind(hash)
    .bind(is_admin)
    .execute(pool)
    .await?
    .rows_affected();

    if inserted == 0 {
        info!("{email} already exists, left unchanged");
    }
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_products_reference_seeded_names() {
        for product in PRODUCTS {
            assert!(BRANDS.contains(&product.brand), "{}", product.title);
            assert!(CATEGORIES.contains(&product.category), "{}", product.title);
            assert!(Decimal::from_str(product.price).is_ok());
            assert!(Decimal::from_str(product.discount).is_ok());
        }
    }

    #[test]
    fn test_demo_titles_are_unique() {
        let mut titles: Vec<_> = PRODUCTS.iter().map(|p| p.title).collect();
        titles.sort_unstable();
        titles.dedup();
        assert_eq!(titles.len(), PRODUCTS.len());
    }
}
