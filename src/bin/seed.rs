use axum_marketplace_api::{
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;
    let pool = create_pool(&config.database_url).await?;

    let admin_id = ensure_user(&pool, "admin@example.com", "admin").await?;
    let seller_id = ensure_user(&pool, "seller@example.com", "seller").await?;
    let buyer_id = ensure_user(&pool, "buyer@example.com", "buyer").await?;

    let products = [
        ("Mechanical Keyboard", 8999_i64, 25),
        ("Trackball Mouse", 4599, 40),
        ("Last-Unit Lamp", 1999, 1),
        ("Sold-Out Stand", 2999, 0),
    ];
    for (name, price, stock) in products {
        ensure_product(&pool, name, price, stock).await?;
    }

    println!("seeded admin={admin_id} seller={seller_id} buyer={buyer_id}");
    Ok(())
}

async fn ensure_user(pool: &sqlx::PgPool, email: &str, role: &str) -> anyhow::Result<Uuid> {
    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    if let Some((id,)) = existing {
        return Ok(id);
    }

    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, email, role) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(email)
        .bind(role)
        .execute(pool)
        .await?;
    Ok(id)
}

async fn ensure_product(
    pool: &sqlx::PgPool,
    name: &str,
    price: i64,
    stock: i32,
) -> anyhow::Result<Uuid> {
    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM products WHERE name = $1")
        .bind(name)
        .fetch_optional(pool)
        .await?;
    if let Some((id,)) = existing {
        return Ok(id);
    }

    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO products (id, name, price, stock) VALUES ($1, $2, $3, $4)")
        .bind(id)
        .bind(name)
        .bind(price)
        .bind(stock)
        .execute(pool)
        .await?;
    Ok(id)
}
