use std::path::Path;

use log::*;
use sqlx::{migrate, migrate::MigrateDatabase, Sqlite};

use crate::SqliteDatabase;

pub async fn prepare_test_env(url: &str) {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
    create_database(url).await;
    run_migrations(url).await;
}

pub fn random_db_path() -> String {
    let dir = std::env::temp_dir();
    format!("sqlite://{}/admission_test_{}.db", dir.display(), rand::random::<u64>())
}

pub async fn run_migrations(url: &str) {
    let db = SqliteDatabase::new_with_url(url, 5).await.expect("Error creating connection to database");
    migrate!("./src/sqlite/migrations").run(db.pool()).await.expect("Error running DB migrations");
    info!("🚀️ Migrations complete");
}

pub async fn create_database<P: AsRef<Path>>(path: P) {
    let p = path.as_ref().as_os_str().to_str().unwrap();
    if let Err(e) = Sqlite::drop_database(p).await {
        warn!("Error dropping database {p}: {e:?}");
    }
    Sqlite::create_database(p).await.expect("Error creating database");
    info!("Created Sqlite database {p}");
}

/// Seeds the read-only catalog tables: the given schools (with a published test link), one user per entry in `users`
/// and the payment plans `(school_id, description, price, plan_type)`.
pub async fn seed_catalog(
    db: &SqliteDatabase,
    schools: &[(i64, &str)],
    users: &[(i64, &str)],
    plans: &[(i64, &str, i64, &str)],
) {
    for (id, name) in schools {
        sqlx::query("INSERT INTO schools (id, name, image, quiz_link_pub) VALUES ($1, $2, $3, $4)")
            .bind(*id)
            .bind(*name)
            .bind(format!("https://img.example/{id}.png"))
            .bind(format!("https://quiz.example/{id}"))
            .execute(db.pool())
            .await
            .expect("Error seeding schools");
    }
    for (id, username) in users {
        sqlx::query("INSERT INTO users (id, username, first_name, sure_name, email) VALUES ($1, $2, $3, $4, $5)")
            .bind(*id)
            .bind(*username)
            .bind(*username)
            .bind("Tester")
            .bind(format!("{username}@example.com"))
            .execute(db.pool())
            .await
            .expect("Error seeding users");
    }
    for (school_id, description, price, plan_type) in plans {
        sqlx::query("INSERT INTO school_payments (school_id, description, price, plan_type) VALUES ($1, $2, $3, $4)")
            .bind(*school_id)
            .bind(*description)
            .bind(*price)
            .bind(*plan_type)
            .execute(db.pool())
            .await
            .expect("Error seeding payment plans");
    }
    debug!("🚀️ Catalog seeded");
}
