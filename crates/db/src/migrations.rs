use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub async fn run_pending(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

#[cfg(test)]
mod tests {
    use sqlx::Row;

    use super::run_pending;
    use crate::connect_with_settings;

    const MANAGED_SCHEMA_OBJECTS: &[&str] =
        &["customer", "booking", "idx_booking_booking_number", "idx_booking_customer_id"];

    #[tokio::test]
    async fn migrations_create_booking_schema() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        for object in MANAGED_SCHEMA_OBJECTS {
            let count = sqlx::query("SELECT COUNT(*) AS count FROM sqlite_master WHERE name = ?")
                .bind(object)
                .fetch_one(&pool)
                .await
                .expect("query sqlite_master")
                .get::<i64, _>("count");
            assert_eq!(count, 1, "expected schema object `{object}` to exist");
        }
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("first run");
        run_pending(&pool).await.expect("second run is a no-op");
    }

    #[tokio::test]
    async fn booking_requires_existing_customer() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        let result = sqlx::query(
            "INSERT INTO booking (booking_number, start_date, end_date, car_model, customer_id)
             VALUES ('BK-ORPHAN', '2026-01-01', '2026-01-05', 'Fiat 500', 999)",
        )
        .execute(&pool)
        .await;

        assert!(result.is_err(), "foreign key to customer should be enforced");
    }

    #[tokio::test]
    async fn booking_number_is_unique_across_customers() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");
        sqlx::query("INSERT INTO customer (id, name, surname) VALUES (1, 'Jane', 'Doe'), (2, 'James', 'Bond')")
            .execute(&pool)
            .await
            .expect("insert customers");

        let insert = "INSERT INTO booking (booking_number, start_date, end_date, car_model, customer_id)
             VALUES ('BK1', '2026-01-01', '2026-01-05', 'Fiat 500', ?)";
        sqlx::query(insert).bind(1_i64).execute(&pool).await.expect("first booking");
        let duplicate = sqlx::query(insert).bind(2_i64).execute(&pool).await;

        assert!(duplicate.is_err(), "a second BK1 should violate the unique index");
    }
}
