use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub async fn run_pending(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

#[cfg(test)]
mod tests {
    use super::{run_pending, MIGRATOR};
    use crate::test_support::test_pool;

    const MANAGED_SCHEMA_OBJECTS: &[&str] = &["food_items", "orders", "order_tracking"];

    const MANAGED_ROUTINES: &[&str] =
        &["insert_order_item", "get_price_for_item", "get_total_order_price"];

    #[test]
    fn migrator_ships_at_least_one_migration() {
        assert!(MIGRATOR.iter().count() >= 1);
    }

    #[tokio::test]
    async fn migrations_create_order_tables_and_routines() {
        let Some(pool) = test_pool().await else {
            return;
        };
        run_pending(&pool).await.expect("run migrations");

        for table in MANAGED_SCHEMA_OBJECTS {
            let count: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM information_schema.tables
                 WHERE table_schema = 'public' AND table_name = $1",
            )
            .bind(table)
            .fetch_one(&pool)
            .await
            .expect("check table");
            assert_eq!(count, 1, "missing table {table}");
        }

        for routine in MANAGED_ROUTINES {
            let count: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM information_schema.routines
                 WHERE routine_schema = 'public' AND routine_name = $1",
            )
            .bind(routine)
            .fetch_one(&pool)
            .await
            .expect("check routine");
            assert!(count >= 1, "missing routine {routine}");
        }

        run_pending(&pool).await.expect("re-running migrations is a no-op");
        pool.close().await;
    }
}
