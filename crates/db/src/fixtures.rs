use sqlx::Executor;
use tracing::info;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Row counts the demo dataset is expected to produce, keyed by table.
const SEED_TABLE_COUNTS: &[SeedTableContract] = &[
    SeedTableContract { table: "feature", id_column: "id", id_prefix: "feat-", expected: 6 },
    SeedTableContract { table: "benefit", id_column: "id", id_prefix: "ben-", expected: 5 },
    SeedTableContract { table: "question", id_column: "id", id_prefix: "q-", expected: 3 },
    SeedTableContract { table: "answer_option", id_column: "id", id_prefix: "opt-", expected: 8 },
    SeedTableContract {
        table: "store_product",
        id_column: "store_id",
        id_prefix: "store-demo",
        expected: 10,
    },
    SeedTableContract {
        table: "session_answer",
        id_column: "session_id",
        id_prefix: "sess-demo",
        expected: 3,
    },
];

/// Active product count per category in the demo catalog.
const SEED_CATEGORIES: &[(&str, i64)] =
    &[("frame", 7), ("sunglass", 3), ("lens", 2), ("contact_lens", 0)];

const SEED_PRODUCT_IDS: &[&str] = &[
    "fr-aria", "fr-brio", "fr-cleo", "fr-dara", "fr-elio", "fr-faro", "fr-gala", "fr-hale",
    "sg-dune", "sg-mesa", "sg-sol", "ln-clear", "ln-drive",
];

pub const DEMO_STORE_ID: &str = "store-demo";
pub const DEMO_SESSION_ID: &str = "sess-demo";

/// Deterministic eyewear catalog, questionnaire, store and answered session.
pub struct DemoSeedDataset;

impl DemoSeedDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_seed_data.sql");

    /// Load the dataset. Safe to call repeatedly; existing rows are left untouched.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;

        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;
        info!(
            event_name = "persistence.seed.loaded",
            store_id = DEMO_STORE_ID,
            session_id = DEMO_SESSION_ID,
            "demo dataset loaded"
        );

        Ok(SeedResult {
            store_id: DEMO_STORE_ID,
            session_id: DEMO_SESSION_ID,
            products_seeded: SEED_PRODUCT_IDS.len(),
        })
    }

    /// Verify that the seeded rows exist and match the contract.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for contract in SEED_TABLE_COUNTS {
            let count: i64 = sqlx::query_scalar(&format!(
                "SELECT COUNT(1) FROM {} WHERE {} LIKE ?1 || '%'",
                contract.table, contract.id_column
            ))
            .bind(contract.id_prefix)
            .fetch_one(pool)
            .await?;
            checks.push((contract.table, count == contract.expected));
        }

        let quoted_products = sql_array_from_ids(SEED_PRODUCT_IDS);
        let product_count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(1) FROM product WHERE id IN {quoted_products}"
        ))
        .fetch_one(pool)
        .await?;
        checks.push(("product", product_count == SEED_PRODUCT_IDS.len() as i64));

        for (product_type, expected) in SEED_CATEGORIES {
            let active: i64 = sqlx::query_scalar(&format!(
                "SELECT COUNT(1) FROM product WHERE product_type = ?1 AND active = 1 AND id IN {quoted_products}"
            ))
            .bind(product_type)
            .fetch_one(pool)
            .await?;
            checks.push((category_label(product_type), active == *expected));
        }

        let store_exists: i64 =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM store WHERE id = ?1)")
                .bind(DEMO_STORE_ID)
                .fetch_one(pool)
                .await?;
        checks.push(("store", store_exists == 1));

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }

    /// Remove every seeded row, leaving other data alone.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;
        let quoted_products = sql_array_from_ids(SEED_PRODUCT_IDS);

        sqlx::query("DELETE FROM session_recommendation WHERE session_id = ?1")
            .bind(DEMO_SESSION_ID)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM session_answer WHERE session_id = ?1")
            .bind(DEMO_SESSION_ID)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM store WHERE id = ?1")
            .bind(DEMO_STORE_ID)
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM product WHERE id IN {quoted_products}"))
            .execute(&mut *tx)
            .await?;
        for table in ["feature_benefit_mapping", "feature_mapping"] {
            sqlx::query(&format!("DELETE FROM {table} WHERE feature_id LIKE 'feat-%'"))
                .execute(&mut *tx)
                .await?;
        }
        sqlx::query("DELETE FROM question WHERE id LIKE 'q-%'").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM benefit WHERE organization_id = 'org-demo'")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM feature WHERE id LIKE 'feat-%'").execute(&mut *tx).await?;

        tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedTableContract {
    table: &'static str,
    id_column: &'static str,
    id_prefix: &'static str,
    expected: i64,
}

fn category_label(product_type: &str) -> &'static str {
    match product_type {
        "frame" => "active-frames",
        "sunglass" => "active-sunglasses",
        "lens" => "active-lenses",
        _ => "active-contact-lenses",
    }
}

fn sql_array_from_ids(ids: &[&str]) -> String {
    let quoted = ids.iter().map(|id| format!("'{}'", id.replace('\'', "''"))).collect::<Vec<_>>();
    format!("({})", quoted.join(", "))
}

#[derive(Debug, Clone)]
pub struct SeedResult {
    pub store_id: &'static str,
    pub session_id: &'static str,
    pub products_seeded: usize,
}

#[derive(Debug, Clone)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

impl VerificationResult {
    pub fn failed_checks(&self) -> Vec<&'static str> {
        self.checks.iter().filter(|(_, ok)| !ok).map(|(label, _)| *label).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{DemoSeedDataset, DEMO_SESSION_ID};
    use crate::{connect_with_settings, migrations, DbPool};

    async fn migrated_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    #[tokio::test]
    async fn load_then_verify_passes() {
        let pool = migrated_pool().await;

        let seeded = DemoSeedDataset::load(&pool).await.expect("load");
        assert_eq!(seeded.session_id, DEMO_SESSION_ID);

        let verification = DemoSeedDataset::verify(&pool).await.expect("verify");
        assert!(verification.all_present, "failed checks: {:?}", verification.failed_checks());
    }

    #[tokio::test]
    async fn load_is_idempotent() {
        let pool = migrated_pool().await;

        DemoSeedDataset::load(&pool).await.expect("first load");
        DemoSeedDataset::load(&pool).await.expect("second load");

        let verification = DemoSeedDataset::verify(&pool).await.expect("verify");
        assert!(verification.all_present, "failed checks: {:?}", verification.failed_checks());
    }

    #[tokio::test]
    async fn verify_fails_on_empty_database_and_after_clean() {
        let pool = migrated_pool().await;

        let empty = DemoSeedDataset::verify(&pool).await.expect("verify empty");
        assert!(!empty.all_present);

        DemoSeedDataset::load(&pool).await.expect("load");
        DemoSeedDataset::clean(&pool).await.expect("clean");

        let cleaned = DemoSeedDataset::verify(&pool).await.expect("verify cleaned");
        assert!(!cleaned.all_present);
        assert!(cleaned.failed_checks().contains(&"product"));
    }
}
