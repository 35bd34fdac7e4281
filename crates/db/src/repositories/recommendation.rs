use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use tracing::debug;

use eyematch_core::domain::product::ProductId;
use eyematch_core::domain::questionnaire::SessionId;
use eyematch_core::recommend::{RankedRecommendation, RecommendationRun, ScoredCandidate};

use super::source::{decode, parse_decimal};
use super::{RecommendationRepository, RepositoryError};
use crate::DbPool;

pub struct SqlRecommendationRepository {
    pool: DbPool,
}

impl SqlRecommendationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_ranked(row: &SqliteRow) -> Result<RankedRecommendation, RepositoryError> {
    let rank: i64 = decode(row, "rank")?;
    let store_price: String = decode(row, "store_price")?;

    Ok(RankedRecommendation {
        rank: u32::try_from(rank)
            .map_err(|_| RepositoryError::Decode(format!("rank out of range: {rank}")))?,
        candidate: ScoredCandidate {
            product_id: ProductId(decode(row, "product_id")?),
            brand: decode(row, "brand")?,
            feature_score: decode(row, "feature_score")?,
            benefit_score: decode(row, "benefit_score")?,
            interconnected_score: decode(row, "interconnected_score")?,
            match_score: decode(row, "match_score")?,
            store_price: parse_decimal("store_price", &store_price)?,
            in_stock: decode(row, "in_stock")?,
        },
        is_selected: decode(row, "is_selected")?,
    })
}

#[async_trait]
impl RecommendationRepository for SqlRecommendationRepository {
    async fn save_ranked(&self, run: &RecommendationRun) -> Result<usize, RepositoryError> {
        let created_at = Utc::now().to_rfc3339();
        let ranked = RankedRecommendation::from_ordered(run.recommendations.clone());
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM session_recommendation WHERE session_id = ?")
            .bind(&run.session_id.0)
            .execute(&mut *tx)
            .await?;

        for entry in &ranked {
            let candidate = &entry.candidate;
            sqlx::query(
                "INSERT INTO session_recommendation (
                    session_id, product_id, store_id, product_type, rank, match_score,
                    feature_score, benefit_score, interconnected_score, store_price, in_stock,
                    is_selected, created_at
                 ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&run.session_id.0)
            .bind(&candidate.product_id.0)
            .bind(&run.store_id.0)
            .bind(run.category.product_type())
            .bind(i64::from(entry.rank))
            .bind(candidate.match_score)
            .bind(candidate.feature_score)
            .bind(candidate.benefit_score)
            .bind(candidate.interconnected_score)
            .bind(candidate.store_price.to_string())
            .bind(candidate.in_stock)
            .bind(entry.is_selected)
            .bind(&created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(
            event_name = "persistence.recommendations.saved",
            session_id = %run.session_id.0,
            rows = ranked.len(),
            "session recommendations replaced"
        );
        Ok(ranked.len())
    }

    async fn list_for_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<RankedRecommendation>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT sr.product_id, p.brand, sr.rank, sr.match_score, sr.feature_score,
                    sr.benefit_score, sr.interconnected_score, sr.store_price, sr.in_stock,
                    sr.is_selected
             FROM session_recommendation sr
             LEFT JOIN product p ON p.id = sr.product_id
             WHERE sr.session_id = ?
             ORDER BY sr.rank ASC",
        )
        .bind(&session_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_ranked).collect()
    }
}
