use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};

use eyematch_core::domain::catalog::{BenefitId, FeatureBenefitMapping, FeatureId};
use eyematch_core::domain::product::{CandidateProduct, Product, ProductBenefit, ProductFeature, ProductId};
use eyematch_core::domain::questionnaire::{
    Answer, AnswerBenefitMapping, FeatureMapping, OptionId, QuestionId, SessionId,
};
use eyematch_core::domain::store::{StoreId, StoreProduct};
use eyematch_core::recommend::{RecommendationSource, SourceError};

use super::RepositoryError;
use crate::DbPool;

/// SQLite-backed bulk reads for recommendation runs.
///
/// Each trait method issues one statement per entity type regardless of how many answers or
/// candidates are involved. Dangling benefit references are resolved with `LEFT JOIN` and
/// surface as `None` codes.
pub struct SqlRecommendationSource {
    pool: DbPool,
}

impl SqlRecommendationSource {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn load_answers(&self, session_id: &SessionId) -> Result<Vec<Answer>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT sa.question_id, sa.option_id, ao.option_key
             FROM session_answer sa
             JOIN answer_option ao ON ao.id = sa.option_id
             WHERE sa.session_id = ?
             ORDER BY sa.rowid",
        )
        .bind(&session_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(Answer {
                    question_id: QuestionId(decode(row, "question_id")?),
                    option_id: OptionId(decode(row, "option_id")?),
                    option_key: decode(row, "option_key")?,
                })
            })
            .collect()
    }

    async fn load_feature_mappings(
        &self,
        answers: &[Answer],
    ) -> Result<Vec<FeatureMapping>, RepositoryError> {
        if answers.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT question_id, option_key, feature_id, weight
             FROM feature_mapping
             WHERE (question_id, option_key) IN (",
        );
        builder.push_values(answers, |mut tuple, answer| {
            tuple.push_bind(answer.question_id.0.clone()).push_bind(answer.option_key.clone());
        });
        builder.push(") ORDER BY rowid");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| {
                Ok(FeatureMapping {
                    question_id: QuestionId(decode(row, "question_id")?),
                    option_key: decode(row, "option_key")?,
                    feature_id: FeatureId(decode(row, "feature_id")?),
                    weight: decode(row, "weight")?,
                })
            })
            .collect()
    }

    async fn load_answer_benefit_mappings(
        &self,
        option_ids: &[OptionId],
    ) -> Result<Vec<AnswerBenefitMapping>, RepositoryError> {
        if option_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT abm.option_id, abm.benefit_id, b.code AS benefit_code, abm.points
             FROM answer_benefit_mapping abm
             LEFT JOIN benefit b ON b.id = abm.benefit_id
             WHERE abm.option_id IN (",
        );
        let mut ids = builder.separated(", ");
        for option_id in option_ids {
            ids.push_bind(option_id.0.clone());
        }
        ids.push_unseparated(") ORDER BY abm.rowid");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| {
                Ok(AnswerBenefitMapping {
                    option_id: OptionId(decode(row, "option_id")?),
                    benefit_id: BenefitId(decode(row, "benefit_id")?),
                    benefit_code: decode(row, "benefit_code")?,
                    points: decode(row, "points")?,
                })
            })
            .collect()
    }

    async fn load_products(&self, product_type: &str) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, sku, name, brand, product_type, base_price, active
             FROM product
             WHERE product_type = ? AND active = 1
             ORDER BY rowid",
        )
        .bind(product_type)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_product).collect()
    }

    async fn load_candidates(
        &self,
        product_type: &str,
    ) -> Result<Vec<CandidateProduct>, RepositoryError> {
        let products = self.load_products(product_type).await?;
        if products.is_empty() {
            return Ok(Vec::new());
        }

        let feature_rows = sqlx::query(
            "SELECT pf.product_id, pf.feature_id, pf.strength
             FROM product_feature pf
             JOIN product p ON p.id = pf.product_id
             WHERE p.product_type = ? AND p.active = 1
             ORDER BY pf.rowid",
        )
        .bind(product_type)
        .fetch_all(&self.pool)
        .await?;

        let benefit_rows = sqlx::query(
            "SELECT pb.product_id, pb.benefit_id, b.code AS benefit_code, pb.strength
             FROM product_benefit pb
             JOIN product p ON p.id = pb.product_id
             LEFT JOIN benefit b ON b.id = pb.benefit_id
             WHERE p.product_type = ? AND p.active = 1
             ORDER BY pb.rowid",
        )
        .bind(product_type)
        .fetch_all(&self.pool)
        .await?;

        let mut candidates: Vec<CandidateProduct> =
            products.into_iter().map(CandidateProduct::new).collect();
        let positions: HashMap<String, usize> = candidates
            .iter()
            .enumerate()
            .map(|(index, candidate)| (candidate.product.id.0.clone(), index))
            .collect();

        for row in &feature_rows {
            let product_id: String = decode(row, "product_id")?;
            if let Some(&index) = positions.get(&product_id) {
                candidates[index].features.push(ProductFeature {
                    product_id: ProductId(product_id),
                    feature_id: FeatureId(decode(row, "feature_id")?),
                    strength: decode(row, "strength")?,
                });
            }
        }

        for row in &benefit_rows {
            let product_id: String = decode(row, "product_id")?;
            if let Some(&index) = positions.get(&product_id) {
                candidates[index].benefits.push(ProductBenefit {
                    product_id: ProductId(product_id),
                    benefit_id: BenefitId(decode(row, "benefit_id")?),
                    benefit_code: decode(row, "benefit_code")?,
                    strength: decode(row, "strength")?,
                });
            }
        }

        Ok(candidates)
    }

    async fn load_feature_benefit_mappings(
        &self,
        feature_ids: &[FeatureId],
    ) -> Result<Vec<FeatureBenefitMapping>, RepositoryError> {
        if feature_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT fbm.feature_id, fbm.benefit_id, b.code AS benefit_code, fbm.weight
             FROM feature_benefit_mapping fbm
             LEFT JOIN benefit b ON b.id = fbm.benefit_id
             WHERE fbm.feature_id IN (",
        );
        let mut ids = builder.separated(", ");
        for feature_id in feature_ids {
            ids.push_bind(feature_id.0.clone());
        }
        ids.push_unseparated(") ORDER BY fbm.rowid");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| {
                Ok(FeatureBenefitMapping {
                    feature_id: FeatureId(decode(row, "feature_id")?),
                    benefit_id: BenefitId(decode(row, "benefit_id")?),
                    benefit_code: decode(row, "benefit_code")?,
                    weight: decode(row, "weight")?,
                })
            })
            .collect()
    }

    async fn load_store_products(
        &self,
        store_id: &StoreId,
        product_ids: &[ProductId],
    ) -> Result<Vec<StoreProduct>, RepositoryError> {
        if product_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT store_id, product_id, price_override, is_available, quantity
             FROM store_product
             WHERE store_id = ",
        );
        builder.push_bind(store_id.0.clone());
        builder.push(" AND product_id IN (");
        let mut ids = builder.separated(", ");
        for product_id in product_ids {
            ids.push_bind(product_id.0.clone());
        }
        ids.push_unseparated(") ORDER BY rowid");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_store_product).collect()
    }
}

#[async_trait]
impl RecommendationSource for SqlRecommendationSource {
    async fn session_answers(&self, session_id: &SessionId) -> Result<Vec<Answer>, SourceError> {
        self.load_answers(session_id).await.map_err(|error| error.into_source("session_answer"))
    }

    async fn feature_mappings(&self, answers: &[Answer]) -> Result<Vec<FeatureMapping>, SourceError> {
        self.load_feature_mappings(answers)
            .await
            .map_err(|error| error.into_source("feature_mapping"))
    }

    async fn answer_benefit_mappings(
        &self,
        option_ids: &[OptionId],
    ) -> Result<Vec<AnswerBenefitMapping>, SourceError> {
        self.load_answer_benefit_mappings(option_ids)
            .await
            .map_err(|error| error.into_source("answer_benefit_mapping"))
    }

    async fn active_candidates(
        &self,
        product_type: &str,
    ) -> Result<Vec<CandidateProduct>, SourceError> {
        self.load_candidates(product_type).await.map_err(|error| error.into_source("product"))
    }

    async fn feature_benefit_mappings(
        &self,
        feature_ids: &[FeatureId],
    ) -> Result<Vec<FeatureBenefitMapping>, SourceError> {
        self.load_feature_benefit_mappings(feature_ids)
            .await
            .map_err(|error| error.into_source("feature_benefit_mapping"))
    }

    async fn store_products(
        &self,
        store_id: &StoreId,
        product_ids: &[ProductId],
    ) -> Result<Vec<StoreProduct>, SourceError> {
        self.load_store_products(store_id, product_ids)
            .await
            .map_err(|error| error.into_source("store_product"))
    }
}

pub(crate) fn decode<'r, T>(row: &'r SqliteRow, column: &str) -> Result<T, RepositoryError>
where
    T: sqlx::Decode<'r, Sqlite> + sqlx::Type<Sqlite>,
{
    row.try_get(column).map_err(|e| RepositoryError::Decode(e.to_string()))
}

pub(crate) fn parse_decimal(column: &str, raw: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(raw)
        .map_err(|e| RepositoryError::Decode(format!("invalid decimal in {column}: {e}")))
}

fn row_to_product(row: &SqliteRow) -> Result<Product, RepositoryError> {
    let base_price: String = decode(row, "base_price")?;
    Ok(Product {
        id: ProductId(decode(row, "id")?),
        sku: decode(row, "sku")?,
        name: decode(row, "name")?,
        brand: decode(row, "brand")?,
        product_type: decode(row, "product_type")?,
        base_price: parse_decimal("base_price", &base_price)?,
        active: decode(row, "active")?,
    })
}

fn row_to_store_product(row: &SqliteRow) -> Result<StoreProduct, RepositoryError> {
    let price_override: Option<String> = decode(row, "price_override")?;
    Ok(StoreProduct {
        store_id: StoreId(decode(row, "store_id")?),
        product_id: ProductId(decode(row, "product_id")?),
        price_override: price_override
            .as_deref()
            .map(|raw| parse_decimal("price_override", raw))
            .transpose()?,
        is_available: decode(row, "is_available")?,
        quantity: decode(row, "quantity")?,
    })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use eyematch_core::domain::catalog::FeatureId;
    use eyematch_core::domain::product::ProductId;
    use eyematch_core::domain::questionnaire::{Answer, OptionId, SessionId};
    use eyematch_core::domain::store::StoreId;
    use eyematch_core::recommend::{
        ProductCategory, RecommendationEngine, RecommendationRequest, RecommendationService,
        RecommendationSource,
    };

    use super::SqlRecommendationSource;
    use crate::{connect_with_settings, migrations, DbPool};

    async fn setup() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

        sqlx::query(
            "INSERT INTO feature (id, code, name) VALUES
                ('feat-blue', 'blue_filter', 'Blue light filter'),
                ('feat-ar', 'anti_reflective', 'Anti-reflective coating');
             INSERT INTO benefit (id, organization_id, code, name) VALUES
                ('ben-comfort', 'org-1', 'EYE_COMFORT', 'Eye comfort');
             INSERT INTO question (id, code, prompt, display_order) VALUES
                ('q-screen', 'screen_time', 'Daily screen time?', 1);
             INSERT INTO answer_option (id, question_id, option_key, label, display_order) VALUES
                ('opt-high', 'q-screen', 'high', 'More than 6 hours', 1),
                ('opt-low', 'q-screen', 'low', 'Under 2 hours', 2);
             INSERT INTO feature_mapping (question_id, option_key, feature_id, weight) VALUES
                ('q-screen', 'high', 'feat-blue', 2.0),
                ('q-screen', 'low', 'feat-ar', 1.0);
             INSERT INTO answer_benefit_mapping (option_id, benefit_id, points) VALUES
                ('opt-high', 'ben-comfort', 3.0),
                ('opt-high', 'ben-retired', 1.0);
             INSERT INTO feature_benefit_mapping (feature_id, benefit_id, weight) VALUES
                ('feat-blue', 'ben-comfort', 1.0);
             INSERT INTO product (id, sku, name, brand, product_type, base_price, active) VALUES
                ('frame-1', 'FR-001', 'Aria', 'Lumen', 'frame', '149.00', 1),
                ('frame-2', 'FR-002', 'Brio', NULL, 'frame', '99.50', 1),
                ('frame-3', 'FR-003', 'Cleo', 'Vista', 'frame', '120.00', 0),
                ('sun-1', 'SN-001', 'Dune', 'Vista', 'sunglass', '180.00', 1);
             INSERT INTO product_feature (product_id, feature_id, strength) VALUES
                ('frame-1', 'feat-blue', 2.0),
                ('frame-3', 'feat-blue', 2.0);
             INSERT INTO product_benefit (product_id, benefit_id, strength) VALUES
                ('frame-1', 'ben-comfort', 3.0),
                ('frame-2', 'ben-retired', 2.0);
             INSERT INTO store (id, organization_id, name) VALUES ('store-1', 'org-1', 'Downtown');
             INSERT INTO store_product (store_id, product_id, price_override, is_available, quantity) VALUES
                ('store-1', 'frame-1', '129.00', 1, 0),
                ('store-1', 'frame-2', NULL, 1, 3);
             INSERT INTO session_answer (session_id, question_id, option_id) VALUES
                ('sess-1', 'q-screen', 'opt-high');",
        )
        .execute(&pool)
        .await
        .expect("seed source rows");

        pool
    }

    #[tokio::test]
    async fn session_answers_carry_option_keys() {
        let source = SqlRecommendationSource::new(setup().await);

        let answers =
            source.session_answers(&SessionId("sess-1".to_string())).await.expect("answers");

        assert_eq!(answers, vec![Answer::new("q-screen", "opt-high", "high")]);
        let none =
            source.session_answers(&SessionId("sess-404".to_string())).await.expect("answers");
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn feature_mappings_match_question_and_option_key_pairs() {
        let source = SqlRecommendationSource::new(setup().await);
        let answers = vec![Answer::new("q-screen", "opt-high", "high")];

        let mappings = source.feature_mappings(&answers).await.expect("feature mappings");

        assert_eq!(mappings.len(), 1);
        assert_eq!(mappings[0].feature_id, FeatureId("feat-blue".to_string()));
        assert_eq!(mappings[0].weight, 2.0);
        assert!(source.feature_mappings(&[]).await.expect("empty").is_empty());
    }

    #[tokio::test]
    async fn dangling_benefit_references_resolve_to_none() {
        let source = SqlRecommendationSource::new(setup().await);

        let mappings = source
            .answer_benefit_mappings(&[OptionId("opt-high".to_string())])
            .await
            .expect("benefit mappings");

        assert_eq!(mappings.len(), 2);
        assert_eq!(mappings[0].benefit_code.as_deref(), Some("EYE_COMFORT"));
        assert_eq!(mappings[1].benefit_code, None);
    }

    #[tokio::test]
    async fn candidates_are_active_products_of_the_category_in_load_order() {
        let source = SqlRecommendationSource::new(setup().await);

        let candidates = source.active_candidates("frame").await.expect("candidates");

        let ids: Vec<&str> = candidates.iter().map(|c| c.product.id.0.as_str()).collect();
        assert_eq!(ids, vec!["frame-1", "frame-2"]);
        assert_eq!(candidates[0].product.base_price, Decimal::new(14_900, 2));
        assert_eq!(candidates[0].features.len(), 1);
        assert_eq!(candidates[0].benefits[0].benefit_code.as_deref(), Some("EYE_COMFORT"));
        assert_eq!(candidates[1].product.brand, None);
        assert_eq!(candidates[1].benefits[0].benefit_code, None);
        assert!(source.active_candidates("contact_lens").await.expect("empty").is_empty());
    }

    #[tokio::test]
    async fn store_products_are_scoped_to_store_and_ids() {
        let source = SqlRecommendationSource::new(setup().await);
        let ids = vec![ProductId("frame-1".to_string()), ProductId("sun-1".to_string())];

        let records =
            source.store_products(&StoreId("store-1".to_string()), &ids).await.expect("stock");

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].price_override, Some(Decimal::new(12_900, 2)));
        assert!(!records[0].in_stock());
    }

    #[tokio::test]
    async fn service_generates_from_sqlite_rows() {
        let service = RecommendationService::new(
            SqlRecommendationSource::new(setup().await),
            RecommendationEngine::default(),
        );
        let request = RecommendationRequest::new("sess-1", "store-1", ProductCategory::Frames);

        let run = service.generate(&request).await.expect("generate");

        let ids: Vec<&str> = run.recommendations.iter().map(|c| c.product_id.0.as_str()).collect();
        assert_eq!(ids, vec!["frame-2", "frame-1"], "in-stock frame-2 ranks first");
        let aria = &run.recommendations[1];
        assert_eq!(aria.feature_score, 100.0);
        assert_eq!(aria.benefit_score, 100.0);
        assert_eq!(aria.store_price, Decimal::new(12_900, 2));
    }
}
