use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use eyematch_core::config::AppConfig;
use eyematch_core::domain::questionnaire::SessionId;
use eyematch_core::errors::{ApplicationError, InterfaceError};
use eyematch_core::recommend::{
    ProductCategory, RankedRecommendation, RecommendationRequest, RecommendationService,
};
use eyematch_db::repositories::{
    RecommendationRepository, SqlRecommendationRepository, SqlRecommendationSource,
};
use eyematch_db::DbPool;

#[derive(Clone)]
pub struct ApiState {
    service: Arc<RecommendationService<SqlRecommendationSource>>,
    repository: Arc<SqlRecommendationRepository>,
}

impl ApiState {
    pub fn new(config: &AppConfig, db_pool: DbPool) -> Self {
        let service = RecommendationService::new(
            SqlRecommendationSource::new(db_pool.clone()),
            config.recommendation.engine(),
        )
        .with_default_limit(config.recommendation.default_limit);

        Self {
            service: Arc::new(service),
            repository: Arc::new(SqlRecommendationRepository::new(db_pool)),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RecommendationBody {
    pub store_id: String,
    pub category: String,
    pub limit: Option<usize>,
    #[serde(default)]
    pub save: bool,
}

#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub session_id: String,
    pub store_id: String,
    pub category: ProductCategory,
    pub answer_count: usize,
    pub candidate_count: usize,
    pub saved: bool,
    pub recommendations: Vec<RankedRecommendation>,
}

#[derive(Debug, Serialize)]
pub struct StoredRecommendations {
    pub session_id: String,
    pub recommendations: Vec<RankedRecommendation>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: &'static str,
    pub message: String,
    pub correlation_id: String,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route(
            "/api/sessions/{session_id}/recommendations",
            post(generate_recommendations).get(list_recommendations),
        )
        .with_state(state)
}

pub async fn generate_recommendations(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
    Json(body): Json<RecommendationBody>,
) -> ApiResult<RecommendationResponse> {
    let correlation_id = Uuid::new_v4().to_string();

    let category = body.category.parse::<ProductCategory>().map_err(|error| {
        reject(ApplicationError::from(error).into_interface(correlation_id.clone()))
    })?;
    let mut request = RecommendationRequest::new(session_id, body.store_id, category);
    request.limit = body.limit;

    let run = state
        .service
        .generate(&request)
        .await
        .map_err(|error| reject(error.into_interface(correlation_id.clone())))?;

    if run.answer_count == 0 {
        return Err(reject(InterfaceError::Conflict {
            message: format!("session `{}` has no questionnaire answers", run.session_id.0),
            correlation_id,
        }));
    }

    if body.save {
        state.repository.save_ranked(&run).await.map_err(|error| {
            reject(
                ApplicationError::Persistence(error.to_string())
                    .into_interface(correlation_id.clone()),
            )
        })?;
    }

    info!(
        event_name = "api.recommendations.generated",
        correlation_id = %correlation_id,
        session_id = %run.session_id.0,
        returned = run.recommendations.len(),
        saved = body.save,
        "recommendations served"
    );

    Ok(Json(RecommendationResponse {
        session_id: run.session_id.0,
        store_id: run.store_id.0,
        category: run.category,
        answer_count: run.answer_count,
        candidate_count: run.candidate_count,
        saved: body.save,
        recommendations: RankedRecommendation::from_ordered(run.recommendations),
    }))
}

pub async fn list_recommendations(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
) -> ApiResult<StoredRecommendations> {
    let correlation_id = Uuid::new_v4().to_string();
    let session_id = SessionId(session_id);

    let recommendations = state.repository.list_for_session(&session_id).await.map_err(|error| {
        reject(ApplicationError::Persistence(error.to_string()).into_interface(correlation_id))
    })?;

    Ok(Json(StoredRecommendations { session_id: session_id.0, recommendations }))
}

fn reject(error: InterfaceError) -> (StatusCode, Json<ApiError>) {
    let (status, error_class) = match &error {
        InterfaceError::BadRequest { .. } => (StatusCode::BAD_REQUEST, "bad_request"),
        InterfaceError::Conflict { .. } => (StatusCode::CONFLICT, "conflict"),
        InterfaceError::ServiceUnavailable { .. } => {
            (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable")
        }
        InterfaceError::Internal { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
    };

    warn!(
        event_name = "api.recommendations.rejected",
        correlation_id = %error.correlation_id(),
        error_class,
        error = %error,
        "recommendation request rejected"
    );

    (
        status,
        Json(ApiError {
            error: error_class,
            message: error.user_message().to_string(),
            correlation_id: error.correlation_id().to_string(),
        }),
    )
}
