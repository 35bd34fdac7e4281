use clap::Args;
use serde::Serialize;

use crate::commands::{prepare, CommandResult};
use eyematch_core::config::AppConfig;
use eyematch_core::recommend::{
    ProductCategory, RankedRecommendation, RecommendationRequest, RecommendationRun,
    RecommendationService,
};
use eyematch_db::{connect_with_settings, DbPool};
use eyematch_db::repositories::{
    RecommendationRepository, SqlRecommendationRepository, SqlRecommendationSource,
};

#[derive(Debug, Args)]
pub struct RecommendArgs {
    #[arg(long, help = "Session whose questionnaire answers drive the ranking")]
    pub session: String,
    #[arg(long, help = "Store used for prices and stock")]
    pub store: String,
    #[arg(long, help = "frames | sunglasses | lenses | contact_lenses")]
    pub category: String,
    #[arg(long, help = "Maximum number of recommendations (defaults to recommendation.default_limit)")]
    pub limit: Option<usize>,
    #[arg(long, help = "Persist the ranked list for the session, replacing earlier results")]
    pub save: bool,
}

pub fn run(args: RecommendArgs) -> CommandResult {
    let category = match args.category.parse::<ProductCategory>() {
        Ok(category) => category,
        Err(error) => {
            return CommandResult::failure("recommend", "invalid_argument", error.to_string(), 2);
        }
    };
    if args.limit == Some(0) {
        return CommandResult::failure(
            "recommend",
            "invalid_argument",
            "--limit must be greater than zero",
            2,
        );
    }

    let (config, runtime) = match prepare("recommend") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let mut request = RecommendationRequest::new(args.session, args.store, category);
    request.limit = args.limit;
    let save = args.save;

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        generate_and_close(&config, pool, &request, save).await
    });

    match result {
        Ok((run, saved)) => {
            let mut message = format!(
                "ranked {} of {} candidates for session `{}`",
                run.recommendations.len(),
                run.candidate_count,
                run.session_id.0
            );
            if let Some(written) = saved {
                message.push_str(&format!(" and saved {written}"));
            }
            match render_run(&run, saved.is_some()) {
                Ok(data) => CommandResult::success_with_data("recommend", message, Some(data)),
                Err(error) => {
                    CommandResult::failure("recommend", "serialization", error.to_string(), 3)
                }
            }
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("recommend", error_class, message, exit_code)
        }
    }
}

type RunFailure = (&'static str, String, u8);

/// Generate, optionally persist, and close `pool` whether or not either step failed.
async fn generate_and_close(
    config: &AppConfig,
    pool: DbPool,
    request: &RecommendationRequest,
    save: bool,
) -> Result<(RecommendationRun, Option<usize>), RunFailure> {
    let outcome = generate_on(config, &pool, request, save).await;
    pool.close().await;
    outcome
}

async fn generate_on(
    config: &AppConfig,
    pool: &DbPool,
    request: &RecommendationRequest,
    save: bool,
) -> Result<(RecommendationRun, Option<usize>), RunFailure> {
    let service = build_service(config, SqlRecommendationSource::new(pool.clone()));
    let run = service
        .generate(request)
        .await
        .map_err(|error| ("recommendation", error.to_string(), 6u8))?;

    if !save {
        return Ok((run, None));
    }

    let written = SqlRecommendationRepository::new(pool.clone())
        .save_ranked(&run)
        .await
        .map_err(|error| ("persistence", error.to_string(), 7u8))?;
    Ok((run, Some(written)))
}

fn build_service(
    config: &AppConfig,
    source: SqlRecommendationSource,
) -> RecommendationService<SqlRecommendationSource> {
    RecommendationService::new(source, config.recommendation.engine())
        .with_default_limit(config.recommendation.default_limit)
}

/// Same shape as the HTTP API response body.
#[derive(Debug, Serialize)]
struct RunReport<'a> {
    session_id: &'a str,
    store_id: &'a str,
    category: ProductCategory,
    answer_count: usize,
    candidate_count: usize,
    saved: bool,
    recommendations: Vec<RankedRecommendation>,
}

fn render_run(
    run: &RecommendationRun,
    saved: bool,
) -> Result<serde_json::Value, serde_json::Error> {
    serde_json::to_value(RunReport {
        session_id: &run.session_id.0,
        store_id: &run.store_id.0,
        category: run.category,
        answer_count: run.answer_count,
        candidate_count: run.candidate_count,
        saved,
        recommendations: RankedRecommendation::from_ordered(run.recommendations.clone()),
    })
}
