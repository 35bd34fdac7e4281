use crate::commands::{prepare, CommandResult};
use eyematch_db::{connect_with_settings, migrations, DemoSeedDataset, SeedResult};

pub fn run() -> CommandResult {
    let (config, runtime) = match prepare("seed") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let seed_result = DemoSeedDataset::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        let verification = DemoSeedDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        let run_result: Result<SeedResult, (&'static str, String, u8)> =
            if verification.all_present {
                Ok(seed_result)
            } else {
                Err(("seed_verification", verification_message(&verification.failed_checks()), 6u8))
            };

        pool.close().await;
        run_result
    });

    match result {
        Ok(seeded) => CommandResult::success(
            "seed",
            format!(
                "demo dataset loaded: {} products, store `{}`, answered session `{}`",
                seeded.products_seeded, seeded.store_id, seeded.session_id
            ),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

fn verification_message(failed_checks: &[&str]) -> String {
    if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed_checks.join(", "))
    }
}
