pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use commands::recommend::RecommendArgs;

#[derive(Debug, Parser)]
#[command(
    name = "eyematch",
    about = "Eyematch operator CLI",
    long_about = "Apply migrations, load the demo catalog, inspect configuration, and generate eyewear recommendations.",
    after_help = "Examples:\n  eyematch migrate\n  eyematch seed\n  eyematch recommend --session sess-demo --store store-demo --category frames --save"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo catalog, store and answered session")]
    Seed,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Generate ranked recommendations for an answered session")]
    Recommend(RecommendArgs),
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Recommend(args) => commands::recommend::run(args),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::{Cli, Command};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn recommend_arguments_parse() {
        let cli = Cli::try_parse_from([
            "eyematch",
            "recommend",
            "--session",
            "sess-1",
            "--store",
            "store-1",
            "--category",
            "sunglasses",
            "--limit",
            "3",
            "--save",
        ])
        .expect("parse recommend");

        match cli.command {
            Command::Recommend(args) => {
                assert_eq!(args.session, "sess-1");
                assert_eq!(args.store, "store-1");
                assert_eq!(args.category, "sunglasses");
                assert_eq!(args.limit, Some(3));
                assert!(args.save);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
