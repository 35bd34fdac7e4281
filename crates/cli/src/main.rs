use std::process::ExitCode;

fn main() -> ExitCode {
    eyematch_cli::run()
}
