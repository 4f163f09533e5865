use std::process::ExitCode;

fn main() -> ExitCode {
    spec_runner::cli::run()
}
