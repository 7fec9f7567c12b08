use std::process::ExitCode;

fn main() -> ExitCode {
    shelfrank_cli::run()
}
