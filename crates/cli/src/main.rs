use std::process::ExitCode;

fn main() -> ExitCode {
    washline_cli::run()
}
