use std::process::ExitCode;

fn main() -> ExitCode {
    orcamento_cli::run()
}
