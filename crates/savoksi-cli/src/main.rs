use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::init();
    savoksi_cli::run()
}
