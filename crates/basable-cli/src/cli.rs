mod args;
mod commands;
mod filter_arg;
mod logging;
mod output;

use clap::Parser;

use args::Cli;
use logging::LoggingConfig;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_config = LoggingConfig::for_verbosity(cli.verbose).with_json_logs(cli.log_file);
    let log_guard = match logging::init(log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Warning: logging disabled: {e}");
            None
        }
    };

    if let Err(e) = commands::run(cli).await {
        eprintln!("Error: {e:#}");
        drop(log_guard);
        std::process::exit(1);
    }
}
