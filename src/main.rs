use arbot::cli::{Cli, Commands};
use arbot::cli::{control, run, status};
use clap::Parser;
use tracing::error;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Run(args) => run::execute(&cli.config, cli.log_level.as_deref(), args).await,
        Commands::Status(args) => status::execute(args).await,
        Commands::EmergencyStop(args) => control::emergency_stop(args).await,
        Commands::CircuitBreakerReset(args) => control::circuit_breaker_reset(args).await,
        Commands::ReloadConfig(args) => control::reload_config(args).await,
        Commands::Strategies => {
            arbot::cli::strategies::list();
            Ok(())
        }
    };

    if let Err(err) = result {
        error!(error = %err, "arbot exited with error");
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
