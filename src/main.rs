//! bb CLI binary entry point.

use bitbucket_cli::cli::{AuthCommands, Cli, Commands, ConfigCommands};
use bitbucket_cli::error::BbError;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Auth(auth_args) => match auth_args.command {
            AuthCommands::Setup => bitbucket_cli::cli::auth::handle_setup(),
            AuthCommands::Login(args) => bitbucket_cli::cli::auth::handle_login(&args).await,
            AuthCommands::Logout => bitbucket_cli::cli::auth::handle_logout(),
            AuthCommands::Status => bitbucket_cli::cli::auth::handle_status(),
        },
        Commands::Config(config_args) => match config_args.command {
            ConfigCommands::View => bitbucket_cli::cli::config::handle_view(),
            ConfigCommands::SetDefaultWorkspace { workspace } => {
                bitbucket_cli::cli::config::handle_set_default_workspace(&workspace)
            }
            ConfigCommands::SetFormat { format } => {
                bitbucket_cli::cli::config::handle_set_format(&format)
            }
        },
        Commands::Api(args) => bitbucket_cli::cli::api::handle_api(&args).await,
    };

    if let Err(e) = result {
        report(&e);
        std::process::exit(1);
    }
}

fn report(error: &BbError) {
    eprintln!("Error: {error}");
    if let Some(hint) = error.recovery_suggestion().hint() {
        eprintln!("Hint: {hint}");
    }
}

/// Log to stderr, filtered by `BB_LOG` (default `warn`).
fn init_tracing() {
    let env_filter = EnvFilter::try_from_env("BB_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
