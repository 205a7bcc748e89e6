//! sqlchat - chat with a SQL database from the terminal.

use sqlchat::app::Orchestrator;
use sqlchat::cli::Cli;
use sqlchat::config::Config;
use sqlchat::error::Result;
use sqlchat::logging;
use sqlchat::tui::{self, SidebarForm};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // A .env file may carry GROQ_API_KEY
    let _ = dotenvy::dotenv();

    let cli = Cli::parse_args();

    if cli.headless {
        logging::init_stderr_logging();
    } else {
        logging::init_file_logging();
    }

    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("{}: {}", e.category(), e);
            eprintln!("{}: {}", e.category(), e.message());
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<i32> {
    let config_path = cli.config_path();
    info!(path = %config_path.display(), "Loading config");
    let mut config = Config::load_from_file(&config_path)?;
    cli.apply_overrides(&mut config);

    let form = SidebarForm::new(&config.remote, cli.api_key());
    let orchestrator = Orchestrator::new(config, cli.provider());

    if cli.headless {
        return tui::headless::run_headless(&cli, orchestrator, form).await;
    }

    tui::run_async(orchestrator, form).await?;
    Ok(0)
}
