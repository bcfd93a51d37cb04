use anyhow::Context;
use clap::{Parser, Subcommand};
use dashpilot_engine::config::{ConfigLoader, Credentials};
use dashpilot_engine::confirm::{HumanInput, ScriptedInput, StdinInput};
use dashpilot_engine::driver::Driver;
use dashpilot_engine::runlog::{FileRunLog, SharedLog};
use dashpilot_engine::session::SessionContext;
use dashpilot_engine::workflow::{self, Workflow};
use dashpilot_h::ChromiumDriver;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dashpilot", version, about = "Geckoboard dashboard automation")]
struct Args {
    #[command(subcommand)]
    mode: Mode,

    /// Config file (default: ./dashpilot.yaml, then ~/.dashpilot/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Run the browser without a window
    #[arg(long, global = true, conflicts_with = "visible")]
    headless: bool,

    /// Show the browser window even if the config says headless
    #[arg(long, global = true)]
    visible: bool,

    /// Answer confirmation questions from this file, one answer per line
    #[arg(long, global = true)]
    answers: Option<PathBuf>,

    /// Print the run report as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Clone, Copy)]
enum Mode {
    /// Log in, clean up, create and rename a dashboard, add and configure a widget
    Run,
    /// Log in and list dashboards without changing anything
    Check,
    /// Log in and delete stale test dashboards
    Cleanup,
}

impl From<Mode> for workflow::Mode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Run => workflow::Mode::Run,
            Mode::Check => workflow::Mode::Check,
            Mode::Cleanup => workflow::Mode::Cleanup,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Logs go to stderr; stdout carries prompts and the report.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }

    let args = Args::parse();

    let mut config = ConfigLoader::load(args.config.as_deref())
        .await
        .context("Failed to load configuration")?;
    if args.headless {
        config.browser.headless = true;
    } else if args.visible {
        config.browser.headless = false;
    }
    let credentials = Credentials::from_env().context("Missing Geckoboard credentials")?;

    let session = SessionContext::new(&config.naming.prefix, &config.naming.suffix)
        .with_legacy_patterns(config.naming.legacy_patterns.as_slice());
    let log: SharedLog = Arc::new(
        FileRunLog::create(&config.artifacts.log_file, session.session_id()).with_context(
            || format!("Cannot open run log {}", config.artifacts.log_file.display()),
        )?,
    );
    info!(
        "Session {} will create '{}'",
        session.session_id(),
        session.new_name()
    );

    let input: Box<dyn HumanInput> = match &args.answers {
        Some(path) => Box::new(
            ScriptedInput::from_file(path)
                .await
                .with_context(|| format!("Cannot read answers file {}", path.display()))?,
        ),
        None => Box::new(StdinInput::new()),
    };

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing up");
            interrupt.cancel();
        }
    });

    let mut driver = ChromiumDriver::new(config.browser.clone());
    if let Err(e) = driver.launch().await {
        log.record(&format!("Failed to launch browser: {}", e));
        return Err(e).context("Failed to launch browser");
    }

    let mut workflow = Workflow::new(driver, config, credentials, input, log, session, cancel);
    let report = workflow.run(args.mode.into()).await;
    workflow.shutdown().await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.render());
    }

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
