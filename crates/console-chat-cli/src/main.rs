//! console-chat CLI - chat with a backend platform project
//!
//! A line-oriented REPL over the core chat controller. Select a project and
//! optionally a database, collection, bucket or function, then ask questions;
//! the assistant calls platform tools on your behalf.

mod commands;
mod onboarding;
mod render;
mod repl;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use console::style;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use console_chat_core::config::{Config, ConfigManager};
use console_chat_core::provider::catalog;
use console_chat_core::session::persistence;
use console_chat_core::{
    create_platform_tool_registry, ChatController, ControllerSettings, GenAIBackend,
    HttpPlatformClient, ToolCategory, TracingLogSink,
};

use onboarding::OnboardingWizard;
use repl::Repl;

#[derive(Parser)]
#[command(name = "console-chat")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Chat with your backend platform project", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Model provider (gemini, openai, anthropic, ...) - defaults to config setting
    #[arg(short, long)]
    provider: Option<String>,

    /// Model to use (defaults to the provider's default)
    #[arg(short, long)]
    model: Option<String>,

    /// Project to select at startup
    #[arg(long)]
    project: Option<String>,

    /// Platform API endpoint, e.g. https://cloud.appwrite.io/v1
    #[arg(long)]
    endpoint: Option<String>,

    /// Ask the model to think before answering
    #[arg(long)]
    thinking: bool,

    /// Config file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also write logs to a daily rolling file in this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Send a single message and exit (non-interactive mode)
    #[arg(long)]
    one_shot: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat mode
    Chat,

    /// Show available tools
    Tools,

    /// Show configuration
    Config,

    /// List saved conversations
    Transcripts,
}

/// Install the subscriber; keep the guard alive to flush the log file
fn init_logging(verbose: bool, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // warn by default so logs don't interfere with the prompt
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "info,console_chat_core=debug"
        } else {
            "warn"
        })
    });
    let stderr = fmt::layer().with_writer(std::io::stderr).with_target(false);

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "console-chat.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(filter).with(stderr).init();
            None
        }
    }
}

/// Command-line flags win over the config file
fn apply_overrides(mut config: Config, cli: &Cli) -> Config {
    if let Some(provider) = &cli.provider
        && *provider != config.provider
    {
        config.provider = provider.clone();
        config.model = None;
        config.api_key = None;
        config.api_key_env = None;
    }
    if let Some(model) = &cli.model {
        config.model = Some(model.clone());
    }
    if let Some(endpoint) = &cli.endpoint {
        config.platform.endpoint = endpoint.clone();
    }
    if let Some(project) = &cli.project {
        config.platform.project_id = Some(project.clone());
    }
    if cli.thinking {
        config.thinking = true;
    }
    config
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_logging(cli.verbose, cli.log_dir.as_deref());

    let mut config_manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path.clone())?,
        None => ConfigManager::new()?,
    };

    match &cli.command {
        Some(Commands::Tools) => {
            show_tools(config_manager.config())?;
            return Ok(());
        }
        Some(Commands::Config) => {
            show_config(&config_manager);
            return Ok(());
        }
        Some(Commands::Transcripts) => {
            show_transcripts()?;
            return Ok(());
        }
        Some(Commands::Chat) | None => {}
    }

    // First-run setup, interactive sessions only
    if cli.one_shot.is_none() {
        let mut wizard = OnboardingWizard::new(config_manager);
        if wizard.should_run() && !wizard.run().await? {
            return Ok(());
        }
        config_manager = wizard.into_config_manager();
    }

    let config = apply_overrides(config_manager.config().clone(), &cli);
    if config.platform.get_api_key().is_none() {
        tracing::warn!(
            env = %config.platform.api_key_env,
            "No platform API key configured; platform calls will be unauthenticated"
        );
    }

    let client = Arc::new(HttpPlatformClient::from_config(&config.platform)?);
    let registry = Arc::new(create_platform_tool_registry(client));
    let (controller, events) = ChatController::new(
        Arc::new(GenAIBackend::new()),
        registry,
        Arc::new(TracingLogSink),
        ControllerSettings::from_config(&config),
    );

    let project = config.platform.project_id.clone();
    let mut repl = Repl::new(controller, events, config);
    repl.set_show_log(cli.verbose);
    if let Some(project) = project {
        repl.select_project(&project).await?;
    }

    match cli.one_shot {
        Some(prompt) => repl.one_shot(prompt).await,
        None => repl.run().await,
    }
}

fn show_tools(config: &Config) -> anyhow::Result<()> {
    let client = Arc::new(HttpPlatformClient::from_config(&config.platform)?);
    let registry = create_platform_tool_registry(client);
    let enabled = config.category_set();

    println!("{}", style("Available Tools:").bold());
    for category in ToolCategory::ALL {
        println!();
        let state = if enabled.contains(&category) {
            style("enabled").green()
        } else {
            style("disabled").red()
        };
        println!("{} [{}]", style(category).bold(), state);
        for tool in registry.list().iter().filter(|t| t.category == category) {
            println!("  {:<22} {}", style(&tool.name).cyan(), tool.description);
        }
    }
    Ok(())
}

fn show_config(config_manager: &ConfigManager) {
    let config = config_manager.config();
    let key_state = |present: bool| {
        if present {
            style("set").green()
        } else {
            style("missing").red()
        }
    };

    println!("{}", style("Configuration:").bold());
    println!();
    println!("  Config file: {}", style(config_manager.path().display()).dim());
    println!("  Provider:    {}", style(&config.provider).green());
    println!("  Model:       {}", style(config.model()).green());
    let local = catalog::get(&config.provider).is_some_and(|p| p.is_local());
    if !local {
        println!("  API key:     {}", key_state(config.get_api_key().is_some()));
    }
    println!("  Thinking:    {}", config.thinking);
    println!("  Tool rounds: {}", config.max_tool_rounds);
    println!(
        "  Categories:  {}",
        config
            .enabled_categories
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!();
    println!("  Platform:    {}", style(&config.platform.endpoint).green());
    println!(
        "  Project:     {}",
        config.platform.project_id.as_deref().unwrap_or("(none)")
    );
    println!(
        "  Platform key: {} ({})",
        key_state(config.platform.get_api_key().is_some()),
        config.platform.api_key_env
    );
    println!(
        "  Transcripts: {}",
        style(persistence::transcripts_dir().display()).dim()
    );
}

fn show_transcripts() -> anyhow::Result<()> {
    let transcripts = persistence::list_transcripts()?;
    if transcripts.is_empty() {
        println!("{}", style("No saved conversations").dim());
        return Ok(());
    }
    for transcript in transcripts {
        println!(
            "{}  {}  {:<12} {}",
            style(&transcript.id).cyan(),
            transcript
                .updated_at
                .with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M"),
            transcript.project_id.as_deref().unwrap_or("-"),
            transcript.title()
        );
    }
    Ok(())
}
