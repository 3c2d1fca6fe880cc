//! Compliance screening service - main entry point

use compliance_screener::config::{LlmProviderKind, ResolvedModel, ServiceConfig};
use compliance_screener::llm::provider::LlmProvider;
use compliance_screener::llm::providers::{
    AnthropicConfig, AnthropicProvider, OpenAiConfig, OpenAiProvider,
};
use compliance_screener::error::register_secret;
use compliance_screener::observability::init_logging_with_verbosity;
use compliance_screener::screening::{
    AgentRegistry, GenerationSettings, LlmAgentRuntime, SequentialPipeline,
};
use compliance_screener::server::{self, AppState};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

/// Two-stage LLM compliance screening service
#[derive(Parser)]
#[command(name = "compliance-screener")]
#[command(about = "HTTP service screening orders with a compliance analyst and an ethics auditor")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", env = "SCREENER_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve `POST /screen-order`
    Run,
    /// Validate configuration and the model identifier
    Config {
        /// Print the effective configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() {
    // Missing .env is fine
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging_with_verbosity(cli.verbose);

    info!(
        "Starting compliance screener v{}",
        env!("CARGO_PKG_VERSION")
    );

    let config = match load_configuration(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Run => run_service(config).await,
        Commands::Config { show } => handle_config_command(config, show),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        process::exit(1);
    }

    info!("Application shutdown complete");
}

fn load_configuration(
    config_path: &Option<PathBuf>,
) -> Result<ServiceConfig, Box<dyn std::error::Error>> {
    if let Some(path) = config_path {
        info!("Loading configuration from: {}", path.display());
        return Ok(ServiceConfig::load_from_file(path)?);
    }

    for path_str in ["screener.toml", "config/screener.toml"] {
        let path = PathBuf::from(path_str);
        if path.exists() {
            info!("Loading configuration from: {}", path.display());
            return Ok(ServiceConfig::load_from_file(&path)?);
        }
    }

    info!("No configuration file found, using built-in defaults");
    Ok(ServiceConfig::default())
}

/// Builds the configured LLM provider
struct LlmProviderFactory;

impl LlmProviderFactory {
    fn create_provider(
        config: &ServiceConfig,
        resolved: &ResolvedModel,
    ) -> Result<Arc<dyn LlmProvider>, Box<dyn std::error::Error>> {
        let api_key = config.llm.get_api_key(resolved.provider)?;
        register_secret(&api_key);
        let timeout = Duration::from_secs(config.llm.timeout_secs);

        match resolved.provider {
            LlmProviderKind::OpenAi => {
                let defaults = OpenAiConfig::default();
                let provider = OpenAiProvider::new(OpenAiConfig {
                    api_key,
                    base_url: config.llm.base_url.clone().unwrap_or(defaults.base_url),
                    timeout,
                })?;
                Ok(Arc::new(provider))
            }
            LlmProviderKind::Anthropic => {
                let defaults = AnthropicConfig::default();
                let provider = AnthropicProvider::new(AnthropicConfig {
                    api_key,
                    base_url: config.llm.base_url.clone().unwrap_or(defaults.base_url),
                    timeout,
                    ..defaults
                })?;
                Ok(Arc::new(provider))
            }
        }
    }
}

/// Wire registry, runtime and pipeline into the shared request state
fn build_state(config: &ServiceConfig) -> Result<Arc<AppState>, Box<dyn std::error::Error>> {
    let resolved = config.llm.resolve_model()?;
    info!(
        provider = resolved.provider.as_str(),
        model = %resolved.model,
        report_mode = ?config.pipeline.report_mode,
        "Resolved screening model"
    );

    let provider = LlmProviderFactory::create_provider(config, &resolved)?;
    let registry = Arc::new(AgentRegistry::new(&resolved.model));
    let runtime = Arc::new(LlmAgentRuntime::new(
        provider,
        GenerationSettings {
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
        },
    ));
    let pipeline = Arc::new(SequentialPipeline::new(
        runtime,
        config.pipeline.report_mode,
    ));

    Ok(Arc::new(AppState::new(registry, pipeline)))
}

async fn run_service(config: ServiceConfig) -> Result<(), Box<dyn std::error::Error>> {
    let state = build_state(&config)?;

    let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())?;
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;

    let shutdown = async move {
        tokio::select! {
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down gracefully...");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down gracefully...");
            }
        }
    };

    server::serve(state, &config.server, shutdown).await?;
    Ok(())
}

fn handle_config_command(
    config: ServiceConfig,
    show: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if show {
        println!("Current configuration:");
        println!("{}", toml::to_string_pretty(&config)?);
    }

    match config.llm.resolve_model() {
        Ok(resolved) => info!(
            provider = resolved.provider.as_str(),
            model = %resolved.model,
            "Model identifier resolved"
        ),
        Err(e) => {
            warn!("Model identifier is not resolvable: {}", e);
            return Err(e.into());
        }
    }

    info!("Configuration validation complete");
    Ok(())
}
