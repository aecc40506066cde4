use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use blitz::domain::traits::Gateway;
use blitz::infrastructure::adapters::{ConsoleGateway, TelegramGateway};
use blitz::infrastructure::config::{AdapterKind, Config};
use blitz::infrastructure::modules::LibraryLoader;
use blitz::Bot;

#[derive(Parser)]
#[command(name = "blitz-bot")]
#[command(about = "A plugin-driven chat bot", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Bot token (overrides config)
    #[arg(short, long)]
    token: Option<String>,

    /// Plugins root directory (overrides config)
    #[arg(short, long)]
    plugins_dir: Option<PathBuf>,

    /// Register commands for this deployment only (overrides config)
    #[arg(short, long)]
    server: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot
    Run,
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run => {
            if let Err(e) = run_bot(&cli) {
                tracing::error!("{}", e);
                std::process::exit(1);
            }
        }
        Commands::Version => {
            println!("blitz-bot v{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::InitConfig => {
            init_config();
        }
    }
}

fn load_config(cli: &Cli) -> Config {
    let mut config = if std::path::Path::new(&cli.config).exists() {
        Config::load(&cli.config).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config: {}, using defaults", e);
            Config::default()
        })
    } else {
        Config::default()
    };
    config.apply_env();

    if let Some(token) = &cli.token {
        config.bot.token = Some(token.clone());
    }
    if let Some(dir) = &cli.plugins_dir {
        config.plugins.directory = dir.clone();
    }
    if let Some(server) = &cli.server {
        config.bot.server = Some(server.clone());
    }
    config
}

fn run_bot(cli: &Cli) -> Result<(), blitz::BotError> {
    let config = load_config(cli);
    let options = config.bot_options()?;

    let gateway: Arc<dyn Gateway> = match config.adapter {
        AdapterKind::Console => Arc::new(ConsoleGateway::new()),
        AdapterKind::Telegram => Arc::new(TelegramGateway::new()),
    };

    tracing::info!(
        adapter = ?config.adapter,
        plugins = %config.plugins.directory.display(),
        "Starting blitz-bot"
    );

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| blitz::BotError::Internal(format!("Failed to start runtime: {}", e)))?;

    rt.block_on(async {
        let mut bot = Bot::new(options, gateway, Arc::new(LibraryLoader::new()));
        bot.run().await
    })
}

fn init_config() {
    let config = Config::default();
    match serde_yaml::to_string(&config) {
        Ok(yaml) => {
            println!("{}", yaml);
            println!("\nSave this to config.yaml and adjust as needed.");
        }
        Err(e) => tracing::error!("Failed to render default config: {}", e),
    }
}
