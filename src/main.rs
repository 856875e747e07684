use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use user_registry::account::{AccountService, UserStore};
use user_registry::cli::{self, Cli, Commands};
use user_registry::config::RegistryConfig;
use user_registry::rpc::ApiServer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let command = cli.command.unwrap_or(Commands::Serve {
        config: "registry.toml".to_string(),
        port: None,
        database: None,
    });

    match command {
        Commands::Serve { config, port, database } => run_server(&config, port, database).await,
        cmd => {
            init_tracing("warn");
            let accepted = cli::user::handle_user_command(cmd).await?;
            if !accepted {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

async fn run_server(
    config_path: &str,
    port: Option<u16>,
    database: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let loaded = RegistryConfig::load_or_default(config_path);
    init_tracing(&loaded.config.server.log_level);
    loaded.report(config_path);
    let mut config = loaded.config;

    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(database) = database {
        config.storage.database_path = database;
    }

    let store = UserStore::open(&config.storage.database_path);
    info!("{} users in '{}'", store.len(), config.storage.database_path);
    let accounts = AccountService::new(store).with_flush_on_write(config.storage.flush_on_write);

    ApiServer::new(accounts, &config.server.bind_addr, config.server.port)
        .start()
        .await?;
    Ok(())
}

/// `RUST_LOG` wins over the configured level.
fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
