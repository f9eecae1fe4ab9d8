use anyhow::{anyhow, Context, Result};
use api_ingress::ApiIngress;
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use modkit::{DbModule, Module, ModuleCtx, ModuleCtxBuilder, RestHostModule, RestfulModule};
use modkit_db::{ConnectOpts, DbHandle, RetryPolicy};
use recipes::Recipes;
use runtime::{AppConfig, AppConfigProvider, CliArgs, DatabaseConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

// Adapter to make AppConfigProvider implement modkit::ConfigProvider
struct ModkitConfigAdapter(AppConfigProvider);

impl modkit::ConfigProvider for ModkitConfigAdapter {
    fn get_module_config(&self, module_name: &str) -> Option<&serde_json::Value> {
        self.0.get_module_config(module_name)
    }
}

/// Expand a sqlite DSN into an absolute-path DSN using a base directory.
/// - Keeps "sqlite::memory:" as-is.
/// - Normalizes backslashes into forward slashes (important on Windows).
fn absolutize_sqlite_dsn(dsn: &str, base_dir: &Path) -> Result<String> {
    if dsn.eq_ignore_ascii_case("sqlite::memory:") || dsn.eq_ignore_ascii_case("sqlite://:memory:")
    {
        return Ok("sqlite::memory:".to_string());
    }
    let db_path = dsn
        .strip_prefix("sqlite://")
        .ok_or_else(|| anyhow!("DSN must start with sqlite:// (got: {})", dsn))?;

    let (path_str, query) = match db_path.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (db_path, None),
    };

    let mut p = PathBuf::from(path_str);
    if p.as_os_str().is_empty() {
        return Err(anyhow!("Empty SQLite path in DSN"));
    }
    if p.is_relative() {
        p = base_dir.join(p);
    }

    let mut out = String::from("sqlite://");
    out.push_str(&p.to_string_lossy().replace('\\', "/"));
    if let Some(q) = query {
        out.push('?');
        out.push_str(q);
    }
    Ok(out)
}

/// Recipe API server
#[derive(Parser)]
#[command(name = "recipe-server")]
#[command(about = "Recipe API server: users, tokens, tags, ingredients and recipes")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Use an in-memory SQLite database
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Check configuration
    Check,
    /// Apply database migrations and exit
    Migrate,
    /// Create an administrative account
    CreateSuperuser {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: cli.port,
        print_config: cli.print_config,
        verbose: cli.verbose,
        mock: cli.mock,
    };

    // Load configuration (normalized home_dir is applied inside)
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    let logging_config = config.logging.as_ref().cloned().unwrap_or_default();
    runtime::logging::init_logging_from_config(&logging_config, Path::new(&config.server.home_dir));
    tracing::info!("Recipe server starting");

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config).await,
        Commands::Check => check_config(config),
        Commands::Migrate => migrate(config).await,
        Commands::CreateSuperuser { email, password } => {
            create_superuser(config, &email, &password).await
        }
    }
}

/// Connect to the configured database, retrying while it is unreachable.
async fn connect_db(config: &AppConfig) -> Result<Arc<DbHandle>> {
    let db_config = config
        .database
        .as_ref()
        .ok_or_else(|| anyhow!("Database URL not configured"))?;

    let dsn = resolve_dsn(db_config, Path::new(&config.server.home_dir))?;
    let connect_opts = ConnectOpts {
        max_conns: db_config.max_conns,
        acquire_timeout: Some(Duration::from_secs(5)),
        sqlite_busy_timeout: Duration::from_millis(
            db_config.busy_timeout_ms.unwrap_or(5000) as u64
        ),
        create_sqlite_dirs: true,
        ..Default::default()
    };
    let policy = RetryPolicy {
        retries: db_config.connect_retries.unwrap_or(0),
        delay: Duration::from_millis(db_config.connect_retry_delay_ms.unwrap_or(1000)),
    };

    tracing::info!(
        "Connecting to database: {}",
        modkit_db::redact_credentials_in_dsn(Some(&dsn))
    );
    let db = DbHandle::connect_with_retry(&dsn, connect_opts, policy).await?;
    tracing::info!("Connected DB backend: {:?}", db.engine());
    Ok(Arc::new(db))
}

fn resolve_dsn(db_config: &DatabaseConfig, base_dir: &Path) -> Result<String> {
    let dsn = db_config.url.trim();
    if dsn.is_empty() {
        return Err(anyhow!("Database URL not configured"));
    }
    DbHandle::detect(dsn)?;

    // Absolutize sqlite DSNs to avoid cwd issues
    if dsn.starts_with("sqlite:") {
        absolutize_sqlite_dsn(dsn, base_dir)
    } else {
        Ok(dsn.to_string())
    }
}

fn module_ctx(config: &AppConfig, db: Arc<DbHandle>, cancel: CancellationToken) -> ModuleCtx {
    let provider = Arc::new(ModkitConfigAdapter(AppConfigProvider::new(config.clone())));
    ModuleCtxBuilder::new(cancel)
        .with_db(db)
        .with_config_provider(provider)
        .build()
}

async fn run_server(config: AppConfig) -> Result<()> {
    let cancel = CancellationToken::new();
    modkit::cancel_on_shutdown(cancel.clone());

    let db = connect_db(&config).await?;
    let ctx = module_ctx(&config, db.clone(), cancel.clone());

    let ingress = ApiIngress::default();
    let recipes = Recipes::default();

    // Phases: migrate → init → REST
    recipes.migrate(&db).await?;

    tracing::info!("Initializing modules...");
    ingress.init(&ctx.clone().for_module(ingress.name())).await?;
    recipes.init(&ctx.clone().for_module(recipes.name())).await?;

    let router = ingress.rest_prepare(&ctx, axum::Router::new())?;
    let router = recipes.register_rest(&ctx, router, ingress.as_registry())?;
    let router = ingress.rest_finalize(&ctx, router)?;
    tracing::info!(operations = ingress.operation_count(), "REST surface ready");

    let fallback = format!("{}:{}", config.server.host, config.server.port);
    let addr = ingress.bind_addr(&fallback)?;
    ingress.serve(router, addr, cancel).await?;

    tracing::info!("Recipe server stopped");
    Ok(())
}

fn check_config(config: AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");

    if let Some(db_config) = config.database.as_ref() {
        resolve_dsn(db_config, Path::new(&config.server.home_dir))
            .context("invalid database configuration")?;
    }
    let addr = format!("{}:{}", config.server.host, config.server.port);
    addr.parse::<std::net::SocketAddr>()
        .map_err(|e| anyhow!("Invalid bind address '{}': {}", addr, e))?;

    tracing::info!("Configuration is valid");
    println!("Configuration check passed");
    println!("{}", config.to_yaml()?);
    Ok(())
}

async fn migrate(config: AppConfig) -> Result<()> {
    let db = connect_db(&config).await?;
    Recipes::default().migrate(&db).await?;
    println!("Migrations applied");
    Ok(())
}

async fn create_superuser(config: AppConfig, email: &str, password: &str) -> Result<()> {
    let db = connect_db(&config).await?;
    let ctx = module_ctx(&config, db.clone(), CancellationToken::new());

    let recipes = Recipes::default();
    recipes.migrate(&db).await?;
    recipes.init(&ctx.for_module(recipes.name())).await?;

    let user = recipes
        .users_service()?
        .create_superuser(email, password)
        .await?;
    println!("Superuser created: {}", user.email);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_sqlite_path_is_joined_with_home() {
        let dsn = absolutize_sqlite_dsn("sqlite://database/recipes.db?mode=rwc", Path::new("/srv"))
            .unwrap();
        assert_eq!(dsn, "sqlite:///srv/database/recipes.db?mode=rwc");
    }

    #[test]
    fn memory_dsn_is_kept() {
        let dsn = absolutize_sqlite_dsn("sqlite://:memory:", Path::new("/srv")).unwrap();
        assert_eq!(dsn, "sqlite::memory:");
    }

    #[test]
    fn unknown_scheme_is_rejected() {
        let cfg = DatabaseConfig {
            url: "mysql://localhost/db".into(),
            max_conns: None,
            busy_timeout_ms: None,
            connect_retries: None,
            connect_retry_delay_ms: None,
        };
        assert!(resolve_dsn(&cfg, Path::new("/srv")).is_err());
    }
}
