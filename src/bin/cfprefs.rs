use std::error::Error;
use std::path::PathBuf;

use cfprefs::{Config, PreferenceStore, Preferences, Scope, Value};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "cfprefs", about = "Read and write Core Foundation preferences")]
struct Cli {
    /// JSON configuration file; defaults come from CFPREFS_DOMAIN and CFPREFS_SCOPE otherwise.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Preference domain, usually an application bundle identifier.
    #[arg(long)]
    domain: Option<String>,

    /// One of current-user/current-host, current-user/any-host,
    /// any-user/current-host, any-user/any-host.
    #[arg(long)]
    scope: Option<Scope>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the value stored under KEY as JSON.
    Read { key: String },
    /// Store VALUE under KEY. VALUE is parsed as JSON, or taken as a plain string.
    Write { key: String, value: String },
    /// Remove KEY.
    Delete { key: String },
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        tracing::error!(error = %e, "cfprefs failed");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let mut config = match &cli.config {
        Some(path) => Config::from_json(&std::fs::read_to_string(path)?)?,
        None => Config::from_env()?,
    };
    if let Some(domain) = cli.domain {
        config.domain = Some(domain);
    }
    if let Some(scope) = cli.scope {
        config.scope = scope;
    }
    let domain = config
        .domain
        .ok_or("no preference domain: pass --domain or set CFPREFS_DOMAIN")?;

    let prefs = open()?;
    execute(&prefs, cli.command, &domain, config.scope)
}

#[cfg(target_os = "macos")]
fn open() -> Result<Preferences<cfprefs::SystemStore>, Box<dyn Error>> {
    Ok(Preferences::system())
}

#[cfg(not(target_os = "macos"))]
fn open() -> Result<Preferences<cfprefs::MemoryStore>, Box<dyn Error>> {
    Err("the system preferences store is only available on macOS".into())
}

fn execute<S: PreferenceStore>(
    prefs: &Preferences<S>,
    command: Command,
    domain: &str,
    scope: Scope,
) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Read { key } => {
            let value = prefs
                .read(&key, domain, scope)?
                .ok_or_else(|| format!("{key:?} is not set in {domain} ({scope})"))?;
            let json = serde_json::Value::from(value);
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        Command::Write { key, value } => {
            let value = match serde_json::from_str::<serde_json::Value>(&value) {
                Ok(json) => Value::try_from(json)?,
                Err(_) => Value::String(value),
            };
            prefs.write(&key, &value, domain, scope)?;
            tracing::info!(%domain, %scope, key = %key, "preference written");
        }
        Command::Delete { key } => {
            prefs.delete(&key, domain, scope)?;
            tracing::info!(%domain, %scope, key = %key, "preference deleted");
        }
    }
    Ok(())
}
