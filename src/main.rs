/// Version injected at compile time via CSCLI_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("CSCLI_VERSION") {
    Some(v) => v,
    None => "dev",
};

use anyhow::Result;
use clap::{ArgGroup, Parser, Subcommand, ValueEnum};
use cscli::cloudsigma::client::CloudSigmaClient;
use cscli::commands::drive::DriveAction;
use cscli::commands::server::ServerAction;
use cscli::commands::subscribed::SubscribedAction;
use cscli::commands::{self, OutputFormat};
use cscli::config::{ClientConfig, Config, Overrides};
use cscli::resource::{self, Catalog, ListFormat, ResourceType};
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Command-line client for CloudSigma
#[derive(Parser, Debug)]
#[command(name = "cscli", version, about, long_about = None)]
struct Args {
    /// CloudSigma account username [env: CLOUDSIGMA_USERNAME]
    #[arg(short, long)]
    username: Option<String>,

    /// CloudSigma account password [env: CLOUDSIGMA_PASSWORD]
    #[arg(short, long)]
    password: Option<String>,

    /// Region code, e.g. zrh [env: CLOUDSIGMA_REGION]
    #[arg(short, long)]
    region: Option<String>,

    /// API base URL override [env: CLOUDSIGMA_API_ENDPOINT]
    #[arg(long)]
    endpoint: Option<String>,

    /// Print full error chains instead of the error envelope
    #[arg(short, long)]
    debug: bool,

    /// Output serialization
    #[arg(short, long, value_enum, default_value = "json")]
    output: OutputFormat,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off")]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Save default region and username
    Configure {
        #[arg(long)]
        region: Option<String>,
        #[arg(long)]
        username: Option<String>,
    },
    #[command(flatten)]
    Api(ApiCommand),
}

/// Commands that talk to the API
#[derive(Subcommand, Debug)]
enum ApiCommand {
    /// List resources
    List(ListArgs),
    /// Server actions
    Server {
        /// Server name or uuid
        name: String,
        #[command(subcommand)]
        action: ServerAction,
    },
    /// Drive actions
    Drive {
        /// Drive name or uuid
        name: String,
        #[command(subcommand)]
        action: DriveAction,
    },
    /// VLAN actions
    Vlan {
        /// VLAN name or uuid
        name: String,
        #[command(subcommand)]
        action: SubscribedAction,
    },
    /// IP actions
    Ip {
        /// IP name or address
        name: String,
        #[command(subcommand)]
        action: SubscribedAction,
    },
}

#[derive(clap::Args, Debug)]
#[command(group(ArgGroup::new("format").args(["detail", "uuid", "brief", "text"])))]
struct ListArgs {
    /// Full records
    #[arg(short, long)]
    detail: bool,
    /// Uuids only
    #[arg(short, long)]
    uuid: bool,
    /// Condensed human-readable records
    #[arg(short, long)]
    brief: bool,
    /// Aligned text lines
    #[arg(short, long)]
    text: bool,
    #[arg(value_enum, default_value = "all")]
    target: ListTarget,
}

impl ListArgs {
    fn format(&self) -> ListFormat {
        if self.detail {
            ListFormat::Detail
        } else if self.uuid {
            ListFormat::Uuid
        } else if self.brief {
            ListFormat::Brief
        } else if self.text {
            ListFormat::Text
        } else {
            ListFormat::Raw
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ListTarget {
    Servers,
    Drives,
    Vlans,
    Ips,
    Subscriptions,
    Capabilities,
    All,
}

impl ListTarget {
    fn kind(self) -> Option<ResourceType> {
        match self {
            ListTarget::Servers => Some(ResourceType::Server),
            ListTarget::Drives => Some(ResourceType::Drive),
            ListTarget::Vlans => Some(ResourceType::Vlan),
            ListTarget::Ips => Some(ResourceType::Ip),
            ListTarget::Subscriptions => Some(ResourceType::Subscription),
            ListTarget::Capabilities => Some(ResourceType::Capabilities),
            ListTarget::All => None,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Failed to open log file {}: {}", log_path.display(), e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("cscli {} started with log level: {:?}", VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("cscli").join("cscli.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".cscli").join("cscli.log");
    }
    PathBuf::from("cscli.log")
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let log_guard = setup_logging(args.log_level);
    let output = args.output;
    let debug = args.debug;

    match run(args).await {
        Ok(result) => print(&commands::envelope(true, result), output),
        Err(err) => {
            tracing::error!("{:#}", err);
            if debug {
                eprintln!("Error: {err:?}");
            } else {
                print(&commands::error_envelope(&err), output);
            }
            drop(log_guard);
            std::process::exit(1);
        }
    }
}

fn print(envelope: &Value, format: OutputFormat) {
    match commands::render(envelope, format) {
        Ok(text) => println!("{}", text.trim_end()),
        Err(e) => eprintln!("Error: {e:#}"),
    }
}

async fn run(args: Args) -> Result<Value> {
    let saved = Config::load();

    let command = match args.command {
        Command::Configure { region, username } => return configure(saved, region, username),
        Command::Api(command) => command,
    };

    let overrides = Overrides {
        region: args.region,
        username: args.username,
        password: args.password,
        endpoint: args.endpoint,
    };
    let client = CloudSigmaClient::new(ClientConfig::resolve(&overrides, &saved)?)?;
    let mut catalog = Catalog::new(&client);

    match command {
        ApiCommand::List(list) => {
            let format = list.format();
            match list.target.kind() {
                Some(kind) => resource::list_kind(&mut catalog, kind, format).await,
                None => resource::list_all(&mut catalog, format).await,
            }
        }
        ApiCommand::Server { name, action } => {
            commands::server::execute(&mut catalog, &name, action).await
        }
        ApiCommand::Drive { name, action } => {
            commands::drive::execute(&mut catalog, &name, action).await
        }
        ApiCommand::Vlan { name, action } => {
            commands::subscribed::execute(&mut catalog, ResourceType::Vlan, &name, action).await
        }
        ApiCommand::Ip { name, action } => {
            commands::subscribed::execute(&mut catalog, ResourceType::Ip, &name, action).await
        }
    }
}

fn configure(mut saved: Config, region: Option<String>, username: Option<String>) -> Result<Value> {
    if region.is_some() {
        saved.region = region;
    }
    if username.is_some() {
        saved.username = username;
    }
    let path = saved.save()?;
    tracing::info!("Saved config to {:?}", path);
    Ok(json!({
        "config": path.display().to_string(),
        "region": saved.region,
        "username": saved.username,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_list_flags_are_exclusive() {
        assert!(Args::try_parse_from(["cscli", "list", "-d", "-t", "servers"]).is_err());

        let args = Args::try_parse_from(["cscli", "list", "--brief", "drives"]).unwrap();
        let Command::Api(ApiCommand::List(list)) = args.command else {
            panic!("expected list");
        };
        assert_eq!(list.format(), ListFormat::Brief);
        assert_eq!(list.target.kind(), Some(ResourceType::Drive));
    }

    #[test]
    fn test_list_defaults_to_all_raw() {
        let args = Args::try_parse_from(["cscli", "list"]).unwrap();
        let Command::Api(ApiCommand::List(list)) = args.command else {
            panic!("expected list");
        };
        assert_eq!(list.format(), ListFormat::Raw);
        assert!(list.target.kind().is_none());
    }

    #[test]
    fn test_server_subcommand_parses() {
        let args = Args::try_parse_from(["cscli", "-r", "zrh", "server", "web", "wait", "-t", "0"]).unwrap();
        assert_eq!(args.region.as_deref(), Some("zrh"));
        assert!(matches!(
            args.command,
            Command::Api(ApiCommand::Server {
                action: ServerAction::Wait { timeout: 0, .. },
                ..
            })
        ));
    }
}
