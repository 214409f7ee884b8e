//! Statusboard CLI
//!
//! Runs the status service, or edits its configuration record offline.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use statusboard::admin::{self, AdminAction};
use statusboard::config::CONFIG_FILE_NAME;
use statusboard::{ConfigStore, RunOptions};
use tracing::Level;

#[derive(Parser)]
#[command(name = "statusboard")]
#[command(about = "Aggregated service status display for Discord")]
#[command(version)]
struct Args {
    /// Directory holding status_config.json and status_data.json
    #[arg(short, long, global = true, default_value = ".")]
    data_dir: PathBuf,

    /// Log level
    #[arg(short, long, global = true, default_value = "info")]
    log_level: Level,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Connect to Discord and keep the status display up to date
    Run {
        /// Bot token
        #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true)]
        token: String,

        /// Place a new display message in this channel once connected
        #[arg(long)]
        channel: Option<u64>,

        /// Serve the local dashboard on this port
        #[arg(long)]
        dashboard_port: Option<u16>,
    },
    /// Monitor a bot's presence
    AddBot {
        id: u64,
        label: String,
    },
    RemoveBot {
        id: u64,
    },
    /// Monitor a website; https:// is assumed when no scheme is given
    AddWebsite {
        url: String,
        #[arg(long)]
        label: Option<String>,
    },
    RemoveWebsite {
        url: String,
    },
    /// Declare a custom service and its status text
    SetService {
        name: String,
        #[arg(default_value = "Operational")]
        status: String,
    },
    RemoveService {
        name: String,
    },
    /// Monitor a Discord platform component by id
    WatchComponent {
        id: String,
    },
    UnwatchComponent {
        id: String,
    },
    /// Minutes between refreshes
    SetInterval {
        minutes: u32,
    },
    SetTitle {
        title: String,
    },
    /// Relay snapshots to a webhook; omit the URL to disable
    SetSink {
        url: Option<String>,
        #[arg(long)]
        token: Option<String>,
    },
    /// Print the configuration record
    Show,
}

impl Command {
    fn into_action(self) -> Option<AdminAction> {
        let action = match self {
            Command::Run { .. } | Command::Show => return None,
            Command::AddBot { id, label } => AdminAction::AddBot { id, label },
            Command::RemoveBot { id } => AdminAction::RemoveBot { id },
            Command::AddWebsite { url, label } => AdminAction::AddWebsite { url, label },
            Command::RemoveWebsite { url } => AdminAction::RemoveWebsite { url },
            Command::SetService { name, status } => AdminAction::SetService { name, status },
            Command::RemoveService { name } => AdminAction::RemoveService { name },
            Command::WatchComponent { id } => AdminAction::WatchComponent { id },
            Command::UnwatchComponent { id } => AdminAction::UnwatchComponent { id },
            Command::SetInterval { minutes } => AdminAction::SetInterval { minutes },
            Command::SetTitle { title } => AdminAction::SetTitle { title },
            Command::SetSink { url, token } => AdminAction::SetSink { url, token },
        };
        Some(action)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    tracing::debug!(
        "Parsed command line arguments: data_dir={:?}, log_level={:?}",
        args.data_dir,
        args.log_level
    );

    match args.command {
        Command::Run {
            token,
            channel,
            dashboard_port,
        } => {
            tracing::info!("Starting statusboard service");
            statusboard::run(RunOptions {
                data_dir: args.data_dir,
                token,
                channel,
                dashboard_port,
            })
            .await?;
        }
        Command::Show => {
            let store = ConfigStore::open(args.data_dir.join(CONFIG_FILE_NAME));
            println!("{}", admin::show(&store.current().await)?);
        }
        command => {
            let store = ConfigStore::open(args.data_dir.join(CONFIG_FILE_NAME));
            if let Some(action) = command.into_action() {
                tracing::debug!("Applying {:?}", action);
                let message = store.update(|c| admin::apply(c, action)).await??;
                println!("{}", message);
            }
        }
    }

    Ok(())
}
