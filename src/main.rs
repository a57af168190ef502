use std::path::PathBuf;

use battleship_bus::{
    console::run_console, init_logging, AppConfig, Broker, Exit, TcpTransport, TeamNode,
};
use clap::Parser;
use log::{error, info};
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser)]
enum Commands {
    /// Run one team's client against the broker named in the config.
    Run {
        #[arg(long, default_value = "battleship.json")]
        config: PathBuf,
    },
    /// Run a topic broker that team clients and tablets connect to.
    Broker {
        #[arg(long, default_value = "0.0.0.0:1883")]
        bind: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config } => {
            let config = AppConfig::load(&config)?;
            let transport = TcpTransport::connect(config.broker.as_str()).await?;

            let (command_tx, command_rx) = mpsc::unbounded_channel();
            let (notice_tx, notice_rx) = mpsc::unbounded_channel();
            let mut node =
                TeamNode::connect(&config, Box::new(transport), command_rx, notice_tx).await?;
            let console = tokio::spawn(run_console(notice_rx, command_tx));

            let exit = node.run().await;
            console.abort();
            match exit {
                Ok(Exit::Relaunch) => relaunch()?,
                Err(e) => {
                    error!("client stopped: {e}");
                    return Err(e);
                }
            }
        }
        Commands::Broker { bind } => {
            let broker = Broker::bind(bind.as_str()).await?;
            broker.serve().await?;
        }
    }
    Ok(())
}

/// Start a fresh copy of this process with the same arguments.
fn relaunch() -> anyhow::Result<()> {
    let exe = std::env::current_exe()?;
    info!("relaunching {}", exe.display());
    std::process::Command::new(exe)
        .args(std::env::args_os().skip(1))
        .spawn()?;
    Ok(())
}
