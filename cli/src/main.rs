mod app;
mod commands;
mod repl;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use wallet_unlock_core::config::AppConfig;
use wallet_unlock_core::Session;
use zeroize::Zeroizing;

use crate::app::App;
use crate::commands::Command;

#[derive(Parser)]
#[command(name = "wallet-unlock", about = "Unlock a staking wallet and keep it staking", version)]
pub(crate) struct Cli {
    /// Config file (default: ~/.config/wallet-unlock/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Node RPC URL
    #[arg(long, env = "WALLET_RPC_URL")]
    rpc_url: Option<String>,

    /// RPC user name
    #[arg(long, env = "WALLET_RPC_USER")]
    rpc_user: Option<String>,

    /// RPC password
    #[arg(long, env = "WALLET_RPC_PASSWORD", hide_env_values = true)]
    rpc_password: Option<String>,

    /// Node cookie file (overrides --rpc-user/--rpc-password)
    #[arg(long)]
    cookie_file: Option<PathBuf>,

    /// Wallet name on multi-wallet nodes
    #[arg(long)]
    wallet: Option<String>,

    /// Allow plain HTTP to a non-local node
    #[arg(long)]
    insecure: bool,

    /// Read the wallet passphrase from stdin (for scripting)
    #[arg(long)]
    password_stdin: bool,

    /// Report the submitted passphrase back as an event
    #[arg(long)]
    emit_password: bool,

    /// Run a single command and exit, e.g. --cmd "unlock 300 staking"
    #[arg(long)]
    cmd: Option<String>,
}

impl Cli {
    /// Config file values, overridden by explicit flags.
    fn load_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::load_from(path)?,
            None => AppConfig::load()?,
        };
        if let Some(url) = &self.rpc_url {
            config.rpc.url = url.clone();
        }
        if let Some(user) = &self.rpc_user {
            config.rpc.user = Some(user.clone());
        }
        if let Some(password) = &self.rpc_password {
            config.rpc.password = Some(password.clone());
        }
        if let Some(cookie) = &self.cookie_file {
            config.rpc.cookie_file = Some(cookie.clone());
        }
        if let Some(wallet) = &self.wallet {
            config.rpc.wallet = Some(wallet.clone());
        }
        Ok(config)
    }

    pub(crate) fn read_passphrase(&self) -> Result<Zeroizing<String>> {
        if self.password_stdin {
            read_password_stdin()
        } else {
            Ok(Zeroizing::new(
                rpassword::prompt_password("Wallet passphrase: ")
                    .context("Failed to read passphrase")?,
            ))
        }
    }
}

fn read_password_stdin() -> Result<Zeroizing<String>> {
    let mut password = Zeroizing::new(String::new());
    std::io::stdin()
        .read_line(&mut password)
        .context("Failed to read passphrase from stdin")?;
    let trimmed = password.trim_end_matches(['\n', '\r']).to_string();
    Ok(Zeroizing::new(trimmed))
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.load_config()?;
    let app = App::connect(&cli, config).await?;

    if let Some(cmd_str) = &cli.cmd {
        run_oneshot(&cli, &app, cmd_str).await
    } else {
        repl::run_repl(&cli, &app).await
    }
}

async fn run_oneshot(cli: &Cli, app: &App, cmd_str: &str) -> Result<()> {
    let command = Command::parse(cmd_str)?;
    if command == Command::Exit {
        return Ok(());
    }

    let (session, mut events) = Session::new();

    let output = app.execute(cli, &session, &command).await?;
    if !output.is_empty() {
        println!("{output}");
    }
    if matches!(command, Command::Unlock { .. }) {
        app.await_confirmation(&mut events).await;
    }

    app.finish(&session).await;
    Ok(())
}
