use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use wallet_unlock_core::config::AppConfig;
use wallet_unlock_core::{
    timeout_label, AuthError, JsonRpcClient, RpcCaller, RpcSecurityBackend, SecurityBackend,
    Session, SessionEvent, StatusCache, StatusPoller, UnlockRequest, UnlockRequestCoordinator,
};

use crate::commands::{Command, HELP};
use crate::Cli;

/// Connected node plus the coordinator driving it.
pub(crate) struct App {
    coordinator: UnlockRequestCoordinator,
    backend: Arc<dyn SecurityBackend>,
    poller: StatusPoller,
    poll_interval: Duration,
    poll_task: JoinHandle<()>,
}

impl App {
    pub(crate) async fn connect(cli: &Cli, config: AppConfig) -> Result<Self> {
        let client = JsonRpcClient::new(&config.rpc, cli.insecure)
            .context("Failed to set up RPC client")?;
        tracing::debug!(endpoint = client.endpoint(), "connecting to wallet node");
        let rpc: Arc<dyn RpcCaller> = Arc::new(client);

        let cache = Arc::new(StatusCache::new());
        let poll_interval = config.rpc.poll_interval();
        let poller = StatusPoller::new(
            rpc.clone(),
            cache.clone(),
            config.unlock.status_topic.clone(),
            poll_interval,
        );
        poller
            .refresh()
            .await
            .with_context(|| format!("Failed to reach wallet node at {}", config.rpc.url))?;
        let poll_task = poller.spawn();

        let backend: Arc<dyn SecurityBackend> = Arc::new(RpcSecurityBackend::new(rpc.clone()));
        let coordinator =
            UnlockRequestCoordinator::new(backend.clone(), rpc, cache, config.unlock);

        Ok(Self {
            coordinator,
            backend,
            poller,
            poll_interval,
            poll_task,
        })
    }

    pub(crate) fn status_line(&self) -> String {
        match self.coordinator.cached_status() {
            Some(status) => format!("Wallet status: {status}"),
            None => "Wallet status: unknown".to_string(),
        }
    }

    pub(crate) async fn execute(
        &self,
        cli: &Cli,
        session: &Session,
        command: &Command,
    ) -> Result<String> {
        match command {
            Command::Unlock {
                timeout_secs,
                stake_only,
            } => {
                let timeout = self.coordinator.config().request_timeout(*timeout_secs);
                let passphrase = cli.read_passphrase()?;
                let request = UnlockRequest::new(&passphrase, *stake_only, timeout)
                    .with_emit_password(cli.emit_password);

                self.coordinator
                    .unlock(session, request)
                    .await
                    .map_err(|e| match e {
                        AuthError::UnlockFailed(_) => {
                            anyhow::anyhow!("Unlock failed - password was incorrect")
                        }
                        other => anyhow::Error::new(other),
                    })?;

                let mode = if *stake_only { "staking only" } else { "full" };
                Ok(format!("Wallet unlocked ({mode}, {}).", timeout_label(timeout)))
            }
            Command::Lock => {
                self.backend.lock().await?;
                Ok("Wallet locked.".to_string())
            }
            Command::Status => {
                self.poller.refresh().await?;
                Ok(self.status_line())
            }
            Command::Timeouts => {
                let lines: Vec<String> = self
                    .coordinator
                    .config()
                    .timeout_presets()
                    .iter()
                    .map(|p| format!("  {:>5}  {}", p.secs, p.label))
                    .collect();
                Ok(format!("Unlock windows (seconds):\n{}", lines.join("\n")))
            }
            Command::Wait => {
                self.finish(session).await;
                Ok(String::new())
            }
            Command::Help => Ok(HELP.to_string()),
            Command::Exit => Ok(String::new()),
        }
    }

    /// Print events until the unlock is confirmed or two poll intervals pass.
    pub(crate) async fn await_confirmation(&self, events: &mut UnboundedReceiver<SessionEvent>) {
        let deadline = tokio::time::Instant::now() + self.poll_interval * 2;
        loop {
            match tokio::time::timeout_at(deadline, events.recv()).await {
                Ok(Some(event)) => {
                    let confirmed = matches!(event, SessionEvent::UnlockConfirmed { .. });
                    print_event(&event);
                    if confirmed {
                        return;
                    }
                }
                Ok(None) => return,
                Err(_) => {
                    println!("No status change reported yet.");
                    return;
                }
            }
        }
    }

    /// Wait for every armed deferred action, so a staking fallback is not lost on exit.
    pub(crate) async fn finish(&self, session: &Session) {
        let pending = session.pending_actions();
        if pending > 0 {
            println!("Waiting for {pending} pending unlock action(s), Ctrl-C to abandon...");
        }
        session.settle().await;
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.poll_task.abort();
    }
}

fn print_event(event: &SessionEvent) {
    match event {
        SessionEvent::PasswordSubmitted { stake_only, .. } => {
            println!("Passphrase submitted (staking only: {stake_only}).");
        }
        SessionEvent::UnlockConfirmed { status } => println!("Wallet status: {status}"),
    }
}

/// Print session events in the background for the lifetime of the session.
pub(crate) fn print_events(mut events: UnboundedReceiver<SessionEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            print_event(&event);
        }
    })
}
