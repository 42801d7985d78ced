//! Keeps a [`StatusCache`] topic fresh by polling the node.
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::Result;
use crate::rpc::RpcCaller;
use crate::status::StatusCache;

#[derive(Clone)]
pub struct StatusPoller {
    rpc: Arc<dyn RpcCaller>,
    cache: Arc<StatusCache>,
    method: String,
    interval: Duration,
}

impl StatusPoller {
    /// Poll `method` (also used as the cache topic) every `interval`.
    pub fn new(
        rpc: Arc<dyn RpcCaller>,
        cache: Arc<StatusCache>,
        method: impl Into<String>,
        interval: Duration,
    ) -> Self {
        Self {
            rpc,
            cache,
            method: method.into(),
            interval,
        }
    }

    /// Poll once and publish the result.
    pub async fn refresh(&self) -> Result<()> {
        let value = self.rpc.call(&self.method, vec![]).await?;
        self.cache.publish(&self.method, value);
        Ok(())
    }

    /// Poll forever on a background task. Failed polls keep the previous snapshot.
    pub fn spawn(&self) -> JoinHandle<()> {
        let poller = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poller.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = poller.refresh().await {
                    tracing::warn!(method = %poller.method, error = %e, "status poll failed");
                }
            }
        })
    }
}
