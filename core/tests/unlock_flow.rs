//! End-to-end unlock flows against in-memory backend, RPC and status fakes.
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::Instant;
use wallet_unlock_core::{
    AuthError, EncryptionStatus, RpcCaller, RpcError, SecurityBackend, Session, SessionEvent,
    StatusCache, UnlockConfig, UnlockRequest, UnlockRequestCoordinator,
};

#[derive(Debug, Clone, PartialEq)]
enum BackendCall {
    Lock,
    Unlock {
        secret: String,
        timeout_secs: u64,
        stake_only: bool,
    },
}

#[derive(Default)]
struct FakeBackend {
    calls: Mutex<Vec<BackendCall>>,
    wrong_secret: bool,
    lock_fails: bool,
}

#[async_trait]
impl SecurityBackend for FakeBackend {
    async fn lock(&self) -> Result<(), AuthError> {
        self.calls.lock().unwrap().push(BackendCall::Lock);
        if self.lock_fails {
            return Err(AuthError::LockFailed("node offline".into()));
        }
        Ok(())
    }

    async fn unlock(
        &self,
        secret: &str,
        timeout_secs: u64,
        stake_only: bool,
    ) -> Result<(), AuthError> {
        self.calls.lock().unwrap().push(BackendCall::Unlock {
            secret: secret.to_string(),
            timeout_secs,
            stake_only,
        });
        if self.wrong_secret {
            return Err(AuthError::UnlockFailed("incorrect passphrase".into()));
        }
        Ok(())
    }
}

#[derive(Default)]
struct FakeRpc {
    calls: Mutex<Vec<(String, Vec<Value>)>>,
    fail: bool,
}

#[async_trait]
impl RpcCaller for FakeRpc {
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError> {
        self.calls.lock().unwrap().push((method.to_string(), params));
        if self.fail {
            return Err(RpcError::Transport("connection reset".into()));
        }
        Ok(Value::Null)
    }
}

struct Harness {
    backend: Arc<FakeBackend>,
    rpc: Arc<FakeRpc>,
    cache: Arc<StatusCache>,
    coordinator: UnlockRequestCoordinator,
}

impl Harness {
    fn new(initial: &str) -> Self {
        Self::with(initial, FakeBackend::default(), FakeRpc::default(), UnlockConfig::default())
    }

    fn with(initial: &str, backend: FakeBackend, rpc: FakeRpc, config: UnlockConfig) -> Self {
        let backend = Arc::new(backend);
        let rpc = Arc::new(rpc);
        let cache = Arc::new(StatusCache::new());
        set_status(&cache, initial);
        let coordinator =
            UnlockRequestCoordinator::new(backend.clone(), rpc.clone(), cache.clone(), config);
        Self {
            backend,
            rpc,
            cache,
            coordinator,
        }
    }

    fn backend_calls(&self) -> Vec<BackendCall> {
        self.backend.calls.lock().unwrap().clone()
    }

    fn rpc_calls(&self) -> Vec<(String, Vec<Value>)> {
        self.rpc.calls.lock().unwrap().clone()
    }

    fn publish(&self, status: &str) {
        set_status(&self.cache, status);
    }
}

fn set_status(cache: &StatusCache, status: &str) {
    cache.publish("getwalletinfo", json!({ "encryptionstatus": status }));
}

/// Let spawned tasks run without moving the paused clock.
async fn drain() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

fn confirmed(rx: &mut UnboundedReceiver<SessionEvent>) -> Vec<EncryptionStatus> {
    let mut out = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        if let SessionEvent::UnlockConfirmed { status } = ev {
            out.push(status);
        }
    }
    out
}

#[tokio::test(start_paused = true)]
async fn locked_wallet_full_unlock_confirms_once_without_fallback_call() {
    let h = Harness::new("Locked");
    let (session, mut rx) = Session::new();

    h.coordinator
        .unlock(&session, UnlockRequest::new("hunter2", false, 300))
        .await
        .unwrap();

    assert_eq!(
        h.backend_calls(),
        vec![
            BackendCall::Lock,
            BackendCall::Unlock {
                secret: "hunter2".into(),
                timeout_secs: 300,
                stake_only: false,
            },
        ]
    );

    h.publish("Unlocked");
    drain().await;
    h.publish("Unlocked");
    drain().await;
    assert_eq!(confirmed(&mut rx), vec![EncryptionStatus::UnlockedFull]);

    let start = Instant::now();
    session.settle().await;
    assert!(start.elapsed() < Duration::from_millis(510));
    assert!(session.secret().is_empty());

    tokio::time::advance(Duration::from_secs(3600)).await;
    drain().await;
    assert!(h.rpc_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn staking_wallet_falls_back_to_staking_after_window() {
    let h = Harness::new("Unlocked, staking only");
    let (session, _rx) = Session::new();

    h.coordinator
        .unlock(&session, UnlockRequest::new("hunter2", true, 180))
        .await
        .unwrap();

    assert_eq!(
        h.backend_calls()[1],
        BackendCall::Unlock {
            secret: "hunter2".into(),
            timeout_secs: 0,
            stake_only: true,
        }
    );

    tokio::time::advance(Duration::from_secs(180)).await;
    drain().await;
    assert!(h.rpc_calls().is_empty());
    assert!(!session.secret().is_empty());

    tokio::time::advance(Duration::from_secs(1)).await;
    drain().await;
    assert_eq!(
        h.rpc_calls(),
        vec![(
            "encryptwallet".to_string(),
            vec![json!("hunter2"), json!(0), json!(true)]
        )]
    );
    assert!(session.secret().is_empty());
}

#[tokio::test(start_paused = true)]
async fn full_unlock_of_staking_wallet_restores_staking_at_window_plus_one() {
    let h = Harness::new("Unlocked, staking only");
    let (session, _rx) = Session::new();

    h.coordinator
        .unlock(&session, UnlockRequest::new("hunter2", false, 60))
        .await
        .unwrap();
    assert_eq!(
        h.backend_calls()[1],
        BackendCall::Unlock {
            secret: "hunter2".into(),
            timeout_secs: 60,
            stake_only: false,
        }
    );

    let start = Instant::now();
    session.settle().await;
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(61) && elapsed < Duration::from_millis(61_010));
    drain().await;
    assert_eq!(h.rpc_calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn initial_value_is_never_reported() {
    let h = Harness::new("Locked");
    let (session, mut rx) = Session::new();

    h.coordinator
        .unlock(&session, UnlockRequest::new("hunter2", false, 300))
        .await
        .unwrap();
    drain().await;
    assert!(confirmed(&mut rx).is_empty());

    // Same value again still counts as the first post-subscription delivery.
    h.publish("Locked");
    drain().await;
    h.publish("Unlocked");
    drain().await;
    assert_eq!(confirmed(&mut rx), vec![EncryptionStatus::Locked]);
}

#[tokio::test(start_paused = true)]
async fn destroyed_session_is_never_notified_but_timer_still_fires() {
    let h = Harness::new("Unlocked, staking only");
    let (session, mut rx) = Session::new();

    h.coordinator
        .unlock(&session, UnlockRequest::new("hunter2", true, 10))
        .await
        .unwrap();
    drain().await;
    session.destroy();

    h.publish("Unlocked");
    drain().await;
    h.publish("Locked");
    drain().await;
    assert!(confirmed(&mut rx).is_empty());

    tokio::time::advance(Duration::from_secs(11)).await;
    drain().await;
    assert_eq!(h.rpc_calls().len(), 1);
    assert!(session.secret().is_empty());
}

#[tokio::test(start_paused = true)]
async fn wrong_secret_fails_without_watcher() {
    let h = Harness::with(
        "Locked",
        FakeBackend {
            wrong_secret: true,
            ..FakeBackend::default()
        },
        FakeRpc::default(),
        UnlockConfig::default(),
    );
    let (session, mut rx) = Session::new();

    let err = h
        .coordinator
        .unlock(&session, UnlockRequest::new("wrong", false, 300))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::UnlockFailed(_)));

    h.publish("Locked");
    h.publish("Unlocked");
    drain().await;
    assert!(confirmed(&mut rx).is_empty());

    // The reset was armed before the unlock call and still wipes the secret.
    session.settle().await;
    assert!(session.secret().is_empty());
}

#[tokio::test(start_paused = true)]
async fn lock_failure_aborts_before_arming() {
    let h = Harness::with(
        "Locked",
        FakeBackend {
            lock_fails: true,
            ..FakeBackend::default()
        },
        FakeRpc::default(),
        UnlockConfig::default(),
    );
    let (session, _rx) = Session::new();

    let err = h
        .coordinator
        .unlock(&session, UnlockRequest::new("hunter2", false, 300))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::LockFailed(_)));
    assert_eq!(h.backend_calls(), vec![BackendCall::Lock]);
    assert_eq!(session.pending_actions(), 0);

    // Nothing was armed to clear it, so the secret must never have been held.
    tokio::time::sleep(Duration::from_secs(3600)).await;
    assert!(session.secret().is_empty());
}

#[tokio::test(start_paused = true)]
async fn emit_password_only_skips_backend() {
    let h = Harness::new("Locked");
    let (session, mut rx) = Session::new();

    let request = UnlockRequest::new("hunter2", true, 300)
        .with_emit_password(true)
        .with_emit_unlock(false);
    h.coordinator.unlock(&session, request).await.unwrap();

    match rx.try_recv().unwrap() {
        SessionEvent::PasswordSubmitted { secret, stake_only } => {
            assert_eq!(secret.as_str(), "hunter2");
            assert!(stake_only);
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert!(h.backend_calls().is_empty());
    assert_eq!(session.pending_actions(), 0);

    tokio::time::sleep(Duration::from_secs(3600)).await;
    assert!(session.secret().is_empty());
}

#[tokio::test(start_paused = true)]
async fn emit_password_precedes_unlock() {
    let h = Harness::new("Locked");
    let (session, mut rx) = Session::new();

    let request = UnlockRequest::new("hunter2", false, 120).with_emit_password(true);
    h.coordinator.unlock(&session, request).await.unwrap();

    assert!(matches!(
        rx.try_recv().unwrap(),
        SessionEvent::PasswordSubmitted { .. }
    ));
    assert_eq!(h.backend_calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn overlapping_requests_both_fire() {
    let h = Harness::new("Unlocked, staking only");
    let (session, _rx) = Session::new();

    h.coordinator
        .unlock(&session, UnlockRequest::new("first", true, 30))
        .await
        .unwrap();
    h.coordinator
        .unlock(&session, UnlockRequest::new("second", true, 60))
        .await
        .unwrap();
    assert_eq!(session.pending_actions(), 2);

    session.settle().await;
    drain().await;
    let secrets: Vec<Value> = h.rpc_calls().into_iter().map(|(_, p)| p[0].clone()).collect();
    assert_eq!(secrets, vec![json!("first"), json!("second")]);
}

#[tokio::test(start_paused = true)]
async fn fallback_rpc_failure_is_swallowed() {
    let h = Harness::with(
        "Unlocked, staking only",
        FakeBackend::default(),
        FakeRpc {
            fail: true,
            ..FakeRpc::default()
        },
        UnlockConfig::default(),
    );
    let (session, _rx) = Session::new();

    h.coordinator
        .unlock(&session, UnlockRequest::new("hunter2", true, 5))
        .await
        .unwrap();
    session.settle().await;
    drain().await;

    assert_eq!(h.rpc_calls().len(), 1);
    assert!(session.secret().is_empty());
}

#[tokio::test(start_paused = true)]
async fn always_unlocked_requests_indefinite_window() {
    let config = UnlockConfig {
        always_unlocked: true,
        ..UnlockConfig::default()
    };
    let h = Harness::with("Locked", FakeBackend::default(), FakeRpc::default(), config);
    let (session, _rx) = Session::new();

    h.coordinator
        .unlock(&session, UnlockRequest::new("hunter2", false, 600))
        .await
        .unwrap();
    assert_eq!(
        h.backend_calls()[1],
        BackendCall::Unlock {
            secret: "hunter2".into(),
            timeout_secs: 0,
            stake_only: false,
        }
    );
}
