/// Ephemeral passphrase storage for a single unlock session.
///
/// The buffer is shared between the coordinator and the deferred action it
/// arms, so it is a cheap cloneable handle. Replaced or cleared contents are
/// zeroized.
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use zeroize::Zeroizing;

#[derive(Clone, Default)]
pub struct SecretBuffer {
    inner: Arc<Mutex<Zeroizing<String>>>,
}

impl SecretBuffer {
    pub fn new(secret: &str) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Zeroizing::new(secret.to_owned()))),
        }
    }

    /// Replace the held secret. The previous value is zeroized on drop.
    pub fn set(&self, secret: &str) {
        *self.guard() = Zeroizing::new(secret.to_owned());
    }

    /// Copy of the current secret, zeroized when the caller drops it.
    pub fn snapshot(&self) -> Zeroizing<String> {
        Zeroizing::new(self.guard().as_str().to_owned())
    }

    /// Overwrite the secret with an empty value.
    pub fn clear(&self) {
        self.set("");
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }

    fn guard(&self) -> MutexGuard<'_, Zeroizing<String>> {
        // Poison is ignored: the guarded String is always valid.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl fmt::Debug for SecretBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretBuffer")
            .field("empty", &self.is_empty())
            .finish_non_exhaustive()
    }
}
