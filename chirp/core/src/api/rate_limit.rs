//! Rate-limit notifications
//!
//! Every response carrying `X-RateLimit-*` headers is turned into a
//! [`RateLimitStatus`] and pushed to registered listeners. Authenticated
//! requests count against the account, anonymous ones against the caller's IP
//! address, so the two scopes have separate listener lists.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::dispatch::panic_message;
use crate::model::RateLimitStatus;

/// Receives rate-limit updates
pub trait RateLimitStatusListener: Send + Sync {
    /// Called after every response that carries rate-limit headers
    fn on_rate_limit_status(&self, status: &RateLimitStatus);
}

type ListenerList = Arc<RwLock<Vec<Arc<dyn RateLimitStatusListener>>>>;

/// Account- and IP-scoped listener registry
///
/// Clones share the same lists.
#[derive(Clone, Default)]
pub struct RateLimitListeners {
    account: ListenerList,
    ip: ListenerList,
}

/// Which allowance a request counted against
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitScope {
    /// The authenticated account
    Account,
    /// The caller's IP address
    Ip,
}

impl RateLimitScope {
    /// Scope for a request made with or without credentials
    #[must_use]
    pub fn for_request(authenticated: bool) -> Self {
        if authenticated {
            Self::Account
        } else {
            Self::Ip
        }
    }
}

impl RateLimitListeners {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register for account-scoped updates
    pub fn add_account_listener(&self, listener: Arc<dyn RateLimitStatusListener>) {
        self.account.write().push(listener);
    }

    /// Register for IP-scoped updates
    pub fn add_ip_listener(&self, listener: Arc<dyn RateLimitStatusListener>) {
        self.ip.write().push(listener);
    }

    /// Number of listeners in a scope
    #[must_use]
    pub fn len(&self, scope: RateLimitScope) -> usize {
        self.list(scope).read().len()
    }

    /// Whether no listener is registered in either scope
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.account.read().is_empty() && self.ip.read().is_empty()
    }

    /// Forward the headers of one response
    ///
    /// Does nothing when the headers are missing or not numeric. A panicking
    /// listener is logged and the remaining listeners still run.
    pub fn notify(&self, headers: &HashMap<String, String>, scope: RateLimitScope) {
        let listeners = self.list(scope).read().clone();
        if listeners.is_empty() {
            return;
        }
        let Some(status) = RateLimitStatus::from_headers(headers) else {
            return;
        };

        tracing::trace!(
            ?scope,
            remaining = status.remaining_hits,
            limit = status.hourly_limit,
            "Rate limit update"
        );
        for listener in listeners {
            let delivered =
                panic::catch_unwind(AssertUnwindSafe(|| listener.on_rate_limit_status(&status)));
            if let Err(payload) = delivered {
                tracing::error!(
                    ?scope,
                    panic = %panic_message(payload.as_ref()),
                    "Rate limit listener panicked"
                );
            }
        }
    }

    fn list(&self, scope: RateLimitScope) -> &ListenerList {
        match scope {
            RateLimitScope::Account => &self.account,
            RateLimitScope::Ip => &self.ip,
        }
    }
}

impl std::fmt::Debug for RateLimitListeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitListeners")
            .field("account", &self.account.read().len())
            .field("ip", &self.ip.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LIMIT_HEADER, REMAINING_HEADER, RESET_HEADER};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<u32>>);

    impl RateLimitStatusListener for Recorder {
        fn on_rate_limit_status(&self, status: &RateLimitStatus) {
            self.0.lock().push(status.remaining_hits);
        }
    }

    fn headers(remaining: &str) -> HashMap<String, String> {
        [
            (LIMIT_HEADER, "150"),
            (REMAINING_HEADER, remaining),
            (RESET_HEADER, "1250000000"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn test_scopes_are_separate() {
        let listeners = RateLimitListeners::new();
        let account = Arc::new(Recorder::default());
        let ip = Arc::new(Recorder::default());
        listeners.add_account_listener(account.clone());
        listeners.add_ip_listener(ip.clone());

        listeners.notify(&headers("10"), RateLimitScope::Account);
        listeners.notify(&headers("99"), RateLimitScope::Ip);
        listeners.notify(&headers("9"), RateLimitScope::for_request(true));

        assert_eq!(*account.0.lock(), vec![10, 9]);
        assert_eq!(*ip.0.lock(), vec![99]);
        assert_eq!(listeners.len(RateLimitScope::Account), 1);
    }

    struct Exploding;

    impl RateLimitStatusListener for Exploding {
        fn on_rate_limit_status(&self, _status: &RateLimitStatus) {
            panic!("listener bug");
        }
    }

    #[test]
    fn test_panicking_listener_does_not_starve_the_rest() {
        let listeners = RateLimitListeners::new();
        let after = Arc::new(Recorder::default());
        listeners.add_account_listener(Arc::new(Exploding));
        listeners.add_account_listener(after.clone());

        listeners.notify(&headers("3"), RateLimitScope::Account);
        listeners.notify(&headers("2"), RateLimitScope::Account);

        assert_eq!(*after.0.lock(), vec![3, 2]);
    }

    #[test]
    fn test_missing_headers_are_ignored() {
        let listeners = RateLimitListeners::new();
        let account = Arc::new(Recorder::default());
        listeners.add_account_listener(account.clone());

        listeners.notify(&HashMap::new(), RateLimitScope::Account);
        assert!(account.0.lock().is_empty());
    }

    #[test]
    fn test_clones_share_registrations() {
        let listeners = RateLimitListeners::new();
        let clone = listeners.clone();
        clone.add_ip_listener(Arc::new(Recorder::default()));
        assert!(!listeners.is_empty());
    }
}
