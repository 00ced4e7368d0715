use std::num::NonZeroU32;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

use crate::error::FetchError;

/// Timeout for calls that don't name their own.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the HTTP client shared by every fetcher in the process.
pub fn http_client(contact_email: Option<&str>) -> Result<reqwest::Client, FetchError> {
    let agent = match contact_email {
        Some(email) => format!("pulse/{} (mailto:{email})", env!("CARGO_PKG_VERSION")),
        None => format!("pulse/{}", env!("CARGO_PKG_VERSION")),
    };
    let client = reqwest::Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .user_agent(agent)
        .build()?;
    Ok(client)
}

/// Token bucket shared by every call to one provider.
#[derive(Clone)]
pub struct Throttle {
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl Throttle {
    pub fn per_second(calls: NonZeroU32) -> Self {
        Self {
            limiter: Arc::new(RateLimiter::direct(Quota::per_second(calls))),
        }
    }

    /// Wait until the next call is allowed.
    pub async fn ready(&self) {
        self.limiter.until_ready().await;
    }
}

impl std::fmt::Debug for Throttle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Throttle").finish_non_exhaustive()
    }
}

/// Stops calls to a provider for a cooldown after it signals a hard stop.
#[derive(Debug, Clone)]
pub struct HardStopGate {
    cooldown: Duration,
    halted_until: Arc<Mutex<Option<Instant>>>,
}

impl HardStopGate {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            halted_until: Arc::new(Mutex::new(None)),
        }
    }

    /// Close the gate for the cooldown period, starting now.
    pub fn trip(&self) {
        let until = Instant::now() + self.cooldown;
        if let Ok(mut halted) = self.halted_until.lock() {
            *halted = Some(until);
        }
        log::warn!(
            "Provider halted for {}s after a hard-stop rate limit",
            self.cooldown.as_secs()
        );
    }

    /// Whether calls may go through.
    pub fn is_open(&self) -> bool {
        let Ok(mut halted) = self.halted_until.lock() else {
            return true;
        };
        match *halted {
            Some(until) if Instant::now() < until => false,
            Some(_) => {
                *halted = None;
                true
            }
            None => true,
        }
    }
}
