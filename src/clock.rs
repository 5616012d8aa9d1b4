use chrono::{DateTime, Utc};
use uuid::Uuid;

/// UTC time source, injected so tests can fix both "now" and ids.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fixed clock for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// UUID generator, injected for the same reason as `Clock`.
pub trait IdGen: Send + Sync {
    fn new_id(&self) -> Uuid;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGen;

impl IdGen for UuidGen {
    fn new_id(&self) -> Uuid {
        Uuid::new_v4()
    }
}

/// Deterministic id generator for tests: counts up from a seed, encoded as a
/// UUID so call sites don't need to special-case it.
#[derive(Debug, Clone)]
pub struct SeqGen {
    next: std::sync::Arc<std::sync::atomic::AtomicU64>,
}

impl SeqGen {
    pub fn new(seed: u64) -> Self {
        Self {
            next: std::sync::Arc::new(std::sync::atomic::AtomicU64::new(seed)),
        }
    }
}

impl IdGen for SeqGen {
    fn new_id(&self) -> Uuid {
        let n = self.next.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Uuid::from_u128(n as u128)
    }
}
