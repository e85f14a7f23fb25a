//! Proactive throttling from the call-limit header
//!
//! The platform reports its leaky-bucket state on every response as
//! `X-Shopify-Shop-Api-Call-Limit: used/max`. Above [`PAUSE_RATIO`] the client
//! pauses before issuing the next call; above [`WARN_RATIO`] it only logs.

use rand::Rng;
use std::time::Duration;

pub const CALL_LIMIT_HEADER: &str = "X-Shopify-Shop-Api-Call-Limit";

pub const PAUSE_RATIO: f64 = 0.85;
pub const WARN_RATIO: f64 = 0.70;

const PAUSE_BASE: Duration = Duration::from_secs(2);
const MAX_JITTER_MS: u64 = 1000;

/// Parsed call-limit header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallLimit {
    pub used: u32,
    pub max: u32,
}

impl CallLimit {
    /// Parse `"used/max"`; `None` for anything malformed or a zero max
    pub fn parse(value: &str) -> Option<Self> {
        let (used, max) = value.trim().split_once('/')?;
        let used = used.trim().parse().ok()?;
        let max: u32 = max.trim().parse().ok()?;
        if max == 0 {
            return None;
        }
        Some(Self { used, max })
    }

    pub fn utilization(&self) -> f64 {
        f64::from(self.used) / f64::from(self.max)
    }
}

/// What to do before the next call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Throttle {
    Proceed,
    Warn,
    Pause(Duration),
}

/// Decide with a caller-supplied jitter (milliseconds, clamped to 0..=1000)
pub fn assess_with_jitter(limit: CallLimit, jitter_ms: u64) -> Throttle {
    let utilization = limit.utilization();
    if utilization > PAUSE_RATIO {
        Throttle::Pause(PAUSE_BASE + Duration::from_millis(jitter_ms.min(MAX_JITTER_MS)))
    } else if utilization > WARN_RATIO {
        Throttle::Warn
    } else {
        Throttle::Proceed
    }
}

/// Decide with random jitter
pub fn assess(limit: CallLimit) -> Throttle {
    let jitter = rand::thread_rng().gen_range(0..=MAX_JITTER_MS);
    assess_with_jitter(limit, jitter)
}
