//! Owner loop configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::util::{PinConfig, WaitBudget};

/// Tuning for the owner thread's run loop.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Name given to a spawned owner thread.
    pub thread_name: String,
    /// Maximum ops drained per `run_pending` round.
    pub burst: usize,
    /// Spin iterations before yielding, for both waiters and the idle owner.
    pub spin_cap: u32,
    /// Yields before parking.
    pub yield_cap: u32,
    /// Upper bound on one idle park of the owner thread, in microseconds.
    pub idle_park_us: u64,
    /// Optional pinning for a spawned owner thread.
    pub pin: Option<PinConfig>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            thread_name: "owner".to_string(),
            burst: 64,
            spin_cap: 128,
            yield_cap: 8,
            idle_park_us: 500,
            pin: None,
        }
    }
}

impl DispatchConfig {
    /// Defaults overlaid with `OWNER_AFFINITY_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().overlay(|key| std::env::var(key).ok())
    }

    /// Overlay values looked up by `get`. Unparsable values are skipped.
    pub fn overlay(mut self, get: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = parse(&get, "OWNER_AFFINITY_BURST") {
            self.burst = v;
        }
        if let Some(v) = parse(&get, "OWNER_AFFINITY_SPIN_CAP") {
            self.spin_cap = v;
        }
        if let Some(v) = parse(&get, "OWNER_AFFINITY_YIELD_CAP") {
            self.yield_cap = v;
        }
        if let Some(v) = parse(&get, "OWNER_AFFINITY_IDLE_PARK_US") {
            self.idle_park_us = v;
        }
        if let Some(core) = parse::<usize>(&get, "OWNER_AFFINITY_PIN_CORE") {
            self.pin = Some(PinConfig::core(core));
        }
        self
    }

    /// Burst clamped to at least one op per round.
    #[inline]
    pub fn effective_burst(&self) -> usize {
        self.burst.max(1)
    }

    /// Idle park duration.
    #[inline]
    pub fn idle_park(&self) -> Duration {
        Duration::from_micros(self.idle_park_us)
    }

    /// A fresh wait budget using the configured caps.
    #[inline]
    pub fn budget(&self) -> WaitBudget {
        WaitBudget::with_caps(self.spin_cap, self.yield_cap)
    }
}

fn parse<T: std::str::FromStr>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = get(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable configuration value");
            None
        }
    }
}
