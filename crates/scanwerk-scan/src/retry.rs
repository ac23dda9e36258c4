// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Warm-up retry for starting a transfer.
//
// A lamp that is still warming up is the only retryable status. Start is
// attempted a fixed number of times with a fixed pause in between; a device
// still warming up after the last attempt is treated as frozen.

use std::thread;
use std::time::{Duration, Instant};

use scanwerk_core::config::CaptureConfig;
use scanwerk_core::{Status, StatusClass};
use tracing::{debug, info, warn};

use crate::cancel::CancellationToken;

/// Longest uninterrupted sleep while waiting out a warm-up.
const WAIT_SLICE: Duration = Duration::from_millis(200);

/// Retry budget for starting a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarmupPolicy {
    /// Start attempts in total, including the first.
    pub max_attempts: u32,
    /// Pause between attempts.
    pub delay: Duration,
}

impl Default for WarmupPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            delay: Duration::from_secs(15),
        }
    }
}

impl From<&CaptureConfig> for WarmupPolicy {
    fn from(config: &CaptureConfig) -> Self {
        Self {
            max_attempts: config.warmup_attempts.max(1),
            delay: Duration::from_secs(config.warmup_delay_secs),
        }
    }
}

/// What to do after a failed start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Start again after this pause.
    RetryAfter(Duration),
    /// Not retryable; the class says whether this is control flow or failure.
    GiveUp(StatusClass),
    /// Still warming up after the last permitted attempt.
    Exhausted,
}

/// Decide what follows start attempt number `attempt` (1-based) returning `status`.
pub fn should_retry(status: Status, attempt: u32, policy: &WarmupPolicy) -> RetryDecision {
    match status.class() {
        StatusClass::Informational => {
            debug!(%status, "start ended with a control-flow status");
            RetryDecision::GiveUp(StatusClass::Informational)
        }
        StatusClass::Terminal => {
            debug!(%status, "start failed, not retrying");
            RetryDecision::GiveUp(StatusClass::Terminal)
        }
        StatusClass::Retryable => {
            if attempt >= policy.max_attempts {
                warn!(attempt, max = policy.max_attempts, "warm-up retry limit exhausted");
                RetryDecision::Exhausted
            } else {
                info!(
                    "the scanner is warming up, will retry in {} seconds",
                    policy.delay.as_secs()
                );
                RetryDecision::RetryAfter(policy.delay)
            }
        }
    }
}

/// Sleep for `delay`, checking `cancel` between short slices. Returns
/// `false` as soon as an interrupt has arrived.
pub fn wait(delay: Duration, cancel: &CancellationToken) -> bool {
    let deadline = Instant::now() + delay;
    loop {
        if cancel.is_cancelled() {
            debug!("warm-up wait interrupted");
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep((deadline - now).min(WAIT_SLICE));
    }
}
