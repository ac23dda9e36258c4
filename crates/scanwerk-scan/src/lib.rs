// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanwerk Scan: drives the device through one page at a time and sequences
// pages into output containers.

pub mod batch;
pub mod cancel;
pub mod pipeline;
pub mod retry;

#[cfg(test)]
mod testing;

pub use batch::{BatchController, BatchReport, BatchState, LinePrompt, Prompt, StopReason};
pub use cancel::CancellationToken;
pub use pipeline::{
    CapturePipeline, CaptureSession, CaptureStatus, PageNumber, PageOutcome, PageStamp,
};
pub use retry::{RetryDecision, WarmupPolicy};
