// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Batch controller: sequences page captures into one container, or one
// container per page, with page numbering and operator prompts.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use scanwerk_core::config::BatchConfig;
use scanwerk_core::error::ScanwerkError;
use scanwerk_device::Device;
use scanwerk_document::{ContainerEncoder, PageContainer};
use tracing::{debug, info, instrument, warn};

use crate::cancel::CancellationToken;
use crate::pipeline::{CapturePipeline, PageNumber, PageOutcome};

/// Resolution below which the operator is warned.
const LOW_DPI: i32 = 100;

/// Asks the operator to load the next page.
pub trait Prompt {
    /// Wait until page `number` is on the scanner. `Ok(false)` means the
    /// operator closed the input.
    fn ready(&mut self, number: i32) -> io::Result<bool>;
}

/// Prompts on a writer and waits for a line on a reader.
pub struct LinePrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> Prompt for LinePrompt<R, W> {
    fn ready(&mut self, number: i32) -> io::Result<bool> {
        writeln!(self.output, "Place page no. {number} on the scanner.")?;
        writeln!(self.output, "Press <RETURN> to continue.")?;
        writeln!(self.output, "Press Ctrl + D to terminate.")?;
        self.output.flush()?;
        let mut line = String::new();
        Ok(self.input.read_line(&mut line)? > 0)
    }
}

/// Counters for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchState {
    /// Pages still to capture; `None` is unlimited.
    pub remaining: Option<u32>,
    pub next_number: i32,
    pub increment: i32,
    pub prompt_each_page: bool,
    pub pages_written: u32,
}

impl BatchState {
    pub fn new(config: &BatchConfig) -> Self {
        Self {
            remaining: config.count,
            next_number: config.start,
            increment: config.increment,
            prompt_each_page: config.prompt,
            pages_written: 0,
        }
    }

    fn advance(&mut self) {
        self.pages_written += 1;
        self.next_number = self.next_number.saturating_add(self.increment);
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining = remaining.saturating_sub(1);
        }
    }
}

/// Why a run stopped.
#[derive(Debug)]
pub enum StopReason {
    /// Every requested page was captured, or the single page of a non-batch run.
    Completed,
    NoDocuments,
    /// The operator ended input at a prompt.
    PromptClosed,
    Cancelled,
    Failed(ScanwerkError),
}

/// Result of a run.
#[derive(Debug)]
pub struct BatchReport {
    pub batch: bool,
    /// Numbers of the pages written, in order.
    pub pages: Vec<i32>,
    /// Containers kept on disk.
    pub files: Vec<PathBuf>,
    pub stop: StopReason,
}

impl BatchReport {
    pub fn pages_written(&self) -> usize {
        self.pages.len()
    }

    /// Process exit code: 2 when a batch found no input at all, 1 on failure.
    pub fn exit_code(&self) -> u8 {
        match self.stop {
            StopReason::Failed(_) => 1,
            StopReason::NoDocuments if self.batch && self.pages.is_empty() => 2,
            _ => 0,
        }
    }
}

/// Runs the page loop.
pub struct BatchController<E: ContainerEncoder> {
    encoder: E,
    template: String,
    enabled: bool,
    file_per_page: bool,
    total: u32,
    state: BatchState,
    cancel: CancellationToken,
}

impl<E: ContainerEncoder> BatchController<E> {
    /// `template` names the output; with `multi_page` off a batch writes one
    /// container per page.
    pub fn new(
        encoder: E,
        template: impl Into<String>,
        multi_page: bool,
        config: &BatchConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            encoder,
            template: template.into(),
            enabled: config.enabled,
            file_per_page: config.enabled && !multi_page,
            total: config.count.unwrap_or(0),
            state: BatchState::new(config),
            cancel,
        }
    }

    /// Log what is about to happen.
    pub fn announce(&self, resolution: Option<i32>) {
        let dpi = resolution.unwrap_or(0);
        info!("scanning to {} at {} dpi", self.template, dpi);
        if dpi < LOW_DPI {
            warn!("you are scanning at a low dpi value, please check your parameters");
        }
        if self.enabled {
            let amount = match self.state.remaining {
                Some(count) => count.to_string(),
                None => "an unknown amount of".to_string(),
            };
            info!(
                "{} pages, incrementing by {}, numbering from {}",
                amount, self.state.increment, self.state.next_number
            );
        }
    }

    /// Capture pages until the batch is complete or something stops it.
    #[instrument(skip_all, fields(batch = self.enabled, template = %self.template))]
    pub fn run(
        &mut self,
        device: &mut dyn Device,
        pipeline: &mut CapturePipeline,
        prompt: &mut dyn Prompt,
    ) -> BatchReport {
        let mut pages = Vec::new();
        let mut files = Vec::new();
        let mut open: Option<E::Container> = None;

        let mut stop = loop {
            if self.cancel.is_cancelled() {
                break StopReason::Cancelled;
            }
            if self.enabled && self.state.remaining == Some(0) {
                break StopReason::Completed;
            }

            let number = self.state.next_number;
            let container = match open {
                Some(ref mut container) => container,
                None => match self.encoder.open(&self.template, number) {
                    Ok(container) => open.insert(container),
                    Err(err) => break StopReason::Failed(err),
                },
            };

            if self.state.prompt_each_page {
                match prompt.ready(number) {
                    Ok(true) => {}
                    Ok(false) => {
                        info!("batch terminated, {} pages scanned", self.state.pages_written);
                        break StopReason::PromptClosed;
                    }
                    Err(err) => break StopReason::Failed(err.into()),
                }
                if self.cancel.is_cancelled() {
                    break StopReason::Cancelled;
                }
            }

            if self.enabled {
                info!("scanning page {number}");
            }
            let page = self.enabled.then_some(PageNumber {
                number,
                total: self.total,
            });

            match pipeline.capture(device, container, page) {
                Ok(PageOutcome::Done(session)) => {
                    if let Err(err) = container.finalize_page() {
                        break StopReason::Failed(err);
                    }
                    if self.enabled {
                        info!("scanned page {} to {}", number, container.path().display());
                    }
                    debug!(rows = session.rows_written, bytes = session.bytes_read, "page done");
                    pages.push(number);
                    self.state.advance();
                }
                Ok(PageOutcome::NoDocuments) => {
                    info!("no (more) documents in the scanner");
                    break StopReason::NoDocuments;
                }
                Ok(PageOutcome::Cancelled(_)) => break StopReason::Cancelled,
                Err(err) => break StopReason::Failed(err),
            }

            if self.file_per_page {
                if let Some(container) = open.take() {
                    match container.close() {
                        Ok(path) => files.push(path),
                        Err(err) => break StopReason::Failed(err),
                    }
                }
            }

            if !self.enabled {
                break StopReason::Completed;
            }
        };

        if self.enabled {
            info!("scanned {} pages", self.state.pages_written);
        }

        if let Some(container) = open {
            let empty = container.pages() == 0;
            match container.close() {
                Ok(path) if empty => {
                    if let Err(err) = self.encoder.delete(&path) {
                        warn!("could not remove empty {}: {err}", path.display());
                    }
                }
                Ok(path) => files.push(path),
                Err(err) if matches!(stop, StopReason::Failed(_)) => {
                    warn!("closing the output failed: {err}");
                }
                Err(err) => stop = StopReason::Failed(err),
            }
        }

        BatchReport {
            batch: self.enabled,
            pages,
            files,
            stop,
        }
    }
}
