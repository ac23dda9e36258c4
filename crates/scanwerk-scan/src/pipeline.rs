// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capture pipeline: acquires one page from the device and streams its rows
// into the open container.
//
// Per page: Idle -> Negotiating -> Streaming -> Done | NoDocuments |
// Cancelled | Failed. Failed is reported as `Err`.

use chrono::Local;
use scanwerk_core::config::{CaptureConfig, TagConfig};
use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::{DeviceInfo, FrameFormat, Parameters, Status, StatusClass};
use scanwerk_device::Device;
use scanwerk_document::host;
use scanwerk_document::{Field, PageContainer, Photometric, Threshholding};
use tracing::{debug, info, instrument, trace, warn};

use crate::cancel::CancellationToken;
use crate::retry::{self, RetryDecision, WarmupPolicy};

/// Where a page is in its life.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CaptureStatus {
    #[default]
    Idle,
    Negotiating,
    Streaming,
    Done,
    NoDocuments,
    Cancelled,
    Failed,
}

/// Counters for one page. Discarded when the page ends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureSession {
    pub status: CaptureStatus,
    pub parameters: Option<Parameters>,
    /// `bytes_per_line * lines`, when the device announced its line count.
    pub bytes_expected: Option<u64>,
    pub bytes_read: u64,
    pub rows_written: u32,
    /// The device delivered more than it announced.
    pub overrun: bool,
}

impl CaptureSession {
    fn enter(&mut self, status: CaptureStatus) {
        trace!(from = ?self.status, to = ?status, "capture state");
        self.status = status;
    }
}

/// How a page ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    Done(CaptureSession),
    /// The feeder is empty. Nothing was written.
    NoDocuments,
    Cancelled(CaptureSession),
}

/// Page number written into the page metadata while batching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageNumber {
    pub number: i32,
    /// Pages in the batch, 0 when unknown.
    pub total: u32,
}

/// Metadata shared by every page of a run.
#[derive(Debug, Clone, Default)]
pub struct PageStamp {
    /// Resolution in dpi.
    pub resolution: Option<u32>,
    pub software: String,
    pub host_computer: Option<String>,
    pub make: String,
    pub model: String,
    pub tags: TagConfig,
}

impl PageStamp {
    pub fn new(device: &DeviceInfo, resolution: Option<i32>, tags: TagConfig) -> Self {
        Self {
            resolution: resolution.and_then(|dpi| u32::try_from(dpi).ok()).filter(|&dpi| dpi > 0),
            software: host::software(),
            host_computer: host::host_computer(),
            make: device.vendor.clone(),
            model: device.model.clone(),
            tags,
        }
    }

    fn fields(&self) -> Vec<Field> {
        let mut fields = vec![
            Field::DateTime(Local::now().naive_local()),
            Field::Software(self.software.clone()),
        ];
        if let Some(dpi) = self.resolution {
            fields.push(Field::Resolution(dpi));
        }
        if let Some(host) = &self.host_computer {
            fields.push(Field::HostComputer(host.clone()));
        }
        if !self.make.is_empty() {
            fields.push(Field::Make(self.make.clone()));
        }
        if !self.model.is_empty() {
            fields.push(Field::Model(self.model.clone()));
        }

        let tags = &self.tags;
        let text: [(&Option<String>, fn(String) -> Field); 4] = [
            (&tags.artist, Field::Artist),
            (&tags.copyright, Field::Copyright),
            (&tags.document_name, Field::DocumentName),
            (&tags.image_description, Field::ImageDescription),
        ];
        for (value, field) in text {
            if let Some(value) = value {
                fields.push(field(value.clone()));
            }
        }
        if let Some(orientation) = tags.orientation {
            fields.push(Field::Orientation(orientation));
        }
        fields
    }
}

/// Whether the container can hold this frame format at this depth.
pub fn is_supported(params: &Parameters) -> bool {
    match params.format {
        FrameFormat::Red | FrameFormat::Green | FrameFormat::Blue => params.depth == 8,
        FrameFormat::Rgb | FrameFormat::Rgbi => matches!(params.depth, 8 | 16),
        FrameFormat::Gray | FrameFormat::Infrared => matches!(params.depth, 1 | 8 | 16),
    }
}

/// Image layout fields for a page with these parameters.
pub fn layout_fields(params: &Parameters) -> Vec<Field> {
    let samples = params.samples_per_pixel();
    let mut fields = vec![
        Field::ImageWidth(params.pixels_per_line),
        Field::BitsPerSample(params.depth as u16),
    ];
    if let Some(lines) = params.lines {
        fields.push(Field::ImageLength(lines));
    }

    if params.depth == 1 {
        fields.extend([
            Field::SamplesPerPixel(1),
            Field::Photometric(Photometric::MinIsWhite),
            Field::Threshholding(Threshholding::Bilevel),
        ]);
        return fields;
    }

    match params.format {
        FrameFormat::Gray | FrameFormat::Infrared => fields.extend([
            Field::SamplesPerPixel(samples),
            Field::Photometric(Photometric::MinIsBlack),
            Field::Threshholding(Threshholding::Halftone),
        ]),
        FrameFormat::Red | FrameFormat::Green | FrameFormat::Blue => fields.extend([
            Field::SamplesPerPixel(1),
            Field::Photometric(Photometric::MinIsBlack),
        ]),
        FrameFormat::Rgb => fields.extend([
            Field::SamplesPerPixel(samples),
            Field::Photometric(Photometric::Rgb),
        ]),
        FrameFormat::Rgbi => fields.extend([
            Field::SamplesPerPixel(samples),
            Field::Photometric(Photometric::Rgb),
            Field::ExtraSamples(samples.saturating_sub(3)),
        ]),
    }
    fields
}

enum Started {
    Ready,
    NoDocuments,
    Cancelled,
}

/// Acquires pages from a device.
pub struct CapturePipeline {
    policy: WarmupPolicy,
    chunk_rows: usize,
    stamp: PageStamp,
    cancel: CancellationToken,
    progress: Option<Box<dyn FnMut(f64)>>,
}

impl CapturePipeline {
    pub fn new(config: &CaptureConfig, stamp: PageStamp, cancel: CancellationToken) -> Self {
        Self {
            policy: WarmupPolicy::from(config),
            chunk_rows: config.chunk_rows.max(1),
            stamp,
            cancel,
            progress: None,
        }
    }

    pub fn with_policy(mut self, policy: WarmupPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Report progress in percent after every chunk whose page size is known.
    pub fn with_progress(mut self, report: impl FnMut(f64) + 'static) -> Self {
        self.progress = Some(Box::new(report));
        self
    }

    /// Acquire one page into `container`.
    ///
    /// The page is left open in the container; the caller finalizes it. `page`
    /// is set when batching and adds a page number to the metadata.
    #[instrument(skip_all, fields(page = page.map(|p| p.number)))]
    pub fn capture<C: PageContainer>(
        &mut self,
        device: &mut dyn Device,
        container: &mut C,
        page: Option<PageNumber>,
    ) -> Result<PageOutcome> {
        let mut session = CaptureSession::default();
        match self.run(device, container, page, &mut session) {
            Ok(CaptureStatus::NoDocuments) => Ok(PageOutcome::NoDocuments),
            Ok(CaptureStatus::Cancelled) => Ok(PageOutcome::Cancelled(session)),
            Ok(_) => Ok(PageOutcome::Done(session)),
            Err(err) => {
                session.enter(CaptureStatus::Failed);
                debug!(
                    rows = session.rows_written,
                    bytes = session.bytes_read,
                    "page failed: {err}"
                );
                Err(err)
            }
        }
    }

    fn run<C: PageContainer>(
        &mut self,
        device: &mut dyn Device,
        container: &mut C,
        page: Option<PageNumber>,
        session: &mut CaptureSession,
    ) -> Result<CaptureStatus> {
        if self.cancel.is_cancelled() {
            session.enter(CaptureStatus::Cancelled);
            return Ok(CaptureStatus::Cancelled);
        }

        session.enter(CaptureStatus::Negotiating);
        match self.start(device)? {
            Started::Ready => {}
            Started::NoDocuments => {
                session.enter(CaptureStatus::NoDocuments);
                return Ok(CaptureStatus::NoDocuments);
            }
            Started::Cancelled => {
                info!("scan cancelled");
                session.enter(CaptureStatus::Cancelled);
                return Ok(CaptureStatus::Cancelled);
            }
        }

        let params = device
            .parameters()
            .map_err(|status| ScanwerkError::device("get parameters", status))?;
        session.parameters = Some(params);
        describe(&params);

        if !is_supported(&params) {
            device.cancel();
            return Err(ScanwerkError::FormatUnsupported {
                format: params.format,
                depth: params.depth,
            });
        }
        let row_len = params.bytes_per_line;
        if row_len == 0 {
            device.cancel();
            return Err(ScanwerkError::device("get parameters", Status::InvalidArgument));
        }

        for field in layout_fields(&params).into_iter().chain(self.stamp.fields()) {
            container.set_field(field)?;
        }
        if let Some(page) = page {
            container.set_field(Field::PageNumber {
                number: page.number.clamp(0, i32::from(u16::MAX)) as u16,
                total: page.total.min(u32::from(u16::MAX)) as u16,
            })?;
        }

        session.bytes_expected = params
            .lines
            .map(|lines| row_len as u64 * u64::from(lines))
            .filter(|&expected| expected > 0);

        let mut buffer = chunk_buffer(self.chunk_rows, row_len)?;
        debug!(
            rows = self.chunk_rows,
            kib = buffer.len() / 1024,
            "allocated read buffer"
        );

        session.enter(CaptureStatus::Streaming);
        loop {
            if self.cancel.take_pending() {
                info!("cancel requested, stopping the device");
                device.cancel();
            }

            let len = match device.read(&mut buffer) {
                Ok(len) => len,
                Err(Status::EndOfPage) => break,
                Err(Status::Cancelled) => {
                    info!("scan cancelled");
                    session.enter(CaptureStatus::Cancelled);
                    return Ok(CaptureStatus::Cancelled);
                }
                Err(status) => return Err(ScanwerkError::device("read", status)),
            };

            let chunk = &buffer[..len];
            let rows = chunk.chunks_exact(row_len);
            if !rows.remainder().is_empty() {
                trace!(dropped = rows.remainder().len(), "partial row in chunk");
            }
            for row in rows {
                container.write_row(session.rows_written, row)?;
                session.rows_written += 1;
            }
            session.bytes_read += len as u64;

            if let (Some(expected), Some(report)) = (session.bytes_expected, self.progress.as_mut())
            {
                report((session.bytes_read as f64 * 100.0 / expected as f64).min(100.0));
            }
        }

        match session.bytes_expected {
            Some(expected) if session.bytes_read > expected => {
                warn!(
                    "read more data than announced by backend ({}/{})",
                    session.bytes_read, expected
                );
                session.overrun = true;
            }
            _ => debug!("read {} bytes in total", session.bytes_read),
        }

        session.enter(CaptureStatus::Done);
        Ok(CaptureStatus::Done)
    }

    /// Start the transfer, waiting out a warming-up lamp.
    fn start(&self, device: &mut dyn Device) -> Result<Started> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let status = match device.start() {
                Ok(()) => return Ok(Started::Ready),
                Err(status) => status,
            };
            match retry::should_retry(status, attempt, &self.policy) {
                RetryDecision::RetryAfter(delay) => {
                    if !retry::wait(delay, &self.cancel) {
                        return Ok(Started::Cancelled);
                    }
                }
                RetryDecision::Exhausted => {
                    return Err(ScanwerkError::FrozenDevice { attempts: attempt });
                }
                RetryDecision::GiveUp(StatusClass::Informational) if status == Status::NoDocuments => {
                    return Ok(Started::NoDocuments);
                }
                RetryDecision::GiveUp(StatusClass::Informational) if status == Status::Cancelled => {
                    return Ok(Started::Cancelled);
                }
                RetryDecision::GiveUp(_) => return Err(ScanwerkError::device("start", status)),
            }
        }
    }
}

fn describe(params: &Parameters) {
    match params.lines {
        Some(lines) => debug!(
            "scanning {} image of size {}x{} pixels at {} bits/pixel",
            params.format,
            params.pixels_per_line,
            lines,
            params.bits_per_pixel()
        ),
        None => debug!(
            "scanning {} image {} pixels wide and variable height at {} bits/pixel",
            params.format,
            params.pixels_per_line,
            params.bits_per_pixel()
        ),
    }
}

fn chunk_buffer(rows: usize, row_len: usize) -> Result<Vec<u8>> {
    let size = rows
        .checked_mul(row_len)
        .ok_or_else(|| ScanwerkError::Resource(format!("{rows} rows of {row_len} bytes")))?;
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(size)
        .map_err(|err| ScanwerkError::Resource(format!("read buffer of {size} bytes: {err}")))?;
    buffer.resize(size, 0);
    Ok(buffer)
}
