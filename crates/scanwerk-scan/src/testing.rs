// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Test doubles: a device driven by a script and a container that records
// what it is given.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::{
    CapabilityDescriptor, DeviceInfo, FrameFormat, OptionValue, Parameters, SetInfo, Status,
};
use scanwerk_device::Device;
use scanwerk_document::{ContainerEncoder, Field, PageContainer, render};

use crate::cancel::CancellationToken;

/// 8-bit gray page of `width` bytes per row and `lines` rows.
pub(crate) fn gray_page(width: usize, lines: u32) -> Parameters {
    Parameters {
        format: FrameFormat::Gray,
        last_frame: true,
        bytes_per_line: width,
        pixels_per_line: width as u32,
        lines: Some(lines),
        depth: 8,
    }
}

pub(crate) struct ScriptedDevice {
    info: DeviceInfo,
    params: Parameters,
    starts: VecDeque<std::result::Result<(), Status>>,
    /// Sheets in the feeder; `None` means a flatbed that never runs out.
    sheets: Option<usize>,
    page_bytes: usize,
    chunk_limit: usize,
    /// Returned instead of end of page once the page data is exhausted.
    read_error: Option<Status>,
    interrupt: Option<(u32, CancellationToken)>,
    remaining: usize,
    reads: u32,
    cancelled: bool,
    start_calls: u32,
    cancel_calls: u32,
}

impl ScriptedDevice {
    pub(crate) fn new(params: Parameters) -> Self {
        let page_bytes = params.bytes_per_line * params.lines.unwrap_or(1) as usize;
        Self {
            info: DeviceInfo {
                name: "scripted".into(),
                vendor: "Acme".into(),
                model: "Model 9".into(),
                kind: "flatbed scanner".into(),
            },
            params,
            starts: VecDeque::new(),
            sheets: None,
            page_bytes,
            chunk_limit: usize::MAX,
            read_error: None,
            interrupt: None,
            remaining: 0,
            reads: 0,
            cancelled: false,
            start_calls: 0,
            cancel_calls: 0,
        }
    }

    /// Results for the first start calls; later calls succeed.
    pub(crate) fn with_starts(mut self, starts: Vec<std::result::Result<(), Status>>) -> Self {
        self.starts = starts.into();
        self
    }

    pub(crate) fn with_sheets(mut self, sheets: usize) -> Self {
        self.sheets = Some(sheets);
        self
    }

    pub(crate) fn with_page_bytes(mut self, bytes: usize) -> Self {
        self.page_bytes = bytes;
        self
    }

    pub(crate) fn with_chunk_limit(mut self, bytes: usize) -> Self {
        self.chunk_limit = bytes;
        self
    }

    pub(crate) fn with_read_error(mut self, status: Status) -> Self {
        self.read_error = Some(status);
        self
    }

    /// Raise an interrupt on `token` right after read number `reads`.
    pub(crate) fn interrupt_after(mut self, reads: u32, token: CancellationToken) -> Self {
        self.interrupt = Some((reads, token));
        self
    }

    pub(crate) fn start_calls(&self) -> u32 {
        self.start_calls
    }

    pub(crate) fn cancel_calls(&self) -> u32 {
        self.cancel_calls
    }
}

impl Device for ScriptedDevice {
    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn descriptors(&self) -> std::result::Result<Vec<CapabilityDescriptor>, Status> {
        Ok(Vec::new())
    }

    fn descriptor(&self, _index: usize) -> std::result::Result<CapabilityDescriptor, Status> {
        Err(Status::InvalidArgument)
    }

    fn get_value(&self, _index: usize) -> std::result::Result<OptionValue, Status> {
        Err(Status::InvalidArgument)
    }

    fn set_value(
        &mut self,
        _index: usize,
        _value: &OptionValue,
    ) -> std::result::Result<SetInfo, Status> {
        Err(Status::Unsupported)
    }

    fn set_auto(&mut self, _index: usize) -> std::result::Result<(), Status> {
        Err(Status::Unsupported)
    }

    fn start(&mut self) -> std::result::Result<(), Status> {
        self.start_calls += 1;
        self.starts.pop_front().unwrap_or(Ok(()))?;
        match self.sheets.as_mut() {
            Some(0) => return Err(Status::NoDocuments),
            Some(sheets) => *sheets -= 1,
            None => {}
        }
        self.remaining = self.page_bytes;
        self.cancelled = false;
        Ok(())
    }

    fn parameters(&self) -> std::result::Result<Parameters, Status> {
        Ok(self.params)
    }

    fn read(&mut self, buf: &mut [u8]) -> std::result::Result<usize, Status> {
        if self.cancelled {
            return Err(Status::Cancelled);
        }
        if self.remaining == 0 {
            return Err(self.read_error.unwrap_or(Status::EndOfPage));
        }
        let len = buf.len().min(self.remaining).min(self.chunk_limit);
        buf[..len].fill(0x5a);
        self.remaining -= len;
        self.reads += 1;
        if let Some((after, token)) = &self.interrupt {
            if *after == self.reads {
                token.interrupt();
            }
        }
        Ok(len)
    }

    fn cancel(&mut self) {
        self.cancel_calls += 1;
        self.cancelled = true;
    }
}

/// A finalized page as the container saw it.
#[derive(Debug, Clone, Default)]
pub(crate) struct RecordedPage {
    pub fields: Vec<Field>,
    pub rows: u32,
}

impl RecordedPage {
    pub(crate) fn page_number(&self) -> Option<(u16, u16)> {
        self.fields.iter().find_map(|field| match field {
            Field::PageNumber { number, total } => Some((*number, *total)),
            _ => None,
        })
    }
}

/// Everything the encoder and its containers did.
#[derive(Debug, Default)]
pub(crate) struct Journal {
    pub opened: Vec<PathBuf>,
    pub closed: Vec<PathBuf>,
    pub deleted: Vec<PathBuf>,
    pub pages: Vec<(PathBuf, RecordedPage)>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct RecordingEncoder {
    journal: Rc<RefCell<Journal>>,
}

impl RecordingEncoder {
    pub(crate) fn journal(&self) -> std::cell::Ref<'_, Journal> {
        self.journal.borrow()
    }
}

impl ContainerEncoder for RecordingEncoder {
    type Container = RecordingContainer;

    fn open(&self, template: &str, page: i32) -> Result<RecordingContainer> {
        let path = PathBuf::from(render(template, page)?);
        self.journal.borrow_mut().opened.push(path.clone());
        Ok(RecordingContainer {
            path,
            current: RecordedPage::default(),
            rows: Vec::new(),
            pages: 0,
            journal: Rc::clone(&self.journal),
        })
    }

    fn delete(&self, path: &Path) -> Result<()> {
        self.journal.borrow_mut().deleted.push(path.to_path_buf());
        Ok(())
    }
}

pub(crate) struct RecordingContainer {
    path: PathBuf,
    current: RecordedPage,
    rows: Vec<Vec<u8>>,
    pages: usize,
    journal: Rc<RefCell<Journal>>,
}

impl RecordingContainer {
    /// A container not tied to any encoder.
    pub(crate) fn detached() -> Self {
        Self {
            path: PathBuf::from("detached.tif"),
            current: RecordedPage::default(),
            rows: Vec::new(),
            pages: 0,
            journal: Rc::default(),
        }
    }

    pub(crate) fn fields(&self) -> &[Field] {
        &self.current.fields
    }

    pub(crate) fn rows(&self) -> &[Vec<u8>] {
        &self.rows
    }
}

impl PageContainer for RecordingContainer {
    fn path(&self) -> &Path {
        &self.path
    }

    fn set_field(&mut self, field: Field) -> Result<()> {
        self.current.fields.push(field);
        Ok(())
    }

    fn write_row(&mut self, row: u32, bytes: &[u8]) -> Result<()> {
        if row != self.current.rows {
            return Err(ScanwerkError::Container(format!(
                "row {row} out of order, expected {}",
                self.current.rows
            )));
        }
        self.rows.push(bytes.to_vec());
        self.current.rows += 1;
        Ok(())
    }

    fn finalize_page(&mut self) -> Result<()> {
        let page = std::mem::take(&mut self.current);
        self.rows.clear();
        self.pages += 1;
        self.journal.borrow_mut().pages.push((self.path.clone(), page));
        Ok(())
    }

    fn pages(&self) -> usize {
        self.pages
    }

    fn close(self) -> Result<PathBuf> {
        self.journal.borrow_mut().closed.push(self.path.clone());
        Ok(self.path)
    }
}
