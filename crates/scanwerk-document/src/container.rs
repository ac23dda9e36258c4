// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page container abstraction.
//
// A container is one output file holding one or more pages. Fields describe
// the page being written; rows arrive in order and `finalize_page` commits
// the page before the next one starts.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use scanwerk_core::Orientation;
use scanwerk_core::error::Result;

/// How sample values map to intensity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Photometric {
    /// 0 is white. Used for bilevel images where set bits are black.
    MinIsWhite,
    MinIsBlack,
    Rgb,
}

/// How a bilevel or gray image was reduced from the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Threshholding {
    Bilevel,
    Halftone,
}

/// A piece of page metadata.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    ImageWidth(u32),
    /// Rows announced by the device. The written height is always the
    /// number of rows actually received.
    ImageLength(u32),
    BitsPerSample(u16),
    SamplesPerPixel(u16),
    Photometric(Photometric),
    Threshholding(Threshholding),
    /// Number of unspecified extra channels per pixel.
    ExtraSamples(u16),
    /// Horizontal and vertical resolution in dots per inch.
    Resolution(u32),
    Orientation(Orientation),
    /// Page number and total; a total of 0 means unknown.
    PageNumber { number: u16, total: u16 },
    DateTime(NaiveDateTime),
    Software(String),
    HostComputer(String),
    Make(String),
    Model(String),
    Artist(String),
    Copyright(String),
    DocumentName(String),
    ImageDescription(String),
}

/// An open output file.
pub trait PageContainer {
    /// Path of the file on disk.
    fn path(&self) -> &Path;

    /// Record metadata for the current page.
    fn set_field(&mut self, field: Field) -> Result<()>;

    /// Append row `row` of the current page. Rows must arrive in order.
    fn write_row(&mut self, row: u32, bytes: &[u8]) -> Result<()>;

    /// Commit the current page.
    fn finalize_page(&mut self) -> Result<()>;

    /// Pages committed so far.
    fn pages(&self) -> usize;

    /// Flush and close the file.
    fn close(self) -> Result<PathBuf>
    where
        Self: Sized;
}

/// Creates and removes containers.
pub trait ContainerEncoder {
    type Container: PageContainer;

    /// Open a new container, expanding the page placeholder of `template`
    /// with `page`.
    fn open(&self, template: &str, page: i32) -> Result<Self::Container>;

    /// Remove a container that was closed without any page.
    fn delete(&self, path: &Path) -> Result<()>;
}
