// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scanwerk-document: output side of a scan.
//
// Provides the page container abstraction, a streaming multi-page TIFF
// writer, output file name templates and host identification for page
// metadata.

pub mod container;
pub mod host;
pub mod packbits;
pub mod template;
pub mod tiff;

pub use container::{ContainerEncoder, Field, PageContainer, Photometric, Threshholding};
pub use template::{default_template, render};
pub use tiff::{TiffContainer, TiffEncoder};
