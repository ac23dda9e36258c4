// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Baseline TIFF output.

pub mod tags;
pub mod writer;

pub use writer::{TiffContainer, TiffEncoder};
