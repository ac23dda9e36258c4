// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Scanwerk scanner front-end.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine word used by device capabilities (integers and fixed-point values).
pub type Word = i32;

/// Size of one capability word in bytes.
pub const WORD_SIZE: usize = std::mem::size_of::<Word>();

/// Binary shift applied to fixed-point capability values.
pub const FIXED_SCALE_SHIFT: u32 = 16;

/// Convert a real number into a fixed-point word (round-half-up).
pub fn fix(value: f64) -> Word {
    (value * f64::from(1u32 << FIXED_SCALE_SHIFT) + 0.5).floor() as Word
}

/// Convert a fixed-point word back into a real number.
pub fn unfix(word: Word) -> f64 {
    f64::from(word) / f64::from(1u32 << FIXED_SCALE_SHIFT)
}

/// Value type of a device capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueKind {
    Bool,
    Int,
    Fixed,
    String,
    Button,
    /// Grouping marker; carries no value and is never settable.
    Group,
}

impl ValueKind {
    /// Whether values of this kind are stored as one or more words.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int | Self::Fixed)
    }
}

/// Physical unit declared by a capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    None,
    Pixel,
    Bit,
    Millimeter,
    Dpi,
    Percent,
    Microsecond,
}

impl Unit {
    /// Suffix printed after values of this unit in help output.
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::Pixel => "pel",
            Self::Bit => "bit",
            Self::Millimeter => "mm",
            Self::Dpi => "dpi",
            Self::Percent => "%",
            Self::Microsecond => "us",
        }
    }
}

/// Constraint on the values a capability accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constraint {
    None,
    Range { min: Word, max: Word, quant: Word },
    WordList(Vec<Word>),
    StringList(Vec<String>),
}

/// Description of one device capability, as reported by the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    pub name: String,
    pub title: String,
    pub description: String,
    pub kind: ValueKind,
    pub unit: Unit,
    pub constraint: Constraint,
    /// Whether software may change the value.
    pub settable: bool,
    /// Whether the capability currently has any effect.
    pub active: bool,
    /// Whether the device can pick the value automatically.
    pub automatic: bool,
    /// Storage size in bytes (words * `WORD_SIZE` for numeric kinds).
    pub size: usize,
}

impl CapabilityDescriptor {
    /// Number of words a numeric value occupies.
    pub fn word_count(&self) -> usize {
        (self.size / WORD_SIZE).max(1)
    }

    /// Whether the capability holds exactly one word.
    pub fn is_single_word(&self) -> bool {
        self.size == WORD_SIZE
    }
}

/// A capability value exchanged with the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OptionValue {
    Bool(bool),
    Words(Vec<Word>),
    Text(String),
    Button,
}

/// Extra information returned by the device after a value was set.
#[derive(Debug, Clone, PartialEq)]
pub struct SetInfo {
    /// The device adjusted the requested value.
    pub inexact: bool,
    /// The value actually in effect after the set.
    pub effective: OptionValue,
    /// Setting this capability changed other descriptors.
    pub reload_options: bool,
}

/// Status codes reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum Status {
    #[error("Success")]
    Good,
    #[error("Operation not supported")]
    Unsupported,
    #[error("Operation was cancelled")]
    Cancelled,
    #[error("Device busy")]
    DeviceBusy,
    #[error("Invalid argument")]
    InvalidArgument,
    #[error("End of file reached")]
    EndOfPage,
    #[error("Document feeder jammed")]
    Jammed,
    #[error("Document feeder out of documents")]
    NoDocuments,
    #[error("Scanner cover is open")]
    CoverOpen,
    #[error("Error during device I/O")]
    IoError,
    #[error("Out of memory")]
    OutOfMemory,
    #[error("Access to resource has been denied")]
    AccessDenied,
    #[error("Lamp not ready, please retry")]
    WarmingUp,
}

/// How a device status drives control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusClass {
    /// Transient not-ready state; retried within a fixed budget.
    Retryable,
    /// Expected control flow (end of page, empty feeder, cancel); never an error.
    Informational,
    /// Aborts the current page and the run.
    Terminal,
}

impl Status {
    /// Classify a status for retry and reporting decisions.
    pub fn class(&self) -> StatusClass {
        match self {
            Self::WarmingUp => StatusClass::Retryable,
            Self::Good | Self::EndOfPage | Self::NoDocuments | Self::Cancelled => {
                StatusClass::Informational
            }
            Self::Unsupported
            | Self::DeviceBusy
            | Self::InvalidArgument
            | Self::Jammed
            | Self::CoverOpen
            | Self::IoError
            | Self::OutOfMemory
            | Self::AccessDenied => StatusClass::Terminal,
        }
    }
}

/// Color layout of the raster delivered by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameFormat {
    Gray,
    Rgb,
    Red,
    Green,
    Blue,
    Infrared,
    /// RGB plus an infrared channel.
    Rgbi,
}

impl std::fmt::Display for FrameFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Gray => "gray",
            Self::Rgb => "RGB",
            Self::Red => "red",
            Self::Green => "green",
            Self::Blue => "blue",
            Self::Infrared => "infrared",
            Self::Rgbi => "RGBI",
        };
        f.write_str(name)
    }
}

/// Transfer parameters negotiated for the current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameters {
    pub format: FrameFormat,
    pub last_frame: bool,
    pub bytes_per_line: usize,
    pub pixels_per_line: u32,
    /// Number of rows, or `None` when the device does not know in advance.
    pub lines: Option<u32>,
    pub depth: u32,
}

impl Parameters {
    /// Bits per pixel across all channels.
    pub fn bits_per_pixel(&self) -> u32 {
        if self.pixels_per_line == 0 {
            return 0;
        }
        (8 * self.bytes_per_line as u64 / u64::from(self.pixels_per_line)) as u32
    }

    /// Samples per pixel implied by the row stride and bit depth.
    pub fn samples_per_pixel(&self) -> u16 {
        if self.depth == 1 || self.depth == 0 {
            return 1;
        }
        (self.bits_per_pixel() / self.depth).max(1) as u16
    }
}

/// Identity of a device known to a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub name: String,
    pub vendor: String,
    pub model: String,
    pub kind: String,
}

/// A named paper size in PostScript points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaperSize {
    pub name: &'static str,
    pub width_pt: f64,
    pub height_pt: f64,
}

impl PaperSize {
    /// Dimensions in millimetres (width, height).
    pub fn dimensions_mm(&self) -> (f64, f64) {
        (points_to_mm(self.width_pt), points_to_mm(self.height_pt))
    }
}

/// Convert PostScript points to millimetres.
pub fn points_to_mm(points: f64) -> f64 {
    points / 72.0 * 25.4
}

/// Image orientation recorded in the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    TopLeft,
    TopRight,
    BotRight,
    BotLeft,
    LeftTop,
    RightTop,
    RightBot,
    LeftBot,
}

impl Orientation {
    /// TIFF `Orientation` tag value.
    pub fn tiff_value(&self) -> u16 {
        match self {
            Self::TopLeft => 1,
            Self::TopRight => 2,
            Self::BotRight => 3,
            Self::BotLeft => 4,
            Self::LeftTop => 5,
            Self::RightTop => 6,
            Self::RightBot => 7,
            Self::LeftBot => 8,
        }
    }

    /// Parse the command-line keyword (`topleft`, `botright`, ...).
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "topleft" => Some(Self::TopLeft),
            "topright" => Some(Self::TopRight),
            "botright" => Some(Self::BotRight),
            "botleft" => Some(Self::BotLeft),
            "lefttop" => Some(Self::LeftTop),
            "righttop" => Some(Self::RightTop),
            "rightbot" => Some(Self::RightBot),
            "leftbot" => Some(Self::LeftBot),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_point_round_trips_millimetres() {
        assert_eq!(fix(1.0), 65536);
        assert!((unfix(fix(215.9)) - 215.9).abs() < 1e-4);
    }

    #[test]
    fn status_classes_follow_taxonomy() {
        assert_eq!(Status::WarmingUp.class(), StatusClass::Retryable);
        assert_eq!(Status::NoDocuments.class(), StatusClass::Informational);
        assert_eq!(Status::Cancelled.class(), StatusClass::Informational);
        assert_eq!(Status::IoError.class(), StatusClass::Terminal);
        assert_eq!(Status::OutOfMemory.class(), StatusClass::Terminal);
    }

    #[test]
    fn samples_per_pixel_from_stride() {
        let rgb16 = Parameters {
            format: FrameFormat::Rgb,
            last_frame: true,
            bytes_per_line: 600,
            pixels_per_line: 100,
            lines: Some(10),
            depth: 16,
        };
        assert_eq!(rgb16.samples_per_pixel(), 3);

        let lineart = Parameters {
            format: FrameFormat::Gray,
            bytes_per_line: 13,
            pixels_per_line: 100,
            depth: 1,
            ..rgb16
        };
        assert_eq!(lineart.samples_per_pixel(), 1);
    }

    #[test]
    fn letter_is_216_by_279_mm() {
        let letter = PaperSize {
            name: "letter",
            width_pt: 612.0,
            height_pt: 792.0,
        };
        let (w, h) = letter.dimensions_mm();
        assert!((w - 215.9).abs() < 1e-9);
        assert!((h - 279.4).abs() < 1e-9);
    }

    #[test]
    fn orientation_keywords() {
        assert_eq!(Orientation::from_keyword("botleft"), Some(Orientation::BotLeft));
        assert_eq!(Orientation::BotLeft.tiff_value(), 4);
        assert_eq!(Orientation::from_keyword("sideways"), None);
    }
}
