// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// TIFF tag numbers and directory entry values.

use crate::container::{Field, Photometric, Threshholding};

pub const NEW_SUBFILE_TYPE: u16 = 254;
pub const IMAGE_WIDTH: u16 = 256;
pub const IMAGE_LENGTH: u16 = 257;
pub const BITS_PER_SAMPLE: u16 = 258;
pub const COMPRESSION: u16 = 259;
pub const PHOTOMETRIC: u16 = 262;
pub const THRESHHOLDING: u16 = 263;
pub const FILL_ORDER: u16 = 266;
pub const DOCUMENT_NAME: u16 = 269;
pub const IMAGE_DESCRIPTION: u16 = 270;
pub const MAKE: u16 = 271;
pub const MODEL: u16 = 272;
pub const STRIP_OFFSETS: u16 = 273;
pub const ORIENTATION: u16 = 274;
pub const SAMPLES_PER_PIXEL: u16 = 277;
pub const ROWS_PER_STRIP: u16 = 278;
pub const STRIP_BYTE_COUNTS: u16 = 279;
pub const X_RESOLUTION: u16 = 282;
pub const Y_RESOLUTION: u16 = 283;
pub const PLANAR_CONFIGURATION: u16 = 284;
pub const RESOLUTION_UNIT: u16 = 296;
pub const PAGE_NUMBER: u16 = 297;
pub const SOFTWARE: u16 = 305;
pub const DATE_TIME: u16 = 306;
pub const ARTIST: u16 = 315;
pub const HOST_COMPUTER: u16 = 316;
pub const EXTRA_SAMPLES: u16 = 338;
pub const COPYRIGHT: u16 = 33432;

pub const COMPRESSION_NONE: u16 = 1;
pub const COMPRESSION_PACKBITS: u16 = 32773;
pub const COMPRESSION_DEFLATE: u16 = 8;
pub const RESOLUTION_UNIT_INCH: u16 = 2;
/// NewSubfileType bit marking one page of a multi-page document.
pub const SUBFILE_PAGE: u32 = 2;

/// Value of one directory entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Short(Vec<u16>),
    Long(Vec<u32>),
    Rational(u32, u32),
    Ascii(String),
}

impl Value {
    /// TIFF field type code.
    pub fn type_code(&self) -> u16 {
        match self {
            Self::Ascii(_) => 2,
            Self::Short(_) => 3,
            Self::Long(_) => 4,
            Self::Rational(..) => 5,
        }
    }

    /// Number of values, counting the ASCII terminator.
    pub fn count(&self) -> u32 {
        match self {
            Self::Short(v) => v.len() as u32,
            Self::Long(v) => v.len() as u32,
            Self::Rational(..) => 1,
            Self::Ascii(s) => s.len() as u32 + 1,
        }
    }

    /// Encoded size in bytes. Values up to 4 bytes live inside the entry.
    pub fn byte_len(&self) -> usize {
        match self {
            Self::Short(v) => v.len() * 2,
            Self::Long(v) => v.len() * 4,
            Self::Rational(..) => 8,
            Self::Ascii(s) => s.len() + 1,
        }
    }
}

fn ascii(text: &str) -> Value {
    Value::Ascii(text.replace('\0', ""))
}

/// Directory entries for one field. Resolution expands to three entries.
pub fn entries(field: &Field) -> Vec<(u16, Value)> {
    let short = |tag, v: u16| vec![(tag, Value::Short(vec![v]))];
    match field {
        Field::ImageWidth(w) => vec![(IMAGE_WIDTH, Value::Long(vec![*w]))],
        Field::ImageLength(h) => vec![(IMAGE_LENGTH, Value::Long(vec![*h]))],
        Field::BitsPerSample(bits) => short(BITS_PER_SAMPLE, *bits),
        Field::SamplesPerPixel(n) => short(SAMPLES_PER_PIXEL, *n),
        Field::Photometric(p) => short(
            PHOTOMETRIC,
            match p {
                Photometric::MinIsWhite => 0,
                Photometric::MinIsBlack => 1,
                Photometric::Rgb => 2,
            },
        ),
        Field::Threshholding(t) => short(
            THRESHHOLDING,
            match t {
                Threshholding::Bilevel => 1,
                Threshholding::Halftone => 2,
            },
        ),
        Field::ExtraSamples(n) => vec![(EXTRA_SAMPLES, Value::Short(vec![0; usize::from(*n)]))],
        Field::Resolution(dpi) => vec![
            (X_RESOLUTION, Value::Rational(*dpi, 1)),
            (Y_RESOLUTION, Value::Rational(*dpi, 1)),
            (RESOLUTION_UNIT, Value::Short(vec![RESOLUTION_UNIT_INCH])),
        ],
        Field::Orientation(o) => short(ORIENTATION, o.tiff_value()),
        Field::PageNumber { number, total } => {
            vec![(PAGE_NUMBER, Value::Short(vec![*number, *total]))]
        }
        Field::DateTime(t) => vec![(
            DATE_TIME,
            Value::Ascii(t.format("%Y:%m:%d %H:%M:%S").to_string()),
        )],
        Field::Software(s) => vec![(SOFTWARE, ascii(s))],
        Field::HostComputer(s) => vec![(HOST_COMPUTER, ascii(s))],
        Field::Make(s) => vec![(MAKE, ascii(s))],
        Field::Model(s) => vec![(MODEL, ascii(s))],
        Field::Artist(s) => vec![(ARTIST, ascii(s))],
        Field::Copyright(s) => vec![(COPYRIGHT, ascii(s))],
        Field::DocumentName(s) => vec![(DOCUMENT_NAME, ascii(s))],
        Field::ImageDescription(s) => vec![(IMAGE_DESCRIPTION, ascii(s))],
    }
}
