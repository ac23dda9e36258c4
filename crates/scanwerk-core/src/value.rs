// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Option value grammar: turns command-line text into capability words.
//
// A scalar is `VALUE [UNIT]`. The accepted units depend on the unit the
// capability declares:
//
//   None / Pixel   (no suffix)
//   Bit            b (bit), B (byte, x8)
//   Millimeter     (none) or mm, cm (x10), in or " (x25.4)
//   Dpi            dpi
//   Percent        %
//   Microsecond    us
//
// A vector is `[ '[' I ']' ] S { (',' | '-') [ '[' I ']' ] S }`. A bracketed
// index picks the element to set next, otherwise the previous index plus one
// is used (starting at 0). Values joined by ',' are set independently; values
// joined by '-' are the endpoints of a line and every element strictly between
// them is interpolated. `[0]15-[255]15` sets 256 elements to 15 and
// `[0]0-[255]255` ramps from 0 to 255.

use tracing::trace;

use crate::error::{ParseError, ParseErrorKind};
use crate::types::{CapabilityDescriptor, FIXED_SCALE_SHIFT, Unit, ValueKind, Word, unfix};

/// Literal that asks the device to choose a value itself.
pub const AUTO_LITERAL: &str = "auto";

/// A parsed numeric option value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedValue<'a> {
    Scalar(Word),
    /// Exactly `descriptor.word_count()` words; unaddressed entries are zero.
    Vector(&'a [Word]),
}

impl ParsedValue<'_> {
    /// Copy the value out as a word list suitable for the device.
    pub fn to_words(&self) -> Vec<Word> {
        match self {
            Self::Scalar(word) => vec![*word],
            Self::Vector(words) => words.to_vec(),
        }
    }
}

/// Reusable scratch storage for vector values.
///
/// Owned by the caller that applies options, so parsing itself keeps no state
/// between calls. Capacity only ever grows.
#[derive(Debug, Default)]
pub struct VectorBuffer {
    words: Vec<Word>,
}

impl VectorBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            words: Vec::with_capacity(capacity),
        }
    }

    /// Number of words the buffer can hold without reallocating.
    pub fn capacity(&self) -> usize {
        self.words.capacity()
    }

    /// Words of the last successful parse.
    pub fn as_slice(&self) -> &[Word] {
        &self.words
    }

    /// Parse `text` for `descriptor` into this buffer.
    ///
    /// The whole literal is validated before the buffer is touched: on error
    /// the previous contents are left exactly as they were.
    pub fn parse(
        &mut self,
        descriptor: &CapabilityDescriptor,
        text: &str,
    ) -> Result<ParsedValue<'_>, ParseError> {
        let len = descriptor.word_count();
        let points = plan_vector(descriptor, text, len)?;

        self.words.clear();
        self.words.resize(len, 0);
        fill_vector(&points, &mut self.words);

        trace!(
            option = %descriptor.name,
            value = %format_words(descriptor, &self.words),
            "parsed option value"
        );

        Ok(if len == 1 {
            ParsedValue::Scalar(self.words[0])
        } else {
            ParsedValue::Vector(&self.words)
        })
    }
}

/// Parse a single `VALUE [UNIT]` scalar, returning the word and the unparsed rest.
pub fn parse_scalar<'a>(
    descriptor: &CapabilityDescriptor,
    text: &'a str,
) -> Result<(Word, &'a str), ParseError> {
    let (mut value, mut rest) = scan_number(text)
        .ok_or_else(|| ParseError::new(&descriptor.name, ParseErrorKind::BadValue, text))?;

    if descriptor.kind == ValueKind::Fixed {
        value *= f64::from(1u32 << FIXED_SCALE_SHIFT);
    }

    match descriptor.unit {
        Unit::None | Unit::Pixel => {}
        Unit::Bit => {
            if let Some(r) = rest.strip_prefix('B') {
                value *= 8.0;
                rest = r;
            } else if let Some(r) = rest.strip_prefix('b') {
                rest = r;
            }
        }
        Unit::Millimeter => {
            if rest.is_empty() || rest.starts_with([',', '-']) {
                // millimetres are the default
            } else if let Some(r) = rest.strip_prefix("mm") {
                rest = r;
            } else if let Some(r) = rest.strip_prefix("cm") {
                value *= 10.0;
                rest = r;
            } else if let Some(r) = rest.strip_prefix("in").or_else(|| rest.strip_prefix('"')) {
                value *= 25.4;
                rest = r;
            } else {
                return Err(ParseError::new(
                    &descriptor.name,
                    ParseErrorKind::IllegalUnit,
                    rest,
                ));
            }
        }
        Unit::Dpi => rest = rest.strip_prefix("dpi").unwrap_or(rest),
        Unit::Percent => rest = rest.strip_prefix('%').unwrap_or(rest),
        Unit::Microsecond => rest = rest.strip_prefix("us").unwrap_or(rest),
    }

    Ok(((value + 0.5).floor() as Word, rest))
}

/// Parse a boolean literal: any case-insensitive prefix of `yes` or `no`.
/// The empty string means yes.
pub fn parse_bool(text: &str) -> Option<bool> {
    let lower = text.to_ascii_lowercase();
    if "yes".starts_with(&lower) {
        Some(true)
    } else if "no".starts_with(&lower) {
        Some(false)
    } else {
        None
    }
}

/// Whether `text` asks for automatic mode.
pub fn is_auto_literal(text: &str) -> bool {
    text.get(..AUTO_LITERAL.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(AUTO_LITERAL))
}

/// Render words the way the device would display them.
pub fn format_words(descriptor: &CapabilityDescriptor, words: &[Word]) -> String {
    words
        .iter()
        .map(|&w| match descriptor.kind {
            ValueKind::Fixed => format!("{}", unfix(w)),
            _ => w.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// One explicitly given element of a vector literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct VectorPoint {
    index: usize,
    value: Word,
    /// Joined to the previous point with '-'.
    interpolate: bool,
}

fn plan_vector(
    descriptor: &CapabilityDescriptor,
    text: &str,
    len: usize,
) -> Result<Vec<VectorPoint>, ParseError> {
    let name = descriptor.name.as_str();
    let mut points = Vec::new();
    let mut index: i64 = -1;
    let mut interpolate = false;
    let mut rest = text;

    loop {
        if let Some(after) = rest.strip_prefix('[') {
            let (explicit, r) = scan_index(after)
                .ok_or_else(|| ParseError::new(name, ParseErrorKind::MissingBracket, after))?;
            index = explicit;
            rest = r;
        } else {
            index += 1;
        }

        if index < 0 || index >= len as i64 {
            return Err(ParseError::new(
                name,
                ParseErrorKind::IndexOutOfRange { index, len },
                rest,
            ));
        }

        let (value, r) = parse_scalar(descriptor, rest)?;
        rest = r;
        points.push(VectorPoint {
            index: index as usize,
            value,
            interpolate,
        });

        let mut chars = rest.chars();
        match chars.next() {
            None => break,
            Some(',') => interpolate = false,
            Some('-') => interpolate = true,
            Some(_) => {
                return Err(ParseError::new(
                    name,
                    ParseErrorKind::IllegalSeparator,
                    rest,
                ));
            }
        }
        rest = chars.as_str();
    }

    Ok(points)
}

fn fill_vector(points: &[VectorPoint], dest: &mut [Word]) {
    dest.fill(0);

    let mut prev_index = 0usize;
    let mut prev_value: Word = 0;
    for point in points {
        dest[point.index] = point.value;
        if point.interpolate && point.index > prev_index + 1 {
            let start = f64::from(prev_value);
            let slope = (f64::from(point.value) - start) / (point.index - prev_index) as f64;
            for (i, slot) in dest
                .iter_mut()
                .enumerate()
                .take(point.index)
                .skip(prev_index + 1)
            {
                *slot = (start + slope * (i - prev_index) as f64) as Word;
            }
        }
        prev_index = point.index;
        prev_value = point.value;
    }
}

/// Read `[+-]digits` followed by `]`. Returns `None` when either is missing.
fn scan_index(text: &str) -> Option<(i64, &str)> {
    let bytes = text.as_bytes();
    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let digits_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    if end == digits_start {
        return None;
    }
    let rest = text[end..].strip_prefix(']')?;
    // Overlong indices are out of range anyway.
    let index = text[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some((index, rest))
}

/// Read a decimal number (`[+-]digits[.digits][e[+-]digits]`) from the front of `text`.
fn scan_number(text: &str) -> Option<(f64, &str)> {
    let bytes = text.as_bytes();
    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));

    let int_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let mut digits = end - int_start;

    if bytes.get(end) == Some(&b'.') {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while bytes.get(frac_end).is_some_and(u8::is_ascii_digit) {
            frac_end += 1;
        }
        if digits > 0 || frac_end > frac_start {
            digits += frac_end - frac_start;
            end = frac_end;
        }
    }

    if digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }

    let value = text[..end].parse::<f64>().ok()?;
    Some((value, &text[end..]))
}
