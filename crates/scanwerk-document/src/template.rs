// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Output file name templates.
//
// A template may contain one page number placeholder: `%d`, `%Nd` (space
// padded) or `%0Nd` (zero padded). `%%` is a literal percent sign.

use chrono::{DateTime, TimeZone};

use scanwerk_core::error::{Result, ScanwerkError};

/// Expand the page placeholder of `template`.
pub fn render(template: &str, page: i32) -> Result<String> {
    let mut out = String::with_capacity(template.len() + 8);
    let mut rest = template;

    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let directive = &rest[pos + 1..];

        if let Some(after) = directive.strip_prefix('%') {
            out.push('%');
            rest = after;
            continue;
        }

        let zero_pad = directive.starts_with('0');
        let width_len = directive.bytes().take_while(u8::is_ascii_digit).count();
        let width: usize = if width_len == 0 {
            0
        } else {
            directive[..width_len]
                .parse()
                .map_err(|_| ScanwerkError::Template(template.to_string()))?
        };

        let Some(after) = directive[width_len..].strip_prefix('d') else {
            return Err(ScanwerkError::Template(format!(
                "{template}: only %d page placeholders are supported"
            )));
        };

        if zero_pad {
            out.push_str(&format!("{page:0width$}"));
        } else {
            out.push_str(&format!("{page:width$}"));
        }
        rest = after;
    }

    out.push_str(rest);
    Ok(out)
}

/// File name used when no output template was given: the start time, a
/// four-digit page number when every page gets its own file, and `.tif`.
pub fn default_template<Tz: TimeZone>(now: &DateTime<Tz>, file_per_page: bool) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let mut name = now.format("%Y%m%d%H%M%S").to_string();
    if file_per_page {
        name.push_str("-%04d");
    }
    name.push_str(".tif");
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn placeholders() {
        assert_eq!(render("page-%d.tif", 7).unwrap(), "page-7.tif");
        assert_eq!(render("page-%04d.tif", 7).unwrap(), "page-0007.tif");
        assert_eq!(render("page-%3d.tif", 7).unwrap(), "page-  7.tif");
        assert_eq!(render("100%%-%d.tif", 2).unwrap(), "100%-2.tif");
        assert_eq!(render("scan.tif", 3).unwrap(), "scan.tif");
    }

    #[test]
    fn other_conversions_are_rejected() {
        assert!(matches!(
            render("page-%s.tif", 1),
            Err(ScanwerkError::Template(_))
        ));
        assert!(render("trailing-%", 1).is_err());
    }

    #[test]
    fn default_names() {
        let t = Utc.with_ymd_and_hms(2026, 3, 14, 15, 9, 26).unwrap();
        assert_eq!(default_template(&t, false), "20260314150926.tif");
        let batch = default_template(&t, true);
        assert_eq!(batch, "20260314150926-%04d.tif");
        assert_eq!(render(&batch, 12).unwrap(), "20260314150926-0012.tif");
    }
}
