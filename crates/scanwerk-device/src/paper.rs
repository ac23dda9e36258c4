// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Paper catalog. Sizes are in PostScript points, names match case-insensitively.

use scanwerk_core::PaperSize;

const fn paper(name: &'static str, width_pt: f64, height_pt: f64) -> PaperSize {
    PaperSize {
        name,
        width_pt,
        height_pt,
    }
}

/// Known paper sizes, portrait orientation.
pub const PAPERS: &[PaperSize] = &[
    paper("a3", 842.0, 1191.0),
    paper("a4", 595.0, 842.0),
    paper("a5", 420.0, 595.0),
    paper("b5", 499.0, 709.0),
    paper("letter", 612.0, 792.0),
    paper("legal", 612.0, 1008.0),
    paper("executive", 522.0, 756.0),
    paper("halfletter", 396.0, 612.0),
    paper("statement", 396.0, 612.0),
    paper("tabloid", 792.0, 1224.0),
    paper("ledger", 1224.0, 792.0),
    paper("folio", 612.0, 936.0),
    paper("quarto", 610.0, 780.0),
    paper("10x14", 720.0, 1008.0),
    paper("note", 540.0, 720.0),
    paper("c5", 459.0, 649.0),
    paper("dl", 312.0, 624.0),
    paper("b6", 354.0, 499.0),
    paper("a6", 297.0, 420.0),
];

/// Look a paper up by name.
pub fn lookup(name: &str) -> Option<PaperSize> {
    PAPERS
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(name))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_case_insensitive() {
        assert_eq!(lookup("A4"), lookup("a4"));
        assert_eq!(lookup("Letter").unwrap().width_pt, 612.0);
    }

    #[test]
    fn unknown_names_are_none() {
        assert!(lookup("napkin").is_none());
    }
}
