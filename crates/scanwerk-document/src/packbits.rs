// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PackBits run-length encoding (TIFF compression 32773). Each row is packed
// on its own; runs never cross a row boundary.

const MAX_RUN: usize = 128;

/// Append the PackBits encoding of `row` to `out`.
pub fn encode_row(row: &[u8], out: &mut Vec<u8>) {
    let mut i = 0;
    while i < row.len() {
        let run = run_length(row, i);
        if run >= 3 {
            out.push((1 - run as i16) as u8);
            out.push(row[i]);
            i += run;
            continue;
        }

        let start = i;
        while i < row.len() && i - start < MAX_RUN && run_length(row, i) < 3 {
            i += 1;
        }
        out.push((i - start - 1) as u8);
        out.extend_from_slice(&row[start..i]);
    }
}

fn run_length(row: &[u8], at: usize) -> usize {
    let byte = row[at];
    row[at..]
        .iter()
        .take(MAX_RUN)
        .take_while(|&&b| b == byte)
        .count()
}

#[cfg(test)]
pub(crate) fn decode(mut packed: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    while let Some((&header, rest)) = packed.split_first() {
        let n = header as i8;
        if n >= 0 {
            let len = n as usize + 1;
            out.extend_from_slice(&rest[..len]);
            packed = &rest[len..];
        } else if n != -128 {
            out.extend(std::iter::repeat_n(rest[0], (1 - i16::from(n)) as usize));
            packed = &rest[1..];
        } else {
            packed = rest;
        }
    }
    out
}
