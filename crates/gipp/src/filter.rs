// SPDX-FileCopyrightText: 2025 xfnw
//
// SPDX-License-Identifier: MPL-2.0

use crate::{Error, Pattern, compile_pattern, parse_address};
use std::io::{self, BufRead, Write};
use tracing::trace;

/// compile every pattern, stopping at the first one that fails
///
/// # Errors
///
/// the error from the first pattern that does not compile
pub fn compile_patterns<S: AsRef<str>>(texts: &[S]) -> Result<Vec<Pattern>, Error> {
    texts.iter().map(|t| compile_pattern(t.as_ref())).collect()
}

/// copy each address line of `input` to `output` once for every pattern
/// it matches
///
/// lines that are not an address are skipped. a trailing `\r` is dropped
/// along with the newline, otherwise lines are written as they were read.
/// returns how many lines were written.
///
/// # Errors
///
/// any io error from reading or writing
pub fn filter_lines(
    input: impl BufRead,
    output: &mut impl Write,
    patterns: &[Pattern],
) -> io::Result<usize> {
    let mut written = 0;
    for (n, line) in input.split(b'\n').enumerate() {
        let line = line?;
        let line = line.strip_suffix(b"\r").unwrap_or(&line);

        let Ok(text) = std::str::from_utf8(line) else {
            trace!(line = n + 1, "skipping non-utf8 line");
            continue;
        };
        let addr = match parse_address(text) {
            Ok(addr) => addr,
            Err(e) => {
                trace!(line = n + 1, %e, "skipping line");
                continue;
            }
        };

        for _ in patterns.iter().filter(|p| p.matches(&addr)) {
            output.write_all(line)?;
            output.write_all(b"\n")?;
            written += 1;
        }
    }
    Ok(written)
}
