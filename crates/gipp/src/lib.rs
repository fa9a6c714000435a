// SPDX-FileCopyrightText: 2025 xfnw
//
// SPDX-License-Identifier: MPL-2.0

//! select ip addresses matching prefix and suffix patterns

mod addr;
mod filter;
mod pattern;

pub use addr::{Address, Version, parse_address};
pub use filter::{compile_patterns, filter_lines};
pub use pattern::{Pattern, compile_pattern};

#[derive(Debug, Clone, PartialEq, Eq, foxerror::FoxError)]
pub enum Error {
    /// invalid address
    InvalidAddress(String),
    /// invalid pattern
    InvalidPattern(String),
}
