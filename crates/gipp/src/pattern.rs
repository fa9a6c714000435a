// SPDX-FileCopyrightText: 2025 xfnw
//
// SPDX-License-Identifier: MPL-2.0

use crate::{
    Error,
    addr::{Address, parse_address},
};
use nom::{IResult, Parser, combinator::all_consuming};
use std::{fmt, str::FromStr};
use tracing::{debug, warn};

/// an address plus the range of bits that have to agree with it
///
/// bits are numbered from the most significant end, so `/24` on an
/// ipv4 address constrains bits `0..24` and `/-8` constrains `24..32`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pattern {
    address: Address,
    mask_start: u32,
    mask_end: u32,
    mask: u128,
}

/// the lowest `n` bits set
const fn low_bits(n: u32) -> u128 {
    if n >= u128::BITS {
        u128::MAX
    } else {
        (1 << n) - 1
    }
}

#[test]
fn test_low_bits() {
    assert_eq!(low_bits(0), 0);
    assert_eq!(low_bits(3), 0b111);
    assert_eq!(low_bits(128), u128::MAX);
}

impl Pattern {
    fn new(address: Address, mask_start: u32, mask_end: u32) -> Self {
        let bits = address.bit_len();
        let mask = low_bits(bits - mask_start) & !low_bits(bits - mask_end);
        Self {
            address,
            mask_start,
            mask_end,
            mask,
        }
    }

    #[must_use]
    pub const fn address(&self) -> &Address {
        &self.address
    }

    /// first constrained bit
    #[must_use]
    pub const fn mask_start(&self) -> u32 {
        self.mask_start
    }

    /// one past the last constrained bit
    #[must_use]
    pub const fn mask_end(&self) -> u32 {
        self.mask_end
    }

    /// check whether every constrained bit of `candidate` equals the
    /// pattern's address
    ///
    /// addresses from the other family never match
    #[must_use]
    pub fn matches(&self, candidate: &Address) -> bool {
        candidate.version() == self.address.version()
            && (candidate.to_bits() ^ self.address.to_bits()) & self.mask == 0
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bits = self.address.bit_len();
        write!(f, "{}", self.address)?;
        if self.mask_start != 0 {
            write!(f, "/-{}", bits - self.mask_start)?;
        }
        if self.mask_end != bits {
            write!(f, "/{}", self.mask_end)?;
        }
        Ok(())
    }
}

impl FromStr for Pattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        compile_pattern(s)
    }
}

fn mask_len(inp: &str) -> IResult<&str, i32> {
    nom::character::complete::i32(inp)
}

#[test]
fn test_mask_len() {
    assert_eq!(mask_len("24"), Ok(("", 24)));
    assert_eq!(mask_len("-8"), Ok(("", -8)));
    assert_eq!(mask_len("12x"), Ok(("x", 12)));
    assert!(mask_len("x").is_err());
}

/// compile `<address>[/<mask>[/<mask>]]`
///
/// a positive mask is a prefix length and sets where the constrained
/// range ends, a negative one is a suffix length and sets where it
/// starts. a repeated sign overwrites the earlier mask.
///
/// # Errors
///
/// [`Error::InvalidAddress`] if the address literal does not parse,
/// [`Error::InvalidPattern`] if a mask is not a nonzero integer within
/// the address length, if there are more than two masks, or if the
/// suffix and prefix leave nothing to compare
pub fn compile_pattern(text: &str) -> Result<Pattern, Error> {
    let (literal, masks) = text.split_once('/').unwrap_or((text, ""));
    let address = parse_address(literal)?;
    let bits = address.bit_len();
    let invalid = || Error::InvalidPattern(text.to_string());

    let mut prefix = None;
    let mut suffix = None;
    for (n, token) in masks.split('/').filter(|t| !t.is_empty()).enumerate() {
        if n >= 2 {
            return Err(invalid());
        }
        let (_, len) = all_consuming(mask_len)
            .parse(token)
            .map_err(|_| invalid())?;
        let abs = len.unsigned_abs();
        if abs == 0 || abs > bits {
            return Err(invalid());
        }
        let slot = if len > 0 { &mut prefix } else { &mut suffix };
        if let Some(old) = slot.replace(abs) {
            warn!(pattern = text, old, new = abs, "mask given twice, using the last one");
        }
    }

    let mask_start = suffix.map_or(0, |s| bits - s);
    let mask_end = prefix.unwrap_or(bits);
    if mask_start > mask_end {
        return Err(invalid());
    }

    let pattern = Pattern::new(address, mask_start, mask_end);
    debug!(%pattern, mask_start, mask_end, "compiled pattern");
    Ok(pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(text: &str) -> Result<(u32, u32), Error> {
        compile_pattern(text).map(|p| (p.mask_start(), p.mask_end()))
    }

    fn matches(pattern: &str, addr: &str) -> bool {
        let pattern = compile_pattern(pattern).unwrap();
        pattern.matches(&parse_address(addr).unwrap())
    }

    #[test]
    fn bounds_from_masks() {
        assert_eq!(bounds("2001:db8::abcd:01ff:fe00:0"), Ok((0, 128)));
        assert_eq!(bounds("fe80::/10"), Ok((0, 10)));
        assert_eq!(bounds("::100/-9"), Ok((119, 128)));
        assert_eq!(bounds("::abcd:1ff:fe00:0/-64/104"), Ok((64, 104)));
        assert_eq!(bounds("::abcd:1ff:fe00:0/104/-64"), Ok((64, 104)));
        assert_eq!(bounds("192.168.1.100"), Ok((0, 32)));
        assert_eq!(bounds("192.168.1.0/24"), Ok((0, 24)));
        assert_eq!(bounds("0.0.0.1/-8"), Ok((24, 32)));
        assert_eq!(bounds("0.0.100.0/-16/24"), Ok((16, 24)));
        assert_eq!(bounds("10.0.0.0/32/-32"), Ok((0, 32)));
    }

    #[test]
    fn empty_mask_tokens_are_skipped() {
        assert_eq!(bounds("10.0.0.0/"), Ok((0, 32)));
        assert_eq!(bounds("10.0.0.0//8"), Ok((0, 8)));
        assert_eq!(bounds("10.0.0.0/-8/"), Ok((24, 32)));
    }

    #[test]
    fn repeated_sign_keeps_the_last_mask() {
        assert_eq!(bounds("10.0.0.0/10/20"), Ok((0, 20)));
        assert_eq!(bounds("10.0.0.0/-20/-10"), Ok((22, 32)));
    }

    #[test]
    fn bad_masks() {
        for bad in [
            "192.168.1.0/-33",
            "192.168.1.0/33",
            "::abcd:01ff:fe00:0/-64/129",
            "::abcd:01ff:fe00:0/-129",
            "10.0.0.0/0",
            "10.0.0.0/-0",
            "10.0.0.0/eight",
            "10.0.0.0/8x",
            "10.0.0.0/ 8",
            "10.0.0.0/99999999999",
            "10.0.0.0/8/-8/4",
            "1.2.3.4/-8/10",
        ] {
            assert_eq!(
                compile_pattern(bad),
                Err(Error::InvalidPattern(bad.to_string())),
                "{bad}"
            );
        }
    }

    #[test]
    fn bad_address_in_pattern() {
        assert_eq!(
            compile_pattern("10.0.0/8"),
            Err(Error::InvalidAddress("10.0.0".to_string()))
        );
        assert_eq!(
            compile_pattern("/8"),
            Err(Error::InvalidAddress(String::new()))
        );
    }

    #[test]
    fn ipv6_matching() {
        assert!(matches("2001:db8::abcd:1ff:fe00:0", "2001:db8::abcd:1ff:fe00:0"));
        assert!(matches("2001:db8::abcd:1ff:fe00:0/128", "2001:db8::abcd:1ff:fe00:0"));
        assert!(matches("2001:db8::/64", "2001:db8::abcd:1ff:fe00:0"));
        assert!(matches("0::abcd:1ff:fe00:0/-64", "2001:db8::abcd:1ff:fe00:0"));
        assert!(matches("::abcd:1ff:fe00:0/-64/104", "2001:db8::abcd:1ff:fe00:0"));
        assert!(!matches("2001:db8::abcd:1ff:fe00:0", "2001:db8::abcd:1ff:fe00:1"));
        assert!(!matches("2001:db8::abcd:1ff:fe00:0/128", "2001:db8::abcd:1ff:fe00:1"));
        assert!(!matches("2001:db8:100::/64", "2001:db8:200::abcd:1ff:fe00:1"));
        assert!(!matches("::ef01:1ff:fe00:0/-64", "2001:db8::abcd:1ff:fe00:1"));
        assert!(!matches("::ef01:1ff:fe00:0/-64/104", "2001:db8::abcd:1ff:fe00:1"));
    }

    #[test]
    fn ipv4_matching() {
        assert!(matches("192.168.100.1", "192.168.100.1"));
        assert!(matches("192.168.100.1/32", "192.168.100.1"));
        assert!(matches("192.168.100.0/24", "192.168.100.1"));
        assert!(matches("0.0.0.101/-8", "192.168.100.101"));
        assert!(!matches("192.168.100.1", "10.0.0.1"));
        assert!(!matches("192.168.100.1/32", "10.0.0.1"));
        assert!(!matches("192.168.100.0/24", "10.0.0.1"));
        assert!(!matches("0.0.0.101/-24", "10.0.0.1"));
    }

    #[test]
    fn bounds_inside_a_byte() {
        assert!(matches("fe80::/10", "febf:ffff::1"));
        assert!(!matches("fe80::/10", "fec0::1"));
        assert!(matches("10.0.0.0/9", "10.127.255.255"));
        assert!(!matches("10.0.0.0/9", "10.128.0.0"));
        assert!(matches("0.0.0.5/-3", "200.1.2.13"));
        assert!(!matches("0.0.0.5/-3", "200.1.2.14"));
        assert!(matches("0.8.0.0/-20/13", "255.252.0.0"));
        assert!(!matches("0.8.0.0/-20/13", "255.244.0.0"));
    }

    #[test]
    fn outside_the_range_is_ignored() {
        let pattern = compile_pattern("::abcd:1ff:fe00:0/-64/104").unwrap();
        let base = parse_address("::abcd:1ff:fe00:0").unwrap().to_bits();
        for bit in (0..64).chain(104..128) {
            let flipped = crate::Address::V6((base ^ (1 << (127 - bit))).to_be_bytes());
            assert!(pattern.matches(&flipped), "bit {bit}");
        }
        for bit in 64..104 {
            let flipped = crate::Address::V6((base ^ (1 << (127 - bit))).to_be_bytes());
            assert!(!pattern.matches(&flipped), "bit {bit}");
        }
    }

    #[test]
    fn families_never_mix() {
        assert!(!matches("::/-1", "0.0.0.0"));
        assert!(!matches("0.0.0.0/1", "::"));
        assert!(!matches("::ffff:0:0/96", "1.2.3.4"));
    }

    #[test]
    fn display_normalizes() {
        let shown = |t: &str| compile_pattern(t).unwrap().to_string();
        assert_eq!(shown("192.168.001.0/24"), "192.168.1.0/24");
        assert_eq!(shown("::abcd:01ff:fe00:0/104/-64"), "::abcd:1ff:fe00:0/-64/104");
        assert_eq!(shown("0.0.0.1/-8"), "0.0.0.1/-8");
        assert_eq!(shown("10.0.0.1/32"), "10.0.0.1");
    }
}
