// SPDX-FileCopyrightText: 2025 xfnw
//
// SPDX-License-Identifier: MPL-2.0

use crate::Error;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while_m_n},
    character::complete::char,
    combinator::{all_consuming, map_res},
    multi::{separated_list0, separated_list1},
    sequence::separated_pair,
};
use std::{
    fmt,
    net::{IpAddr, Ipv4Addr, Ipv6Addr},
    str::FromStr,
};

/// which address family an [`Address`] belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Version {
    V4,
    V6,
}

/// an ip address as big-endian bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Address {
    V4([u8; 4]),
    V6([u8; 16]),
}

impl Address {
    #[must_use]
    pub const fn version(&self) -> Version {
        match self {
            Self::V4(_) => Version::V4,
            Self::V6(_) => Version::V6,
        }
    }

    #[must_use]
    pub fn octets(&self) -> &[u8] {
        match self {
            Self::V4(o) => o,
            Self::V6(o) => o,
        }
    }

    /// number of bits in the address, 32 or 128
    #[must_use]
    pub const fn bit_len(&self) -> u32 {
        match self {
            Self::V4(_) => 32,
            Self::V6(_) => 128,
        }
    }

    /// the address as an unsigned integer
    ///
    /// ipv4 addresses only occupy the low 32 bits
    #[must_use]
    pub const fn to_bits(&self) -> u128 {
        match self {
            Self::V4(o) => u32::from_be_bytes(*o) as u128,
            Self::V6(o) => u128::from_be_bytes(*o),
        }
    }
}

impl From<Ipv4Addr> for Address {
    fn from(ip: Ipv4Addr) -> Self {
        Self::V4(ip.octets())
    }
}

impl From<Ipv6Addr> for Address {
    fn from(ip: Ipv6Addr) -> Self {
        Self::V6(ip.octets())
    }
}

impl From<IpAddr> for Address {
    fn from(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(ip) => ip.into(),
            IpAddr::V6(ip) => ip.into(),
        }
    }
}

impl From<Address> for IpAddr {
    fn from(addr: Address) -> Self {
        match addr {
            Address::V4(o) => Ipv4Addr::from(o).into(),
            Address::V6(o) => Ipv6Addr::from(o).into(),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        IpAddr::from(*self).fmt(f)
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_address(s)
    }
}

fn octet(inp: &str) -> IResult<&str, u8> {
    map_res(
        take_while_m_n(1, 3, |c: char| c.is_ascii_digit()),
        str::parse::<u8>,
    )
    .parse(inp)
}

fn ipv4(inp: &str) -> IResult<&str, [u8; 4]> {
    map_res(separated_list1(char('.'), octet), <[u8; 4]>::try_from).parse(inp)
}

#[test]
fn test_ipv4() {
    assert_eq!(ipv4("192.168.0.1"), Ok(("", [192, 168, 0, 1])));
    assert_eq!(ipv4("010.001.0.00"), Ok(("", [10, 1, 0, 0])));
    assert!(ipv4("10.0.0").is_err());
    assert!(ipv4("1.2.3.256").is_err());
}

fn hex_group(inp: &str) -> IResult<&str, u16> {
    map_res(
        take_while_m_n(1, 4, |c: char| c.is_ascii_hexdigit()),
        |out| u16::from_str_radix(out, 16),
    )
    .parse(inp)
}

fn hex_groups(inp: &str) -> IResult<&str, Vec<u16>> {
    separated_list0(char(':'), hex_group).parse(inp)
}

#[test]
fn test_hex_groups() {
    assert_eq!(hex_groups("2001:db8"), Ok(("", vec![0x2001, 0xdb8])));
    assert_eq!(hex_groups("fe80::1"), Ok(("::1", vec![0xfe80])));
    assert_eq!(hex_groups("::"), Ok(("::", vec![])));
    assert_eq!(hex_groups("12345"), Ok(("5", vec![0x1234])));
}

/// glue the groups on either side of a `::` back together
fn expand(head: &[u16], tail: &[u16]) -> Option<[u8; 16]> {
    let zeros = 8usize.checked_sub(head.len() + tail.len())?;
    let mut out = [0; 16];
    let groups = head
        .iter()
        .chain(std::iter::repeat_n(&0, zeros))
        .chain(tail);
    for (chunk, group) in out.chunks_exact_mut(2).zip(groups) {
        chunk.copy_from_slice(&group.to_be_bytes());
    }
    Some(out)
}

fn ipv6(inp: &str) -> IResult<&str, [u8; 16]> {
    alt((
        map_res(
            separated_pair(hex_groups, tag("::"), hex_groups),
            |(head, tail)| expand(&head, &tail).ok_or(()),
        ),
        map_res(hex_groups, |groups| {
            if groups.len() == 8 {
                expand(&groups, &[]).ok_or(())
            } else {
                Err(())
            }
        }),
    ))
    .parse(inp)
}

#[test]
fn test_ipv6() {
    let mut expected = [0; 16];
    expected[15] = 1;
    assert_eq!(ipv6("::1"), Ok(("", expected)));
    assert_eq!(ipv6("0:0:0:0:0:0:0:1"), Ok(("", expected)));
    assert_eq!(ipv6("1::2::3").map(|(rest, _)| rest), Ok("::3"));
    assert!(ipv6("1:2:3:4:5:6:7").is_err());
}

/// parse a textual ipv4 or ipv6 address
///
/// the family is picked by whichever of `.` or `:` shows up first
///
/// # Errors
///
/// [`Error::InvalidAddress`] if the text is not exactly one address
pub fn parse_address(text: &str) -> Result<Address, Error> {
    let invalid = || Error::InvalidAddress(text.to_string());
    let parsed = match text.find(['.', ':']).map(|i| text.as_bytes()[i]) {
        Some(b'.') => all_consuming(ipv4).parse(text).map(|(_, o)| Address::V4(o)),
        Some(_) => all_consuming(ipv6).parse(text).map(|(_, o)| Address::V6(o)),
        None => return Err(invalid()),
    };
    parsed.map_err(|_| invalid())
}
