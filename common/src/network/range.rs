//! # Discovery Ranges
//!
//! A discovery range is a host-octet sweep inside one IPv4 /24, written as
//! base prefix plus start and end octet (`192.168.10` + `1..=50`), or in text form:
//! * `192.168.10.1-50`
//! * `192.168.10.1-192.168.10.50`
//! * `192.168.10.0/24` (all usable hosts)

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::error::ValidationError;

pub const MIN_HOST_OCTET: u32 = 1;
pub const MAX_HOST_OCTET: u32 = 254;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiscoveryRange {
    base: [u8; 3],
    start: u8,
    end: u8,
}

impl DiscoveryRange {
    /// Validates a base prefix such as `"192.168.10"` and an inclusive octet range.
    pub fn new(base: &str, start: u32, end: u32) -> Result<Self, ValidationError> {
        let base = parse_base(base)?;

        if start > end {
            return Err(ValidationError::InvalidRange {
                start,
                end,
                reason: "start octet exceeds end octet",
            });
        }
        if start < MIN_HOST_OCTET || end > MAX_HOST_OCTET {
            return Err(ValidationError::InvalidRange {
                start,
                end,
                reason: "host octets must lie within 1-254",
            });
        }

        Ok(Self {
            base,
            start: start as u8,
            end: end as u8,
        })
    }

    pub fn start_addr(&self) -> Ipv4Addr {
        let [a, b, c] = self.base;
        Ipv4Addr::new(a, b, c, self.start)
    }

    pub fn end_addr(&self) -> Ipv4Addr {
        let [a, b, c] = self.base;
        Ipv4Addr::new(a, b, c, self.end)
    }

    /// Addresses in ascending order.
    pub fn to_iter(&self) -> impl Iterator<Item = Ipv4Addr> + use<> {
        let [a, b, c] = self.base;
        (self.start..=self.end).map(move |octet| Ipv4Addr::new(a, b, c, octet))
    }

    pub fn len(&self) -> usize {
        usize::from(self.end - self.start) + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl fmt::Display for DiscoveryRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start_addr(), self.end)
    }
}

impl FromStr for DiscoveryRange {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if let Some(range) = parse_cidr_range(s)? {
            return Ok(range);
        }

        let Some((start_str, end_str)) = s.split_once('-') else {
            return Err(unparsable(s, "expected START-END or BASE.0/24".into()));
        };

        let start_addr = start_str
            .trim()
            .parse::<Ipv4Addr>()
            .map_err(|e| unparsable(s, format!("invalid start address '{start_str}': {e}")))?;

        let end_addr = parse_range_end_addr(end_str.trim(), &start_addr, s)?;

        let [a, b, c, start] = start_addr.octets();
        let [ea, eb, ec, end] = end_addr.octets();
        if [a, b, c] != [ea, eb, ec] {
            return Err(unparsable(s, "range must stay within one /24".into()));
        }

        Self::new(&format!("{a}.{b}.{c}"), u32::from(start), u32::from(end))
    }
}

fn unparsable(input: &str, reason: String) -> ValidationError {
    ValidationError::UnparsableRange {
        input: input.to_string(),
        reason,
    }
}

fn parse_base(base: &str) -> Result<[u8; 3], ValidationError> {
    let invalid = || ValidationError::InvalidBase {
        base: base.to_string(),
    };

    let octets: Vec<u8> = base
        .trim()
        .split('.')
        .map(|octet| {
            if octet.is_empty() || !octet.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid());
            }
            octet.parse::<u8>().map_err(|_| invalid())
        })
        .collect::<Result<_, _>>()?;

    match octets.as_slice() {
        [a, b, c] => Ok([*a, *b, *c]),
        _ => Err(invalid()),
    }
}

/// Parses the end of a range, accepting abbreviated forms.
///
/// "192.168.1.1-50" implies 192.168.1.50, "192.168.1.1-192.168.1.255" is taken as is.
fn parse_range_end_addr(
    end_str: &str,
    start_addr: &Ipv4Addr,
    original_s: &str,
) -> Result<Ipv4Addr, ValidationError> {
    if let Ok(full_addr) = end_str.parse::<Ipv4Addr>() {
        return Ok(full_addr);
    }

    if end_str.is_empty() {
        return Err(unparsable(original_s, "end of range cannot be empty".into()));
    }

    let partial_octets: Vec<u8> = end_str
        .split('.')
        .map(|octet_str| octet_str.parse::<u8>())
        .collect::<Result<Vec<u8>, _>>()
        .map_err(|e| unparsable(original_s, format!("invalid end '{end_str}': {e}")))?;

    if partial_octets.len() > 4 {
        return Err(unparsable(original_s, format!("end has too many octets: {end_str}")));
    }

    let mut end_octets = start_addr.octets();
    let start_index = 4 - partial_octets.len();
    end_octets[start_index..].copy_from_slice(&partial_octets);

    Ok(Ipv4Addr::from(end_octets))
}

/// Parses `A.B.C.0/24` into the usable host range `A.B.C.1-254`.
fn parse_cidr_range(s: &str) -> Result<Option<DiscoveryRange>, ValidationError> {
    let Some((ip_str, prefix_str)) = s.split_once('/') else {
        return Ok(None);
    };

    let network = ip_str
        .trim()
        .parse::<Ipv4Addr>()
        .map_err(|e| unparsable(s, format!("invalid network '{ip_str}': {e}")))?;

    if prefix_str.trim() != "24" {
        return Err(unparsable(s, "only /24 networks can be swept".into()));
    }

    let [a, b, c, _] = network.octets();
    DiscoveryRange::new(&format!("{a}.{b}.{c}"), MIN_HOST_OCTET, MAX_HOST_OCTET).map(Some)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
