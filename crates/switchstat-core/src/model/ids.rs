// ── Core identity types ──
//
// DatapathId, PortNo and MacAddress appear in every request, reply and
// record. Their Display impls produce the exact text used in the
// time-series streams.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

// ── DatapathId ──────────────────────────────────────────────────────

/// 64-bit switch identifier.
///
/// Renders as 16 lowercase hex digits, zero padded (`%016x`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatapathId(pub u64);

impl DatapathId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DatapathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl fmt::LowerHex for DatapathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl FromStr for DatapathId {
    type Err = ParseIntError;

    /// Accepts the 16-digit stream form, with or without a `0x` prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let digits = s.strip_prefix("0x").unwrap_or(s);
        u64::from_str_radix(digits, 16).map(Self)
    }
}

impl From<u64> for DatapathId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

// ── PortNo ──────────────────────────────────────────────────────────

/// Switch port number, including the reserved high values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortNo(pub u32);

impl PortNo {
    /// Wildcard port: "all ports" in a port-stats request.
    pub const ANY: Self = Self(0xffff_ffff);
    /// The switch's local networking stack.
    pub const LOCAL: Self = Self(0xffff_fffe);
    /// Send to the controller.
    pub const CONTROLLER: Self = Self(0xffff_fffd);
    /// Flood on all ports except the ingress port.
    pub const FLOOD: Self = Self(0xffff_fffb);

    pub const fn get(self) -> u32 {
        self.0
    }

    /// True for the reserved range (`0xffffff00` and above).
    pub const fn is_reserved(self) -> bool {
        self.0 >= 0xffff_ff00
    }
}

impl fmt::Display for PortNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::LowerHex for PortNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl From<u32> for PortNo {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

// ── MacAddress ──────────────────────────────────────────────────────

/// MAC address, normalized to lowercase colon-separated format (aa:bb:cc:dd:ee:ff).
///
/// Ordering is the ordering of the normalized text, which is what the
/// flow-record sort uses for ties on input port.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MacAddress(String);

impl MacAddress {
    /// Create a normalized MAC address from any common format.
    /// Accepts colon-separated, dash-separated, or bare hex.
    pub fn new(raw: impl AsRef<str>) -> Self {
        let lowered = raw.as_ref().trim().to_lowercase().replace('-', ":");
        if lowered.len() == 12 && lowered.bytes().all(|b| b.is_ascii_hexdigit()) {
            let octets: Vec<&str> = (0..6)
                .filter_map(|i| lowered.get(i * 2..i * 2 + 2))
                .collect();
            return Self(octets.join(":"));
        }
        Self(lowered)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Six colon-separated groups of one or two hex digits.
    pub fn is_well_formed(&self) -> bool {
        let groups: Vec<&str> = self.0.split(':').collect();
        groups.len() == 6
            && groups
                .iter()
                .all(|g| (1..=2).contains(&g.len()) && g.bytes().all(|b| b.is_ascii_hexdigit()))
    }
}

impl fmt::Display for MacAddress {
    // `pad` keeps width/alignment flags working, e.g. `{:>17}`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl FromStr for MacAddress {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for MacAddress {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
