//! Identifier arithmetic on the ring.
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use sha1::Digest;
use sha1::Sha1;

use crate::consts::ID_BITS;
use crate::error::Error;

/// Position on the ring. Arithmetic wraps modulo 2^32.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RingId(u32);

/// Which endpoints of a ring interval are part of it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Interval {
    /// `(min, max)`
    Open,
    /// `(min, max]`
    OpenClosed,
    /// `[min, max)`
    ClosedOpen,
    /// `[min, max]`
    Closed,
}

impl Interval {
    fn includes_min(self) -> bool {
        matches!(self, Interval::ClosedOpen | Interval::Closed)
    }

    fn includes_max(self) -> bool {
        matches!(self, Interval::OpenClosed | Interval::Closed)
    }
}

impl RingId {
    /// Wrap a raw identifier.
    pub const fn new(v: u32) -> Self {
        Self(v)
    }

    /// Raw value.
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Hash a human readable name onto the ring.
    /// The first four bytes of its SHA-1 digest are read big-endian.
    pub fn from_name(name: &str) -> Self {
        let digest = Sha1::digest(name.as_bytes());
        Self(u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]))
    }

    /// Plain numeric comparison, no wraparound.
    pub fn compare(&self, other: &RingId) -> Ordering {
        self.0.cmp(&other.0)
    }

    /// Whether `self` lies on the clockwise arc from `min` to `max`.
    ///
    /// When `max < min` the arc crosses zero. When `min == max` the arc is the
    /// single point `max`, whatever the endpoint flags say. Callers that need
    /// "whole ring" semantics (a node alone on the ring) check for it first.
    pub fn in_range(&self, min: RingId, max: RingId, interval: Interval) -> bool {
        let id = self.0;
        let (lo, hi) = (min.0, max.0);
        if lo == hi {
            return id == hi;
        }
        let above_min = id > lo || (interval.includes_min() && id == lo);
        let below_max = id < hi || (interval.includes_max() && id == hi);
        if hi > lo {
            above_min && below_max
        } else {
            above_min || below_max
        }
    }

    /// Start of finger slot `k`: `self + 2^k`.
    pub fn finger_start(&self, k: usize) -> RingId {
        debug_assert!(k < ID_BITS);
        Self(self.0.wrapping_add(1u32 << k))
    }

    /// Clockwise distance from `self` to `other`.
    pub fn distance_to(&self, other: RingId) -> u32 {
        other.0.wrapping_sub(self.0)
    }

    /// Network order bytes.
    pub fn to_be_bytes(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }

    /// Read from network order bytes.
    pub fn from_be_bytes(bytes: [u8; 4]) -> Self {
        Self(u32::from_be_bytes(bytes))
    }
}

impl From<u32> for RingId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

impl From<RingId> for u32 {
    fn from(id: RingId) -> Self {
        id.0
    }
}

impl fmt::Display for RingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

impl FromStr for RingId {
    type Err = Error;

    /// Accepts `0x` prefixed hex or plain decimal.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u32::from_str_radix(hex, 16),
            None => s.parse::<u32>(),
        };
        parsed
            .map(Self)
            .map_err(|e| Error::MalformedBody(format!("bad ring id {s:?}: {e}")))
    }
}
