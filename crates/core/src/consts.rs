//! Constant variables.

/// Width of a ring identifier in bits.
pub const ID_BITS: usize = 32;
/// Default length of the successor list.
pub const DEFAULT_SUCCESSOR_LIST_LEN: u8 = 3;
/// Period of stabilize and fix fingers rounds, in ms.
pub const DEFAULT_STABILIZE_INTERVAL_MS: u64 = 1000;
/// Period of predecessor and successor liveness checks, in ms.
pub const DEFAULT_CHECK_PREDECESSOR_INTERVAL_MS: u64 = 500;
/// Bound on a single outbound request, in ms.
pub const DEFAULT_RPC_TIMEOUT_MS: u64 = 5000;
/// Extra time a lookup request gets per hop it may still take, in ms.
pub const DEFAULT_HOP_TIMEOUT_MARGIN_MS: u64 = 250;
/// Hop budget carried by a successor lookup.
pub const DEFAULT_MAX_HOPS: u8 = 32;
/// 1M
pub const DEFAULT_MAX_MESSAGE_LEN: u32 = 1024 * 1024;
/// How many times a lookup retries after dropping an unreachable finger.
pub const LOOKUP_ATTEMPTS: usize = 3;
/// Length of the header: one tag byte and eight hex digits.
pub const HEADER_LEN: usize = 9;
