//! `HolographicMeta`: the value object attached to
//! emitted snapshots and seals.

/// `{ session_id, created_at, bit_length, context_digest }`.
///
/// `created_at` is a Unix timestamp supplied by the caller — this
/// crate performs no I/O and does not read the system clock itself.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HolographicMeta {
    pub session_id: String,
    pub created_at: u64,
    pub bit_length: u32,
    pub context_digest: [u8; 32],
}
