//! StateSealer: an immutable binding
//! of accumulator state to a payload digest under the context.

use sha2::{Digest, Sha256};

use crate::accumulator::{Snapshot, SnapshotAccumulator};
use crate::context::CryptoContext;
use crate::error::Result;
use crate::meta::HolographicMeta;

/// Immutable post-seal bundle: the sealed `(T, depth, snapshots)` plus
/// the payload and context anchoring hashes, and the metadata attached
/// at seal time.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Seal {
    pub t: num_bigint::BigUint,
    pub depth: u32,
    pub snapshots: Vec<Snapshot>,
    pub payload_digest: [u8; 32],
    pub anchor: [u8; 32],
    pub meta: HolographicMeta,
}

pub struct StateSealer;

impl StateSealer {
    /// Produces a `Seal` binding `accumulator`'s current state to
    /// `payload_bytes`, then transitions the accumulator to `SEALED`.
    pub fn seal(
        accumulator: &mut SnapshotAccumulator,
        payload_bytes: &[u8],
        session_id: impl Into<String>,
        created_at: u64,
    ) -> Result<Seal> {
        let ctx: &CryptoContext = accumulator.context();
        let payload_digest = sha256(payload_bytes);
        let t_bytes = crate::bigint::to_decimal(accumulator.current_t());
        let context_digest = ctx.digest();

        let mut hasher = Sha256::new();
        hasher.update(t_bytes.as_bytes());
        hasher.update(payload_digest);
        hasher.update(context_digest);
        let anchor = finalize(hasher);

        let meta = HolographicMeta {
            session_id: session_id.into(),
            created_at,
            bit_length: ctx.bit_length() as u32,
            context_digest,
        };

        let seal = Seal {
            t: accumulator.current_t().clone(),
            depth: accumulator.depth(),
            snapshots: accumulator.snapshot_chain().to_vec(),
            payload_digest,
            anchor,
            meta,
        };

        accumulator.mark_sealed();
        log::debug!("sealed accumulator at depth {}", seal.depth);
        Ok(seal)
    }

    /// Recomputes `payload_digest` and `anchor` from `payload_bytes`
    /// and `seal.t`/`seal.meta.context_digest`, and checks equality
    /// against what's recorded in `seal`. A mismatch is `false`, never
    /// an error.
    pub fn verify(seal: &Seal, payload_bytes: &[u8]) -> bool {
        let payload_digest = sha256(payload_bytes);
        if payload_digest != seal.payload_digest {
            return false;
        }
        let t_bytes = crate::bigint::to_decimal(&seal.t);
        let mut hasher = Sha256::new();
        hasher.update(t_bytes.as_bytes());
        hasher.update(payload_digest);
        hasher.update(seal.meta.context_digest);
        let anchor = finalize(hasher);
        anchor == seal.anchor
    }
}

fn sha256(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    finalize(hasher)
}

fn finalize(hasher: Sha256) -> [u8; 32] {
    let out = hasher.finalize();
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&out);
    digest
}
