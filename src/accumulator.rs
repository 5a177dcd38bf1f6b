//! SnapshotAccumulator: the evolution rule
//! `T ← T^p · G^{H(d)} (mod M)`, depth tracking, and snapshot folding.

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, Zero};
use sha2::{Digest, Sha256};

use crate::context::CryptoContext;
use crate::error::{Result, SighaError};
use crate::registry::PrimeRegistry;

/// An archived `(T_folded, depth_at_fold, fold_seed)` tuple, appended
/// to `snapshots` whenever depth crosses `max_depth`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Snapshot {
    pub t_folded: BigUint,
    pub depth_at_fold: u32,
    pub fold_seed: [u8; 32],
}

/// `ACTIVE` accepts `update`/`update_with_check`; `SEALED` is
/// read-only, reached only via `StateSealer::seal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccumulatorStatus {
    Active,
    Sealed,
}

/// The mutable `(T, depth, snapshots)` tuple bound to one
/// `CryptoContext` for the lifetime of a session.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SnapshotAccumulator {
    ctx: CryptoContext,
    t: BigUint,
    depth: u32,
    snapshots: Vec<Snapshot>,
    #[cfg_attr(feature = "serde", serde(skip, default = "default_status"))]
    status: AccumulatorStatus,
}

#[cfg(feature = "serde")]
fn default_status() -> AccumulatorStatus {
    AccumulatorStatus::Active
}

/// `fold_seed = SHA-256(context_digest || "fold" || T_bytes || depth)`.
fn fold_seed(ctx: &CryptoContext, t: &BigUint, depth: u32) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(ctx.digest());
    hasher.update(b"fold");
    hasher.update(crate::bigint::to_decimal(t).as_bytes());
    hasher.update(depth.to_string().as_bytes());
    let out = hasher.finalize();
    let mut seed = [0u8; 32];
    seed.copy_from_slice(&out);
    seed
}

/// One step of the evolution rule: `T^p · G^{H_exp(depth+1)} mod M`.
/// Pure — does not itself decide whether a fold happens.
pub(crate) fn evolve_step(
    ctx: &CryptoContext,
    registry: &PrimeRegistry,
    t: &BigUint,
    depth: u32,
    agent_id: &[u8],
) -> Result<BigUint> {
    let p = registry.register(agent_id)?;
    let h = ctx.h_exp((depth as u64) + 1);
    let m = ctx.modulus();
    let t_pow_p = t.modpow(&p, m);
    let g_pow_h = ctx.generator().modpow(&h, m);
    Ok((&t_pow_p * &g_pow_h) % m)
}

/// Applies the snapshot-fold rule: if `depth + 1 >= max_depth`,
/// archives `(t, depth+1, fold_seed)` and derives the restart state
/// `T ← (T0 · G^{fold_seed mod 2^256}) mod M`, `depth ← 0`.
pub(crate) fn maybe_fold(
    ctx: &CryptoContext,
    t: BigUint,
    depth: u32,
) -> (BigUint, u32, Option<Snapshot>) {
    let new_depth = depth + 1;
    if new_depth < ctx.max_depth() {
        return (t, new_depth, None);
    }
    let seed = fold_seed(ctx, &t, new_depth);
    let snap = Snapshot {
        t_folded: t,
        depth_at_fold: new_depth,
        fold_seed: seed,
    };
    let exp = BigUint::from_bytes_be(&seed);
    let m = ctx.modulus();
    let g_pow = ctx.generator().modpow(&exp, m);
    let restart = (ctx.seed() * &g_pow) % m;
    (restart, 0, Some(snap))
}

impl SnapshotAccumulator {
    /// `T ← T0`, `depth ← 0`, `snapshots` empty, bound to `ctx`.
    pub fn new(ctx: &CryptoContext) -> Self {
        SnapshotAccumulator {
            ctx: ctx.clone(),
            t: ctx.seed().clone(),
            depth: 0,
            snapshots: Vec::new(),
            status: AccumulatorStatus::Active,
        }
    }

    pub fn context(&self) -> &CryptoContext {
        &self.ctx
    }

    pub fn status(&self) -> AccumulatorStatus {
        self.status
    }

    fn ensure_active(&self) -> Result<()> {
        match self.status {
            AccumulatorStatus::Active => Ok(()),
            AccumulatorStatus::Sealed => Err(SighaError::Sealed),
        }
    }

    /// The core evolution step: registers `agent_id`,
    /// evolves `T`, advances `depth`, and folds if the threshold is
    /// crossed.
    pub fn update(&mut self, registry: &PrimeRegistry, agent_id: &[u8]) -> Result<()> {
        self.ensure_active()?;
        let t_prime = evolve_step(&self.ctx, registry, &self.t, self.depth, agent_id)?;
        self.commit_evolution(t_prime);
        Ok(())
    }

    /// As `update`, but validates `gcd(T', M) = 1` and `T' != 1`
    /// before committing; on failure the accumulator is left
    /// unchanged and `DegenerateState` is raised.
    pub fn update_with_check(&mut self, registry: &PrimeRegistry, agent_id: &[u8]) -> Result<()> {
        self.ensure_active()?;
        let t_prime = evolve_step(&self.ctx, registry, &self.t, self.depth, agent_id)?;
        if t_prime.is_zero()
            || t_prime == BigUint::one()
            || t_prime.gcd(self.ctx.modulus()) != BigUint::one()
        {
            return Err(SighaError::DegenerateState(
                "post-update T' is degenerate (gcd != 1 or T' in {0, 1})".into(),
            ));
        }
        self.commit_evolution(t_prime);
        Ok(())
    }

    fn commit_evolution(&mut self, t_prime: BigUint) {
        let (t_next, depth_next, snap) = maybe_fold(&self.ctx, t_prime, self.depth);
        if let Some(s) = snap {
            log::debug!(
                "snapshot fold at depth {} ({} snapshots total)",
                s.depth_at_fold,
                self.snapshots.len() + 1
            );
            self.snapshots.push(s);
        }
        self.t = t_next;
        self.depth = depth_next;
    }

    pub fn current_t(&self) -> &BigUint {
        &self.t
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn snapshot_chain(&self) -> &[Snapshot] {
        &self.snapshots
    }

    /// Escape hatch for deserialization and testing. Validates
    /// `verify_in_group(T)`, rejects a shrinking `snapshots` rewrite
    /// (append-only: old snapshots are never rewritten), and is
    /// the only externally permitted mutation outside `update`/
    /// `update_with_check`.
    pub fn set_state(&mut self, t: BigUint, depth: u32, snapshots: Vec<Snapshot>) -> Result<()> {
        self.ensure_active()?;
        if !self.ctx.verify_in_group(&t) {
            return Err(SighaError::WeakParameters(
                "candidate T fails group membership".into(),
            ));
        }
        if snapshots.len() < self.snapshots.len() {
            return Err(SighaError::InvalidArgument(
                "snapshots may not shrink (append-only chain)".into(),
            ));
        }
        if self.snapshots[..] != snapshots[..self.snapshots.len()] {
            return Err(SighaError::InvalidArgument(
                "snapshots prefix does not match the existing chain".into(),
            ));
        }
        self.t = t;
        self.depth = depth;
        self.snapshots = snapshots;
        Ok(())
    }

    /// Transitions `ACTIVE -> SEALED`. Only `StateSealer::seal` should
    /// call this; there is no reverse transition.
    pub(crate) fn mark_sealed(&mut self) {
        self.status = AccumulatorStatus::Sealed;
    }

    /// Builds a fresh, `ACTIVE` accumulator directly from deserialized
    /// parts, validating only `verify_in_group(T)` — unlike
    /// `set_state`, there is no existing `snapshots` chain to compare
    /// a prefix against, since this constructs a brand-new instance
    /// rather than mutating one (used by the wire codec).
    pub(crate) fn from_raw_parts(
        ctx: CryptoContext,
        t: BigUint,
        depth: u32,
        snapshots: Vec<Snapshot>,
    ) -> Result<Self> {
        if !ctx.verify_in_group(&t) {
            return Err(SighaError::Deserialization(
                "deserialized T fails group membership".into(),
            ));
        }
        Ok(SnapshotAccumulator {
            ctx,
            t,
            depth,
            snapshots,
            status: AccumulatorStatus::Active,
        })
    }
}
