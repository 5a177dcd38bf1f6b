//! Scope operators: `SwarmScope` for ordered
//! sub-traces, `ParallelScope` for commutative fan-out/fan-in.

use num_bigint::BigUint;

use crate::accumulator::{evolve_step, maybe_fold, Snapshot};
use crate::context::CryptoContext;
use crate::error::Result;
use crate::registry::PrimeRegistry;

/// A sub-trace bound to a value snapshot of the parent's `(T, depth)`
/// — never a back-reference to the live accumulator. The caller
/// installs the committed result into the parent via
/// `SnapshotAccumulator::set_state`.
pub struct SwarmScope<'a> {
    ctx: &'a CryptoContext,
    t: BigUint,
    depth: u32,
    snapshots: Vec<Snapshot>,
}

impl<'a> SwarmScope<'a> {
    /// Clones `(parent_T, parent_depth)` into a private working state.
    pub fn enter(ctx: &'a CryptoContext, parent_t: &BigUint, parent_depth: u32) -> Self {
        SwarmScope {
            ctx,
            t: parent_t.clone(),
            depth: parent_depth,
            snapshots: Vec::new(),
        }
    }

    /// Applies the same update rule as `SnapshotAccumulator::update`,
    /// locally, preserving order — scope updates are non-commutative.
    pub fn record(&mut self, registry: &PrimeRegistry, agent_id: &[u8]) -> Result<()> {
        let t_prime = evolve_step(self.ctx, registry, &self.t, self.depth, agent_id)?;
        let (t_next, depth_next, snap) = maybe_fold(self.ctx, t_prime, self.depth);
        if let Some(s) = snap {
            self.snapshots.push(s);
        }
        self.t = t_next;
        self.depth = depth_next;
        Ok(())
    }

    /// Returns the scope's final `(T, depth)` and any snapshots folded
    /// while the scope was active; the parent state is never mutated
    /// by the scope itself.
    pub fn commit(self) -> (BigUint, u32, Vec<Snapshot>) {
        (self.t, self.depth, self.snapshots)
    }
}

/// An in-order fan-out/fan-in over a fixed base state. Each branch is
/// a pure, one-step evolution from the identical base; `merge`
/// exploits commutativity of multiplication in `Z_M*` so branch
/// insertion order never affects the result.
pub struct ParallelScope<'a> {
    ctx: &'a CryptoContext,
    base_t: BigUint,
    base_depth: u32,
    branch_primes: Vec<BigUint>,
}

impl<'a> ParallelScope<'a> {
    pub fn new(ctx: &'a CryptoContext, _registry: &PrimeRegistry, base_t: &BigUint, base_depth: u32) -> Self {
        ParallelScope {
            ctx,
            base_t: base_t.clone(),
            base_depth,
            branch_primes: Vec::new(),
        }
    }

    /// Registers `agent_id` and records its prime for the eventual
    /// merge. The one-step branch value itself
    /// (`base_T^{p_i} · G^{H_exp(base_depth+1)} mod M`) can be computed
    /// independently per branch via [`compute_branch`]; this call only
    /// needs the prime, since `merge` folds all branches algebraically
    /// rather than multiplying already-reduced branch values back out.
    pub fn add_branch(&mut self, registry: &PrimeRegistry, agent_id: &[u8]) -> Result<()> {
        let p = registry.register(agent_id)?;
        self.branch_primes.push(p);
        Ok(())
    }

    /// `T_merged = base_T^{(Σ p_i) - (k-1)} · G^{k·H_exp(base_depth+1)} mod M`,
    /// `new_depth = base_depth + 1`. Invariant under permutation of the
    /// branches added, since it only depends on their multiset of
    /// primes.
    pub fn merge(self) -> (BigUint, u32) {
        let m = self.ctx.modulus();
        let k = self.branch_primes.len() as u64;
        let h = self.ctx.h_exp((self.base_depth as u64) + 1);

        let mut sum_p = BigUint::from(0u32);
        for p in &self.branch_primes {
            sum_p += p;
        }
        let exponent = if k == 0 {
            sum_p
        } else {
            sum_p - BigUint::from(k - 1)
        };

        let base_pow = self.base_t.modpow(&exponent, m);
        let g_exp = &h * BigUint::from(k);
        let g_pow = self.ctx.generator().modpow(&g_exp, m);
        let t_merged = (&base_pow * &g_pow) % m;

        (t_merged, self.base_depth + 1)
    }
}

/// Pure, one-step evolution of a single branch from a fixed base:
/// `base_T^{p} · G^{H_exp(base_depth+1)} mod M`. Factored out so
/// callers may parallelize branch computation themselves (threads, a
/// pool, whatever fits); scheduling is the caller's concern, not this
/// crate's.
pub fn compute_branch(
    ctx: &CryptoContext,
    base_t: &BigUint,
    base_depth: u32,
    prime: &BigUint,
) -> BigUint {
    let m = ctx.modulus();
    let h = ctx.h_exp((base_depth as u64) + 1);
    let base_pow = base_t.modpow(prime, m);
    let g_pow = ctx.generator().modpow(&h, m);
    (&base_pow * &g_pow) % m
}
