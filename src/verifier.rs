//! TraceInspector: replays the
//! exact evolution rule for a claimed path and checks the final `T`.

use num_bigint::BigUint;

use crate::accumulator::{evolve_step, maybe_fold};
use crate::context::CryptoContext;
use crate::registry::PrimeRegistry;

/// Stateless path replay and equality check.
pub struct TraceInspector;

impl TraceInspector {
    /// Re-executes `update` for each id in `path`, starting from
    /// `(starting_t, starting_depth)`, folding whenever depth crosses
    /// `ctx.max_depth()`, and compares the final `T` to `claimed_t`.
    ///
    /// Returns `(true, "ok")` on equality. A mismatch is never an
    /// error — it's a `(false, reason)` result.
    pub fn verify_path(
        ctx: &CryptoContext,
        registry: &PrimeRegistry,
        claimed_t: &BigUint,
        path: &[Vec<u8>],
        starting_t: &BigUint,
        starting_depth: u32,
    ) -> (bool, &'static str) {
        let mut t = starting_t.clone();
        let mut depth = starting_depth;

        for agent_id in path {
            let t_prime = match evolve_step(ctx, registry, &t, depth, agent_id) {
                Ok(v) => v,
                Err(_) => return (false, "path replay failed: unregisterable agent id"),
            };
            let (t_next, depth_next, _snap) = maybe_fold(ctx, t_prime, depth);
            t = t_next;
            depth = depth_next;
        }

        if &t == claimed_t {
            (true, "ok")
        } else {
            (false, "final fingerprint does not match claimed T")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accumulator::SnapshotAccumulator;
    use crate::context::tests::test_context;

    #[test]
    fn verification_round_trip() {
        let ctx = test_context();
        let reg = PrimeRegistry::new(ctx.prime_bits(), 40);
        let mut acc = SnapshotAccumulator::new(&ctx);
        let path: Vec<Vec<u8>> = vec![b"alice".to_vec(), b"bob".to_vec()];
        for id in &path {
            acc.update(&reg, id).unwrap();
        }

        let (ok, reason) = TraceInspector::verify_path(
            &ctx,
            &reg,
            acc.current_t(),
            &path,
            ctx.seed(),
            0,
        );
        assert!(ok, "{}", reason);
    }

    #[test]
    fn verification_detects_wrong_path() {
        let ctx = test_context();
        let reg = PrimeRegistry::new(ctx.prime_bits(), 40);
        let mut acc = SnapshotAccumulator::new(&ctx);
        let path: Vec<Vec<u8>> = vec![b"alice".to_vec(), b"bob".to_vec()];
        for id in &path {
            acc.update(&reg, id).unwrap();
        }

        let wrong_path: Vec<Vec<u8>> = vec![b"bob".to_vec(), b"alice".to_vec()];
        let (ok, _) = TraceInspector::verify_path(
            &ctx,
            &reg,
            acc.current_t(),
            &wrong_path,
            ctx.seed(),
            0,
        );
        assert!(!ok);
    }

    #[test]
    fn fold_transparency() {
        // max_depth = 3 in CTX_TEST; 4 updates cross one fold boundary.
        let ctx = test_context();
        let reg = PrimeRegistry::new(ctx.prime_bits(), 40);
        let mut acc = SnapshotAccumulator::new(&ctx);
        let path: Vec<Vec<u8>> = vec![
            b"a".to_vec(),
            b"b".to_vec(),
            b"c".to_vec(),
            b"d".to_vec(),
        ];
        for id in &path {
            acc.update(&reg, id).unwrap();
        }
        assert_eq!(acc.snapshot_chain().len(), 1);

        let (ok, reason) = TraceInspector::verify_path(
            &ctx,
            &reg,
            acc.current_t(),
            &path,
            ctx.seed(),
            0,
        );
        assert!(ok, "{}", reason);
    }
}
