//! PrimeRegistry: deterministic, cached identity
//! → prime mapping, shared read-write across threads.

use num_bigint::BigUint;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{Result, SighaError};
use crate::primes;

/// Maps `AgentID` (a byte string) to a distinct odd prime of
/// `prime_bits` bit length, memoizing `hash_to_prime` so repeated
/// registrations of the same id are cheap.
///
/// Concurrent `register` calls for the same id converge to the same
/// prime because `hash_to_prime` is a pure function of its inputs; the
/// shared lock just avoids redundant hashing work, not correctness
/// across the registry's lifetime.
pub struct PrimeRegistry {
    prime_bits: usize,
    mr_rounds: usize,
    cache: Mutex<HashMap<Vec<u8>, BigUint>>,
}

impl PrimeRegistry {
    pub fn new(prime_bits: usize, mr_rounds: usize) -> Self {
        PrimeRegistry {
            prime_bits,
            mr_rounds,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Idempotent: returns the cached prime if present, otherwise
    /// computes, caches, and returns it.
    pub fn register(&self, id: &[u8]) -> Result<BigUint> {
        if id.is_empty() {
            return Err(SighaError::InvalidArgument("empty agent id".into()));
        }
        let mut cache = self.cache.lock().map_err(|_| SighaError::LockPoisoned)?;
        if let Some(p) = cache.get(id) {
            return Ok(p.clone());
        }
        let prime = primes::hash_to_prime(id, self.prime_bits, self.mr_rounds)?;
        cache.insert(id.to_vec(), prime.clone());
        log::trace!("registered agent id ({} bytes) -> prime", id.len());
        Ok(prime)
    }

    /// Read-only lookup; does not compute on a miss.
    pub fn get(&self, id: &[u8]) -> Result<BigUint> {
        let cache = self.cache.lock().map_err(|_| SighaError::LockPoisoned)?;
        cache
            .get(id)
            .cloned()
            .ok_or(SighaError::NotRegistered)
    }

    /// Snapshot of all `(id, prime)` pairs currently cached. Order is
    /// unspecified except that `digest()` sorts by id internally.
    pub fn iter(&self) -> Result<Vec<(Vec<u8>, BigUint)>> {
        let cache = self.cache.lock().map_err(|_| SighaError::LockPoisoned)?;
        Ok(cache.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }

    /// Hash over `(id, prime)` pairs sorted by id, for reproducible
    /// digests independent of registration order.
    pub fn digest(&self) -> Result<[u8; 32]> {
        let mut pairs = self.iter()?;
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        let mut hasher = Sha256::new();
        hasher.update(b"sigha-registry-v1");
        for (id, prime) in &pairs {
            hasher.update(&(id.len() as u64).to_be_bytes());
            hasher.update(id);
            hasher.update(crate::bigint::to_decimal(prime).as_bytes());
        }
        let out = hasher.finalize();
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&out);
        Ok(digest)
    }
}
