//! Prime utilities: Miller–Rabin primality testing,
//! random prime generation, safe-prime search, and the deterministic
//! `hash_to_prime` identity mapping.

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

use crate::error::{Result, SighaError};

/// Default Miller–Rabin round count, overridable via `SIGHA_MR_ROUNDS`.
pub const DEFAULT_MR_ROUNDS: usize = 40;

/// Retry budget for prime sampling.
pub const PRIME_RETRY_CAP: u32 = 1024;

const SMALL_PRIME_COUNT: usize = 256;

fn small_primes() -> &'static [u64] {
    static PRIMES: OnceLock<Vec<u64>> = OnceLock::new();
    PRIMES.get_or_init(|| sieve_first_n_primes(SMALL_PRIME_COUNT))
}

fn sieve_first_n_primes(n: usize) -> Vec<u64> {
    let mut primes = Vec::with_capacity(n);
    let mut candidate = 2u64;
    while primes.len() < n {
        if primes.iter().all(|p| candidate % p != 0) {
            primes.push(candidate);
        }
        candidate += 1;
    }
    primes
}

/// Trial division by the first ~256 small primes. `Some(true)` if `n`
/// *is* one of the small primes, `Some(false)` if divisible by one
/// (definitely composite), `None` if inconclusive.
fn trial_division(n: &BigUint) -> Option<bool> {
    for &p in small_primes() {
        let p_big = BigUint::from(p);
        if *n == p_big {
            return Some(true);
        }
        if n.is_multiple_of(&p_big) {
            return Some(false);
        }
    }
    None
}

/// Sets the top bit at position `bits - 1` and the bottom (odd) bit,
/// masking away any excess high bits so the buffer represents exactly
/// a `bits`-bit value. `buf` must be big-endian with
/// `buf.len() == ceil(bits / 8)`.
fn mask_and_set_bits(buf: &mut [u8], bits: usize) {
    let num_bytes = buf.len();
    let excess = num_bytes * 8 - bits;
    if excess > 0 {
        buf[0] &= 0xFFu8 >> excess;
    }
    let top_bit_pos = 7 - excess;
    buf[0] |= 1 << top_bit_pos;
    let last = num_bytes - 1;
    buf[last] |= 1;
}

/// `n - 1 = 2^s * d` with `d` odd.
fn decompose(n: &BigUint) -> (u64, BigUint) {
    let n_minus_one = n - BigUint::one();
    let mut s = 0u64;
    let mut d = n_minus_one;
    while d.is_even() {
        d >>= 1u32;
        s += 1;
    }
    (s, d)
}

/// Single Miller–Rabin witness round against base `a`. `n` must be odd
/// and `> 3`.
fn miller_rabin_witness(n: &BigUint, a: &BigUint, s: u64, d: &BigUint) -> bool {
    let n_minus_one = n - BigUint::one();
    let mut x = a.modpow(d, n);
    if x == BigUint::one() || x == n_minus_one {
        return true;
    }
    for _ in 1..s {
        x = x.modpow(&BigUint::from(2u32), n);
        if x == n_minus_one {
            return true;
        }
    }
    false
}

/// Miller–Rabin with witnesses drawn from `rng`. `rounds` rounds,
/// `false` on the first composite witness (the test is only ever
/// wrong in the "probably prime" direction).
pub fn is_probably_prime<R: Rng>(n: &BigUint, rounds: usize, rng: &mut R) -> bool {
    if *n < BigUint::from(2u32) {
        return false;
    }
    if *n == BigUint::from(2u32) || *n == BigUint::from(3u32) {
        return true;
    }
    if n.is_even() {
        return false;
    }
    match trial_division(n) {
        Some(true) => return true,
        Some(false) => return false,
        None => {}
    }
    let (s, d) = decompose(n);
    let n_minus_three = n - BigUint::from(3u32);
    for _ in 0..rounds {
        let a = rng.gen_biguint_below(&n_minus_three) + BigUint::from(2u32);
        if !miller_rabin_witness(n, &a, s, &d) {
            return false;
        }
    }
    true
}

/// Fully deterministic Miller–Rabin: witnesses are derived from
/// `SHA-256(n_bytes || round_index)` rather than external randomness,
/// so `hash_to_prime` never needs an RNG to decide primality.
pub fn is_probably_prime_deterministic(n: &BigUint, rounds: usize) -> bool {
    if *n < BigUint::from(2u32) {
        return false;
    }
    if *n == BigUint::from(2u32) || *n == BigUint::from(3u32) {
        return true;
    }
    if n.is_even() {
        return false;
    }
    match trial_division(n) {
        Some(true) => return true,
        Some(false) => return false,
        None => {}
    }
    let (s, d) = decompose(n);
    let n_minus_three = n - BigUint::from(3u32);
    let n_bytes = n.to_bytes_be();
    for round in 0..rounds as u64 {
        let mut hasher = Sha256::new();
        hasher.update(&n_bytes);
        hasher.update(b"mr-witness");
        hasher.update(&round.to_be_bytes());
        let digest = hasher.finalize();
        let raw = BigUint::from_bytes_be(&digest);
        let a = raw.mod_floor(&n_minus_three) + BigUint::from(2u32);
        if !miller_rabin_witness(n, &a, s, &d) {
            return false;
        }
    }
    true
}

/// Samples a uniformly random `bits`-bit odd integer with top and
/// bottom bits set, trial-divides, then Miller–Rabin tests with
/// `rounds` rounds; repeats up to `PRIME_RETRY_CAP` times.
pub fn generate_prime<R: Rng>(rng: &mut R, bits: usize, rounds: usize) -> Result<BigUint> {
    if bits < 2 {
        return Err(SighaError::InvalidArgument(
            "prime bit length must be >= 2".into(),
        ));
    }
    let num_bytes = (bits + 7) / 8;
    for _ in 0..PRIME_RETRY_CAP {
        let mut buf = vec![0u8; num_bytes];
        rng.fill_bytes(&mut buf);
        mask_and_set_bits(&mut buf, bits);
        let candidate = BigUint::from_bytes_be(&buf);
        if is_probably_prime(&candidate, rounds, rng) {
            return Ok(candidate);
        }
    }
    Err(SighaError::WeakParameters(format!(
        "failed to find a {}-bit prime within {} attempts",
        bits, PRIME_RETRY_CAP
    )))
}

/// Searches for a safe prime `p` (`(p-1)/2` also prime), returning
/// `(p, (p-1)/2)`. Bounded by `PRIME_RETRY_CAP` attempts.
pub fn generate_safe_prime<R: Rng>(
    rng: &mut R,
    bits: usize,
    rounds: usize,
) -> Result<(BigUint, BigUint)> {
    for _ in 0..PRIME_RETRY_CAP {
        let p = generate_prime(rng, bits, rounds)?;
        let sophie = (&p - BigUint::one()) >> 1u32;
        if is_probably_prime(&sophie, rounds, rng) {
            return Ok((p, sophie));
        }
    }
    Err(SighaError::WeakParameters(format!(
        "failed to find a {}-bit safe prime within {} attempts",
        bits, PRIME_RETRY_CAP
    )))
}

/// Deterministic identity → prime mapping. For the
/// same `(id_bytes, bits)` this always returns the same prime.
pub fn hash_to_prime(id_bytes: &[u8], bits: usize, rounds: usize) -> Result<BigUint> {
    if id_bytes.is_empty() {
        return Err(SighaError::InvalidArgument("empty agent id".into()));
    }
    if bits < 16 {
        return Err(SighaError::InvalidArgument(
            "hash_to_prime bit length must be >= 16".into(),
        ));
    }
    let base_seed = Sha256::digest(id_bytes);
    let num_bytes = (bits + 7) / 8;

    // Generous but bounded: expected iterations ~ ln(2^bits)/2, this
    // cap is many standard deviations above that.
    const MAX_COUNTER: u64 = 1_000_000;
    for counter in 0..MAX_COUNTER {
        let mut buf = Vec::with_capacity(num_bytes);
        let mut block: u64 = 0;
        while buf.len() < num_bytes {
            let mut hasher = Sha256::new();
            hasher.update(&base_seed);
            hasher.update(b"ctr");
            hasher.update(&counter.to_be_bytes());
            hasher.update(b"blk");
            hasher.update(&block.to_be_bytes());
            buf.extend_from_slice(&hasher.finalize());
            block += 1;
        }
        buf.truncate(num_bytes);
        mask_and_set_bits(&mut buf, bits);
        let candidate = BigUint::from_bytes_be(&buf);
        if is_probably_prime_deterministic(&candidate, rounds) {
            return Ok(candidate);
        }
    }
    Err(SighaError::WeakParameters(format!(
        "hash_to_prime did not converge for a {}-bit prime within {} regenerations",
        bits, MAX_COUNTER
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaChaRng;

    #[test]
    fn small_primes_are_actually_prime() {
        let known_composite_free = small_primes();
        assert_eq!(known_composite_free[0], 2);
        assert_eq!(known_composite_free[1], 3);
        assert_eq!(known_composite_free[2], 5);
        assert_eq!(known_composite_free.len(), SMALL_PRIME_COUNT);
    }

    #[test]
    fn generate_prime_is_prime_and_sized() {
        let rng = &mut ChaChaRng::from_seed([7u8; 32]);
        for _ in 0..5 {
            let p = generate_prime(rng, 256, 40).unwrap();
            assert!(is_probably_prime(&p, 64, rng));
            assert!(p.bits() as usize <= 256 && p.bits() as usize >= 249);
            assert!(p.is_odd(), "must be odd");
        }
    }

    #[test]
    fn hash_to_prime_is_deterministic() {
        let p1 = hash_to_prime(b"alice", 128, 40).unwrap();
        let p2 = hash_to_prime(b"alice", 128, 40).unwrap();
        assert_eq!(p1, p2);
        assert!(is_probably_prime_deterministic(&p1, 64));
    }

    #[test]
    fn hash_to_prime_distinguishes_ids() {
        let p_alice = hash_to_prime(b"alice", 128, 40).unwrap();
        let p_bob = hash_to_prime(b"bob", 128, 40).unwrap();
        assert_ne!(p_alice, p_bob);
    }

    #[test]
    fn hash_to_prime_rejects_empty_id() {
        assert!(hash_to_prime(b"", 128, 40).is_err());
    }

    #[test]
    fn safe_prime_search() {
        let rng = &mut ChaChaRng::from_seed([9u8; 32]);
        let (p, q) = generate_safe_prime(rng, 128, 40).unwrap();
        assert!(is_probably_prime(&p, 64, rng));
        assert!(is_probably_prime(&q, 64, rng));
        assert_eq!((&p - BigUint::one()) >> 1u32, q);
    }
}
