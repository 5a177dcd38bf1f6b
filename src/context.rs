//! CryptoContext: modulus/generator/seed generation
//! and group-membership checks.

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::One;
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::error::{Result, SighaError};
use crate::primes;

/// Minimum bit length this crate permits for a context's modulus.
pub const MIN_BIT_LENGTH: usize = 256;

/// Default modulus bit length.
pub const DEFAULT_BIT_LENGTH: usize = 2048;

/// Default maximum depth before a snapshot fold is triggered.
pub const DEFAULT_MAX_DEPTH: u32 = 10;

/// Default bit length of registry primes.
pub const DEFAULT_PRIME_BITS: usize = 128;

/// Reduction width for `H_exp`, fixed at 256 bits.
pub const EXP_REDUCTION_BITS: u32 = 256;

/// Immutable cryptographic parameters shared by any number of
/// accumulators and scopes — there is no singleton, no hidden
/// global state.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CryptoContext {
    bit_length: usize,
    max_depth: u32,
    prime_bits: usize,
    m: BigUint,
    g: BigUint,
    t0: BigUint,
    /// Off by default. A context built with this on will not scrub the
    /// factorization from its `digest()` marker byte, making it visibly
    /// distinguishable from a production context.
    debug_retain_factors: bool,
}

impl CryptoContext {
    /// Generates `(p, q)`, `M = p*q`, `G`, `T0` fresh. `safe_primes`
    /// selects whether `p`, `q` are required to be safe primes
    /// (`(p-1)/2`, `(q-1)/2` prime too).
    pub fn new<R: Rng>(
        rng: &mut R,
        bit_length: usize,
        max_depth: u32,
        safe_primes: bool,
    ) -> Result<Self> {
        Self::new_with_prime_bits(
            rng,
            bit_length,
            max_depth,
            safe_primes,
            DEFAULT_PRIME_BITS,
            primes::DEFAULT_MR_ROUNDS,
        )
    }

    /// As `new`, with explicit registry prime bit length and
    /// Miller–Rabin round count (used by `config` env-var overrides).
    pub fn new_with_prime_bits<R: Rng>(
        rng: &mut R,
        bit_length: usize,
        max_depth: u32,
        safe_primes: bool,
        prime_bits: usize,
        mr_rounds: usize,
    ) -> Result<Self> {
        if bit_length < MIN_BIT_LENGTH || bit_length % 2 != 0 {
            return Err(SighaError::WeakParameters(format!(
                "bit_length must be an even integer >= {}, got {}",
                MIN_BIT_LENGTH, bit_length
            )));
        }
        if max_depth == 0 {
            return Err(SighaError::InvalidArgument(
                "max_depth must be positive".into(),
            ));
        }

        let half = bit_length / 2;
        log::debug!("generating {}-bit modulus (safe_primes={})", bit_length, safe_primes);
        let (p, q) = if safe_primes {
            let (p, _) = primes::generate_safe_prime(rng, half, mr_rounds)?;
            let (q, _) = primes::generate_safe_prime(rng, half, mr_rounds)?;
            (p, q)
        } else {
            let p = primes::generate_prime(rng, half, mr_rounds)?;
            let q = primes::generate_prime(rng, half, mr_rounds)?;
            (p, q)
        };
        let m = &p * &q;

        let g = Self::random_qr(rng, &m)?;
        let t0 = Self::random_qr(rng, &m)?;

        Ok(CryptoContext {
            bit_length,
            max_depth,
            prime_bits,
            m,
            g,
            t0,
            debug_retain_factors: false,
        })
    }

    /// Reconstructs a context from previously-serialized parts (the
    /// deserialization path), re-validating every
    /// invariant. Used by `set_state`'s callers and by the wire codec.
    pub fn from_parts(
        bit_length: usize,
        max_depth: u32,
        prime_bits: usize,
        m: BigUint,
        g: BigUint,
        t0: BigUint,
    ) -> Result<Self> {
        if bit_length < MIN_BIT_LENGTH || bit_length % 2 != 0 {
            return Err(SighaError::WeakParameters(format!(
                "bit_length must be an even integer >= {}, got {}",
                MIN_BIT_LENGTH, bit_length
            )));
        }
        if max_depth == 0 {
            return Err(SighaError::InvalidArgument(
                "max_depth must be positive".into(),
            ));
        }
        let ctx = CryptoContext {
            bit_length,
            max_depth,
            prime_bits,
            m,
            g,
            t0,
            debug_retain_factors: false,
        };
        // QR-ness of G and T0 is not independently checkable here: without
        // p and q (scrubbed by a production context) there is no test for
        // "is a square mod M" beyond group membership itself. The QR
        // property holds by construction for a freshly-generated context
        // (`random_qr` squares a sampled element); a deserialized context
        // is trusted to have come from one, not re-verified.
        if !ctx.verify_in_group(&ctx.g) {
            return Err(SighaError::WeakParameters("G fails group membership".into()));
        }
        if !ctx.verify_in_group(&ctx.t0) {
            return Err(SighaError::WeakParameters("T0 fails group membership".into()));
        }
        Ok(ctx)
    }

    /// Samples a random element of `Z_M*` and squares it, rejecting the
    /// trivial cases `0, 1, M-1`.
    fn random_qr<R: Rng>(rng: &mut R, m: &BigUint) -> Result<BigUint> {
        let one = BigUint::one();
        let m_minus_one = m - &one;
        for _ in 0..primes::PRIME_RETRY_CAP {
            let candidate = crate::bigint::random_below(rng, m)?;
            if candidate <= one || candidate >= m_minus_one {
                continue;
            }
            if candidate.gcd(m) != one {
                continue;
            }
            let squared = candidate.modpow(&BigUint::from(2u32), m);
            if squared <= one || squared >= m_minus_one {
                continue;
            }
            return Ok(squared);
        }
        Err(SighaError::WeakParameters(
            "failed to sample a quadratic residue in Z_M*".into(),
        ))
    }

    /// `1 < x < M` and `gcd(x, M) = 1`.
    pub fn verify_in_group(&self, x: &BigUint) -> bool {
        x > &BigUint::one() && x < &self.m && x.gcd(&self.m) == BigUint::one()
    }

    pub fn bit_length(&self) -> usize {
        self.bit_length
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    pub fn prime_bits(&self) -> usize {
        self.prime_bits
    }

    pub fn modulus(&self) -> &BigUint {
        &self.m
    }

    pub fn generator(&self) -> &BigUint {
        &self.g
    }

    pub fn seed(&self) -> &BigUint {
        &self.t0
    }

    pub fn debug_retain_factors(&self) -> bool {
        self.debug_retain_factors
    }

    /// Testing-only constructor that marks the context as having kept
    /// its factorization around; visible in `digest()`. Never call
    /// this in production code.
    #[doc(hidden)]
    pub fn with_debug_retain_factors(mut self, retain: bool) -> Self {
        self.debug_retain_factors = retain;
        self
    }

    /// 32-byte canonical hash over `(bit_length, M, G, T0,
    /// EXP_REDUCTION_BITS, debug_retain_factors)`. Deliberately excludes
    /// `max_depth` and `prime_bits` — neither is part of the group
    /// parameters this digest anchors, and `prime_bits` isn't even
    /// carried across the wire (see `serialize`).
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(b"sigha-context-v1");
        hasher.update(&(self.bit_length as u64).to_be_bytes());
        hasher.update(&EXP_REDUCTION_BITS.to_be_bytes());
        hasher.update(&[self.debug_retain_factors as u8]);
        hasher.update(crate::bigint::to_decimal(&self.m).as_bytes());
        hasher.update(crate::bigint::to_decimal(&self.g).as_bytes());
        hasher.update(crate::bigint::to_decimal(&self.t0).as_bytes());
        let out = hasher.finalize();
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&out);
        digest
    }

    /// `H_exp(d) = SHA-256(context_digest || "depth:" || decimal(d)) mod 2^256`.
    pub fn h_exp(&self, depth: u64) -> BigUint {
        let mut hasher = Sha256::new();
        hasher.update(self.digest());
        hasher.update(b"depth:");
        hasher.update(depth.to_string().as_bytes());
        let out = hasher.finalize();
        BigUint::from_bytes_be(&out)
    }
}
