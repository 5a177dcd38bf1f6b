//! Thin wrappers over the `num-bigint-dig` backend: canonical decimal
//! (and hex) codec for the wire boundary, and the handful of checked
//! operations the rest of the crate needs (`pow_mod`, `gcd`, fair
//! sampling). Everything else just calls straight through to
//! `BigUint`/`BigInt` methods — there is no value in re-wrapping an
//! already-correct arbitrary-precision backend.

use num_bigint::{BigUint, RandBigInt};
use num_integer::Integer;
use rand::Rng;

use crate::error::{Result, SighaError};

/// Canonical decimal form: no leading zeros, `"0"` is its own
/// canonical form.
pub fn to_decimal(x: &BigUint) -> String {
    x.to_str_radix(10)
}

/// Parses a canonical decimal string, or a `0x`/`0X`-prefixed hex
/// string per the wire format's import leniency. Rejects empty
/// strings, a leading `-`, non-digit characters, and non-canonical
/// leading zeros (`"0"` itself is accepted).
pub fn from_decimal(s: &str) -> Result<BigUint> {
    if s.is_empty() {
        return Err(SighaError::InvalidArgument("empty bigint string".into()));
    }
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return BigUint::parse_bytes(hex.as_bytes(), 16)
            .ok_or_else(|| SighaError::InvalidArgument(format!("not valid hex: {}", s)));
    }
    if s.starts_with('-') {
        return Err(SighaError::InvalidArgument(format!(
            "negative value not permitted: {}",
            s
        )));
    }
    if s != "0" && s.starts_with('0') {
        return Err(SighaError::InvalidArgument(format!(
            "non-canonical leading zero: {}",
            s
        )));
    }
    BigUint::parse_bytes(s.as_bytes(), 10)
        .ok_or_else(|| SighaError::InvalidArgument(format!("not a valid decimal integer: {}", s)))
}

/// `(base^exp) mod modulus`, rejecting a zero modulus.
pub fn pow_mod(base: &BigUint, exp: &BigUint, modulus: &BigUint) -> Result<BigUint> {
    if modulus.is_zero() {
        return Err(SighaError::InvalidArgument("zero modulus".into()));
    }
    Ok(base.modpow(exp, modulus))
}

/// `gcd(a, b)`, rejecting a zero second argument (a zero modulus in
/// every call site that matters here).
pub fn gcd(a: &BigUint, b: &BigUint) -> Result<BigUint> {
    if b.is_zero() {
        return Err(SighaError::InvalidArgument("zero modulus".into()));
    }
    Ok(a.gcd(b))
}

/// Fair, uniform sample in `[0, n)`.
pub fn random_below<R: Rng>(rng: &mut R, n: &BigUint) -> Result<BigUint> {
    if n.is_zero() {
        return Err(SighaError::InvalidArgument("zero bound".into()));
    }
    Ok(rng.gen_biguint_below(n))
}

use num_traits::Zero;

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::FromPrimitive;

    #[test]
    fn decimal_round_trip() {
        let x = BigUint::from_u64(123_456_789).unwrap();
        let s = to_decimal(&x);
        assert_eq!(s, "123456789");
        assert_eq!(from_decimal(&s).unwrap(), x);
    }

    #[test]
    fn decimal_zero_is_canonical() {
        assert_eq!(from_decimal("0").unwrap(), BigUint::zero());
        assert!(from_decimal("00").is_err());
        assert!(from_decimal("").is_err());
        assert!(from_decimal("-1").is_err());
    }

    #[test]
    fn hex_import() {
        let x = from_decimal("0xff").unwrap();
        assert_eq!(x, BigUint::from_u64(255).unwrap());
    }

    #[test]
    fn pow_mod_rejects_zero_modulus() {
        let one = BigUint::from_u64(1).unwrap();
        assert!(pow_mod(&one, &one, &BigUint::zero()).is_err());
    }
}
