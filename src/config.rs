//! Environment-driven overrides. Each resolver falls back
//! to the caller-supplied default when the variable is unset or fails
//! to parse; a malformed value is logged and ignored rather than
//! treated as a hard error, since these only ever affect the strength
//! of freshly-generated parameters, never already-serialized state.

const MR_ROUNDS_VAR: &str = "SIGHA_MR_ROUNDS";
const SAFE_PRIMES_VAR: &str = "SIGHA_SAFE_PRIMES";

/// Minimum accepted `SIGHA_MR_ROUNDS` value.
pub const MIN_MR_ROUNDS: usize = 16;

/// Resolves the Miller–Rabin round count: `SIGHA_MR_ROUNDS` if set to
/// an integer `>= 16`, otherwise `default_rounds`.
pub fn mr_rounds(default_rounds: usize) -> usize {
    match std::env::var(MR_ROUNDS_VAR) {
        Ok(val) => match val.parse::<usize>() {
            Ok(n) if n >= MIN_MR_ROUNDS => n,
            Ok(n) => {
                log::warn!(
                    "{}={} is below the minimum of {}, using default {}",
                    MR_ROUNDS_VAR,
                    n,
                    MIN_MR_ROUNDS,
                    default_rounds
                );
                default_rounds
            }
            Err(_) => {
                log::warn!("{}={:?} is not an integer, using default {}", MR_ROUNDS_VAR, val, default_rounds);
                default_rounds
            }
        },
        Err(_) => default_rounds,
    }
}

/// Resolves whether modulus generation should force safe primes:
/// `SIGHA_SAFE_PRIMES=1` forces it on; any other value, or unset,
/// falls back to `default_safe_primes`.
pub fn safe_primes(default_safe_primes: bool) -> bool {
    match std::env::var(SAFE_PRIMES_VAR) {
        Ok(val) if val == "1" => true,
        Ok(_) | Err(_) => default_safe_primes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // `std::env` is process-global, so these run as one test to avoid
    // racing with each other under the default parallel test runner.
    #[test]
    fn env_var_resolution() {
        std::env::remove_var(MR_ROUNDS_VAR);
        std::env::remove_var(SAFE_PRIMES_VAR);
        assert_eq!(mr_rounds(40), 40);
        assert_eq!(safe_primes(false), false);

        std::env::set_var(MR_ROUNDS_VAR, "4");
        assert_eq!(mr_rounds(40), 40);

        std::env::set_var(MR_ROUNDS_VAR, "64");
        assert_eq!(mr_rounds(40), 64);
        std::env::remove_var(MR_ROUNDS_VAR);

        std::env::set_var(SAFE_PRIMES_VAR, "1");
        assert!(safe_primes(false));
        std::env::remove_var(SAFE_PRIMES_VAR);
    }
}
