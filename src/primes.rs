//! Prime table sizing.
//!
//! Bucket counts are primes so that `hash % len` spreads keys whose hashes
//! share low bits. Growth roughly doubles the table and then rounds up to
//! the next prime from a precomputed ladder.

use crate::error::{MapError, Result};

/// Largest table length the map will allocate.
pub const MAX_PRIME_ARRAY_LENGTH: usize = 0x7FEF_FFFD;

/// Candidates `p` with `(p - 1) % HASH_PRIME == 0` are skipped when
/// searching past the end of [`PRIMES`].
pub const HASH_PRIME: usize = 101;

/// Ascending ladder of table sizes, each roughly 1.2x the previous, ending
/// at [`MAX_PRIME_ARRAY_LENGTH`].
pub const PRIMES: &[usize] = &[
    3, 7, 11, 17, 23, 29, 37, 47, 59, 71, 89, 107, 131, 163, 197, 239, 293, 353, 431, 521, 631,
    761, 919, 1103, 1327, 1597, 1931, 2333, 2801, 3371, 4049, 4861, 5839, 7013, 8419, 10103,
    12143, 14591, 17519, 21023, 25229, 30293, 36353, 43627, 52361, 62851, 75431, 90523, 108631,
    130363, 156437, 187751, 225307, 270371, 324449, 389357, 467237, 560689, 672827, 807403,
    968897, 1162687, 1395263, 1674319, 2009191, 2411033, 2893249, 3471899, 4166287, 4999559,
    5999471, 7199369, 8639249, 10367101, 12440537, 14928671, 17914409, 21497293, 25796759,
    30956117, 37147349, 44576837, 53492207, 64190669, 77028803, 92434613, 110921543, 133105859,
    159727031, 191672443, 230006941, 276008387, 331210079, 397452101, 476942527, 572331049,
    686797261, 824156741, 988988137, 1186785773, 1424142949, 1708971541, 2050765853,
    MAX_PRIME_ARRAY_LENGTH,
];

/// Trial division by odd divisors up to `sqrt(candidate)`.
pub fn is_prime(candidate: usize) -> bool {
    if candidate & 1 == 0 {
        return candidate == 2;
    }
    if candidate < 3 {
        return false;
    }
    let mut divisor = 3usize;
    while divisor <= candidate / divisor {
        if candidate % divisor == 0 {
            return false;
        }
        divisor += 2;
    }
    true
}

/// Smallest table prime, used for a map created with capacity 0.
#[inline]
pub fn min_prime() -> usize {
    PRIMES[0]
}

/// First usable prime `>= min`.
pub fn get_prime(min: usize) -> Result<usize> {
    if min > MAX_PRIME_ARRAY_LENGTH {
        return Err(MapError::CapacityOverflow { requested: min });
    }
    match PRIMES.iter().find(|&&p| p >= min) {
        Some(&p) => Ok(p),
        None => Ok(search_prime(min)),
    }
}

/// Odd-candidate search for the first prime `>= min`, skipping the
/// `HASH_PRIME` residue class and capped at [`MAX_PRIME_ARRAY_LENGTH`].
///
/// `get_prime` only reaches this if the ladder does not cover `min`.
pub fn search_prime(min: usize) -> usize {
    let mut candidate = min | 1;
    while candidate < MAX_PRIME_ARRAY_LENGTH {
        if is_prime(candidate) && (candidate - 1) % HASH_PRIME != 0 {
            return candidate;
        }
        candidate += 2;
    }
    MAX_PRIME_ARRAY_LENGTH
}

/// Table length to grow to from a table holding `old_size` slots.
pub fn expand_prime(old_size: usize) -> Result<usize> {
    if old_size >= MAX_PRIME_ARRAY_LENGTH {
        return Err(MapError::CapacityOverflow {
            requested: old_size.saturating_add(1),
        });
    }
    let new_size = old_size.saturating_mul(2);
    if new_size > MAX_PRIME_ARRAY_LENGTH {
        return Ok(MAX_PRIME_ARRAY_LENGTH);
    }
    get_prime(new_size)
}
