// SPDX-License-Identifier: MIT OR Apache-2.0

use num_bigint_dig::{BigInt, BigUint, ModInverse, RandBigInt, RandPrime};
use num_traits::{One, Signed};
use rand::rngs::OsRng;

/// L(x) = (x - 1) / p
///
/// This function appears in the decryption algorithm. The division is exact
/// because callers guarantee x ≡ 1 (mod p).
#[inline]
pub(crate) fn l_function(x: &BigUint, p: &BigUint) -> BigUint {
    (x - BigUint::one()) / p
}

/// Modular inverse of `a` modulo `m`, if it exists.
pub(crate) fn inv_mod(a: &BigUint, m: &BigUint) -> Option<BigUint> {
    let inv = a.clone().mod_inverse(m)?;
    let inv = if inv.is_negative() {
        inv + BigInt::from(m.clone())
    } else {
        inv
    };
    inv.to_biguint()
}

/// Uniform draw from [1, n).
pub(crate) fn random_below(n: &BigUint) -> BigUint {
    let mut rng = OsRng;
    rng.gen_biguint_range(&BigUint::one(), n)
}

/// Probable prime of exactly `bits` bits (Miller-Rabin, via the prime
/// module of `num-bigint-dig`).
pub(crate) fn generate_prime(bits: usize) -> BigUint {
    let mut rng = OsRng;
    rng.gen_prime(bits)
}
