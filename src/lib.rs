// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Paillier cryptosystem over real numbers
//!
//! Additively homomorphic public-key encryption of signed reals, based on
//! the hardness of the decisional composite residuosity problem in
//! (ℤ/n²ℤ)*.
//!
//! Reference: [Paillier (1999), EUROCRYPT](https://link.springer.com/chapter/10.1007/3-540-48910-X_16)
//!
//! The textbook scheme encrypts integers modulo `n`. This crate layers a
//! fixed-base floating-point encoding on top: a signed real becomes an
//! integer mantissa together with a base-16 exponent, ciphertexts carry the
//! exponent alongside, and the homomorphic operations align operand
//! exponents before combining. Adding two encrypted reals or scaling one by
//! a plaintext scalar therefore behaves like ordinary floating-point
//! arithmetic, up to the round-off of the encoding itself.
//!
//! ## Security
//!
//! A ciphertext is only semantically secure once a fresh blinding factor
//! has been absorbed; [`EncryptedNumber::ciphertext`] with
//! `be_secure = true` guarantees this. The private key (p, q and the CRT
//! precomputations) is zeroized on drop via the `zeroize` crate and exposes
//! no `Debug` or `Display`. Plaintext magnitude and ciphertext exponent are
//! not hidden.

mod encoding;
mod encrypted;
mod error;
mod key;
mod util;

pub use encoding::*;
pub use encrypted::*;
pub use error::*;
pub use key::*;
