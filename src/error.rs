// SPDX-License-Identifier: MIT OR Apache-2.0

/// Errors that can occur during encoding, key handling, or homomorphic
/// operations.
///
/// All failures are fatal to the operation that raised them; nothing is
/// retried or repaired internally.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The integer mantissa of an encoded value exceeds the signed
    /// plaintext envelope of the public key.
    #[error("plaintext exceeds the maximum encodable magnitude")]
    PlaintextTooLarge,

    /// A scalar passed to ciphertext multiplication is not a valid field
    /// element of the key.
    #[error("scalar for ciphertext multiplication is out of bounds")]
    ScalarOutOfBounds,

    /// An encoding or ciphertext is not a valid element of its group.
    #[error("encoding is corrupted")]
    CorruptedEncoding,

    /// A decoded mantissa fell into the forbidden middle band between the
    /// positive and negative envelopes. The homomorphic accumulator
    /// exceeded its safe range and the result is unrecoverable.
    #[error("overflow detected in decoded number")]
    Overflow,

    /// Two values encrypted or encoded against different public keys were
    /// combined.
    #[error("values belong to different public keys")]
    KeyMismatch,

    /// Exponent rescaling is decrease-only; raising would lose precision.
    #[error("cannot raise exponent from {current} to {requested}")]
    ExponentRaise { current: i64, requested: i64 },

    /// Key construction or generation was handed unusable parameters.
    #[error("invalid key parameters: {0}")]
    InvalidKeyParameters(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
