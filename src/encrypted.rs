// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;

use num_bigint_dig::BigUint;
use num_traits::One;

use crate::encoding::{base_pow, EncodedNumber, Scalar};
use crate::error::{Error, Result};
use crate::key::PublicKey;
use crate::util;

/// A Paillier ciphertext in `[0, n²)` carrying the base-16 exponent of the
/// plaintext it encrypts.
///
/// The type is an immutable value: every homomorphic operation and
/// [`obfuscate`](Self::obfuscate) return a fresh instance, so instances can
/// be shared freely across threads. `obfuscated` records whether a fresh
/// blinding factor has been absorbed since creation; operation results are
/// never marked obfuscated because one operand may have been deterministic.
#[derive(Debug, Clone)]
pub struct EncryptedNumber<'pk> {
    public_key: &'pk PublicKey,
    ciphertext: BigUint,
    exponent: i64,
    obfuscated: bool,
}

/// The right-hand side of [`EncryptedNumber::add`].
#[derive(Debug, Clone, Copy)]
pub enum Addend<'a, 'b> {
    Encrypted(&'a EncryptedNumber<'b>),
    Encoded(&'a EncodedNumber<'b>),
    Scalar(Scalar),
}

/// The right-hand side of [`EncryptedNumber::mul`]. Multiplying two
/// ciphertexts is not possible; the scheme is only additively homomorphic.
#[derive(Debug, Clone, Copy)]
pub enum Multiplicand<'a, 'b> {
    Encoded(&'a EncodedNumber<'b>),
    Scalar(Scalar),
}

impl<'pk> EncryptedNumber<'pk> {
    pub(crate) fn new(public_key: &'pk PublicKey, ciphertext: BigUint, exponent: i64) -> Self {
        Self {
            public_key,
            ciphertext,
            exponent,
            obfuscated: false,
        }
    }

    /// Return the ciphertext as a big integer.
    ///
    /// With `be_secure` set, a ciphertext that has not absorbed a fresh
    /// blinding factor is blinded on the fly, so the returned value is
    /// always safe to release. The receiver itself is left untouched; use
    /// [`obfuscate`](Self::obfuscate) to keep the blinded instance.
    pub fn ciphertext(&self, be_secure: bool) -> BigUint {
        if be_secure && !self.obfuscated {
            self.obfuscate().ciphertext
        } else {
            self.ciphertext.clone()
        }
    }

    /// The base-16 exponent of the encrypted plaintext.
    #[inline]
    pub fn exponent(&self) -> i64 {
        self.exponent
    }

    #[inline]
    pub fn public_key(&self) -> &'pk PublicKey {
        self.public_key
    }

    /// Whether a fresh blinding factor has been absorbed since creation.
    #[inline]
    pub fn is_obfuscated(&self) -> bool {
        self.obfuscated
    }

    /// Absorb a fresh blinding factor `r^n mod n²`.
    ///
    /// The represented plaintext is unchanged; the ciphertext becomes
    /// statistically independent of the inputs that produced it. Safe to
    /// apply any number of times.
    pub fn obfuscate(&self) -> EncryptedNumber<'pk> {
        let pk = self.public_key;
        let r = util::random_below(&pk.n);
        let blinder = r.modpow(&pk.n, &pk.nsquare);
        EncryptedNumber {
            public_key: pk,
            ciphertext: &self.ciphertext * blinder % &pk.nsquare,
            exponent: self.exponent,
            obfuscated: true,
        }
    }

    /// Rescale to a smaller exponent without changing the plaintext.
    ///
    /// The homomorphism turns the plaintext multiplication by
    /// `BASE^(exponent − new_exp)` into a ciphertext exponentiation. The
    /// factor is produced as an exact big integer; it never passes through
    /// a float.
    pub fn decrease_exponent_to(&self, new_exp: i64) -> Result<EncryptedNumber<'pk>> {
        if new_exp > self.exponent {
            return Err(Error::ExponentRaise {
                current: self.exponent,
                requested: new_exp,
            });
        }
        let factor = base_pow(self.exponent - new_exp);
        let ciphertext = self.raw_mul(&factor)?;
        Ok(EncryptedNumber::new(self.public_key, ciphertext, new_exp))
    }

    /// Homomorphic addition of another encrypted number, an encoded
    /// plaintext, or a raw scalar.
    ///
    /// The operand with the higher exponent is rescaled down so both sides
    /// share the lower one; the result carries that exponent.
    pub fn add<'a, 'b: 'a>(&self, addend: impl Into<Addend<'a, 'b>>) -> Result<EncryptedNumber<'pk>> {
        match addend.into() {
            Addend::Encrypted(other) => self.add_encrypted(other),
            Addend::Encoded(encoded) => self.add_encoded(encoded),
            Addend::Scalar(scalar) => self.add_scalar(scalar),
        }
    }

    /// Homomorphic multiplication by an encoded plaintext or a raw scalar.
    ///
    /// The result exponent is the sum of the operand exponents.
    pub fn mul<'a, 'b: 'a>(
        &self,
        multiplicand: impl Into<Multiplicand<'a, 'b>>,
    ) -> Result<EncryptedNumber<'pk>> {
        match multiplicand.into() {
            Multiplicand::Encoded(encoded) => self.mul_encoded(encoded),
            Multiplicand::Scalar(scalar) => {
                let encoded = EncodedNumber::encode(self.public_key, scalar, None, None)?;
                self.mul_encoded(&encoded)
            }
        }
    }

    fn add_encrypted(&self, other: &EncryptedNumber<'_>) -> Result<EncryptedNumber<'pk>> {
        if self.public_key != other.public_key {
            return Err(Error::KeyMismatch);
        }

        let (a, b, exponent) = if self.exponent > other.exponent {
            let aligned = self.decrease_exponent_to(other.exponent)?;
            (aligned.ciphertext, other.ciphertext.clone(), other.exponent)
        } else if self.exponent < other.exponent {
            let aligned = other.decrease_exponent_to(self.exponent)?;
            (self.ciphertext.clone(), aligned.ciphertext, self.exponent)
        } else {
            (self.ciphertext.clone(), other.ciphertext.clone(), self.exponent)
        };

        let sum = self.raw_add(&a, &b);
        Ok(EncryptedNumber::new(self.public_key, sum, exponent))
    }

    fn add_encoded(&self, encoded: &EncodedNumber<'_>) -> Result<EncryptedNumber<'pk>> {
        if self.public_key != encoded.public_key() {
            return Err(Error::KeyMismatch);
        }

        let (cipher, scalar_encoding, exponent) = if self.exponent > encoded.exponent() {
            let aligned = self.decrease_exponent_to(encoded.exponent())?;
            (aligned.ciphertext, encoded.encoding().clone(), encoded.exponent())
        } else if self.exponent < encoded.exponent() {
            let aligned = encoded.decrease_exponent_to(self.exponent)?;
            (self.ciphertext.clone(), aligned.encoding().clone(), self.exponent)
        } else {
            (self.ciphertext.clone(), encoded.encoding().clone(), self.exponent)
        };

        // Deterministic encryption with r = 1; the blinding of the result
        // is inherited from the encrypted operand.
        let encrypted_scalar = self
            .public_key
            .raw_encrypt(&scalar_encoding, Some(&BigUint::one()))?;
        let sum = self.raw_add(&cipher, &encrypted_scalar);
        Ok(EncryptedNumber::new(self.public_key, sum, exponent))
    }

    fn add_scalar(&self, scalar: Scalar) -> Result<EncryptedNumber<'pk>> {
        // Cap the scalar's encoding exponent at our own so the alignment
        // never has to rescale the encoded side upward.
        let encoded =
            EncodedNumber::encode(self.public_key, scalar, None, Some(self.exponent))?;
        self.add_encoded(&encoded)
    }

    fn mul_encoded(&self, encoded: &EncodedNumber<'_>) -> Result<EncryptedNumber<'pk>> {
        if self.public_key != encoded.public_key() {
            return Err(Error::KeyMismatch);
        }
        let product = self.raw_mul(encoded.encoding())?;
        Ok(EncryptedNumber::new(
            self.public_key,
            product,
            self.exponent + encoded.exponent(),
        ))
    }

    /// Ciphertext product, i.e. plaintext addition.
    fn raw_add(&self, a: &BigUint, b: &BigUint) -> BigUint {
        a * b % &self.public_key.nsquare
    }

    /// Ciphertext exponentiation by an integer plaintext in `[0, n)`,
    /// i.e. plaintext multiplication.
    ///
    /// Negative-band scalars exponentiate the inverted ciphertext by
    /// `n − scalar`, keeping the exponent magnitude within `max_int`;
    /// modular exponentiation cost is linear in exponent bit length.
    pub(crate) fn raw_mul(&self, plaintext: &BigUint) -> Result<BigUint> {
        let pk = self.public_key;
        if *plaintext >= pk.n {
            return Err(Error::ScalarOutOfBounds);
        }

        if *plaintext >= &pk.n - &pk.max_int {
            let inverted =
                util::inv_mod(&self.ciphertext, &pk.nsquare).ok_or(Error::CorruptedEncoding)?;
            let negated = &pk.n - plaintext;
            Ok(inverted.modpow(&negated, &pk.nsquare))
        } else {
            Ok(self.ciphertext.modpow(plaintext, &pk.nsquare))
        }
    }
}

impl<'a, 'b> From<&'a EncryptedNumber<'b>> for Addend<'a, 'b> {
    fn from(value: &'a EncryptedNumber<'b>) -> Self {
        Addend::Encrypted(value)
    }
}

impl<'a, 'b> From<&'a EncodedNumber<'b>> for Addend<'a, 'b> {
    fn from(value: &'a EncodedNumber<'b>) -> Self {
        Addend::Encoded(value)
    }
}

impl From<i64> for Addend<'_, '_> {
    fn from(value: i64) -> Self {
        Addend::Scalar(Scalar::Int(value))
    }
}

impl From<f64> for Addend<'_, '_> {
    fn from(value: f64) -> Self {
        Addend::Scalar(Scalar::Float(value))
    }
}

impl From<Scalar> for Addend<'_, '_> {
    fn from(value: Scalar) -> Self {
        Addend::Scalar(value)
    }
}

impl<'a, 'b> From<&'a EncodedNumber<'b>> for Multiplicand<'a, 'b> {
    fn from(value: &'a EncodedNumber<'b>) -> Self {
        Multiplicand::Encoded(value)
    }
}

impl From<i64> for Multiplicand<'_, '_> {
    fn from(value: i64) -> Self {
        Multiplicand::Scalar(Scalar::Int(value))
    }
}

impl From<f64> for Multiplicand<'_, '_> {
    fn from(value: f64) -> Self {
        Multiplicand::Scalar(Scalar::Float(value))
    }
}

impl From<Scalar> for Multiplicand<'_, '_> {
    fn from(value: Scalar) -> Self {
        Multiplicand::Scalar(value)
    }
}

impl fmt::Display for EncryptedNumber<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EncryptedNumber(exponent={}, obfuscated={})",
            self.exponent, self.obfuscated
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{generate_keypair, keypair_from_primes, PrivateKey, PublicKey};

    fn stable_keypair() -> (PublicKey, PrivateKey) {
        let p = BigUint::from(3778961023u64);
        let q = BigUint::from(3870727277u64);
        keypair_from_primes(p, q).unwrap()
    }

    fn other_keypair() -> (PublicKey, PrivateKey) {
        let p = BigUint::from(4294967291u64);
        let q = BigUint::from(4294967279u64);
        keypair_from_primes(p, q).unwrap()
    }

    #[test]
    fn encrypt_then_decrypt() {
        let (public, private) = stable_keypair();
        let number = public.encrypt(102.3, None, None).unwrap();
        assert!(number.is_obfuscated());
        assert_eq!(private.decrypt(&number).unwrap(), 102.3);
    }

    #[test]
    fn add_scalar_matches_plaintext_sum() {
        let (public, private) = stable_keypair();
        let y = public.encrypt(102.3, None, None).unwrap();
        let z = y.add(100.3).unwrap();
        assert!(!z.is_obfuscated());
        assert_eq!(
            private.decrypt(&z).unwrap(),
            private.decrypt(&y).unwrap() + 100.3,
        );
    }

    #[test]
    fn add_encrypted_pair() {
        let (public, private) = stable_keypair();
        let a = public.encrypt(1.5, None, None).unwrap();
        let b = public.encrypt(2.25, None, None).unwrap();
        let sum = a.add(&b).unwrap();
        assert_eq!(private.decrypt(&sum).unwrap(), 3.75);
    }

    #[test]
    fn add_encoded_aligns_exponents() {
        let (public, private) = stable_keypair();
        let y = public.encrypt(10.5, None, None).unwrap();
        let encoded = EncodedNumber::encode(&public, 0.25, None, None).unwrap();
        let sum = y.add(&encoded).unwrap();
        assert_eq!(sum.exponent(), y.exponent().min(encoded.exponent()));
        assert_eq!(private.decrypt(&sum).unwrap(), 10.75);
    }

    #[test]
    fn add_integer_scalar_keeps_exponent() {
        let (public, private) = stable_keypair();
        let y = public.encrypt(102.3, None, None).unwrap();
        let z = y.add(100i64).unwrap();
        // The integer encodes at exponent 0 and is capped down to ours.
        assert_eq!(z.exponent(), y.exponent());
        assert_eq!(private.decrypt(&z).unwrap(), 102.3 + 100.0);
    }

    #[test]
    fn decrease_exponent_preserves_plaintext() {
        let (public, private) = stable_keypair();
        let z = public.encrypt(102.3, None, None).unwrap();
        let z2 = z.decrease_exponent_to(z.exponent() - 1).unwrap();
        assert_eq!(z2.exponent(), z.exponent() - 1);
        assert_eq!(private.decrypt(&z).unwrap(), 102.3);
        assert_eq!(private.decrypt(&z2).unwrap(), 102.3);
    }

    #[test]
    fn decrease_exponent_rejects_raise() {
        let (public, _) = stable_keypair();
        let z = public.encrypt(102.3, None, None).unwrap();
        assert!(matches!(
            z.decrease_exponent_to(z.exponent() + 1),
            Err(Error::ExponentRaise { .. }),
        ));
    }

    #[test]
    fn mul_by_float_scalar() {
        let (public, private) = generate_keypair(1024).unwrap();
        let z = public.encrypt(102.3, None, None).unwrap();
        let w = z.mul(102.3).unwrap();
        let factor_exp = EncodedNumber::encode(&public, 102.3, None, None)
            .unwrap()
            .exponent();
        assert_eq!(w.exponent(), z.exponent() + factor_exp);
        assert_eq!(private.decrypt(&w).unwrap(), 102.3 * 102.3);
    }

    #[test]
    fn mul_by_negative_integer() {
        let (public, private) = stable_keypair();
        let z = public.encrypt(50i64, None, None).unwrap();
        let w = z.mul(-3i64).unwrap();
        assert_eq!(private.decrypt(&w).unwrap(), -150.0);
    }

    #[test]
    fn raw_mul_reference_vector() {
        let (public, _) = stable_keypair();
        let r = BigUint::from(5u32);
        let x = public.encrypt(102.3, None, Some(&r)).unwrap();
        let y = EncodedNumber::encode(&public, 102.3, None, None).unwrap();
        let product = x.raw_mul(y.encoding()).unwrap();
        let expected: BigUint = "21549750908973310478636683764782244499".parse().unwrap();
        assert_eq!(product, expected);
    }

    #[test]
    fn raw_mul_rejects_out_of_bounds_scalar() {
        let (public, _) = stable_keypair();
        let z = public.encrypt(1i64, None, None).unwrap();
        assert_eq!(z.raw_mul(&public.n).unwrap_err(), Error::ScalarOutOfBounds);
    }

    #[test]
    fn obfuscation_is_plaintext_neutral() {
        let (public, private) = stable_keypair();
        let r = BigUint::from(7u32);
        let x = public.encrypt(5i64, None, Some(&r)).unwrap();
        assert!(!x.is_obfuscated());

        let once = x.obfuscate();
        let twice = once.obfuscate();
        assert!(once.is_obfuscated() && twice.is_obfuscated());
        assert_ne!(x.ciphertext(false), once.ciphertext(false));
        assert_ne!(once.ciphertext(false), twice.ciphertext(false));

        assert_eq!(private.decrypt(&x).unwrap(), 5.0);
        assert_eq!(private.decrypt(&once).unwrap(), 5.0);
        assert_eq!(private.decrypt(&twice).unwrap(), 5.0);
    }

    #[test]
    fn secure_accessor_blinds_on_the_fly() {
        let (public, private) = stable_keypair();
        let r = BigUint::from(7u32);
        let x = public.encrypt(5i64, None, Some(&r)).unwrap();

        let raw = x.ciphertext(false);
        let secure = x.ciphertext(true);
        assert_ne!(raw, secure);
        // The receiver is unchanged; only the returned value is blinded.
        assert!(!x.is_obfuscated());

        let reblinded = EncryptedNumber::new(&public, secure, x.exponent());
        assert_eq!(private.decrypt(&reblinded).unwrap(), 5.0);
    }

    #[test]
    fn cross_key_operations_are_rejected() {
        let (public_a, _) = stable_keypair();
        let (public_b, private_b) = other_keypair();

        let a = public_a.encrypt(1.0, None, None).unwrap();
        let b = public_b.encrypt(2.0, None, None).unwrap();
        assert_eq!(a.add(&b).unwrap_err(), Error::KeyMismatch);

        let encoded_b = EncodedNumber::encode(&public_b, 2.0, None, None).unwrap();
        assert_eq!(a.add(&encoded_b).unwrap_err(), Error::KeyMismatch);
        assert_eq!(a.mul(&encoded_b).unwrap_err(), Error::KeyMismatch);

        assert_eq!(private_b.decrypt(&a).unwrap_err(), Error::KeyMismatch);
        assert_eq!(
            public_a.encrypt_encoded(&encoded_b, None).unwrap_err(),
            Error::KeyMismatch,
        );
    }
}
