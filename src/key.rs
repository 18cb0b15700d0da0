// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;

use num_bigint_dig::BigUint;
use num_traits::{One, Zero};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::encoding::{EncodedNumber, Scalar};
use crate::encrypted::EncryptedNumber;
use crate::error::{Error, Result};
use crate::util;

/// Smallest accepted modulus length. Far below any secure size; keys this
/// short are only useful for deterministic tests. Use 2048 bits or more in
/// production.
const MIN_MODULUS_BITS: usize = 64;

/// Public parameters of the cryptosystem.
///
/// The modulus is `n = p·q` for two distinct primes of equal bit length.
/// The generator is fixed to `g = n + 1`, which makes
/// `g^m ≡ 1 + n·m (mod n²)` and keeps encryption to two big-integer
/// multiplications plus one exponentiation. `n²` and the signed plaintext
/// envelope `max_int = ⌊n/3⌋ − 1` are cached because every ciphertext
/// operation needs them.
#[derive(Debug, Clone)]
pub struct PublicKey {
    pub(crate) n: BigUint,
    pub(crate) g: BigUint,
    pub(crate) nsquare: BigUint,
    pub(crate) max_int: BigUint,
}

impl PublicKey {
    pub(crate) fn new(n: BigUint) -> Self {
        let g = &n + BigUint::one();
        let nsquare = &n * &n;
        let max_int = &n / BigUint::from(3u32) - BigUint::one();
        Self {
            n,
            g,
            nsquare,
            max_int,
        }
    }

    /// Return the public modulus `n`.
    #[inline]
    pub fn n(&self) -> &BigUint {
        &self.n
    }

    /// Largest mantissa magnitude that fits the signed plaintext envelope.
    ///
    /// Residues in `[0, max_int]` are non-negative, residues in
    /// `[n − max_int, n)` are negative. The `n/3` split guarantees that the
    /// sum of two in-envelope plaintexts cannot wrap into the other sign.
    #[inline]
    pub fn max_int(&self) -> &BigUint {
        &self.max_int
    }

    /// Bit length of the modulus.
    #[inline]
    pub fn bits(&self) -> usize {
        self.n.bits()
    }

    /// Encrypt an integer plaintext `m ∈ [0, n)`, interpreted through the
    /// signed envelope, into a ciphertext in `[0, n²)`.
    ///
    /// With a caller-supplied blinding factor `r` the result is
    /// deterministic; with `r = None` a fresh `r` is drawn from `[1, n)`
    /// and the ciphertext is semantically secure.
    ///
    /// Negative-band plaintexts are encrypted as the inverse of the
    /// ciphertext of `n − m`, which keeps the multiplication by `n` small.
    pub fn raw_encrypt(&self, plaintext: &BigUint, r: Option<&BigUint>) -> Result<BigUint> {
        let negative_band = &self.n - &self.max_int;
        let nude = if *plaintext < self.n && *plaintext >= negative_band {
            let negated = &self.n - plaintext;
            let neg_cipher = (&self.n * negated + BigUint::one()) % &self.nsquare;
            util::inv_mod(&neg_cipher, &self.nsquare).ok_or(Error::CorruptedEncoding)?
        } else {
            (&self.n * plaintext + BigUint::one()) % &self.nsquare
        };

        let r = match r {
            Some(r) => r.clone(),
            None => util::random_below(&self.n),
        };
        let obfuscator = r.modpow(&self.n, &self.nsquare);

        Ok(nude * obfuscator % &self.nsquare)
    }

    /// Wrap an encoded plaintext into an [`EncryptedNumber`] carrying the
    /// encoding's exponent.
    ///
    /// When `r` is `None` the raw encryption runs with `r = 1` and the
    /// result is immediately re-blinded, so the published ciphertext is
    /// still fresh. A caller-supplied `r` yields a deterministic, unblinded
    /// number.
    pub fn encrypt_encoded<'pk>(
        &'pk self,
        encoding: &EncodedNumber<'_>,
        r: Option<&BigUint>,
    ) -> Result<EncryptedNumber<'pk>> {
        if self != encoding.public_key() {
            return Err(Error::KeyMismatch);
        }

        let one = BigUint::one();
        let obfuscator = r.unwrap_or(&one);
        let ciphertext = self.raw_encrypt(encoding.encoding(), Some(obfuscator))?;
        let number = EncryptedNumber::new(self, ciphertext, encoding.exponent());

        Ok(if r.is_none() {
            number.obfuscate()
        } else {
            number
        })
    }

    /// Encode a scalar (integer or real) and encrypt it.
    ///
    /// `precision` bounds the encoding granularity; `None` keeps all
    /// representable bits of the scalar. See [`EncodedNumber::encode`].
    pub fn encrypt<'pk>(
        &'pk self,
        value: impl Into<Scalar>,
        precision: Option<f64>,
        r: Option<&BigUint>,
    ) -> Result<EncryptedNumber<'pk>> {
        let encoding = EncodedNumber::encode(self, value, precision, None)?;
        self.encrypt_encoded(&encoding, r)
    }
}

/// Public keys compare by the value of their modulus. Every derived field
/// is a function of `n`, so this is full structural equality.
impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.n == other.n
    }
}

impl Eq for PublicKey {}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey(n={} bits)", self.n.bits())
    }
}

/// Secret key material.
///
/// Holds the factorization `p < q` of the modulus and the values
/// precomputed for CRT decryption: `p²`, `q²`, `p⁻¹ mod q`, and
/// `h(x) = L(g^{x−1} mod x²)⁻¹ mod x` for both primes. Everything derived
/// from the factors is zeroized on drop.
#[allow(missing_debug_implementations)]
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey {
    #[zeroize(skip)]
    public_key: PublicKey,
    p: BigUint,
    q: BigUint,
    psquare: BigUint,
    qsquare: BigUint,
    p_inverse: BigUint,
    hp: BigUint,
    hq: BigUint,
}

impl PrivateKey {
    /// Construct a private key from its prime factors.
    ///
    /// Validates that the factors are nonzero, distinct, and reconstruct
    /// the public modulus; normalizes them so `p < q`. Fails with
    /// [`Error::InvalidKeyParameters`] if a CRT precomputation has no
    /// inverse, which only happens when a factor is not prime.
    pub fn new(public_key: PublicKey, p: BigUint, q: BigUint) -> Result<Self> {
        if p.is_zero() || q.is_zero() {
            return Err(Error::InvalidKeyParameters("prime factors must be nonzero"));
        }
        if &p * &q != public_key.n {
            return Err(Error::InvalidKeyParameters(
                "product of the factors does not match the modulus",
            ));
        }
        if p == q {
            return Err(Error::InvalidKeyParameters("prime factors must be distinct"));
        }

        let (p, q) = if p > q { (q, p) } else { (p, q) };
        let psquare = &p * &p;
        let qsquare = &q * &q;

        let p_inverse = util::inv_mod(&p, &q)
            .ok_or(Error::InvalidKeyParameters("p is not invertible modulo q"))?;
        let hp = h_function(&public_key.g, &p, &psquare)
            .ok_or(Error::InvalidKeyParameters("h(p) has no inverse"))?;
        let hq = h_function(&public_key.g, &q, &qsquare)
            .ok_or(Error::InvalidKeyParameters("h(q) has no inverse"))?;

        Ok(Self {
            public_key,
            p,
            q,
            psquare,
            qsquare,
            p_inverse,
            hp,
            hq,
        })
    }

    /// Return a reference to the associated public key.
    #[inline]
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Recover the integer plaintext of a raw ciphertext.
    ///
    /// Decrypts modulo `p²` and `q²` separately and recombines with the
    /// CRT, which is roughly four times faster than a single
    /// exponentiation modulo `n²`.
    pub fn raw_decrypt(&self, ciphertext: &BigUint) -> BigUint {
        let cp = ciphertext.modpow(&(&self.p - BigUint::one()), &self.psquare);
        let mp = util::l_function(&cp, &self.p) * &self.hp % &self.p;

        let cq = ciphertext.modpow(&(&self.q - BigUint::one()), &self.qsquare);
        let mq = util::l_function(&cq, &self.q) * &self.hq % &self.q;

        // CRT recomposition; mp < p ≤ q, so the subtraction cannot
        // underflow after adding q.
        let u = (mq + &self.q - mp.clone()) % &self.q * &self.p_inverse % &self.q;
        mp + u * &self.p
    }

    /// Decrypt to an [`EncodedNumber`] carrying the ciphertext's exponent.
    pub fn decrypt_encoded<'pk>(
        &self,
        number: &EncryptedNumber<'pk>,
    ) -> Result<EncodedNumber<'pk>> {
        if &self.public_key != number.public_key() {
            return Err(Error::KeyMismatch);
        }
        let encoding = self.raw_decrypt(&number.ciphertext(false));
        Ok(EncodedNumber::from_parts(
            number.public_key(),
            encoding,
            number.exponent(),
        ))
    }

    /// Decrypt and decode to a real.
    pub fn decrypt(&self, number: &EncryptedNumber<'_>) -> Result<f64> {
        self.decrypt_encoded(number)?.decode()
    }
}

fn h_function(g: &BigUint, x: &BigUint, xsquare: &BigUint) -> Option<BigUint> {
    let gx = g.modpow(&(x - BigUint::one()), xsquare);
    util::inv_mod(&util::l_function(&gx, x), x)
}

/// Generate a keypair with a modulus of exactly `bit_length` bits.
///
/// Draws two probable primes of `bit_length / 2` bits and redraws both
/// whenever their product misses the requested length (the top bit of a
/// product of k-bit primes is not guaranteed to be set). `bit_length` must
/// be even: two equal-size primes can never multiply to an odd bit count,
/// and the loop would otherwise never terminate.
pub fn generate_keypair(bit_length: usize) -> Result<(PublicKey, PrivateKey)> {
    if bit_length < MIN_MODULUS_BITS || bit_length % 2 != 0 {
        return Err(Error::InvalidKeyParameters(
            "modulus length must be an even number of bits, at least 64",
        ));
    }

    loop {
        let p = util::generate_prime(bit_length / 2);
        let q = loop {
            let q = util::generate_prime(bit_length / 2);
            if q != p {
                break q;
            }
        };

        let n = &p * &q;
        if n.bits() != bit_length {
            continue;
        }

        let public = PublicKey::new(n);
        let private = PrivateKey::new(public.clone(), p, q)?;
        return Ok((public, private));
    }
}

/// Build a keypair from caller-supplied primes (deterministic tests,
/// externally generated keys). Primality is the caller's assertion.
pub fn keypair_from_primes(p: BigUint, q: BigUint) -> Result<(PublicKey, PrivateKey)> {
    let n = &p * &q;
    if n.is_zero() {
        return Err(Error::InvalidKeyParameters("modulus must be nonzero"));
    }
    let public = PublicKey::new(n);
    let private = PrivateKey::new(public.clone(), p, q)?;
    Ok((public, private))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stable_keypair() -> (PublicKey, PrivateKey) {
        let p = BigUint::from(3778961023u64);
        let q = BigUint::from(3870727277u64);
        keypair_from_primes(p, q).unwrap()
    }

    #[test]
    fn stable_modulus_value() {
        let (public, _) = stable_keypair();
        assert_eq!(public.n, BigUint::from(14627327510445924371u64));
    }

    #[test]
    fn raw_encrypt_decrypt_roundtrip() {
        let (public, private) = stable_keypair();
        let m = BigUint::from(124u32);
        let r = BigUint::from(34u32);
        for _ in 0..100 {
            let c = public.raw_encrypt(&m, Some(&r)).unwrap();
            assert_eq!(private.raw_decrypt(&c), m);
        }
    }

    #[test]
    fn raw_roundtrip_negative_band() {
        let (public, private) = stable_keypair();
        // signed value -55
        let m = &public.n - BigUint::from(55u32);
        let c = public.raw_encrypt(&m, Some(&BigUint::from(34u32))).unwrap();
        assert_eq!(private.raw_decrypt(&c), m);
    }

    #[test]
    fn raw_encrypt_fresh_r_is_probabilistic() {
        let (public, private) = stable_keypair();
        let m = BigUint::from(124u32);
        let c1 = public.raw_encrypt(&m, None).unwrap();
        let c2 = public.raw_encrypt(&m, None).unwrap();
        assert_ne!(c1, c2);
        assert_eq!(private.raw_decrypt(&c1), m);
        assert_eq!(private.raw_decrypt(&c2), m);
    }

    #[test]
    fn generate_keypair_exact_bit_length() {
        let (public, private) = generate_keypair(128).unwrap();
        assert_eq!(public.bits(), 128);
        let m = BigUint::from(987654321u64);
        let c = public.raw_encrypt(&m, None).unwrap();
        assert_eq!(private.raw_decrypt(&c), m);
    }

    #[test]
    fn generate_keypair_rejects_odd_length() {
        let err = match generate_keypair(127) {
            Err(e) => e,
            Ok(_) => panic!("expected an error"),
        };
        assert_eq!(
            err,
            Error::InvalidKeyParameters(
                "modulus length must be an even number of bits, at least 64",
            ),
        );
    }

    #[test]
    fn keypair_from_primes_rejects_equal_primes() {
        let p = BigUint::from(3778961023u64);
        let err = match keypair_from_primes(p.clone(), p) {
            Err(e) => e,
            Ok(_) => panic!("expected an error"),
        };
        assert_eq!(err, Error::InvalidKeyParameters("prime factors must be distinct"));
    }

    #[test]
    fn keypair_from_primes_rejects_zero() {
        let err = match keypair_from_primes(BigUint::zero(), BigUint::from(7u32)) {
            Err(e) => e,
            Ok(_) => panic!("expected an error"),
        };
        assert_eq!(err, Error::InvalidKeyParameters("modulus must be nonzero"));
    }

    #[test]
    fn public_key_equality_is_structural() {
        let (a, _) = stable_keypair();
        let (b, _) = stable_keypair();
        assert_eq!(a, b);

        let (c, _) = keypair_from_primes(
            BigUint::from(4294967291u64),
            BigUint::from(4294967279u64),
        )
        .unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn max_int_is_third_of_modulus_less_one() {
        let (public, _) = stable_keypair();
        assert_eq!(public.max_int, &public.n / BigUint::from(3u32) - BigUint::one());
    }
}
