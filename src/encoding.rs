// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;

use num_bigint_dig::BigUint;
use num_traits::{One, ToPrimitive, Zero};

use crate::error::{Error, Result};
use crate::key::PublicKey;

/// Fixed base of the floating-point encoding.
///
/// Must stay a power of two: all mantissa scaling below is carried out as
/// exact shifts of `LOG2_BASE` bits per exponent step.
pub const BASE: u32 = 16;

/// Bits of precision in an IEEE-754 double mantissa.
pub const FLOAT_MANTISSA_BITS: i64 = 53;

const LOG2_BASE: i64 = 4;

/// A plaintext scalar accepted by the encoding and homomorphic entry
/// points: a signed integer or a double-precision real.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Int(i64),
    Float(f64),
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl Scalar {
    /// Decompose into sign, integer magnitude and a base-2 scale, so that
    /// the scalar equals `±magnitude · 2^scale` exactly.
    fn parts(self) -> Result<(bool, BigUint, i64)> {
        match self {
            Scalar::Int(i) => Ok((i < 0, BigUint::from(i.unsigned_abs()), 0)),
            Scalar::Float(x) => {
                if !x.is_finite() {
                    return Err(Error::PlaintextTooLarge);
                }
                let (mantissa, exponent) = frexp(x);
                let magnitude = (mantissa.abs() * (1u64 << 53) as f64) as u64;
                Ok((
                    x.is_sign_negative(),
                    BigUint::from(magnitude),
                    exponent as i64 - FLOAT_MANTISSA_BITS,
                ))
            }
        }
    }
}

/// A plaintext in the integer domain of the cryptosystem together with its
/// scale: the represented real is `signed(encoding) · BASE^exponent`, where
/// residues up to `max_int` are non-negative and residues from
/// `n − max_int` up are negative.
#[derive(Debug, Clone)]
pub struct EncodedNumber<'pk> {
    public_key: &'pk PublicKey,
    encoding: BigUint,
    exponent: i64,
}

impl<'pk> EncodedNumber<'pk> {
    pub(crate) fn from_parts(public_key: &'pk PublicKey, encoding: BigUint, exponent: i64) -> Self {
        Self {
            public_key,
            encoding,
            exponent,
        }
    }

    /// Encode a scalar as an integer mantissa and a base-16 exponent.
    ///
    /// The exponent decides how much precision survives:
    ///
    /// - `precision = None` keeps every representable bit: integers encode
    ///   at exponent 0, reals at the base-16 position of their least
    ///   significant mantissa bit.
    /// - `precision = Some(p)` with `p > 0` encodes at granularity `p`
    ///   (exponent `⌊log_16 p⌋`); non-positive values are ignored.
    ///
    /// `max_exponent` additionally caps the exponent from above, which
    /// callers use to match the scale of an existing number.
    ///
    /// The mantissa is computed with exact shift arithmetic; nothing is
    /// routed through a floating intermediate that could overflow or round.
    /// Fails with [`Error::PlaintextTooLarge`] when the mantissa magnitude
    /// exceeds the key's envelope, or when the scalar is not finite.
    pub fn encode(
        public_key: &'pk PublicKey,
        scalar: impl Into<Scalar>,
        precision: Option<f64>,
        max_exponent: Option<i64>,
    ) -> Result<Self> {
        let scalar = scalar.into();
        let (negative, magnitude, base2_scale) = scalar.parts()?;

        let precision = precision.filter(|p| *p > 0.0);
        let prec_exponent = match precision {
            Some(p) => (p.ln() / (BASE as f64).ln()).floor() as i64,
            None => match scalar {
                Scalar::Int(_) => 0,
                Scalar::Float(_) => base2_scale.div_euclid(LOG2_BASE),
            },
        };
        let exponent = match max_exponent {
            Some(cap) => prec_exponent.min(cap),
            None => prec_exponent,
        };

        let int_rep = shift_round(&magnitude, base2_scale - LOG2_BASE * exponent);
        if int_rep > public_key.max_int {
            return Err(Error::PlaintextTooLarge);
        }

        let encoding = if negative && !int_rep.is_zero() {
            &public_key.n - int_rep
        } else {
            int_rep
        };

        Ok(Self {
            public_key,
            encoding,
            exponent,
        })
    }

    /// Decode back to a real.
    ///
    /// Classifies the residue into the non-negative band, the negative
    /// band, or the forbidden middle band. The mantissa is rounded to 53
    /// bits (ties to even) in arbitrary precision before the final
    /// conversion, so no intermediate double can overflow or lose bits.
    pub fn decode(&self) -> Result<f64> {
        let pk = self.public_key;
        if self.encoding >= pk.n {
            return Err(Error::CorruptedEncoding);
        }

        let (mantissa, negative) = if self.encoding <= pk.max_int {
            (self.encoding.clone(), false)
        } else if self.encoding >= &pk.n - &pk.max_int {
            (&pk.n - &self.encoding, true)
        } else {
            return Err(Error::Overflow);
        };

        let value = scaled_to_f64(&mantissa, LOG2_BASE * self.exponent);
        Ok(if negative { -value } else { value })
    }

    /// Rescale to a smaller exponent without changing the represented
    /// value: the encoding is multiplied by `BASE^(exponent − new_exp)`
    /// modulo `n`. Raising the exponent would lose precision and fails
    /// with [`Error::ExponentRaise`].
    pub fn decrease_exponent_to(&self, new_exp: i64) -> Result<Self> {
        if new_exp > self.exponent {
            return Err(Error::ExponentRaise {
                current: self.exponent,
                requested: new_exp,
            });
        }
        let factor = base_pow(self.exponent - new_exp);
        let encoding = &self.encoding * factor % &self.public_key.n;
        Ok(Self {
            public_key: self.public_key,
            encoding,
            exponent: new_exp,
        })
    }

    /// The integer mantissa as a field element in `[0, n)`.
    #[inline]
    pub fn encoding(&self) -> &BigUint {
        &self.encoding
    }

    /// The base-16 exponent.
    #[inline]
    pub fn exponent(&self) -> i64 {
        self.exponent
    }

    #[inline]
    pub fn public_key(&self) -> &'pk PublicKey {
        self.public_key
    }
}

impl fmt::Display for EncodedNumber<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EncodedNumber(encoding={}, exponent={})",
            self.encoding, self.exponent
        )
    }
}

/// Exact integer value of `BASE^exp`.
pub(crate) fn base_pow(exp: i64) -> BigUint {
    debug_assert!(exp >= 0);
    BigUint::one() << (exp as usize * LOG2_BASE as usize)
}

/// `magnitude · 2^shift`, rounded half away from zero when the shift is
/// negative. This is the exact counterpart of `round(x · 16^-exponent)`.
fn shift_round(magnitude: &BigUint, shift: i64) -> BigUint {
    if shift >= 0 {
        magnitude << shift as usize
    } else {
        let s = (-shift) as usize;
        let half = BigUint::one() << (s - 1);
        (magnitude + half) >> s
    }
}

/// Nearest double to `magnitude · 2^exp2`.
///
/// Mantissas wider than 53 bits are rounded ties-to-even in integer
/// arithmetic first; the remaining power-of-two scale is applied in two
/// steps so extreme exponents saturate to 0 or infinity instead of
/// corrupting the result.
fn scaled_to_f64(magnitude: &BigUint, exp2: i64) -> f64 {
    if magnitude.is_zero() {
        return 0.0;
    }

    let bits = magnitude.bits() as i64;
    if bits <= FLOAT_MANTISSA_BITS {
        let m = magnitude.to_f64().unwrap_or(f64::INFINITY);
        return mul_pow2(m, exp2);
    }

    let s = (bits - FLOAT_MANTISSA_BITS) as usize;
    let half = BigUint::one() << (s - 1);
    let rem = magnitude & ((BigUint::one() << s) - BigUint::one());
    let mut head = magnitude >> s;
    if rem > half || (rem == half && (&head & BigUint::one()).is_one()) {
        head += BigUint::one();
    }

    let m = head.to_f64().unwrap_or(f64::INFINITY);
    mul_pow2(m, exp2 + s as i64)
}

fn mul_pow2(x: f64, exp2: i64) -> f64 {
    let e = exp2.clamp(-4400, 4400) as i32;
    let h = e / 2;
    x * 2f64.powi(h) * 2f64.powi(e - h)
}

/// Decompose a finite double into `(m, e)` with `x = m·2^e` and
/// `|m| ∈ [0.5, 1)`, like C's `frexp`.
fn frexp(x: f64) -> (f64, i32) {
    if x == 0.0 {
        return (x, 0);
    }
    let bits = x.to_bits();
    let biased = ((bits >> 52) & 0x7ff) as i32;
    if biased == 0 {
        // Subnormal: renormalize through a 2^64 scale.
        let (m, e) = frexp(x * 2f64.powi(64));
        return (m, e - 64);
    }
    let mantissa = f64::from_bits((bits & 0x800f_ffff_ffff_ffff) | (1022u64 << 52));
    (mantissa, biased - 1022)
}
