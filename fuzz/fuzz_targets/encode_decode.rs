#![no_main]

use libfuzzer_sys::fuzz_target;
use num_bigint_dig::BigUint;
use paillier_float::{keypair_from_primes, EncodedNumber, PrivateKey, PublicKey};

use std::sync::OnceLock;

static KEYPAIR: OnceLock<(PublicKey, PrivateKey)> = OnceLock::new();

fuzz_target!(|data: &[u8]| {
    if data.len() < 8 {
        return;
    }
    let (public, _) = KEYPAIR.get_or_init(|| {
        keypair_from_primes(
            BigUint::from(3778961023u64),
            BigUint::from(3870727277u64),
        )
        .unwrap()
    });

    let x = f64::from_bits(u64::from_be_bytes(data[..8].try_into().unwrap()));
    if !x.is_normal() && x != 0.0 {
        return;
    }

    // At its natural precision every normal double round-trips exactly:
    // the mantissa always fits the envelope of a 64-bit modulus.
    let encoded = EncodedNumber::encode(public, x, None, None).unwrap();
    assert_eq!(encoded.decode().unwrap(), x);
});
