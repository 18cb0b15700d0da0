#![no_main]

use libfuzzer_sys::fuzz_target;
use num_bigint_dig::BigUint;
use paillier_float::{keypair_from_primes, PrivateKey, PublicKey};

use std::sync::OnceLock;

static KEYPAIR: OnceLock<(PublicKey, PrivateKey)> = OnceLock::new();

fuzz_target!(|data: &[u8]| {
    if data.len() < 8 {
        return;
    }
    let (public, private) = KEYPAIR.get_or_init(|| {
        keypair_from_primes(
            BigUint::from(3778961023u64),
            BigUint::from(3870727277u64),
        )
        .unwrap()
    });

    let a = i32::from_be_bytes(data[0..4].try_into().unwrap()) as i64;
    let b = i32::from_be_bytes(data[4..8].try_into().unwrap()) as i64;

    let ca = public.encrypt(a, None, None).unwrap();
    let cb = public.encrypt(b, None, None).unwrap();
    let sum = ca.add(&cb).unwrap();

    assert_eq!(private.decrypt(&sum).unwrap(), (a + b) as f64);
});
