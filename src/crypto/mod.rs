//! Cryptographic primitives: transcripts, sampling, commitments, curves,
//! secret sharing, Paillier, Pedersen and the zero-knowledge proof suite.

pub mod commitment;
pub mod curve;
pub mod paillier;
pub mod pedersen;
pub mod prime;
pub mod schnorr;
pub mod vss;
pub mod zkp;

use hmac::{Hmac, Mac};
use num_bigint_dig::{BigInt, ModInverse, RandBigInt, Sign};
use num_integer::Integer;
use num_traits::{One, Signed, Zero};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256, Sha512};

/// Minimal unsigned big-endian byte string of a non-negative integer.
///
/// Zero encodes as the empty string. Every hash transcript and every AES seed
/// in the library is built from this encoding, so it must not change.
pub fn bytes_be(n: &BigInt) -> Vec<u8> {
    if n.is_zero() {
        return Vec::new();
    }
    n.to_bytes_be().1
}

pub fn bigint_from_bytes(bytes: &[u8]) -> BigInt {
    BigInt::from_bytes_be(Sign::Plus, bytes)
}

/// SHA-256 over the concatenated byte strings of `inputs`, as an integer.
pub fn sha256_int(inputs: &[&BigInt]) -> BigInt {
    let mut hasher = Sha256::new();
    for n in inputs {
        hasher.update(bytes_be(n));
    }
    bigint_from_bytes(hasher.finalize().as_slice())
}

/// HMAC-SHA-512 with an empty key over the concatenated byte strings of
/// `inputs`, as an integer.
pub fn sha512_int(inputs: &[&BigInt]) -> BigInt {
    let mut mac =
        Hmac::<Sha512>::new_from_slice(&[]).expect("hmac accepts keys of any length");
    for n in inputs {
        mac.update(&bytes_be(n));
    }
    bigint_from_bytes(mac.finalize().into_bytes().as_slice())
}

/// Uniform random integer r with 1 < r < n.
pub fn random_num(n: &BigInt) -> BigInt {
    let bound = n
        .to_biguint()
        .unwrap_or_else(|| panic!("random_num bound must be positive"));
    let one = BigInt::one();
    loop {
        let r: BigInt = OsRng.gen_biguint_below(&bound).into();
        if r > one {
            return r;
        }
    }
}

/// Uniform random integer r in [1, n) with gcd(r, n) = 1, suitable as
/// Paillier encryption randomness.
pub fn random_coprime_num(n: &BigInt) -> BigInt {
    loop {
        let r = random_num(n);
        if r.gcd(n).is_one() {
            return r;
        }
    }
}

pub fn random_bytes_32() -> [u8; 32] {
    use rand::RngCore;
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// 0 <= x < upper.
pub fn is_in_interval(x: &BigInt, upper: &BigInt) -> bool {
    !x.is_negative() && x < upper
}

/// Bit `i` of a non-negative integer.
pub fn bit_at(n: &BigInt, i: usize) -> bool {
    !((n >> i) & BigInt::one()).is_zero()
}

/// Integer square root, rounded down.
pub fn isqrt(n: &BigInt) -> BigInt {
    if n.is_zero() || n.is_one() {
        return n.clone();
    }
    let mut x: BigInt = BigInt::one() << (n.bits() / 2 + 1);
    loop {
        let y = (&x + n / &x) >> 1;
        if y >= x {
            return x;
        }
        x = y;
    }
}

/// Modular arithmetic bound to a fixed modulus.
///
/// `exp` accepts negative exponents by inverting the base; a base that is not
/// invertible yields zero, which never satisfies any verifier equation, so a
/// malformed proof fails closed instead of panicking.
pub struct ModInt<'a>(pub &'a BigInt);

impl ModInt<'_> {
    pub fn exp(&self, base: &BigInt, exponent: &BigInt) -> BigInt {
        let base = base.mod_floor(self.0);
        if exponent.is_negative() {
            match (&base).mod_inverse(self.0) {
                Some(inv) => self.exp(&inv, &-exponent),
                None => BigInt::zero(),
            }
        } else {
            // non-negative throughout, so the uint modpow applies
            let b = base.to_biguint().unwrap_or_default();
            let e = exponent.to_biguint().unwrap_or_default();
            let m = self.0.to_biguint().unwrap_or_default();
            BigInt::from(b.modpow(&e, &m))
        }
    }

    pub fn mul(&self, a: &BigInt, b: &BigInt) -> BigInt {
        (a * b).mod_floor(self.0)
    }

    pub fn add(&self, a: &BigInt, b: &BigInt) -> BigInt {
        (a + b).mod_floor(self.0)
    }

    pub fn sub(&self, a: &BigInt, b: &BigInt) -> BigInt {
        (a - b).mod_floor(self.0)
    }

    pub fn reduce(&self, a: &BigInt) -> BigInt {
        a.mod_floor(self.0)
    }

    pub fn inverse(&self, a: &BigInt) -> Option<BigInt> {
        a.mod_inverse(self.0)
    }
}
