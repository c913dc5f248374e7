//! Paillier–Blum modulus proof (eprint 2020/492 §4.3): N = p q with
//! p ≡ q ≡ 3 (mod 4), shown by extracting N-th roots and fourth roots of
//! oracle-derived challenges.

use num_bigint_dig::algorithms::jacobi;
use num_bigint_dig::prime::probably_prime;
use num_bigint_dig::{BigInt, ModInverse};
use num_integer::Integer;
use num_traits::{One, Signed, Zero};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::crypto::{bit_at, random_num, sha256_int, ModInt};
use crate::{Error, Result};

/// Samples emitted by the prover; soundness error 2^-m.
pub const SAMPLE_COUNT: usize = 64;
/// Verifier floor on the sample count.
const MIN_SAMPLE_COUNT: usize = 40;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaillierBlumProof {
    #[serde(rename = "W", with = "crate::serde_support::hex_int")]
    pub w: BigInt,
    #[serde(rename = "X", with = "crate::serde_support::hex_int_vec")]
    pub x_arr: Vec<BigInt>,
    #[serde(rename = "Z", with = "crate::serde_support::hex_int_vec")]
    pub z_arr: Vec<BigInt>,
    /// Bit i selects the (-1) factor at sample i. Bit length is fixed to m+1
    /// so the encoding of leading zero bits survives transport.
    #[serde(rename = "A", with = "crate::serde_support::hex_int")]
    pub a: BigInt,
    /// Bit i selects the w factor at sample i.
    #[serde(rename = "B", with = "crate::serde_support::hex_int")]
    pub b: BigInt,
    #[serde(rename = "M")]
    pub m: usize,
}

/// Prove that n = p * q is a Blum integer, p and q given as witness.
pub fn prove(n: &BigInt, p: &BigInt, q: &BigInt) -> Result<PaillierBlumProof> {
    let m = SAMPLE_COUNT;
    if *n != p * q {
        return Err(Error::InvalidArgument(
            "N is not the product of the witness primes".into(),
        ));
    }

    let mut w = random_num(n);
    while jacobi(&w, n) != -1 {
        w = random_num(n);
    }

    let phi = (p - BigInt::one()) * (q - BigInt::one());
    let n_inv = n
        .mod_inverse(&phi)
        .ok_or_else(|| Error::ArithmeticError("N not invertible mod phi".into()))?;

    let modint = ModInt(n);
    let mut y_arr: Vec<BigInt> = Vec::with_capacity(m);
    let mut x_arr = Vec::with_capacity(m);
    let mut z_arr = Vec::with_capacity(m);
    let mut a = BigInt::one() << m;
    let mut b = BigInt::one() << m;

    for i in 0..m {
        let y = oracle(&w, n, &y_arr).mod_floor(n);
        let (x, ai, bi) = quartic_root(n, &phi, p, q, &w, &y)?;
        if ai {
            a += BigInt::one() << i;
        }
        if bi {
            b += BigInt::one() << i;
        }
        z_arr.push(modint.exp(&y, &n_inv));
        x_arr.push(x);
        y_arr.push(y);
    }

    Ok(PaillierBlumProof { w, x_arr, z_arr, a, b, m })
}

/// Verify a Paillier–Blum proof. The per-sample checks are independent and
/// run in parallel; any single failure rejects.
pub fn verify(n: &BigInt, proof: &PaillierBlumProof) -> bool {
    if !n.is_positive() || n.is_even() {
        return false;
    }
    if let Some(n_uint) = n.to_biguint() {
        if probably_prime(&n_uint, 100) {
            return false;
        }
    } else {
        return false;
    }
    if jacobi(&proof.w, n) != -1 || proof.w.mod_floor(n).is_zero() {
        return false;
    }
    if proof.m < MIN_SAMPLE_COUNT {
        return false;
    }
    if proof.x_arr.len() < proof.m || proof.z_arr.len() < proof.m {
        return false;
    }
    if proof.a.bits() != proof.m + 1 || proof.b.bits() != proof.m + 1 {
        return false;
    }

    // the oracle chains over previous samples, so y values come sequentially
    let mut y_arr: Vec<BigInt> = Vec::with_capacity(proof.m);
    for _ in 0..proof.m {
        let y = oracle(&proof.w, n, &y_arr).mod_floor(n);
        y_arr.push(y);
    }

    (0..proof.m).into_par_iter().all(|i| {
        let modint = ModInt(n);
        let y = &y_arr[i];
        let z = &proof.z_arr[i];
        let x = &proof.x_arr[i];
        if z.mod_floor(n).is_zero() || x.mod_floor(n).is_zero() {
            return false;
        }
        // z^N == y mod N
        if modint.exp(z, n) != *y {
            return false;
        }
        // x^4 == (-1)^a w^b y mod N
        let mut rhs = y.clone();
        if bit_at(&proof.a, i) {
            rhs = modint.sub(&BigInt::zero(), &rhs);
        }
        if bit_at(&proof.b, i) {
            rhs = modint.mul(&proof.w, &rhs);
        }
        modint.exp(x, &BigInt::from(4)) == rhs
    })
}

/// Find (a, b) such that (-1)^a w^b y is a quadratic residue mod both
/// primes, and return its fourth root. For a Blum integer every quadratic
/// residue has order dividing phi/4, so the square root exponent is
/// (phi+4)/8 and the fourth root exponent is its square.
fn quartic_root(
    n: &BigInt,
    phi: &BigInt,
    p: &BigInt,
    q: &BigInt,
    w: &BigInt,
    y: &BigInt,
) -> Result<(BigInt, bool, bool)> {
    let sqrt_exp: BigInt = (phi + BigInt::from(4)) >> 3usize;
    let fourth_exp = &sqrt_exp * &sqrt_exp;
    let modint = ModInt(n);

    for j in 0..4 {
        let a = j & 1 == 1;
        let b = (j >> 1) & 1 == 1;
        let mut y_tilt = y.clone();
        if a {
            y_tilt = modint.sub(&BigInt::zero(), &y_tilt);
        }
        if b {
            y_tilt = modint.mul(w, &y_tilt);
        }
        if jacobi(&y_tilt, p) == 1 && jacobi(&y_tilt, q) == 1 {
            let x = modint.exp(&y_tilt, &fourth_exp);
            return Ok((x, a, b));
        }
    }
    Err(Error::ArithmeticError(
        "no quadratic residue among (-1)^a w^b y; N is not a Blum integer".into(),
    ))
}

fn oracle(w: &BigInt, n: &BigInt, ys: &[BigInt]) -> BigInt {
    let mut inputs: Vec<&BigInt> = vec![w, n];
    inputs.extend(ys.iter());
    sha256_int(&inputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::paillier::tests::{P_1024, Q_1024};
    use crate::crypto::prime::generate_safe_primes;

    fn blum_primes() -> (BigInt, BigInt) {
        (
            BigInt::parse_bytes(P_1024.as_bytes(), 10).unwrap(),
            BigInt::parse_bytes(Q_1024.as_bytes(), 10).unwrap(),
        )
    }

    #[test]
    fn honest_prover_is_accepted() {
        let (p, q) = blum_primes();
        let n = &p * &q;
        let proof = prove(&n, &p, &q).unwrap();
        assert!(verify(&n, &proof));
    }

    #[test]
    fn non_blum_modulus_is_rejected() {
        // a factor that is 1 mod 4 breaks the quartic root structure, so
        // either root finding or verification must fail
        use num_bigint_dig::RandPrime;
        use rand::rngs::OsRng;
        let p = loop {
            let candidate: BigInt = OsRng.gen_prime(256).into();
            if candidate.mod_floor(&BigInt::from(4)) == BigInt::one() {
                break candidate;
            }
        };
        let (q, _) = generate_safe_primes(256, 4);
        let n = &p * &q;
        match prove(&n, &p, &q) {
            Ok(proof) => assert!(!verify(&n, &proof)),
            Err(_) => {}
        }
    }

    #[test]
    fn tampered_proof_is_rejected() {
        let (p, q) = blum_primes();
        let n = &p * &q;
        let proof = prove(&n, &p, &q).unwrap();

        let mut bad = proof.clone();
        bad.x_arr[3] += BigInt::one();
        assert!(!verify(&n, &bad));

        let mut bad = proof.clone();
        bad.m = MIN_SAMPLE_COUNT - 1;
        assert!(!verify(&n, &bad));

        // wrong modulus
        assert!(!verify(&(&n + BigInt::from(2)), &proof));
    }

    #[test]
    fn prime_modulus_is_rejected() {
        let (p, q) = blum_primes();
        let n = &p * &q;
        let proof = prove(&n, &p, &q).unwrap();
        assert!(!verify(&p, &proof));
    }
}
