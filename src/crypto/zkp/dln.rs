//! Proof of knowledge of the discrete log of h2 = h1^x over a safe prime
//! product N, run bit-by-bit over a hashed challenge.

use num_bigint_dig::BigInt;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};

use crate::crypto::{bit_at, random_num, sha256_int, ModInt};

/// Iteration count; soundness error 2^-30.
pub const ITERATIONS: usize = 30;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DlnProof {
    #[serde(rename = "Alpha", with = "crate::serde_support::hex_int_vec")]
    pub alpha: Vec<BigInt>,
    #[serde(rename = "T", with = "crate::serde_support::hex_int_vec")]
    pub t: Vec<BigInt>,
}

/// Prove h2 = h1^x mod N where N = (2p+1)(2q+1) and p, q are the safe prime
/// halves: exponent arithmetic runs modulo p*q, the order of the quadratic
/// residue group.
pub fn prove(h1: &BigInt, h2: &BigInt, x: &BigInt, p: &BigInt, q: &BigInt, n: &BigInt) -> DlnProof {
    use num_integer::Integer;
    let pq = p * q;
    let modint = ModInt(n);

    let a: Vec<BigInt> = (0..ITERATIONS).map(|_| random_num(&pq)).collect();
    let alpha: Vec<BigInt> = a.iter().map(|ai| modint.exp(h1, ai)).collect();

    let c = challenge(h1, h2, n, &alpha);
    let t = a
        .iter()
        .enumerate()
        .map(|(i, ai)| {
            let mut ti = ai.clone();
            if bit_at(&c, i) {
                ti += x;
            }
            ti.mod_floor(&pq)
        })
        .collect();
    DlnProof { alpha, t }
}

pub fn verify(proof: &DlnProof, h1: &BigInt, h2: &BigInt, n: &BigInt) -> bool {
    use num_traits::Signed;
    if n.is_negative() || n.is_zero() {
        return false;
    }
    let modint = ModInt(n);
    let one = BigInt::one();

    // generators must be non-trivial and distinct mod N
    let h1_r = modint.reduce(h1);
    let h2_r = modint.reduce(h2);
    if h1_r <= one || h2_r <= one || h1_r == h2_r {
        return false;
    }
    if proof.alpha.len() != ITERATIONS || proof.t.len() != ITERATIONS {
        return false;
    }
    for value in proof.alpha.iter().chain(proof.t.iter()) {
        if modint.reduce(value) <= one {
            return false;
        }
    }

    let c = challenge(h1, h2, n, &proof.alpha);
    for i in 0..ITERATIONS {
        let lhs = modint.exp(h1, &proof.t[i]);
        let rhs = if bit_at(&c, i) {
            modint.mul(&proof.alpha[i], &h2_r)
        } else {
            modint.reduce(&proof.alpha[i])
        };
        if lhs != rhs {
            return false;
        }
    }
    true
}

fn challenge(h1: &BigInt, h2: &BigInt, n: &BigInt, alpha: &[BigInt]) -> BigInt {
    let mut inputs: Vec<&BigInt> = vec![h1, h2, n];
    inputs.extend(alpha.iter());
    sha256_int(&inputs)
}
