//! No-small-factor proof: N = p q with both factors at least 2^l, via
//! Pedersen commitments to the factors and a masked response on each.

use num_bigint_dig::BigInt;
use num_traits::One;
use serde::{Deserialize, Serialize};

use crate::crypto::pedersen::PedersenParameters;
use crate::crypto::zkp::SecurityParameter;
use crate::crypto::{isqrt, random_num, sha256_int, ModInt};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoSmallFactorProof {
    /// Claimed factor bound: both factors are at least 2^l.
    #[serde(rename = "L")]
    pub l: usize,
    #[serde(rename = "SecurityParams")]
    pub params: SecurityParameter,
    #[serde(rename = "P", with = "crate::serde_support::hex_int")]
    pub p: BigInt,
    #[serde(rename = "Q", with = "crate::serde_support::hex_int")]
    pub q: BigInt,
    #[serde(rename = "A", with = "crate::serde_support::hex_int")]
    pub a: BigInt,
    #[serde(rename = "B", with = "crate::serde_support::hex_int")]
    pub b: BigInt,
    #[serde(rename = "T", with = "crate::serde_support::hex_int")]
    pub t: BigInt,
    #[serde(rename = "Rho", with = "crate::serde_support::hex_int")]
    pub rho: BigInt,
    #[serde(rename = "Z1", with = "crate::serde_support::hex_int")]
    pub z1: BigInt,
    #[serde(rename = "Z2", with = "crate::serde_support::hex_int")]
    pub z2: BigInt,
    #[serde(rename = "W1", with = "crate::serde_support::hex_int")]
    pub w1: BigInt,
    #[serde(rename = "W2", with = "crate::serde_support::hex_int")]
    pub w2: BigInt,
    #[serde(rename = "V", with = "crate::serde_support::hex_int")]
    pub v: BigInt,
}

/// Prove that n = p * q has no factor smaller than 2^l, committing to the
/// witness factors under the verifier's Pedersen parameters.
pub fn prove(
    n: &BigInt,
    p: &BigInt,
    q: &BigInt,
    l: usize,
    ped: &PedersenParameters,
    params: &SecurityParameter,
) -> NoSmallFactorProof {
    let n_tilde = &ped.n_tilde;
    let n_sqrt = isqrt(n);

    let range0 = BigInt::one() << (l + params.epsilon);
    let range1 = BigInt::one() << l;

    let alpha = random_num(&(&range0 * &n_sqrt));
    let beta = random_num(&(&range0 * &n_sqrt));
    let mu = random_num(&(&range0 * n_tilde));
    let nu = random_num(&(&range0 * n_tilde));
    let rho = random_num(&(&range1 * n * n_tilde));
    let r = random_num(&(&range0 * n * n_tilde));
    let x = random_num(&(&range0 * n_tilde));
    let y = random_num(&(&range0 * n_tilde));

    let p_cmt = ped.commit(p, &mu);
    let q_cmt = ped.commit(q, &nu);
    let a_cmt = ped.commit(&alpha, &x);
    let b_cmt = ped.commit(&beta, &y);
    let modint = ModInt(n_tilde);
    let t_cmt = modint.mul(&modint.exp(&q_cmt, &alpha), &modint.exp(&ped.t, &r));

    let e = challenge(n, &p_cmt, &q_cmt, &a_cmt, &b_cmt, &t_cmt, &rho, params);

    // rho folded around the cross term q_cmt^alpha
    let rho_tilde = &rho - &nu * p;

    NoSmallFactorProof {
        l,
        params: *params,
        z1: &alpha + &e * p,
        z2: &beta + &e * q,
        w1: &x + &e * &mu,
        w2: &y + &e * &nu,
        v: &r + &e * &rho_tilde,
        p: p_cmt,
        q: q_cmt,
        a: a_cmt,
        b: b_cmt,
        t: t_cmt,
        rho,
    }
}

pub fn verify(n: &BigInt, proof: &NoSmallFactorProof, ped: &PedersenParameters) -> bool {
    let n_tilde = &ped.n_tilde;
    let n_sqrt = isqrt(n);
    let modint = ModInt(n_tilde);

    let e = challenge(
        n, &proof.p, &proof.q, &proof.a, &proof.b, &proof.t, &proof.rho, &proof.params,
    );
    let r_cmt = ped.commit(n, &proof.rho);

    // commit(z1, w1) == A * P^e
    let lhs = ped.commit(&proof.z1, &proof.w1);
    let rhs = modint.mul(&proof.a, &modint.exp(&proof.p, &e));
    if lhs != rhs {
        return false;
    }

    // commit(z2, w2) == B * Q^e
    let lhs = ped.commit(&proof.z2, &proof.w2);
    let rhs = modint.mul(&proof.b, &modint.exp(&proof.q, &e));
    if lhs != rhs {
        return false;
    }

    // Q^z1 * T^v == T_cmt * R^e
    let lhs = modint.mul(&modint.exp(&proof.q, &proof.z1), &modint.exp(&ped.t, &proof.v));
    let rhs = modint.mul(&proof.t, &modint.exp(&r_cmt, &e));
    if lhs != rhs {
        return false;
    }

    // responses must stay within the slack for factors of at least 2^l
    let limit = (BigInt::one() << (proof.l + proof.params.epsilon)) * &n_sqrt;
    proof.z1 <= limit && proof.z2 <= limit
}

#[allow(clippy::too_many_arguments)]
fn challenge(
    n: &BigInt,
    p: &BigInt,
    q: &BigInt,
    a: &BigInt,
    b: &BigInt,
    t: &BigInt,
    rho: &BigInt,
    params: &SecurityParameter,
) -> BigInt {
    use num_integer::Integer;
    let range_q = BigInt::one() << params.q_bitlen;
    sha256_int(&[n, p, q, a, b, t, rho]).mod_floor(&range_q)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::paillier::tests::{P_1024, Q_1024};
    use crate::crypto::pedersen;

    const PARAMS: SecurityParameter = SecurityParameter { q_bitlen: 64, epsilon: 128 };

    #[test]
    fn completeness() {
        let ped = pedersen::tests::test_parameters();
        let p = BigInt::parse_bytes(P_1024.as_bytes(), 10).unwrap();
        let q = BigInt::parse_bytes(Q_1024.as_bytes(), 10).unwrap();
        let n = &p * &q;
        let proof = prove(&n, &p, &q, 16, &ped, &PARAMS);
        assert!(verify(&n, &proof, &ped));
    }

    #[test]
    fn small_factor_is_rejected() {
        let ped = pedersen::tests::test_parameters();
        // lopsided factorisation: a 16-bit factor cannot satisfy l = 256
        let p = BigInt::from(65_521u32);
        let q = BigInt::parse_bytes(Q_1024.as_bytes(), 10).unwrap();
        let n = &p * &q;
        let proof = prove(&n, &p, &q, 256, &ped, &PARAMS);
        assert!(!verify(&n, &proof, &ped));
    }

    #[test]
    fn wrong_factorisation_is_rejected() {
        let ped = pedersen::tests::test_parameters();
        let p = BigInt::parse_bytes(P_1024.as_bytes(), 10).unwrap();
        let q = BigInt::parse_bytes(Q_1024.as_bytes(), 10).unwrap();
        let n = &p * &q + BigInt::from(10);
        let proof = prove(&n, &p, &q, 16, &ped, &PARAMS);
        assert!(!verify(&n, &proof, &ped));
    }

    #[test]
    fn tampered_response_is_rejected() {
        let ped = pedersen::tests::test_parameters();
        let p = BigInt::parse_bytes(P_1024.as_bytes(), 10).unwrap();
        let q = BigInt::parse_bytes(Q_1024.as_bytes(), 10).unwrap();
        let n = &p * &q;
        let mut proof = prove(&n, &p, &q, 16, &ped, &PARAMS);
        proof.z1 += BigInt::one();
        assert!(!verify(&n, &proof, &ped));
    }
}
