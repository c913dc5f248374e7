//! Classical Paillier plaintext range proof with q^3 slack
//! (eprint 2019/114 A.1). Compatibility companion to
//! [`crate::crypto::zkp::pdl_slack`].

use num_bigint_dig::BigInt;
use num_integer::Integer;
use num_traits::One;
use serde::{Deserialize, Serialize};

use crate::crypto::curve::Curve;
use crate::crypto::paillier::PublicKey;
use crate::crypto::{random_coprime_num, random_num, sha256_int, ModInt};
use crate::Result;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeProof {
    #[serde(rename = "Z", with = "crate::serde_support::hex_int")]
    pub z: BigInt,
    #[serde(rename = "U", with = "crate::serde_support::hex_int")]
    pub u: BigInt,
    #[serde(rename = "W", with = "crate::serde_support::hex_int")]
    pub w: BigInt,
    #[serde(rename = "S", with = "crate::serde_support::hex_int")]
    pub s: BigInt,
    #[serde(rename = "S1", with = "crate::serde_support::hex_int")]
    pub s1: BigInt,
    #[serde(rename = "S2", with = "crate::serde_support::hex_int")]
    pub s2: BigInt,
}

/// Prove that c = Enc_pk(m, r) encrypts m with |m| bounded by q^3.
pub fn prove(
    pk: &PublicKey,
    n_tilde: &BigInt,
    h1: &BigInt,
    h2: &BigInt,
    c: &BigInt,
    r: &BigInt,
    m: &BigInt,
) -> Result<RangeProof> {
    let q = Curve::Secp256k1.order();
    let q3 = q * q * q;
    let q_n_tilde = q * n_tilde;
    let q3_n_tilde = &q3 * n_tilde;

    let alpha = random_num(&q3);
    let beta = random_coprime_num(&pk.n);
    let gamma = random_num(&q3_n_tilde);
    let rho = random_num(&q_n_tilde);

    let mod_tilde = ModInt(n_tilde);
    // z = h1^m h2^rho mod N~
    let z = mod_tilde.mul(&mod_tilde.exp(h1, m), &mod_tilde.exp(h2, &rho));

    // u = g^alpha beta^N mod N^2
    let n2 = pk.n2();
    let mod_n2 = ModInt(&n2);
    let u = mod_n2.mul(&mod_n2.exp(&pk.g(), &alpha), &mod_n2.exp(&beta, &pk.n));

    // w = h1^alpha h2^gamma mod N~
    let w = mod_tilde.mul(&mod_tilde.exp(h1, &alpha), &mod_tilde.exp(h2, &gamma));

    let e = challenge(&pk.n, c, &z, &u, &w);

    let mod_n = ModInt(&pk.n);
    let s = mod_n.mul(&mod_n.exp(r, &e), &beta);
    let s1 = &e * m + &alpha;
    let s2 = &e * &rho + &gamma;

    Ok(RangeProof { z, u, w, s, s1, s2 })
}

pub fn verify(
    proof: &RangeProof,
    pk: &PublicKey,
    n_tilde: &BigInt,
    h1: &BigInt,
    h2: &BigInt,
    c: &BigInt,
) -> bool {
    let q = Curve::Secp256k1.order();
    let q3 = q * q * q;

    if proof.s1 > q3 {
        return false;
    }

    let e = challenge(&pk.n, c, &proof.z, &proof.u, &proof.w);
    let e_neg = -&e;

    // u == g^s1 s^N c^(-e) mod N^2
    let n2 = pk.n2();
    let mod_n2 = ModInt(&n2);
    let mut u = mod_n2.mul(&mod_n2.exp(&pk.g(), &proof.s1), &mod_n2.exp(&proof.s, &pk.n));
    u = mod_n2.mul(&u, &mod_n2.exp(c, &e_neg));
    if proof.u != u {
        return false;
    }

    // w == h1^s1 h2^s2 z^(-e) mod N~
    let mod_tilde = ModInt(n_tilde);
    let mut w = mod_tilde.mul(&mod_tilde.exp(h1, &proof.s1), &mod_tilde.exp(h2, &proof.s2));
    w = mod_tilde.mul(&w, &mod_tilde.exp(&proof.z, &e_neg));
    proof.w == w
}

fn challenge(n: &BigInt, c: &BigInt, z: &BigInt, u: &BigInt, w: &BigInt) -> BigInt {
    let q = Curve::Secp256k1.order();
    sha256_int(&[n, c, z, u, w]).mod_floor(q)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::paillier;
    use crate::crypto::pedersen;

    #[test]
    fn completeness() {
        let ped = pedersen::tests::test_parameters();
        let (_, pk) = paillier::tests::test_key_pair();
        let q = Curve::Secp256k1.order();
        let m = random_num(q);
        let (c, r) = pk.encrypt(&m).unwrap();
        let proof = prove(&pk, &ped.n_tilde, &ped.t, &ped.s, &c, &r, &m).unwrap();
        assert!(verify(&proof, &pk, &ped.n_tilde, &ped.t, &ped.s, &c));
    }

    #[test]
    fn oversized_witness_is_rejected() {
        let ped = pedersen::tests::test_parameters();
        let (_, pk) = paillier::tests::test_key_pair();
        let q = Curve::Secp256k1.order();
        let q4 = q * q * q * q;
        let m = random_num(&q4);
        let (c, r) = pk.encrypt(&m).unwrap();
        let proof = prove(&pk, &ped.n_tilde, &ped.t, &ped.s, &c, &r, &m).unwrap();
        assert!(!verify(&proof, &pk, &ped.n_tilde, &ped.t, &ped.s, &c));
    }

    #[test]
    fn wrong_ciphertext_is_rejected() {
        let ped = pedersen::tests::test_parameters();
        let (_, pk) = paillier::tests::test_key_pair();
        let q = Curve::Secp256k1.order();
        let m = random_num(q);
        let (c, r) = pk.encrypt(&m).unwrap();
        let (c_other, _) = pk.encrypt(&m).unwrap();
        let proof = prove(&pk, &ped.n_tilde, &ped.t, &ped.s, &c, &r, &m).unwrap();
        assert!(!verify(&proof, &pk, &ped.n_tilde, &ped.t, &ped.s, &c_other));
    }
}
