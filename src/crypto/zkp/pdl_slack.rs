//! Proof of discrete-log equality with a Paillier plaintext, with range
//! slack x in [-q^3, q^3] (proof PIi of eprint 2016/013). Kept for
//! compatibility with the earlier setup message; the current exchange uses
//! the group-element encryption range proof instead.

use num_bigint_dig::BigInt;
use num_traits::One;
use serde::{Deserialize, Serialize};

use crate::crypto::curve::{Curve, EcPoint};
use crate::crypto::{random_coprime_num, random_num, sha256_int, ModInt};
use crate::Result;

#[derive(Clone, Debug, PartialEq)]
pub struct PdlWSlackStatement {
    pub cipher_text: BigInt,
    pub n: BigInt,
    pub q_point: EcPoint,
    pub g_point: EcPoint,
    pub h1: BigInt,
    pub h2: BigInt,
    pub n_tilde: BigInt,
}

#[derive(Clone, Debug)]
pub struct PdlWSlackWitness {
    pub x: BigInt,
    pub r: BigInt,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PdlWSlackProof {
    #[serde(rename = "Z", with = "crate::serde_support::hex_int")]
    pub z: BigInt,
    #[serde(rename = "U1")]
    pub u1: EcPoint,
    #[serde(rename = "U2", with = "crate::serde_support::hex_int")]
    pub u2: BigInt,
    #[serde(rename = "U3", with = "crate::serde_support::hex_int")]
    pub u3: BigInt,
    #[serde(rename = "S1", with = "crate::serde_support::hex_int")]
    pub s1: BigInt,
    #[serde(rename = "S2", with = "crate::serde_support::hex_int")]
    pub s2: BigInt,
    #[serde(rename = "S3", with = "crate::serde_support::hex_int")]
    pub s3: BigInt,
}

/// c = h1^x h2^r mod n, the unknown-order commitment both sides use.
fn commitment_unknown_order(
    h1: &BigInt,
    h2: &BigInt,
    n: &BigInt,
    x: &BigInt,
    r: &BigInt,
) -> BigInt {
    let modint = ModInt(n);
    modint.mul(&modint.exp(h1, x), &modint.exp(h2, r))
}

pub fn prove(wit: &PdlWSlackWitness, st: &PdlWSlackStatement) -> Result<PdlWSlackProof> {
    let q = Curve::Secp256k1.order();
    let q3 = q * q * q;
    let q_n_tilde = q * &st.n_tilde;
    let q3_n_tilde = &q3 * &st.n_tilde;

    let alpha = random_num(&q3);
    let beta = random_coprime_num(&st.n);
    let rho = random_num(&q_n_tilde);
    let gamma = random_num(&q3_n_tilde);

    let n_one = &st.n + BigInt::one();
    let n_square = &st.n * &st.n;

    let z = commitment_unknown_order(&st.h1, &st.h2, &st.n_tilde, &wit.x, &rho);
    let u1 = st.g_point.scalar_mult(&alpha)?;
    let u2 = commitment_unknown_order(&n_one, &beta, &n_square, &alpha, &st.n);
    let u3 = commitment_unknown_order(&st.h1, &st.h2, &st.n_tilde, &alpha, &gamma);

    let e = challenge(st, &z, &u1, &u2, &u3);

    let s1 = &e * &wit.x + &alpha;
    let s2 = commitment_unknown_order(&wit.r, &beta, &st.n, &e, &BigInt::one());
    let s3 = &e * &rho + &gamma;

    Ok(PdlWSlackProof { z, u1, u2, u3, s1, s2, s3 })
}

pub fn verify(proof: &PdlWSlackProof, st: &PdlWSlackStatement) -> bool {
    let q = Curve::Secp256k1.order();
    let e = challenge(st, &proof.z, &proof.u1, &proof.u2, &proof.u3);

    // u1 == s1 G + (q - e) Q
    let u1 = st
        .g_point
        .scalar_mult(&proof.s1)
        .and_then(|g_s1| st.q_point.scalar_mult(&(q - &e)).and_then(|qe| g_s1.add(&qe)));
    let u1 = match u1 {
        Ok(point) => point,
        Err(_) => return false,
    };

    let n_one = &st.n + BigInt::one();
    let n_square = &st.n * &st.n;
    let e_neg = -&e;

    // u2 == (1+N)^s1 s2^N c^(-e) mod N^2
    let u2_tmp = commitment_unknown_order(&n_one, &proof.s2, &n_square, &proof.s1, &st.n);
    let u2 = commitment_unknown_order(&u2_tmp, &st.cipher_text, &n_square, &BigInt::one(), &e_neg);

    // u3 == h1^s1 h2^s3 z^(-e) mod N~
    let u3_tmp = commitment_unknown_order(&st.h1, &st.h2, &st.n_tilde, &proof.s1, &proof.s3);
    let u3 = commitment_unknown_order(&u3_tmp, &proof.z, &st.n_tilde, &BigInt::one(), &e_neg);

    proof.u1 == u1 && proof.u2 == u2 && proof.u3 == u3
}

fn challenge(
    st: &PdlWSlackStatement,
    z: &BigInt,
    u1: &EcPoint,
    u2: &BigInt,
    u3: &BigInt,
) -> BigInt {
    sha256_int(&[
        &st.g_point.x,
        &st.g_point.y,
        &st.q_point.x,
        &st.q_point.y,
        &st.cipher_text,
        z,
        &u1.x,
        &u1.y,
        u2,
        u3,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::paillier;
    use crate::crypto::pedersen;

    fn setup() -> (PdlWSlackStatement, PdlWSlackWitness) {
        let ped = pedersen::tests::test_parameters();
        let (_, pub_key) = paillier::tests::test_key_pair();
        let q = Curve::Secp256k1.order();
        let x = crate::crypto::random_num(q);
        let (cipher_text, r) = pub_key.encrypt(&x).unwrap();
        let g_point = EcPoint::scalar_to_point(Curve::Secp256k1, &BigInt::one());
        let q_point = EcPoint::scalar_to_point(Curve::Secp256k1, &x);
        (
            PdlWSlackStatement {
                cipher_text,
                n: pub_key.n,
                q_point,
                g_point,
                h1: ped.t,
                h2: ped.s,
                n_tilde: ped.n_tilde,
            },
            PdlWSlackWitness { x, r },
        )
    }

    #[test]
    fn completeness() {
        let (st, wit) = setup();
        let proof = prove(&wit, &st).unwrap();
        assert!(verify(&proof, &st));
    }

    #[test]
    fn wrong_public_point_is_rejected() {
        let (mut st, wit) = setup();
        let proof = prove(&wit, &st).unwrap();
        st.q_point = EcPoint::scalar_to_point(Curve::Secp256k1, &(&wit.x + BigInt::one()));
        assert!(!verify(&proof, &st));
    }

    #[test]
    fn tampered_response_is_rejected() {
        let (st, wit) = setup();
        let mut proof = prove(&wit, &st).unwrap();
        proof.s1 += BigInt::one();
        assert!(!verify(&proof, &st));
    }
}
