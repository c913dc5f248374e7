//! Paillier affine operation with group commitment in range
//! (eprint 2020/492 §4.2): D = C^x (1+N)^y rho^N mod N^2 with x and y
//! committed as curve points and range-bounded. y lives in the elliptic
//! curve group rather than a second Paillier group.

use num_bigint_dig::BigInt;
use num_integer::Integer;
use num_traits::One;
use serde::{Deserialize, Serialize};

use crate::crypto::curve::{Curve, EcPoint};
use crate::crypto::pedersen::PedersenParameters;
use crate::crypto::{random_coprime_num, random_num, sha256_int, ModInt};
use crate::Result;

pub const L0: usize = 512;
pub const L1: usize = 768;
pub const EPSILON: usize = 768;

#[derive(Clone, Debug, PartialEq)]
pub struct AffGStatement {
    /// Paillier modulus.
    pub n: BigInt,
    /// Input ciphertext.
    pub c: BigInt,
    /// Output ciphertext, claimed affine image of C.
    pub d: BigInt,
    /// X = x G.
    pub x: EcPoint,
    /// Y = y G.
    pub y: EcPoint,
}

#[derive(Clone, Debug)]
pub struct AffGWitness {
    pub x: BigInt,
    pub y: BigInt,
    pub rho: BigInt,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AffGProof {
    #[serde(rename = "A", with = "crate::serde_support::hex_int")]
    pub a: BigInt,
    #[serde(rename = "E", with = "crate::serde_support::hex_int")]
    pub e: BigInt,
    #[serde(rename = "S", with = "crate::serde_support::hex_int")]
    pub s: BigInt,
    #[serde(rename = "F", with = "crate::serde_support::hex_int")]
    pub f: BigInt,
    #[serde(rename = "T", with = "crate::serde_support::hex_int")]
    pub t: BigInt,
    #[serde(rename = "Z1", with = "crate::serde_support::hex_int")]
    pub z1: BigInt,
    #[serde(rename = "Z2", with = "crate::serde_support::hex_int")]
    pub z2: BigInt,
    #[serde(rename = "Z3", with = "crate::serde_support::hex_int")]
    pub z3: BigInt,
    #[serde(rename = "Z4", with = "crate::serde_support::hex_int")]
    pub z4: BigInt,
    #[serde(rename = "W", with = "crate::serde_support::hex_int")]
    pub w: BigInt,
    #[serde(rename = "Bx")]
    pub bx: EcPoint,
    #[serde(rename = "By")]
    pub by: EcPoint,
    #[serde(rename = "X")]
    pub x: EcPoint,
    #[serde(rename = "Y")]
    pub y: EcPoint,
}

/// Prove the affine relation under the verifier's Pedersen parameters.
pub fn prove(
    ped: &PedersenParameters,
    st: &AffGStatement,
    wit: &AffGWitness,
) -> Result<AffGProof> {
    let n2 = &st.n * &st.n;
    let mod_n2 = ModInt(&n2);

    let range_l0_eps = BigInt::one() << (L0 + EPSILON);
    let range_l1_eps = BigInt::one() << (L1 + EPSILON);
    let range_l0 = BigInt::one() << L0;

    let alpha = random_num(&range_l0_eps);
    let beta = random_num(&range_l1_eps);
    let r = random_coprime_num(&st.n);
    let gamma = random_num(&(&range_l0_eps * &ped.n_tilde));
    let m = random_num(&(&range_l0 * &ped.n_tilde));
    let delta = random_num(&(&range_l0_eps * &ped.n_tilde));
    let mu = random_num(&(&range_l0 * &ped.n_tilde));

    // A = C^alpha (1+N)^beta r^N mod N^2
    let mut a = mod_n2.exp(&st.c, &alpha);
    a = mod_n2.mul(&a, &mod_n2.exp(&(&st.n + BigInt::one()), &beta));
    a = mod_n2.mul(&a, &mod_n2.exp(&r, &st.n));

    let bx = EcPoint::scalar_to_point(Curve::Secp256k1, &alpha);
    let by = EcPoint::scalar_to_point(Curve::Secp256k1, &beta);

    let e_cmt = ped.commit(&alpha, &gamma);
    let s_cmt = ped.commit(&wit.x, &m);
    let f_cmt = ped.commit(&beta, &delta);
    let t_cmt = ped.commit(&wit.y, &mu);

    let e = challenge(st, &a, &bx, &by, &e_cmt, &s_cmt, &f_cmt, &t_cmt);

    Ok(AffGProof {
        z1: &alpha + &e * &wit.x,
        z2: &beta + &e * &wit.y,
        z3: &gamma + &e * &m,
        z4: &delta + &e * &mu,
        w: ModInt(&st.n).mul(&r, &ModInt(&st.n).exp(&wit.rho, &e)),
        a,
        e: e_cmt,
        s: s_cmt,
        f: f_cmt,
        t: t_cmt,
        bx,
        by,
        x: st.x.clone(),
        y: st.y.clone(),
    })
}

pub fn verify(ped: &PedersenParameters, proof: &AffGProof, st: &AffGStatement) -> bool {
    let n2 = &st.n * &st.n;
    let mod_n2 = ModInt(&n2);
    let e = challenge(st, &proof.a, &proof.bx, &proof.by, &proof.e, &proof.s, &proof.f, &proof.t);

    // C^z1 (1+N)^z2 w^N == A D^e mod N^2
    let mut lhs = mod_n2.exp(&st.c, &proof.z1);
    lhs = mod_n2.mul(&lhs, &mod_n2.exp(&(&st.n + BigInt::one()), &proof.z2));
    lhs = mod_n2.mul(&lhs, &mod_n2.exp(&proof.w, &st.n));
    let rhs = mod_n2.mul(&proof.a, &mod_n2.exp(&st.d, &e));
    if lhs != rhs {
        return false;
    }

    // z1 G == Bx + e X
    let lhs = EcPoint::scalar_to_point(Curve::Secp256k1, &proof.z1);
    let rhs = st.x.scalar_mult(&e).and_then(|xe| proof.bx.add(&xe));
    if rhs.map(|rhs| lhs != rhs).unwrap_or(true) {
        return false;
    }

    // z2 G == By + e Y
    let lhs = EcPoint::scalar_to_point(Curve::Secp256k1, &proof.z2);
    let rhs = st.y.scalar_mult(&e).and_then(|ye| proof.by.add(&ye));
    if rhs.map(|rhs| lhs != rhs).unwrap_or(true) {
        return false;
    }

    // commit(z1, z3) == E S^e mod N~
    let mod_tilde = ModInt(&ped.n_tilde);
    let lhs = ped.commit(&proof.z1, &proof.z3);
    let rhs = mod_tilde.mul(&proof.e, &mod_tilde.exp(&proof.s, &e));
    if lhs != rhs {
        return false;
    }

    // commit(z2, z4) == F T^e mod N~
    let lhs = ped.commit(&proof.z2, &proof.z4);
    let rhs = mod_tilde.mul(&proof.f, &mod_tilde.exp(&proof.t, &e));
    if lhs != rhs {
        return false;
    }

    proof.z1 < BigInt::one() << (L0 + EPSILON) && proof.z2 < BigInt::one() << (L1 + EPSILON)
}

#[allow(clippy::too_many_arguments)]
fn challenge(
    st: &AffGStatement,
    a: &BigInt,
    bx: &EcPoint,
    by: &EcPoint,
    e_cmt: &BigInt,
    s_cmt: &BigInt,
    f_cmt: &BigInt,
    t_cmt: &BigInt,
) -> BigInt {
    let q = Curve::Secp256k1.order();
    sha256_int(&[
        &st.n, &st.c, &st.d, &st.x.x, &st.y.x, a, &bx.x, &by.x, e_cmt, s_cmt, f_cmt, t_cmt,
    ])
    .mod_floor(q)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::paillier;
    use crate::crypto::pedersen;

    fn setup() -> (PedersenParameters, BigInt, BigInt) {
        let ped = pedersen::tests::test_parameters();
        let (_, pub_key) = paillier::tests::test_key_pair();
        let n2 = pub_key.n2();
        (ped, pub_key.n, n2)
    }

    fn affine_output(n: &BigInt, n2: &BigInt, c: &BigInt, wit: &AffGWitness) -> BigInt {
        let modint = ModInt(n2);
        let mut d = modint.exp(c, &wit.x);
        d = modint.mul(&d, &modint.exp(&(n + BigInt::one()), &wit.y));
        modint.mul(&d, &modint.exp(&wit.rho, n))
    }

    #[test]
    fn completeness() {
        let (ped, n, n2) = setup();
        let wit = AffGWitness {
            x: random_num(&(BigInt::one() << L0)),
            y: random_num(&(BigInt::one() << L1)),
            rho: random_coprime_num(&n),
        };
        let c = random_num(&n2);
        let d = affine_output(&n, &n2, &c, &wit);
        let st = AffGStatement {
            n: n.clone(),
            c,
            d,
            x: EcPoint::scalar_to_point(Curve::Secp256k1, &wit.x),
            y: EcPoint::scalar_to_point(Curve::Secp256k1, &wit.y),
        };
        let proof = prove(&ped, &st, &wit).unwrap();
        assert!(verify(&ped, &proof, &st));
    }

    #[test]
    fn inconsistent_witness_is_rejected() {
        let (ped, n, n2) = setup();
        let wit = AffGWitness {
            x: random_num(&(BigInt::one() << L0)),
            y: random_num(&(BigInt::one() << L1)),
            rho: random_coprime_num(&n),
        };
        let c = random_num(&n2);
        let d = affine_output(&n, &n2, &c, &wit);
        let st = AffGStatement {
            n: n.clone(),
            c,
            d,
            x: EcPoint::scalar_to_point(Curve::Secp256k1, &wit.x),
            y: EcPoint::scalar_to_point(Curve::Secp256k1, &wit.y),
        };
        // prover claims a different x than the one inside D
        let bad_wit = AffGWitness { x: random_num(&n), ..wit };
        let proof = prove(&ped, &st, &bad_wit).unwrap();
        assert!(!verify(&ped, &proof, &st));
    }

    #[test]
    fn tampered_output_ciphertext_is_rejected() {
        let (ped, n, n2) = setup();
        let wit = AffGWitness {
            x: random_num(&(BigInt::one() << L0)),
            y: random_num(&(BigInt::one() << L1)),
            rho: random_coprime_num(&n),
        };
        let c = random_num(&n2);
        let d = affine_output(&n, &n2, &c, &wit);
        let mut st = AffGStatement {
            n: n.clone(),
            c,
            d,
            x: EcPoint::scalar_to_point(Curve::Secp256k1, &wit.x),
            y: EcPoint::scalar_to_point(Curve::Secp256k1, &wit.y),
        };
        let proof = prove(&ped, &st, &wit).unwrap();
        st.d = ModInt(&n2).mul(&st.d, &st.c);
        assert!(!verify(&ped, &proof, &st));
    }
}
