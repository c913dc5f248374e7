//! Paillier encryption range proofs: a ciphertext under N0 encrypts a value
//! in [0, 2^l), witnessed through a Pedersen commitment. The group-element
//! variant additionally pins the plaintext to a supplied curve point
//! X = x G.

use num_bigint_dig::BigInt;
use num_integer::Integer;
use num_traits::One;
use serde::{Deserialize, Serialize};

use crate::crypto::curve::EcPoint;
use crate::crypto::paillier::PublicKey;
use crate::crypto::pedersen::PedersenParameters;
use crate::crypto::zkp::SecurityParameter;
use crate::crypto::{is_in_interval, random_coprime_num, random_num, sha256_int, ModInt};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaillierEncryptionRangeProof {
    #[serde(rename = "N0", with = "crate::serde_support::hex_int")]
    pub n0: BigInt,
    #[serde(rename = "C", with = "crate::serde_support::hex_int")]
    pub c: BigInt,
    #[serde(rename = "S", with = "crate::serde_support::hex_int")]
    pub s: BigInt,
    #[serde(rename = "A", with = "crate::serde_support::hex_int")]
    pub a: BigInt,
    #[serde(rename = "D", with = "crate::serde_support::hex_int")]
    pub d: BigInt,
    #[serde(rename = "Z1", with = "crate::serde_support::hex_int")]
    pub z1: BigInt,
    #[serde(rename = "Z2", with = "crate::serde_support::hex_int")]
    pub z2: BigInt,
    #[serde(rename = "Z3", with = "crate::serde_support::hex_int")]
    pub z3: BigInt,
    #[serde(rename = "SecurityParams")]
    pub params: SecurityParameter,
    #[serde(rename = "L")]
    pub l: usize,
}

/// Prove that ciphertext c = Enc_{n0}(x, rho) encrypts x in [0, 2^l).
pub fn prove(
    n0: &BigInt,
    c: &BigInt,
    x: &BigInt,
    rho: &BigInt,
    l: usize,
    ped: &PedersenParameters,
    params: &SecurityParameter,
) -> crate::Result<PaillierEncryptionRangeProof> {
    let (proof, _) = prove_parts(n0, c, x, rho, l, ped, params, None)?;
    Ok(proof)
}

#[allow(clippy::too_many_arguments)]
fn prove_parts(
    n0: &BigInt,
    c: &BigInt,
    x: &BigInt,
    rho: &BigInt,
    l: usize,
    ped: &PedersenParameters,
    params: &SecurityParameter,
    x_point: Option<&EcPoint>,
) -> crate::Result<(PaillierEncryptionRangeProof, Option<EcPoint>)> {
    let range_l_eps = BigInt::one() << (l + params.epsilon);
    let range_l = BigInt::one() << l;

    let alpha = random_num(&range_l_eps);
    let mu = random_num(&(&range_l * &ped.n_tilde));
    let r = random_coprime_num(n0);
    let gamma = random_num(&(&range_l_eps * &ped.n_tilde));

    let pub_key = PublicKey { n: n0.clone() };
    let s = ped.commit(x, &mu);
    let a = pub_key.encrypt_with_r(&alpha, &r)?;
    let d = ped.commit(&alpha, &gamma);

    let y_point = match x_point {
        Some(point) => Some(EcPoint::scalar_to_point(point.curve, &alpha)),
        None => None,
    };
    let e = challenge(&s, &a, &d, n0, c, x_point, y_point.as_ref(), params);

    let proof = PaillierEncryptionRangeProof {
        n0: n0.clone(),
        c: c.clone(),
        z1: &alpha + &e * x,
        z2: ModInt(n0).mul(&r, &ModInt(n0).exp(rho, &e)),
        z3: &gamma + &e * &mu,
        s,
        a,
        d,
        params: *params,
        l,
    };
    Ok((proof, y_point))
}

/// Verify a plain encryption range proof.
pub fn verify(proof: &PaillierEncryptionRangeProof, ped: &PedersenParameters) -> bool {
    verify_parts(proof, ped, None, None)
}

fn verify_parts(
    proof: &PaillierEncryptionRangeProof,
    ped: &PedersenParameters,
    x_point: Option<&EcPoint>,
    y_point: Option<&EcPoint>,
) -> bool {
    let range_l_eps = BigInt::one() << (proof.l + proof.params.epsilon);
    let e = challenge(
        &proof.s, &proof.a, &proof.d, &proof.n0, &proof.c, x_point, y_point, &proof.params,
    );

    let pub_key = PublicKey { n: proof.n0.clone() };
    let n0_sqr = pub_key.n2();
    let modint = ModInt(&n0_sqr);

    // (1 + N0)^z1 z2^N0 == A * C^e mod N0^2
    let gm = modint.exp(&pub_key.g(), &proof.z1);
    let rn = modint.exp(&proof.z2, &proof.n0);
    let lhs = modint.mul(&gm, &rn);
    let rhs = modint.mul(&proof.a, &modint.exp(&proof.c, &e));
    if lhs != rhs {
        return false;
    }

    // S^z1 T^z3 == D * S_cmt^e mod N~
    let mod_tilde = ModInt(&ped.n_tilde);
    let lhs = ped.commit(&proof.z1, &proof.z3);
    let rhs = mod_tilde.mul(&proof.d, &mod_tilde.exp(&proof.s, &e));
    if lhs != rhs {
        return false;
    }

    // group-element binding: z1 G == Y + e X
    if let (Some(x_point), Some(y_point)) = (x_point, y_point) {
        let lhs = EcPoint::scalar_to_point(x_point.curve, &proof.z1);
        let rhs = x_point
            .scalar_mult(&e)
            .and_then(|xe| y_point.add(&xe));
        match rhs {
            Ok(rhs) if lhs == rhs => {}
            _ => return false,
        }
    }

    is_in_interval(&proof.z1, &range_l_eps)
}

#[allow(clippy::too_many_arguments)]
fn challenge(
    s: &BigInt,
    a: &BigInt,
    d: &BigInt,
    n0: &BigInt,
    c: &BigInt,
    x_point: Option<&EcPoint>,
    y_point: Option<&EcPoint>,
    params: &SecurityParameter,
) -> BigInt {
    let range_q = BigInt::one() << params.q_bitlen;
    let mut inputs: Vec<&BigInt> = vec![s, a, d, n0, c];
    if let (Some(x_point), Some(y_point)) = (x_point, y_point) {
        inputs.extend([&x_point.x, &x_point.y, &y_point.x, &y_point.y]);
    }
    sha256_int(&inputs).mod_floor(&range_q)
}

/// Range proof bound to a curve point: C encrypts x, x in [0, 2^l) and
/// X = x G.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupElementRangeProof {
    #[serde(rename = "Proof")]
    pub proof: PaillierEncryptionRangeProof,
    /// X = x G, the claimed public image of the plaintext.
    #[serde(rename = "X")]
    pub x_point: EcPoint,
    /// Y = alpha G, the masked companion point.
    #[serde(rename = "Y")]
    pub y_point: EcPoint,
}

#[allow(clippy::too_many_arguments)]
pub fn prove_group_element(
    n0: &BigInt,
    c: &BigInt,
    x: &BigInt,
    rho: &BigInt,
    l: usize,
    x_point: &EcPoint,
    ped: &PedersenParameters,
    params: &SecurityParameter,
) -> crate::Result<GroupElementRangeProof> {
    let (proof, y_point) = prove_parts(n0, c, x, rho, l, ped, params, Some(x_point))?;
    let y_point = y_point.ok_or_else(|| {
        crate::Error::ArithmeticError("companion point missing from range proof".into())
    })?;
    Ok(GroupElementRangeProof { proof, x_point: x_point.clone(), y_point })
}

pub fn verify_group_element(proof: &GroupElementRangeProof, ped: &PedersenParameters) -> bool {
    if proof.x_point.curve != proof.y_point.curve
        || !proof.x_point.is_on_curve()
        || !proof.y_point.is_on_curve()
    {
        return false;
    }
    verify_parts(&proof.proof, ped, Some(&proof.x_point), Some(&proof.y_point))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::curve::Curve;
    use crate::crypto::paillier;
    use crate::crypto::pedersen;

    const PARAMS: SecurityParameter = SecurityParameter { q_bitlen: 64, epsilon: 128 };
    const L: usize = 16;

    #[test]
    fn plain_completeness_and_soundness() {
        let ped = pedersen::tests::test_parameters();
        let (_, pub_key) = paillier::tests::test_key_pair();
        let x = random_num(&(BigInt::one() << L));
        let (c, rho) = pub_key.encrypt(&x).unwrap();

        let proof = prove(&pub_key.n, &c, &x, &rho, L, &ped, &PARAMS).unwrap();
        assert!(verify(&proof, &ped));

        // ciphertext of a different plaintext
        let (c_bad, rho_bad) = pub_key.encrypt(&(&x + BigInt::one())).unwrap();
        let proof = prove(&pub_key.n, &c_bad, &x, &rho_bad, L, &ped, &PARAMS).unwrap();
        assert!(!verify(&proof, &ped));
    }

    #[test]
    fn plain_out_of_range_witness_is_rejected() {
        let ped = pedersen::tests::test_parameters();
        let (_, pub_key) = paillier::tests::test_key_pair();
        let x = random_num(&(BigInt::one() << (L + 2 * PARAMS.epsilon)));
        let (c, rho) = pub_key.encrypt(&x).unwrap();
        let proof = prove(&pub_key.n, &c, &x, &rho, L, &ped, &PARAMS).unwrap();
        assert!(!verify(&proof, &ped));
    }

    #[test]
    fn group_element_completeness() {
        let ped = pedersen::tests::test_parameters();
        let (_, pub_key) = paillier::tests::test_key_pair();
        let x = random_num(&(BigInt::one() << L));
        let x_point = EcPoint::scalar_to_point(Curve::Secp256k1, &x);
        let (c, rho) = pub_key.encrypt(&x).unwrap();
        let proof =
            prove_group_element(&pub_key.n, &c, &x, &rho, L, &x_point, &ped, &PARAMS).unwrap();
        assert!(verify_group_element(&proof, &ped));
    }

    #[test]
    fn group_element_wrong_point_is_rejected() {
        let ped = pedersen::tests::test_parameters();
        let (_, pub_key) = paillier::tests::test_key_pair();
        let x = random_num(&(BigInt::one() << L));
        let x_point = EcPoint::scalar_to_point(Curve::Secp256k1, &x);
        let (c, rho) = pub_key.encrypt(&x).unwrap();
        let mut proof =
            prove_group_element(&pub_key.n, &c, &x, &rho, L, &x_point, &ped, &PARAMS).unwrap();
        proof.x_point = EcPoint::scalar_to_point(Curve::Secp256k1, &(&x + BigInt::one()));
        assert!(!verify_group_element(&proof, &ped));
    }

    #[test]
    fn group_element_wrong_ciphertext_is_rejected() {
        let ped = pedersen::tests::test_parameters();
        let (_, pub_key) = paillier::tests::test_key_pair();
        let x = random_num(&(BigInt::one() << L));
        let x_point = EcPoint::scalar_to_point(Curve::Secp256k1, &x);
        let (c_bad, rho_bad) = pub_key.encrypt(&(&x + BigInt::one())).unwrap();
        let proof =
            prove_group_element(&pub_key.n, &c_bad, &x, &rho_bad, L, &x_point, &ped, &PARAMS)
                .unwrap();
        assert!(!verify_group_element(&proof, &ped));
    }
}
