//! Schnorr Σ-proof of knowledge of a discrete logarithm.
//!
//! Two transcript flavours: the plain one used during key generation, and a
//! session-id-bound one used by the ECDSA signing rounds. The two are not
//! interchangeable; a signing-session proof must not verify under a
//! different session.

use num_bigint_dig::BigInt;
use num_integer::Integer;
use serde::{Deserialize, Serialize};

use crate::crypto::curve::EcPoint;
use crate::crypto::{random_num, sha256_int};
use crate::Result;

/// Proof (R, s) for the statement X = x G: s = r + H(transcript) x.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Proof {
    #[serde(rename = "r")]
    pub r: EcPoint,
    #[serde(rename = "s", with = "crate::serde_support::hex_int")]
    pub s: BigInt,
}

/// Prove knowledge of x with X = x G.
pub fn prove(x: &BigInt, big_x: &EcPoint) -> Result<Proof> {
    prove_inner(None, x, big_x)
}

/// Prove knowledge of x with X = x G, binding the proof to a session id.
pub fn prove_with_id(session_id: &BigInt, x: &BigInt, big_x: &EcPoint) -> Result<Proof> {
    prove_inner(Some(session_id), x, big_x)
}

fn prove_inner(session_id: Option<&BigInt>, x: &BigInt, big_x: &EcPoint) -> Result<Proof> {
    let q = big_x.curve.order();
    let r = random_num(q);
    let big_r = EcPoint::scalar_to_point(big_x.curve, &r);
    let h = challenge(session_id, big_x, &big_r);
    let s = (&r + h * x).mod_floor(q);
    Ok(Proof { r: big_r, s })
}

/// Check s G == R + H(transcript) X.
pub fn verify(proof: &Proof, big_x: &EcPoint) -> bool {
    verify_inner(None, proof, big_x)
}

/// Session-bound variant of [`verify`].
pub fn verify_with_id(session_id: &BigInt, proof: &Proof, big_x: &EcPoint) -> bool {
    verify_inner(Some(session_id), proof, big_x)
}

fn verify_inner(session_id: Option<&BigInt>, proof: &Proof, big_x: &EcPoint) -> bool {
    if proof.r.curve != big_x.curve || !proof.r.is_on_curve() {
        return false;
    }
    let h = challenge(session_id, big_x, &proof.r);
    let sg = EcPoint::scalar_to_point(big_x.curve, &proof.s);
    big_x
        .scalar_mult(&h)
        .and_then(|xh| proof.r.add(&xh))
        .map(|rhs| sg == rhs)
        .unwrap_or(false)
}

fn challenge(session_id: Option<&BigInt>, big_x: &EcPoint, big_r: &EcPoint) -> BigInt {
    let q = big_x.curve.order();
    let h = match session_id {
        Some(sid) => sha256_int(&[sid, &big_x.x, &big_x.y, &big_r.x, &big_r.y]),
        None => sha256_int(&[&big_x.x, &big_x.y, &big_r.x, &big_r.y]),
    };
    h.mod_floor(q)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::curve::Curve;
    use num_traits::One;

    #[test]
    fn honest_proof_verifies() {
        for curve in [Curve::Secp256k1, Curve::Ed25519] {
            let x = random_num(curve.order());
            let big_x = EcPoint::scalar_to_point(curve, &x);
            let proof = prove(&x, &big_x).unwrap();
            assert!(verify(&proof, &big_x));
        }
    }

    #[test]
    fn tampered_proof_is_rejected() {
        let curve = Curve::Secp256k1;
        let x = random_num(curve.order());
        let big_x = EcPoint::scalar_to_point(curve, &x);
        let proof = prove(&x, &big_x).unwrap();

        let mut bad = proof.clone();
        bad.s += BigInt::one();
        assert!(!verify(&bad, &big_x));

        let mut bad = proof.clone();
        bad.r = EcPoint::scalar_to_point(curve, &BigInt::from(17));
        assert!(!verify(&bad, &big_x));

        // statement shifted by delta * G
        let shifted = big_x
            .add(&EcPoint::scalar_to_point(curve, &BigInt::one()))
            .unwrap();
        assert!(!verify(&proof, &shifted));
    }

    #[test]
    fn session_binding_is_enforced() {
        let curve = Curve::Secp256k1;
        let sid = BigInt::from(987654321u64);
        let x = random_num(curve.order());
        let big_x = EcPoint::scalar_to_point(curve, &x);
        let proof = prove_with_id(&sid, &x, &big_x).unwrap();
        assert!(verify_with_id(&sid, &proof, &big_x));
        assert!(!verify_with_id(&(sid.clone() + BigInt::one()), &proof, &big_x));
        assert!(!verify(&proof, &big_x));
    }

    #[test]
    fn zero_witness_statement() {
        // refresh parties that contribute nothing still prove a discrete log
        let curve = Curve::Secp256k1;
        let zero = BigInt::from(0);
        let identity = EcPoint::scalar_to_point(curve, &zero);
        let proof = prove(&zero, &identity).unwrap();
        assert!(verify(&proof, &identity));
    }

    #[test]
    fn proof_json_round_trip() {
        let curve = Curve::Secp256k1;
        let x = random_num(curve.order());
        let big_x = EcPoint::scalar_to_point(curve, &x);
        let proof = prove(&x, &big_x).unwrap();
        let text = serde_json::to_string(&proof).unwrap();
        let back: Proof = serde_json::from_str(&text).unwrap();
        assert_eq!(back, proof);
        assert!(verify(&back, &big_x));
    }
}
