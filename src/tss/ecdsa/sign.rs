//! Two-party ECDSA signing, three strict rounds over the 2-of-2 setup.
//!
//! The session id H(pub.x || pub.y || digest) binds every commitment and
//! Schnorr proof to this public key and message. P2 never learns the
//! signature: it evaluates E[(h + x r)/k2] homomorphically on E(x1) and must
//! prove the affine operation it applied. P1 decrypts, assembles (r, s),
//! normalises to low-s and verifies against the public key before releasing
//! anything. Either verification failing bans the key from further signing
//! (CVE-2023-33242). Nonces are single-use; a context cannot be rerun.

use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{Signature, VerifyingKey};
use k256::EncodedPoint;
use num_bigint_dig::BigInt;
use num_integer::Integer;
use num_traits::Zero;
use zeroize::Zeroize;

use crate::crypto::commitment::{Commitment, HashCommitment, Witness};
use crate::crypto::curve::{Curve, EcPoint};
use crate::crypto::paillier::{PrivateKey, PublicKey};
use crate::crypto::pedersen::PedersenParameters;
use crate::crypto::schnorr;
use crate::crypto::zkp::aff_g::{self, AffGProof, AffGStatement, AffGWitness};
use crate::crypto::{bytes_be, random_coprime_num, random_num, sha256_int, ModInt};
use crate::tss::ecdsa::ban;
use crate::{Error, Result};

/// Ban-list key for a public key: hex of its x coordinate.
pub fn ban_id(public_key: &EcPoint) -> String {
    hex::encode(bytes_be(&public_key.x))
}

/// Round 1, P1 to P2: the nonce commitment.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct SignStep1Data {
    #[serde(rename = "c", with = "crate::serde_support::hex_int")]
    pub c: Commitment,
}

/// Round 1 reply, P2 to P1: R2 and its session-bound proof.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct SignStep2Data {
    #[serde(rename = "proof")]
    pub proof: schnorr::Proof,
    #[serde(rename = "r2")]
    pub r2: EcPoint,
}

/// Round 2, P1 to P2: P1's proof and the decommitment witness.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct SignStep3Data {
    #[serde(rename = "proof")]
    pub proof: schnorr::Proof,
    #[serde(rename = "witness", with = "crate::serde_support::hex_int_vec")]
    pub witness: Witness,
}

/// Round 2 reply, P2 to P1: the evaluated ciphertext and its affine proof.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct SignStep4Data {
    #[serde(rename = "proof")]
    pub proof: AffGProof,
    #[serde(rename = "cipher", with = "crate::serde_support::hex_int")]
    pub cipher: BigInt,
}

/// H(pub.x || pub.y || digest-as-integer).
fn session_id(public_key: &EcPoint, digest: &[u8]) -> BigInt {
    let data = crate::crypto::bigint_from_bytes(digest);
    sha256_int(&[&public_key.x, &public_key.y, &data])
}

/// Fold a digest into the scalar field the standard ECDSA way: keep the
/// leftmost order-width bits.
fn calculate_m(hash: &[u8]) -> BigInt {
    let order_bits = 256;
    let order_bytes = (order_bits + 7) / 8;
    let hash = if hash.len() > order_bytes { &hash[..order_bytes] } else { hash };
    let mut m = crate::crypto::bigint_from_bytes(hash);
    let bits = hash.len() * 8;
    if bits > order_bits {
        m = m >> (bits - order_bits);
    }
    m
}

fn decode_digest(message: &str) -> Result<Vec<u8>> {
    Ok(hex::decode(message)?)
}

/// P1: holds the Paillier private key and the encrypted share.
pub struct P1Context {
    session_id: BigInt,
    public_key: EcPoint,
    pai_pri_key: PrivateKey,
    message: String,
    e_x1: BigInt,
    ped1: PedersenParameters,

    round_number: usize,
    k1: BigInt,
    r2: Option<EcPoint>,
    cmt_witness: Witness,
}

impl Drop for P1Context {
    fn drop(&mut self) {
        self.k1.zeroize();
    }
}

impl P1Context {
    /// `message` is the hex of the digest to sign.
    pub fn new(
        public_key: &EcPoint,
        message: &str,
        pai_pri_key: &PrivateKey,
        e_x1: &BigInt,
        ped1: &PedersenParameters,
    ) -> Result<P1Context> {
        if public_key.curve != Curve::Secp256k1 {
            return Err(Error::InvalidArgument("ecdsa needs a secp256k1 key".into()));
        }
        let digest = decode_digest(message)?;
        Ok(P1Context {
            session_id: session_id(public_key, &digest),
            public_key: public_key.clone(),
            pai_pri_key: pai_pri_key.clone(),
            message: message.to_string(),
            e_x1: e_x1.clone(),
            ped1: ped1.clone(),
            round_number: 1,
            k1: BigInt::zero(),
            r2: None,
            cmt_witness: Vec::new(),
        })
    }

    /// Round 1: refuse banned keys, then commit to R1 = k1 G under the
    /// session id.
    pub fn step1(&mut self) -> Result<Commitment> {
        if self.round_number != 1 {
            return Err(Error::WrongRound);
        }
        let id = ban_id(&self.public_key);
        if ban::has(&id) {
            return Err(Error::SignForbidden(id));
        }
        let q = Curve::Secp256k1.order();
        self.k1 = random_num(q);
        let r1 = EcPoint::scalar_to_point(Curve::Secp256k1, &self.k1);
        let cmt = HashCommitment::new(&[self.session_id.clone(), r1.x, r1.y]);
        self.cmt_witness = cmt.msg;
        self.round_number = 2;
        Ok(cmt.c)
    }

    /// Round 2: verify P2's nonce proof, answer with P1's own proof and the
    /// decommitment witness.
    pub fn step2(
        &mut self,
        p2_proof: &schnorr::Proof,
        r2: &EcPoint,
    ) -> Result<(schnorr::Proof, Witness)> {
        if self.round_number != 2 {
            return Err(Error::WrongRound);
        }
        if !schnorr::verify_with_id(&self.session_id, p2_proof, r2) {
            return Err(Error::SchnorrVerifyFailed);
        }
        self.r2 = Some(r2.clone());
        let r1 = EcPoint::scalar_to_point(Curve::Secp256k1, &self.k1);
        let proof = schnorr::prove_with_id(&self.session_id, &self.k1, &r1)?;
        self.round_number = 3;
        Ok((proof, self.cmt_witness.clone()))
    }

    /// Round 3: verify the affine-operation proof, decrypt, assemble and
    /// check the signature. Returns (r, s) with s in the low half.
    pub fn step3(&mut self, e_k2_h_xr: &BigInt, proof: &AffGProof) -> Result<(BigInt, BigInt)> {
        if self.round_number != 3 {
            return Err(Error::WrongRound);
        }
        self.round_number = 4;
        let statement = AffGStatement {
            n: self.pai_pri_key.public_key.n.clone(),
            c: self.e_x1.clone(),
            d: e_k2_h_xr.clone(),
            x: proof.x.clone(),
            y: proof.y.clone(),
        };
        if !aff_g::verify(&self.ped1, proof, &statement) {
            ban::add(&ban_id(&self.public_key));
            return Err(Error::AffineProofFailed);
        }

        let q = Curve::Secp256k1.order();
        let r2 = self.r2.as_ref().ok_or(Error::WrongRound)?;
        // R = k1 k2 G
        let r_point = r2.scalar_mult(&self.k1)?;
        let r = r_point.x.mod_floor(q);

        let k2_h_xr = self.pai_pri_key.decrypt(e_k2_h_xr)?;
        let k1_inv = ModInt(q)
            .inverse(&self.k1)
            .ok_or_else(|| Error::ArithmeticError("k1 not invertible".into()))?;
        // s = (h + r (x1 + x2)) / (k1 k2)
        let mut s = (k2_h_xr * k1_inv).mod_floor(q);

        let half_order: BigInt = q >> 1usize;
        if s > half_order {
            s = q - &s;
        }
        if s.is_zero() {
            return Err(Error::SignatureVerifyFailed);
        }

        let digest = decode_digest(&self.message)?;
        if !verify_ecdsa(&self.public_key, &digest, &r, &s) {
            // signing again after a failed verification would leak the
            // Paillier key, CVE-2023-33242
            ban::add(&ban_id(&self.public_key));
            return Err(Error::SignatureVerifyFailed);
        }
        Ok((r, s))
    }
}

/// P2: holds the reduced share x2 and the encrypted x1.
pub struct P2Context {
    session_id: BigInt,
    x2: BigInt,
    e_x1: BigInt,
    pai_pub: PublicKey,
    public_key: EcPoint,
    message: String,
    ped1: PedersenParameters,

    round_number: usize,
    k2: BigInt,
    cmt_c: Option<Commitment>,
}

impl Drop for P2Context {
    fn drop(&mut self) {
        self.k2.zeroize();
        self.x2.zeroize();
    }
}

impl P2Context {
    pub fn new(
        x2: &BigInt,
        e_x1: &BigInt,
        public_key: &EcPoint,
        pai_pub: &PublicKey,
        message: &str,
        ped1: &PedersenParameters,
    ) -> Result<P2Context> {
        if public_key.curve != Curve::Secp256k1 {
            return Err(Error::InvalidArgument("ecdsa needs a secp256k1 key".into()));
        }
        let digest = decode_digest(message)?;
        Ok(P2Context {
            session_id: session_id(public_key, &digest),
            x2: x2.clone(),
            e_x1: e_x1.clone(),
            pai_pub: pai_pub.clone(),
            public_key: public_key.clone(),
            message: message.to_string(),
            ped1: ped1.clone(),
            round_number: 1,
            k2: BigInt::zero(),
            cmt_c: None,
        })
    }

    /// Round 1: store P1's commitment, pick k2 and prove it under the
    /// session id.
    pub fn step1(&mut self, cmt: &Commitment) -> Result<(schnorr::Proof, EcPoint)> {
        if self.round_number != 1 {
            return Err(Error::WrongRound);
        }
        self.cmt_c = Some(cmt.clone());
        let q = Curve::Secp256k1.order();
        self.k2 = random_num(q);
        let r2 = EcPoint::scalar_to_point(Curve::Secp256k1, &self.k2);
        let proof = schnorr::prove_with_id(&self.session_id, &self.k2, &r2)?;
        self.round_number = 2;
        Ok((proof, r2))
    }

    /// Round 2: open P1's commitment (which must carry this session id),
    /// verify P1's nonce proof, then evaluate
    /// E[(h + x r)/k2] = E(x1)^a (1+N)^b rho'^N with a = r/k2 and
    /// b = h/k2 + rho q + a x2, and prove the affine operation.
    pub fn step2(
        &mut self,
        cmt_witness: &Witness,
        p1_proof: &schnorr::Proof,
    ) -> Result<(BigInt, AffGProof)> {
        if self.round_number != 2 {
            return Err(Error::WrongRound);
        }
        self.round_number = 3;
        let q = Curve::Secp256k1.order();

        let committed = self.cmt_c.as_ref().ok_or(Error::WrongRound)?;
        let commitment = HashCommitment::from_parts(committed.clone(), cmt_witness.clone());
        let opened = commitment.open().ok_or(Error::CommitmentMismatch)?;
        if opened.len() != 3 {
            return Err(Error::CommitmentMismatch);
        }
        if opened[0] != self.session_id {
            return Err(Error::SessionIdMismatch);
        }
        let r1 = EcPoint::new(Curve::Secp256k1, opened[1].clone(), opened[2].clone())?;
        if !schnorr::verify_with_id(&self.session_id, p1_proof, &r1) {
            return Err(Error::SchnorrVerifyFailed);
        }

        // R = k1 k2 G
        let r_point = r1.scalar_mult(&self.k2)?;
        let r = r_point.x.mod_floor(q);

        let digest = decode_digest(&self.message)?;
        let h = calculate_m(&digest);
        let k2_inv = ModInt(q)
            .inverse(&self.k2)
            .ok_or_else(|| Error::ArithmeticError("k2 not invertible".into()))?;
        let a = (&r * &k2_inv).mod_floor(q);
        let h_k2 = (&h * &k2_inv).mod_floor(q);

        // rho q masks the plaintext (it vanishes mod q); rho' re-randomises
        // the ciphertext
        let rho = random_num(&(q * q));
        let b = &h_k2 + &rho * q + &a * &self.x2;
        let rho2 = random_coprime_num(&self.pai_pub.n);

        let scaled = self.pai_pub.homo_mul_plain(&self.e_x1, &a)?;
        let shifted = self.pai_pub.homo_add_plain(&scaled, &b)?;
        let e_k2_h_xr = self.pai_pub.rerandomize(&shifted, &rho2)?;

        let statement = AffGStatement {
            n: self.pai_pub.n.clone(),
            c: self.e_x1.clone(),
            d: e_k2_h_xr.clone(),
            x: EcPoint::scalar_to_point(Curve::Secp256k1, &a),
            y: EcPoint::scalar_to_point(Curve::Secp256k1, &b),
        };
        let witness = AffGWitness { x: a, y: b, rho: rho2 };
        let proof = aff_g::prove(&self.ped1, &statement, &witness)?;
        Ok((e_k2_h_xr, proof))
    }
}

/// Standard ECDSA verification of (r, s) against a prehashed message.
fn verify_ecdsa(public_key: &EcPoint, digest: &[u8], r: &BigInt, s: &BigInt) -> bool {
    let encoded = EncodedPoint::from_affine_coordinates(
        k256::FieldBytes::from_slice(&be_bytes_32(&public_key.x)),
        k256::FieldBytes::from_slice(&be_bytes_32(&public_key.y)),
        false,
    );
    let verifying_key = match VerifyingKey::from_encoded_point(&encoded) {
        Ok(key) => key,
        Err(_) => return false,
    };
    let signature = match Signature::from_scalars(be_bytes_32(r), be_bytes_32(s)) {
        Ok(sig) => sig,
        Err(_) => return false,
    };
    verifying_key.verify_prehash(digest, &signature).is_ok()
}

fn be_bytes_32(n: &BigInt) -> [u8; 32] {
    let bytes = bytes_be(n);
    let mut out = [0u8; 32];
    out[32 - bytes.len()..].copy_from_slice(&bytes);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::paillier;
    use crate::crypto::pedersen;

    /// Drive the whole exchange from independently chosen shares, without a
    /// DKG: x = x1 + x2.
    fn run_exchange(message: &str) -> (EcPoint, Vec<u8>, BigInt, BigInt) {
        let q = Curve::Secp256k1.order();
        let x1 = random_num(q);
        let x2 = random_num(q);
        let public_key = EcPoint::scalar_to_point(Curve::Secp256k1, &(&x1 + &x2));

        let (pai_pri, pai_pub) = paillier::tests::test_key_pair();
        let (e_x1, _) = pai_pub.encrypt(&x1).unwrap();
        let ped1 = pedersen::tests::test_parameters();

        let mut p1 = P1Context::new(&public_key, message, &pai_pri, &e_x1, &ped1).unwrap();
        let mut p2 = P2Context::new(&x2, &e_x1, &public_key, &pai_pub, message, &ped1).unwrap();

        let cmt = p1.step1().unwrap();
        let (p2_proof, r2) = p2.step1(&cmt).unwrap();
        let (p1_proof, witness) = p1.step2(&p2_proof, &r2).unwrap();
        let (cipher, aff_proof) = p2.step2(&witness, &p1_proof).unwrap();
        let (r, s) = p1.step3(&cipher, &aff_proof).unwrap();

        (public_key, hex::decode(message).unwrap(), r, s)
    }

    #[test]
    fn two_party_signature_verifies() {
        use sha2::{Digest, Sha256};
        let digest = Sha256::digest(b"hello");
        let (public_key, digest, r, s) = run_exchange(&hex::encode(digest));
        assert!(verify_ecdsa(&public_key, &digest, &r, &s));
        let q = Curve::Secp256k1.order();
        let half: BigInt = q >> 1usize;
        assert!(s > BigInt::zero() && s <= half);
    }

    #[test]
    fn forged_affine_proof_bans_the_key() {
        use sha2::{Digest, Sha256};
        let q = Curve::Secp256k1.order();
        let x1 = random_num(q);
        let x2 = random_num(q);
        let public_key = EcPoint::scalar_to_point(Curve::Secp256k1, &(&x1 + &x2));
        let message = hex::encode(Sha256::digest(b"banlist"));

        let (pai_pri, pai_pub) = paillier::tests::test_key_pair();
        let (e_x1, _) = pai_pub.encrypt(&x1).unwrap();
        let ped1 = pedersen::tests::test_parameters();

        let mut p1 = P1Context::new(&public_key, &message, &pai_pri, &e_x1, &ped1).unwrap();
        let mut p2 = P2Context::new(&x2, &e_x1, &public_key, &pai_pub, &message, &ped1).unwrap();

        let cmt = p1.step1().unwrap();
        let (p2_proof, r2) = p2.step1(&cmt).unwrap();
        let (p1_proof, witness) = p1.step2(&p2_proof, &r2).unwrap();
        let (cipher, mut aff_proof) = p2.step2(&witness, &p1_proof).unwrap();

        aff_proof.z1 += BigInt::from(1);
        assert!(matches!(p1.step3(&cipher, &aff_proof), Err(Error::AffineProofFailed)));

        // the key is now banned: a fresh session refuses to start
        let mut p1_again = P1Context::new(&public_key, &message, &pai_pri, &e_x1, &ped1).unwrap();
        assert!(matches!(p1_again.step1(), Err(Error::SignForbidden(_))));
        ban::remove(&ban_id(&public_key));
    }

    #[test]
    fn rounds_are_strict() {
        use sha2::{Digest, Sha256};
        let q = Curve::Secp256k1.order();
        let x1 = random_num(q);
        let x2 = random_num(q);
        let public_key = EcPoint::scalar_to_point(Curve::Secp256k1, &(&x1 + &x2));
        let message = hex::encode(Sha256::digest(b"rounds"));

        let (pai_pri, pai_pub) = paillier::tests::test_key_pair();
        let (e_x1, _) = pai_pub.encrypt(&x1).unwrap();
        let ped1 = pedersen::tests::test_parameters();

        let mut p1 = P1Context::new(&public_key, &message, &pai_pri, &e_x1, &ped1).unwrap();
        let mut p2 = P2Context::new(&x2, &e_x1, &public_key, &pai_pub, &message, &ped1).unwrap();

        let cmt = p1.step1().unwrap();
        assert!(matches!(p1.step1(), Err(Error::WrongRound)));
        let (p2_proof, r2) = p2.step1(&cmt).unwrap();
        // P2 cannot jump back to round 1
        assert!(matches!(p2.step1(&cmt), Err(Error::WrongRound)));
        let (p1_proof, witness) = p1.step2(&p2_proof, &r2).unwrap();
        let (cipher, aff_proof) = p2.step2(&witness, &p1_proof).unwrap();
        let _ = p1.step3(&cipher, &aff_proof).unwrap();
        assert!(matches!(p1.step3(&cipher, &aff_proof), Err(Error::WrongRound)));
    }

    #[test]
    fn round_payloads_survive_the_wire() {
        use sha2::{Digest, Sha256};
        let q = Curve::Secp256k1.order();
        let x1 = random_num(q);
        let x2 = random_num(q);
        let public_key = EcPoint::scalar_to_point(Curve::Secp256k1, &(&x1 + &x2));
        let message = hex::encode(Sha256::digest(b"wire"));

        let (pai_pri, pai_pub) = paillier::tests::test_key_pair();
        let (e_x1, _) = pai_pub.encrypt(&x1).unwrap();
        let ped1 = pedersen::tests::test_parameters();

        let mut p1 = P1Context::new(&public_key, &message, &pai_pri, &e_x1, &ped1).unwrap();
        let mut p2 = P2Context::new(&x2, &e_x1, &public_key, &pai_pub, &message, &ped1).unwrap();

        // every round trips through its JSON wire form
        let round1 = SignStep1Data { c: p1.step1().unwrap() };
        let round1: SignStep1Data =
            serde_json::from_str(&serde_json::to_string(&round1).unwrap()).unwrap();

        let (proof, r2) = p2.step1(&round1.c).unwrap();
        let round2 = SignStep2Data { proof, r2 };
        let round2: SignStep2Data =
            serde_json::from_str(&serde_json::to_string(&round2).unwrap()).unwrap();

        let (proof, witness) = p1.step2(&round2.proof, &round2.r2).unwrap();
        let round3 = SignStep3Data { proof, witness };
        let round3: SignStep3Data =
            serde_json::from_str(&serde_json::to_string(&round3).unwrap()).unwrap();

        let (cipher, proof) = p2.step2(&round3.witness, &round3.proof).unwrap();
        let round4 = SignStep4Data { proof, cipher };
        let round4: SignStep4Data =
            serde_json::from_str(&serde_json::to_string(&round4).unwrap()).unwrap();

        assert!(p1.step3(&round4.cipher, &round4.proof).is_ok());
    }

    #[test]
    fn tampered_commitment_session_is_rejected() {
        use sha2::{Digest, Sha256};
        let q = Curve::Secp256k1.order();
        let x1 = random_num(q);
        let x2 = random_num(q);
        let public_key = EcPoint::scalar_to_point(Curve::Secp256k1, &(&x1 + &x2));
        let message = hex::encode(Sha256::digest(b"session"));

        let (pai_pri, pai_pub) = paillier::tests::test_key_pair();
        let (e_x1, _) = pai_pub.encrypt(&x1).unwrap();
        let ped1 = pedersen::tests::test_parameters();

        let mut p1 = P1Context::new(&public_key, &message, &pai_pri, &e_x1, &ped1).unwrap();
        // P2 thinks it is signing a different message
        let other = hex::encode(Sha256::digest(b"other message"));
        let mut p2 = P2Context::new(&x2, &e_x1, &public_key, &pai_pub, &other, &ped1).unwrap();

        let cmt = p1.step1().unwrap();
        let (p2_proof, r2) = p2.step1(&cmt).unwrap();
        // P1 rejects the proof bound to the wrong session
        assert!(matches!(p1.step2(&p2_proof, &r2), Err(Error::SchnorrVerifyFailed)));
    }
}
