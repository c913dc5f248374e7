//! One-shot 2-of-2 setup between two DKG parties, preparing repeated ECDSA
//! signing.
//!
//! P1 Lagrange-reduces its share to the two-party setting, encrypts it under
//! its own Paillier key and ships it with the proof bundle: a Schnorr proof
//! for X1, the N-root NIZK, a Paillier–Blum proof and a no-small-factor
//! proof for N, a DLN proof for P1's Pedersen parameters and a
//! group-element range proof tying the ciphertext to X1. P2 verifies the
//! lot against its own Pedersen parameters and persists what signing needs.
//!
//! Paillier keygen and Pedersen parameter generation are slow; both sides
//! are expected to prepare them in advance.

use num_bigint_dig::BigInt;
use num_traits::One;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::crypto::curve::{Curve, EcPoint};
use crate::crypto::paillier::{self, PrivateKey, PublicKey};
use crate::crypto::pedersen::PedersenParameters;
use crate::crypto::prime::generate_safe_primes;
use crate::crypto::schnorr;
use crate::crypto::vss::cal_lagrangian;
use crate::crypto::zkp::blum::{self, PaillierBlumProof};
use crate::crypto::zkp::dln::{self, DlnProof};
use crate::crypto::zkp::enc_range::{self, GroupElementRangeProof};
use crate::crypto::zkp::no_small_factor::{self, NoSmallFactorProof};
use crate::crypto::zkp::SecurityParameter;
use crate::crypto::{random_num, ModInt};
use crate::tss::Message;
use crate::{Error, Result};

/// Challenge width and slack used by the setup proofs.
pub const SETUP_SECURITY: SecurityParameter = SecurityParameter { q_bitlen: 256, epsilon: 512 };
/// Claimed lower bound (bits) on each Paillier prime factor.
pub const FACTOR_BOUND_BITS: usize = 256;
/// Range bound (bits) on the encrypted share.
pub const SHARE_RANGE_BITS: usize = 256;

/// Pedersen modulus with the discrete-log witness between its generators,
/// pre-generated locally by each party.
pub struct PreParams {
    pub n_tilde: BigInt,
    pub h1: BigInt,
    pub h2: BigInt,
    alpha: BigInt,
    beta: BigInt,
    /// Safe prime halves of the factors of n_tilde.
    p: BigInt,
    q: BigInt,
}

impl Drop for PreParams {
    fn drop(&mut self) {
        self.alpha.zeroize();
        self.beta.zeroize();
        self.p.zeroize();
        self.q.zeroize();
    }
}

impl PreParams {
    /// Generate fresh parameters; dominated by the safe-prime search.
    pub fn generate(concurrency: usize) -> PreParams {
        let (p_full, q_full) = generate_safe_primes(crate::crypto::pedersen::PRIME_BITS, concurrency);
        PreParams::from_primes(&p_full, &q_full)
    }

    pub(crate) fn from_primes(p_full: &BigInt, q_full: &BigInt) -> PreParams {
        let n_tilde = p_full * q_full;
        let p = (p_full - BigInt::one()) >> 1usize;
        let q = (q_full - BigInt::one()) >> 1usize;
        let pq = &p * &q;

        let modint = ModInt(&n_tilde);
        let f1 = random_num(&n_tilde);
        let h1 = modint.mul(&f1, &f1);
        let (alpha, beta) = loop {
            let alpha = random_num(&n_tilde);
            if let Some(beta) = ModInt(&pq).inverse(&alpha) {
                break (alpha, beta);
            }
        };
        let h2 = modint.exp(&h1, &alpha);

        PreParams { n_tilde, h1, h2, alpha, beta, p, q }
    }

    /// View as commitment parameters: T is the base, S its power.
    pub fn pedersen_parameters(&self) -> PedersenParameters {
        PedersenParameters {
            s: self.h2.clone(),
            t: self.h1.clone(),
            n_tilde: self.n_tilde.clone(),
        }
    }

    fn dln_proof(&self) -> DlnProof {
        dln::prove(&self.h1, &self.h2, &self.alpha, &self.p, &self.q, &self.n_tilde)
    }

    /// Witness for the reverse direction h1 = h2^beta, available to callers
    /// negotiating the older two-proof exchange.
    pub fn reverse_dln_proof(&self) -> DlnProof {
        dln::prove(&self.h2, &self.h1, &self.beta, &self.p, &self.q, &self.n_tilde)
    }
}

/// Pre-generated Pedersen parameters plus the DLN proof peers demand before
/// accepting commitments under them.
pub struct PreParamsWithDlnProof {
    pub params: PreParams,
    pub proof: DlnProof,
}

impl PreParamsWithDlnProof {
    pub fn generate(concurrency: usize) -> PreParamsWithDlnProof {
        let params = PreParams::generate(concurrency);
        let proof = params.dln_proof();
        PreParamsWithDlnProof { params, proof }
    }

    pub(crate) fn from_pre_params(params: PreParams) -> PreParamsWithDlnProof {
        let proof = params.dln_proof();
        PreParamsWithDlnProof { params, proof }
    }

    pub fn pedersen_parameters(&self) -> PedersenParameters {
        self.params.pedersen_parameters()
    }
}

/// Setup message from P1 to P2.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct P1Data {
    #[serde(rename = "E_x1", with = "crate::serde_support::hex_int")]
    pub e_x1: BigInt,
    #[serde(rename = "Proof")]
    pub proof: schnorr::Proof,
    #[serde(rename = "PaiPubKey")]
    pub pai_pub_key: PublicKey,
    #[serde(rename = "X1")]
    pub x1: EcPoint,
    #[serde(rename = "NIZKProof", with = "crate::serde_support::hex_bytes")]
    pub nizk_proof: Vec<u8>,
    #[serde(rename = "BlumProof")]
    pub blum_proof: PaillierBlumProof,
    #[serde(rename = "NoSmallFactorProof")]
    pub no_small_factor_proof: NoSmallFactorProof,
    #[serde(rename = "DlnProof")]
    pub dln_proof: DlnProof,
    #[serde(rename = "Ped1")]
    pub ped1: PedersenParameters,
    #[serde(rename = "X1RangeProof")]
    pub x1_range_proof: GroupElementRangeProof,
}

/// What P2 persists for signing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct P2SaveData {
    #[serde(rename = "From")]
    pub from: usize,
    #[serde(rename = "To")]
    pub to: usize,
    #[serde(rename = "E_x1", with = "crate::serde_support::hex_int")]
    pub e_x1: BigInt,
    #[serde(rename = "PaiPubKey")]
    pub pai_pub_key: PublicKey,
    #[serde(rename = "X2", with = "crate::serde_support::hex_int")]
    pub x2: BigInt,
    #[serde(rename = "Ped1")]
    pub ped1: PedersenParameters,
    #[serde(rename = "Ped2")]
    pub ped2: PedersenParameters,
}

impl Drop for P2SaveData {
    fn drop(&mut self) {
        self.x2.zeroize();
    }
}

/// Both sides derive the N-root NIZK session from the party pair.
fn setup_session_id(from: usize, to: usize) -> Vec<u8> {
    let mut session = Vec::with_capacity(8);
    session.extend_from_slice(&(from as u32).to_be_bytes());
    session.extend_from_slice(&(to as u32).to_be_bytes());
    session
}

/// P1 side of the setup: reduce the share, encrypt it and assemble the
/// proof bundle. Returns the message for P2 and E(x1), which P1 must retain
/// for signing. `ped2`/`ped2_proof` are P2's pre-shared Pedersen parameters;
/// P1 refuses to prove against parameters it cannot check.
pub fn p1(
    share1: &BigInt,
    pai_pri_key: &PrivateKey,
    from: usize,
    to: usize,
    pre_params: &PreParamsWithDlnProof,
    ped2: &PedersenParameters,
    ped2_proof: &DlnProof,
) -> Result<(Message, BigInt)> {
    if !dln::verify(ped2_proof, &ped2.t, &ped2.s, &ped2.n_tilde) {
        return Err(Error::DlnProofFailed);
    }

    let curve = Curve::Secp256k1;
    let ids = [BigInt::from(from as u64), BigInt::from(to as u64)];
    let x1 = cal_lagrangian(curve, &ids[0], share1, &ids)?;

    let pai_pub_key = pai_pri_key.public_key.clone();
    let (e_x1, r) = pai_pub_key.encrypt(&x1)?;

    let x1_point = EcPoint::scalar_to_point(curve, &x1);
    let proof = schnorr::prove(&x1, &x1_point)?;

    let session = setup_session_id(from, to);
    let nizk_proof =
        paillier::nizk_proof_with_session(&pai_pub_key.n, &pai_pri_key.phi, &session)?;
    let blum_proof = blum::prove(&pai_pub_key.n, &pai_pri_key.p, &pai_pri_key.q)?;
    let no_small_factor_proof = no_small_factor::prove(
        &pai_pub_key.n,
        &pai_pri_key.p,
        &pai_pri_key.q,
        FACTOR_BOUND_BITS,
        ped2,
        &SETUP_SECURITY,
    );
    let x1_range_proof = enc_range::prove_group_element(
        &pai_pub_key.n,
        &e_x1,
        &x1,
        &r,
        SHARE_RANGE_BITS,
        &x1_point,
        ped2,
        &SETUP_SECURITY,
    )?;

    let content = P1Data {
        e_x1: e_x1.clone(),
        proof,
        pai_pub_key,
        x1: x1_point,
        nizk_proof,
        blum_proof,
        no_small_factor_proof,
        dln_proof: pre_params.proof.clone(),
        ped1: pre_params.pedersen_parameters(),
        x1_range_proof,
    };
    let message = Message {
        from,
        to,
        data: serde_json::to_string(&content)?,
    };
    Ok((message, e_x1))
}

/// P2 side of the setup: check the whole bundle against the expected public
/// key and P2's own Pedersen parameters, then persist the signing material.
pub fn p2(
    share2: &BigInt,
    public_key: &EcPoint,
    msg: &Message,
    from: usize,
    to: usize,
    ped2: &PedersenParameters,
) -> Result<P2SaveData> {
    if msg.from != from || msg.to != to {
        return Err(Error::MessageMismatch);
    }
    let data: P1Data = serde_json::from_str(&msg.data)?;

    let curve = Curve::Secp256k1;
    let ids = [BigInt::from(from as u64), BigInt::from(to as u64)];
    let x2 = cal_lagrangian(curve, &ids[1], share2, &ids)?;
    let x2_point = EcPoint::scalar_to_point(curve, &x2);

    // the two reduced shares must still assemble the joint key
    if x2_point.add(&data.x1)? != *public_key {
        return Err(Error::PublicKeyMismatch);
    }
    if !schnorr::verify(&data.proof, &data.x1) {
        return Err(Error::SchnorrVerifyFailed);
    }

    let bits = data.pai_pub_key.n.bits();
    if bits != paillier::PRIME_BITS && bits != paillier::PRIME_BITS - 1 {
        return Err(Error::PaillierKeyLength);
    }
    let session = setup_session_id(from, to);
    if !paillier::nizk_verify_with_session(&data.pai_pub_key.n, &data.nizk_proof, &session) {
        return Err(Error::PaillierProofFailed);
    }
    if !blum::verify(&data.pai_pub_key.n, &data.blum_proof) {
        return Err(Error::BlumProofFailed);
    }
    if data.no_small_factor_proof.l != FACTOR_BOUND_BITS
        || data.no_small_factor_proof.params != SETUP_SECURITY
        || !no_small_factor::verify(&data.pai_pub_key.n, &data.no_small_factor_proof, ped2)
    {
        return Err(Error::NoSmallFactorProofFailed);
    }
    if !dln::verify(&data.dln_proof, &data.ped1.t, &data.ped1.s, &data.ped1.n_tilde) {
        return Err(Error::DlnProofFailed);
    }

    // the range proof must speak about this key, ciphertext and X1
    let range = &data.x1_range_proof;
    if range.proof.n0 != data.pai_pub_key.n
        || range.proof.c != data.e_x1
        || range.x_point != data.x1
        || range.proof.l != SHARE_RANGE_BITS
        || range.proof.params != SETUP_SECURITY
        || !enc_range::verify_group_element(range, ped2)
    {
        return Err(Error::RangeProofFailed);
    }

    Ok(P2SaveData {
        from,
        to,
        e_x1: data.e_x1,
        pai_pub_key: data.pai_pub_key,
        x2,
        ped1: data.ped1,
        ped2: ped2.clone(),
    })
}
