//! Threshold ed25519 signing: any t parties of the DKG output collaborate.
//!
//! Each participant Lagrange-reduces its share to the signing subset, then
//! the three rounds run commit(R_i) / reveal-and-prove / aggregate. The
//! challenge scalar follows RFC 8032: SHA-512 over the compressed R, the
//! compressed public key and the message, reduced mod L. Each party outputs
//! its additive share s_i = k_i + lambda w_i; the aggregator sums them mod L
//! into the standard signature (R, s).

use std::collections::BTreeMap;

use curve25519_dalek::Scalar as EdScalar;
use num_bigint_dig::BigInt;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use zeroize::Zeroize;

use crate::crypto::commitment::{Commitment, HashCommitment, Witness};
use crate::crypto::curve::{Curve, EcPoint};
use crate::crypto::schnorr;
use crate::crypto::vss::cal_lagrangian;
use crate::crypto::{bigint_from_bytes, bytes_be, random_num};
use crate::tss::Message;
use crate::{Error, Result};

/// Round 1 payload: commitment to R_i.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct SignStep1Data {
    #[serde(rename = "c", with = "crate::serde_support::hex_int")]
    c: Commitment,
}

/// Round 2 payload: decommitment witness and the Schnorr proof for k_i.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct SignStep2Data {
    #[serde(rename = "witness", with = "crate::serde_support::hex_int_vec")]
    witness: Witness,
    #[serde(rename = "proof")]
    proof: schnorr::Proof,
}

/// Per-party signing state.
pub struct Ed25519Sign {
    pub device_number: usize,
    pub threshold: usize,
    pub round_number: usize,

    part_list: Vec<usize>,
    wi: BigInt,
    public_key: EcPoint,
    ki: BigInt,
    message: String,
    cmt_witness: Witness,
    commitment_map: BTreeMap<usize, Commitment>,
}

impl Drop for Ed25519Sign {
    fn drop(&mut self) {
        self.wi.zeroize();
        self.ki.zeroize();
    }
}

impl Ed25519Sign {
    /// `part_list` is the signing subset (size = threshold, containing this
    /// device); `message` is the hex of the bytes to sign.
    pub fn new(
        device_number: usize,
        threshold: usize,
        part_list: &[usize],
        share_i: &BigInt,
        public_key: &EcPoint,
        message: &str,
    ) -> Result<Ed25519Sign> {
        if part_list.len() != threshold {
            return Err(Error::InvalidArgument(
                "participant list does not match the threshold".into(),
            ));
        }
        if !part_list.contains(&device_number) {
            return Err(Error::InvalidArgument(
                "device is not in the participant list".into(),
            ));
        }
        if public_key.curve != Curve::Ed25519 {
            return Err(Error::InvalidArgument("eddsa needs an ed25519 key".into()));
        }
        hex::decode(message)?;

        let ids: Vec<BigInt> = part_list.iter().map(|id| BigInt::from(*id as u64)).collect();
        let wi = cal_lagrangian(
            Curve::Ed25519,
            &BigInt::from(device_number as u64),
            share_i,
            &ids,
        )?;

        Ok(Ed25519Sign {
            device_number,
            threshold,
            round_number: 1,
            part_list: part_list.to_vec(),
            wi,
            public_key: public_key.clone(),
            ki: BigInt::zero(),
            message: message.to_string(),
            cmt_witness: Vec::new(),
            commitment_map: BTreeMap::new(),
        })
    }

    /// Round 1: commit to R_i = k_i G towards every other participant.
    pub fn sign_step1(&mut self) -> Result<BTreeMap<usize, Message>> {
        if self.round_number != 1 {
            return Err(Error::WrongRound);
        }
        self.ki = random_num(Curve::Ed25519.order());
        let ri = EcPoint::scalar_to_point(Curve::Ed25519, &self.ki);
        let cmt = HashCommitment::new(&[ri.x, ri.y]);
        self.cmt_witness = cmt.msg.clone();
        self.round_number = 2;

        let data = serde_json::to_string(&SignStep1Data { c: cmt.c })?;
        Ok(self.broadcast(data))
    }

    /// Round 2: record peer commitments, reveal the witness and prove k_i.
    pub fn sign_step2(&mut self, msgs: &[Message]) -> Result<BTreeMap<usize, Message>> {
        if self.round_number != 2 {
            return Err(Error::WrongRound);
        }
        if msgs.len() != self.threshold - 1 {
            return Err(Error::MessageCount);
        }
        for msg in msgs {
            if msg.to != self.device_number {
                return Err(Error::MessageMismatch);
            }
            let content: SignStep1Data = serde_json::from_str(&msg.data)?;
            self.commitment_map.insert(msg.from, content.c);
        }

        let ki_point = EcPoint::scalar_to_point(Curve::Ed25519, &self.ki);
        let proof = schnorr::prove(&self.ki, &ki_point)?;
        self.round_number = 3;

        let data = serde_json::to_string(&SignStep2Data {
            witness: self.cmt_witness.clone(),
            proof,
        })?;
        Ok(self.broadcast(data))
    }

    /// Round 3: open peer commitments, verify their nonce proofs, aggregate
    /// R and produce this party's additive share s_i. Returns (s_i, R) with
    /// R as the integer reading of its compressed encoding.
    pub fn sign_step3(&mut self, msgs: &[Message]) -> Result<(BigInt, BigInt)> {
        if self.round_number != 3 {
            return Err(Error::WrongRound);
        }
        if msgs.len() != self.threshold - 1 {
            return Err(Error::MessageCount);
        }
        self.round_number = 4;

        let mut r_point = EcPoint::scalar_to_point(Curve::Ed25519, &self.ki);
        for msg in msgs {
            if msg.to != self.device_number {
                return Err(Error::MessageMismatch);
            }
            let data: SignStep2Data = serde_json::from_str(&msg.data)?;
            let committed = self
                .commitment_map
                .get(&msg.from)
                .ok_or(Error::MessageMismatch)?;
            let commitment = HashCommitment::from_parts(committed.clone(), data.witness.clone());
            let opened = commitment.open().ok_or(Error::CommitmentMismatch)?;
            if opened.len() != 2 {
                return Err(Error::CommitmentMismatch);
            }
            let rj = EcPoint::new(Curve::Ed25519, opened[0].clone(), opened[1].clone())?;
            if !schnorr::verify(&data.proof, &rj) {
                return Err(Error::SchnorrVerifyFailed);
            }
            r_point = r_point.add(&rj)?;
        }

        let r_encoded = compressed_bytes(&r_point)?;
        let pub_encoded = compressed_bytes(&self.public_key)?;
        let message = hex::decode(&self.message)?;

        // lambda = SHA-512(R || pub || M) mod L
        let mut hasher = Sha512::new();
        hasher.update(r_encoded);
        hasher.update(pub_encoded);
        hasher.update(&message);
        let mut wide = [0u8; 64];
        wide.copy_from_slice(hasher.finalize().as_slice());
        let lambda = EdScalar::from_bytes_mod_order_wide(&wide);

        // s_i = k_i + lambda w_i mod L
        let si = lambda * scalar_from_bigint(&self.wi) + scalar_from_bigint(&self.ki);

        let si_int = bigint_from_le_bytes(&si.to_bytes());
        let r_int = bigint_from_le_bytes(&r_encoded);
        Ok((si_int, r_int))
    }

    fn broadcast(&self, data: String) -> BTreeMap<usize, Message> {
        let mut out = BTreeMap::new();
        for id in &self.part_list {
            if *id == self.device_number {
                continue;
            }
            out.insert(
                *id,
                Message {
                    from: self.device_number,
                    to: *id,
                    data: data.clone(),
                },
            );
        }
        out
    }
}

/// Assemble the standard 64-byte signature from the aggregated R reading and
/// the sum of the parties' additive shares.
pub fn assemble_signature(r: &BigInt, si_list: &[BigInt]) -> [u8; 64] {
    let mut s = EdScalar::ZERO;
    for si in si_list {
        s += scalar_from_bigint(si);
    }
    let mut out = [0u8; 64];
    out[..32].copy_from_slice(&le_bytes_32(r));
    out[32..].copy_from_slice(&s.to_bytes());
    out
}

fn compressed_bytes(point: &EcPoint) -> Result<[u8; 32]> {
    let encoded = hex::decode(point.to_ed25519_pub_key()?)?;
    encoded
        .try_into()
        .map_err(|_| Error::PointDecode("compressed edwards must be 32 bytes".into()))
}

fn scalar_from_bigint(n: &BigInt) -> EdScalar {
    use num_integer::Integer;
    let reduced = n.mod_floor(Curve::Ed25519.order());
    EdScalar::from_bytes_mod_order(le_bytes_32(&reduced))
}

fn le_bytes_32(n: &BigInt) -> [u8; 32] {
    let bytes = bytes_be(n);
    let mut out = [0u8; 32];
    out[32 - bytes.len()..].copy_from_slice(&bytes);
    out.reverse();
    out
}

fn bigint_from_le_bytes(bytes: &[u8]) -> BigInt {
    let mut reversed = bytes.to_vec();
    reversed.reverse();
    bigint_from_bytes(&reversed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_codec_round_trip() {
        let n = random_num(Curve::Ed25519.order());
        let scalar = scalar_from_bigint(&n);
        assert_eq!(bigint_from_le_bytes(&scalar.to_bytes()), n);
    }

    #[test]
    fn part_list_must_contain_the_device() {
        let share = BigInt::from(7);
        let pub_key = EcPoint::scalar_to_point(Curve::Ed25519, &share);
        assert!(Ed25519Sign::new(3, 2, &[1, 2], &share, &pub_key, "aa").is_err());
        assert!(Ed25519Sign::new(1, 2, &[1, 2, 3], &share, &pub_key, "aa").is_err());
    }
}
