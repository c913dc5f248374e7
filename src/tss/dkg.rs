//! Three-round distributed key generation.
//!
//! Round 1: commit to the Feldman verifiers and a fresh chaincode
//! contribution, peer to peer. Round 2: reveal the witness, deal each peer
//! its secret share and prove knowledge of u_i. Round 3: open every peer's
//! commitment, check shares and proofs, and assemble the joint key material.
//! Any check that fails kills the session; the whole DKG restarts without
//! the offending peer.

use std::collections::BTreeMap;

use num_bigint_dig::BigInt;
use num_integer::Integer;
use num_traits::{One, Zero};
use zeroize::Zeroize;

use crate::crypto::commitment::{Commitment, HashCommitment, Witness};
use crate::crypto::curve::{Curve, EcPoint};
use crate::crypto::random_num;
use crate::crypto::schnorr;
use crate::crypto::vss::{Feldman, Share};
use crate::tss::{KeyStep1Data, KeyStep2Data, KeyStep3Data, Message};
use crate::{Error, Result};

/// Per-party DKG state. The threshold is fixed at 2 (any two parties can
/// later sign); the party count is free.
pub struct SetupInfo {
    pub device_number: usize,
    pub threshold: usize,
    pub total: usize,
    pub round_number: usize,

    curve: Curve,
    ui: BigInt,
    chaincode: BigInt,
    verifiers: Vec<EcPoint>,
    secret_shares: Vec<Share>,
    dec_witness: Witness,
    commitment_map: BTreeMap<usize, Commitment>,
}

impl Drop for SetupInfo {
    fn drop(&mut self) {
        self.ui.zeroize();
        self.chaincode.zeroize();
        for share in &mut self.secret_shares {
            share.y.zeroize();
        }
    }
}

impl SetupInfo {
    pub fn new(device_number: usize, total: usize, curve: Curve) -> Result<SetupInfo> {
        if total < 2 || device_number > total || device_number == 0 {
            return Err(Error::InvalidArgument("device number out of range".into()));
        }
        Ok(SetupInfo {
            device_number,
            threshold: 2,
            total,
            round_number: 1,
            curve,
            ui: BigInt::zero(),
            chaincode: BigInt::zero(),
            verifiers: Vec::new(),
            secret_shares: Vec::new(),
            dec_witness: Vec::new(),
            commitment_map: BTreeMap::new(),
        })
    }

    fn ids(&self) -> impl Iterator<Item = usize> {
        1..=self.total
    }

    /// Round 1: sample u_i and a chaincode contribution, deal shares, and
    /// send every peer the commitment to (chaincode, verifiers).
    pub fn dkg_step1(&mut self) -> Result<BTreeMap<usize, Message>> {
        if self.round_number != 1 {
            return Err(Error::WrongRound);
        }
        let q = self.curve.order();
        let ui = random_num(q);
        let feldman = Feldman::new(self.threshold, self.total, self.curve)?;
        let (verifiers, shares) = feldman.evaluate(&ui)?;
        let chaincode = random_num(q);

        let mut input = vec![chaincode.clone()];
        for verifier in &verifiers {
            input.push(verifier.x.clone());
            input.push(verifier.y.clone());
        }
        let commitment = HashCommitment::new(&input);

        self.ui = ui;
        self.chaincode = chaincode;
        self.dec_witness = commitment.msg.clone();
        self.secret_shares = shares;
        self.verifiers = verifiers;
        self.round_number = 2;

        self.broadcast(&KeyStep1Data { c: commitment.c })
    }

    /// Round 2: record peer commitments, then send each peer its share,
    /// the decommitment witness and a Schnorr proof for u_i.
    pub fn dkg_step2(&mut self, msgs: &[Message]) -> Result<BTreeMap<usize, Message>> {
        if self.round_number != 2 {
            return Err(Error::WrongRound);
        }
        if msgs.len() != self.total - 1 {
            return Err(Error::MessageCount);
        }
        for msg in msgs {
            if msg.to != self.device_number {
                return Err(Error::MessageMismatch);
            }
            let content: KeyStep1Data = serde_json::from_str(&msg.data)?;
            self.commitment_map.insert(msg.from, content.c);
        }

        let ui_point = EcPoint::scalar_to_point(self.curve, &self.ui);
        let proof = schnorr::prove(&self.ui, &ui_point)?;
        self.round_number = 3;

        let mut out = BTreeMap::new();
        for id in self.ids() {
            if id == self.device_number {
                continue;
            }
            let content = KeyStep2Data {
                witness: self.dec_witness.clone(),
                share: self.secret_shares[id - 1].clone(),
                proof: proof.clone(),
            };
            out.insert(
                id,
                Message {
                    from: self.device_number,
                    to: id,
                    data: serde_json::to_string(&content)?,
                },
            );
        }
        Ok(out)
    }

    /// Round 3: open every peer commitment, verify shares and proofs, and
    /// produce the final key material.
    pub fn dkg_step3(&mut self, msgs: &[Message]) -> Result<KeyStep3Data> {
        if self.round_number != 3 {
            return Err(Error::WrongRound);
        }
        if msgs.len() != self.total - 1 {
            return Err(Error::MessageCount);
        }
        let feldman = Feldman::new(self.threshold, self.total, self.curve)?;

        let mut verifiers: BTreeMap<usize, Vec<EcPoint>> = BTreeMap::new();
        verifiers.insert(self.device_number, self.verifiers.clone());
        let mut chaincode = self.chaincode.clone();
        let mut xi = self.secret_shares[self.device_number - 1].y.clone();

        for msg in msgs {
            if msg.to != self.device_number {
                return Err(Error::MessageMismatch);
            }
            let data: KeyStep2Data = serde_json::from_str(&msg.data)?;
            let committed = self
                .commitment_map
                .get(&msg.from)
                .ok_or(Error::MessageMismatch)?;
            let commitment =
                HashCommitment::from_parts(committed.clone(), data.witness.clone());
            let opened = commitment.open().ok_or(Error::CommitmentMismatch)?;
            if opened.is_empty() {
                return Err(Error::CommitmentMismatch);
            }
            chaincode += &opened[0];
            let peer_verifiers = unmarshal_verifiers(self.curve, &opened[1..], self.threshold)?;

            if !feldman.verify(&data.share, &peer_verifiers)? {
                return Err(Error::FeldmanVerifyFailed);
            }
            xi += &data.share.y;

            if !schnorr::verify(&data.proof, &peer_verifiers[0]) {
                return Err(Error::SchnorrVerifyFailed);
            }
            verifiers.insert(msg.from, peer_verifiers);
        }

        let (public_key, share_pub_key_map) =
            assemble_share_public_keys(self.curve, &verifiers, self.threshold, self.total)?;

        let xi = xi.mod_floor(self.curve.order());
        let xi_point = EcPoint::scalar_to_point(self.curve, &xi);
        if share_pub_key_map[&self.device_number] != xi_point {
            return Err(Error::PublicKeyMismatch);
        }

        Ok(KeyStep3Data {
            id: self.device_number,
            share_i: xi,
            public_key,
            chain_code: chaincode_hex(&chaincode),
            share_pub_key_map,
        })
    }

    fn broadcast<T: serde::Serialize>(&self, content: &T) -> Result<BTreeMap<usize, Message>> {
        let data = serde_json::to_string(content)?;
        let mut out = BTreeMap::new();
        for id in self.ids() {
            if id == self.device_number {
                continue;
            }
            out.insert(
                id,
                Message {
                    from: self.device_number,
                    to: id,
                    data: data.clone(),
                },
            );
        }
        Ok(out)
    }
}

/// Rebuild verifier points from the opened (x, y) pairs of a commitment.
pub(crate) fn unmarshal_verifiers(
    curve: Curve,
    msg: &[BigInt],
    threshold: usize,
) -> Result<Vec<EcPoint>> {
    if msg.len() != threshold * 2 {
        return Err(Error::InvalidArgument(
            "invalid number of verifier shares".into(),
        ));
    }
    (0..threshold)
        .map(|k| EcPoint::new(curve, msg[2 * k].clone(), msg[2 * k + 1].clone()))
        .collect()
}

/// Sum the per-coefficient verifier points across all parties, then evaluate
/// the summed polynomial in the exponent at every party index. Returns the
/// joint public key (the constant term) and the per-party share public keys.
pub(crate) fn assemble_share_public_keys(
    curve: Curve,
    verifiers: &BTreeMap<usize, Vec<EcPoint>>,
    threshold: usize,
    total: usize,
) -> Result<(EcPoint, BTreeMap<usize, EcPoint>)> {
    let mut summed = Vec::with_capacity(threshold);
    for j in 0..threshold {
        let mut acc = EcPoint::scalar_to_point(curve, &BigInt::zero());
        for verifier in verifiers.values() {
            acc = acc.add(&verifier[j])?;
        }
        summed.push(acc);
    }

    let mut share_pub_key_map = BTreeMap::new();
    for k in 1..=total {
        let mut yi = summed[0].clone();
        let mut power = BigInt::one();
        for coefficient in summed.iter().skip(1) {
            power *= BigInt::from(k as u64);
            yi = yi.add(&coefficient.scalar_mult(&power)?)?;
        }
        share_pub_key_map.insert(k, yi);
    }
    Ok((summed[0].clone(), share_pub_key_map))
}

/// The joint chaincode is the contribution sum folded to 32 bytes.
fn chaincode_hex(sum: &BigInt) -> String {
    let folded = sum.mod_floor(&(BigInt::one() << 256usize));
    let bytes = crate::crypto::bytes_be(&folded);
    let mut out = [0u8; 32];
    out[32 - bytes.len()..].copy_from_slice(&bytes);
    hex::encode(out)
}
