//! Key refresh: re-runs the DKG rounds with the same public key.
//!
//! Two nominated devotees split the existing key between them by Lagrange
//! reduction and redeal it; everyone else deals a zero contribution. The
//! constant terms therefore sum to the original secret and round 3 can
//! insist that the reconstructed public key has not moved. The chaincode is
//! not touched by a refresh.

use std::collections::BTreeMap;

use num_bigint_dig::BigInt;
use num_integer::Integer;
use num_traits::Zero;
use zeroize::Zeroize;

use crate::crypto::commitment::{Commitment, HashCommitment, Witness};
use crate::crypto::curve::EcPoint;
use crate::crypto::schnorr;
use crate::crypto::vss::{cal_lagrangian, Feldman, Share};
use crate::tss::dkg::{assemble_share_public_keys, unmarshal_verifiers};
use crate::tss::{KeyStep1Data, KeyStep2Data, KeyStep3Data, Message};
use crate::{Error, Result};

/// Per-party refresh state; the flow mirrors [`crate::tss::dkg::SetupInfo`].
pub struct RefreshInfo {
    pub device_number: usize,
    pub threshold: usize,
    pub total: usize,
    pub round_number: usize,

    devote_list: [usize; 2],
    ui: BigInt,
    public_key: EcPoint,
    verifiers: Vec<EcPoint>,
    secret_shares: Vec<Share>,
    dec_witness: Witness,
    commitment_map: BTreeMap<usize, Commitment>,
}

impl Drop for RefreshInfo {
    fn drop(&mut self) {
        self.ui.zeroize();
        for share in &mut self.secret_shares {
            share.y.zeroize();
        }
    }
}

impl RefreshInfo {
    /// `share_i` is required for the two devotees and ignored otherwise.
    pub fn new(
        device_number: usize,
        total: usize,
        devote_list: [usize; 2],
        share_i: Option<BigInt>,
        public_key: EcPoint,
    ) -> Result<RefreshInfo> {
        if total < 2 || device_number > total || device_number == 0 {
            return Err(Error::InvalidArgument("device number out of range".into()));
        }
        if devote_list[0] == devote_list[1]
            || devote_list.iter().any(|id| *id == 0 || *id > total)
        {
            return Err(Error::InvalidArgument("devote list invalid".into()));
        }

        let curve = public_key.curve;
        let ui = if devote_list.contains(&device_number) {
            let share_i = share_i.ok_or_else(|| {
                Error::InvalidArgument("devotee needs its existing key share".into())
            })?;
            let ids = [
                BigInt::from(devote_list[0] as u64),
                BigInt::from(devote_list[1] as u64),
            ];
            cal_lagrangian(curve, &BigInt::from(device_number as u64), &share_i, &ids)?
        } else {
            // non-contributors deal a zero polynomial so the joint key is
            // exactly the devotees' reduction
            BigInt::zero()
        };

        Ok(RefreshInfo {
            device_number,
            threshold: 2,
            total,
            round_number: 1,
            devote_list,
            ui,
            public_key,
            verifiers: Vec::new(),
            secret_shares: Vec::new(),
            dec_witness: Vec::new(),
            commitment_map: BTreeMap::new(),
        })
    }

    fn curve(&self) -> crate::crypto::curve::Curve {
        self.public_key.curve
    }

    /// Round 1: deal u_i (zero for non-devotees) and commit to the
    /// verifiers. No chaincode is involved in a refresh.
    pub fn refresh_step1(&mut self) -> Result<BTreeMap<usize, Message>> {
        if self.round_number != 1 {
            return Err(Error::WrongRound);
        }
        let feldman = Feldman::new(self.threshold, self.total, self.curve())?;
        let (verifiers, shares) = feldman.evaluate(&self.ui)?;

        let mut input = Vec::with_capacity(verifiers.len() * 2);
        for verifier in &verifiers {
            input.push(verifier.x.clone());
            input.push(verifier.y.clone());
        }
        let commitment = HashCommitment::new(&input);

        self.dec_witness = commitment.msg.clone();
        self.secret_shares = shares;
        self.verifiers = verifiers;
        self.round_number = 2;

        let data = serde_json::to_string(&KeyStep1Data { c: commitment.c })?;
        let mut out = BTreeMap::new();
        for id in 1..=self.total {
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

    /// Round 2: record peer commitments, distribute shares and the Schnorr
    /// proof of u_i.
    pub fn refresh_step2(&mut self, msgs: &[Message]) -> Result<BTreeMap<usize, Message>> {
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

        let ui_point = EcPoint::scalar_to_point(self.curve(), &self.ui);
        let proof = schnorr::prove(&self.ui, &ui_point)?;
        self.round_number = 3;

        let mut out = BTreeMap::new();
        for id in 1..=self.total {
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

    /// Round 3: open commitments, verify shares and proofs, and require the
    /// reconstructed public key to equal the preserved one.
    pub fn refresh_step3(&mut self, msgs: &[Message]) -> Result<KeyStep3Data> {
        if self.round_number != 3 {
            return Err(Error::WrongRound);
        }
        if msgs.len() != self.total - 1 {
            return Err(Error::MessageCount);
        }
        let curve = self.curve();
        let feldman = Feldman::new(self.threshold, self.total, curve)?;

        let mut verifiers: BTreeMap<usize, Vec<EcPoint>> = BTreeMap::new();
        verifiers.insert(self.device_number, self.verifiers.clone());
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
            let peer_verifiers = unmarshal_verifiers(curve, opened, self.threshold)?;

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
            assemble_share_public_keys(curve, &verifiers, self.threshold, self.total)?;

        let xi = xi.mod_floor(curve.order());
        let xi_point = EcPoint::scalar_to_point(curve, &xi);
        if share_pub_key_map[&self.device_number] != xi_point {
            return Err(Error::PublicKeyMismatch);
        }
        // a refresh must never move the joint key
        if public_key != self.public_key {
            return Err(Error::PublicKeyMismatch);
        }

        Ok(KeyStep3Data {
            id: self.device_number,
            share_i: xi,
            public_key,
            chain_code: String::new(),
            share_pub_key_map,
        })
    }

    pub fn devote_list(&self) -> [usize; 2] {
        self.devote_list
    }
}
