//! Protocol state machines: DKG, key refresh, BIP32-style derivation, the
//! ECDSA two-party pipeline and ed25519 threshold signing.

pub mod bip32;
pub mod dkg;
pub mod ecdsa;
pub mod ed25519;
pub mod reshare;


use std::collections::BTreeMap;

use num_bigint_dig::BigInt;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::crypto::commitment::{Commitment, Witness};
use crate::crypto::curve::EcPoint;
use crate::crypto::schnorr;
use crate::crypto::vss::Share;

/// One protocol message; `data` is a JSON payload specific to the step.
/// Delivery, confidentiality and sender authentication are the transport's
/// responsibility.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub from: usize,
    pub to: usize,
    pub data: String,
}

/// DKG round 1 payload: the verifier/chaincode commitment.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeyStep1Data {
    #[serde(rename = "c", with = "crate::serde_support::hex_int")]
    pub c: Commitment,
}

/// DKG round 2 payload: decommitment witness, the peer's secret share and
/// the Schnorr proof for the dealer's u_i.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeyStep2Data {
    #[serde(rename = "witness", with = "crate::serde_support::hex_int_vec")]
    pub witness: Witness,
    #[serde(rename = "share")]
    pub share: Share,
    #[serde(rename = "proof")]
    pub proof: schnorr::Proof,
}

/// Per-party result of a completed key generation: the key share, the joint
/// public key, the joint chaincode (hex, empty after a refresh) and every
/// party's share public key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeyStep3Data {
    #[serde(rename = "id")]
    pub id: usize,
    #[serde(rename = "share_i", with = "crate::serde_support::hex_int")]
    pub share_i: BigInt,
    #[serde(rename = "public_key")]
    pub public_key: EcPoint,
    #[serde(rename = "chaincode")]
    pub chain_code: String,
    #[serde(rename = "share_pubkey_map")]
    pub share_pub_key_map: BTreeMap<usize, EcPoint>,
}

impl Drop for KeyStep3Data {
    fn drop(&mut self) {
        self.share_i.zeroize();
    }
}
