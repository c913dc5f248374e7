//! Threshold signature library for 2-of-n ECDSA over secp256k1 and t-of-n
//! EdDSA over ed25519.
//!
//! Both schemes share one 3-round distributed key generation
//! ([`tss::dkg`]) that produces, per party, a key share, the joint public key,
//! a joint chaincode and the map of per-share public keys. From there the two
//! signing pipelines diverge:
//!
//! * **ECDSA** — a one-shot setup exchange ([`tss::ecdsa::keygen`]) reduces two
//!   chosen parties to a 2-of-2 sharing, ships P1's share under Paillier
//!   encryption together with a bundle of zero-knowledge proofs (N-root NIZK,
//!   Paillier–Blum, no-small-factor, DLN, group-element encryption-range), and
//!   the repeated 3-round signing protocol ([`tss::ecdsa::sign`]) evaluates
//!   `k2^-1 (h + x r)` homomorphically, guarded by an affine-operation proof.
//!   A failed verification puts the public key on a process-wide ban list
//!   (CVE-2023-33242: signing again after a failure leaks the Paillier key).
//! * **EdDSA** — any t parties Lagrange-reduce their shares and run the
//!   3-round commit/reveal nonce aggregation of [`tss::ed25519`].
//!
//! Key shares can be refreshed without changing the public key
//! ([`tss::reshare`]) and derived into non-hardened BIP32-style child shares
//! ([`tss::bip32`]).
//!
//! Messages between parties are `(from, to, data)` envelopes with JSON
//! payloads; delivery is the caller's problem. Any peer-to-peer message must
//! be sent over an encrypted channel and the sender of every message must be
//! authenticated, otherwise none of the proofs below mean anything.

pub mod crypto;
pub mod serde_support;
pub mod tss;

use thiserror::Error;

/// Errors surfaced by the primitives and the protocol state machines.
///
/// Zero-knowledge verifiers themselves return a bare `bool`; the protocol
/// layer maps a `false` to the matching variant so callers can tell which
/// check sank a session. A state machine that returned an error must be
/// discarded, not retried.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("round error")]
    WrongRound,
    #[error("messages number error")]
    MessageCount,
    #[error("message sending error")]
    MessageMismatch,
    #[error("commitment decommit fail")]
    CommitmentMismatch,
    #[error("session id mismatch")]
    SessionIdMismatch,
    #[error("feldman verify fail")]
    FeldmanVerifyFailed,
    #[error("schnorr verify fail")]
    SchnorrVerifyFailed,
    #[error("dln proof verify fail")]
    DlnProofFailed,
    #[error("paillier blum proof verify fail")]
    BlumProofFailed,
    #[error("no small factor proof verify fail")]
    NoSmallFactorProofFailed,
    #[error("range proof verify fail")]
    RangeProofFailed,
    #[error("paillier affine proof verify fail")]
    AffineProofFailed,
    #[error("paillier public key proof verify fail")]
    PaillierProofFailed,
    #[error("invalid paillier key length")]
    PaillierKeyLength,
    #[error("public keys are not equal")]
    PublicKeyMismatch,
    #[error("point is not on the curve")]
    NotOnCurve,
    #[error("point decode error: {0}")]
    PointDecode(String),
    #[error("arithmetic error: {0}")]
    ArithmeticError(String),
    #[error("ecdsa sign verify fail")]
    SignatureVerifyFailed,
    #[error("ecdsa sign forbidden, publicKey {0}")]
    SignForbidden(String),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error(transparent)]
    Hex(#[from] hex::FromHexError),
}

pub type Result<T> = std::result::Result<T, Error>;
