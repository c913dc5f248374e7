//! Zero-knowledge proof suite.
//!
//! All proofs are made non-interactive with Fiat–Shamir over SHA-256; the
//! statement elements fix the transcript and witnesses are never hashed.
//! Their input ordering is part of the soundness argument — do not reorder.
//! Verifiers answer with a bare bool and give no reason for a rejection.

pub mod aff_g;
pub mod blum;
pub mod dln;
pub mod enc_range;
pub mod no_small_factor;
pub mod pdl_slack;
pub mod range;

use serde::{Deserialize, Serialize};

/// Knobs shared by the range-style proofs: the challenge is Q_bitlen bits
/// (soundness error 2^-Q_bitlen), Epsilon is the completeness slack on the
/// masked responses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityParameter {
    pub q_bitlen: usize,
    pub epsilon: usize,
}
