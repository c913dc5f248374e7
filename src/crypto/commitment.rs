//! Binding hash commitment over a list of big integers.
//!
//! `C = HMAC-SHA-512(nonce || m_0 || ... || m_k)` with a fresh 32-byte nonce.
//! The witness is the full preimage including the nonce.

use num_bigint_dig::BigInt;

use crate::crypto::{bigint_from_bytes, random_bytes_32, sha512_int};

pub type Commitment = BigInt;
pub type Witness = Vec<BigInt>;

#[derive(Clone, Debug)]
pub struct HashCommitment {
    pub c: Commitment,
    pub msg: Witness,
}

impl HashCommitment {
    /// Commit to `secrets` under a fresh random nonce.
    pub fn new(secrets: &[BigInt]) -> HashCommitment {
        let nonce = bigint_from_bytes(&random_bytes_32());
        let mut msg = Vec::with_capacity(secrets.len() + 1);
        msg.push(nonce);
        msg.extend_from_slice(secrets);
        let c = sha512_int(&msg.iter().collect::<Vec<_>>());
        HashCommitment { c, msg }
    }

    /// Rebuild a commitment from a received value and witness for opening.
    pub fn from_parts(c: Commitment, msg: Witness) -> HashCommitment {
        HashCommitment { c, msg }
    }

    pub fn verify(&self) -> bool {
        sha512_int(&self.msg.iter().collect::<Vec<_>>()) == self.c
    }

    /// Returns the committed values (without the nonce) iff the commitment
    /// opens correctly.
    pub fn open(&self) -> Option<&[BigInt]> {
        if self.verify() {
            Some(&self.msg[1..])
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_and_open() {
        let secrets = vec![BigInt::from(123456u64), BigInt::from(42u64)];
        let cmt = HashCommitment::new(&secrets);
        assert!(cmt.verify());
        assert_eq!(cmt.open().unwrap(), &secrets[..]);
    }

    #[test]
    fn tampered_value_does_not_open() {
        let secrets = vec![BigInt::from(7u64)];
        let mut cmt = HashCommitment::new(&secrets);
        cmt.msg[1] += BigInt::from(1);
        assert!(!cmt.verify());
        assert!(cmt.open().is_none());
    }

    #[test]
    fn tampered_commitment_does_not_open() {
        let mut cmt = HashCommitment::new(&[BigInt::from(7u64)]);
        cmt.c += 1;
        assert!(cmt.open().is_none());
    }

    #[test]
    fn nonce_makes_commitments_hiding() {
        let secrets = vec![BigInt::from(7u64)];
        let a = HashCommitment::new(&secrets);
        let b = HashCommitment::new(&secrets);
        assert_ne!(a.c, b.c);
    }
}
