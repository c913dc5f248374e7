//! Non-hardened BIP32-style derivation of key shares, secp256k1 only.
//!
//! The child offset is HMAC-SHA-512 over (chaincode, parent public key x,
//! index) under a fixed label key; the left half shifts both the share and
//! the public key, the right half becomes the child chaincode. Hardened
//! derivation is impossible here: no party knows the full private key.

use hmac::{Hmac, Mac};
use num_bigint_dig::BigInt;
use num_integer::Integer;
use num_traits::Zero;
use sha2::Sha512;
use zeroize::Zeroize;

use crate::crypto::curve::{Curve, EcPoint};
use crate::crypto::{bigint_from_bytes, bytes_be};
use crate::{Error, Result};

const DERIVATION_LABEL: &[u8] = b"Key share derivation:\n";

/// Derivation state. `share_i` is optional so the public branch can be
/// derived by a party that only knows the public key.
pub struct TssKey {
    share_i: Option<BigInt>,
    public_key: EcPoint,
    chaincode: Vec<u8>,
    /// Accumulated private key offset across the derivation path.
    offset: BigInt,
}

impl Drop for TssKey {
    fn drop(&mut self) {
        if let Some(share) = self.share_i.as_mut() {
            share.zeroize();
        }
    }
}

impl TssKey {
    pub fn new(share_i: Option<BigInt>, public_key: EcPoint, chaincode: &str) -> Result<TssKey> {
        if public_key.curve != Curve::Secp256k1 {
            return Err(Error::InvalidArgument(
                "share derivation is only defined for secp256k1".into(),
            ));
        }
        if chaincode.is_empty() {
            return Err(Error::InvalidArgument("chaincode missing".into()));
        }
        let chaincode = hex::decode(chaincode)?;
        Ok(TssKey {
            share_i,
            public_key,
            chaincode,
            offset: BigInt::zero(),
        })
    }

    /// Derive the non-hardened child at `child_idx`.
    pub fn new_child_key(&self, child_idx: u32) -> Result<TssKey> {
        if child_idx >= 1 << 31 {
            return Err(Error::InvalidArgument(
                "hardened derivation is not supported".into(),
            ));
        }
        let curve = self.public_key.curve;
        let q = curve.order();

        let intermediary = private_offset(
            &bytes_be(&self.public_key.x),
            &self.chaincode,
            child_idx,
        );
        let offset = bigint_from_bytes(&intermediary[..32]);
        if offset.is_zero() || &offset >= q {
            return Err(Error::ArithmeticError(
                "derived offset outside the scalar field".into(),
            ));
        }

        let offset_point = EcPoint::scalar_to_point(curve, &offset);
        let public_key = self.public_key.add(&offset_point)?;
        let share_i = self
            .share_i
            .as_ref()
            .map(|share| (share + &offset).mod_floor(q));
        let accumulated = (&self.offset + &offset).mod_floor(q);

        Ok(TssKey {
            share_i,
            public_key,
            chaincode: intermediary[32..].to_vec(),
            offset: accumulated,
        })
    }

    /// Accumulated child share offset relative to the root.
    pub fn private_key_offset(&self) -> &BigInt {
        &self.offset
    }

    pub fn share_i(&self) -> Option<&BigInt> {
        self.share_i.as_ref()
    }

    pub fn public_key(&self) -> &EcPoint {
        &self.public_key
    }
}

/// HMAC-SHA-512(label, chaincode || pubkey_x || index_be).
fn private_offset(public_key_x: &[u8], chaincode: &[u8], child_idx: u32) -> [u8; 64] {
    let mut mac = Hmac::<Sha512>::new_from_slice(DERIVATION_LABEL)
        .expect("hmac accepts keys of any length");
    mac.update(chaincode);
    mac.update(public_key_x);
    mac.update(&child_idx.to_be_bytes());
    let mut out = [0u8; 64];
    out.copy_from_slice(mac.finalize().into_bytes().as_slice());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::random_num;

    fn root() -> (BigInt, TssKey) {
        let curve = Curve::Secp256k1;
        let x = random_num(curve.order());
        let point = EcPoint::scalar_to_point(curve, &x);
        let chaincode = hex::encode(b"chaincode");
        (x.clone(), TssKey::new(Some(x), point, &chaincode).unwrap())
    }

    #[test]
    fn child_share_matches_child_public_key() {
        let (_, key) = root();
        let child = key.new_child_key(996).unwrap();
        let expected = EcPoint::scalar_to_point(Curve::Secp256k1, child.share_i().unwrap());
        assert_eq!(&expected, child.public_key());
    }

    #[test]
    fn offset_accumulates_over_a_path() {
        let (x, key) = root();
        let curve = Curve::Secp256k1;
        let child = key
            .new_child_key(0)
            .and_then(|k| k.new_child_key(5))
            .and_then(|k| k.new_child_key(44))
            .unwrap();
        let rebuilt = (&x + child.private_key_offset()).mod_floor(curve.order());
        assert_eq!(&rebuilt, child.share_i().unwrap());
        assert_eq!(
            EcPoint::scalar_to_point(curve, &rebuilt),
            *child.public_key()
        );
    }

    #[test]
    fn public_only_branch_tracks_the_private_branch() {
        let (_, key) = root();
        let public_only =
            TssKey::new(None, key.public_key().clone(), &hex::encode(b"chaincode")).unwrap();
        let private_child = key.new_child_key(7).unwrap();
        let public_child = public_only.new_child_key(7).unwrap();
        assert_eq!(private_child.public_key(), public_child.public_key());
        assert!(public_child.share_i().is_none());
    }

    #[test]
    fn hardened_indices_are_rejected() {
        let (_, key) = root();
        assert!(key.new_child_key(1 << 31).is_err());
    }

    #[test]
    fn ed25519_roots_are_rejected() {
        let point = EcPoint::scalar_to_point(Curve::Ed25519, &BigInt::from(5));
        assert!(TssKey::new(None, point, &hex::encode(b"chaincode")).is_err());
    }
}
