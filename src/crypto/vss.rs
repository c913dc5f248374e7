//! Feldman verifiable secret sharing over either curve.

use num_bigint_dig::BigInt;
use num_integer::Integer;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};

use crate::crypto::curve::{Curve, EcPoint};
use crate::crypto::random_num;
use crate::{Error, Result};

/// One secret share: the party id used as polynomial abscissa and the
/// polynomial evaluation at it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    #[serde(rename = "Id", with = "crate::serde_support::hex_int")]
    pub id: BigInt,
    #[serde(rename = "Y", with = "crate::serde_support::hex_int")]
    pub y: BigInt,
}

/// Polynomial with coefficients [a0, a1, ..., at] modulo the curve order.
/// a0 is the secret.
pub struct Polynomial {
    coefficients: Vec<BigInt>,
    q: BigInt,
}

impl Polynomial {
    pub fn new(curve: Curve, secret: &BigInt, degree: usize) -> Polynomial {
        let q = curve.order().clone();
        let mut coefficients = Vec::with_capacity(degree + 1);
        coefficients.push(secret.clone());
        for _ in 0..degree {
            coefficients.push(random_num(&q));
        }
        Polynomial { coefficients, q }
    }

    /// a0 + a1 x + a2 x^2 + ... mod q
    pub fn evaluate(&self, x: &BigInt) -> Share {
        let mut result = self.coefficients[0].clone();
        let mut power = BigInt::one();
        for coefficient in &self.coefficients[1..] {
            power *= x;
            result += coefficient * &power;
        }
        Share {
            id: x.clone(),
            y: result.mod_floor(&self.q),
        }
    }

    pub fn coefficients(&self) -> &[BigInt] {
        &self.coefficients
    }
}

/// Feldman scheme: shares plus per-coefficient curve points so every share
/// can be checked against the dealer's commitment.
pub struct Feldman {
    threshold: usize,
    limit: usize,
    curve: Curve,
}

impl Feldman {
    pub fn new(threshold: usize, limit: usize, curve: Curve) -> Result<Feldman> {
        if threshold < 2 {
            return Err(Error::InvalidArgument("threshold less than 2".into()));
        }
        if limit < threshold {
            return Err(Error::InvalidArgument("limit less than threshold".into()));
        }
        Ok(Feldman { threshold, limit, curve })
    }

    /// Deal `limit` shares of `secret` at abscissae 1..=limit, together with
    /// the verifier points [a0 G, a1 G, ...].
    pub fn evaluate(&self, secret: &BigInt) -> Result<(Vec<EcPoint>, Vec<Share>)> {
        let poly = Polynomial::new(self.curve, secret, self.threshold - 1);
        let shares = (1..=self.limit)
            .map(|i| poly.evaluate(&BigInt::from(i as u64)))
            .collect();
        let verifiers = poly
            .coefficients()
            .iter()
            .map(|c| EcPoint::scalar_to_point(self.curve, c))
            .collect();
        Ok((verifiers, shares))
    }

    /// share.y * G == sum_j share.id^j * verifiers[j]
    pub fn verify(&self, share: &Share, verifiers: &[EcPoint]) -> Result<bool> {
        if verifiers.len() < self.threshold {
            return Err(Error::InvalidArgument("feldman verify number error".into()));
        }
        let lhs = EcPoint::scalar_to_point(self.curve, &share.y);
        let mut x = BigInt::one();
        let mut rhs = verifiers[0].clone();
        for verifier in &verifiers[1..] {
            x *= &share.id;
            rhs = rhs.add(&verifier.scalar_mult(&x)?)?;
        }
        Ok(lhs == rhs)
    }
}

/// Lagrange interpolation at zero.
pub fn recover_secret(curve: Curve, shares: &[Share]) -> Result<BigInt> {
    let q = curve.order();
    let x_list: Vec<BigInt> = shares.iter().map(|share| share.id.clone()).collect();
    let mut secret = BigInt::zero();
    for share in shares {
        secret += cal_lagrangian(curve, &share.id, &share.y, &x_list)?;
    }
    Ok(secret.mod_floor(q))
}

/// One Lagrange term: w_i = y * prod_{x_j != x} x_j / (x_j - x) mod q.
pub fn cal_lagrangian(curve: Curve, x: &BigInt, y: &BigInt, x_list: &[BigInt]) -> Result<BigInt> {
    let q = curve.order();
    let modint = crate::crypto::ModInt(q);
    let mut w = y.clone();
    for xj in x_list {
        if xj == x {
            continue;
        }
        let inv = modint.inverse(&(xj - x).mod_floor(q)).ok_or_else(|| {
            Error::ArithmeticError("lagrange denominator is not invertible".into())
        })?;
        w *= xj * inv;
    }
    Ok(w.mod_floor(q))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shares_recover_the_secret() {
        for curve in [Curve::Secp256k1, Curve::Ed25519] {
            let secret = random_num(curve.order());
            let feldman = Feldman::new(2, 3, curve).unwrap();
            let (_, shares) = feldman.evaluate(&secret).unwrap();
            for pair in [[0, 1], [0, 2], [1, 2]] {
                let subset = vec![shares[pair[0]].clone(), shares[pair[1]].clone()];
                assert_eq!(recover_secret(curve, &subset).unwrap(), secret);
            }
            assert_eq!(recover_secret(curve, &shares).unwrap(), secret);
        }
    }

    #[test]
    fn higher_threshold_recovery() {
        let curve = Curve::Secp256k1;
        let secret = random_num(curve.order());
        let feldman = Feldman::new(3, 5, curve).unwrap();
        let (_, shares) = feldman.evaluate(&secret).unwrap();
        let subset = vec![shares[4].clone(), shares[1].clone(), shares[3].clone()];
        assert_eq!(recover_secret(curve, &subset).unwrap(), secret);
    }

    #[test]
    fn every_share_passes_feldman() {
        let curve = Curve::Secp256k1;
        let secret = random_num(curve.order());
        let feldman = Feldman::new(2, 4, curve).unwrap();
        let (verifiers, shares) = feldman.evaluate(&secret).unwrap();
        for share in &shares {
            assert!(feldman.verify(share, &verifiers).unwrap());
        }
    }

    #[test]
    fn tampering_flips_the_verdict() {
        let curve = Curve::Secp256k1;
        let secret = random_num(curve.order());
        let feldman = Feldman::new(2, 3, curve).unwrap();
        let (verifiers, shares) = feldman.evaluate(&secret).unwrap();

        let mut bad_share = shares[0].clone();
        bad_share.y += BigInt::one();
        assert!(!feldman.verify(&bad_share, &verifiers).unwrap());

        let mut bad_verifiers = verifiers.clone();
        bad_verifiers[1] = EcPoint::scalar_to_point(curve, &BigInt::from(99));
        assert!(!feldman.verify(&shares[0], &bad_verifiers).unwrap());
    }

    #[test]
    fn verifier_count_is_checked() {
        let curve = Curve::Secp256k1;
        let feldman = Feldman::new(2, 3, curve).unwrap();
        let (verifiers, shares) = feldman.evaluate(&BigInt::from(5)).unwrap();
        assert!(feldman.verify(&shares[0], &verifiers[..1]).is_err());
    }

    #[test]
    fn bad_parameters_are_rejected() {
        assert!(Feldman::new(1, 3, Curve::Secp256k1).is_err());
        assert!(Feldman::new(3, 2, Curve::Secp256k1).is_err());
    }

    #[test]
    fn share_json_uses_hex() {
        let share = Share { id: BigInt::from(3), y: BigInt::from(255) };
        let text = serde_json::to_string(&share).unwrap();
        assert_eq!(text, r#"{"Id":"3","Y":"ff"}"#);
        let back: Share = serde_json::from_str(&text).unwrap();
        assert_eq!(back, share);
    }
}
