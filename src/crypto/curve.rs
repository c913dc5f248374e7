//! Curve-agnostic elliptic curve points over secp256k1 and edwards25519.
//!
//! A point is stored in affine coordinates so it can be hashed into
//! transcripts and serialised independently of the backend; the group
//! operations delegate to `k256` and `curve25519-dalek`.
//!
//! The secp256k1 point at infinity is represented by the (0, 0) sentinel and
//! is accepted by construction and by the group operations; it shows up as a
//! legal value in protocols where a party contributes a zero scalar (key
//! refresh). On edwards25519 the identity is the ordinary point (0, 1).

use curve25519_dalek::edwards::CompressedEdwardsY;
use curve25519_dalek::traits::Identity;
use curve25519_dalek::{EdwardsPoint, Scalar as EdScalar};
use k256::elliptic_curve::ff::PrimeField;
use k256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use k256::{AffinePoint, EncodedPoint, FieldBytes, ProjectivePoint, Scalar};
use num_bigint_dig::BigInt;
use num_integer::Integer;
use num_traits::{One, Signed, Zero};
use once_cell::sync::Lazy;
use serde::de::Error as _;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, Result};

static SECP256K1_N: Lazy<BigInt> = Lazy::new(|| {
    BigInt::parse_bytes(
        b"fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141",
        16,
    )
    .expect("secp256k1 order constant")
});

static SECP256K1_P: Lazy<BigInt> = Lazy::new(|| {
    BigInt::parse_bytes(
        b"fffffffffffffffffffffffffffffffffffffffffffffffffffffffefffffc2f",
        16,
    )
    .expect("secp256k1 field constant")
});

/// 2^252 + 27742317777372353535851937790883648493
static ED25519_L: Lazy<BigInt> = Lazy::new(|| {
    BigInt::parse_bytes(
        b"1000000000000000000000000000000014def9dea2f79cd65812631a5cf5d3ed",
        16,
    )
    .expect("ed25519 order constant")
});

/// 2^255 - 19
static ED25519_P: Lazy<BigInt> = Lazy::new(|| (BigInt::one() << 255usize) - BigInt::from(19));

/// d = -121665/121666 mod p
static ED25519_D: Lazy<BigInt> = Lazy::new(|| {
    let p = &*ED25519_P;
    let inv = crate::crypto::ModInt(p)
        .inverse(&BigInt::from(121666))
        .expect("121666 is invertible mod the ed25519 field prime");
    (BigInt::from(-121665) * inv).mod_floor(p)
});

/// sqrt(-1) = 2^((p-1)/4) mod p
static ED25519_SQRT_M1: Lazy<BigInt> = Lazy::new(|| {
    let p = &*ED25519_P;
    let exp = (p - BigInt::one()) >> 2usize;
    crate::crypto::ModInt(p).exp(&BigInt::from(2), &exp)
});

/// Supported curves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Curve {
    Secp256k1,
    Ed25519,
}

impl Curve {
    /// Group order.
    pub fn order(&self) -> &'static BigInt {
        match self {
            Curve::Secp256k1 => &SECP256K1_N,
            Curve::Ed25519 => &ED25519_L,
        }
    }

    fn field(&self) -> &'static BigInt {
        match self {
            Curve::Secp256k1 => &SECP256K1_P,
            Curve::Ed25519 => &ED25519_P,
        }
    }
}

impl std::fmt::Display for Curve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Curve::Secp256k1 => write!(f, "secp256k1"),
            Curve::Ed25519 => write!(f, "ed25519"),
        }
    }
}

/// Affine point on one of the supported curves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EcPoint {
    pub curve: Curve,
    pub x: BigInt,
    pub y: BigInt,
}

impl EcPoint {
    /// Build a point from affine coordinates, rejecting anything that is not
    /// on the curve (the secp256k1 infinity sentinel passes).
    pub fn new(curve: Curve, x: BigInt, y: BigInt) -> Result<EcPoint> {
        let point = EcPoint { curve, x, y };
        if !point.is_on_curve() {
            return Err(Error::NotOnCurve);
        }
        Ok(point)
    }

    /// k * G for the curve base point; k is reduced modulo the group order.
    pub fn scalar_to_point(curve: Curve, k: &BigInt) -> EcPoint {
        let k = k.mod_floor(curve.order());
        match curve {
            Curve::Secp256k1 => {
                if k.is_zero() {
                    return EcPoint::secp_identity();
                }
                let point = ProjectivePoint::GENERATOR * secp_scalar(&k);
                let (x, y) = secp_coords(&point);
                EcPoint { curve, x, y }
            }
            Curve::Ed25519 => {
                let point = EdwardsPoint::mul_base(&ed_scalar(&k));
                let (x, y) = ed_coords(&point);
                EcPoint { curve, x, y }
            }
        }
    }

    fn secp_identity() -> EcPoint {
        EcPoint {
            curve: Curve::Secp256k1,
            x: BigInt::zero(),
            y: BigInt::zero(),
        }
    }

    pub fn is_identity(&self) -> bool {
        match self.curve {
            Curve::Secp256k1 => self.x.is_zero() && self.y.is_zero(),
            Curve::Ed25519 => self.x.is_zero() && self.y.is_one(),
        }
    }

    pub fn is_on_curve(&self) -> bool {
        let p = self.curve.field();
        if self.x.is_negative() || self.y.is_negative() || &self.x >= p || &self.y >= p {
            return false;
        }
        let modint = crate::crypto::ModInt(p);
        match self.curve {
            Curve::Secp256k1 => {
                if self.is_identity() {
                    return true;
                }
                // y^2 = x^3 + 7
                let lhs = modint.mul(&self.y, &self.y);
                let rhs = modint.add(&modint.exp(&self.x, &BigInt::from(3)), &BigInt::from(7));
                lhs == rhs
            }
            Curve::Ed25519 => {
                // -x^2 + y^2 = 1 + d x^2 y^2
                let xx = modint.mul(&self.x, &self.x);
                let yy = modint.mul(&self.y, &self.y);
                let lhs = modint.sub(&yy, &xx);
                let rhs = modint.add(&BigInt::one(), &modint.mul(&ED25519_D, &modint.mul(&xx, &yy)));
                lhs == rhs
            }
        }
    }

    /// Group addition.
    pub fn add(&self, other: &EcPoint) -> Result<EcPoint> {
        if self.curve != other.curve {
            return Err(Error::InvalidArgument("curve mismatch in point add".into()));
        }
        match self.curve {
            Curve::Secp256k1 => {
                if self.is_identity() {
                    return Ok(other.clone());
                }
                if other.is_identity() {
                    return Ok(self.clone());
                }
                let sum = secp_point(&self.x, &self.y)? + secp_point(&other.x, &other.y)?;
                let (x, y) = secp_coords(&sum);
                Ok(EcPoint { curve: self.curve, x, y })
            }
            Curve::Ed25519 => {
                let sum = ed_point(&self.x, &self.y)? + ed_point(&other.x, &other.y)?;
                let (x, y) = ed_coords(&sum);
                Ok(EcPoint { curve: self.curve, x, y })
            }
        }
    }

    /// Scalar multiplication; k is reduced modulo the group order.
    pub fn scalar_mult(&self, k: &BigInt) -> Result<EcPoint> {
        let k = k.mod_floor(self.curve.order());
        match self.curve {
            Curve::Secp256k1 => {
                if self.is_identity() || k.is_zero() {
                    return Ok(EcPoint::secp_identity());
                }
                let point = secp_point(&self.x, &self.y)? * secp_scalar(&k);
                let (x, y) = secp_coords(&point);
                Ok(EcPoint { curve: self.curve, x, y })
            }
            Curve::Ed25519 => {
                let point = ed_point(&self.x, &self.y)? * ed_scalar(&k);
                let (x, y) = ed_coords(&point);
                Ok(EcPoint { curve: self.curve, x, y })
            }
        }
    }

    /// Compressed SEC1 encoding of a secp256k1 point, hex.
    pub fn to_ecdsa_pub_key(&self) -> Result<String> {
        if self.curve != Curve::Secp256k1 || self.is_identity() {
            return Err(Error::InvalidArgument(
                "not a secp256k1 public key point".into(),
            ));
        }
        let mut out = Vec::with_capacity(33);
        out.push(if self.y.is_even() { 0x02 } else { 0x03 });
        out.extend_from_slice(&be_bytes_32(&self.x));
        Ok(hex::encode(out))
    }

    /// Compressed edwards encoding of an ed25519 point, hex.
    pub fn to_ed25519_pub_key(&self) -> Result<String> {
        if self.curve != Curve::Ed25519 {
            return Err(Error::InvalidArgument(
                "not an ed25519 public key point".into(),
            ));
        }
        Ok(hex::encode(ed_compress(&self.x, &self.y)))
    }
}

/// Parse a hex, SEC1-compressed secp256k1 public key.
pub fn ecdsa_pub_key_to_point(pub_key: &str) -> Result<EcPoint> {
    let bytes = hex::decode(pub_key)?;
    let encoded = EncodedPoint::from_bytes(&bytes)
        .map_err(|e| Error::PointDecode(e.to_string()))?;
    let affine = Option::<AffinePoint>::from(AffinePoint::from_encoded_point(&encoded))
        .ok_or(Error::NotOnCurve)?;
    let (x, y) = secp_coords(&ProjectivePoint::from(affine));
    Ok(EcPoint { curve: Curve::Secp256k1, x, y })
}

/// Parse a hex, compressed-edwards ed25519 public key.
pub fn ed25519_pub_key_to_point(pub_key: &str) -> Result<EcPoint> {
    let bytes = hex::decode(pub_key)?;
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|_| Error::PointDecode("ed25519 public key must be 32 bytes".into()))?;
    let (x, y) = ed_decompress(&bytes)?;
    Ok(EcPoint { curve: Curve::Ed25519, x, y })
}

fn be_bytes_32(n: &BigInt) -> [u8; 32] {
    let bytes = crate::crypto::bytes_be(n);
    let mut out = [0u8; 32];
    out[32 - bytes.len()..].copy_from_slice(&bytes);
    out
}

fn le_bytes_32(n: &BigInt) -> [u8; 32] {
    let mut out = be_bytes_32(n);
    out.reverse();
    out
}

fn secp_scalar(k: &BigInt) -> Scalar {
    // the caller reduces k modulo the order first, so from_repr cannot fail
    let bytes = be_bytes_32(k);
    Option::from(Scalar::from_repr(*FieldBytes::from_slice(&bytes))).unwrap_or(Scalar::ZERO)
}

fn secp_point(x: &BigInt, y: &BigInt) -> Result<ProjectivePoint> {
    let encoded = EncodedPoint::from_affine_coordinates(
        FieldBytes::from_slice(&be_bytes_32(x)),
        FieldBytes::from_slice(&be_bytes_32(y)),
        false,
    );
    let affine = Option::<AffinePoint>::from(AffinePoint::from_encoded_point(&encoded))
        .ok_or(Error::NotOnCurve)?;
    Ok(ProjectivePoint::from(affine))
}

fn secp_coords(point: &ProjectivePoint) -> (BigInt, BigInt) {
    let encoded = point.to_affine().to_encoded_point(false);
    match (encoded.x(), encoded.y()) {
        (Some(x), Some(y)) => (
            crate::crypto::bigint_from_bytes(x.as_slice()),
            crate::crypto::bigint_from_bytes(y.as_slice()),
        ),
        // point at infinity
        _ => (BigInt::zero(), BigInt::zero()),
    }
}

fn ed_scalar(k: &BigInt) -> EdScalar {
    let k = k.mod_floor(&ED25519_L);
    EdScalar::from_bytes_mod_order(le_bytes_32(&k))
}

fn ed_compress(x: &BigInt, y: &BigInt) -> [u8; 32] {
    let mut bytes = le_bytes_32(y);
    if x.is_odd() {
        bytes[31] |= 0x80;
    }
    bytes
}

fn ed_point(x: &BigInt, y: &BigInt) -> Result<EdwardsPoint> {
    CompressedEdwardsY(ed_compress(x, y))
        .decompress()
        .ok_or(Error::NotOnCurve)
}

fn ed_coords(point: &EdwardsPoint) -> (BigInt, BigInt) {
    if *point == EdwardsPoint::identity() {
        return (BigInt::zero(), BigInt::one());
    }
    let compressed = point.compress().to_bytes();
    // decompression of a point we just compressed cannot fail
    ed_decompress(&compressed).unwrap_or((BigInt::zero(), BigInt::one()))
}

/// Affine coordinates from a compressed edwards encoding (RFC 8032 §5.1.3).
fn ed_decompress(bytes: &[u8; 32]) -> Result<(BigInt, BigInt)> {
    let sign = bytes[31] >> 7;
    let mut y_bytes = *bytes;
    y_bytes[31] &= 0x7f;
    y_bytes.reverse();
    let y = crate::crypto::bigint_from_bytes(&y_bytes);
    let p = &*ED25519_P;
    if &y >= p {
        return Err(Error::PointDecode("ed25519 y coordinate out of range".into()));
    }
    let modint = crate::crypto::ModInt(p);
    // x^2 = (y^2 - 1) / (d y^2 + 1)
    let yy = modint.mul(&y, &y);
    let u = modint.sub(&yy, &BigInt::one());
    let v = modint.add(&modint.mul(&ED25519_D, &yy), &BigInt::one());
    // candidate root x = u v^3 (u v^7)^((p-5)/8)
    let v3 = modint.mul(&modint.mul(&v, &v), &v);
    let v7 = modint.mul(&modint.mul(&v3, &v3), &v);
    let exp = (p - BigInt::from(5)) >> 3usize;
    let uv7_pow = modint.exp(&modint.mul(&u, &v7), &exp);
    let mut x = modint.mul(&modint.mul(&u, &v3), &uv7_pow);
    let vxx = modint.mul(&v, &modint.mul(&x, &x));
    if vxx != u {
        if vxx == modint.sub(&BigInt::zero(), &u) {
            x = modint.mul(&x, &ED25519_SQRT_M1);
        } else {
            return Err(Error::NotOnCurve);
        }
    }
    if x.is_zero() && sign == 1 {
        return Err(Error::PointDecode("ed25519 sign bit set for x = 0".into()));
    }
    if x.is_odd() != (sign == 1) {
        x = p - &x;
    }
    Ok((x, y))
}

// Points serialise as {"Curve": name, "X": decimal, "Y": decimal}; the
// decimal coordinates are bare JSON numbers, which needs serde_json's
// arbitrary-precision numbers to survive a round trip.
#[derive(Serialize, Deserialize)]
struct PointRepr {
    #[serde(rename = "Curve")]
    curve: Curve,
    #[serde(rename = "X")]
    x: serde_json::Value,
    #[serde(rename = "Y")]
    y: serde_json::Value,
}

fn decimal_value(n: &BigInt) -> serde_json::Result<serde_json::Value> {
    serde_json::from_str(&n.to_str_radix(10))
}

fn value_to_bigint(value: &serde_json::Value) -> Option<BigInt> {
    if !value.is_number() {
        return None;
    }
    BigInt::parse_bytes(value.to_string().as_bytes(), 10)
}

impl Serialize for EcPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let repr = PointRepr {
            curve: self.curve,
            x: decimal_value(&self.x).map_err(S::Error::custom)?,
            y: decimal_value(&self.y).map_err(S::Error::custom)?,
        };
        repr.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for EcPoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let repr = PointRepr::deserialize(deserializer)?;
        let parse = |v: &serde_json::Value| {
            value_to_bigint(v).ok_or_else(|| D::Error::custom("point coordinate is not an integer"))
        };
        let point = EcPoint {
            curve: repr.curve,
            x: parse(&repr.x)?,
            y: parse(&repr.y)?,
        };
        if !point.is_on_curve() {
            return Err(D::Error::custom("point not on the curve"));
        }
        Ok(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::random_num;

    #[test]
    fn base_point_round_trips_both_curves() {
        for curve in [Curve::Secp256k1, Curve::Ed25519] {
            let g = EcPoint::scalar_to_point(curve, &BigInt::one());
            assert!(g.is_on_curve());
            let again = EcPoint::new(curve, g.x.clone(), g.y.clone()).unwrap();
            assert_eq!(g, again);
        }
    }

    #[test]
    fn addition_matches_scalar_multiplication() {
        for curve in [Curve::Secp256k1, Curve::Ed25519] {
            let a = random_num(curve.order());
            let b = random_num(curve.order());
            let pa = EcPoint::scalar_to_point(curve, &a);
            let pb = EcPoint::scalar_to_point(curve, &b);
            let sum = pa.add(&pb).unwrap();
            let direct = EcPoint::scalar_to_point(curve, &(&a + &b));
            assert_eq!(sum, direct);
        }
    }

    #[test]
    fn scalar_mult_is_associative_with_base() {
        for curve in [Curve::Secp256k1, Curve::Ed25519] {
            let a = random_num(curve.order());
            let b = random_num(curve.order());
            let left = EcPoint::scalar_to_point(curve, &a).scalar_mult(&b).unwrap();
            let right = EcPoint::scalar_to_point(curve, &(&a * &b));
            assert_eq!(left, right);
        }
    }

    #[test]
    fn identity_behaviour() {
        for curve in [Curve::Secp256k1, Curve::Ed25519] {
            let zero = EcPoint::scalar_to_point(curve, &BigInt::zero());
            assert!(zero.is_identity());
            assert!(zero.is_on_curve());
            let g = EcPoint::scalar_to_point(curve, &BigInt::one());
            assert_eq!(zero.add(&g).unwrap(), g);
            assert_eq!(g.add(&zero).unwrap(), g);
        }
    }

    #[test]
    fn off_curve_points_are_rejected() {
        let g = EcPoint::scalar_to_point(Curve::Secp256k1, &BigInt::one());
        assert!(EcPoint::new(Curve::Secp256k1, g.x.clone(), &g.y + BigInt::one()).is_err());
        let g = EcPoint::scalar_to_point(Curve::Ed25519, &BigInt::one());
        assert!(EcPoint::new(Curve::Ed25519, g.x.clone(), &g.y + BigInt::one()).is_err());
    }

    #[test]
    fn pub_key_codecs_round_trip() {
        let k = random_num(Curve::Secp256k1.order());
        let point = EcPoint::scalar_to_point(Curve::Secp256k1, &k);
        let encoded = point.to_ecdsa_pub_key().unwrap();
        assert_eq!(encoded.len(), 66);
        assert_eq!(ecdsa_pub_key_to_point(&encoded).unwrap(), point);

        let k = random_num(Curve::Ed25519.order());
        let point = EcPoint::scalar_to_point(Curve::Ed25519, &k);
        let encoded = point.to_ed25519_pub_key().unwrap();
        assert_eq!(encoded.len(), 64);
        assert_eq!(ed25519_pub_key_to_point(&encoded).unwrap(), point);
    }

    #[test]
    fn json_round_trip_uses_decimal_coordinates() {
        let point = EcPoint::scalar_to_point(Curve::Secp256k1, &BigInt::from(7));
        let text = serde_json::to_string(&point).unwrap();
        assert!(text.contains("\"Curve\":\"secp256k1\""));
        assert!(!text.contains("\"X\":\""), "coordinates must be numbers: {text}");
        let back: EcPoint = serde_json::from_str(&text).unwrap();
        assert_eq!(back, point);
    }

    #[test]
    fn json_rejects_off_curve_point() {
        let point = EcPoint::scalar_to_point(Curve::Secp256k1, &BigInt::from(7));
        let text = serde_json::to_string(&point).unwrap();
        let tampered =
            text.replace(&point.y.to_str_radix(10), &(&point.y + BigInt::one()).to_str_radix(10));
        assert!(serde_json::from_str::<EcPoint>(&tampered).is_err());
    }
}
