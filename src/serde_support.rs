//! Serde helpers for the wire format.
//!
//! Big integers travel as hex strings almost everywhere; the exceptions
//! (EC point coordinates, which are decimal) have their own impls next to
//! their types.

/// Big integer as a hex string, `#[serde(with = "serde_support::hex_int")]`.
pub mod hex_int {
    use num_bigint_dig::BigInt;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(n: &BigInt, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&n.to_str_radix(16))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigInt, D::Error> {
        let text = String::deserialize(deserializer)?;
        BigInt::parse_bytes(text.as_bytes(), 16)
            .ok_or_else(|| de::Error::custom(format!("cannot parse {:?} as a hex big integer", text)))
    }
}

/// Vector of big integers as hex strings.
pub mod hex_int_vec {
    use num_bigint_dig::BigInt;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &[BigInt], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(v.iter().map(|n| n.to_str_radix(16)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<BigInt>, D::Error> {
        let texts = Vec::<String>::deserialize(deserializer)?;
        texts
            .iter()
            .map(|text| {
                BigInt::parse_bytes(text.as_bytes(), 16).ok_or_else(|| {
                    de::Error::custom(format!("cannot parse {:?} as a hex big integer", text))
                })
            })
            .collect()
    }
}

/// Byte string as hex.
pub mod hex_bytes {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        hex::decode(&text).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use num_bigint_dig::BigInt;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    struct Sample {
        #[serde(with = "super::hex_int")]
        n: BigInt,
        #[serde(with = "super::hex_int_vec")]
        v: Vec<BigInt>,
    }

    #[test]
    fn hex_round_trip() {
        let sample = Sample {
            n: BigInt::from(0xdeadbeefu64),
            v: vec![BigInt::from(0), BigInt::from(255)],
        };
        let text = serde_json::to_string(&sample).unwrap();
        assert!(text.contains("deadbeef"));
        let back: Sample = serde_json::from_str(&text).unwrap();
        assert_eq!(back.n, sample.n);
        assert_eq!(back.v, sample.v);
    }
}
