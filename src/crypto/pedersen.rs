//! Pedersen commitment parameters over an RSA-like modulus, as in
//! eprint 2020/492 definition 1.2: N~ = p q for safe primes p, q, and two
//! random quadratic residues S, T. Commit(m, r) = S^m T^r mod N~ is
//! statistically hiding and computationally binding.

use num_bigint_dig::BigInt;
use serde::{Deserialize, Serialize};

use crate::crypto::prime::generate_safe_primes;
use crate::crypto::{random_num, ModInt};

/// Bit length of each safe prime factor of N~.
pub const PRIME_BITS: usize = 1024;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PedersenParameters {
    #[serde(rename = "S", with = "crate::serde_support::hex_int")]
    pub s: BigInt,
    #[serde(rename = "T", with = "crate::serde_support::hex_int")]
    pub t: BigInt,
    #[serde(rename = "Ntilde", with = "crate::serde_support::hex_int")]
    pub n_tilde: BigInt,
}

impl PedersenParameters {
    /// Fresh parameters from two new safe primes, using `concurrency`
    /// prime workers.
    pub fn generate(concurrency: usize) -> PedersenParameters {
        let (p, q) = generate_safe_primes(PRIME_BITS, concurrency);
        let n_tilde = &p * &q;
        let modint = ModInt(&n_tilde);
        let rnd1 = random_num(&n_tilde);
        let rnd2 = random_num(&n_tilde);
        let s = modint.mul(&rnd1, &rnd1);
        let t = modint.mul(&rnd2, &rnd2);
        PedersenParameters { s, t, n_tilde }
    }

    /// c = S^m T^r mod N~. Negative exponents are handled by inversion.
    pub fn commit(&self, m: &BigInt, r: &BigInt) -> BigInt {
        let modint = ModInt(&self.n_tilde);
        modint.mul(&modint.exp(&self.s, m), &modint.exp(&self.t, r))
    }

    pub fn open(&self, c: &BigInt, m: &BigInt, r: &BigInt) -> bool {
        &self.commit(m, r) == c
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use num_traits::One;

    /// Fixed 1024-bit safe primes so tests skip the prime search.
    pub(crate) const P_TILDE: &str = "142354491627346521074850885494501750387461558470927106299591801763815212686260307859331247249844475967739319884395123866345564469361595175635419256025612076308043484636168063805874254763197703885533342757189374030512391631111567049319025944061054743452810803381075218906065154968617458484743465810701548554487";
    pub(crate) const Q_TILDE: &str = "147971851760834590952720344259899673610808792790773916960844775954913906851329626675000088084160129505230049505247128989770370937104939414815846998169054423216249700876405031166816021621579093594960595401723939769692185125458067979325645746932807900965878670937194393349421990400753770815721547318839317945267";

    /// Deterministic parameters over the fixed modulus.
    pub(crate) fn test_parameters() -> PedersenParameters {
        let p = BigInt::parse_bytes(P_TILDE.as_bytes(), 10).unwrap();
        let q = BigInt::parse_bytes(Q_TILDE.as_bytes(), 10).unwrap();
        let n_tilde = &p * &q;
        let modint = ModInt(&n_tilde);
        let rnd1 = random_num(&n_tilde);
        let rnd2 = random_num(&n_tilde);
        PedersenParameters {
            s: modint.mul(&rnd1, &rnd1),
            t: modint.mul(&rnd2, &rnd2),
            n_tilde,
        }
    }

    #[test]
    fn commit_and_open() {
        let ped = test_parameters();
        let m = random_num(&ped.n_tilde);
        let r = random_num(&ped.n_tilde);
        let c = ped.commit(&m, &r);
        assert!(ped.open(&c, &m, &r));
        assert!(!ped.open(&c, &(&m + BigInt::one()), &r));
        assert!(!ped.open(&(&c + BigInt::one()), &m, &r));
    }

    #[test]
    fn negative_exponents_are_consistent() {
        let ped = test_parameters();
        let m = BigInt::from(-5);
        let r = BigInt::from(7);
        let c = ped.commit(&m, &r);
        assert!(ped.open(&c, &m, &r));
    }
}
