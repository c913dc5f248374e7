//! Paillier cryptosystem over a safe-prime modulus, with the additive
//! homomorphisms the signing protocol relies on and a non-interactive proof
//! that the modulus is well formed.
//!
//! g is fixed to N+1, so E(m, r) = (1 + mN) r^N mod N^2.

use aes::cipher::{KeyIvInit, StreamCipher};
use aes::Aes128;
use num_bigint_dig::{BigInt, ModInverse};
use num_integer::Integer;
use num_traits::{One, Signed, Zero};
use once_cell::sync::Lazy;
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::crypto::{bigint_from_bytes, bytes_be, random_coprime_num, ModInt};
use crate::crypto::prime::generate_safe_primes;
use crate::{Error, Result};

/// Bit length of the modulus N.
pub const PRIME_BITS: usize = 2048;

/// Iteration count of the N-root NIZK; parameters from eprint 2018/987 §6.2.3.
const NIZK_ITERATIONS: usize = 11;

/// Product of all primes below 6370, used by the NIZK verifier to rule out
/// small factors.
const SMALL_PRIME_PRODUCT: &str = "44871651744009136248115543081640547413785854417842050160655833875792914833852769205831424979368719986889519256934239452438251108738670217298542180982547421007901019408155961940142468907900676141149633188172029947498666222471142795699128314649438784106402197023949268047384343715946006767671319388463922366703585708460135453240679421061304864609915827908896062350138633849514905858373339528086006145373712431756746905467935232935398951226852071323775412278763371089401544920873813490290672436809231516731065356763193493525160238868779310055137922174496115680527519932793977258424479253973670103634070028863591207614649216492780891961054287421831028229266989697058385612003557825398202548657910983931484180193293615175594925895929359108723671212631368891689462486968022029482413912928883488902454913524492340322599922718890878760895105937402913873414377276608236656947832307175090505396675623505955607363683869194683635689701238311577953994900734498406703176954324494694474545570839360607926610248093452739817614097197031607820417729009847465138388398887861935127785385309564525648905444610640901769290645369888935446477559073843982605496992468605588284307311971153579731703863970674466666844817336319390617551354845025116350295041840093627836067370100384861820888752358520276041000456608056339377573485917445104757987800101659688183150320442308091835974182809184299472568260682774683272697993855730500061223160274918361373258473553412704497335663924406111413972911417644029226449602417135116011968946232623154008710271296183350215563946003547561056456285939676838623311370087238225630994506113422922846572616538637723054222166159389475617214681282874373185283568512603887750846072033376432252677883915884203823739988948315257311383912016966925295975180180438969999175030785077627458887411146486902613291202008193902979800279637509789564807502239686755727063367075758492823731724669702442450502667810890608807091448688985203084972035197770874223259420649055450382725355162738490355628688943706634905982449810389530661328557381850782677221561924983234877936783136471890539395124220965982831778882400224156689487137227198030461624542872774217771594215907203725682315714199249588874271661233929713660269883273404764648327455796699366900022345171030564747210542398285078804310752063852249740561571105640741618793118627170070315410588646442647771802031066589341358879304845579387079972404386434238273904239604603511925708377008467129590636257287965232576327580009018475271364237665836186806027331208426256451429549641988386585949300254487647395222785274120561299318070944530096970076560461229486504018773252771360855091191876004370694539453020462096690084476681253865429278552786361828508910022714749051734108364178374765700925133405508684883070";

static SMALL_PRIMES: Lazy<BigInt> = Lazy::new(|| {
    BigInt::parse_bytes(SMALL_PRIME_PRODUCT.as_bytes(), 10).expect("small prime product constant")
});

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PublicKey {
    #[serde(rename = "N", with = "crate::serde_support::hex_int")]
    pub n: BigInt,
}

#[derive(Clone, Debug)]
pub struct PrivateKey {
    pub public_key: PublicKey,
    /// lcm(p-1, q-1)
    pub(crate) lambda: BigInt,
    /// (p-1)(q-1)
    pub(crate) phi: BigInt,
    pub(crate) p: BigInt,
    pub(crate) q: BigInt,
}

impl Drop for PrivateKey {
    fn drop(&mut self) {
        self.lambda.zeroize();
        self.phi.zeroize();
        self.p.zeroize();
        self.q.zeroize();
    }
}

/// Generate a Paillier key pair from two fresh safe primes of
/// [`PRIME_BITS`]/2 bits, using `concurrency` prime workers.
pub fn new_key_pair(concurrency: usize) -> (PrivateKey, PublicKey) {
    let (p, q) = generate_safe_primes(PRIME_BITS / 2, concurrency);
    let private = PrivateKey::from_primes(p, q);
    let public = private.public_key.clone();
    (private, public)
}

impl PublicKey {
    /// N^2, the ciphertext modulus.
    pub fn n2(&self) -> BigInt {
        &self.n * &self.n
    }

    /// g = N + 1.
    pub fn g(&self) -> BigInt {
        &self.n + BigInt::one()
    }

    /// Encrypt m with fresh randomness; returns (ciphertext, randomness).
    pub fn encrypt(&self, m: &BigInt) -> Result<(BigInt, BigInt)> {
        let r = random_coprime_num(&self.n);
        let c = self.encrypt_with_r(m, &r)?;
        Ok((c, r))
    }

    /// E(m, r) = g^m r^N mod N^2, with 0 <= m < N.
    pub fn encrypt_with_r(&self, m: &BigInt, r: &BigInt) -> Result<BigInt> {
        if m.is_negative() || m >= &self.n {
            return Err(Error::InvalidArgument("paillier message range error".into()));
        }
        let n2 = self.n2();
        let modint = ModInt(&n2);
        let gm = modint.exp(&self.g(), m);
        let rn = modint.exp(r, &self.n);
        Ok(modint.mul(&gm, &rn))
    }

    /// E(a+b) = E(a) * E(b) mod N^2.
    pub fn homo_add(&self, c1: &BigInt, c2: &BigInt) -> Result<BigInt> {
        let n2 = self.n2();
        for c in [c1, c2] {
            if c.is_negative() || c >= &n2 {
                return Err(Error::InvalidArgument("paillier ciphertext range error".into()));
            }
        }
        Ok(ModInt(&n2).mul(c1, c2))
    }

    /// E(a+b) = E(a) * (1 + bN) mod N^2 for a plaintext b.
    pub fn homo_add_plain(&self, c: &BigInt, b: &BigInt) -> Result<BigInt> {
        let n2 = self.n2();
        if c.is_negative() || c >= &n2 {
            return Err(Error::InvalidArgument("paillier ciphertext range error".into()));
        }
        if b.is_negative() || b >= &self.n {
            return Err(Error::InvalidArgument("paillier message range error".into()));
        }
        let gb = b * &self.n + BigInt::one();
        Ok(ModInt(&n2).mul(c, &gb))
    }

    /// E(a m) = E(a)^m mod N^2 for a plaintext m.
    pub fn homo_mul_plain(&self, c: &BigInt, m: &BigInt) -> Result<BigInt> {
        if m.is_negative() || m >= &self.n {
            return Err(Error::InvalidArgument("paillier message range error".into()));
        }
        let n2 = self.n2();
        if c.is_negative() || c >= &n2 {
            return Err(Error::InvalidArgument("paillier ciphertext range error".into()));
        }
        Ok(ModInt(&n2).exp(c, m))
    }

    /// Fresh randomness on an existing ciphertext: c * r^N mod N^2.
    pub fn rerandomize(&self, c: &BigInt, r: &BigInt) -> Result<BigInt> {
        let n2 = self.n2();
        if c.is_negative() || c >= &n2 {
            return Err(Error::InvalidArgument("paillier ciphertext range error".into()));
        }
        let modint = ModInt(&n2);
        Ok(modint.mul(c, &modint.exp(r, &self.n)))
    }
}

impl PrivateKey {
    pub(crate) fn from_primes(p: BigInt, q: BigInt) -> PrivateKey {
        let n = &p * &q;
        let p_minus_1 = &p - BigInt::one();
        let q_minus_1 = &q - BigInt::one();
        let phi = &p_minus_1 * &q_minus_1;
        let lambda = &phi / p_minus_1.gcd(&q_minus_1);
        PrivateKey {
            public_key: PublicKey { n },
            lambda,
            phi,
            p,
            q,
        }
    }

    pub fn n2(&self) -> BigInt {
        self.public_key.n2()
    }

    /// m = L(c^lambda mod N^2) / L(g^lambda mod N^2) mod N, L(x) = (x-1)/N.
    pub fn decrypt(&self, c: &BigInt) -> Result<BigInt> {
        let n = &self.public_key.n;
        let n2 = self.n2();
        if c.is_negative() || c >= &n2 {
            return Err(Error::InvalidArgument("paillier ciphertext range error".into()));
        }
        if !c.gcd(&n2).is_one() {
            return Err(Error::InvalidArgument("the message is mal-formed".into()));
        }
        let modint = ModInt(&n2);
        let lc = l_function(&modint.exp(c, &self.lambda), n);
        let lg = l_function(&modint.exp(&self.public_key.g(), &self.lambda), n);
        let inv = lg
            .mod_inverse(n)
            .ok_or_else(|| Error::ArithmeticError("paillier decrypt inverse".into()))?;
        Ok((lc * inv).mod_floor(n))
    }
}

fn l_function(u: &BigInt, n: &BigInt) -> BigInt {
    (u - BigInt::one()) / n
}

type Aes128Ctr = ctr::Ctr128BE<Aes128>;

/// Pseudorandom value derived from SHA-256(N || session) via an AES-CTR
/// keystream of (N_bytes/16 + 2) blocks, reduced modulo N. The stream is
/// restarted with a zero IV for every proof iteration, so each iteration sees
/// the same rho.
fn nizk_rho(n: &BigInt, session_id: &[u8]) -> BigInt {
    let mut hasher = Sha256::new();
    hasher.update(bytes_be(n));
    hasher.update(session_id);
    let seed = hasher.finalize();

    let mut key = [0u8; 16];
    key.copy_from_slice(&seed.as_slice()[..16]);
    let iv = [0u8; 16];

    let n_len = (n.bits() + 7) / 8;
    let mut stream = vec![0u8; (n_len / 16 + 2) * 16];
    let mut cipher = Aes128Ctr::new(&key.into(), &iv.into());
    cipher.apply_keystream(&mut stream);
    bigint_from_bytes(&stream).mod_floor(n)
}

/// Non-interactive proof of knowledge of an N-th root, i.e. of phi(N); shows
/// N is a product of two primes of comparable size (eprint 2018/057). The
/// proof is the concatenation of [`NIZK_ITERATIONS`] sigma values, each
/// left-padded to the byte length of N.
pub fn nizk_proof_with_session(n: &BigInt, phi: &BigInt, session_id: &[u8]) -> Result<Vec<u8>> {
    let n_inv = n
        .mod_inverse(phi)
        .ok_or_else(|| Error::ArithmeticError("N not invertible mod phi".into()))?;
    let rho = nizk_rho(n, session_id);
    let sigma = ModInt(n).exp(&rho, &n_inv);

    let n_len = (n.bits() + 7) / 8;
    let mut chunk = vec![0u8; n_len];
    let sigma_bytes = bytes_be(&sigma);
    chunk[n_len - sigma_bytes.len()..].copy_from_slice(&sigma_bytes);

    let mut out = Vec::with_capacity(n_len * NIZK_ITERATIONS);
    for _ in 0..NIZK_ITERATIONS {
        out.extend_from_slice(&chunk);
    }
    Ok(out)
}

/// Verify an N-th root NIZK: every sigma chunk must satisfy
/// sigma^N = rho mod N, and N must have no prime factor below 6370.
pub fn nizk_verify_with_session(n: &BigInt, proof: &[u8], session_id: &[u8]) -> bool {
    if !n.gcd(&SMALL_PRIMES).is_one() {
        return false;
    }
    let n_len = (n.bits() + 7) / 8;
    if proof.len() != n_len * NIZK_ITERATIONS {
        return false;
    }
    let rho = nizk_rho(n, session_id);
    let modint = ModInt(n);
    for chunk in proof.chunks_exact(n_len) {
        let sigma = bigint_from_bytes(chunk);
        if modint.exp(&sigma, n) != rho {
            return false;
        }
    }
    true
}
