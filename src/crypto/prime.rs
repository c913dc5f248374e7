//! Parallel safe-prime generation.
//!
//! A safe prime is a prime p such that (p-1)/2 is also prime. Candidates are
//! rare, so generation fans out over a pool of workers feeding one channel;
//! the first two distinct hits win and the rest of the pool is told to stop.
//! Cancellation is cooperative: a worker rechecks the stop flag before the
//! expensive primality test and again before publishing, so nothing is
//! published after the pool has been shut down.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use num_bigint_dig::prime::probably_prime;
use num_bigint_dig::{BigInt, BigUint, RandPrime};
use num_traits::One;
use rand::rngs::OsRng;

const MILLER_RABIN_ROUNDS: usize = 20;

/// Draw random probable primes of `bits - 1` bits until 2p+1 is also prime,
/// then publish 2p+1. Returns when a candidate was published or the pool was
/// cancelled.
fn safe_prime_worker(bits: usize, sink: crossbeam_channel::Sender<BigUint>, quit: Arc<AtomicBool>) {
    loop {
        if quit.load(Ordering::Relaxed) {
            return;
        }
        let p: BigUint = OsRng.gen_prime(bits - 1);
        let candidate: BigUint = (p << 1usize) + BigUint::one();
        if probably_prime(&candidate, MILLER_RABIN_ROUNDS) {
            if quit.load(Ordering::Relaxed) {
                return;
            }
            // the receiver may already be gone; either way this worker is done
            let _ = sink.send(candidate);
            return;
        }
    }
}

/// Generate two distinct safe primes of `bits` bits each using `concurrency`
/// workers.
pub fn generate_safe_primes(bits: usize, concurrency: usize) -> (BigInt, BigInt) {
    let workers = concurrency.max(2);
    loop {
        let (tx, rx) = crossbeam_channel::bounded::<BigUint>(workers);
        let quit = Arc::new(AtomicBool::new(false));
        for _ in 0..workers {
            let sink = tx.clone();
            let quit = quit.clone();
            thread::spawn(move || safe_prime_worker(bits, sink, quit));
        }
        drop(tx);
        let p = rx.recv().expect("safe prime pool closed before first result");
        let q = rx.recv().expect("safe prime pool closed before second result");
        quit.store(true, Ordering::Relaxed);
        tracing::debug!(bits, "safe prime pair generated");
        if p != q {
            return (p.into(), q.into());
        }
    }
}
