//! Process-wide ECDSA signing ban list.
//!
//! Once a signature verification fails, the public key (keyed by the hex of
//! its x coordinate) goes on this list and P1 refuses to start new signing
//! sessions for it. Retrying after a failure is exactly the oracle an
//! attacker needs to extract the Paillier private key (CVE-2023-33242), so
//! removal is only ever explicit. Hosts that restart should persist the list
//! via [`export`]/[`import`].

use std::collections::HashSet;
use std::sync::RwLock;

use once_cell::sync::Lazy;

static BAN_LIST: Lazy<RwLock<HashSet<String>>> = Lazy::new(|| RwLock::new(HashSet::new()));

pub fn add(id: &str) {
    tracing::warn!(pub_key = id, "ecdsa signing banned for public key");
    BAN_LIST
        .write()
        .expect("ban list lock poisoned")
        .insert(id.to_string());
}

pub fn remove(id: &str) {
    BAN_LIST.write().expect("ban list lock poisoned").remove(id);
}

pub fn has(id: &str) -> bool {
    BAN_LIST.read().expect("ban list lock poisoned").contains(id)
}

pub fn clear() {
    BAN_LIST.write().expect("ban list lock poisoned").clear();
}

pub fn import(list: &[String]) {
    let mut guard = BAN_LIST.write().expect("ban list lock poisoned");
    for id in list {
        guard.insert(id.clone());
    }
}

pub fn export() -> Vec<String> {
    BAN_LIST
        .read()
        .expect("ban list lock poisoned")
        .iter()
        .cloned()
        .collect()
}
