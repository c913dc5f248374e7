//! Two-party ECDSA: keygen-setup exchange and the signing protocol.

pub mod ban;
pub mod keygen;
pub mod sign;
