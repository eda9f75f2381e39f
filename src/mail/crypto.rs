//! Raw verification results as reported by a crypto backend.
//!
//! Status words are bit sets; the interpretation into user-facing
//! states lives in `render::crypto_status`.

use serde::{Deserialize, Serialize};

use super::types::Chunk;

pub mod status {
    pub const VALID: u32 = 0x0001;
    pub const GREEN: u32 = 0x0002;
    pub const RED: u32 = 0x0004;
    pub const KEY_REVOKED: u32 = 0x0010;
    pub const KEY_EXPIRED: u32 = 0x0020;
    pub const SIG_EXPIRED: u32 = 0x0040;
    pub const KEY_MISSING: u32 = 0x0080;
    pub const CRL_MISSING: u32 = 0x0100;
    pub const CRL_TOO_OLD: u32 = 0x0200;
    pub const BAD_POLICY: u32 = 0x0400;
    pub const SYS_ERROR: u32 = 0x0800;
    pub const TOFU_CONFLICT: u32 = 0x1000;
    pub const UNSUPPORTED_ALGO: u32 = 0x2000;

    pub const ERROR_MASK: u32 = KEY_REVOKED
        | KEY_EXPIRED
        | SIG_EXPIRED
        | KEY_MISSING
        | CRL_MISSING
        | CRL_TOO_OLD
        | BAD_POLICY
        | SYS_ERROR
        | TOFU_CONFLICT
        | UNSUPPORTED_ALGO;
}

pub mod trust {
    pub const UNKNOWN: u8 = 0;
    pub const UNDEFINED: u8 = 1;
    pub const NEVER: u8 = 2;
    pub const MARGINAL: u8 = 3;
    pub const FULL: u8 = 4;
    pub const ULTIMATE: u8 = 5;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCertificate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub key_id: Option<String>,
    pub fingerprint: Option<String>,
    pub trust: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSignature {
    pub status: u32,
    pub certificate: Option<RawCertificate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    /// Overall verification outcome.
    pub verified: bool,
    pub decrypted: bool,
    pub signatures: Vec<RawSignature>,
    pub recipients: Vec<RawCertificate>,
}

/// Backend that verifies signed chunks and decrypts encrypted ones.
pub trait Verifier: Send + Sync {
    fn verify(&self, chunk: &Chunk) -> Option<Verification>;
}

/// Marks signed and encrypted chunks as unverified.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unverified;

impl Verifier for Unverified {
    fn verify(&self, chunk: &Chunk) -> Option<Verification> {
        (chunk.signed || chunk.encrypted).then(Verification::default)
    }
}
