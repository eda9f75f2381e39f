use serde::{Deserialize, Serialize};

use crate::mail::crypto::{RawCertificate, RawSignature, status, trust};
use crate::mail::types::Chunk;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SigStatus {
    Good,
    Bad,
    Erroneous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trust {
    None,
    Never,
    Undefined,
    Marginal,
    Full,
    Ultimate,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SigError {
    KeyRevoked,
    ExpiredKey,
    ExpiredSig,
    KeyMissing,
    CrlMissing,
    CrlTooOld,
    BadPolicy,
    SysError,
    TofuConflict,
    UnsupportedAlgo,
    BadCertificate,
}

impl SigError {
    const FLAGS: [(u32, SigError); 10] = [
        (status::KEY_REVOKED, SigError::KeyRevoked),
        (status::KEY_EXPIRED, SigError::ExpiredKey),
        (status::SIG_EXPIRED, SigError::ExpiredSig),
        (status::KEY_MISSING, SigError::KeyMissing),
        (status::CRL_MISSING, SigError::CrlMissing),
        (status::CRL_TOO_OLD, SigError::CrlTooOld),
        (status::BAD_POLICY, SigError::BadPolicy),
        (status::SYS_ERROR, SigError::SysError),
        (status::TOFU_CONFLICT, SigError::TofuConflict),
        (status::UNSUPPORTED_ALGO, SigError::UnsupportedAlgo),
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SigError::KeyRevoked => "key-revoked",
            SigError::ExpiredKey => "expired-key",
            SigError::ExpiredSig => "expired-sig",
            SigError::KeyMissing => "key-missing",
            SigError::CrlMissing => "crl-missing",
            SigError::CrlTooOld => "crl-too-old",
            SigError::BadPolicy => "bad-policy",
            SigError::SysError => "sys-error",
            SigError::TofuConflict => "tofu-conflict",
            SigError::UnsupportedAlgo => "unsupported-algo",
            SigError::BadCertificate => "bad-certificate",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureEntry {
    pub status: SigStatus,
    pub errors: Vec<SigError>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub key_id: Option<String>,
    pub trust: Trust,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureStatus {
    pub verified: bool,
    pub signatures: Vec<SignatureEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub name: Option<String>,
    pub email: Option<String>,
    pub key_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionStatus {
    pub decrypted: bool,
    pub recipients: Vec<Recipient>,
}

/// Summarize the signature state of a signed chunk.
///
/// A chunk with no verification result reports `verified: false` and no entries.
pub fn signature(chunk: &Chunk) -> SignatureStatus {
    let Some(crypto) = &chunk.crypto else {
        return SignatureStatus {
            verified: false,
            signatures: Vec::new(),
        };
    };

    SignatureStatus {
        verified: crypto.verified,
        signatures: crypto.signatures.iter().map(signature_entry).collect(),
    }
}

/// Summarize the encryption state of an encrypted chunk.
///
/// Recipients are only listed when decryption succeeded.
pub fn encryption(chunk: &Chunk) -> EncryptionStatus {
    let decrypted = chunk.crypto.as_ref().is_some_and(|c| c.decrypted);
    let recipients = match &chunk.crypto {
        Some(crypto) if decrypted => crypto.recipients.iter().map(recipient).collect(),
        _ => Vec::new(),
    };
    EncryptionStatus {
        decrypted,
        recipients,
    }
}

fn signature_entry(sig: &RawSignature) -> SignatureEntry {
    let mut errors: Vec<SigError> = SigError::FLAGS
        .iter()
        .filter(|(bit, _)| sig.status & bit != 0)
        .map(|(_, e)| *e)
        .collect();

    let red = sig.status & status::RED != 0;
    let good = sig.status & (status::VALID | status::GREEN) != 0;
    let failed = sig.status & status::ERROR_MASK != 0;

    let mut status = if red {
        SigStatus::Bad
    } else if failed || !good {
        SigStatus::Erroneous
    } else {
        SigStatus::Good
    };

    let Some(cert) = &sig.certificate else {
        errors.push(SigError::BadCertificate);
        if status == SigStatus::Good {
            status = SigStatus::Erroneous;
        }
        return SignatureEntry {
            status,
            errors,
            name: None,
            email: None,
            key_id: None,
            trust: Trust::None,
        };
    };

    SignatureEntry {
        status,
        errors,
        name: cert.name.clone(),
        email: cert.email.clone(),
        key_id: cert.key_id.clone(),
        trust: map_trust(cert.trust),
    }
}

fn map_trust(code: u8) -> Trust {
    match code {
        trust::UNKNOWN => Trust::Unknown,
        trust::UNDEFINED => Trust::Undefined,
        trust::NEVER => Trust::Never,
        trust::MARGINAL => Trust::Marginal,
        trust::FULL => Trust::Full,
        trust::ULTIMATE => Trust::Ultimate,
        _ => Trust::Unknown,
    }
}

fn recipient(cert: &RawCertificate) -> Recipient {
    Recipient {
        name: cert.name.clone(),
        email: cert.email.clone(),
        key_id: cert.key_id.clone(),
    }
}
