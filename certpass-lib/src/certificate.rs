//! Decoded certificate records and the collection they are persisted in.

use chrono::NaiveDate;
use derive_more::{AsRef, Deref, Display, From};
use serde::{Deserialize, Serialize};
use strum::Display as StrumDisplay;

pub(crate) const CURRENT_MODEL_VERSION: u16 = 1;

/// The comparable key of the person and dose series a certificate belongs to.
///
/// Two certificates with equal identities describe the same underlying
/// credential, no matter how their raw payloads differ.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Display, From, AsRef, Deref, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Identity {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, StrumDisplay)]
pub enum Status {
    Full,
    Partial,
}

/// An immutable, decoded vaccination certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    /// `None` when the holder could not be decoded into a comparable identity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<Identity>,
    /// Human friendly holder name
    pub name: String,
    pub dose_number: u8,
    pub total_doses: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vaccination_date: Option<NaiveDate>,
    /// The payload exactly as it was scanned or imported
    pub raw_payload: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_payload: Option<String>,
}

impl Certificate {
    pub fn is_partial_vaccination(&self) -> bool {
        self.dose_number < self.total_doses
    }

    pub fn status(&self) -> Status {
        if self.is_partial_vaccination() {
            Status::Partial
        } else {
            Status::Full
        }
    }

    /// Whether both certificates carry the same, decodable identity.
    ///
    /// A certificate without an identity never matches anything, not even
    /// itself, so it always forms its own pair group.
    pub fn same_identity(&self, other: &Certificate) -> bool {
        match (&self.identity, &other.identity) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    pub fn has_identity(&self, identity: &Identity) -> bool {
        self.identity.as_ref() == Some(identity)
    }
}

/// The persisted list of certificates plus the favorite marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateCollection {
    #[serde(default = "current_model_version")]
    pub model_version: u16,
    /// Weak reference to the favorite holder. It is resolved by lookup on every
    /// read and may dangle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favorite: Option<Identity>,
    #[serde(default)]
    pub certificates: Vec<Certificate>,
}

fn current_model_version() -> u16 {
    CURRENT_MODEL_VERSION
}

impl CertificateCollection {
    pub fn new(certificates: Vec<Certificate>, favorite: Option<Identity>) -> Self {
        Self {
            model_version: CURRENT_MODEL_VERSION,
            favorite,
            certificates,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    /// Returns the first certificate the favorite marker points at, or `None`
    /// if there is no favorite or the reference dangles.
    pub fn resolve_favorite(&self) -> Option<&Certificate> {
        let favorite = self.favorite.as_ref()?;
        self.certificates.iter().find(|c| c.has_identity(favorite))
    }

    pub fn contains_payload(&self, raw_payload: &str) -> bool {
        self.certificates.iter().any(|c| c.raw_payload == raw_payload)
    }
}

impl Default for CertificateCollection {
    fn default() -> Self {
        Self::new(Vec::new(), None)
    }
}

/// One reconciled, display-ready slot of the certificate list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayEntry {
    /// Placeholder shown when the wallet holds no certificates
    Empty,
    Full(Certificate),
    Partial(Certificate),
}

impl DisplayEntry {
    pub fn from_certificate(certificate: Certificate) -> Self {
        match certificate.status() {
            Status::Full => Self::Full(certificate),
            Status::Partial => Self::Partial(certificate),
        }
    }

    pub fn certificate(&self) -> Option<&Certificate> {
        match self {
            Self::Empty => None,
            Self::Full(c) | Self::Partial(c) => Some(c),
        }
    }
}

#[cfg(test)]
pub(crate) fn mock_certificate(identity: &str, partial: bool, payload: &str) -> Certificate {
    Certificate {
        identity: Some(Identity::from(identity)),
        name: identity.to_string(),
        dose_number: if partial { 1 } else { 2 },
        total_doses: 2,
        vaccination_date: None,
        raw_payload: payload.to_string(),
        validation_payload: None,
    }
}
