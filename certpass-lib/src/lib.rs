//! Core of the certpass certificate wallet.
//!
//! Holds the decoded certificate model, the list reconciler that pairs and
//! orders certificates for display, and the [`Repository`] that owns the
//! persisted certificate list.

use thiserror::Error;

pub mod certificate;
pub mod config;
pub mod decode;
pub mod fs;
pub mod reconcile;
pub mod repository;

pub use certificate::{Certificate, CertificateCollection, DisplayEntry, Identity, Status};
pub use repository::Repository;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("This certificate has already been imported")]
    DuplicateCertificate,
    #[error("No certificate belongs to identity {0}")]
    UnknownIdentity(Identity),
    #[error("Failed to decode certificate payload: {0}")]
    Decode(#[from] decode::DecodeError),
    #[error("Certificate store error: {0}")]
    Store(#[from] repository::StoreError),
}
