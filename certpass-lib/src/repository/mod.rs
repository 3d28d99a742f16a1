use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::{
    Error, Result,
    certificate::{Certificate, CertificateCollection, DisplayEntry, Identity},
    config::Cfg,
    decode::Decoder,
    reconcile,
};

mod store;

pub use store::{FileStore, Store, StoreError};
#[cfg(test)]
pub(crate) use store::MemoryStore;

/// Central access point for the persisted certificate list.
///
/// The [`Repository`] is the single owner of one stored collection. Every
/// read-modify-write goes through its write gate, which is shared between
/// clones, so concurrent imports can't drop each other's certificates.
#[derive(Clone, Debug)]
pub struct Repository {
    store: Arc<dyn Store>,
    write_gate: Arc<Mutex<()>>,
}

impl Repository {
    /// Open the file backed certificate list named by the configuration.
    pub fn new(cfg: &Cfg) -> Result<Self> {
        let path = cfg.read().data_file().map_err(StoreError::from)?;
        debug!("Using certificate list at {}", path.display());

        Ok(Self::with_store(FileStore::new(path)))
    }

    pub fn with_store(store: impl Store + 'static) -> Self {
        Self {
            store: Arc::new(store),
            write_gate: Arc::new(Mutex::new(())),
        }
    }

    #[cfg(test)]
    /// Return a [`Repository`] backed by a [`MemoryStore`].
    pub(crate) fn in_memory() -> Self {
        Self::with_store(MemoryStore::new())
    }

    pub fn collection(&self) -> Result<CertificateCollection> {
        Ok(self.store.fetch()?)
    }

    pub fn certificates(&self) -> Result<Vec<Certificate>> {
        Ok(self.collection()?.certificates)
    }

    pub fn favorite(&self) -> Result<Option<Certificate>> {
        Ok(self.collection()?.resolve_favorite().cloned())
    }

    pub fn display_entries(&self) -> Result<Vec<DisplayEntry>> {
        Ok(reconcile::display_entries(&self.collection()?))
    }

    /// Decode `raw_payload` and add it to the stored list.
    ///
    /// Stops at the first failing step; nothing is stored when decoding fails or
    /// the payload was imported before. Returns the certificate as read back
    /// from the store.
    pub fn import<D>(&self, decoder: &D, raw_payload: &str) -> Result<Certificate>
    where
        D: Decoder + ?Sized,
    {
        let certificate = decoder.decode(raw_payload)?;

        let _guard = self.write_gate.lock();

        let collection = self.store.fetch()?;
        let updated = reconcile::import_certificate(&collection, raw_payload, certificate.clone())
            .inspect_err(|err| {
                if matches!(err, Error::DuplicateCertificate) {
                    warn!("Rejected duplicate certificate for {}", certificate.name);
                }
            })?;
        self.store.save(&updated)?;

        debug!(
            "Imported {} certificate for {}",
            certificate.status(),
            certificate.name
        );

        let stored = self
            .store
            .fetch()?
            .certificates
            .into_iter()
            .find(|c| c.raw_payload == raw_payload)
            .unwrap_or(certificate);

        Ok(stored)
    }

    pub fn set_favorite(&self, identity: &Identity) -> Result<()> {
        let _guard = self.write_gate.lock();

        let collection = self.store.fetch()?;
        let updated = reconcile::set_favorite(&collection, identity)?;
        self.store.save(&updated)?;

        debug!("Favorite set to {identity}");

        Ok(())
    }

    /// All raw records behind the display entry at `index`.
    pub fn pair_at(&self, index: usize) -> Result<Vec<Certificate>> {
        Ok(reconcile::pair_at(index, &self.collection()?))
    }

    /// All raw records sharing `certificate`'s identity.
    pub fn pair_for(&self, certificate: &Certificate) -> Result<Vec<Certificate>> {
        Ok(reconcile::pair_for(
            certificate,
            &self.collection()?.certificates,
        ))
    }
}
