//! Persisted device credentials.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::{Mutex, raw::CriticalSectionRawMutex};
use heapless::String;
use log::{info, warn};

use crate::text::{bounded, push_hex};

pub const DEVICE_ID_BYTES: usize = 40;
pub const REMOTE_DEVICE_ID_BYTES: usize = 64;
/// Random bytes behind a freshly generated device identifier.
pub const DEVICE_ID_ENTROPY_BYTES: usize = 16;

pub type DeviceId = String<DEVICE_ID_BYTES>;
pub type RemoteDeviceId = String<REMOTE_DEVICE_ID_BYTES>;

/// Record that survives power cycles.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct StoredCredentials {
    pub device_id: DeviceId,
    pub logged_in: bool,
    pub last_remote_device: Option<RemoteDeviceId>,
}

impl StoredCredentials {
    /// A fresh record whose identifier is the hex form of `entropy`.
    pub fn generated(entropy: &[u8; DEVICE_ID_ENTROPY_BYTES]) -> Self {
        let mut device_id = DeviceId::new();
        let _ = push_hex(&mut device_id, entropy);
        Self {
            device_id,
            logged_in: false,
            last_remote_device: None,
        }
    }
}

/// Abstract persistence backend.
pub trait CredentialStore {
    type Error: core::fmt::Debug;

    fn load(&mut self) -> Result<Option<StoredCredentials>, Self::Error>;
    fn save(&mut self, credentials: &StoredCredentials) -> Result<(), Self::Error>;
    /// Drops every persisted value, including provisioning state.
    fn erase(&mut self) -> Result<(), Self::Error>;
}

/// Persistence failed; the in-memory state is unchanged.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct StoreError;

/// Serializes all store access so no two persistence operations overlap.
pub struct SharedStore<S> {
    inner: Mutex<CriticalSectionRawMutex, RefCell<S>>,
}

impl<S: CredentialStore> SharedStore<S> {
    pub fn new(store: S) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(store)),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        self.inner.lock(|cell| f(&mut cell.borrow_mut()))
    }

    /// Loads the record, creating and persisting a device identifier on
    /// first boot.
    pub fn load_or_create(
        &self,
        entropy: &[u8; DEVICE_ID_ENTROPY_BYTES],
    ) -> Result<StoredCredentials, StoreError> {
        self.with(|store| {
            match store.load() {
                Ok(Some(existing)) if !existing.device_id.is_empty() => return Ok(existing),
                Ok(_) => {}
                Err(err) => warn!("credentials: load failed err={:?}; regenerating", err),
            }

            let fresh = StoredCredentials::generated(entropy);
            store.save(&fresh).map_err(|err| {
                warn!("credentials: save failed err={:?}", err);
                StoreError
            })?;
            info!("credentials: generated device_id={}", fresh.device_id);
            Ok(fresh)
        })
    }

    pub fn set_logged_in(&self, logged_in: bool) -> Result<(), StoreError> {
        self.update(|creds| creds.logged_in = logged_in)
    }

    /// Persists the last active remote device if it differs from the stored one.
    pub fn remember_remote_device(&self, remote_id: &str) -> Result<(), StoreError> {
        self.update(|creds| {
            if creds.last_remote_device.as_ref().map(|id| id.as_str()) != Some(remote_id) {
                creds.last_remote_device = Some(bounded(remote_id));
            }
        })
    }

    pub fn erase(&self) -> Result<(), StoreError> {
        self.with(|store| {
            store.erase().map_err(|err| {
                warn!("credentials: erase failed err={:?}", err);
                StoreError
            })
        })
    }

    fn update(&self, f: impl FnOnce(&mut StoredCredentials)) -> Result<(), StoreError> {
        self.with(|store| {
            let mut creds = store
                .load()
                .map_err(|err| {
                    warn!("credentials: load failed err={:?}", err);
                    StoreError
                })?
                .unwrap_or_default();
            let before = creds.clone();
            f(&mut creds);
            if creds == before {
                return Ok(());
            }
            store.save(&creds).map_err(|err| {
                warn!("credentials: save failed err={:?}", err);
                StoreError
            })
        })
    }
}

/// Volatile store used when flash is unavailable and in tests.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    record: Option<StoredCredentials>,
    saves: u32,
}

impl MemoryCredentialStore {
    pub const fn new() -> Self {
        Self {
            record: None,
            saves: 0,
        }
    }

    pub fn with_record(record: StoredCredentials) -> Self {
        Self {
            record: Some(record),
            saves: 0,
        }
    }

    pub fn record(&self) -> Option<&StoredCredentials> {
        self.record.as_ref()
    }

    pub fn save_count(&self) -> u32 {
        self.saves
    }
}

impl CredentialStore for MemoryCredentialStore {
    type Error = core::convert::Infallible;

    fn load(&mut self) -> Result<Option<StoredCredentials>, Self::Error> {
        Ok(self.record.clone())
    }

    fn save(&mut self, credentials: &StoredCredentials) -> Result<(), Self::Error> {
        self.record = Some(credentials.clone());
        self.saves = self.saves.saturating_add(1);
        Ok(())
    }

    fn erase(&mut self) -> Result<(), Self::Error> {
        self.record = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_boot_generates_and_persists_hex_identifier() {
        let store = SharedStore::new(MemoryCredentialStore::new());
        let creds = store.load_or_create(&[0xAB; DEVICE_ID_ENTROPY_BYTES]).unwrap();

        assert_eq!(creds.device_id.len(), 32);
        assert!(creds.device_id.starts_with("abab"));
        assert!(!creds.logged_in);
        store.with(|s| assert_eq!(s.record(), Some(&creds)));
    }

    #[test]
    fn existing_identifier_is_never_replaced() {
        let mut existing = StoredCredentials::generated(&[1; DEVICE_ID_ENTROPY_BYTES]);
        existing.logged_in = true;
        let store = SharedStore::new(MemoryCredentialStore::with_record(existing.clone()));

        let loaded = store.load_or_create(&[2; DEVICE_ID_ENTROPY_BYTES]).unwrap();
        assert_eq!(loaded, existing);
        store.with(|s| assert_eq!(s.save_count(), 0));
    }

    #[test]
    fn remote_device_is_written_only_on_change() {
        let store = SharedStore::new(MemoryCredentialStore::with_record(
            StoredCredentials::generated(&[3; DEVICE_ID_ENTROPY_BYTES]),
        ));

        store.remember_remote_device("speaker-1").unwrap();
        store.remember_remote_device("speaker-1").unwrap();
        store.remember_remote_device("speaker-2").unwrap();

        store.with(|s| {
            assert_eq!(s.save_count(), 2);
            let remote = s.record().and_then(|r| r.last_remote_device.clone());
            assert_eq!(remote.as_deref(), Some("speaker-2"));
        });
    }

    #[test]
    fn logout_keeps_identity() {
        let mut existing = StoredCredentials::generated(&[4; DEVICE_ID_ENTROPY_BYTES]);
        existing.logged_in = true;
        let store = SharedStore::new(MemoryCredentialStore::with_record(existing.clone()));

        store.set_logged_in(false).unwrap();

        store.with(|s| {
            let record = s.record().unwrap();
            assert!(!record.logged_in);
            assert_eq!(record.device_id, existing.device_id);
        });
    }
}
