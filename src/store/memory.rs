//! In-memory store implementations
//!
//! Both stores keep their data in process memory and record every call,
//! which makes them suitable for tests and offline runs.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use super::{BlobStore, ObjectAcl, SecretStore};
use crate::error::{StoreError, StoreKind};
use crate::models::{EntryValue, WriteAck};

/// A call observed by an in-memory store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    GetObject {
        bucket: String,
        key: String,
    },
    PutObject {
        bucket: String,
        key: String,
        body: Vec<u8>,
        acl: ObjectAcl,
    },
    GetSecretValue {
        secret_id: String,
    },
    UpdateSecret {
        name: String,
        secret_string: String,
    },
}

#[derive(Debug, Default)]
struct Recorder {
    calls: Mutex<Vec<StoreCall>>,
    failing: Mutex<HashSet<String>>,
}

impl Recorder {
    fn record(&self, call: StoreCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    fn calls(&self) -> Vec<StoreCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn fail_on(&self, key: &str) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string());
    }

    fn is_failing(&self, key: &str) -> bool {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }
}

/// Blob store keeping objects in a map keyed by `(bucket, key)`
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    recorder: Recorder,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(self, bucket: &str, key: &str, body: impl Into<Vec<u8>>) -> Self {
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((bucket.to_string(), key.to_string()), body.into());
        self
    }

    /// Make every read or write of `key` fail
    pub fn fail_on(&self, key: &str) {
        self.recorder.fail_on(key);
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// All calls made so far, in the order they reached the store
    pub fn calls(&self) -> Vec<StoreCall> {
        self.recorder.calls()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn read(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        self.recorder.record(StoreCall::GetObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });

        if self.recorder.is_failing(key) {
            return Err(StoreError::read(StoreKind::Blob, key, "injected failure"));
        }

        self.object(bucket, key)
            .ok_or_else(|| StoreError::read(StoreKind::Blob, key, "NoSuchKey"))
    }

    async fn write(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        acl: ObjectAcl,
    ) -> Result<WriteAck, StoreError> {
        self.recorder.record(StoreCall::PutObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
            body: body.clone(),
            acl,
        });

        if self.recorder.is_failing(key) {
            return Err(StoreError::write(StoreKind::Blob, key, "injected failure"));
        }

        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((bucket.to_string(), key.to_string()), body);

        Ok(WriteAck {
            store: StoreKind::Blob,
            key: key.to_string(),
            version: None,
        })
    }
}

/// Secret store keeping secrets in a map keyed by id
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    secrets: Mutex<HashMap<String, EntryValue>>,
    recorder: Recorder,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(self, id: &str, value: impl Into<EntryValue>) -> Self {
        self.secrets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string(), value.into());
        self
    }

    /// Make every read or write of `id` fail
    pub fn fail_on(&self, id: &str) {
        self.recorder.fail_on(id);
    }

    pub fn secret(&self, id: &str) -> Option<EntryValue> {
        self.secrets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.recorder.calls()
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn read(&self, id: &str) -> Result<Option<EntryValue>, StoreError> {
        self.recorder.record(StoreCall::GetSecretValue {
            secret_id: id.to_string(),
        });

        if self.recorder.is_failing(id) {
            return Err(StoreError::read(StoreKind::Secret, id, "injected failure"));
        }

        self.secret(id)
            .map(Some)
            .ok_or_else(|| StoreError::read(StoreKind::Secret, id, "ResourceNotFoundException"))
    }

    async fn write(&self, name: &str, value: &str) -> Result<WriteAck, StoreError> {
        self.recorder.record(StoreCall::UpdateSecret {
            name: name.to_string(),
            secret_string: value.to_string(),
        });

        if self.recorder.is_failing(name) {
            return Err(StoreError::write(StoreKind::Secret, name, "injected failure"));
        }

        self.secrets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), EntryValue::Text(value.to_string()));

        Ok(WriteAck {
            store: StoreKind::Secret,
            key: name.to_string(),
            version: None,
        })
    }
}
