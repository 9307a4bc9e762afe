//! Store adapters
//!
//! Minimal async interfaces over the blob store holding configuration
//! payloads and the secret store, with AWS and in-memory implementations.

pub mod memory;
pub mod s3;
pub mod secrets_manager;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{EntryValue, WriteAck};

pub use memory::{MemoryBlobStore, MemorySecretStore, StoreCall};
pub use s3::S3BlobStore;
pub use secrets_manager::SecretsManagerStore;

/// Access control applied to written objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObjectAcl {
    /// Grant the bucket owner full control over the object
    #[default]
    BucketOwnerFullControl,
}

impl ObjectAcl {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectAcl::BucketOwnerFullControl => "bucket-owner-full-control",
        }
    }
}

/// Object storage addressed by bucket and key
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch the full body of an object
    async fn read(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Create or replace an object
    async fn write(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        acl: ObjectAcl,
    ) -> Result<WriteAck, StoreError>;
}

/// Secret storage addressed by secret id or name
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch the current value of a secret.
    ///
    /// Returns `None` when the secret exists but carries no payload.
    async fn read(&self, id: &str) -> Result<Option<EntryValue>, StoreError>;

    /// Replace the value of an existing secret
    async fn write(&self, name: &str, value: &str) -> Result<WriteAck, StoreError>;
}
