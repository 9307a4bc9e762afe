//! S3-backed blob store
//!
//! This module wraps the AWS S3 SDK client for reading and writing
//! configuration objects.

use async_trait::async_trait;
use aws_sdk_s3::{primitives::ByteStream, types::ObjectCannedAcl, Client as S3Client};
use aws_smithy_types::error::display::DisplayErrorContext;

use super::{BlobStore, ObjectAcl};
use crate::error::{StoreError, StoreKind};
use crate::models::WriteAck;

/// Blob store backed by Amazon S3.
#[derive(Clone)]
pub struct S3BlobStore {
    /// AWS S3 SDK client
    client: S3Client,
}

impl S3BlobStore {
    /// Create a new S3 blob store.
    ///
    /// # Arguments
    /// * `client` - AWS S3 SDK client
    pub fn new(client: S3Client) -> Self {
        Self { client }
    }

    /// Get a reference to the underlying AWS SDK client
    pub fn client(&self) -> &S3Client {
        &self.client
    }
}

impl From<ObjectAcl> for ObjectCannedAcl {
    fn from(acl: ObjectAcl) -> Self {
        match acl {
            ObjectAcl::BucketOwnerFullControl => ObjectCannedAcl::BucketOwnerFullControl,
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn read(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        tracing::debug!(bucket = %bucket, key = %key, "Fetching config object");

        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StoreError::read(StoreKind::Blob, key, DisplayErrorContext(&e)))?;

        let body = output
            .body
            .collect()
            .await
            .map_err(|e| StoreError::read(StoreKind::Blob, key, e))?;

        Ok(body.into_bytes().to_vec())
    }

    async fn write(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        acl: ObjectAcl,
    ) -> Result<WriteAck, StoreError> {
        tracing::debug!(
            bucket = %bucket,
            key = %key,
            size = body.len(),
            acl = acl.as_str(),
            "Writing config object"
        );

        let output = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .acl(acl.into())
            .send()
            .await
            .map_err(|e| StoreError::write(StoreKind::Blob, key, DisplayErrorContext(&e)))?;

        Ok(WriteAck {
            store: StoreKind::Blob,
            key: key.to_string(),
            version: output
                .version_id()
                .or_else(|| output.e_tag())
                .map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acl_maps_to_canned_acl() {
        let canned: ObjectCannedAcl = ObjectAcl::BucketOwnerFullControl.into();
        assert_eq!(canned, ObjectCannedAcl::BucketOwnerFullControl);
        assert_eq!(canned.as_str(), ObjectAcl::BucketOwnerFullControl.as_str());
    }
}
