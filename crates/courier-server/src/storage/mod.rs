//! Attachment storage backends.

use bytes::Bytes;
use courier_core::attachment::StoredFile;
use courier_core::{CourierError, Result};

pub mod local;
pub mod supabase;

pub use local::LocalAttachmentStore;
pub use supabase::SupabaseAttachmentStore;

#[async_trait::async_trait]
pub trait AttachmentStore: Send + Sync {
    fn name(&self) -> &'static str;

    /// Store `data` under `name` and return its public URL.
    async fn put(&self, name: &str, content_type: &str, data: Bytes) -> Result<String>;

    /// Remove a stored file. Missing files are `AttachmentNotFound`.
    async fn delete(&self, name: &str) -> Result<()>;

    async fn list(&self) -> Result<Vec<StoredFile>>;
}

/// Stored names are single path segments.
pub(crate) fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name.contains("..") {
        return Err(CourierError::InvalidRequest(format!(
            "invalid attachment name '{name}'"
        )));
    }
    Ok(())
}
