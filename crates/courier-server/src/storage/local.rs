use super::{check_name, AttachmentStore};
use bytes::Bytes;
use courier_core::attachment::StoredFile;
use courier_core::{CourierError, Result};
use std::io::ErrorKind;
use std::path::PathBuf;

/// Files on local disk, served back by the router under `public_base`.
pub struct LocalAttachmentStore {
    dir: PathBuf,
    public_base: String,
}

impl LocalAttachmentStore {
    pub fn new(dir: impl Into<PathBuf>, public_base: &str) -> Self {
        Self {
            dir: dir.into(),
            public_base: public_base.trim_end_matches('/').to_string(),
        }
    }

    fn url_for(&self, name: &str) -> String {
        format!("{}/{}", self.public_base, name)
    }
}

#[async_trait::async_trait]
impl AttachmentStore for LocalAttachmentStore {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn put(&self, name: &str, _content_type: &str, data: Bytes) -> Result<String> {
        check_name(name)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(name), &data).await?;
        Ok(self.url_for(name))
    }

    async fn delete(&self, name: &str) -> Result<()> {
        check_name(name)?;
        match tokio::fs::remove_file(self.dir.join(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(CourierError::AttachmentNotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> Result<Vec<StoredFile>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            files.push(StoredFile {
                url: self.url_for(&name),
                name,
            });
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }
}
