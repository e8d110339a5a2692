use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use tokio::fs;
use tracing::warn;
use vault_crypto::IntegrityHasher;
use vault_types::Entry;

use crate::error::LedgerResult;

/// Managed attachment storage.
///
/// Importing copies the source file into the managed root under an
/// unguessable name — the hash of the original stem plus 16 random bytes,
/// keeping the original extension — and returns the stored name together
/// with the content hash that gets pinned into the entry.
pub struct AttachmentStore {
    root: PathBuf,
}

impl AttachmentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a stored attachment.
    pub fn resolve(&self, stored_name: &str) -> PathBuf {
        self.root.join(stored_name)
    }

    /// Copy a source file into managed storage and hash its content.
    /// Returns `(stored_name, content_hash)`, or two empty strings when the
    /// source is absent — an entry without its receipt is still an entry.
    pub async fn import(&self, source: &Path) -> LedgerResult<(String, String)> {
        if !fs::try_exists(source).await.unwrap_or(false) {
            warn!(source = %source.display(), "attachment source missing, storing entry without it");
            return Ok((String::new(), String::new()));
        }

        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut randomness = [0u8; 16];
        OsRng.fill_bytes(&mut randomness);
        let salted = format!("{stem}{}", BASE64.encode(randomness));

        let stored_name = match source.extension() {
            Some(ext) => format!("{}.{}", IntegrityHasher::hash_str(&salted), ext.to_string_lossy()),
            None => IntegrityHasher::hash_str(&salted),
        };

        let bytes = fs::read(source).await?;
        let content_hash = IntegrityHasher::hash_bytes(&bytes);

        fs::create_dir_all(&self.root).await?;
        fs::write(self.resolve(&stored_name), &bytes).await?;

        Ok((stored_name, content_hash))
    }

    /// Re-hash an entry's stored attachment and compare to the pinned hash.
    /// An entry without an attachment always passes; a missing or unreadable
    /// file fails.
    pub async fn verify(&self, entry: &Entry) -> bool {
        if !entry.has_attachment() {
            return true;
        }
        if entry.attachment_name().is_empty() || entry.attachment_hash().is_empty() {
            return false;
        }

        match fs::read(self.resolve(entry.attachment_name())).await {
            Ok(bytes) => IntegrityHasher::hash_bytes(&bytes) == entry.attachment_hash(),
            Err(_) => false,
        }
    }
}
