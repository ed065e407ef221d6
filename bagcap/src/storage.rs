use log::debug;
use md5::{Digest, Md5};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Write-once, content-addressed blob storage.
///
/// Payloads are keyed by the MD5 hex digest of their canonical content and
/// written under a two-level shard directory derived from the digest prefix:
/// `{root}/{h[0..2]}/{h[2..4]}/{hash}.{ext}`. Identical content collapses to
/// a single file no matter how many records reference it.
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        BlobStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store a payload keyed by its own bytes. Returns the hex digest.
    pub fn put(&self, payload: &[u8], ext: &str) -> io::Result<String> {
        self.put_keyed(payload, payload, ext)
    }

    /// Store `data` under the digest of `key`.
    ///
    /// For blobs whose stored representation differs from the hashed content,
    /// e.g. a JPEG file keyed by the digest of its decoded pixel buffer.
    pub fn put_keyed(&self, key: &[u8], data: &[u8], ext: &str) -> io::Result<String> {
        let hash = hex_digest(key);
        let shard = self.root.join(&hash[0..2]).join(&hash[2..4]);
        // Concurrent shard creation is fine, create_dir_all is idempotent.
        fs::create_dir_all(&shard)?;
        let path = shard.join(format!("{}.{}", hash, ext));
        if path.exists() {
            debug!("Blob already stored: {}", path.display());
            return Ok(hash);
        }
        fs::write(&path, data)?;
        Ok(hash)
    }

    /// Store a numeric matrix as a comma-delimited text dump.
    ///
    /// The digest is computed over the canonical form of the matrix (row-major
    /// order, little-endian f64), so the hash is a pure function of the
    /// logical values and independent of how the decoder laid out memory.
    pub fn put_matrix(&self, rows: &[Vec<f64>]) -> io::Result<String> {
        self.put_keyed(&canonical_bytes(rows), matrix_text(rows).as_bytes(), "txt")
    }
}

/// MD5 hex digest of a byte slice.
pub fn hex_digest(data: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

fn canonical_bytes(rows: &[Vec<f64>]) -> Vec<u8> {
    let mut out = Vec::with_capacity(rows.iter().map(|r| r.len() * 8 + 8).sum());
    for row in rows {
        // Row length is part of the logical content: a 2x2 matrix and a 1x4
        // matrix with the same values must not collide.
        out.extend_from_slice(&(row.len() as u64).to_le_bytes());
        for v in row {
            out.extend_from_slice(&v.to_le_bytes());
        }
    }
    out
}

fn matrix_text(rows: &[Vec<f64>]) -> String {
    let mut out = String::new();
    for row in rows {
        let line = row
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(&line);
        out.push('\n');
    }
    out
}
