//! Zip bundle of the managed download directory, built when the budget runs
//! out, plus the one-time download token that guards it.

use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use reposter_core::{CreditSettings, MediaSettings};
use serde::Serialize;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::ArchiveError;

#[derive(Debug, Clone, Serialize)]
pub struct ArchiveBundle {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub sha256: String,
    pub file_count: usize,
    pub download_url: String,
    #[serde(skip)]
    pub token: String,
}

#[derive(Debug, Clone)]
pub struct Archiver {
    source_dir: PathBuf,
    archive_path: PathBuf,
    public_base_url: String,
}

impl Archiver {
    pub fn new(
        source_dir: impl Into<PathBuf>,
        archive_path: impl Into<PathBuf>,
        public_base_url: &str,
    ) -> Self {
        Self {
            source_dir: source_dir.into(),
            archive_path: archive_path.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_owned(),
        }
    }

    #[must_use]
    pub fn from_settings(credit: &CreditSettings, media: &MediaSettings) -> Self {
        Self::new(&media.download_dir, &credit.archive_path, &credit.public_base_url)
    }

    #[must_use]
    pub fn archive_path(&self) -> &Path {
        &self.archive_path
    }

    #[must_use]
    pub fn token_path(&self) -> PathBuf {
        let mut name = self.archive_path.as_os_str().to_owned();
        name.push(".token");
        PathBuf::from(name)
    }

    /// Zip every complete file in the download directory, replacing any
    /// previous bundle, and issue a fresh download token. Blocking; run it on
    /// a blocking thread from async code.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] on any filesystem or zip failure. A partial
    /// bundle is never left at the archive path.
    pub fn archive(&self) -> Result<ArchiveBundle, ArchiveError> {
        if let Some(parent) = self.archive_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| ArchiveError::io(parent, e))?;
            }
        }

        let mut staging = self.archive_path.as_os_str().to_owned();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);

        let file_count = match self.write_zip(&staging) {
            Ok(n) => n,
            Err(e) => {
                let _ = std::fs::remove_file(&staging);
                return Err(e);
            }
        };
        std::fs::rename(&staging, &self.archive_path)
            .map_err(|e| ArchiveError::io(&self.archive_path, e))?;

        let size_bytes = std::fs::metadata(&self.archive_path)
            .map_err(|e| ArchiveError::io(&self.archive_path, e))?
            .len();
        let sha256 = self.digest()?;

        let token = to_hex(&rand::random::<[u8; 24]>());
        let token_path = self.token_path();
        std::fs::write(&token_path, &token).map_err(|e| ArchiveError::io(&token_path, e))?;

        let bundle = ArchiveBundle {
            path: self.archive_path.clone(),
            size_bytes,
            sha256,
            file_count,
            download_url: format!("{}/download-bundle?token={token}", self.public_base_url),
            token,
        };
        tracing::info!(
            path = %bundle.path.display(),
            files = bundle.file_count,
            bytes = bundle.size_bytes,
            "archive: bundle ready"
        );
        Ok(bundle)
    }

    fn write_zip(&self, staging: &Path) -> Result<usize, ArchiveError> {
        let file = File::create(staging).map_err(|e| ArchiveError::io(staging, e))?;
        let mut zip = ZipWriter::new(BufWriter::new(file));
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(0o644);

        let mut count = 0;
        if self.source_dir.is_dir() {
            for entry in WalkDir::new(&self.source_dir).sort_by_file_name() {
                let entry = entry?;
                let path = entry.path();
                if !entry.file_type().is_file()
                    || is_partial(path)
                    || path == staging
                    || path == self.archive_path
                {
                    continue;
                }
                let Ok(relative) = path.strip_prefix(&self.source_dir) else {
                    continue;
                };
                let name = relative.to_string_lossy().replace('\\', "/");
                zip.start_file(name, options)?;
                let mut input =
                    BufReader::new(File::open(path).map_err(|e| ArchiveError::io(path, e))?);
                std::io::copy(&mut input, &mut zip).map_err(|e| ArchiveError::io(path, e))?;
                count += 1;
            }
        } else {
            tracing::warn!(dir = %self.source_dir.display(), "archive: download directory missing");
        }
        zip.finish()?;
        Ok(count)
    }

    fn digest(&self) -> Result<String, ArchiveError> {
        let mut file =
            File::open(&self.archive_path).map_err(|e| ArchiveError::io(&self.archive_path, e))?;
        let mut hasher = Sha256::new();
        std::io::copy(&mut file, &mut hasher)
            .map_err(|e| ArchiveError::io(&self.archive_path, e))?;
        Ok(to_hex(&hasher.finalize()))
    }

    /// Check `presented` against the outstanding token in constant time. On a
    /// match the token is consumed and the bundle path returned.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Io`] if the token file exists but cannot be
    /// read or removed.
    pub fn redeem_token(&self, presented: &str) -> Result<Option<PathBuf>, ArchiveError> {
        let token_path = self.token_path();
        let stored = match std::fs::read_to_string(&token_path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ArchiveError::io(&token_path, e)),
        };
        let stored = stored.trim();
        if stored.is_empty() || !bool::from(presented.as_bytes().ct_eq(stored.as_bytes())) {
            return Ok(None);
        }
        std::fs::remove_file(&token_path).map_err(|e| ArchiveError::io(&token_path, e))?;
        Ok(Some(self.archive_path.clone()))
    }
}

fn is_partial(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "part")
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
}
