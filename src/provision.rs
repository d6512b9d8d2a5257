// 📦 Provisioning - put a fixture database where the app will open it
//
// Must happen before anything opens the destination. The copy is
// byte-for-byte and checked by SHA-256; any failure is final.

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedFile {
    pub destination: PathBuf,
    pub bytes: u64,
    pub sha256: String,
}

/// Copy `source` to `destination`, replacing whatever is there.
pub fn provision_fixture(source: &Path, destination: &Path) -> Result<ProvisionedFile> {
    info!(
        source = %source.display(),
        destination = %destination.display(),
        "Copying fixture database into place"
    );

    if let Some(parent) = destination.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    // A stale journal next to the destination would be replayed onto the copy
    for suffix in ["-journal", "-wal", "-shm"] {
        let sidecar = sidecar_path(destination, suffix);
        if sidecar.exists() {
            std::fs::remove_file(&sidecar)
                .with_context(|| format!("Failed to remove stale {}", sidecar.display()))?;
        }
    }

    let bytes = std::fs::copy(source, destination).with_context(|| {
        format!(
            "Failed to copy {} to {}",
            source.display(),
            destination.display()
        )
    })?;

    let expected = sha256_file(source)?;
    let actual = sha256_file(destination)?;
    if expected != actual {
        bail!(
            "Copied database differs from fixture (expected {}, got {})",
            expected,
            actual
        );
    }

    info!(bytes, sha256 = %actual, "Fixture database in place");
    Ok(ProvisionedFile {
        destination: destination.to_path_buf(),
        bytes,
        sha256: actual,
    })
}

pub fn sha256_file(path: &Path) -> Result<String> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e).with_context(|| format!("Failed to read {}", path.display())),
        };
        hasher.update(&buffer[..read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

fn sidecar_path(database: &Path, suffix: &str) -> PathBuf {
    let mut name = database.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}
