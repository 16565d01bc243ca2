//! Binary replacement
//!
//! The new binary is written next to the target and renamed over it only once
//! fully downloaded, so a failed update leaves the old binary in place.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{info, instrument, warn};
use ureq::Agent;

use crate::error::Result;

/// Download `url` and swap it in for the running executable
pub(crate) fn replace_current_exe(agent: &Agent, url: &str) -> Result<()> {
    let exe = std::env::current_exe()?;
    let response = agent.get(url).call()?;
    let (_parts, body) = response.into_parts();
    replace_file(&mut body.into_reader(), &exe)
}

fn staging_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".download");
    target.with_file_name(name)
}

/// Stream `source` into a sibling of `target`, then rename it into place
#[instrument(skip(source, target), fields(target = %target.display()))]
pub(crate) fn replace_file(source: &mut impl io::Read, target: &Path) -> Result<()> {
    let staging = staging_path(target);

    let written = write_staging(source, &staging).and_then(|bytes| {
        fs::rename(&staging, target)?;
        Ok(bytes)
    });

    match written {
        Ok(bytes) => {
            info!(bytes, "Binary replaced");
            Ok(())
        }
        Err(e) => {
            if let Err(cleanup) = fs::remove_file(&staging) {
                if cleanup.kind() != io::ErrorKind::NotFound {
                    warn!(
                        error = %cleanup,
                        path = %staging.display(),
                        "Failed to remove partial download"
                    );
                }
            }
            Err(e)
        }
    }
}

fn write_staging(source: &mut impl io::Read, staging: &Path) -> Result<u64> {
    let mut file = File::create(staging)?;
    let bytes = io::copy(source, &mut file)?;
    file.flush()?;
    file.sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(staging, fs::Permissions::from_mode(0o755))?;
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Reader that fails after yielding some bytes
    struct BrokenReader {
        sent: bool,
    }

    impl io::Read for BrokenReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.sent {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
            }
            self.sent = true;
            buf[..4].copy_from_slice(b"half");
            Ok(4)
        }
    }

    #[test]
    fn test_replace_file() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("watchroom");
        fs::write(&target, b"old").unwrap();

        replace_file(&mut &b"new binary"[..], &target).unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"new binary");
        assert!(!staging_path(&target).exists());
    }

    #[test]
    fn test_failed_download_keeps_old_binary() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("watchroom");
        fs::write(&target, b"old").unwrap();

        let err = replace_file(&mut BrokenReader { sent: false }, &target);
        assert!(err.is_err());

        assert_eq!(fs::read(&target).unwrap(), b"old");
        assert!(!staging_path(&target).exists());
    }

    #[test]
    fn test_staging_path_is_sibling() {
        let target = Path::new("/opt/watchroom/bin/watchroom");
        assert_eq!(
            staging_path(target),
            PathBuf::from("/opt/watchroom/bin/watchroom.download")
        );
    }
}
