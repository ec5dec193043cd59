//! File system helpers for PEM inputs

use std::fs;
use std::io;
use std::path::Path;

use super::error::LoadError;

/// Read a PEM input file in full
///
/// Directories are rejected with an `InvalidInput` error.
pub fn read_pem_file(path: &Path) -> Result<Vec<u8>, LoadError> {
    if path.is_dir() {
        return Err(LoadError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is a directory", path.display()),
        )));
    }

    Ok(fs::read(path)?)
}
