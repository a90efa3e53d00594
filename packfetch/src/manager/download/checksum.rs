//! Content digests for downloaded mod files.
//!
//! A digest is the lowercase hexadecimal SHA-256 of a file's full byte
//! content. Digests are only used for change detection: a file whose digest
//! no longer matches the ledger is re-downloaded.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

/// Buffer size for reading files during digest calculation (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Calculate the digest of a file by streaming its contents.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn calculate_file_digest(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Calculate the digest of an in-memory buffer.
///
/// Freshly fetched bytes are hashed before they are written so the file does
/// not have to be read back.
pub fn digest_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Check whether the file at `path` matches `expected`.
///
/// Returns `false` when the file does not exist, when `expected` is absent or
/// empty, when the file cannot be read, or when the digests differ. Never
/// fails and has no side effects.
pub fn validate(path: &Path, expected: Option<&str>) -> bool {
    let expected = match expected {
        Some(digest) if !digest.is_empty() => digest,
        _ => return false,
    };

    if !path.is_file() {
        return false;
    }

    match calculate_file_digest(path) {
        Ok(actual) => actual.eq_ignore_ascii_case(expected),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Failed to read file for validation");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const HELLO_WORLD: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    #[test]
    fn test_calculate_file_digest() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("test.jar");

        let mut file = File::create(&file_path).unwrap();
        file.write_all(b"hello world").unwrap();

        assert_eq!(calculate_file_digest(&file_path).unwrap(), HELLO_WORLD);
    }

    #[test]
    fn test_calculate_empty_file() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("empty.jar");
        File::create(&file_path).unwrap();

        assert_eq!(
            calculate_file_digest(&file_path).unwrap(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_calculate_nonexistent_file() {
        assert!(calculate_file_digest(Path::new("/nonexistent/file.jar")).is_err());
    }

    #[test]
    fn test_digest_bytes_matches_file_digest() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("large.jar");

        // Larger than the read buffer
        let data = vec![0xABu8; 100_000];
        std::fs::write(&file_path, &data).unwrap();

        assert_eq!(
            digest_bytes(&data),
            calculate_file_digest(&file_path).unwrap()
        );
        assert_eq!(digest_bytes(b"hello world"), HELLO_WORLD);
    }

    #[test]
    fn test_validate_match() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("mod.jar");
        std::fs::write(&file_path, b"hello world").unwrap();

        assert!(validate(&file_path, Some(HELLO_WORLD)));
        assert!(validate(&file_path, Some(&HELLO_WORLD.to_uppercase())));
    }

    #[test]
    fn test_validate_mismatch() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("mod.jar");
        std::fs::write(&file_path, b"hello world, truncated").unwrap();

        assert!(!validate(&file_path, Some(HELLO_WORLD)));
    }

    #[test]
    fn test_validate_missing_expected() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("mod.jar");
        std::fs::write(&file_path, b"hello world").unwrap();

        assert!(!validate(&file_path, None));
        assert!(!validate(&file_path, Some("")));
    }

    #[test]
    fn test_validate_missing_file() {
        let temp = TempDir::new().unwrap();
        assert!(!validate(&temp.path().join("gone.jar"), Some(HELLO_WORLD)));
        // A directory is never a valid component file
        assert!(!validate(temp.path(), Some(HELLO_WORLD)));
    }
}
