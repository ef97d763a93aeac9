use std::path::Path;

use crate::domain::errors::{DomainError, DomainResult};

/// Checks that a model artifact is present before anything tries to load it.
pub fn validate_artifact(kind: &str, path: &Path) -> DomainResult<()> {
    if path.as_os_str().is_empty() || path.to_string_lossy().trim().is_empty() {
        return Err(DomainError::InvalidInput(format!("{kind} path is empty")));
    }
    if !path.exists() {
        return Err(DomainError::NotFound(format!("{kind} not found: {}", path.display())));
    }
    if !path.is_file() {
        return Err(DomainError::InvalidInput(format!("{kind} is not a file: {}", path.display())));
    }
    Ok(())
}
