//! Shared path manipulation utilities.

use std::path::Path;

use crate::core::errors::{Result, SendError};

/// Create `path` and all missing parents with permissive (`0o777`) mode,
/// idempotently. Mirrors the Transporter's remote directory preparation.
pub fn create_dir_all_permissive(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|e| SendError::io(path, e))?;

    #[cfg(unix)]
    {
        use std::fs::Permissions;
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, Permissions::from_mode(0o777))
            .map_err(|e| SendError::io(path, e))?;
    }
    Ok(())
}
