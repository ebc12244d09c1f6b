// Writing the finished thumbnail
//
// The PNG is written to a temporary file next to the destination and renamed
// into place, so the destination either holds a complete thumbnail or is
// left untouched.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Write `data` to `path`, replacing any existing file atomically.
pub fn write_atomically(path: &Path, data: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    if path.file_name().is_none() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "output path has no file name",
        ));
    }

    let mut file = NamedTempFile::new_in(parent)?;
    file.write_all(data)?;
    file.flush()?;
    set_readable(file.as_file())?;

    file.persist(path).map_err(|e| e.error)?;
    log::debug!("wrote {} bytes to {}", data.len(), path.display());
    Ok(())
}

/// Temp files are created owner-only; thumbnails get the usual file mode.
#[cfg(unix)]
fn set_readable(file: &fs::File) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn set_readable(_file: &fs::File) -> io::Result<()> {
    Ok(())
}
