// External extraction tool discovery and invocation

use super::{check_size, ArchiveError};
use bytesize::ByteSize;
use std::env;
use std::fs;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Locate an extraction tool.
///
/// Checks the configured path first, then the executable's own directory and
/// its parent (bundled tools), then `$PATH`.
pub fn find_tool(name: &str, configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = configured {
        if is_executable(path) {
            return Some(path.to_path_buf());
        }
        log::warn!(
            "configured {} at {} is not executable, searching elsewhere",
            name,
            path.display()
        );
    }

    if let Some(dir) = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        for candidate in [dir.join(name), dir.join("..").join(name)] {
            if is_executable(&candidate) {
                log::debug!("found bundled {} at {}", name, candidate.display());
                return Some(candidate);
            }
        }
    }

    let found = env::var_os("PATH").and_then(|paths| {
        env::split_paths(&paths)
            .map(|dir| dir.join(name))
            .find(|candidate| is_executable(candidate))
    });
    match &found {
        Some(path) => log::debug!("found {} in PATH at {}", name, path.display()),
        None => log::debug!("{} not found", name),
    }
    found
}

fn is_executable(path: &Path) -> bool {
    match fs::metadata(path) {
        #[cfg(unix)]
        Ok(metadata) => metadata.is_file() && metadata.permissions().mode() & 0o111 != 0,
        #[cfg(not(unix))]
        Ok(metadata) => metadata.is_file(),
        Err(_) => false,
    }
}

fn log_command(command: &Command) -> String {
    let tool = command.get_program().to_string_lossy().into_owned();
    log::debug!(
        "running {} {}",
        tool,
        command
            .get_args()
            .map(|arg| arg.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    );
    tool
}

/// Run `command` to completion and return its stdout.
///
/// A non-zero exit status becomes `ToolFailed` carrying the tool's stderr.
pub fn run(command: &mut Command) -> Result<Vec<u8>, ArchiveError> {
    let tool = log_command(command);

    let output = command.stdin(Stdio::null()).output()?;
    if !output.status.success() {
        return Err(ArchiveError::ToolFailed {
            tool,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output.stdout)
}

/// Run `command` and return the member it writes to stdout, reading at most
/// `limit` bytes.
///
/// Once the output passes `limit` the tool is killed and `TooLarge` is
/// returned without buffering the rest. Stderr goes to an anonymous temp
/// file so a chatty tool cannot block on a full pipe.
pub fn run_capped(
    command: &mut Command,
    member: &str,
    limit: ByteSize,
) -> Result<Vec<u8>, ArchiveError> {
    let tool = log_command(command);
    let mut stderr = tempfile::tempfile()?;
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::from(stderr.try_clone()?))
        .spawn()?;

    let mut data = Vec::new();
    let read = match child.stdout.take() {
        Some(stdout) => stdout
            .take(limit.as_u64().saturating_add(1))
            .read_to_end(&mut data),
        None => Ok(0),
    };
    if let Err(e) = read {
        reap(&mut child);
        return Err(e.into());
    }
    if let Err(e) = check_size(member, data.len() as u64, limit) {
        log::debug!("{} output passed {}, stopping {}", member, limit, tool);
        reap(&mut child);
        return Err(e);
    }

    let status = child.wait()?;
    if !status.success() {
        let mut message = Vec::new();
        stderr.seek(SeekFrom::Start(0))?;
        stderr.read_to_end(&mut message)?;
        return Err(ArchiveError::ToolFailed {
            tool,
            status,
            stderr: String::from_utf8_lossy(&message).trim().to_string(),
        });
    }
    Ok(data)
}

/// Kill a tool we stopped reading from and collect its exit status.
fn reap(child: &mut Child) {
    if let Err(e) = child.kill() {
        log::debug!("failed to kill extraction tool: {}", e);
    }
    let _ = child.wait();
}

/// Read a member a tool has extracted to `path`.
///
/// Symbolic links are not followed on the host; their target text becomes
/// the member content so the resolver can follow it inside the archive.
pub fn read_extracted(path: &Path, member: &str, limit: ByteSize) -> Result<Vec<u8>, ArchiveError> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ArchiveError::NotFound(member.to_string()))
        }
        Err(e) => return Err(e.into()),
    };

    if metadata.file_type().is_symlink() {
        let target = fs::read_link(path)?;
        log::debug!("{} is a symlink to {}", member, target.display());
        return Ok(target.to_string_lossy().into_owned().into_bytes());
    }
    if metadata.is_dir() {
        return Err(ArchiveError::NotFound(member.to_string()));
    }

    check_size(member, metadata.len(), limit)?;
    let data = fs::read(path)?;
    log::debug!("read {} ({})", member, ByteSize(data.len() as u64));
    Ok(data)
}
