// Archive access for AppImage payloads
//
// Each backend extracts single members by shelling out to the tool that
// understands the payload filesystem. The resolver only sees the `Archive`
// trait, so tests can substitute an in-memory archive.

mod dwarfs;
mod memory;
mod sevenzip;
mod squashfs;
mod tools;

pub use dwarfs::DwarfsArchive;
pub use memory::MemoryArchive;
pub use sevenzip::SevenZipArchive;
pub use squashfs::SquashfsArchive;
pub use tools::find_tool;

use crate::appimage::{self, AppImageInfo, PayloadFormat};
use crate::config::Config;
use bytesize::ByteSize;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use thiserror::Error;

/// Errors raised while reading members out of an archive
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("member {0} not found")]
    NotFound(String),

    #[error("member {0} is empty")]
    Empty(String),

    #[error("invalid member name {0:?}")]
    InvalidMember(String),

    #[error("{} is not an ELF executable", .0.display())]
    NotElf(PathBuf),

    #[error("`{0}` is required but was not found")]
    ToolMissing(&'static str),

    #[error("`{tool}` exited with {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("member {member} is {size}, over the {limit} limit")]
    TooLarge {
        member: String,
        size: ByteSize,
        limit: ByteSize,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ArchiveError {
    /// Whether the member is absent from an otherwise readable archive.
    ///
    /// The extraction tools exit successfully when a path matches nothing,
    /// so a failing tool means a broken archive or tool, never a missing
    /// member.
    pub fn is_missing_member(&self) -> bool {
        matches!(self, ArchiveError::NotFound(_))
    }
}

/// Read access to the members of an archive
pub trait Archive {
    /// Name of this backend (for logging)
    fn name(&self) -> &str;

    /// Extract the raw bytes of `member`.
    ///
    /// A member that is a symbolic link yields the link target as its
    /// content, which the resolver then follows.
    fn extract(&self, member: &str) -> Result<Vec<u8>, ArchiveError>;

    /// List the paths of all members, relative to the archive root.
    fn list(&self) -> Result<Vec<String>, ArchiveError>;
}

/// Open the AppImage at `path` with the backend matching its payload.
pub fn open(path: &Path, config: &Config) -> Result<Box<dyn Archive>, ArchiveError> {
    let info = appimage::inspect(path)?;
    open_with_info(path, info, config)
}

fn open_with_info(
    path: &Path,
    info: AppImageInfo,
    config: &Config,
) -> Result<Box<dyn Archive>, ArchiveError> {
    let limit = config.limits.max_member_size;
    let seven_zip = || {
        find_tool("7z", config.tools.seven_zip.as_deref())
            .map(|tool| SevenZipArchive::new(tool, path.to_path_buf(), limit))
    };

    match (info.kind, info.format) {
        (Some(1), _) | (_, PayloadFormat::Unknown) => {
            let archive = seven_zip().ok_or(ArchiveError::ToolMissing("7z"))?;
            Ok(Box::new(archive))
        }
        (_, PayloadFormat::SquashFs) => {
            if let Some(tool) = find_tool("unsquashfs", config.tools.unsquashfs.as_deref()) {
                return Ok(Box::new(SquashfsArchive::new(
                    tool,
                    path.to_path_buf(),
                    info.payload_offset,
                    limit,
                )));
            }
            log::debug!("unsquashfs not available, trying 7z");
            let archive = seven_zip().ok_or(ArchiveError::ToolMissing("unsquashfs"))?;
            Ok(Box::new(archive))
        }
        (_, PayloadFormat::DwarFs) => {
            let tool = find_tool("dwarfsextract", config.tools.dwarfsextract.as_deref())
                .ok_or(ArchiveError::ToolMissing("dwarfsextract"))?;
            Ok(Box::new(DwarfsArchive::new(tool, path.to_path_buf(), limit)))
        }
    }
}

/// Normalize a member path: drop leading `/`, `.` components and empty
/// components, and let `..` pop its parent. Returns `None` when nothing is
/// left.
pub fn normalize_member(name: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for part in name.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            part => parts.push(part),
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Resolve `target`, found inside member `from`, the way a symbolic link
/// would be: absolute targets start at the archive root, relative ones at
/// the directory containing `from`.
pub fn resolve_reference(from: &str, target: &str) -> Option<String> {
    if target.starts_with('/') {
        return normalize_member(target);
    }
    match from.rsplit_once('/') {
        Some((dir, _)) => normalize_member(&format!("{}/{}", dir, target)),
        None => normalize_member(target),
    }
}

/// Fail with `TooLarge` if a member of `len` bytes exceeds `limit`.
pub(crate) fn check_size(member: &str, len: u64, limit: ByteSize) -> Result<(), ArchiveError> {
    if len > limit.as_u64() {
        return Err(ArchiveError::TooLarge {
            member: member.to_string(),
            size: ByteSize(len),
            limit,
        });
    }
    Ok(())
}
