// SquashFS payloads, read with unsquashfs straight from the AppImage offset

use super::tools::{read_extracted, run};
use super::{normalize_member, Archive, ArchiveError};
use bytesize::ByteSize;
use std::path::PathBuf;
use std::process::Command;

/// Prefix unsquashfs puts in front of every listed path
const LIST_ROOT: &str = "squashfs-root";

pub struct SquashfsArchive {
    tool: PathBuf,
    archive: PathBuf,
    offset: u64,
    max_member_size: ByteSize,
}

impl SquashfsArchive {
    pub fn new(tool: PathBuf, archive: PathBuf, offset: u64, max_member_size: ByteSize) -> Self {
        Self {
            tool,
            archive,
            offset,
            max_member_size,
        }
    }
}

impl Archive for SquashfsArchive {
    fn name(&self) -> &str {
        "unsquashfs"
    }

    fn extract(&self, member: &str) -> Result<Vec<u8>, ArchiveError> {
        let member = normalize_member(member)
            .ok_or_else(|| ArchiveError::InvalidMember(member.to_string()))?;

        // unsquashfs insists on creating the destination itself
        let scratch = tempfile::Builder::new()
            .prefix("appimage-sqfs-")
            .tempdir()?;
        let root = scratch.path().join("root");

        run(Command::new(&self.tool)
            .arg("-o")
            .arg(self.offset.to_string())
            .arg("-no-progress")
            .arg("-d")
            .arg(&root)
            .arg(&self.archive)
            .arg(&member))?;

        read_extracted(&root.join(&member), &member, self.max_member_size)
    }

    fn list(&self) -> Result<Vec<String>, ArchiveError> {
        let stdout = run(Command::new(&self.tool)
            .arg("-o")
            .arg(self.offset.to_string())
            .arg("-no-progress")
            .arg("-l")
            .arg(&self.archive))?;
        Ok(parse_listing(&String::from_utf8_lossy(&stdout)))
    }
}

/// Parse `unsquashfs -l` output into archive-relative paths.
fn parse_listing(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.trim_end().strip_prefix(LIST_ROOT))
        .filter_map(|rest| rest.strip_prefix('/'))
        .filter(|path| !path.is_empty())
        .map(str::to_string)
        .collect()
}
