// DwarFS payloads, read with dwarfsextract

use super::tools::{read_extracted, run};
use super::{normalize_member, Archive, ArchiveError};
use bytesize::ByteSize;
use std::path::PathBuf;
use std::process::Command;

pub struct DwarfsArchive {
    tool: PathBuf,
    archive: PathBuf,
    max_member_size: ByteSize,
}

impl DwarfsArchive {
    pub fn new(tool: PathBuf, archive: PathBuf, max_member_size: ByteSize) -> Self {
        Self {
            tool,
            archive,
            max_member_size,
        }
    }

    /// dwarfsextract with the image location and quiet logging filled in
    fn command(&self) -> Command {
        let mut command = Command::new(&self.tool);
        command
            .arg("-i")
            .arg(&self.archive)
            .args(["-O", "auto", "--log-level=error"]);
        command
    }
}

impl Archive for DwarfsArchive {
    fn name(&self) -> &str {
        "dwarfsextract"
    }

    fn extract(&self, member: &str) -> Result<Vec<u8>, ArchiveError> {
        let member = normalize_member(member)
            .ok_or_else(|| ArchiveError::InvalidMember(member.to_string()))?;

        let scratch = tempfile::Builder::new()
            .prefix("appimage-dwarfs-")
            .tempdir()?;

        run(self
            .command()
            .arg("--pattern")
            .arg(&member)
            .arg("-o")
            .arg(scratch.path()))?;

        read_extracted(&scratch.path().join(&member), &member, self.max_member_size)
    }

    fn list(&self) -> Result<Vec<String>, ArchiveError> {
        let stdout = run(self.command().args(["-f", "mtree"]))?;
        Ok(parse_mtree(&String::from_utf8_lossy(&stdout)))
    }
}

/// Parse an mtree listing into archive-relative paths.
fn parse_mtree(output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|line| !line.starts_with('#'))
        .filter_map(|line| line.split_whitespace().next())
        .filter_map(|path| normalize_member(&unescape_mtree(path)))
        .collect()
}

/// Undo mtree's octal escaping (`\040` for a space and so on).
fn unescape_mtree(path: &str) -> String {
    let bytes = path.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\'
            && i + 3 < bytes.len()
            && bytes[i + 1..i + 4].iter().all(|b| (b'0'..=b'7').contains(b))
        {
            let value = (bytes[i + 1] - b'0') as u32 * 64
                + (bytes[i + 2] - b'0') as u32 * 8
                + (bytes[i + 3] - b'0') as u32;
            out.push(value as u8);
            i += 4;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mtree() {
        let output = "#mtree\n\
                      . time=1700000000.0 mode=755 type=dir\n\
                      ./.DirIcon time=1700000000.0 mode=777 type=link link=app.png\n\
                      ./app.desktop time=1700000000.0 mode=644 type=file size=210\n\
                      ./usr/share/icons/My\\040App.svg mode=644 type=file size=900\n";
        assert_eq!(
            parse_mtree(output),
            vec![".DirIcon", "app.desktop", "usr/share/icons/My App.svg"]
        );
    }

    #[test]
    fn test_unescape_mtree_leaves_plain_text() {
        assert_eq!(unescape_mtree("usr/bin/app"), "usr/bin/app");
        assert_eq!(unescape_mtree("trailing\\04"), "trailing\\04");
    }
}
