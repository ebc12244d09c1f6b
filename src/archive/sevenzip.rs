// Generic 7z backend, used for type 1 (ISO 9660) AppImages and payloads
// the header inspection could not identify

use super::tools::{run, run_capped};
use super::{normalize_member, Archive, ArchiveError};
use bytesize::ByteSize;
use std::path::PathBuf;
use std::process::Command;

pub struct SevenZipArchive {
    tool: PathBuf,
    archive: PathBuf,
    max_member_size: ByteSize,
}

impl SevenZipArchive {
    pub fn new(tool: PathBuf, archive: PathBuf, max_member_size: ByteSize) -> Self {
        Self {
            tool,
            archive,
            max_member_size,
        }
    }
}

impl Archive for SevenZipArchive {
    fn name(&self) -> &str {
        "7z"
    }

    fn extract(&self, member: &str) -> Result<Vec<u8>, ArchiveError> {
        let member = normalize_member(member)
            .ok_or_else(|| ArchiveError::InvalidMember(member.to_string()))?;

        let data = run_capped(
            Command::new(&self.tool)
                .args(["e", "-so"])
                .arg(&self.archive)
                .arg(&member),
            &member,
            self.max_member_size,
        )?;
        // 7z succeeds silently when nothing matched
        if data.is_empty() {
            return Err(ArchiveError::NotFound(member));
        }
        Ok(data)
    }

    fn list(&self) -> Result<Vec<String>, ArchiveError> {
        let stdout = run(Command::new(&self.tool)
            .args(["l", "-slt"])
            .arg(&self.archive))?;
        Ok(parse_listing(&String::from_utf8_lossy(&stdout)))
    }
}

/// Parse the `Path = ` lines of `7z l -slt` output. The first one names the
/// archive itself and sits before the `----------` separator.
fn parse_listing(output: &str) -> Vec<String> {
    output
        .lines()
        .skip_while(|line| !line.starts_with("----------"))
        .filter_map(|line| line.trim().strip_prefix("Path = "))
        .filter_map(normalize_member)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_listing() {
        let output = "7-Zip [64] 16.02\n\
                      \n\
                      --\n\
                      Path = /tmp/app.AppImage\n\
                      Type = SquashFS\n\
                      \n\
                      ----------\n\
                      Path = .DirIcon\n\
                      Size = 12\n\
                      \n\
                      Path = usr/share/icons/hicolor/scalable/apps/app.svg\n\
                      Size = 1024\n";
        assert_eq!(
            parse_listing(output),
            vec![".DirIcon", "usr/share/icons/hicolor/scalable/apps/app.svg"]
        );
    }
}
