// In-memory archive, used to drive the resolver without extraction tools

use super::{normalize_member, Archive, ArchiveError};
use std::collections::BTreeMap;

/// An archive whose members live in a map. Symbolic links are stored as
/// members whose content is the link target, matching what the tool-based
/// backends return.
#[derive(Clone, Debug, Default)]
pub struct MemoryArchive {
    members: BTreeMap<String, Vec<u8>>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a regular member
    pub fn with_member(mut self, name: &str, data: impl Into<Vec<u8>>) -> Self {
        self.insert(name, data);
        self
    }

    /// Add a member that refers to `target`
    pub fn with_link(self, name: &str, target: &str) -> Self {
        self.with_member(name, target.as_bytes())
    }

    pub fn insert(&mut self, name: &str, data: impl Into<Vec<u8>>) {
        let key = normalize_member(name).unwrap_or_else(|| name.to_string());
        self.members.insert(key, data.into());
    }
}

impl Archive for MemoryArchive {
    fn name(&self) -> &str {
        "memory"
    }

    fn extract(&self, member: &str) -> Result<Vec<u8>, ArchiveError> {
        let key = normalize_member(member)
            .ok_or_else(|| ArchiveError::InvalidMember(member.to_string()))?;
        self.members
            .get(&key)
            .cloned()
            .ok_or(ArchiveError::NotFound(key))
    }

    fn list(&self) -> Result<Vec<String>, ArchiveError> {
        Ok(self.members.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_normalizes_names() {
        let archive = MemoryArchive::new().with_member("usr/share/app.png", b"png".to_vec());
        assert_eq!(archive.extract("/usr/share/app.png").unwrap(), b"png");
        assert_eq!(archive.extract("./usr/share/app.png").unwrap(), b"png");
    }

    #[test]
    fn test_extract_missing_and_invalid() {
        let archive = MemoryArchive::new();
        assert!(matches!(
            archive.extract(".DirIcon"),
            Err(ArchiveError::NotFound(_))
        ));
        assert!(matches!(
            archive.extract("./"),
            Err(ArchiveError::InvalidMember(_))
        ));
    }

    #[test]
    fn test_list_is_sorted() {
        let archive = MemoryArchive::new()
            .with_member("b.desktop", b"".to_vec())
            .with_link(".DirIcon", "b.png");
        assert_eq!(archive.list().unwrap(), vec![".DirIcon", "b.desktop"]);
    }
}
