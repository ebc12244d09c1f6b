// Icon resolution: follow member references from `.DirIcon` to an image

use crate::archive::{normalize_member, resolve_reference, Archive, ArchiveError};
use crate::error::ThumbnailError;
use crate::sniff::{self, Content, ImageKind};
use bytesize::ByteSize;

/// The member every AppImage is expected to carry its icon under
pub const DIR_ICON: &str = ".DirIcon";

/// An image found at the end of a reference chain
#[derive(Clone, Debug)]
pub struct ResolvedIcon {
    pub kind: ImageKind,
    pub data: Vec<u8>,
    /// Member the image bytes were read from
    pub member: String,
    /// Number of references followed to reach it
    pub hops: usize,
}

/// Resolve `start` inside `archive` to PNG or SVG bytes.
///
/// Each member is extracted once and classified in memory. A member holding
/// a reference (a symlink target, or a text file naming another member)
/// is followed relative to its own directory, at most `max_hops` times.
pub fn resolve(
    archive: &dyn Archive,
    start: &str,
    max_hops: usize,
) -> Result<ResolvedIcon, ThumbnailError> {
    let mut member = normalize_member(start).ok_or_else(|| ThumbnailError::Extraction {
        member: start.to_string(),
        source: ArchiveError::InvalidMember(start.to_string()),
    })?;
    let mut hops = 0;

    loop {
        let data = archive
            .extract(&member)
            .map_err(|source| ThumbnailError::Extraction {
                member: member.clone(),
                source,
            })?;
        log::debug!(
            "[{}] hop {}: {} ({})",
            archive.name(),
            hops,
            member,
            ByteSize(data.len() as u64)
        );

        match sniff::classify(&data) {
            Content::Image(kind) => {
                log::debug!("{} is a {} image", member, kind);
                return Ok(ResolvedIcon {
                    kind,
                    data,
                    member,
                    hops,
                });
            }
            Content::Empty if hops == 0 => {
                return Err(ThumbnailError::Extraction {
                    source: ArchiveError::Empty(member.clone()),
                    member,
                });
            }
            Content::Empty => {
                return Err(ThumbnailError::UnresolvableIcon {
                    member,
                    reason: "the referenced member is empty".to_string(),
                });
            }
            Content::Unknown => {
                return Err(ThumbnailError::UnresolvableIcon {
                    member,
                    reason: "content is neither a PNG or SVG image nor a member reference"
                        .to_string(),
                });
            }
            Content::Reference(target) => {
                if hops >= max_hops {
                    return Err(ThumbnailError::TooManyRedirects { member, max_hops });
                }
                let next = resolve_reference(&member, &target).ok_or_else(|| {
                    ThumbnailError::UnresolvableIcon {
                        member: member.clone(),
                        reason: format!("reference {:?} does not name a member", target),
                    }
                })?;
                log::debug!("{} -> {}", member, next);
                member = next;
                hops += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::MemoryArchive;
    use crate::sniff::PNG_SIGNATURE;

    fn fake_png() -> Vec<u8> {
        let mut data = PNG_SIGNATURE.to_vec();
        data.extend_from_slice(b"rest of the file");
        data
    }

    const SVG: &[u8] = br#"<svg xmlns="http://www.w3.org/2000/svg" width="8" height="8"/>"#;

    #[test]
    fn test_direct_png() {
        let archive = MemoryArchive::new().with_member(DIR_ICON, fake_png());
        let icon = resolve(&archive, DIR_ICON, 32).unwrap();
        assert_eq!(icon.kind, ImageKind::Png);
        assert_eq!(icon.member, DIR_ICON);
        assert_eq!(icon.hops, 0);
        assert_eq!(icon.data, fake_png());
    }

    #[test]
    fn test_single_hop() {
        let archive = MemoryArchive::new()
            .with_link(DIR_ICON, "icon.png")
            .with_member("icon.png", fake_png());
        let icon = resolve(&archive, DIR_ICON, 32).unwrap();
        assert_eq!(icon.member, "icon.png");
        assert_eq!(icon.hops, 1);
    }

    #[test]
    fn test_chain_with_relative_references() {
        let archive = MemoryArchive::new()
            .with_link(DIR_ICON, "app.svg")
            .with_link("app.svg", "usr/share/icons/hicolor/scalable/apps/app.svg")
            .with_link("usr/share/icons/hicolor/scalable/apps/app.svg", "../../../../pixmaps/app.svg")
            .with_member("usr/share/pixmaps/app.svg", SVG);
        let icon = resolve(&archive, DIR_ICON, 32).unwrap();
        assert_eq!(icon.kind, ImageKind::Svg);
        assert_eq!(icon.member, "usr/share/pixmaps/app.svg");
        assert_eq!(icon.hops, 3);
    }

    #[test]
    fn test_absolute_reference() {
        let archive = MemoryArchive::new()
            .with_link(DIR_ICON, "/usr/share/pixmaps/app.png\n")
            .with_member("usr/share/pixmaps/app.png", fake_png());
        let icon = resolve(&archive, DIR_ICON, 32).unwrap();
        assert_eq!(icon.member, "usr/share/pixmaps/app.png");
    }

    #[test]
    fn test_names_with_spaces_and_unicode() {
        for target in ["My App.png", "usr/share/icons/app+beta.png", "ícone.png"] {
            let archive = MemoryArchive::new()
                .with_link(DIR_ICON, target)
                .with_member(target, fake_png());
            let icon = resolve(&archive, DIR_ICON, 32).unwrap();
            assert_eq!(icon.member, target);
            assert_eq!(icon.hops, 1);
        }
    }

    #[test]
    fn test_relative_name_with_space() {
        let archive = MemoryArchive::new()
            .with_link(DIR_ICON, "usr/share/pixmaps/My App.svg")
            .with_link("usr/share/pixmaps/My App.svg", "../icons/Mój program.svg\n")
            .with_member("usr/share/icons/Mój program.svg", SVG);
        let icon = resolve(&archive, DIR_ICON, 32).unwrap();
        assert_eq!(icon.kind, ImageKind::Svg);
        assert_eq!(icon.member, "usr/share/icons/Mój program.svg");
        assert_eq!(icon.hops, 2);
    }

    #[test]
    fn test_missing_dir_icon() {
        let archive = MemoryArchive::new();
        let err = resolve(&archive, DIR_ICON, 32).unwrap_err();
        assert!(matches!(err, ThumbnailError::Extraction { .. }));
        assert!(err.is_missing_member());
    }

    #[test]
    fn test_missing_reference_target() {
        let archive = MemoryArchive::new().with_link(DIR_ICON, "gone.png");
        let err = resolve(&archive, DIR_ICON, 32).unwrap_err();
        match err {
            ThumbnailError::Extraction { member, .. } => assert_eq!(member, "gone.png"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_dir_icon() {
        let archive = MemoryArchive::new().with_member(DIR_ICON, Vec::new());
        let err = resolve(&archive, DIR_ICON, 32).unwrap_err();
        assert!(matches!(
            err,
            ThumbnailError::Extraction {
                source: ArchiveError::Empty(_),
                ..
            }
        ));
    }

    #[test]
    fn test_empty_reference_target() {
        let archive = MemoryArchive::new()
            .with_link(DIR_ICON, "icon.png")
            .with_member("icon.png", Vec::new());
        let err = resolve(&archive, DIR_ICON, 32).unwrap_err();
        match err {
            ThumbnailError::UnresolvableIcon { member, .. } => assert_eq!(member, "icon.png"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_binary_garbage() {
        let archive = MemoryArchive::new().with_member(DIR_ICON, b"GIF89a\x01\x00\xff".to_vec());
        let err = resolve(&archive, DIR_ICON, 32).unwrap_err();
        assert!(matches!(err, ThumbnailError::UnresolvableIcon { .. }));
    }

    #[test]
    fn test_reference_to_root() {
        let archive = MemoryArchive::new().with_link(DIR_ICON, "./");
        let err = resolve(&archive, DIR_ICON, 32).unwrap_err();
        assert!(matches!(err, ThumbnailError::UnresolvableIcon { .. }));
    }

    #[test]
    fn test_cycle_is_bounded() {
        let archive = MemoryArchive::new()
            .with_link(DIR_ICON, "a.png")
            .with_link("a.png", "b.png")
            .with_link("b.png", "a.png");
        let err = resolve(&archive, DIR_ICON, 32).unwrap_err();
        assert!(matches!(
            err,
            ThumbnailError::TooManyRedirects { max_hops: 32, .. }
        ));
    }

    #[test]
    fn test_hop_limit_is_inclusive() {
        let archive = MemoryArchive::new()
            .with_link(DIR_ICON, "a.png")
            .with_link("a.png", "b.png")
            .with_member("b.png", fake_png());
        assert_eq!(resolve(&archive, DIR_ICON, 2).unwrap().hops, 2);
        assert!(matches!(
            resolve(&archive, DIR_ICON, 1),
            Err(ThumbnailError::TooManyRedirects { .. })
        ));
    }
}
