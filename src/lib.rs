// AppImage thumbnailer
//
// Finds the icon embedded in an AppImage, following `.DirIcon` through any
// chain of member references, and renders it as a square, transparent PNG.

pub mod appimage;
pub mod archive;
pub mod compositor;
pub mod config;
pub mod desktop;
pub mod error;
pub mod output;
pub mod resolver;
pub mod sniff;

use crate::archive::Archive;
use crate::config::Config;
use crate::error::ThumbnailError;
use crate::resolver::{ResolvedIcon, DIR_ICON};
use crate::sniff::ImageKind;
use bytesize::ByteSize;
use std::path::PathBuf;

/// One thumbnail to produce
#[derive(Clone, Debug)]
pub struct ThumbnailRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Edge length of the square thumbnail, in pixels
    pub size: u32,
}

/// What was rendered
#[derive(Clone, Debug)]
pub struct ThumbnailReport {
    /// Archive member the image was read from
    pub member: String,
    pub kind: ImageKind,
    /// References followed to reach `member`
    pub hops: usize,
    pub source_dimensions: (u32, u32),
    pub bytes_written: usize,
}

/// Produce the thumbnail described by `request`.
///
/// Nothing is written to `request.output` unless every stage succeeds.
pub fn generate(
    request: &ThumbnailRequest,
    config: &Config,
) -> Result<ThumbnailReport, ThumbnailError> {
    check_size(request.size, config)?;

    let archive = archive::open(&request.input, config).map_err(|source| {
        ThumbnailError::Archive {
            path: request.input.clone(),
            source,
        }
    })?;
    log::debug!(
        "opened {} with the {} backend",
        request.input.display(),
        archive.name()
    );

    generate_from_archive(archive.as_ref(), request, config)
}

/// Produce a thumbnail from an already opened archive.
pub fn generate_from_archive(
    archive: &dyn Archive,
    request: &ThumbnailRequest,
    config: &Config,
) -> Result<ThumbnailReport, ThumbnailError> {
    check_size(request.size, config)?;

    let icon = find_icon(archive, config)?;
    let thumbnail = compositor::render_thumbnail(&icon.data, icon.kind, request.size)?;

    output::write_atomically(&request.output, &thumbnail.png).map_err(|source| {
        ThumbnailError::Output {
            path: request.output.clone(),
            source,
        }
    })?;

    let report = ThumbnailReport {
        member: icon.member,
        kind: icon.kind,
        hops: icon.hops,
        source_dimensions: thumbnail.source_dimensions,
        bytes_written: thumbnail.png.len(),
    };
    log::info!(
        "{} -> {} ({}x{} from {} {}, {})",
        request.input.display(),
        request.output.display(),
        request.size,
        request.size,
        report.kind,
        report.member,
        ByteSize(report.bytes_written as u64)
    );
    Ok(report)
}

/// Resolve `.DirIcon`, falling back to the desktop entry's icon when
/// `.DirIcon` or a member it refers to is missing.
pub fn find_icon(archive: &dyn Archive, config: &Config) -> Result<ResolvedIcon, ThumbnailError> {
    let max_hops = config.resolver.max_hops;
    match resolver::resolve(archive, DIR_ICON, max_hops) {
        Ok(icon) => Ok(icon),
        Err(err) if err.is_missing_member() && config.resolver.desktop_fallback => {
            log::debug!("{}; trying the desktop entry", err);
            match desktop::resolve_desktop_icon(archive, max_hops) {
                Some(icon) => {
                    log::info!("using desktop entry icon {}", icon.member);
                    Ok(icon)
                }
                None => Err(err),
            }
        }
        Err(err) => Err(err),
    }
}

fn check_size(size: u32, config: &Config) -> Result<(), ThumbnailError> {
    let max = config.limits.max_size;
    if size == 0 || size > max {
        return Err(ThumbnailError::Argument(format!(
            "size must be between 1 and {}, got {}",
            max, size
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::MemoryArchive;
    use crate::sniff::PNG_SIGNATURE;

    fn fake_png() -> Vec<u8> {
        let mut data = PNG_SIGNATURE.to_vec();
        data.extend_from_slice(b"pixels");
        data
    }

    fn archive_without_dir_icon() -> MemoryArchive {
        MemoryArchive::new()
            .with_member("app.desktop", "[Desktop Entry]\nIcon=app\n")
            .with_member("usr/share/icons/hicolor/64x64/apps/app.png", fake_png())
    }

    #[test]
    fn test_find_icon_prefers_dir_icon() {
        let archive = archive_without_dir_icon()
            .with_link(DIR_ICON, "usr/share/pixmaps/a.png")
            .with_member("usr/share/pixmaps/a.png", fake_png());
        let icon = find_icon(&archive, &Config::default()).unwrap();
        assert_eq!(icon.member, "usr/share/pixmaps/a.png");
    }

    #[test]
    fn test_find_icon_desktop_fallback() {
        let icon = find_icon(&archive_without_dir_icon(), &Config::default()).unwrap();
        assert_eq!(icon.member, "usr/share/icons/hicolor/64x64/apps/app.png");
    }

    #[test]
    fn test_find_icon_fallback_disabled() {
        let mut config = Config::default();
        config.resolver.desktop_fallback = false;
        let err = find_icon(&archive_without_dir_icon(), &config).unwrap_err();
        assert!(matches!(err, ThumbnailError::Extraction { .. }));
    }

    #[test]
    fn test_fallback_for_dangling_dir_icon() {
        let archive = archive_without_dir_icon().with_link(DIR_ICON, "missing.png");
        let icon = find_icon(&archive, &Config::default()).unwrap();
        assert_eq!(icon.member, "usr/share/icons/hicolor/64x64/apps/app.png");
    }

    #[test]
    fn test_no_fallback_for_unreadable_dir_icon() {
        let archive = archive_without_dir_icon().with_member(DIR_ICON, b"\x00\x01garbage".to_vec());
        let err = find_icon(&archive, &Config::default()).unwrap_err();
        assert!(matches!(err, ThumbnailError::UnresolvableIcon { .. }));
    }

    /// Archive whose extraction tool fails on every member
    #[cfg(unix)]
    struct FailingTool;

    #[cfg(unix)]
    impl Archive for FailingTool {
        fn name(&self) -> &str {
            "failing"
        }

        fn extract(&self, _member: &str) -> Result<Vec<u8>, archive::ArchiveError> {
            use std::os::unix::process::ExitStatusExt;
            Err(archive::ArchiveError::ToolFailed {
                tool: "unsquashfs".to_string(),
                status: std::process::ExitStatus::from_raw(1 << 8),
                stderr: "read failed".to_string(),
            })
        }

        fn list(&self) -> Result<Vec<String>, archive::ArchiveError> {
            Ok(vec!["app.desktop".to_string()])
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_no_fallback_when_tool_fails() {
        let err = find_icon(&FailingTool, &Config::default()).unwrap_err();
        match err {
            ThumbnailError::Extraction { member, source } => {
                assert_eq!(member, DIR_ICON);
                assert!(matches!(source, archive::ArchiveError::ToolFailed { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_check_size() {
        let config = Config::default();
        assert!(check_size(1, &config).is_ok());
        assert!(check_size(4096, &config).is_ok());
        assert!(matches!(check_size(0, &config), Err(ThumbnailError::Argument(_))));
        assert!(matches!(check_size(4097, &config), Err(ThumbnailError::Argument(_))));
    }
}
