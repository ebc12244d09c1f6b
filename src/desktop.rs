// Desktop entry fallback for AppImages without a usable .DirIcon
//
// Every AppImage ships a .desktop file at its root. Its Icon= key names the
// icon either as a path or as a theme icon name, which is looked up at the
// root and in the usual icon directories of the bundled filesystem.

use crate::archive::{normalize_member, Archive};
use crate::resolver::{self, ResolvedIcon};
use std::cmp::Reverse;

/// Directories searched for a theme icon name, in order
const ICON_ROOTS: &[&str] = &[
    "usr/share/icons/",
    "usr/share/pixmaps/",
    ".local/share/icons/",
];

/// Extensions of icon files we can render
const ICON_EXTENSIONS: &[&str] = &["svg", "png"];

/// Find the icon named by the root `.desktop` file.
///
/// Returns `None` when there is no desktop entry, no `Icon=` key, or none of
/// the candidates resolves to an image.
pub fn resolve_desktop_icon(archive: &dyn Archive, max_hops: usize) -> Option<ResolvedIcon> {
    let members = match archive.list() {
        Ok(members) => members,
        Err(e) => {
            log::debug!("[{}] listing failed: {}", archive.name(), e);
            return None;
        }
    };

    let desktop = find_desktop_entry(&members)?;
    let content = match archive.extract(desktop) {
        Ok(content) => content,
        Err(e) => {
            log::debug!("failed to read {}: {}", desktop, e);
            return None;
        }
    };

    let icon = parse_icon_key(&String::from_utf8_lossy(&content))?;
    log::debug!("{} names icon {:?}", desktop, icon);

    for candidate in icon_candidates(&icon, &members) {
        match resolver::resolve(archive, &candidate, max_hops) {
            Ok(resolved) => return Some(resolved),
            Err(e) => log::debug!("candidate {} rejected: {}", candidate, e),
        }
    }
    None
}

/// First `.desktop` file at the archive root
pub fn find_desktop_entry(members: &[String]) -> Option<&str> {
    members
        .iter()
        .map(String::as_str)
        .find(|m| !m.contains('/') && m.to_ascii_lowercase().ends_with(".desktop"))
}

/// Value of the first `Icon` key in the `[Desktop Entry]` group.
/// Localized keys such as `Icon[de]` are ignored.
pub fn parse_icon_key(content: &str) -> Option<String> {
    let mut in_entry = false;
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.starts_with('[') {
            in_entry = line == "[Desktop Entry]";
            continue;
        }
        if !in_entry {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            if key.trim() == "Icon" {
                let value = value.trim();
                return (!value.is_empty()).then(|| value.to_string());
            }
        }
    }
    None
}

/// Members worth trying for an `Icon=` value, most likely first.
pub fn icon_candidates(icon: &str, members: &[String]) -> Vec<String> {
    let mut candidates = Vec::new();

    if icon.contains('/') || image_extension(icon).is_some() {
        candidates.extend(normalize_member(icon));
    }

    let file_name = icon.rsplit('/').next().unwrap_or(icon);
    let name = strip_image_extension(file_name);
    if name.is_empty() {
        return candidates;
    }
    for ext in ICON_EXTENSIONS {
        candidates.push(format!("{}.{}", name, ext));
    }

    let mut themed: Vec<&String> = members
        .iter()
        .filter(|m| ICON_ROOTS.iter().any(|root| m.starts_with(root)))
        .filter(|m| {
            let file = m.rsplit('/').next().unwrap_or(m.as_str());
            image_extension(file).is_some()
                && strip_image_extension(file).eq_ignore_ascii_case(name)
        })
        .collect();
    // Vector first, then the biggest raster; ties keep listing order
    themed.sort_by_key(|m| {
        (
            Reverse(image_extension(m) == Some("svg")),
            Reverse(icon_dir_size(m)),
        )
    });
    candidates.extend(themed.into_iter().cloned());

    let mut seen = std::collections::HashSet::new();
    candidates.retain(|c| seen.insert(c.clone()));
    candidates
}

/// Lowercased icon extension of `name`, if it is one we render
fn image_extension(name: &str) -> Option<&'static str> {
    let (_, ext) = name.rsplit_once('.')?;
    ICON_EXTENSIONS
        .iter()
        .copied()
        .find(|known| ext.eq_ignore_ascii_case(known))
}

/// Strip `.png`/`.svg` but keep dots that are part of the icon name,
/// as in `org.example.App`.
fn strip_image_extension(name: &str) -> &str {
    match image_extension(name) {
        Some(ext) => &name[..name.len() - ext.len() - 1],
        None => name,
    }
}

/// Pixel size from an icon theme directory like `256x256` or `48x48@2`
fn icon_dir_size(path: &str) -> u32 {
    path.split('/')
        .filter_map(|component| {
            let (w, rest) = component.split_once('x')?;
            let h = rest.split('@').next()?;
            let w: u32 = w.parse().ok()?;
            let scale: u32 = rest
                .split_once('@')
                .and_then(|(_, s)| s.parse().ok())
                .unwrap_or(1);
            (h.parse::<u32>().ok()? == w).then_some(w * scale)
        })
        .max()
        .unwrap_or(0)
}
