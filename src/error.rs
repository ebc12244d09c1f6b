// Error types for the thumbnail pipeline

use crate::archive::ArchiveError;
use crate::compositor::CompositeError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Everything that can stop a thumbnail from being produced.
///
/// All variants are terminal: the binary prints the message on one line and
/// exits with status 1.
#[derive(Debug, Error)]
pub enum ThumbnailError {
    /// Wrong argument count or an unusable argument value.
    #[error("{0}")]
    Argument(String),

    /// The input could not be opened as an AppImage archive.
    #[error("failed to open {}: {source}", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: ArchiveError,
    },

    /// A member could not be extracted, or the starting member was empty.
    #[error("failed to extract {member} from AppImage: {source}")]
    Extraction {
        member: String,
        #[source]
        source: ArchiveError,
    },

    /// The reference chain ended without reaching a PNG or SVG.
    #[error("failed to read icon file {member}: {reason}")]
    UnresolvableIcon { member: String, reason: String },

    /// The reference chain was longer than the configured bound.
    #[error("icon reference chain exceeded {max_hops} hops (stopped at {member})")]
    TooManyRedirects { member: String, max_hops: usize },

    /// Decoding, rasterizing, resampling or encoding failed.
    #[error("failed to process image: {0}")]
    ImageProcessing(#[from] CompositeError),

    /// The encoded thumbnail could not be written to its destination.
    #[error("failed to write thumbnail {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ThumbnailError {
    /// Whether this error means the requested member is simply absent,
    /// as opposed to the archive or its tooling being broken.
    pub fn is_missing_member(&self) -> bool {
        match self {
            ThumbnailError::Extraction { source, .. } => source.is_missing_member(),
            _ => false,
        }
    }
}
