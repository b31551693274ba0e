//! Turning a captured raster into a downloadable artifact.

pub mod document;
pub mod sink;

use std::fmt;

use base64::Engine as _;
use sha2::{Digest, Sha256};

use crate::rendering::RasterBuffer;
use crate::Result;

pub use sink::{DirectorySink, DownloadSink, MemorySink};

/// File name used by every document export.
pub const DOCUMENT_FILE_NAME: &str = "event-ticket.pdf";
/// Stem used when a person name sanitizes to nothing.
pub const FALLBACK_STEM: &str = "ticket";
/// Longest file name (in bytes) common filesystems accept.
pub const MAX_FILE_NAME_BYTES: usize = 255;

const IMAGE_EXTENSION: &str = ".png";

/// Which submit control was used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    /// "Save Ticket as Image"
    Image,
    /// "Generate PDF Ticket"
    Document,
}

impl Variant {
    pub fn submit_label(&self) -> &'static str {
        match self {
            Variant::Image => "Save Ticket as Image",
            Variant::Document => "Generate PDF Ticket",
        }
    }
}

/// How the image file name is derived from the person name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilenamePolicy {
    /// Strip characters that are invalid on common filesystems.
    #[default]
    Sanitize,
    /// Use the name verbatim; the sink decides what it accepts.
    PassThrough,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Png,
    Pdf,
}

impl ArtifactKind {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ArtifactKind::Png => "image/png",
            ArtifactKind::Pdf => "application/pdf",
        }
    }
}

/// An encoded export, ready to be handed to a `DownloadSink`.
#[derive(Clone, PartialEq, Eq)]
pub struct Artifact {
    pub file_name: String,
    pub kind: ArtifactKind,
    pub bytes: Vec<u8>,
}

impl Artifact {
    /// Hex-encoded SHA-256 of the artifact bytes.
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(&self.bytes))
    }

    /// The artifact as a `data:` URL.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.kind.mime_type(),
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifact")
            .field("file_name", &self.file_name)
            .field("kind", &self.kind)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Longest prefix of `s` that fits in `max` bytes without splitting a char.
fn truncate_at_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// File name for an image export of `person_name`.
pub fn image_file_name(person_name: &str, policy: FilenamePolicy) -> String {
    let stem = match policy {
        FilenamePolicy::PassThrough => person_name.to_string(),
        FilenamePolicy::Sanitize => {
            let cleaned = sanitize_filename::sanitize(person_name);
            let cleaned = truncate_at_char_boundary(
                cleaned.trim(),
                MAX_FILE_NAME_BYTES - IMAGE_EXTENSION.len(),
            )
            .trim_end();
            if cleaned.is_empty() {
                FALLBACK_STEM.to_string()
            } else {
                cleaned.to_string()
            }
        }
    };
    format!("{}{}", stem, IMAGE_EXTENSION)
}

pub fn image_artifact(
    raster: &RasterBuffer,
    person_name: &str,
    policy: FilenamePolicy,
) -> Result<Artifact> {
    Ok(Artifact {
        file_name: image_file_name(person_name, policy),
        kind: ArtifactKind::Png,
        bytes: raster.encode_png()?,
    })
}

pub fn document_artifact(raster: &RasterBuffer) -> Result<Artifact> {
    Ok(Artifact {
        file_name: DOCUMENT_FILE_NAME.to_string(),
        kind: ArtifactKind::Pdf,
        bytes: document::build_document(raster)?,
    })
}
