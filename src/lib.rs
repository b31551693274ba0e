//! Ticketcard
//!
//! Compose an event ticket card from five form fields and export it as a PNG
//! image or a single-page PDF.
//!
//! # Pipeline
//!
//! - **Form state**: `FormState` holds the committed `TicketFields`
//! - **Composition**: `rendering::compose` maps fields to the displayed card text
//! - **Capture**: the card is laid out, painted and rasterized at 2x on a worker thread
//! - **Export**: the raster is encoded as PNG, or embedded in an A4-wide PDF page,
//!   and handed to a `DownloadSink`
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ticketcard::{DirectorySink, Exporter, FieldName, TicketSession, Variant};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let exporter = Exporter::new(None).await?;
//! let mut session = TicketSession::new(exporter, Arc::new(DirectorySink::new("out")));
//! session.mount().await?;
//!
//! session.set_field(FieldName::PersonName, "Ali");
//! session.set_field(FieldName::EventName, "الدب");
//! session.set_field(FieldName::NumberOfAttendees, "4");
//! session.set_field(FieldName::DateTime, "2024-05-01T19:30");
//! session.set_field(FieldName::Address, "Riyadh");
//!
//! if let Some(path) = session.submit(Variant::Image).await? {
//!     println!("saved {}", path.display());
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod assets;
pub mod async_api;
pub mod export;
pub mod form;
pub mod rendering;

pub use assets::AssetSource;
pub use async_api::{Exporter, TicketSession};
pub use export::{Artifact, DirectorySink, DownloadSink, FilenamePolicy, MemorySink, Variant};
pub use form::{FieldName, FormState, TicketFields};
pub use rendering::compose::{compose, TicketView};
pub use rendering::{Capture, CaptureRegion, RasterBuffer};

use rendering::compose::{DEFAULT_FOOTER, DEFAULT_TICKET_NUMBER};
use rendering::layout::{DEFAULT_CARD_WIDTH, MAX_CARD_WIDTH, MIN_CARD_WIDTH};
use rendering::{DEFAULT_SCALE, MAX_SCALE};

/// Configuration for the export pipeline
///
/// The defaults reproduce the stock ticket: a 512px card captured at 2x,
/// ticket number "03255", no logo or background, and sanitized file names.
///
/// # Examples
///
/// ```
/// let cfg = ticketcard::ExportConfig::default();
/// assert_eq!(cfg.scale, 2);
/// assert!(cfg.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Card width in CSS pixels
    pub card_width: u32,
    /// Oversampling factor applied to the capture
    pub scale: u32,
    /// Ticket number shown in the header pill
    pub ticket_number: String,
    /// Footer line; its last word is drawn bold
    pub footer: String,
    /// Logo drawn in the header
    pub logo: Option<AssetSource>,
    /// Image covering the card background
    pub background: Option<AssetSource>,
    /// Timeout for fetching remote assets in milliseconds
    pub asset_timeout_ms: u64,
    /// How image file names are derived from the person name
    pub filename_policy: FilenamePolicy,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            card_width: DEFAULT_CARD_WIDTH,
            scale: DEFAULT_SCALE,
            ticket_number: DEFAULT_TICKET_NUMBER.to_string(),
            footer: DEFAULT_FOOTER.to_string(),
            logo: None,
            background: None,
            asset_timeout_ms: 30000,
            filename_policy: FilenamePolicy::default(),
        }
    }
}

impl ExportConfig {
    pub fn validate(&self) -> Result<()> {
        if self.scale == 0 || self.scale > MAX_SCALE {
            return Err(Error::ConfigError(format!(
                "scale must be between 1 and {}, got {}",
                MAX_SCALE, self.scale
            )));
        }
        if !(MIN_CARD_WIDTH..=MAX_CARD_WIDTH).contains(&self.card_width) {
            return Err(Error::ConfigError(format!(
                "card width must be between {}px and {}px, got {}",
                MIN_CARD_WIDTH, MAX_CARD_WIDTH, self.card_width
            )));
        }
        if self.asset_timeout_ms == 0 {
            return Err(Error::ConfigError("asset timeout must be non-zero".into()));
        }
        Ok(())
    }
}
