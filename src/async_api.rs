use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread;

use tokio::sync::oneshot;

use crate::assets::{self, AssetSet, AssetSource};
use crate::export::{self, DownloadSink, Variant};
use crate::form::{self, FieldName, FormState, TicketFields};
use crate::rendering::compose::{compose_with, TicketView};
use crate::rendering::raster::Rasterizer;
use crate::rendering::{Capture, CaptureRegion, RasterBuffer};
use crate::{Error, ExportConfig, Result};

enum Command {
    Mount {
        logo: Option<AssetSource>,
        background: Option<AssetSource>,
        timeout_ms: u64,
        resp: oneshot::Sender<Result<AssetSet>>,
    },
    Capture(CaptureRegion, TicketView, oneshot::Sender<Result<RasterBuffer>>),
    Close(oneshot::Sender<Result<()>>),
}

/// Clears the in-flight flag when an export finishes or is dropped.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::ExportInProgress)?;
        Ok(Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Run `f` on the worker thread; a panic is reported as `CaptureFailure`.
fn contained<T>(what: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        let reason = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        log::error!("{} panicked: {}", what, reason);
        Err(Error::CaptureFailure(format!("{} panicked: {}", what, reason)))
    })
}

/// Async export pipeline backed by a dedicated capture worker thread.
///
/// The worker owns the `Capture` backend; callers await each capture without
/// blocking their runtime. At most one export runs at a time per exporter
/// (and its clones): a second one started while the first is awaiting its
/// capture fails with `Error::ExportInProgress`.
#[derive(Clone)]
pub struct Exporter {
    cmd_tx: Sender<Command>,
    in_flight: Arc<AtomicBool>,
    config: Arc<ExportConfig>,
}

impl Exporter {
    /// Create an exporter using the software `Rasterizer`.
    pub async fn new(config: Option<ExportConfig>) -> Result<Self> {
        Self::spawn(config.unwrap_or_default(), || Ok(Rasterizer::new())).await
    }

    /// Create an exporter around a custom capture backend.
    pub async fn with_backend<C>(config: ExportConfig, backend: C) -> Result<Self>
    where
        C: Capture + 'static,
    {
        Self::spawn(config, move || Ok(backend)).await
    }

    async fn spawn<C, F>(config: ExportConfig, make_backend: F) -> Result<Self>
    where
        C: Capture + 'static,
        F: FnOnce() -> Result<C> + Send + 'static,
    {
        config.validate()?;

        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
        let (init_tx, init_rx): (oneshot::Sender<Result<()>>, oneshot::Receiver<Result<()>>) =
            oneshot::channel();

        thread::spawn(move || {
            let mut backend = match make_backend() {
                Ok(b) => b,
                Err(err) => {
                    let _ = init_tx.send(Err(err));
                    return;
                }
            };
            let _ = init_tx.send(Ok(()));

            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    Command::Mount {
                        logo,
                        background,
                        timeout_ms,
                        resp,
                    } => {
                        let res = contained("asset loading", || {
                            assets::load_assets(logo.as_ref(), background.as_ref(), timeout_ms)
                        });
                        let _ = resp.send(res);
                    }
                    Command::Capture(region, view, resp) => {
                        let res = contained("capture", || backend.capture(&region, &view));
                        let _ = resp.send(res);
                    }
                    Command::Close(resp) => {
                        let _ = resp.send(Ok(()));
                        break;
                    }
                }
            }
        });

        init_rx
            .await
            .map_err(|e| Error::Other(format!("Capture worker init canceled: {}", e)))??;

        Ok(Self {
            cmd_tx,
            in_flight: Arc::new(AtomicBool::new(false)),
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Whether an export is currently awaiting its capture.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn send(&self, cmd: Command) -> Result<()> {
        self.cmd_tx
            .send(cmd)
            .map_err(|_| Error::Other("Capture worker has shut down".into()))
    }

    /// Load the configured assets and return the painted region handle.
    pub async fn mount(&self) -> Result<CaptureRegion> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Mount {
            logo: self.config.logo.clone(),
            background: self.config.background.clone(),
            timeout_ms: self.config.asset_timeout_ms,
            resp: tx,
        })?;
        let assets = rx
            .await
            .map_err(|e| Error::Other(format!("Mount canceled: {}", e)))??;
        log::debug!("mounted capture region: {:?}", assets);
        Ok(CaptureRegion {
            card_width: self.config.card_width,
            scale: self.config.scale,
            assets: Arc::new(assets),
        })
    }

    /// Rasterize `view` on the worker thread.
    pub async fn capture(&self, region: CaptureRegion, view: TicketView) -> Result<RasterBuffer> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Capture(region, view, tx))?;
        rx.await
            .map_err(|e| Error::Other(format!("Capture canceled: {}", e)))?
    }

    /// Run one export: compose, capture, encode, then hand the artifact to `sink`.
    ///
    /// Field values are read once, before the capture is awaited.
    pub async fn export(
        &self,
        region: Option<&CaptureRegion>,
        fields: &TicketFields,
        variant: Variant,
        sink: &dyn DownloadSink,
    ) -> Result<PathBuf> {
        let _guard = InFlightGuard::acquire(&self.in_flight)?;
        let region = region.cloned().ok_or(Error::MissingRenderTarget)?;
        let snapshot = fields.clone();
        let view = compose_with(&snapshot, &self.config.ticket_number, &self.config.footer);

        let raster = self.capture(region, view).await?;
        let artifact = match variant {
            Variant::Image => export::image_artifact(
                &raster,
                &snapshot.person_name,
                self.config.filename_policy,
            )?,
            Variant::Document => export::document_artifact(&raster)?,
        };
        log::debug!(
            "encoded {} ({} bytes, sha256 {})",
            artifact.file_name,
            artifact.bytes.len(),
            artifact.digest()
        );

        let path = sink.save(&artifact)?;
        log::info!("saved ticket to {}", path.display());
        Ok(path)
    }

    /// Shut down the capture worker.
    pub async fn close(self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        let _ = self.cmd_tx.send(Command::Close(tx));
        rx.await
            .map_err(|e| Error::Other(format!("Close canceled: {}", e)))?
    }
}

/// One page session: form state, the mounted ticket region, and the submit action.
pub struct TicketSession {
    form: FormState,
    exporter: Exporter,
    region: Option<CaptureRegion>,
    sink: Arc<dyn DownloadSink>,
}

impl TicketSession {
    pub fn new(exporter: Exporter, sink: Arc<dyn DownloadSink>) -> Self {
        Self {
            form: FormState::new(),
            exporter,
            region: None,
            sink,
        }
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn fields(&self) -> &TicketFields {
        self.form.fields()
    }

    pub fn set_field(&mut self, name: FieldName, value: impl Into<String>) {
        self.form.set_field(name, value);
    }

    pub fn exporter(&self) -> &Exporter {
        &self.exporter
    }

    /// What the ticket region currently shows.
    pub fn view(&self) -> TicketView {
        let config = self.exporter.config();
        compose_with(self.form.fields(), &config.ticket_number, &config.footer)
    }

    /// Load assets and paint the region. Must complete before a submit can capture.
    pub async fn mount(&mut self) -> Result<()> {
        let region = self.exporter.mount().await?;
        self.region = Some(region);
        Ok(())
    }

    pub fn is_mounted(&self) -> bool {
        self.region.is_some()
    }

    /// Submit through the form controls.
    ///
    /// A submission blocked by field validation returns `Err`. Once the export
    /// starts, failures are logged and reported as `Ok(None)`; no file is saved.
    pub async fn submit(&self, variant: Variant) -> Result<Option<PathBuf>> {
        form::validate_required(self.form.fields())?;
        Ok(self.submit_forced(variant).await)
    }

    /// Submit without field validation (programmatic submit).
    pub async fn submit_forced(&self, variant: Variant) -> Option<PathBuf> {
        let res = self
            .exporter
            .export(
                self.region.as_ref(),
                self.form.fields(),
                variant,
                self.sink.as_ref(),
            )
            .await;
        match res {
            Ok(path) => Some(path),
            Err(Error::ExportInProgress) => {
                log::warn!("{} ignored: an export is already running", variant.submit_label());
                None
            }
            Err(err) => {
                log::error!("Error saving ticket ({}): {}", variant.submit_label(), err);
                None
            }
        }
    }
}
