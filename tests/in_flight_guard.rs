//! A submit issued while an export is awaiting its capture is a no-op

use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;

use ticketcard::rendering::raster::Rasterizer;
use ticketcard::{
    Capture, CaptureRegion, Error, ExportConfig, Exporter, FieldName, MemorySink, RasterBuffer,
    TicketSession, TicketView, Variant,
};

/// Blocks each capture until the test releases it.
struct GatedCapture {
    inner: Rasterizer,
    gate: Receiver<()>,
}

impl Capture for GatedCapture {
    fn capture(
        &mut self,
        region: &CaptureRegion,
        view: &TicketView,
    ) -> ticketcard::Result<RasterBuffer> {
        self.gate
            .recv()
            .map_err(|_| Error::CaptureFailure("gate closed".into()))?;
        self.inner.capture(region, view)
    }
}

#[tokio::test]
async fn second_submit_while_busy_is_ignored() {
    let (release, gate) = mpsc::channel();
    let backend = GatedCapture {
        inner: Rasterizer::new(),
        gate,
    };
    let exporter = Exporter::with_backend(ExportConfig::default(), backend)
        .await
        .unwrap();
    let sink = Arc::new(MemorySink::new());
    let mut session = TicketSession::new(exporter, sink.clone());
    session.mount().await.unwrap();
    session.set_field(FieldName::PersonName, "Ali");

    let (first, _) = tokio::join!(session.submit_forced(Variant::Image), async {
        while !session.exporter().is_busy() {
            tokio::task::yield_now().await;
        }
        let second = session.submit_forced(Variant::Image).await;
        assert!(second.is_none());
        release.send(()).unwrap();
    });

    assert_eq!(first.unwrap().to_str(), Some("Ali.png"));
    assert_eq!(sink.len(), 1);
    assert!(!session.exporter().is_busy());

    // the guard is released once the first export completes
    release.send(()).unwrap();
    assert!(session.submit_forced(Variant::Document).await.is_some());
    assert_eq!(sink.len(), 2);
}

#[tokio::test]
async fn clones_share_the_in_flight_guard() {
    let (release, gate) = mpsc::channel();
    let exporter = Exporter::with_backend(
        ExportConfig::default(),
        GatedCapture {
            inner: Rasterizer::new(),
            gate,
        },
    )
    .await
    .unwrap();
    let region = exporter.mount().await.unwrap();
    let other = exporter.clone();
    let sink = MemorySink::new();
    let fields = ticketcard::TicketFields::default();

    let (first, second) = tokio::join!(
        exporter.export(Some(&region), &fields, Variant::Document, &sink),
        async {
            while !other.is_busy() {
                tokio::task::yield_now().await;
            }
            let res = other
                .export(Some(&region), &fields, Variant::Document, &sink)
                .await;
            release.send(()).unwrap();
            res
        }
    );

    assert!(first.is_ok());
    assert!(matches!(second, Err(Error::ExportInProgress)));
    assert_eq!(sink.len(), 1);
}
