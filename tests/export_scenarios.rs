//! End-to-end export scenarios through `TicketSession`

use std::sync::Arc;

use lopdf::{Document, Object};
use ticketcard::export::document::A4_WIDTH_PT;
use ticketcard::export::ArtifactKind;
use ticketcard::{
    compose, DirectorySink, Exporter, FieldName, MemorySink, TicketFields, TicketSession, Variant,
};

fn ali() -> TicketFields {
    TicketFields {
        person_name: "Ali".into(),
        event_name: "الدب".into(),
        number_of_attendees: "4".into(),
        date_time: "2024-05-01T19:30".into(),
        address: "Riyadh".into(),
    }
}

async fn mounted_session(sink: Arc<MemorySink>) -> TicketSession {
    let exporter = Exporter::new(None).await.expect("exporter");
    let mut session = TicketSession::new(exporter, sink);
    session.mount().await.expect("mount");
    session
}

fn fill(session: &mut TicketSession, fields: &TicketFields) {
    for name in FieldName::ALL {
        session.set_field(name, fields.get(name));
    }
}

fn number(o: &Object) -> f64 {
    match o {
        Object::Real(v) => *v as f64,
        Object::Integer(v) => *v as f64,
        other => panic!("not a number: {:?}", other),
    }
}

#[tokio::test]
async fn ali_ticket_is_saved_as_png_named_after_person() {
    let sink = Arc::new(MemorySink::new());
    let mut session = mounted_session(sink.clone()).await;
    fill(&mut session, &ali());

    let view = session.view();
    assert_eq!(view.person_name.text, "Ali");
    assert_eq!(view.number_of_attendees.text, "4");
    assert_eq!(view.event_name.text, "الدب");
    assert!(view.date_time.text.contains("05/01/2024"));
    assert!(view.date_time.text.contains("07:30 PM"));
    assert_eq!(view.address.text, "Riyadh");

    let saved = session.submit(Variant::Image).await.expect("valid submit");
    assert_eq!(saved.unwrap().to_str(), Some("Ali.png"));

    let artifacts = sink.saved();
    assert_eq!(artifacts.len(), 1);
    assert_eq!(artifacts[0].file_name, "Ali.png");
    assert_eq!(artifacts[0].kind, ArtifactKind::Png);
    let img = image::load_from_memory(&artifacts[0].bytes).expect("decodable png");
    assert_eq!(img.width(), 1024);
}

#[tokio::test]
async fn forced_submit_with_empty_fields_still_produces_a_raster() {
    let sink = Arc::new(MemorySink::new());
    let session = mounted_session(sink.clone()).await;

    let view = session.view();
    assert!(view.values().iter().all(|v| v.placeholder));

    // the form controls would block this submit
    assert!(session.submit(Variant::Image).await.is_err());
    assert!(sink.is_empty());

    let saved = session.submit_forced(Variant::Image).await;
    assert!(saved.is_some());
    let artifacts = sink.saved();
    assert_eq!(artifacts.len(), 1);
    assert_eq!(artifacts[0].file_name, "ticket.png");
    let img = image::load_from_memory(&artifacts[0].bytes).expect("decodable png");
    assert!(img.width() > 0 && img.height() > 0);
}

#[tokio::test]
async fn repeated_exports_are_byte_identical() {
    let sink = Arc::new(MemorySink::new());
    let mut session = mounted_session(sink.clone()).await;
    fill(&mut session, &ali());

    for variant in [Variant::Image, Variant::Image, Variant::Document, Variant::Document] {
        assert!(session.submit(variant).await.unwrap().is_some());
    }
    let a = sink.saved();
    assert_eq!(a.len(), 4);
    assert_eq!(a[0].bytes, a[1].bytes);
    assert_eq!(a[2].bytes, a[3].bytes);
    assert_eq!(a[0].digest(), a[1].digest());
}

#[tokio::test]
async fn document_page_is_a4_wide_with_proportional_height() {
    let sink = Arc::new(MemorySink::new());
    let mut session = mounted_session(sink.clone()).await;
    fill(&mut session, &ali());

    session.submit(Variant::Image).await.unwrap();
    session.submit(Variant::Document).await.unwrap();
    let artifacts = sink.saved();
    let png = image::load_from_memory(&artifacts[0].bytes).unwrap();
    let pdf = &artifacts[1];
    assert_eq!(pdf.file_name, "event-ticket.pdf");
    assert_eq!(pdf.kind, ArtifactKind::Pdf);

    let doc = Document::load_mem(&pdf.bytes).expect("parseable pdf");
    let pages = doc.get_pages();
    assert_eq!(pages.len(), 1);
    let page = doc.get_dictionary(pages[&1]).unwrap();
    let media = page.get(b"MediaBox").unwrap().as_array().unwrap();
    let width = number(&media[2]);
    let height = number(&media[3]);
    let expected = png.height() as f64 * A4_WIDTH_PT / png.width() as f64;
    assert!((width - A4_WIDTH_PT).abs() < 0.01);
    assert!((height - expected).abs() < 0.01, "{} vs {}", height, expected);
}

#[tokio::test]
async fn very_long_person_name_still_saves_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let exporter = Exporter::new(None).await.unwrap();
    let mut session = TicketSession::new(exporter, Arc::new(DirectorySink::new(dir.path())));
    session.mount().await.unwrap();
    fill(&mut session, &ali().with_field(FieldName::PersonName, "a".repeat(300)));

    let saved = session.submit(Variant::Image).await.unwrap().expect("saved");
    let name = saved.file_name().unwrap().to_str().unwrap();
    assert_eq!(name.len(), 255);
    assert!(saved.exists());
}

#[tokio::test]
async fn submit_before_mount_saves_nothing() {
    let sink = Arc::new(MemorySink::new());
    let exporter = Exporter::new(None).await.unwrap();
    let mut session = TicketSession::new(exporter, sink.clone());
    fill(&mut session, &ali());

    assert!(!session.is_mounted());
    assert_eq!(session.submit(Variant::Document).await.unwrap(), None);
    assert!(sink.is_empty());
}

#[tokio::test]
async fn later_edits_do_not_change_composed_view_of_earlier_snapshot() {
    let fields = ali();
    let before = compose(&fields);
    let edited = fields.with_field(FieldName::PersonName, "Sara");
    assert_eq!(before.person_name.text, "Ali");
    assert_eq!(compose(&edited).person_name.text, "Sara");
}
