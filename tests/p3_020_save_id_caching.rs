// P3-020: First save creates, later saves update
// Test: Save twice on one page session against a fake backend
// Expected: POST then PUT to the returned id; failures leave the cache alone


use test_helpers::{
    IMAGE_HEIGHT, IMAGE_WIDTH, MAX_DISPLAY_WIDTH, MockStore, TRADE_ID, create_basic_record, create_session, draw,
};
use trade_annotator::config::CanvasConfig;
use trade_annotator::drawing::Tool;
use trade_annotator::error::AnnotatorError;
use trade_annotator::persistence::{SaveMethod, load, save};
use trade_annotator::state::{PageSession, lock_session};
use trade_annotator::transform::CoordinateTransformer;

#[tokio::test]
async fn post_then_put_to_cached_id() {
    let store = MockStore::new();
    let mut page = create_session();
    draw(&mut page, Tool::Poi, (100.0, 100.0), (180.0, 160.0));
    let session = page.shared();

    let first = save(&session, &store).await.unwrap();
    assert_eq!(first.method, SaveMethod::Post);
    assert_eq!(first.record_id, Some(100));
    assert_eq!(lock_session(&session).unwrap().record_id, Some(100));

    let second = save(&session, &store).await.unwrap();
    assert_eq!(second.method, SaveMethod::Put);
    assert_eq!(store.calls(), ["POST", "PUT 100"]);
    assert_eq!(store.records.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn loaded_record_id_means_first_save_is_put() {
    let store = MockStore::with_record(create_basic_record());
    let session = create_session().shared();

    assert!(load(&session, &store).await.unwrap());
    let outcome = save(&session, &store).await.unwrap();
    assert_eq!(outcome.method, SaveMethod::Put);
    assert_eq!(store.calls(), [format!("GET {TRADE_ID}"), "PUT 7".to_string()]);
}

#[tokio::test]
async fn failed_post_keeps_session_unsaved() {
    let store = MockStore::new();
    let session = create_session().shared();
    store.fail_next();

    let err = save(&session, &store).await.unwrap_err();
    assert!(matches!(err, AnnotatorError::Server { status: 500, .. }));
    assert_eq!(err.user_message(), "database is locked");
    assert_eq!(lock_session(&session).unwrap().record_id, None);

    // A retry by the user starts over with POST.
    let outcome = save(&session, &store).await.unwrap();
    assert_eq!(outcome.method, SaveMethod::Post);
}

#[tokio::test]
async fn missing_record_loads_nothing() {
    let store = MockStore::new();
    let session = create_session().shared();
    assert!(!load(&session, &store).await.unwrap());
    assert!(lock_session(&session).unwrap().shapes.is_empty());
}

#[tokio::test]
async fn saving_over_ai_record_marks_it_corrected() {
    let mut record = create_basic_record();
    record.ai_detected = true;
    let store = MockStore::with_record(record);
    let session = create_session().shared();

    load(&session, &store).await.unwrap();
    let outcome = save(&session, &store).await.unwrap();
    assert!(outcome.record.ai_detected);
    assert!(outcome.record.user_corrected);
}

#[tokio::test]
async fn nothing_is_drawn_or_saved_before_the_chart_loads() {
    let store = MockStore::with_record(create_basic_record());
    let mut page = PageSession::awaiting_chart(TRADE_ID, &CanvasConfig::default());
    draw(&mut page, Tool::Poi, (100.0, 100.0), (180.0, 160.0));
    assert!(page.shapes.is_empty());
    let session = page.shared();

    let err = save(&session, &store).await.unwrap_err();
    assert!(matches!(err, AnnotatorError::ChartNotReady));
    assert!(store.calls().is_empty());

    lock_session(&session)
        .unwrap()
        .install_chart(CoordinateTransformer::new(IMAGE_WIDTH, IMAGE_HEIGHT, MAX_DISPLAY_WIDTH));
    assert!(load(&session, &store).await.unwrap());
    lock_session(&session).unwrap().mark_chart_ready();

    let outcome = save(&session, &store).await.unwrap();
    assert_eq!(outcome.method, SaveMethod::Put);
    assert_eq!(outcome.record.image_width, IMAGE_WIDTH);
    assert_eq!(outcome.record.pois[0].left, 200.0);
    assert_eq!(store.calls(), [format!("GET {TRADE_ID}"), "PUT 7".to_string()]);
}
