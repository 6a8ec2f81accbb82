//! Poll cycles against a mocked SOC and a recording push sender.

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{add_tracker, add_user, memory_db, soc_client, RecordingPush};
use course_tracker::db::TrackerDb;
use course_tracker::dispatcher::Dispatcher;
use course_tracker::poller::{AvailabilityPoller, PollerSettings, QuietHours};
use course_tracker::snapshot::TrackerSnapshot;
use course_tracker::term::Season;
use course_tracker::watcher::TrackerWatcher;

const OPEN_SECTIONS: &str = "/soc/api/openSections.gzip";

fn at(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 10, 1)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

struct Harness {
    db: Arc<TrackerDb>,
    push: Arc<RecordingPush>,
    watcher: Arc<TrackerWatcher>,
    poller: AvailabilityPoller,
}

fn harness(server: &MockServer, db: Arc<TrackerDb>, seasons: Vec<Season>) -> Harness {
    let push = Arc::new(RecordingPush::default());
    let snapshot = Arc::new(TrackerSnapshot::new());
    let watcher = Arc::new(TrackerWatcher::new(
        db.clone(),
        snapshot.clone(),
        Duration::from_secs(1),
    ));
    watcher.populate().unwrap();

    let dispatcher = Arc::new(Dispatcher::new(db.clone(), push.clone()));
    let poller = AvailabilityPoller::new(
        soc_client(&server.uri()),
        snapshot,
        dispatcher,
        seasons,
        PollerSettings {
            interval: Duration::from_secs(15),
            dispatch_concurrency: 4,
            quiet_hours: Some(QuietHours::default()),
        },
    );

    Harness {
        db,
        push,
        watcher,
        poller,
    }
}

async fn mount_open(server: &MockServer, term_code: &str, indices: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(OPEN_SECTIONS))
        .and(query_param("year", "2024"))
        .and(query_param("term", term_code))
        .and(query_param("campus", "NB"))
        .respond_with(ResponseTemplate::new(200).set_body_json(indices))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_open_section_notifies_and_deactivates() {
    let server = MockServer::start().await;
    mount_open(&server, "9", json!(["01234", "05678"])).await;

    let db = memory_db();
    add_user(&db, "user-1", "device-token");
    let id = add_tracker(&db, "user-1", "01234", Season::Fall);
    let h = harness(&server, db, vec![Season::Fall]);

    let report = h.poller.run_cycle(at(12, 0)).await;

    assert_eq!(report.terms_polled, 1);
    assert_eq!(report.matched, 1);
    assert_eq!(report.sent, 1);

    let sent = h.push.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].token, "device-token");
    assert_eq!(sent[0].notification.title, "INTRO COMPUTER SCI (01234) is now open!");
    assert_eq!(sent[0].data["index"], "01234");
    assert_eq!(sent[0].data["year"], "2024");
    assert_eq!(sent[0].data["sem"], "9");

    assert!(!h.db.tracker(id).unwrap().unwrap().active);
    assert!(h.db.active_trackers().unwrap().is_empty());
}

#[tokio::test]
async fn test_closed_section_is_not_notified() {
    let server = MockServer::start().await;
    mount_open(&server, "9", json!(["05678"])).await;

    let db = memory_db();
    add_user(&db, "user-1", "device-token");
    let id = add_tracker(&db, "user-1", "01234", Season::Fall);
    let h = harness(&server, db, vec![Season::Fall]);

    let report = h.poller.run_cycle(at(12, 0)).await;

    assert_eq!(report.matched, 0);
    assert!(h.push.sent().is_empty());
    assert!(h.db.tracker(id).unwrap().unwrap().active);
}

#[tokio::test]
async fn test_failed_term_does_not_stop_cycle() {
    let server = MockServer::start().await;
    mount_open(&server, "9", json!(["01234"])).await;
    Mock::given(method("GET"))
        .and(path(OPEN_SECTIONS))
        .and(query_param("term", "7"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let db = memory_db();
    add_user(&db, "user-1", "device-token");
    add_tracker(&db, "user-1", "01234", Season::Fall);
    add_tracker(&db, "user-1", "09999", Season::Summer);
    let h = harness(&server, db, vec![Season::Summer, Season::Fall]);

    let report = h.poller.run_cycle(at(12, 0)).await;

    assert_eq!(report.terms_failed, 1);
    assert_eq!(report.terms_polled, 1);
    assert_eq!(report.sent, 1);
    assert_eq!(h.push.sent()[0].data["index"], "01234");
}

#[tokio::test]
async fn test_unparseable_open_sections_fails_term() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(OPEN_SECTIONS))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let db = memory_db();
    add_user(&db, "user-1", "device-token");
    let id = add_tracker(&db, "user-1", "01234", Season::Fall);
    let h = harness(&server, db, vec![Season::Fall]);

    let report = h.poller.run_cycle(at(12, 0)).await;

    assert_eq!(report.terms_failed, 1);
    assert_eq!(report.terms_polled, 0);
    assert!(h.push.sent().is_empty());
    assert!(h.db.tracker(id).unwrap().unwrap().active);
}

#[tokio::test]
async fn test_tracker_for_other_season_is_ignored() {
    let server = MockServer::start().await;
    mount_open(&server, "9", json!(["01234"])).await;

    let db = memory_db();
    add_user(&db, "user-1", "device-token");
    let spring = add_tracker(&db, "user-1", "01234", Season::Spring);
    let h = harness(&server, db, vec![Season::Fall]);

    let report = h.poller.run_cycle(at(12, 0)).await;

    assert_eq!(report.matched, 0);
    assert!(h.db.tracker(spring).unwrap().unwrap().active);
}

#[tokio::test]
async fn test_inactive_tracker_is_not_notified() {
    let server = MockServer::start().await;
    mount_open(&server, "9", json!(["01234"])).await;

    let db = memory_db();
    add_user(&db, "user-1", "device-token");
    let id = add_tracker(&db, "user-1", "01234", Season::Fall);
    db.deactivate_tracker(id).unwrap();
    let h = harness(&server, db, vec![Season::Fall]);

    let report = h.poller.run_cycle(at(12, 0)).await;

    assert_eq!(report.matched, 0);
    assert!(h.push.sent().is_empty());
}

#[tokio::test]
async fn test_second_cycle_does_not_renotify() {
    let server = MockServer::start().await;
    mount_open(&server, "9", json!(["01234"])).await;

    let db = memory_db();
    add_user(&db, "user-1", "device-token");
    add_tracker(&db, "user-1", "01234", Season::Fall);
    let h = harness(&server, db, vec![Season::Fall]);

    h.poller.run_cycle(at(12, 0)).await;
    // Snapshot has not caught up with the deactivation yet
    let second = h.poller.run_cycle(at(12, 1)).await;
    assert_eq!(second.sent, 0);

    h.watcher.refresh();
    let third = h.poller.run_cycle(at(12, 2)).await;
    assert_eq!(third.matched, 0);

    assert_eq!(h.push.sent().len(), 1);
}

#[tokio::test]
async fn test_failed_push_retries_next_cycle() {
    let server = MockServer::start().await;
    mount_open(&server, "9", json!(["01234"])).await;

    let db = memory_db();
    add_user(&db, "user-1", "device-token");
    let id = add_tracker(&db, "user-1", "01234", Season::Fall);
    let h = harness(&server, db, vec![Season::Fall]);

    h.push.set_failing(true);
    let first = h.poller.run_cycle(at(12, 0)).await;
    assert_eq!(first.failed, 1);
    assert!(h.db.tracker(id).unwrap().unwrap().active);

    h.push.set_failing(false);
    let second = h.poller.run_cycle(at(12, 1)).await;
    assert_eq!(second.sent, 1);
    assert!(!h.db.tracker(id).unwrap().unwrap().active);
}

#[tokio::test]
async fn test_missing_token_keeps_tracker_active() {
    let server = MockServer::start().await;
    mount_open(&server, "9", json!(["01234"])).await;

    let db = memory_db();
    let id = add_tracker(&db, "nobody", "01234", Season::Fall);
    let h = harness(&server, db, vec![Season::Fall]);

    let report = h.poller.run_cycle(at(12, 0)).await;

    assert_eq!(report.failed, 1);
    assert!(h.db.tracker(id).unwrap().unwrap().active);
}

#[tokio::test]
async fn test_quiet_window_skips_cycle() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(OPEN_SECTIONS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["01234"])))
        .expect(0)
        .mount(&server)
        .await;

    let db = memory_db();
    add_user(&db, "user-1", "device-token");
    add_tracker(&db, "user-1", "01234", Season::Fall);
    let h = harness(&server, db, vec![Season::Fall]);

    let report = h.poller.run_cycle(at(3, 0)).await;

    assert!(report.skipped);
    assert!(h.push.sent().is_empty());
}

#[tokio::test]
async fn test_spring_polled_for_next_year() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(OPEN_SECTIONS))
        .and(query_param("year", "2025"))
        .and(query_param("term", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["04321"])))
        .expect(1)
        .mount(&server)
        .await;

    let db = memory_db();
    add_user(&db, "user-1", "device-token");
    add_tracker(&db, "user-1", "04321", Season::Spring);
    let h = harness(&server, db, vec![Season::Spring]);

    let report = h.poller.run_cycle(at(12, 0)).await;

    assert_eq!(report.sent, 1);
    assert_eq!(h.push.sent()[0].data["year"], "2025");
}
