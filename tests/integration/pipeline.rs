//! Full pipeline runs under paused tokio time.

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;

use callwatch::config::{GroupDirectory, GroupsConfig, TemplatesConfig, TrackingConfig};
use callwatch::engine::{build_report, Classifier, IngestOutcome, Ingestor, Tracker};
use callwatch::storage::{remove_from_watchlist, MemoryStore, Removal, WatchlistStore};
use callwatch::types::{GroupCategory, TrackedItem, DEFAULT_WIN_THRESHOLD};

use crate::mock_gateway::{MockGateway, RecordingNotifier};

const CA_A: &str = "AAAAbbbbCCCCdddd1111222233334444EEEEffff";
const CA_B: &str = "BBBBccccDDDDeeee5555666677778888FFFFgggg";
const CA_C: &str = "CCCCddddEEEEffff9999000011112222GGGGhhhh";

struct Pipeline {
    gateway: MockGateway,
    store: Arc<MemoryStore>,
    notifier: RecordingNotifier,
    tracker: Arc<Tracker>,
    ingestor: Ingestor,
}

fn pipeline_with(store: Arc<MemoryStore>, settings: TrackingConfig) -> Pipeline {
    let gateway = MockGateway::new();
    let notifier = RecordingNotifier::new();

    let tracker = Arc::new(Tracker::new(
        Arc::new(gateway.clone()),
        store.clone(),
        Arc::new(notifier.clone()),
        settings.clone(),
    ));

    let directory = GroupDirectory::from_config(&GroupsConfig {
        red: vec!["G2".into()],
        yellow: vec![],
        green: vec!["G1".into()],
    });
    let ingestor = Ingestor::new(
        Classifier::new(directory, &settings),
        Arc::new(gateway.clone()),
        tracker.clone(),
        Arc::new(notifier.clone()),
        TemplatesConfig::default(),
    );

    Pipeline {
        gateway,
        store,
        notifier,
        tracker,
        ingestor,
    }
}

fn pipeline() -> Pipeline {
    pipeline_with(Arc::new(MemoryStore::new()), TrackingConfig::default())
}

async fn advance(secs: u64) {
    tokio::time::sleep(Duration::from_secs(secs)).await;
}

#[tokio::test(start_paused = true)]
async fn test_call_reaching_threshold_notifies_once() {
    let p = pipeline();
    p.gateway.script(CA_A, &[Some(1.0), Some(1.5)]);

    let outcome = p
        .ingestor
        .handle_message("G1", &format!("new call {CA_A} lfg"))
        .await;
    assert_eq!(
        outcome,
        IngestOutcome::Tracked {
            address: CA_A.into(),
            category: GroupCategory::Green,
            initial_price: 1.0,
        }
    );

    advance(4).await;

    let item = p.store.get(CA_A).await.unwrap().unwrap();
    assert_eq!(item.highest_multiplier, 1.5);
    assert_eq!(item.current_price, Some(1.5));
    assert_eq!(
        p.notifier.sent(),
        vec![
            format!("Tracking started for CA: {CA_A}. Green group template"),
            format!("New update for {CA_A}: 1.50x"),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_hex_address_never_tracked() {
    let p = pipeline();
    let outcome = p
        .ingestor
        .handle_message("G1", "buy 0xABCDEF0123456789ABCDEF0123456789ABCDEF01 now")
        .await;

    assert!(matches!(outcome, IngestOutcome::Excluded { .. }));
    assert!(p.store.is_empty());
    assert!(p.notifier.sent().is_empty());
    assert_eq!(
        p.gateway
            .calls_for("0xABCDEF0123456789ABCDEF0123456789ABCDEF01"),
        0
    );
}

#[tokio::test(start_paused = true)]
async fn test_unpriced_call_creates_no_record() {
    let p = pipeline();
    p.gateway.script(CA_A, &[None]);

    let outcome = p.ingestor.handle_message("G1", CA_A).await;
    assert!(matches!(outcome, IngestOutcome::Unpriced { .. }));

    advance(600).await;
    assert!(p.store.is_empty());
    assert!(p.tracker.loops().get(CA_A).await.is_none());
    assert_eq!(p.gateway.calls_for(CA_A), 1);
}

#[tokio::test(start_paused = true)]
async fn test_report_over_tracked_calls() {
    let p = pipeline();
    p.gateway.script(CA_A, &[Some(1.0), Some(2.0)]);
    p.gateway.script(CA_B, &[Some(1.0), Some(1.2)]);
    p.gateway.script(CA_C, &[Some(1.0), Some(3.0)]);

    let outcomes = join_all([
        p.ingestor.handle_message("G1", CA_A),
        p.ingestor.handle_message("G1", CA_B),
        p.ingestor.handle_message("G2", CA_C),
    ])
    .await;
    assert!(outcomes
        .iter()
        .all(|o| matches!(o, IngestOutcome::Tracked { .. })));

    advance(4).await;

    let report = build_report(
        p.store.scan_by_multiplier_desc().await.unwrap(),
        DEFAULT_WIN_THRESHOLD,
    );
    let order: Vec<&str> = report.rows.iter().map(|r| r.address.as_str()).collect();
    assert_eq!(order, vec![CA_C, CA_A, CA_B]);
    assert_eq!(report.boundary_index, Some(2));

    assert_eq!(report.groups[0].group_name, "G2");
    assert_eq!((report.groups[0].total, report.groups[0].wins), (1, 1));
    assert_eq!(report.groups[1].group_name, "G1");
    assert_eq!((report.groups[1].total, report.groups[1].wins), (2, 1));
    assert_eq!(format!("{:.2}", report.overall.winrate), "66.67");

    // two wins, two threshold notices
    assert_eq!(p.notifier.count_containing("New update for"), 2);
    assert_eq!(p.notifier.count_containing("Red group template"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_provider_outage_retries_until_recovery() {
    let p = pipeline();
    p.gateway.script(CA_A, &[Some(2.0)]);
    p.ingestor.handle_message("G1", CA_A).await;

    p.gateway.set_error("503 Service Unavailable");
    // attempts at 3, 6, 9, 12
    advance(13).await;
    assert_eq!(p.gateway.calls_for(CA_A), 1 + 4);
    let state = p.tracker.loops().get(CA_A).await.unwrap();
    assert_eq!(state.unavailable_streak, 4);
    assert_eq!(state.samples, 0);
    assert_eq!(p.store.get(CA_A).await.unwrap().unwrap().current_price, Some(2.0));

    p.gateway.clear_error();
    p.gateway.script(CA_A, &[Some(5.0)]);
    advance(3).await;

    let state = p.tracker.loops().get(CA_A).await.unwrap();
    assert_eq!(state.samples, 1);
    assert_eq!(state.unavailable_streak, 0);
    assert_eq!(p.store.get(CA_A).await.unwrap().unwrap().highest_multiplier, 2.5);
}

#[tokio::test(start_paused = true)]
async fn test_repeat_call_from_other_group_is_ignored() {
    let p = pipeline();
    p.gateway.script(CA_A, &[Some(1.0), Some(9.0)]);

    p.ingestor.handle_message("G1", CA_A).await;
    let outcome = p.ingestor.handle_message("G2", CA_A).await;
    assert!(matches!(outcome, IngestOutcome::AlreadyTracked { .. }));

    let item = p.store.get(CA_A).await.unwrap().unwrap();
    assert_eq!(item.group_name, "G1");
    assert_eq!(item.initial_price, 1.0);
    assert_eq!(p.tracker.loops().running_count().await, 1);
    assert_eq!(p.notifier.count_containing("Tracking started"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_removal_does_not_recreate_record() {
    let p = pipeline();
    p.gateway.script(CA_A, &[Some(1.0), Some(1.1), Some(1.2)]);
    p.ingestor.handle_message("G1", CA_A).await;
    advance(4).await;

    assert_eq!(
        remove_from_watchlist(p.store.as_ref(), CA_A).await.unwrap(),
        Removal::Removed
    );
    assert_eq!(
        remove_from_watchlist(p.store.as_ref(), CA_A).await.unwrap(),
        Removal::NotFound
    );

    // loop keeps running by default but never writes the row back
    advance(300).await;
    assert!(p.tracker.loops().is_running(CA_A).await);
    assert_eq!(p.tracker.loops().get(CA_A).await.unwrap().samples, 2);
    assert!(p.store.get(CA_A).await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_call_after_removal_tracks_from_new_baseline() {
    let p = pipeline();
    p.gateway.script(CA_A, &[Some(1.0), Some(1.1)]);
    p.ingestor.handle_message("G1", CA_A).await;
    advance(4).await;

    assert_eq!(
        remove_from_watchlist(p.store.as_ref(), CA_A).await.unwrap(),
        Removal::Removed
    );

    // ingest quote, then the new loop's first sample
    p.gateway.script(CA_A, &[Some(10.0), Some(12.0)]);
    let outcome = p.ingestor.handle_message("G2", CA_A).await;
    assert_eq!(
        outcome,
        IngestOutcome::Tracked {
            address: CA_A.into(),
            category: GroupCategory::Red,
            initial_price: 10.0,
        }
    );

    // well past the old loop's next wake-up
    advance(400).await;

    let item = p.store.get(CA_A).await.unwrap().unwrap();
    assert_eq!(item.initial_price, 10.0);
    assert_eq!(item.group_name, "G2");
    assert_eq!(item.current_price, Some(12.0));
    assert!((item.highest_multiplier - 1.2).abs() < 1e-9);

    let state = p.tracker.loops().get(CA_A).await.unwrap();
    assert_eq!(state.group_name, "G2");
    assert_eq!(state.samples, 1);
    assert_eq!(p.tracker.loops().running_count().await, 1);

    assert_eq!(p.notifier.count_containing("Tracking started"), 2);
    assert_eq!(p.notifier.count_containing("New update for"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_resume_after_restart() {
    let store = Arc::new(MemoryStore::new());
    let mut item = TrackedItem::new(CA_B, 2.0, "G1");
    item.highest_multiplier = 1.8;
    store.insert_if_absent(&item).await.unwrap();
    store.record_sample(CA_B, 3.6, 1.8).await.unwrap();

    let p = pipeline_with(store, TrackingConfig::default());
    p.gateway.script(CA_B, &[Some(3.0)]);
    assert_eq!(p.tracker.resume_all().await.unwrap(), 1);

    advance(4).await;

    let stored = p.store.get(CA_B).await.unwrap().unwrap();
    assert_eq!(stored.current_price, Some(3.0));
    // 1.5x now, but the earlier 1.8x peak stays
    assert_eq!(stored.highest_multiplier, 1.8);
    assert_eq!(p.notifier.sent(), vec![format!("New update for {CA_B}: 1.50x")]);
}
