//! End-to-end scan scenarios through the full pipeline with mock
//! collaborators and real ledger/heartbeat state on disk.

use std::sync::Arc;
use std::time::Duration;

use polyscout::engine::scanner::ScanOrchestrator;
use polyscout::engine::scheduler::Scheduler;
use polyscout::heartbeat::{HeartbeatGate, TASK_MARKET_SCAN};
use polyscout::platforms::polymarket::{GammaMarket, PolymarketClient};
use polyscout::portfolio::PaperLedger;

use crate::mocks::{market, temp_path, MockAnalyzer, MockChannel, MockPeer, MockSource, Verdict};

fn verdict(id: &str, confidence: u8, has_edge: bool) -> Verdict {
    Verdict {
        market_id: id.to_string(),
        confidence,
        has_edge,
        position: has_edge.then(|| "Yes".to_string()),
    }
}

/// Three markets, one above threshold: one alert, one trade, and a
/// marked heartbeat.
#[tokio::test]
async fn scan_admits_only_confident_edges() {
    let source = MockSource::new(vec![
        market("m1", "Strong edge?", 0.30),
        market("m2", "Weak edge?", 0.50),
        market("m3", "Fairly priced?", 0.60),
    ]);
    let analyzer = MockAnalyzer::new(vec![
        verdict("m1", 9, true),
        verdict("m2", 5, true),
        verdict("m3", 9, false),
    ]);
    let telegram = MockChannel::new("telegram", true);
    let ledger = Arc::new(PaperLedger::new(temp_path()));
    let gate = Arc::new(HeartbeatGate::new(temp_path()));

    let orchestrator = Arc::new(
        ScanOrchestrator::new(analyzer.clone(), ledger.clone(), vec![telegram.clone()], 7)
            .with_pause(Duration::ZERO),
    );
    let scheduler = Scheduler::new(
        source,
        orchestrator,
        gate.clone(),
        10,
        Duration::from_secs(3600),
    );

    let alerts_sent = scheduler.scan_once().await.unwrap();

    assert_eq!(alerts_sent, 1);
    assert_eq!(telegram.delivered_questions(), vec!["Strong edge?"]);
    assert_eq!(
        *analyzer.analyzed.lock().unwrap(),
        vec!["m1", "m2", "m3"]
    );

    let trades = ledger.trades().unwrap();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].id, "m1");
    assert!((trades[0].entry_price - 0.30).abs() < 1e-10);

    assert!(!gate.due(TASK_MARKET_SCAN, 0.5));
}

/// An analyzer outage on one market must not stop the rest of the
/// batch; the broken market simply produces no alert.
#[tokio::test]
async fn analyzer_failure_is_contained_to_one_market() {
    let source = MockSource::new(vec![
        market("m1", "First?", 0.40),
        market("m2", "Broken?", 0.50),
        market("m3", "Third?", 0.25),
    ]);
    // No verdict for m2: the mock analyzer errors on it.
    let analyzer = MockAnalyzer::new(vec![verdict("m1", 8, true), verdict("m3", 8, true)]);
    let telegram = MockChannel::new("telegram", true);
    let ledger = Arc::new(PaperLedger::new(temp_path()));

    let orchestrator = Arc::new(
        ScanOrchestrator::new(analyzer.clone(), ledger.clone(), vec![telegram.clone()], 7)
            .with_pause(Duration::ZERO),
    );
    let scheduler = Scheduler::new(
        source,
        orchestrator,
        Arc::new(HeartbeatGate::new(temp_path())),
        10,
        Duration::from_secs(3600),
    );

    let alerts_sent = scheduler.scan_once().await.unwrap();

    assert_eq!(alerts_sent, 2);
    assert_eq!(analyzer.analyzed.lock().unwrap().len(), 3);
    assert_eq!(telegram.delivered_questions(), vec!["First?", "Third?"]);
    assert_eq!(ledger.trades().unwrap().len(), 2);
}

/// Gamma rows with mismatched outcome and price lists never reach the
/// pipeline; well-formed rows in the same payload still do.
#[test]
fn malformed_gamma_rows_are_rejected_at_parse() {
    let payload = r#"[
        {
            "id": "good",
            "question": "Well formed?",
            "slug": "well-formed",
            "outcomes": "[\"Yes\",\"No\"]",
            "outcomePrices": "[\"0.40\",\"0.60\"]",
            "volume": "5000",
            "liquidity": 1000.0
        },
        {
            "id": "bad",
            "question": "Mismatched lists?",
            "slug": "mismatched",
            "outcomes": "[\"Yes\",\"No\",\"Maybe\"]",
            "outcomePrices": "[\"0.40\",\"0.60\"]",
            "volume": "5000",
            "liquidity": 1000.0
        }
    ]"#;

    let rows: Vec<GammaMarket> = serde_json::from_str(payload).unwrap();
    let markets: Vec<_> = rows
        .into_iter()
        .filter_map(PolymarketClient::convert_market)
        .collect();

    assert_eq!(markets.len(), 1);
    assert_eq!(markets[0].id, "good");
    assert_eq!(markets[0].outcomes.len(), markets[0].outcome_prices.len());
}

/// Re-scanning the same market keeps a single open trade while alerts
/// keep flowing, and peer review DMs go out for each admitted edge.
#[tokio::test]
async fn rescan_is_idempotent_and_peer_is_notified() {
    let source = MockSource::new(vec![market("m1", "Recurring edge?", 0.35)]);
    let analyzer = MockAnalyzer::new(vec![verdict("m1", 9, true)]);
    let telegram = MockChannel::new("telegram", true);
    let moltbook = MockChannel::new("moltbook", false);
    let peer = MockPeer::new();
    let ledger = Arc::new(PaperLedger::new(temp_path()));

    let orchestrator = Arc::new(
        ScanOrchestrator::new(
            analyzer,
            ledger.clone(),
            vec![telegram.clone(), moltbook.clone()],
            7,
        )
        .with_peer("Oracle".to_string(), peer.clone())
        .with_pause(Duration::ZERO),
    );
    let scheduler = Scheduler::new(
        source,
        orchestrator,
        Arc::new(HeartbeatGate::new(temp_path())),
        10,
        Duration::from_secs(3600),
    );

    let first = scheduler.scan_once().await.unwrap();
    let second = scheduler.scan_once().await.unwrap();

    // Primary-only counting: the secondary delivery is not in the total
    assert_eq!(first, 1);
    assert_eq!(second, 1);
    assert_eq!(moltbook.delivered.lock().unwrap().len(), 2);

    // One open trade despite two scans
    let trades = ledger.trades().unwrap();
    assert_eq!(trades.len(), 1);
    assert!(trades[0].is_open());

    let messages = peer.messages.lock().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].0, "Oracle");
    assert!(messages[0].1.contains("Recurring edge?"));
    assert!(messages[0].1.contains("9/10"));
}

/// A primary channel outage still records the trade and still posts
/// to the secondary, but the scan reports zero alerts sent.
#[tokio::test]
async fn primary_outage_reports_zero_alerts() {
    let source = MockSource::new(vec![market("m1", "Edge?", 0.45)]);
    let analyzer = MockAnalyzer::new(vec![verdict("m1", 8, true)]);
    let telegram = MockChannel::new("telegram", true);
    telegram.set_error("simulated telegram outage");
    let moltbook = MockChannel::new("moltbook", false);
    let ledger = Arc::new(PaperLedger::new(temp_path()));

    let orchestrator = Arc::new(
        ScanOrchestrator::new(
            analyzer,
            ledger.clone(),
            vec![telegram.clone(), moltbook.clone()],
            7,
        )
        .with_pause(Duration::ZERO),
    );
    let scheduler = Scheduler::new(
        source,
        orchestrator,
        Arc::new(HeartbeatGate::new(temp_path())),
        10,
        Duration::from_secs(3600),
    );

    let alerts_sent = scheduler.scan_once().await.unwrap();

    assert_eq!(alerts_sent, 0);
    assert_eq!(moltbook.delivered.lock().unwrap().len(), 1);
    assert_eq!(ledger.trades().unwrap().len(), 1);
}

/// A dead market source fails the scan without marking the heartbeat.
#[tokio::test]
async fn source_outage_fails_scan_cleanly() {
    let source = MockSource::new(vec![market("m1", "Edge?", 0.45)]);
    source.set_error("simulated gamma outage");
    let analyzer = MockAnalyzer::new(vec![]);
    let gate = Arc::new(HeartbeatGate::new(temp_path()));

    let orchestrator = Arc::new(
        ScanOrchestrator::new(
            analyzer.clone(),
            Arc::new(PaperLedger::new(temp_path())),
            vec![],
            7,
        )
        .with_pause(Duration::ZERO),
    );
    let scheduler = Scheduler::new(source, orchestrator, gate.clone(), 10, Duration::from_secs(3600));

    assert!(scheduler.scan_once().await.is_err());
    assert!(analyzer.analyzed.lock().unwrap().is_empty());
    assert!(gate.due(TASK_MARKET_SCAN, 1.0));
}
