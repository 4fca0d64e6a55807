use chrono::{Duration, TimeZone, Utc};
use kdp_ledger::*;
use std::sync::Arc;

fn config_with_pages(limit: u64) -> LedgerConfig {
    let mut config = LedgerConfig::default();
    config.limits.free.pages = limit;
    config
}

fn ledger_with_store(config: LedgerConfig) -> (Arc<MemoryLedgerStore>, Ledger) {
    let store = Arc::new(MemoryLedgerStore::new());
    let ledger = Ledger::new(store.clone(), config).unwrap();
    (store, ledger)
}

// =============================================================================
// Quota
// =============================================================================

#[tokio::test]
async fn test_reserve_within_limit() {
    let ledger = Ledger::in_memory(config_with_pages(100)).unwrap();

    let r = ledger
        .quota
        .check_and_reserve("org", Metric::Pages, 30, PlanTier::Free)
        .await
        .unwrap();
    assert_eq!(
        r,
        Reservation {
            allowed: true,
            used: 30,
            limit: 100
        }
    );
    assert_eq!(ledger.quota.usage("org", Metric::Pages).await.unwrap(), 30);
}

#[tokio::test]
async fn test_rejection_leaves_counter_unchanged() {
    let ledger = Ledger::in_memory(config_with_pages(100)).unwrap();
    ledger
        .quota
        .check_and_reserve("org", Metric::Pages, 90, PlanTier::Free)
        .await
        .unwrap();

    let r = ledger
        .quota
        .check_and_reserve("org", Metric::Pages, 11, PlanTier::Free)
        .await
        .unwrap();
    assert!(!r.allowed);
    assert_eq!(r.used, 90);
    assert_eq!(ledger.quota.usage("org", Metric::Pages).await.unwrap(), 90);

    // Exactly filling the limit is fine
    let r = ledger
        .quota
        .check_and_reserve("org", Metric::Pages, 10, PlanTier::Free)
        .await
        .unwrap();
    assert!(r.allowed);
    assert_eq!(r.used, 100);
}

#[tokio::test]
async fn test_zero_amount_is_a_read() {
    let ledger = Ledger::in_memory(config_with_pages(100)).unwrap();
    let r = ledger
        .quota
        .check_and_reserve("org", Metric::Pages, 0, PlanTier::Free)
        .await
        .unwrap();
    assert!(r.allowed);
    assert_eq!(r.used, 0);
}

#[tokio::test]
async fn test_reserve_maps_rejection_to_error() {
    let ledger = Ledger::in_memory(config_with_pages(10)).unwrap();
    let err = ledger
        .quota
        .reserve("org", Metric::Pages, 11, PlanTier::Free)
        .await
        .unwrap_err();
    match err {
        LedgerError::QuotaExceeded {
            metric,
            used,
            limit,
            requested,
        } => {
            assert_eq!(metric, Metric::Pages);
            assert_eq!((used, limit, requested), (0, 10, 11));
        }
        other => panic!("Expected QuotaExceeded, got {other:?}"),
    }
}

#[tokio::test]
async fn test_counters_are_per_period_and_tier() {
    let ledger = Ledger::in_memory(LedgerConfig::default()).unwrap();
    let march = Utc.with_ymd_and_hms(2025, 3, 31, 23, 0, 0).unwrap();
    let april = march + Duration::hours(2);

    ledger
        .quota
        .check_and_reserve_at("org", Metric::Images, 120, PlanTier::Free, march)
        .await
        .unwrap();
    let r = ledger
        .quota
        .check_and_reserve_at("org", Metric::Images, 1, PlanTier::Free, march)
        .await
        .unwrap();
    assert!(!r.allowed);

    // A new month starts from zero
    let r = ledger
        .quota
        .check_and_reserve_at("org", Metric::Images, 1, PlanTier::Free, april)
        .await
        .unwrap();
    assert!(r.allowed);
    assert_eq!(r.used, 1);

    // A higher tier sees the same counter against a larger limit
    let r = ledger
        .quota
        .check_and_reserve_at("org", Metric::Images, 1, PlanTier::Pro, march)
        .await
        .unwrap();
    assert!(r.allowed);
    assert_eq!(r.limit, 5_000);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_reservations_never_overallocate() {
    const LIMIT: u64 = 100;
    const N: u64 = 10;
    let amount = LIMIT / N + 1;

    let ledger = Ledger::in_memory(config_with_pages(LIMIT)).unwrap();

    let mut handles = Vec::new();
    for _ in 0..N {
        let ledger = ledger.clone();
        handles.push(tokio::spawn(async move {
            ledger
                .quota
                .check_and_reserve("org", Metric::Pages, amount, PlanTier::Free)
                .await
                .unwrap()
                .allowed
        }));
    }

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap() {
            successes += 1;
        }
    }

    assert!(successes <= N - 1, "{successes} reservations succeeded");
    let used = ledger.quota.usage("org", Metric::Pages).await.unwrap();
    assert_eq!(used, successes * amount);
    assert!(used <= LIMIT);
}

// =============================================================================
// Daily cost caps
// =============================================================================

#[tokio::test]
async fn test_user_cap() {
    let ledger = Ledger::in_memory(LedgerConfig::default()).unwrap();
    ledger.costs.record_cost("alice", 150).await.unwrap();

    assert!(ledger.costs.assert_daily_cost_cap("alice", 50).await.is_ok());
    let err = ledger
        .costs
        .assert_daily_cost_cap("alice", 51)
        .await
        .unwrap_err();
    match err {
        LedgerError::DailyCapExceeded {
            scope,
            committed,
            estimate,
            cap,
        } => {
            assert_eq!(scope, CapScope::User);
            assert_eq!((committed, estimate, cap), (150, 51, 200));
        }
        other => panic!("Expected DailyCapExceeded, got {other:?}"),
    }

    // Other users are unaffected
    assert!(ledger.costs.assert_daily_cost_cap("bob", 51).await.is_ok());
}

#[tokio::test]
async fn test_global_cap() {
    let mut config = LedgerConfig::default();
    config.caps.user_daily_cents = 100;
    config.caps.global_daily_cents = 250;
    let ledger = Ledger::in_memory(config).unwrap();

    ledger.costs.record_cost("a", 100).await.unwrap();
    ledger.costs.record_cost("b", 100).await.unwrap();

    let err = ledger
        .costs
        .assert_daily_cost_cap("c", 60)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::DailyCapExceeded {
            scope: CapScope::Global,
            ..
        }
    ));
}

#[tokio::test]
async fn test_huge_estimate_does_not_wrap_past_cap() {
    let ledger = Ledger::in_memory(LedgerConfig::default()).unwrap();
    ledger.costs.record_cost("alice", 150).await.unwrap();

    let err = ledger
        .costs
        .assert_daily_cost_cap("alice", u64::MAX)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::DailyCapExceeded {
            scope: CapScope::User,
            committed: 150,
            ..
        }
    ));
}

#[tokio::test]
async fn test_cost_cap_fails_closed() {
    let (store, ledger) = ledger_with_store(LedgerConfig::default());
    store.disable_namespace("cost").await;

    let err = ledger
        .costs
        .assert_daily_cost_cap("alice", 1)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::Store(StoreError::Unavailable(_))
    ));
}

// =============================================================================
// Wallet
// =============================================================================

#[tokio::test]
async fn test_wallet_consume() {
    let ledger = Ledger::in_memory(LedgerConfig::default()).unwrap();
    ledger.wallet.credit("alice", 500).await.unwrap();

    ledger.wallet.consume("alice", 200).await.unwrap();
    assert_eq!(ledger.wallet.balance("alice").await.unwrap(), 300);

    let err = ledger.wallet.consume("alice", 301).await.unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InsufficientCredits {
            balance: 300,
            required: 301
        }
    ));
    assert_eq!(ledger.wallet.balance("alice").await.unwrap(), 300);
}

#[tokio::test]
async fn test_empty_wallet_is_insufficient() {
    let ledger = Ledger::in_memory(LedgerConfig::default()).unwrap();
    let err = ledger.wallet.consume("nobody", 1).await.unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientCredits { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_wallet_never_goes_negative() {
    let ledger = Ledger::in_memory(LedgerConfig::default()).unwrap();
    ledger.wallet.credit("alice", 100).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let ledger = ledger.clone();
        handles.push(tokio::spawn(async move {
            ledger.wallet.consume("alice", 30).await.is_ok()
        }));
    }

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap() {
            successes += 1;
        }
    }

    let balance = ledger.wallet.balance("alice").await.unwrap();
    assert!(balance >= 0);
    assert_eq!(balance, 100 - 30 * successes);
}

#[tokio::test]
async fn test_missing_wallet_storage_fails_open() {
    let (store, ledger) = ledger_with_store(LedgerConfig::default());
    store.disable_namespace("wallet").await;
    assert!(ledger.wallet.consume("alice", 1_000).await.is_ok());
}

#[tokio::test]
async fn test_missing_wallet_storage_can_fail_closed() {
    let mut config = LedgerConfig::default();
    config.flags.wallet_fail_open = false;
    let (store, ledger) = ledger_with_store(config);
    store.disable_namespace("wallet").await;
    assert!(ledger.wallet.consume("alice", 1).await.is_err());
}

// =============================================================================
// Usage history
// =============================================================================

#[tokio::test]
async fn test_usage_history_is_bounded() {
    let ledger = Ledger::in_memory(LedgerConfig::default()).unwrap();
    let at = Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap();

    for i in 0..(USAGE_HISTORY_CAPACITY as u64 + 5) {
        ledger
            .usage
            .record_usage_event_at("org", Metric::Tokens, i, at)
            .await
            .unwrap();
    }

    let trend = ledger
        .usage
        .trend_at("org", Metric::Tokens, at)
        .await
        .unwrap();
    assert_eq!(trend.len(), USAGE_HISTORY_CAPACITY);
    assert_eq!(trend[0].amount, 5);
    assert_eq!(
        trend.last().map(|e| e.amount),
        Some(USAGE_HISTORY_CAPACITY as u64 + 4)
    );
}

#[tokio::test]
async fn test_missing_usage_storage_fails_open() {
    let (store, ledger) = ledger_with_store(LedgerConfig::default());
    store.disable_namespace("usage").await;

    assert!(
        ledger
            .usage
            .record_usage_event("org", Metric::Pages, 24)
            .await
            .is_ok()
    );
    assert!(ledger.usage.trend("org", Metric::Pages).await.unwrap().is_empty());
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_config_validation() {
    assert!(LedgerConfig::default().validate().is_ok());

    let mut config = LedgerConfig::default();
    config.caps.warn_ratio = 1.5;
    assert!(matches!(config.validate(), Err(LedgerError::Config(_))));

    let mut config = LedgerConfig::default();
    config.caps.user_daily_cents = 5_000;
    assert!(config.validate().is_err());
}

#[test]
fn test_config_json_defaults() {
    let config: LedgerConfig =
        serde_json::from_str(r#"{"caps": {"userDailyCents": 500}}"#).unwrap();
    assert_eq!(config.caps.user_daily_cents, 500);
    assert_eq!(config.caps.global_daily_cents, 4_000);
    assert!(config.flags.wallet_fail_open);
    assert_eq!(config.limits.limit(PlanTier::Starter, Metric::Regens), 50);
}

#[test]
fn test_price_estimate() {
    let prices = Prices::default();
    // 27 images, 2500 tokens rounds up to 3k, plus one assembly
    assert_eq!(prices.estimate(27, 2_500), 27 * 4 + 3 + 1);
}

#[test]
fn test_price_estimate_saturates() {
    let prices = Prices::default();
    assert_eq!(prices.estimate(u64::MAX, 0), u64::MAX);

    let pricey = Prices {
        per_1k_tokens_cents: u64::MAX,
        ..Prices::default()
    };
    assert_eq!(pricey.estimate(0, 2_000), u64::MAX);
}

#[test]
fn test_plan_tier_parse() {
    assert_eq!("PRO".parse::<PlanTier>().unwrap(), PlanTier::Pro);
    assert!("platinum".parse::<PlanTier>().is_err());
}
