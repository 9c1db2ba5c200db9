//! Engine state survives a restart through the JSON trade store.

#![allow(clippy::expect_used, clippy::unwrap_used)]

mod common;

use std::sync::Arc;

use rust_decimal_macros::dec;
use tokio_util::sync::CancellationToken;

use common::{Harness, eventually, long_signal, market_morning};
use intraday_engine::application::ports::TradeStore;
use intraday_engine::domain::order_execution::{OrderLeg, TradeState};
use intraday_engine::infrastructure::persistence::JsonTradeStore;

#[tokio::test]
async fn restarted_engine_resumes_tracking_open_trade() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonTradeStore::new(dir.path()));
    let h = Harness::new(store.clone()).await;

    let (engine, handle) = h.builder.build().await.unwrap();
    let task = engine.spawn(CancellationToken::new());
    handle.add_signal(long_signal()).await.unwrap();
    h.subscribed("INFY").await;
    h.quote("INFY", dec!(100.10));
    let handle_ref = &handle;
    eventually("entry placement", || async move {
        handle_ref.snapshot().await.unwrap().trades.len() == 1
    })
    .await;
    h.quote("INFY", dec!(100));
    eventually("protective legs", || async move {
        handle_ref.snapshot().await.unwrap().trades[0].target_order.is_some()
    })
    .await;
    handle.stop(false).await.unwrap();
    task.await.unwrap();

    let today = h.builder.settings().session.trading_date(market_morning());
    assert!(store.trades_path(today).exists());
    assert!(store.signals_path(today).exists());
    let saved = store.load(today).await.unwrap();
    assert_eq!(saved.trades.len(), 1);
    assert!(saved.trades[0].is_active());
    assert!(saved.signals[0].is_triggered);

    let (engine, handle) = h.builder.build().await.unwrap();
    let task = engine.spawn(CancellationToken::new());
    let restored = handle.snapshot().await.unwrap();
    let (before, after) = (&saved.trades[0], &restored.trades[0]);
    assert_eq!(after.id, before.id);
    assert_eq!(after.entry, before.entry);
    assert_eq!(after.filled_quantity, before.filled_quantity);
    assert_eq!(after.entry_order, before.entry_order);
    let leg_id = |leg: &Option<OrderLeg>| leg.as_ref().map(|leg| leg.order_id.clone());
    assert!(leg_id(&before.sl_order).is_some());
    assert_eq!(leg_id(&after.sl_order), leg_id(&before.sl_order));
    assert_eq!(leg_id(&after.target_order), leg_id(&before.target_order));
    assert_eq!(restored.signals, saved.signals);
    assert!(!restored.signals[0].order_placement_in_progress);

    h.subscribed("INFY").await;
    h.quote("INFY", dec!(110));
    let handle_ref = &handle;
    eventually("target exit after restart", || async move {
        handle_ref.snapshot().await.unwrap().trades[0].state() == TradeState::TargetHit
    })
    .await;

    handle.stop(false).await.unwrap();
    task.await.unwrap();
    let saved = store.load(today).await.unwrap();
    assert_eq!(saved.trades[0].state(), TradeState::TargetHit);
}
