use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::*;

fn items(n: usize) -> Vec<Item> {
    (0..n)
        .map(|i| Item::new(Some(&format!("SKU-{i}")), None).unwrap())
        .collect()
}

#[tokio::test]
async fn never_exceeds_concurrency_limit() {
    let batch = items(12);
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let scheduler = Scheduler::new(3);

    let results = scheduler
        .run_batch(&batch, |item| {
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                ScrapeResult::for_item(item)
            }
        })
        .await;

    assert_eq!(results.len(), 12);
    assert!(peak.load(Ordering::SeqCst) <= 3, "peak = {}", peak.load(Ordering::SeqCst));
    assert!(peak.load(Ordering::SeqCst) >= 2, "batch never ran concurrently");
}

#[tokio::test]
async fn preserves_input_order_when_completion_is_reversed() {
    let batch = items(5);
    let scheduler = Scheduler::new(5);

    let results = scheduler
        .run_batch(&batch, |item| async move {
            let index: u64 = item.sku.as_deref().unwrap()[4..].parse().unwrap();
            tokio::time::sleep(Duration::from_millis(10 * (5 - index))).await;
            if index == 2 {
                ScrapeResult::failed(item, "boom")
            } else {
                ScrapeResult::for_item(item)
            }
        })
        .await;

    let skus: Vec<&str> = results.iter().map(|r| r.sku.as_deref().unwrap()).collect();
    assert_eq!(skus, vec!["SKU-0", "SKU-1", "SKU-2", "SKU-3", "SKU-4"]);
    assert!(results[2].is_error());
    assert_eq!(results.iter().filter(|r| r.is_error()).count(), 1);
}

#[tokio::test]
async fn timeout_fails_only_the_slow_item() {
    let batch = items(3);
    let scheduler = Scheduler::new(3).with_item_timeout(Duration::from_millis(100));

    let results = scheduler
        .run_batch(&batch, |item| async move {
            if item.sku.as_deref() == Some("SKU-1") {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            ScrapeResult::for_item(item)
        })
        .await;

    assert_eq!(results.len(), 3);
    assert!(!results[0].is_error());
    assert!(results[1]
        .error
        .as_deref()
        .is_some_and(|e| e.contains("timed out")));
    assert!(!results[2].is_error());
}

#[tokio::test]
async fn empty_batch_yields_no_results() {
    let results = Scheduler::new(3)
        .run_batch(&[], |item| async move { ScrapeResult::for_item(item) })
        .await;
    assert!(results.is_empty());
}

#[test]
fn concurrency_is_clamped() {
    assert_eq!(Scheduler::new(0).concurrency(), 1);
    assert_eq!(Scheduler::new(50).concurrency(), 10);
    assert_eq!(Scheduler::new(4).concurrency(), 4);
}

fn assert_send<T: Send>(_: &T) {}

#[test]
fn batch_future_is_send() {
    let batch = items(2);
    let scheduler = Scheduler::new(2);
    let fut = scheduler.run_batch(&batch, |item| async move { ScrapeResult::for_item(item) });
    assert_send(&fut);
}

#[tokio::test]
async fn spawned_batch_completes() {
    let handle = tokio::spawn(async move {
        let batch = items(4);
        Scheduler::new(2)
            .run_batch(&batch, |item| async move { ScrapeResult::for_item(item) })
            .await
    });
    let results = handle.await.unwrap();
    assert_eq!(results.len(), 4);
}
