//! Integration tests for signal dispatch
//!
//! These tests verify:
//! - Duplicate registrations collapse to one
//! - Sender filtering and wildcard receivers
//! - Failure and panic isolation between receivers
//! - Weak receivers disappear when dropped, strong ones do not
//! - Concurrent sends on a cold cache, and sends racing a connect

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use keygate_signal::{fn_receiver, ConnectOptions, Receiver, SenderId, Signal, SignalError};

struct Store;
struct Cache;

/// Receiver that counts invocations and echoes the payload
struct Counter {
    calls: AtomicUsize,
}

impl Counter {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Receiver<u32, u32> for Counter {
    async fn receive(&self, _sender: &SenderId, payload: Arc<u32>) -> anyhow::Result<u32> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(*payload)
    }
}

fn both_signals() -> [Signal<u32, u32>; 2] {
    [Signal::new(), Signal::with_caching()]
}

// ============================================================================
// Registration
// ============================================================================

#[tokio::test]
async fn test_duplicate_connect_registers_once() {
    for signal in both_signals() {
        let counter = Counter::new();
        let options = ConnectOptions::new().sender(SenderId::of::<Store>());

        assert!(signal.connect(counter.clone(), options.clone()).await);
        assert!(!signal.connect(counter.clone(), options).await);
        assert_eq!(signal.receiver_count().await, 1);

        let responses = signal.send(&SenderId::of::<Store>(), 7).await;
        assert_eq!(responses.len(), 1);
        assert_eq!(counter.calls(), 1);
    }
}

#[tokio::test]
async fn test_dispatch_uid_deduplicates_distinct_receivers() {
    let signal: Signal<u32, u32> = Signal::new();
    let first = Counter::new();
    let second = Counter::new();
    let options = ConnectOptions::new().dispatch_uid("store_close");

    assert!(signal.connect(first.clone(), options.clone()).await);
    assert!(!signal.connect(second.clone(), options).await);

    signal.send(&SenderId::of::<Store>(), 1).await;
    assert_eq!(first.calls(), 1);
    assert_eq!(second.calls(), 0);
}

#[tokio::test]
async fn test_same_receiver_for_two_senders_is_two_registrations() {
    let signal: Signal<u32, u32> = Signal::new();
    let counter = Counter::new();

    signal
        .connect(counter.clone(), ConnectOptions::new().sender(SenderId::of::<Store>()))
        .await;
    signal
        .connect(counter.clone(), ConnectOptions::new().sender(SenderId::of::<Cache>()))
        .await;

    assert_eq!(signal.receiver_count().await, 2);
}

#[tokio::test]
async fn test_disconnect_by_receiver_and_uid() {
    for signal in both_signals() {
        let by_identity = Counter::new();
        let by_uid = Counter::new();
        let store = SenderId::of::<Store>();

        signal
            .connect(by_identity.clone(), ConnectOptions::new().sender(store.clone()))
            .await;
        signal
            .connect(
                by_uid.clone(),
                ConnectOptions::new().sender(store.clone()).dispatch_uid("uid"),
            )
            .await;
        assert!(signal.has_listeners(&store).await);

        assert!(signal.disconnect(&by_identity, Some(&store)).await);
        assert!(!signal.disconnect(&by_identity, Some(&store)).await);
        assert!(signal.disconnect_uid("uid", Some(&store)).await);

        assert!(!signal.has_listeners(&store).await);
        assert!(signal.send(&store, 1).await.is_empty());
    }
}

#[tokio::test]
async fn test_disconnect_requires_matching_sender() {
    let signal: Signal<u32, u32> = Signal::new();
    let counter = Counter::new();
    signal
        .connect(counter.clone(), ConnectOptions::new().sender(SenderId::of::<Store>()))
        .await;

    assert!(!signal.disconnect(&counter, None).await);
    assert!(!signal.disconnect(&counter, Some(&SenderId::of::<Cache>())).await);
    assert_eq!(signal.receiver_count().await, 1);
}

// ============================================================================
// Sender resolution
// ============================================================================

#[tokio::test]
async fn test_wildcard_receiver_matches_every_sender() {
    for signal in both_signals() {
        let wildcard = Counter::new();
        let store_only = Counter::new();

        signal.connect(wildcard.clone(), ConnectOptions::new()).await;
        signal
            .connect(store_only.clone(), ConnectOptions::new().sender(SenderId::of::<Store>()))
            .await;

        assert_eq!(signal.send(&SenderId::of::<Store>(), 1).await.len(), 2);
        assert_eq!(signal.send(&SenderId::of::<Cache>(), 1).await.len(), 1);
        assert_eq!(signal.send(&SenderId::named("anything"), 1).await.len(), 1);

        assert_eq!(wildcard.calls(), 3);
        assert_eq!(store_only.calls(), 1);
    }
}

#[tokio::test]
async fn test_responses_follow_registration_order() {
    let signal: Signal<u32, u32> = Signal::new();
    let mut receivers = Vec::new();
    for offset in 0..5u32 {
        let receiver: Arc<dyn Receiver<u32, u32>> =
            fn_receiver(move |_sender, payload: Arc<u32>| async move {
                // Later receivers finish first
                tokio::time::sleep(Duration::from_millis(u64::from(5 - offset) * 5)).await;
                Ok::<_, anyhow::Error>(*payload + offset)
            });
        signal.connect(receiver.clone(), ConnectOptions::new()).await;
        receivers.push(receiver);
    }

    let values: Vec<u32> = signal
        .send(&SenderId::named("ordered"), 10)
        .await
        .into_iter()
        .map(|(_, result)| result.unwrap())
        .collect();
    assert_eq!(values, vec![10, 11, 12, 13, 14]);
}

#[tokio::test]
async fn test_receivers_run_concurrently() {
    let signal: Signal<u32, u32> = Signal::new();
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let mut receivers = Vec::new();

    for _ in 0..3 {
        let in_flight = Arc::clone(&in_flight);
        let peak = Arc::clone(&peak);
        let receiver: Arc<dyn Receiver<u32, u32>> = fn_receiver(move |_sender, _payload| {
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, anyhow::Error>(0)
            }
        });
        signal.connect(receiver.clone(), ConnectOptions::new()).await;
        receivers.push(receiver);
    }

    signal.send(&SenderId::named("fan-out"), 0).await;
    assert_eq!(peak.load(Ordering::SeqCst), 3);
}

// ============================================================================
// Failure isolation
// ============================================================================

#[tokio::test]
async fn test_failing_receiver_does_not_block_others() {
    for signal in both_signals() {
        let failing: Arc<dyn Receiver<u32, u32>> =
            fn_receiver(|_sender, _payload| async { Err::<u32, _>(anyhow::anyhow!("connection reset")) });
        let healthy = Counter::new();

        signal.connect(failing.clone(), ConnectOptions::new()).await;
        signal.connect(healthy.clone(), ConnectOptions::new()).await;

        let responses = signal.send(&SenderId::of::<Store>(), 42).await;
        assert_eq!(responses.len(), 2);

        match &responses[0].1 {
            Err(SignalError::Failed(err)) => assert!(err.to_string().contains("connection reset")),
            other => panic!("Expected Failed, got: {:?}", other),
        }
        assert_eq!(responses[1].1.as_ref().unwrap(), &42);
        assert_eq!(healthy.calls(), 1);
    }
}

#[tokio::test]
async fn test_panicking_receiver_is_captured() {
    let signal: Signal<u32, u32> = Signal::new();
    let panicking: Arc<dyn Receiver<u32, u32>> = fn_receiver(|_sender, _payload| async {
        if true {
            panic!("receiver exploded");
        }
        Ok::<u32, anyhow::Error>(0)
    });
    let healthy = Counter::new();

    signal.connect(panicking.clone(), ConnectOptions::new()).await;
    signal.connect(healthy.clone(), ConnectOptions::new()).await;

    let responses = signal.send(&SenderId::of::<Store>(), 1).await;
    match &responses[0].1 {
        Err(SignalError::Panicked(message)) => assert!(message.contains("receiver exploded")),
        other => panic!("Expected Panicked, got: {:?}", other),
    }
    assert!(responses[1].1.is_ok());
}

#[tokio::test]
async fn test_response_carries_the_receiver() {
    let signal: Signal<u32, u32> = Signal::new();
    let counter = Counter::new();
    signal.connect(counter.clone(), ConnectOptions::new()).await;

    let responses = signal.send(&SenderId::of::<Store>(), 3).await;
    let expected: Arc<dyn Receiver<u32, u32>> = counter.clone();
    assert!(Arc::ptr_eq(&responses[0].0, &expected));
}

// ============================================================================
// Weak and strong references
// ============================================================================

#[tokio::test]
async fn test_dropped_weak_receiver_is_not_invoked() {
    for signal in both_signals() {
        let counter = Counter::new();
        let observer = Arc::clone(&counter);
        signal.connect(counter, ConnectOptions::new()).await;

        let sender = SenderId::of::<Store>();
        assert!(signal.has_listeners(&sender).await);
        signal.send(&sender, 1).await;
        assert_eq!(observer.calls(), 1);

        let weak = Arc::downgrade(&observer);
        drop(observer);
        assert!(weak.upgrade().is_none());

        assert!(signal.send(&sender, 1).await.is_empty());
        assert!(!signal.has_listeners(&sender).await);
        assert_eq!(signal.receiver_count().await, 0);
    }
}

#[tokio::test]
async fn test_strong_receiver_outlives_caller_handle() {
    let signal: Signal<u32, u32> = Signal::with_caching();
    let calls = Arc::new(AtomicUsize::new(0));
    {
        let calls = Arc::clone(&calls);
        let receiver: Arc<dyn Receiver<u32, u32>> = fn_receiver(move |_sender, _payload| {
            let calls = Arc::clone(&calls);
            async move { Ok::<_, anyhow::Error>(calls.fetch_add(1, Ordering::SeqCst) as u32) }
        });
        signal
            .connect(receiver, ConnectOptions::new().strong().dispatch_uid("kept"))
            .await;
    }

    let sender = SenderId::of::<Store>();
    assert!(signal.has_listeners(&sender).await);
    assert_eq!(signal.send(&sender, 0).await.len(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_new_receiver_registers_after_dead_one() {
    let signal: Signal<u32, u32> = Signal::new();
    let first = Counter::new();
    signal.connect(first.clone(), ConnectOptions::new()).await;
    drop(first);

    // A fresh allocation may reuse the dead receiver's address
    let second = Counter::new();
    assert!(signal.connect(second.clone(), ConnectOptions::new()).await);
    signal.send(&SenderId::of::<Store>(), 1).await;
    assert_eq!(second.calls(), 1);
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sends_on_cold_cache() {
    for _ in 0..50 {
        let signal: Arc<Signal<u32, u32>> = Arc::new(Signal::with_caching());
        let first = Counter::new();
        signal
            .connect(first.clone(), ConnectOptions::new().sender(SenderId::of::<Store>()))
            .await;

        let sends: Vec<_> = (0..8)
            .map(|i| {
                let signal = Arc::clone(&signal);
                tokio::spawn(async move { signal.send(&SenderId::of::<Store>(), i).await.len() })
            })
            .collect();
        for send in sends {
            assert_eq!(send.await.unwrap(), 1);
        }
        assert_eq!(first.calls(), 8);

        // Sends racing a connect see either the old or the new receiver set
        let racing: Vec<_> = (0..8)
            .map(|i| {
                let signal = Arc::clone(&signal);
                tokio::spawn(async move { signal.send(&SenderId::of::<Store>(), i).await.len() })
            })
            .collect();
        let late = Counter::new();
        signal
            .connect(late.clone(), ConnectOptions::new().sender(SenderId::of::<Store>()))
            .await;
        for send in racing {
            let len = send.await.unwrap();
            assert!(len == 1 || len == 2, "unexpected response count {len}");
        }

        // Once connect has returned no stale cache entry may hide the new receiver
        let responses = signal.send(&SenderId::of::<Store>(), 0).await;
        assert_eq!(responses.len(), 2);
        assert!(late.calls() >= 1);
        assert_eq!(first.calls(), 8 + 8 + 1);
    }
}
