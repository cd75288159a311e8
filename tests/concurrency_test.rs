mod common;

use common::{harness, small_config};
use logsync_client::{LogSyncRequest, LogSyncResponse, LogUploadConfig};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

#[test]
fn test_concurrent_producers_lose_nothing() {
    let h = harness(LogUploadConfig {
        batch_volume: 1024,
        volume_threshold: 512,
        maximum_allowed_volume: 16 * 1024 * 1024,
        ..small_config()
    });

    let producers: Vec<_> = (0..8)
        .map(|producer| {
            let collector = Arc::clone(&h.collector);
            thread::spawn(move || {
                for i in 0..500 {
                    collector
                        .add_record(format!("{producer:02}-{i:04}"))
                        .unwrap();
                }
            })
        })
        .collect();

    for producer in producers {
        producer.join().unwrap();
    }

    let snapshot = h.collector.stats().snapshot();
    assert_eq!(snapshot.records_added, 4000);
    assert_eq!(h.collector.storage_snapshot().record_count, 4000);
}

#[test]
fn test_producers_and_transport_interleave() {
    let h = harness(LogUploadConfig {
        batch_volume: 256,
        volume_threshold: 64,
        maximum_allowed_volume: 16 * 1024 * 1024,
        ..small_config()
    });
    let done = Arc::new(AtomicBool::new(false));

    let transport = {
        let collector = Arc::clone(&h.collector);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut delivered = 0usize;
            loop {
                // Read before draining: an empty drain after producers finished means nothing is left.
                let producers_finished = done.load(Ordering::SeqCst);
                let mut request = LogSyncRequest::new();
                collector.fill_sync_request(&mut request);
                match request.request_id {
                    Some(id) if !request.is_empty() => {
                        delivered += request.log_entries.len();
                        collector.on_response(LogSyncResponse::success(id));
                    }
                    _ if producers_finished => break,
                    _ => thread::yield_now(),
                }
            }
            delivered
        })
    };

    let producers: Vec<_> = (0..4)
        .map(|producer| {
            let collector = Arc::clone(&h.collector);
            thread::spawn(move || {
                for i in 0..1000 {
                    collector.add_record(format!("p{producer}-{i}")).unwrap();
                }
            })
        })
        .collect();

    for producer in producers {
        producer.join().unwrap();
    }
    done.store(true, Ordering::SeqCst);

    let delivered = transport.join().unwrap();

    assert_eq!(delivered, 4000);
    assert!(h.collector.in_flight_blocks().is_empty());
    assert_eq!(h.collector.storage_snapshot().record_count, 0);
}

#[test]
fn test_per_producer_order_within_blocks() {
    let h = harness(LogUploadConfig {
        batch_volume: 64 * 1024,
        volume_threshold: 64 * 1024,
        maximum_allowed_volume: 16 * 1024 * 1024,
        ..small_config()
    });

    let producers: Vec<_> = (0..4)
        .map(|producer| {
            let collector = Arc::clone(&h.collector);
            thread::spawn(move || {
                for i in 0..200 {
                    collector.add_record(format!("{producer}:{i}")).unwrap();
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    let mut request = LogSyncRequest::new();
    h.collector.fill_sync_request(&mut request);

    let mut last_seen = [None::<u32>; 4];
    for entry in &request.log_entries {
        let text = std::str::from_utf8(entry).unwrap();
        let (producer, index) = text.split_once(':').unwrap();
        let producer: usize = producer.parse().unwrap();
        let index: u32 = index.parse().unwrap();
        if let Some(previous) = last_seen[producer] {
            assert!(index > previous);
        }
        last_seen[producer] = Some(index);
    }
    assert_eq!(request.log_entries.len(), 800);
}
