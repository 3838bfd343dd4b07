//! Tests for the Appender
//!
//! These tests verify:
//! - Placement plans (first slot, next slot, region crossing, wraparound)
//! - Exactly which regions are erased and when
//! - Payload size checks happen before any medium access
//! - Medium failures during append
//! - Recovery from appends interrupted inside or after the slot header

use circstore::append::{AppendPlan, Appender};
use circstore::config::Config;
use circstore::layout::Layout;
use circstore::medium::{Fault, MemFlash};
use circstore::slot::{encode_slot, HEADER_SIZE};
use circstore::{CircError, CircStore};

// =============================================================================
// Helper Functions
// =============================================================================

fn small_config(flash_start: u32) -> Config {
    Config::builder()
        .flash_start(flash_start)
        .region_size(128)
        .slot_size(32)
        .region_count(2)
        .build()
}

fn setup_store(appends: u32) -> CircStore<MemFlash> {
    let config = small_config(0);
    let mut store = CircStore::open(config, MemFlash::for_config(&config)).unwrap();
    for i in 1..=appends {
        store.append(&(i as u16).to_le_bytes()).unwrap();
    }
    store
}

fn plan(store: &mut CircStore<MemFlash>) -> AppendPlan {
    let layout: Layout = *store.layout();
    Appender::new(&layout, store.medium_mut()).plan().unwrap()
}

// =============================================================================
// Plan Tests
// =============================================================================

#[test]
fn test_plan_on_empty_store() {
    let mut store = setup_store(0);

    assert_eq!(
        plan(&mut store),
        AppendPlan {
            address: 0,
            log_index: 1,
            erase: Some(0),
            wrapped: false,
            skipped: 0,
        }
    );
}

#[test]
fn test_plan_next_slot_in_region() {
    let mut store = setup_store(1);

    assert_eq!(
        plan(&mut store),
        AppendPlan {
            address: 32,
            log_index: 2,
            erase: None,
            wrapped: false,
            skipped: 0,
        }
    );
}

#[test]
fn test_plan_crossing_into_next_region() {
    let mut store = setup_store(4);

    assert_eq!(
        plan(&mut store),
        AppendPlan {
            address: 128,
            log_index: 5,
            erase: Some(128),
            wrapped: false,
            skipped: 0,
        }
    );
}

#[test]
fn test_plan_wraparound() {
    let mut store = setup_store(8);

    assert_eq!(
        plan(&mut store),
        AppendPlan {
            address: 0,
            log_index: 9,
            erase: Some(0),
            wrapped: true,
            skipped: 0,
        }
    );
}

#[test]
fn test_plan_does_not_write() {
    let mut store = setup_store(4);
    store.medium_mut().reset_stats();

    plan(&mut store);

    let stats = store.medium().stats();
    assert_eq!(stats.writes, 0);
    assert_eq!(stats.erases, 0);
}

// =============================================================================
// Erase Tests
// =============================================================================

#[test]
fn test_erase_sequence_over_ten_appends() {
    let store = setup_store(10);

    // Region 0 on the first append, region 1 at index 5, region 0 again at index 9
    assert_eq!(store.medium().erase_log(), &[0, 128, 0]);
    assert_eq!(store.medium().stats().writes, 10);
}

#[test]
fn test_no_erase_within_region() {
    let mut store = setup_store(5);
    store.medium_mut().reset_stats();

    store.append(b"six").unwrap();
    store.append(b"seven").unwrap();

    assert!(store.medium().erase_log().is_empty());
}

#[test]
fn test_wrap_with_offset_flash_start() {
    let config = small_config(0x0800_1004);
    let mut store = CircStore::open(config, MemFlash::for_config(&config)).unwrap();

    for i in 0..9u32 {
        store.append(&i.to_le_bytes()).unwrap();
    }

    assert_eq!(store.medium().erase_log(), &[0x0800_1004, 0x0800_1084, 0x0800_1004]);
    assert_eq!(store.last_index().unwrap(), 9);
}

// =============================================================================
// Payload Size Tests
// =============================================================================

#[test]
fn test_payload_at_capacity_accepted() {
    let mut store = setup_store(0);
    let payload = vec![0x11u8; 24];

    assert_eq!(store.append(&payload).unwrap(), 1);
    assert_eq!(&store.read_latest().unwrap().payload[..], &payload[..]);
}

#[test]
fn test_payload_too_large_touches_nothing() {
    let mut store = setup_store(3);
    store.medium_mut().reset_stats();

    let result = store.append(&[0u8; 25]);

    assert!(matches!(result, Err(CircError::PayloadTooLarge { len: 25, max: 24 })));
    let stats = store.medium().stats();
    assert_eq!(stats.reads, 0);
    assert_eq!(stats.writes, 0);
    assert_eq!(stats.erases, 0);
}

#[test]
fn test_payload_of_full_slot_size_rejected() {
    let mut store = setup_store(0);

    assert!(matches!(
        store.append(&[0u8; 32]),
        Err(CircError::PayloadTooLarge { len: 32, max: 24 })
    ));
}

// =============================================================================
// Failure Tests
// =============================================================================

#[test]
fn test_write_failure_is_reported_and_recoverable() {
    let mut store = setup_store(2);
    store.medium_mut().inject(Fault::Write);

    assert!(matches!(store.append(b"lost"), Err(CircError::Medium(_))));

    // Nothing was programmed, so the index is assigned again
    assert_eq!(store.append(b"kept").unwrap(), 3);
    assert_eq!(&store.read_latest().unwrap().payload[..], b"kept");
    assert_eq!(store.count().unwrap(), 3);
}

#[test]
fn test_torn_write_without_marker_is_unwritten() {
    let mut store = setup_store(2);
    store.medium_mut().inject(Fault::TornWrite { bytes: 0 });

    assert!(store.append(b"torn").is_err());
    assert_eq!(store.last_index().unwrap(), 2);
    assert_eq!(store.append(b"next").unwrap(), 3);
}

#[test]
fn test_interrupted_header_loses_only_that_append() {
    for bytes in 1..HEADER_SIZE {
        let mut store = setup_store(2);
        store.medium_mut().inject(Fault::TornWrite { bytes });

        assert!(store.append(b"lost").is_err(), "bytes={}", bytes);

        assert_eq!(store.last_index().unwrap(), 2, "bytes={}", bytes);
        assert_eq!(store.first_index().unwrap(), 1);
        assert_eq!(store.count().unwrap(), 2);
        assert_eq!(store.read_latest().unwrap().log_index, 2);
        assert_eq!(&store.read_by_index(2).unwrap().payload[..], &2u16.to_le_bytes());

        // Index 3 stays with the interrupted slot, the next record goes after it
        assert_eq!(
            plan(&mut store),
            AppendPlan {
                address: 96,
                log_index: 4,
                erase: None,
                wrapped: false,
                skipped: 1,
            }
        );
        assert_eq!(store.append(b"next").unwrap(), 4, "bytes={}", bytes);

        assert!(matches!(store.read_by_index(3), Err(CircError::RecordNotFound(3))));
        assert_eq!(&store.read_by_index(1).unwrap().payload[..], &1u16.to_le_bytes());
        assert_eq!(&store.read_by_index(4).unwrap().payload[..], b"next");
        assert_eq!(store.count().unwrap(), 4);

        let indices: Vec<u32> = store.iter().unwrap().map(|r| r.unwrap().log_index).collect();
        assert_eq!(indices, vec![1, 2, 4]);
    }
}

#[test]
fn test_interrupted_first_slot_of_region_is_erased_again() {
    let mut store = setup_store(4);
    store.medium_mut().inject(Fault::TornWrite { bytes: 3 });

    assert!(store.append(b"lost").is_err());
    assert_eq!(store.last_index().unwrap(), 4);
    assert_eq!(store.count().unwrap(), 4);

    assert_eq!(
        plan(&mut store),
        AppendPlan {
            address: 128,
            log_index: 5,
            erase: Some(128),
            wrapped: false,
            skipped: 0,
        }
    );

    store.medium_mut().reset_stats();
    assert_eq!(store.append(b"five").unwrap(), 5);
    assert_eq!(store.medium().erase_log(), &[128]);
    assert_eq!(&store.read_by_index(5).unwrap().payload[..], b"five");
}

#[test]
fn test_consecutive_interrupted_slots_are_stepped_over() {
    let mut store = setup_store(1);
    for _ in 0..2 {
        store.medium_mut().inject(Fault::TornWrite { bytes: 5 });
        assert!(store.append(b"lost").is_err());
    }

    assert_eq!(
        plan(&mut store),
        AppendPlan {
            address: 96,
            log_index: 4,
            erase: None,
            wrapped: false,
            skipped: 2,
        }
    );
    assert_eq!(store.append(b"kept").unwrap(), 4);

    let indices: Vec<u32> = store.iter().unwrap().map(|r| r.unwrap().log_index).collect();
    assert_eq!(indices, vec![1, 4]);
    assert_eq!(store.first_index().unwrap(), 1);
}

#[test]
fn test_interrupted_payload_keeps_index() {
    let mut store = setup_store(2);
    store.medium_mut().inject(Fault::TornWrite { bytes: HEADER_SIZE + 1 });

    assert!(store.append(b"abc").is_err());

    // The header completed, so the record exists with a partial payload
    let latest = store.read_latest().unwrap();
    assert_eq!(latest.log_index, 3);
    assert_eq!(&latest.payload[..], &[b'a', 0xFF, 0xFF]);
    assert_eq!(store.append(b"next").unwrap(), 4);
}

#[test]
fn test_erase_failure_during_wrap() {
    let mut store = setup_store(8);
    store.medium_mut().inject(Fault::Erase);

    assert!(matches!(store.append(b"wrap"), Err(CircError::Medium(_))));
    assert_eq!(store.count().unwrap(), 8);
    assert_eq!(store.append(b"wrap").unwrap(), 9);
    assert_eq!(store.count().unwrap(), 5);
}

#[test]
fn test_index_space_exhausted() {
    let mut store = setup_store(0);
    let slot = encode_slot(u32::MAX, b"last", 32);
    store.medium_mut().poke(0, &slot).unwrap();

    assert!(matches!(store.append(b"one more"), Err(CircError::IndexExhausted)));
}
