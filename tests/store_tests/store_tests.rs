//! Tests for CircStore
//!
//! These tests verify:
//! - Open-time validation against the medium
//! - Empty store behavior
//! - Read latest / by index / count / first / last
//! - Clear and index restart
//! - Iteration over retained records
//! - Reopening over an existing medium
//! - Corruption surfaces as errors, not panics
//! - Headers that never completed are stepped over

use circstore::config::Config;
use circstore::medium::{MemFlash, SharedMedium};
use circstore::slot::encode_slot;
use circstore::{CircError, CircStore};

// =============================================================================
// Helper Functions
// =============================================================================

fn small_config() -> Config {
    Config::builder()
        .region_size(128)
        .slot_size(32)
        .region_count(2)
        .build()
}

fn setup_store() -> CircStore<MemFlash> {
    let config = small_config();
    CircStore::open(config, MemFlash::for_config(&config)).unwrap()
}

fn payload(i: u32) -> Vec<u8> {
    format!("record-{}", i).into_bytes()
}

fn fill(store: &mut CircStore<MemFlash>, n: u32) {
    for i in 1..=n {
        assert_eq!(store.append(&payload(i)).unwrap(), i);
    }
}

// =============================================================================
// Open Tests
// =============================================================================

#[test]
fn test_open_rejects_invalid_config() {
    let config = Config::builder().region_count(0).build();
    let result = CircStore::open(config, MemFlash::new(0, 4096, 4096));

    assert!(matches!(result, Err(CircError::Config(_))));
}

#[test]
fn test_open_rejects_erase_size_mismatch() {
    let config = small_config();
    let result = CircStore::open(config, MemFlash::new(0, 512, 256));

    assert!(matches!(result, Err(CircError::Config(_))));
}

#[test]
fn test_open_does_not_touch_medium() {
    let store = setup_store();

    assert_eq!(store.medium().stats().reads, 0);
    assert_eq!(store.layout().capacity(), 8);
    assert_eq!(store.config(), &small_config());
}

// =============================================================================
// Empty Store Tests
// =============================================================================

#[test]
fn test_empty_store() {
    let mut store = setup_store();

    assert!(matches!(store.read_latest(), Err(CircError::StoreEmpty)));
    assert!(matches!(store.read_by_index(1), Err(CircError::StoreEmpty)));
    assert!(matches!(store.first_index(), Err(CircError::StoreEmpty)));
    assert!(matches!(store.last_index(), Err(CircError::StoreEmpty)));
    assert_eq!(store.count().unwrap(), 0);
    assert_eq!(store.iter().unwrap().count(), 0);
}

// =============================================================================
// Read Tests
// =============================================================================

#[test]
fn test_read_latest_and_by_index() {
    let mut store = setup_store();
    fill(&mut store, 3);

    let latest = store.read_latest().unwrap();
    assert_eq!(latest.log_index, 3);
    assert_eq!(&latest.payload[..], b"record-3");

    let second = store.read_by_index(2).unwrap();
    assert_eq!(second.log_index, 2);
    assert_eq!(&second.payload[..], b"record-2");
}

#[test]
fn test_read_future_index_out_of_range() {
    let mut store = setup_store();
    fill(&mut store, 3);

    assert!(matches!(
        store.read_by_index(4),
        Err(CircError::IndexOutOfRange { index: 4, first: 1, last: 3 })
    ));
    assert!(matches!(
        store.read_by_index(0),
        Err(CircError::IndexOutOfRange { index: 0, .. })
    ));
}

#[test]
fn test_first_and_last_index() {
    let mut store = setup_store();
    fill(&mut store, 11);

    // Region 0 holds [9, 11], region 1 holds [5, 8]
    assert_eq!(store.first_index().unwrap(), 5);
    assert_eq!(store.last_index().unwrap(), 11);
    assert_eq!(store.count().unwrap(), 7);
}

// =============================================================================
// Clear Tests
// =============================================================================

#[test]
fn test_clear_restarts_indices() {
    let mut store = setup_store();
    fill(&mut store, 6);
    store.medium_mut().reset_stats();

    store.clear().unwrap();

    assert_eq!(store.medium().erase_log(), &[0, 128]);
    assert_eq!(store.count().unwrap(), 0);
    assert!(matches!(store.read_latest(), Err(CircError::StoreEmpty)));
    assert!(matches!(store.read_by_index(1), Err(CircError::StoreEmpty)));
    assert_eq!(store.append(b"fresh").unwrap(), 1);
    assert_eq!(&store.read_by_index(1).unwrap().payload[..], b"fresh");
}

#[test]
fn test_clear_empty_store() {
    let mut store = setup_store();

    store.clear().unwrap();
    assert_eq!(store.count().unwrap(), 0);
}

// =============================================================================
// Iteration Tests
// =============================================================================

#[test]
fn test_iter_oldest_first() {
    let mut store = setup_store();
    fill(&mut store, 5);

    let records: Vec<_> = store.iter().unwrap().map(|r| r.unwrap()).collect();
    let indices: Vec<u32> = records.iter().map(|r| r.log_index).collect();

    assert_eq!(indices, vec![1, 2, 3, 4, 5]);
    assert_eq!(&records[4].payload[..], b"record-5");
}

#[test]
fn test_iter_across_wrap() {
    let mut store = setup_store();
    fill(&mut store, 10);

    let indices: Vec<u32> = store.iter().unwrap().map(|r| r.unwrap().log_index).collect();

    assert_eq!(indices, vec![5, 6, 7, 8, 9, 10]);
}

#[test]
fn test_iter_reports_corruption() {
    let mut store = setup_store();
    fill(&mut store, 4);
    // Index 3 now claims to be 30
    store.medium_mut().poke(64 + 2, &30u32.to_le_bytes()).unwrap();

    let results: Vec<_> = store.iter().unwrap().collect();

    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(results[1].is_ok());
    assert!(matches!(results[2], Err(CircError::CorruptSlot { address: 64, .. })));
}

// =============================================================================
// Reopen / Sharing Tests
// =============================================================================

#[test]
fn test_reopen_reconstructs_state() {
    let mut store = setup_store();
    fill(&mut store, 10);
    let medium = store.into_inner();

    let mut reopened = CircStore::open(small_config(), medium).unwrap();

    assert_eq!(reopened.count().unwrap(), 6);
    assert_eq!(&reopened.read_latest().unwrap().payload[..], b"record-10");
    assert_eq!(reopened.append(b"record-11").unwrap(), 11);
}

#[test]
fn test_shared_medium_between_stores() {
    let config = small_config();
    let shared = SharedMedium::new(MemFlash::for_config(&config));
    let mut writer = CircStore::open(config, shared.clone()).unwrap();
    let mut reader = CircStore::open(config, shared.clone()).unwrap();

    writer.append(b"from writer").unwrap();

    assert_eq!(&reader.read_latest().unwrap().payload[..], b"from writer");
    assert_eq!(shared.lock().stats().writes, 1);
}

#[test]
fn test_store_over_borrowed_medium() {
    let config = small_config();
    let mut flash = MemFlash::for_config(&config);
    {
        let mut store = CircStore::open(config, &mut flash).unwrap();
        store.append(b"borrowed").unwrap();
    }

    assert_eq!(flash.stats().writes, 1);
}

// =============================================================================
// Corruption Tests
// =============================================================================

#[test]
fn test_impossible_length_is_treated_as_interrupted() {
    let mut store = setup_store();
    fill(&mut store, 2);
    // Index 2 now claims a 256-byte payload in a 24-byte slot
    store.medium_mut().poke(32 + 6, &[0x00, 0x01]).unwrap();

    assert_eq!(store.read_latest().unwrap().log_index, 1);
    assert!(matches!(store.read_by_index(2), Err(CircError::IndexOutOfRange { .. })));
    assert_eq!(store.append(b"record-3").unwrap(), 3);
    assert!(matches!(store.read_by_index(2), Err(CircError::RecordNotFound(2))));
    assert_eq!(&store.read_by_index(3).unwrap().payload[..], b"record-3");
}

#[test]
fn test_index_span_beyond_capacity_is_corruption() {
    let mut store = setup_store();
    store.medium_mut().poke(0, &encode_slot(0, b"low", 32)).unwrap();
    store.medium_mut().poke(32, &encode_slot(u32::MAX, b"high", 32)).unwrap();

    assert!(matches!(store.count(), Err(CircError::CorruptSlot { address: 32, .. })));
    assert!(matches!(store.read_by_index(5), Err(CircError::CorruptSlot { .. })));
    assert!(store.iter().is_err());
}

#[test]
fn test_read_error_propagates() {
    let mut store = setup_store();
    fill(&mut store, 2);
    store.medium_mut().inject(circstore::medium::Fault::Read);

    assert!(matches!(store.count(), Err(CircError::Medium(_))));
    assert_eq!(store.count().unwrap(), 2);
}
