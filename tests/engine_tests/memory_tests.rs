//! Tests for the in-memory engine
//!
//! These tests verify:
//! - Store-family rules (add / replace / append / prepend)
//! - CAS tokens and compare-and-swap outcomes
//! - Multi-key buffering and draining
//! - Key validation, prefixes and server selection
//! - Counters, flush and injected failures

use memlink::codec::Flags;
use memlink::engine::{Engine, MemoryEngine, StoreOp, MAX_KEY_LENGTH};
use memlink::protocol::{Behavior, DrainStep, ResultCode};

// =============================================================================
// Helper Functions
// =============================================================================

fn engine() -> MemoryEngine {
    MemoryEngine::with_local_server()
}

fn set(engine: &mut MemoryEngine, key: &str, data: &str) -> ResultCode {
    engine.store(StoreOp::Set, key.as_bytes(), key.as_bytes(), data.as_bytes(), 0, Flags::empty())
}

fn data_of(engine: &mut MemoryEngine, key: &str) -> Vec<u8> {
    engine.get(None, key.as_bytes()).unwrap().data.to_vec()
}

fn drain(engine: &mut MemoryEngine) -> Vec<(Vec<u8>, u64)> {
    let mut out = Vec::new();
    loop {
        match engine.fetch_result() {
            DrainStep::Record(record) => out.push((record.key, record.cas)),
            DrainStep::End => return out,
            DrainStep::Failed(code) => panic!("drain failed: {}", code),
        }
    }
}

// =============================================================================
// Store Family Tests
// =============================================================================

#[test]
fn test_set_then_get() {
    let mut engine = engine();
    assert_eq!(set(&mut engine, "k", "v"), ResultCode::Stored);

    let item = engine.get(None, b"k").unwrap();
    assert_eq!(&item.data[..], b"v");
    assert_eq!(item.flags, Flags::empty());
}

#[test]
fn test_get_missing_is_not_found() {
    let mut engine = engine();
    assert_eq!(engine.get(None, b"nope"), Err(ResultCode::NotFound));
}

#[test]
fn test_add_only_when_absent() {
    let mut engine = engine();

    assert_eq!(engine.store(StoreOp::Add, b"k", b"k", b"1", 0, Flags::empty()), ResultCode::Stored);
    assert_eq!(engine.store(StoreOp::Add, b"k", b"k", b"2", 0, Flags::empty()), ResultCode::NotStored);
    assert_eq!(data_of(&mut engine, "k"), b"1");
}

#[test]
fn test_replace_only_when_present() {
    let mut engine = engine();

    assert_eq!(engine.store(StoreOp::Replace, b"k", b"k", b"1", 0, Flags::empty()), ResultCode::NotStored);
    set(&mut engine, "k", "old");
    assert_eq!(engine.store(StoreOp::Replace, b"k", b"k", b"new", 0, Flags::empty()), ResultCode::Stored);
    assert_eq!(data_of(&mut engine, "k"), b"new");
}

#[test]
fn test_append_and_prepend_keep_flags() {
    let mut engine = engine();
    engine.store(StoreOp::Set, b"k", b"k", b"mid", 0, Flags::IS_LONG);

    assert_eq!(engine.store(StoreOp::Append, b"k", b"k", b"-end", 0, Flags::empty()), ResultCode::Stored);
    assert_eq!(engine.store(StoreOp::Prepend, b"k", b"k", b"start-", 0, Flags::empty()), ResultCode::Stored);

    let item = engine.get(None, b"k").unwrap();
    assert_eq!(&item.data[..], b"start-mid-end");
    assert_eq!(item.flags, Flags::IS_LONG);
}

#[test]
fn test_append_missing_not_stored() {
    let mut engine = engine();
    assert_eq!(engine.store(StoreOp::Append, b"k", b"k", b"x", 0, Flags::empty()), ResultCode::NotStored);
}

// =============================================================================
// CAS Tests
// =============================================================================

#[test]
fn test_cas_tokens_only_with_support_enabled() {
    let mut engine = engine();
    set(&mut engine, "k", "v");

    engine.mget(None, &[b"k".as_slice()]);
    assert_eq!(drain(&mut engine), vec![(b"k".to_vec(), 0)]);

    engine.set_behavior(Behavior::SupportCas, 1);
    engine.mget(None, &[b"k".as_slice()]);
    let drained = drain(&mut engine);
    assert_eq!(drained.len(), 1);
    assert!(drained[0].1 > 0);
}

#[test]
fn test_cas_swap_and_conflict() {
    let mut engine = engine();
    engine.set_behavior(Behavior::SupportCas, 1);
    set(&mut engine, "k", "v1");

    engine.mget(None, &[b"k".as_slice()]);
    let token = drain(&mut engine)[0].1;

    assert_eq!(engine.cas(b"k", b"k", b"v2", 0, Flags::empty(), token), ResultCode::Stored);
    assert_eq!(engine.cas(b"k", b"k", b"v3", 0, Flags::empty(), token), ResultCode::DataExists);
    assert_eq!(engine.cas(b"x", b"x", b"v", 0, Flags::empty(), token), ResultCode::NotFound);
    assert_eq!(data_of(&mut engine, "k"), b"v2");
}

// =============================================================================
// Multi-Get Tests
// =============================================================================

#[test]
fn test_mget_skips_missing_keys() {
    let mut engine = engine();
    set(&mut engine, "a", "1");
    set(&mut engine, "c", "3");

    assert_eq!(engine.mget(None, &[b"a".as_slice(), b"b".as_slice(), b"c".as_slice()]), ResultCode::Success);
    assert_eq!(engine.pending_count(), 2);

    let keys: Vec<Vec<u8>> = drain(&mut engine).into_iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec![b"a".to_vec(), b"c".to_vec()]);
}

#[test]
fn test_mget_replaces_pending_results() {
    let mut engine = engine();
    set(&mut engine, "a", "1");
    set(&mut engine, "b", "2");

    engine.mget(None, &[b"a".as_slice()]);
    engine.mget(None, &[b"b".as_slice()]);

    assert_eq!(drain(&mut engine), vec![(b"b".to_vec(), 0)]);
}

#[test]
fn test_mget_empty_key_list() {
    let mut engine = engine();
    assert_eq!(engine.mget(None, &[]), ResultCode::Success);
    assert_eq!(engine.fetch_result(), DrainStep::End);
}

#[test]
fn test_mget_without_servers() {
    let mut engine = MemoryEngine::new();
    assert_eq!(engine.mget(None, &[b"a".as_slice()]), ResultCode::NoServers);
}

#[test]
fn test_mget_bad_key() {
    let mut engine = engine();
    assert_eq!(engine.mget(None, &[b"has space".as_slice()]), ResultCode::BadKeyProvided);
    assert_eq!(engine.pending_count(), 0);
}

// =============================================================================
// Keys, Prefix and Servers
// =============================================================================

#[test]
fn test_key_length_limit() {
    let mut engine = engine();
    let longest = "k".repeat(MAX_KEY_LENGTH);
    let too_long = "k".repeat(MAX_KEY_LENGTH + 1);

    assert_eq!(set(&mut engine, &longest, "v"), ResultCode::Stored);
    assert_eq!(set(&mut engine, &too_long, "v"), ResultCode::BadKeyProvided);
    assert_eq!(set(&mut engine, "", "v"), ResultCode::BadKeyProvided);
}

#[test]
fn test_prefix_isolates_namespaces() {
    let mut engine = engine();
    set(&mut engine, "k", "plain");

    assert_eq!(engine.set_prefix_key(Some("app:")), ResultCode::Success);
    assert_eq!(engine.prefix_key().as_deref(), Some("app:"));
    assert_eq!(engine.get(None, b"k"), Err(ResultCode::NotFound));

    set(&mut engine, "k", "prefixed");
    assert_eq!(data_of(&mut engine, "k"), b"prefixed");

    engine.set_prefix_key(None);
    assert_eq!(data_of(&mut engine, "k"), b"plain");
}

#[test]
fn test_bad_prefix_rejected() {
    let mut engine = engine();
    assert_eq!(engine.set_prefix_key(Some("has space")), ResultCode::BadKeyProvided);
    assert_eq!(engine.prefix_key(), None);
}

#[test]
fn test_server_list_and_selection() {
    let mut engine = MemoryEngine::new();
    assert_eq!(engine.server_by_key(b"k"), Err(ResultCode::NoServers));

    engine.add_server("10.0.0.1", 11211, 1);
    engine.add_server("10.0.0.2", 11211, 1);
    assert_eq!(engine.add_server("", 11211, 1), ResultCode::HostLookupFailure);
    assert_eq!(engine.servers().len(), 2);

    let first = engine.server_by_key(b"user:1").unwrap();
    assert_eq!(engine.server_by_key(b"user:1").unwrap(), first);
}

#[test]
fn test_routing_key_groups_items() {
    let mut engine = MemoryEngine::new();
    engine.add_server("10.0.0.1", 11211, 1);
    engine.add_server("10.0.0.2", 11211, 1);

    engine.store(StoreOp::Set, b"group", b"a", b"1", 0, Flags::empty());
    engine.store(StoreOp::Set, b"group", b"b", b"2", 0, Flags::empty());

    engine.mget(Some(b"group".as_slice()), &[b"a".as_slice(), b"b".as_slice()]);
    assert_eq!(drain(&mut engine).len(), 2);
}

// =============================================================================
// Counters, Deletion and Flush
// =============================================================================

#[test]
fn test_increment_and_decrement() {
    let mut engine = engine();
    set(&mut engine, "n", "10");

    assert_eq!(engine.increment(b"n", 5), Ok(15));
    assert_eq!(engine.decrement(b"n", 20), Ok(0));
    assert_eq!(engine.increment(b"missing", 1), Err(ResultCode::NotFound));

    set(&mut engine, "s", "text");
    assert_eq!(engine.increment(b"s", 1), Err(ResultCode::ClientError));
}

#[test]
fn test_delete() {
    let mut engine = engine();
    set(&mut engine, "k", "v");

    assert_eq!(engine.delete(b"k", b"k", 0), ResultCode::Deleted);
    assert_eq!(engine.delete(b"k", b"k", 0), ResultCode::NotFound);
}

#[test]
fn test_flush_now() {
    let mut engine = engine();
    set(&mut engine, "a", "1");
    set(&mut engine, "b", "2");

    assert_eq!(engine.flush(0), ResultCode::Success);
    assert_eq!(engine.item_count(), 0);
}

#[test]
fn test_flush_delayed_keeps_items_for_now() {
    let mut engine = engine();
    set(&mut engine, "a", "1");

    assert_eq!(engine.flush(60), ResultCode::Success);
    assert_eq!(engine.item_count(), 1);
}

// =============================================================================
// Failure Injection
// =============================================================================

#[test]
fn test_injected_failures_used_once_in_order() {
    let mut engine = engine();
    engine.fail_next(ResultCode::Timeout);
    engine.fail_next(ResultCode::WriteFailure);

    assert_eq!(set(&mut engine, "k", "v"), ResultCode::Timeout);
    assert_eq!(set(&mut engine, "k", "v"), ResultCode::WriteFailure);
    assert_eq!(set(&mut engine, "k", "v"), ResultCode::Stored);
}

#[test]
fn test_injected_failure_mid_drain() {
    let mut engine = engine();
    set(&mut engine, "a", "1");
    engine.mget(None, &[b"a".as_slice()]);

    engine.fail_next(ResultCode::UnknownReadFailure);
    assert_eq!(engine.fetch_result(), DrainStep::Failed(ResultCode::UnknownReadFailure));
}
