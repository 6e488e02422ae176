//! Replay properties and reference scenarios.
//!
//! Every test builds raw wire records, parses them through the op model
//! and replays them the way an external caller would.

use chrono::{DateTime, SecondsFormat, Utc};
use opsite_engine::events::RootRef;
use opsite_engine::hashing::canonical_hash;
use opsite_engine::invariants::{validate_index, validate_projection};
use opsite_engine::{
    parse_log, Operation, ProjectedPage, Projection, ReplayConfig, Replayer, Status,
};
use proptest::prelude::*;
use serde_json::{json, Value};

// ─────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────

const T0: i64 = 1_706_781_600_000; // 2024-02-01T10:00:00Z

fn ts(offset_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(T0 + offset_ms)
        .expect("offset in range")
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn rec(op: &str, target: &str, operand: Value, offset_ms: i64) -> Value {
    json!({
        "op": op,
        "target": target,
        "operand": operand,
        "ctx": {"agent": "@tester", "ts": ts(offset_ms)},
    })
}

fn with_id(mut record: Value, id: &str) -> Value {
    record["id"] = json!(id);
    record
}

fn drafts() -> Replayer {
    Replayer::new(ReplayConfig::with_drafts())
}

fn page_of(records: &[Value]) -> ProjectedPage {
    let ops = parse_log(records);
    drafts()
        .replay_page(&RootRef::parse("page:home").unwrap(), &ops, None)
        .unwrap()
        .unwrap()
}

fn block_insert(id: &str, after: Option<&str>, offset_ms: i64) -> Value {
    rec(
        "INSERT",
        &format!("page:home/block:{}", id),
        json!({"type": "paragraph", "data": {"text": id}, "after": after}),
        offset_ms,
    )
}

fn wiki_rev(id: &str, offset_ms: i64) -> Value {
    rec(
        "INSERT",
        &format!("wiki:operators/rev:{}", id),
        json!({"body": format!("text {}", id)}),
        offset_ms,
    )
}

// ─────────────────────────────────────────────────────────────
// Scenarios
// ─────────────────────────────────────────────────────────────

#[test]
fn scenario_a_linear_block_chain() {
    let page = page_of(&[
        block_insert("b1", None, 0),
        block_insert("b2", Some("b1"), 1),
        block_insert("b3", Some("b2"), 2),
    ]);
    assert_eq!(page.block_order, vec!["b1", "b2", "b3"]);
}

#[test]
fn scenario_b_close_wiki_revisions_conflict() {
    let ops = parse_log(&[wiki_rev("r1", 0), wiki_rev("r2", 30_000)]);
    let wiki = drafts()
        .replay_wiki(&RootRef::parse("wiki:operators").unwrap(), &ops, None)
        .unwrap()
        .unwrap();
    assert_eq!(wiki.current_revision.as_deref(), Some("r2"));
    assert!(wiki.has_conflict);
    assert_eq!(wiki.conflict_candidates, vec!["r1", "r2"]);
    assert!(validate_projection(&Projection::Wiki(wiki)).is_ok());
}

#[test]
fn scenario_c_nullified_index_entry_is_archived() {
    let ops = parse_log(&[
        rec(
            "INSERT",
            "wiki:site/index:wiki:x",
            json!({"status": "published", "visibility": "public"}),
            0,
        ),
        rec("NULLIFY", "wiki:site/index:wiki:x", json!({}), 1_000),
    ]);
    let index = Replayer::default().replay_index(&ops);
    assert_eq!(index.entries.len(), 1);
    assert_eq!(index.entries[0].id, "wiki:x");
    assert_eq!(index.entries[0].status, Status::Archived);
    assert!(index.nav.is_empty());
    assert!(validate_index(&index).is_ok());
}

#[test]
fn scenario_d_nullified_experiment_entry_disappears() {
    let ops = parse_log(&[
        rec("INSERT", "exp:lab/entry:e1", json!({"kind": "dataset"}), 0),
        rec("NULLIFY", "exp:lab/entry:e1", json!({}), 1_000),
    ]);
    let exp = drafts()
        .replay_experiment(&RootRef::parse("exp:lab").unwrap(), &ops, None)
        .unwrap()
        .unwrap();
    assert!(exp.entries.is_empty());
}

// ─────────────────────────────────────────────────────────────
// Properties
// ─────────────────────────────────────────────────────────────

#[test]
fn conflict_boundary_is_strict() {
    let root = RootRef::parse("wiki:operators").unwrap();
    let near = parse_log(&[wiki_rev("r1", 0), wiki_rev("r2", 59_999)]);
    let far = parse_log(&[wiki_rev("r1", 0), wiki_rev("r2", 60_000)]);
    let near = drafts().replay_wiki(&root, &near, None).unwrap().unwrap();
    let far = drafts().replay_wiki(&root, &far, None).unwrap().unwrap();
    assert!(near.has_conflict);
    assert!(!far.has_conflict);
    assert!(far.conflict_candidates.is_empty());
}

#[test]
fn synthesize_anywhere_resolves_conflict() {
    let root = RootRef::parse("wiki:operators").unwrap();
    let ops = parse_log(&[
        rec("SYNTHESIZE", "wiki:operators", json!({"resolves": ["r0"]}), 0),
        wiki_rev("r1", 10),
        wiki_rev("r2", 20),
    ]);
    let wiki = drafts().replay_wiki(&root, &ops, None).unwrap().unwrap();
    assert!(!wiki.has_conflict);
    assert!(wiki.conflict_candidates.is_empty());
}

#[test]
fn conflict_window_is_configurable() {
    let root = RootRef::parse("wiki:operators").unwrap();
    let ops = parse_log(&[wiki_rev("r1", 0), wiki_rev("r2", 30_000)]);
    let narrow = Replayer::new(ReplayConfig {
        conflict_window_ms: 10_000,
        ..ReplayConfig::with_drafts()
    });
    let wiki = narrow.replay_wiki(&root, &ops, None).unwrap().unwrap();
    assert!(!wiki.has_conflict);
}

#[test]
fn alter_before_insert_is_noop() {
    let alter = rec(
        "ALTER",
        "page:home/block:b1",
        json!({"patch": [{"op": "replace", "path": "/text", "value": "patched"}]}),
        0,
    );
    let insert = block_insert("b1", None, 1);

    let insert_then_alter = page_of(&[insert.clone(), alter.clone()]);
    let alter_then_insert = page_of(&[alter, insert]);

    assert_eq!(insert_then_alter.blocks["b1"].data["text"], "patched");
    assert_eq!(alter_then_insert.blocks["b1"].data["text"], "b1");
}

#[test]
fn tombstone_survives_later_alters() {
    let page = page_of(&[
        block_insert("b1", None, 0),
        block_insert("b2", Some("b1"), 1),
        rec("NULLIFY", "page:home/block:b1", json!({}), 2),
        rec(
            "ALTER",
            "page:home/block:b1",
            json!({"patch": [{"op": "replace", "path": "/text", "value": "again"}], "after": null}),
            3,
        ),
    ]);
    assert!(page.blocks["b1"].deleted);
    assert!(!page.block_order.contains(&"b1".to_string()));
    // b2 hangs off a tombstone, so the visible chain stops at the break.
    assert!(page.block_order.is_empty());
}

#[test]
fn broken_chain_truncates_without_panic() {
    let page = page_of(&[
        block_insert("b1", None, 0),
        block_insert("b2", Some("b1"), 1),
        block_insert("b4", Some("b3-missing"), 2),
        block_insert("c1", Some("c2"), 3),
        block_insert("c2", Some("c1"), 4),
    ]);
    assert_eq!(page.block_order, vec!["b1", "b2"]);
    assert_eq!(page.blocks.len(), 5);
    assert!(validate_projection(&Projection::Page(page)).is_ok());
}

#[test]
fn access_filter_public_pass() {
    let root = RootRef::parse("blog:launch").unwrap();
    let draft = parse_log(&[rec("INSERT", "blog:launch/rev:r1", json!({"body": "hi"}), 0)]);
    assert!(Replayer::default().replay(&root, &draft, None).is_none());

    let mut published = parse_log(&[rec(
        "DESCRIBE",
        "blog:launch",
        json!({"status": "published", "visibility": "public"}),
        0,
    )]);
    published.extend(draft);
    match Replayer::default().replay(&root, &published, None) {
        Some(Projection::Blog(blog)) => assert_eq!(blog.current_revision.as_deref(), Some("r1")),
        other => panic!("expected blog projection, got {:?}", other),
    }

    let archived = parse_log(&[rec("DESCRIBE", "blog:launch", json!({"status": "archived"}), 5)]);
    let mut all = published.clone();
    all.extend(archived);
    assert!(drafts().replay(&root, &all, None).is_none());
}

#[test]
fn projection_json_is_tagged_by_content_type() {
    let ops = parse_log(&[wiki_rev("r1", 0)]);
    let projection = drafts()
        .replay(&RootRef::parse("wiki:operators").unwrap(), &ops, None)
        .unwrap();
    let v = serde_json::to_value(&projection).unwrap();
    assert_eq!(v["content_type"], "wiki");
    assert_eq!(v["current_revision"], "r1");
    assert_eq!(v["has_conflict"], false);
    assert!(v["conflict_candidates"].as_array().unwrap().is_empty());
}

// ─────────────────────────────────────────────────────────────
// Generated logs
// ─────────────────────────────────────────────────────────────

/// Per block: (alter?, nullify?). Blocks form one chain b0 <- b1 <- ...
fn script() -> impl Strategy<Value = Vec<(bool, bool)>> {
    prop::collection::vec((any::<bool>(), any::<bool>()), 1..6)
}

/// Events for block `i`, in their required relative order.
fn block_events(i: usize, alter: bool, nullify: bool) -> Vec<Value> {
    let id = format!("b{}", i);
    let after = if i == 0 { None } else { Some(format!("b{}", i - 1)) };
    let target = format!("page:home/block:{}", id);
    let mut out = vec![with_id(
        rec("INSERT", &target, json!({"data": {"n": i}, "after": after}), 0),
        &format!("{}-ins", id),
    )];
    if alter {
        out.push(with_id(
            rec(
                "ALTER",
                &target,
                json!({"patch": [{"op": "add", "path": "/touched", "value": true}]}),
                0,
            ),
            &format!("{}-alt", id),
        ));
    }
    if nullify {
        out.push(with_id(rec("NULLIFY", &target, json!({}), 0), &format!("{}-nul", id)));
    }
    out
}

/// Interleave per-block event lists following `slots` (a shuffled
/// multiset of block indices); per-block order is preserved.
fn interleave(per_block: &[Vec<Value>], slots: &[usize]) -> Vec<Value> {
    let mut cursors = vec![0usize; per_block.len()];
    slots
        .iter()
        .map(|&b| {
            let ev = per_block[b][cursors[b]].clone();
            cursors[b] += 1;
            ev
        })
        .collect()
}

fn blocks_and_order(records: &[Value]) -> String {
    let page = page_of(records);
    canonical_hash(&(&page.blocks, &page.block_order))
}

proptest! {
    #[test]
    fn prop_replay_is_idempotent(s in script()) {
        let records: Vec<Value> = s
            .iter()
            .enumerate()
            .flat_map(|(i, (a, n))| block_events(i, *a, *n))
            .collect();
        let ops: Vec<Operation> = parse_log(&records);
        let root = RootRef::parse("page:home").unwrap();
        let first = canonical_hash(&drafts().replay(&root, &ops, None));
        let second = canonical_hash(&drafts().replay(&root, &ops, None));
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_interleaving_across_ids_commutes(
        (s, slots) in script().prop_flat_map(|s| {
            let slots: Vec<usize> = s
                .iter()
                .enumerate()
                .flat_map(|(i, (a, n))| std::iter::repeat(i).take(1 + *a as usize + *n as usize))
                .collect();
            (Just(s), Just(slots).prop_shuffle())
        })
    ) {
        let per_block: Vec<Vec<Value>> = s
            .iter()
            .enumerate()
            .map(|(i, (a, n))| block_events(i, *a, *n))
            .collect();
        let sequential: Vec<Value> = per_block.iter().flatten().cloned().collect();
        let shuffled = interleave(&per_block, &slots);
        prop_assert_eq!(blocks_and_order(&sequential), blocks_and_order(&shuffled));
    }
}
