//! Positional List Reconstruction
//!
//! Rebuilds a visible order from "insert-after" pointers. Iterative walk
//! with an explicit step budget of `n + 1`; no recursion, so a cyclic or
//! disconnected pointer graph truncates the order instead of hanging.

use std::collections::BTreeMap;

/// Walk the successor chain starting from the head (`after == None`).
///
/// Items are `(id, after)` in processing order. When several items claim
/// the same predecessor, the last one processed owns that slot and the
/// others drop out of the visible order.
pub fn reconstruct_order<'a, I>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
{
    let mut successor: BTreeMap<Option<&str>, &str> = BTreeMap::new();
    let mut count = 0usize;
    for (id, after) in items {
        successor.insert(after, id);
        count += 1;
    }

    let mut order = Vec::new();
    let mut cursor: Option<&str> = None;
    for _ in 0..=count {
        match successor.get(&cursor) {
            Some(&next) => {
                order.push(next.to_string());
                cursor = Some(next);
            }
            None => break,
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_chain() {
        let order = reconstruct_order([("b3", Some("b2")), ("b1", None), ("b2", Some("b1"))]);
        assert_eq!(order, vec!["b1", "b2", "b3"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(reconstruct_order(std::iter::empty()).is_empty());
    }

    #[test]
    fn test_broken_pointer_truncates() {
        let order = reconstruct_order([("b1", None), ("b3", Some("ghost"))]);
        assert_eq!(order, vec!["b1"]);
    }

    #[test]
    fn test_no_head_yields_nothing() {
        let order = reconstruct_order([("a", Some("b")), ("b", Some("a"))]);
        assert!(order.is_empty());
    }

    #[test]
    fn test_self_reference_terminates() {
        let order = reconstruct_order([("a", None), ("b", Some("b"))]);
        assert_eq!(order, vec!["a"]);
    }

    #[test]
    fn test_duplicate_predecessor_last_wins() {
        let order = reconstruct_order([("b1", None), ("x", Some("b1")), ("y", Some("b1"))]);
        assert_eq!(order, vec!["b1", "y"]);
    }
}
