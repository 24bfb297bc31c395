//! Dependency ordering for entries that reference other entries.
//!
//! Each entry may name one other entry it requires. [`order`] returns the
//! entries so that every entry comes after everything it transitively
//! requires, and fails with [`CyclicDependency`](DotconstError::CyclicDependency)
//! when the requirements loop.
//!
//! Entries are ranked by depth and stably sorted:
//!
//! - no requirement: depth 0,
//! - requirement outside the entry set: depth 1,
//! - otherwise one more than the required entry.
//!
//! Since depth strictly grows along every edge this is a topological order,
//! and entries of equal depth keep their input order.

use std::collections::HashMap;

use crate::error::DotconstError;

/// An entry with an optional requirement on another entry's key.
pub trait Requires {
    fn key(&self) -> &str;
    fn require(&self) -> Option<&str>;
}

/// Order `entries` so requirements come first.
pub fn order<T: Requires>(entries: Vec<T>) -> Result<Vec<T>, DotconstError> {
    let depths = {
        let index: HashMap<&str, usize> = entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (entry.key(), i))
            .collect();
        let mut memo = vec![None; entries.len()];
        let mut stack = Vec::new();
        for i in 0..entries.len() {
            depth_of(i, &entries, &index, &mut memo, &mut stack)?;
        }
        memo
    };

    let mut ranked: Vec<(usize, T)> = depths
        .into_iter()
        .map(|depth| depth.unwrap_or(0))
        .zip(entries)
        .collect();
    ranked.sort_by_key(|(depth, _)| *depth);
    Ok(ranked.into_iter().map(|(_, entry)| entry).collect())
}

fn depth_of<T: Requires>(
    i: usize,
    entries: &[T],
    index: &HashMap<&str, usize>,
    memo: &mut [Option<usize>],
    stack: &mut Vec<usize>,
) -> Result<usize, DotconstError> {
    if let Some(depth) = memo[i] {
        return Ok(depth);
    }

    if let Some(start) = stack.iter().position(|&s| s == i) {
        let mut chain: Vec<String> = stack[start..]
            .iter()
            .map(|&s| entries[s].key().to_string())
            .collect();
        chain.push(entries[i].key().to_string());
        return Err(DotconstError::CyclicDependency {
            key: entries[i].key().to_string(),
            chain,
        });
    }

    let depth = match entries[i].require().map(|req| index.get(req)) {
        None => 0,
        Some(None) => 1,
        Some(Some(&j)) => {
            stack.push(i);
            let depth = depth_of(j, entries, index, memo, stack)? + 1;
            stack.pop();
            depth
        }
    };

    memo[i] = Some(depth);
    Ok(depth)
}
