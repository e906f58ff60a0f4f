//! Cycle detection over the role implication map
//!
//! Depth-first search with three node states:
//! - unvisited
//! - visiting (on the current DFS path)
//! - visited (fully processed)
//!
//! Reaching a "visiting" node again means the implication map contains a
//! cycle; the path from its first occurrence is reported for diagnostics.

use std::collections::{BTreeMap, HashMap};

#[derive(Clone, Copy, PartialEq)]
enum VisitState {
    Visiting,
    Visited,
}

/// Find a cycle in the implication map, if any
///
/// Returns the cycle as a role path ending where it started, e.g.
/// `["A", "B", "A"]`. Roles that appear only as implication targets are
/// treated as leaves.
pub(crate) fn find_cycle(implied: &BTreeMap<String, Vec<String>>) -> Option<Vec<String>> {
    let mut state: HashMap<&str, VisitState> = HashMap::new();

    for start in implied.keys() {
        if !state.contains_key(start.as_str()) {
            let mut path = Vec::new();
            if let Some(cycle) = visit(start, implied, &mut state, &mut path) {
                return Some(cycle);
            }
        }
    }

    None
}

fn visit<'a>(
    role: &'a str,
    implied: &'a BTreeMap<String, Vec<String>>,
    state: &mut HashMap<&'a str, VisitState>,
    path: &mut Vec<&'a str>,
) -> Option<Vec<String>> {
    match state.get(role) {
        Some(VisitState::Visiting) => {
            // Back edge: the cycle runs from the first occurrence on the path
            let start = path.iter().position(|seen| *seen == role)?;
            let mut cycle: Vec<String> = path[start..].iter().map(|r| r.to_string()).collect();
            cycle.push(role.to_string());
            return Some(cycle);
        }
        Some(VisitState::Visited) => return None,
        None => {}
    }

    state.insert(role, VisitState::Visiting);
    path.push(role);

    if let Some(children) = implied.get(role) {
        for child in children {
            if let Some(cycle) = visit(child, implied, state, path) {
                return Some(cycle);
            }
        }
    }

    path.pop();
    state.insert(role, VisitState::Visited);

    None
}
