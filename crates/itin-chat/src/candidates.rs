//! Fuzzy node-candidate lookup, used both for the `DISAMBIGUATION` intent
//! and as a fallback when a `BOOK_NODE` message names no explicit node id.

use itin_model::{Itinerary, NodeCandidate};

/// Score every node by how many of its title words (longer than two
/// characters) appear in the lowercased message, and return the top
/// matches. Not full-text search — just enough to narrow "book the
/// temple" down to the one node whose title contains "temple".
#[must_use]
pub fn find_candidates(doc: &Itinerary, message: &str) -> Vec<NodeCandidate> {
    let lower = message.to_lowercase();
    let mut scored: Vec<(usize, NodeCandidate)> = Vec::new();

    for day in &doc.days {
        for node in &day.nodes {
            let title_lower = node.title.to_lowercase();
            let score = title_lower
                .split_whitespace()
                .filter(|word| word.len() > 2 && lower.contains(word))
                .count();
            if score > 0 {
                scored.push((
                    score,
                    NodeCandidate { node_id: node.id.clone(), day: day.day_number, title: node.title.clone() },
                ));
            }
        }
    }

    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().map(|(_, c)| c).take(5).collect()
}
