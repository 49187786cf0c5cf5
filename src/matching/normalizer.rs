//! Preference normalization
//!
//! Turns raw, untrusted join input into a canonical `MatchRequest`. Total by
//! design: clients (including malformed or malicious ones) can never produce
//! an unmatchable or store-rejected request. Invalid input degrades to the
//! broadest possible preference, maximizing match likelihood, rather than
//! failing closed. A request for the non-existent "Mein Leben" difficulty
//! simply lands on a random valid one.

use crate::taxonomy::TaxonomySnapshot;
use crate::types::{Complexity, MatchRequest, RawMatchRequest};
use rand::seq::SliceRandom;

/// Normalize raw preferences against the current taxonomy.
///
/// - unknown or missing complexity: uniformly random valid label
/// - unknown or missing language: the configured default
/// - categories: only the valid subset survives; nothing surviving (or no
///   array at all) means the entire category set ("any category")
pub fn normalize(
    raw: &RawMatchRequest,
    taxonomy: &TaxonomySnapshot,
    default_language: &str,
) -> MatchRequest {
    let complexity = raw
        .complexity
        .as_deref()
        .and_then(Complexity::parse)
        .unwrap_or_else(|| {
            Complexity::ALL
                .choose(&mut rand::thread_rng())
                .copied()
                .unwrap_or(Complexity::Easy)
        });

    let language = match raw.language.as_deref() {
        Some(language) if taxonomy.languages.iter().any(|l| l == language) => {
            language.to_string()
        }
        _ => default_language.to_string(),
    };

    let categories = match &raw.categories {
        Some(requested) => {
            let valid: Vec<String> = requested
                .iter()
                .filter(|category| taxonomy.categories.contains(category))
                .cloned()
                .collect();
            if valid.is_empty() {
                taxonomy.categories.clone()
            } else {
                valid
            }
        }
        None => taxonomy.categories.clone(),
    };

    MatchRequest {
        complexity,
        categories,
        language,
    }
}
