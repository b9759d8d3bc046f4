// Scenery matcher: synonym-aware keyword retention over tags + description.

use lazy_static::lazy_static;
use std::collections::{HashMap, HashSet};
use tracing::debug;

use super::filter::Candidate;

lazy_static! {
    /// Many-to-many thesaurus for scenery words. Entries list every keyword a
    /// token stands for, including the token itself where it is meaningful.
    static ref SCENERY_SYNONYMS: HashMap<&'static str, &'static [&'static str]> = {
        let mut table: HashMap<&'static str, &'static [&'static str]> = HashMap::new();
        table.insert(
            "scenic",
            &["panoramic", "lake", "forest", "view", "fell", "mountain", "scenic"][..],
        );
        table.insert("water", &["lake", "river", "stream", "waterfall", "pond"][..]);
        table.insert("mountain", &["fell", "peak", "ridge", "mountain"][..]);
        table.insert("forest", &["woodland", "forest", "trees"][..]);
        table.insert("lake", &["lake", "water", "pond"][..]);
        table.insert("panoramic", &["panoramic", "view", "scenic"][..]);
        table.insert("relaxing", &["peaceful", "quiet", "relaxing"][..]);
        table
    };
}

/// Expand a free-text scenery wish into the keyword set used for retention.
/// Tokens absent from the thesaurus expand to themselves only.
fn keyword_set(scenery: &str) -> HashSet<String> {
    let lowered = scenery.to_lowercase();
    let mut keywords = HashSet::new();
    for token in lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        match SCENERY_SYNONYMS.get(token) {
            Some(expansion) => keywords.extend(expansion.iter().map(|s| s.to_string())),
            None => {
                keywords.insert(token.to_string());
            }
        }
    }
    keywords
}

fn candidate_text(candidate: &Candidate) -> String {
    let mut blob = candidate.trail.tags.join(" ");
    blob.push(' ');
    blob.push_str(&candidate.trail.description);
    blob.to_lowercase()
}

/// Keep candidates whose tags or description mention any expanded keyword.
/// Scenery is advisory: an absent wish is a pass-through, and a wish that
/// would empty the set returns the input unchanged instead.
pub fn match_scenery(candidates: Vec<Candidate>, scenery: Option<&str>) -> Vec<Candidate> {
    let scenery = match scenery {
        Some(s) if !s.trim().is_empty() => s,
        _ => return candidates,
    };

    let keywords = keyword_set(scenery);
    if keywords.is_empty() {
        return candidates;
    }

    let retained: Vec<Candidate> = candidates
        .iter()
        .filter(|candidate| {
            let text = candidate_text(candidate);
            keywords.iter().any(|keyword| text.contains(keyword.as_str()))
        })
        .cloned()
        .collect();

    debug!(
        input = candidates.len(),
        retained = retained.len(),
        keywords = keywords.len(),
        "scenery match applied"
    );

    if retained.is_empty() {
        return candidates;
    }
    retained
}
