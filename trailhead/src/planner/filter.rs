// Constraint filter: hard difficulty/route matches, hard-or-soft distance.

use tracing::debug;

use crate::catalog::{Difficulty, Trail, TrailCatalog};

/// Result cap when max distance excludes trails outright.
pub const HARD_RESULT_CAP: usize = 5;
/// Result cap in soft-distance mode, where nothing is excluded on distance.
pub const SOFT_RESULT_CAP: usize = 10;

/// Constraints collected from the dialogue. Every field is optional; an
/// empty query passes the whole catalog through (up to the cap).
#[derive(Clone, Debug, Default)]
pub struct TrailQuery {
    pub difficulty: Option<Difficulty>,
    pub max_distance: Option<f64>,
    pub route_type: Option<String>,
    /// When set, max_distance annotates instead of excluding.
    pub soft_distance: bool,
}

/// A trail surviving the constraint filter, carrying the ephemeral ranking
/// annotation. Slack never flows back into the shared catalog.
#[derive(Clone, Debug)]
pub struct Candidate {
    pub trail: Trail,
    /// distance minus the requested maximum; negative or zero means within
    /// budget. Present only in soft-distance mode.
    pub distance_slack: Option<f64>,
}

/// Apply the query over the catalog in insertion order. Difficulty and route
/// type are hard, case-insensitive exact matches. An empty catalog or zero
/// matches is a valid result, not an error.
pub fn filter_trails(catalog: &TrailCatalog, query: &TrailQuery) -> Vec<Candidate> {
    let cap = if query.soft_distance {
        SOFT_RESULT_CAP
    } else {
        HARD_RESULT_CAP
    };

    let mut candidates = Vec::new();
    for trail in catalog.trails() {
        if let Some(difficulty) = query.difficulty {
            if trail.difficulty != difficulty {
                continue;
            }
        }
        if let Some(route) = query.route_type.as_deref() {
            if !trail.route.eq_ignore_ascii_case(route) {
                continue;
            }
        }

        let mut distance_slack = None;
        if let Some(max_distance) = query.max_distance {
            if query.soft_distance {
                distance_slack = Some(trail.distance_km - max_distance);
            } else if trail.distance_km > max_distance {
                continue;
            }
        }

        candidates.push(Candidate {
            trail: trail.clone(),
            distance_slack,
        });
        if candidates.len() == cap {
            break;
        }
    }

    debug!(
        total = catalog.len(),
        surviving = candidates.len(),
        soft_distance = query.soft_distance,
        "constraint filter applied"
    );
    candidates
}
