// Selection reasoning: delegate the pick to the external reasoning service,
// fall back to a deterministic ranking when the call fails or its reply
// cannot be trusted. The fallback is a first-class branch, not an exception
// handler: `ReasoningPath` records which branch answered.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::catalog::{Difficulty, Trail};
use crate::llm::{LlmError, LlmProvider};
use crate::planner::Candidate;

/// Narrative attached when the deterministic fallback picks the trail.
pub const FALLBACK_REASONING: &str = "Selected deterministically: the trail closest to your \
     distance budget, with richer tagging breaking ties.";

/// The preference inputs a selection was computed from.
#[derive(Clone, Debug, Serialize)]
pub struct PreferenceInputs {
    pub difficulty: Option<Difficulty>,
    pub max_distance: Option<f64>,
    pub scenery: Option<String>,
    pub route_type: Option<String>,
}

/// Candidate counts after each filtering stage, supplied by the caller.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct FilterCounts {
    pub after_constraints: usize,
    pub after_scenery: usize,
}

/// Which branch produced the selection.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum ReasoningPath {
    /// The external reasoning call returned a usable structured reply.
    External,
    /// Deterministic heuristic; carries why the external path was skipped.
    Fallback { reason: String },
}

/// Structured explanation of one selection event. Immutable once built.
#[derive(Clone, Debug, Serialize)]
pub struct SelectionExplanation {
    pub inputs: PreferenceInputs,
    pub filter_counts: FilterCounts,
    pub path: ReasoningPath,
    pub reasoning: String,
    pub selected_trail: String,
}

/// Shape the reasoning service is asked to return.
#[derive(Debug, Deserialize)]
struct ReasonerReply {
    best_trail: Option<String>,
    reasoning: Option<String>,
}

#[derive(Debug, thiserror::Error)]
enum ReasonerError {
    #[error("reasoning call failed: {0}")]
    Provider(#[from] LlmError),
    #[error("reply carried no JSON object")]
    NoJson,
    #[error("reply JSON did not parse: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("reply JSON missing field '{0}'")]
    MissingField(&'static str),
}

pub struct SelectionReasoner {
    provider: Arc<dyn LlmProvider>,
}

impl SelectionReasoner {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    /// Choose one trail from the candidate set. Returns `None` only for an
    /// empty candidate set; every other condition resolves to a selection.
    /// The returned trail is always a member of `candidates`.
    pub async fn select(
        &self,
        candidates: &[Candidate],
        inputs: &PreferenceInputs,
        filter_counts: FilterCounts,
    ) -> Option<(Trail, SelectionExplanation)> {
        if candidates.is_empty() {
            return None;
        }

        let (chosen_name, reasoning, path) = match self.ask_reasoner(candidates, inputs).await {
            Ok((name, reasoning)) => {
                debug!(trail = %name, "external reasoning accepted");
                (name, reasoning, ReasoningPath::External)
            }
            Err(err) => {
                warn!(
                    provider = self.provider.name(),
                    error = %err,
                    "external reasoning unavailable, using fallback ranking"
                );
                let pick = fallback_pick(candidates)?;
                (
                    pick.trail.name.clone(),
                    FALLBACK_REASONING.to_string(),
                    ReasoningPath::Fallback {
                        reason: err.to_string(),
                    },
                )
            }
        };

        // Hard contract: never hand back a trail outside the candidate set.
        // A name miss (hallucinated or mangled) resolves to the first candidate.
        let trail = match candidates.iter().find(|c| c.trail.name == chosen_name) {
            Some(candidate) => candidate.trail.clone(),
            None => {
                warn!(trail = %chosen_name, "chosen name not in candidate set, defaulting to first");
                candidates[0].trail.clone()
            }
        };

        let explanation = SelectionExplanation {
            inputs: inputs.clone(),
            filter_counts,
            path,
            reasoning,
            selected_trail: trail.name.clone(),
        };
        Some((trail, explanation))
    }

    async fn ask_reasoner(
        &self,
        candidates: &[Candidate],
        inputs: &PreferenceInputs,
    ) -> Result<(String, String), ReasonerError> {
        let prompt = build_prompt(candidates, inputs);
        let reply = self.provider.generate_text(&prompt).await?;
        parse_reply(&reply)
    }
}

/// Scan the raw reply for the outermost braces and parse the span between
/// them. Anything short of the full expected shape counts as a call failure.
fn parse_reply(reply: &str) -> Result<(String, String), ReasonerError> {
    let start = reply.find('{').ok_or(ReasonerError::NoJson)?;
    let end = reply.rfind('}').ok_or(ReasonerError::NoJson)?;
    if end < start {
        return Err(ReasonerError::NoJson);
    }

    let parsed: ReasonerReply = serde_json::from_str(&reply[start..=end])?;
    let best_trail = parsed
        .best_trail
        .ok_or(ReasonerError::MissingField("best_trail"))?;
    let reasoning = parsed
        .reasoning
        .ok_or(ReasonerError::MissingField("reasoning"))?;
    Ok((best_trail, reasoning))
}

/// Deterministic ranking: ascending distance slack (missing slack counts as
/// exactly on budget), ties broken by more tags first. Catalog order wins
/// remaining ties.
fn fallback_pick(candidates: &[Candidate]) -> Option<&Candidate> {
    candidates.iter().min_by(|a, b| {
        let slack_a = a.distance_slack.unwrap_or(0.0);
        let slack_b = b.distance_slack.unwrap_or(0.0);
        slack_a
            .total_cmp(&slack_b)
            .then_with(|| b.trail.tags.len().cmp(&a.trail.tags.len()))
    })
}

fn build_prompt(candidates: &[Candidate], inputs: &PreferenceInputs) -> String {
    let roster = candidates
        .iter()
        .map(|candidate| {
            let trail = &candidate.trail;
            let slack = candidate
                .distance_slack
                .map(|s| format!(", distance slack {:+.1} km", s))
                .unwrap_or_default();
            format!(
                "- {} (difficulty: {}, distance: {:.1} km{}, route: {}, tags: {})",
                trail.name,
                trail.difficulty,
                trail.distance_km,
                slack,
                display_or(&trail.route, "unspecified"),
                trail.tags.join(", "),
            )
        })
        .join("\n");

    format!(
        "You are a hiking assistant choosing exactly one trail for a user.\n\n\
         Candidate trails:\n{roster}\n\n\
         User preferences: difficulty {}, max distance {}, scenery {}, route type {}.\n\n\
         Reply with a single JSON object containing exactly two fields: \
         \"best_trail\" (the chosen trail name, verbatim from the list) and \
         \"reasoning\" (one or two sentences explaining the choice).",
        inputs
            .difficulty
            .map(|d| d.label().to_string())
            .unwrap_or_else(|| "any".to_string()),
        inputs
            .max_distance
            .map(|km| format!("{} km", km))
            .unwrap_or_else(|| "unbounded".to_string()),
        display_or(inputs.scenery.as_deref().unwrap_or(""), "no preference"),
        display_or(inputs.route_type.as_deref().unwrap_or(""), "no preference"),
    )
}

fn display_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() {
        fallback
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{StubLlmProvider, StubReply};

    fn candidate(name: &str, slack: Option<f64>, tags: &[&str]) -> Candidate {
        Candidate {
            trail: Trail {
                name: name.to_string(),
                difficulty: Difficulty::Moderate,
                distance_km: 8.0,
                route: "loop".to_string(),
                elevation_gain_m: 350.0,
                tags: tags.iter().map(|t| t.to_string()).collect(),
                description: String::new(),
                lat: 54.5,
                lon: -3.1,
                region: String::new(),
            },
            distance_slack: slack,
        }
    }

    fn inputs() -> PreferenceInputs {
        PreferenceInputs {
            difficulty: Some(Difficulty::Moderate),
            max_distance: Some(10.0),
            scenery: Some("lake".to_string()),
            route_type: Some("loop".to_string()),
        }
    }

    fn counts() -> FilterCounts {
        FilterCounts {
            after_constraints: 2,
            after_scenery: 2,
        }
    }

    #[test]
    fn test_empty_candidates_yield_none() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let reasoner = SelectionReasoner::new(Arc::new(StubLlmProvider::new()));
            assert!(reasoner.select(&[], &inputs(), counts()).await.is_none());
        });
    }

    #[test]
    fn test_external_reply_is_authoritative() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let provider = StubLlmProvider::with_script(vec![StubReply::Reply(
                "Sure! {\"best_trail\": \"Summit Path\", \"reasoning\": \"Best views.\"} done"
                    .to_string(),
            )]);
            let reasoner = SelectionReasoner::new(Arc::new(provider));
            let candidates = vec![
                candidate("Lakeside Loop", Some(-1.0), &["lake"]),
                candidate("Summit Path", Some(2.0), &["peak"]),
            ];

            let (trail, explanation) = reasoner
                .select(&candidates, &inputs(), counts())
                .await
                .unwrap();
            assert_eq!(trail.name, "Summit Path");
            assert_eq!(explanation.path, ReasoningPath::External);
            assert_eq!(explanation.reasoning, "Best views.");
            assert_eq!(explanation.selected_trail, "Summit Path");
        });
    }

    #[test]
    fn test_fallback_prefers_lowest_slack() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            // no scripted replies: the external call fails immediately
            let reasoner = SelectionReasoner::new(Arc::new(StubLlmProvider::new()));
            let candidates = vec![
                candidate("Over Budget", Some(2.0), &["a", "b", "c"]),
                candidate("Within Budget", Some(-1.0), &[]),
            ];

            let (trail, explanation) = reasoner
                .select(&candidates, &inputs(), counts())
                .await
                .unwrap();
            assert_eq!(trail.name, "Within Budget");
            assert!(matches!(explanation.path, ReasoningPath::Fallback { .. }));
            assert_eq!(explanation.reasoning, FALLBACK_REASONING);
        });
    }

    #[test]
    fn test_fallback_breaks_slack_ties_by_tag_count() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let reasoner = SelectionReasoner::new(Arc::new(StubLlmProvider::new()));
            let candidates = vec![
                candidate("Sparse", None, &["fell"]),
                candidate("Rich", None, &["fell", "lake", "forest"]),
            ];

            let (trail, _) = reasoner
                .select(&candidates, &inputs(), counts())
                .await
                .unwrap();
            assert_eq!(trail.name, "Rich");
        });
    }

    #[test]
    fn test_hallucinated_name_defaults_to_first_candidate() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let provider = StubLlmProvider::with_script(vec![StubReply::Reply(
                "{\"best_trail\": \"Imaginary Ridge\", \"reasoning\": \"Sounds nice.\"}"
                    .to_string(),
            )]);
            let reasoner = SelectionReasoner::new(Arc::new(provider));
            let candidates = vec![
                candidate("First", Some(0.5), &[]),
                candidate("Second", Some(-3.0), &[]),
            ];

            let (trail, explanation) = reasoner
                .select(&candidates, &inputs(), counts())
                .await
                .unwrap();
            assert_eq!(trail.name, "First");
            // the reply itself parsed, so the external path stands
            assert_eq!(explanation.path, ReasoningPath::External);
        });
    }

    #[test]
    fn test_name_match_is_case_sensitive() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let provider = StubLlmProvider::with_script(vec![StubReply::Reply(
                "{\"best_trail\": \"lakeside loop\", \"reasoning\": \"Close enough?\"}"
                    .to_string(),
            )]);
            let reasoner = SelectionReasoner::new(Arc::new(provider));
            let candidates = vec![
                candidate("First", None, &[]),
                candidate("Lakeside Loop", None, &[]),
            ];

            let (trail, _) = reasoner
                .select(&candidates, &inputs(), counts())
                .await
                .unwrap();
            assert_eq!(trail.name, "First");
        });
    }

    #[test]
    fn test_unparsable_replies_fall_back() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            for reply in [
                "no braces at all",
                "{not json}",
                "{\"reasoning\": \"missing the trail name\"}",
                "{\"best_trail\": \"First\"}",
            ] {
                let provider =
                    StubLlmProvider::with_script(vec![StubReply::Reply(reply.to_string())]);
                let reasoner = SelectionReasoner::new(Arc::new(provider));
                let candidates = vec![
                    candidate("First", Some(1.0), &[]),
                    candidate("Second", Some(-1.0), &[]),
                ];

                let (trail, explanation) = reasoner
                    .select(&candidates, &inputs(), counts())
                    .await
                    .unwrap();
                assert_eq!(trail.name, "Second", "reply: {reply}");
                assert!(
                    matches!(explanation.path, ReasoningPath::Fallback { .. }),
                    "reply: {reply}"
                );
            }
        });
    }

    #[test]
    fn test_prompt_lists_candidates_and_slack() {
        let candidates = vec![candidate("Lakeside Loop", Some(-2.0), &["lake", "forest"])];
        let prompt = build_prompt(&candidates, &inputs());
        assert!(prompt.contains("Lakeside Loop"));
        assert!(prompt.contains("distance slack -2.0 km"));
        assert!(prompt.contains("lake, forest"));
        assert!(prompt.contains("best_trail"));
    }
}
