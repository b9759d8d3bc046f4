// Conversation state for the guided dialogue.

use serde::Serialize;
use uuid::Uuid;

use crate::capabilities::AmenityKind;
use crate::catalog::{Difficulty, Trail};
use crate::reasoner::SelectionExplanation;

/// Which prompt the session is waiting on. Exactly one node is active at a
/// time; preferences are collected strictly in declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum AwaitingInput {
    /// Collecting the difficulty level
    Difficulty,
    /// Collecting the distance budget in kilometers
    MaxDistance,
    /// Collecting the optional scenery wish
    Scenery,
    /// Collecting the route-type preference; answering runs the pipeline
    RouteType,
    /// Offering the weather lookup for the selected trail
    ConfirmSelection,
    /// Offering the nearby cafe/pub lookup
    ConfirmAmenities,
    /// Terminal: every further input gets a static fallback line
    Done,
}

/// One dialogue session. Mutated exclusively by the controller, one turn at
/// a time; not safe for concurrent access.
#[derive(Clone, Debug, Serialize)]
pub struct ConversationState {
    pub id: String,
    pub awaiting_input: AwaitingInput,
    pub difficulty: Option<Difficulty>,
    pub max_distance: Option<f64>,
    pub scenery: Option<String>,
    pub route_type: Option<String>,
    /// Set only after RouteType is collected and filtering succeeds
    pub selected_trail: Option<Trail>,
    pub selection_reason: Option<SelectionExplanation>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self {
            id: format!("dialogue-{}", Uuid::new_v4()),
            awaiting_input: AwaitingInput::Difficulty,
            difficulty: None,
            max_distance: None,
            scenery: None,
            route_type: None,
            selected_trail: None,
            selection_reason: None,
        }
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new()
    }
}

/// Amenity categories derivable from a ConfirmAmenities utterance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AmenityChoice {
    Cafes,
    Pubs,
    Both,
}

impl AmenityChoice {
    /// Parse an affirmative or category token; anything else is a decline.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "yes" | "y" => Some(AmenityChoice::Both),
            "cafe" | "cafes" => Some(AmenityChoice::Cafes),
            "pub" | "pubs" => Some(AmenityChoice::Pubs),
            _ => None,
        }
    }

    pub fn kinds(&self) -> &'static [AmenityKind] {
        match self {
            AmenityChoice::Cafes => &[AmenityKind::Cafe],
            AmenityChoice::Pubs => &[AmenityKind::Pub],
            AmenityChoice::Both => &[AmenityKind::Cafe, AmenityKind::Pub],
        }
    }

    /// Label used in user-facing messages.
    pub fn label(&self) -> &'static str {
        match self {
            AmenityChoice::Cafes => "cafes",
            AmenityChoice::Pubs => "pubs",
            AmenityChoice::Both => "cafes or pubs",
        }
    }
}
