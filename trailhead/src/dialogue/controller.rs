// DialogueController: one utterance in, one assistant reply out.
//
// The controller owns the session's ConversationState and is the only code
// that mutates it. Collaborator failures never escape a turn; every one of
// them degrades to a documented canned reply or template.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::capabilities::{describe_weather_code, PlacesProvider, WeatherProvider, WeatherReport};
use crate::catalog::{Difficulty, Trail, TrailCatalog};
use crate::llm::LlmProvider;
use crate::planner::{filter_trails, match_scenery, TrailQuery};
use crate::reasoner::{FilterCounts, PreferenceInputs, SelectionReasoner};

use super::presenter::DialoguePresenter;
use super::types::{AmenityChoice, AwaitingInput, ConversationState};

/// Search radius for post-hike amenities.
const AMENITY_RADIUS_M: u32 = 20_000;

pub struct DialogueController {
    catalog: Arc<TrailCatalog>,
    reasoner: SelectionReasoner,
    narrator: Arc<dyn LlmProvider>,
    weather: Arc<dyn WeatherProvider>,
    places: Arc<dyn PlacesProvider>,
    presenter: DialoguePresenter,
    state: ConversationState,
}

impl DialogueController {
    pub fn new(
        catalog: Arc<TrailCatalog>,
        llm: Arc<dyn LlmProvider>,
        weather: Arc<dyn WeatherProvider>,
        places: Arc<dyn PlacesProvider>,
    ) -> Self {
        Self {
            catalog,
            reasoner: SelectionReasoner::new(llm.clone()),
            narrator: llm,
            weather,
            places,
            presenter: DialoguePresenter::new(),
            state: ConversationState::new(),
        }
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    /// The question the session opens with.
    pub fn opening_prompt(&self) -> String {
        self.presenter.prompt_difficulty()
    }

    /// Process one user utterance and produce the next assistant reply.
    /// Never fails; upstream problems degrade to canned replies.
    pub async fn handle_turn(&mut self, utterance: &str) -> String {
        let trimmed = utterance.trim();
        let lowered = trimmed.to_lowercase();
        debug!(session = %self.state.id, state = ?self.state.awaiting_input, "processing turn");

        match self.state.awaiting_input {
            AwaitingInput::Difficulty => self.collect_difficulty(&lowered),
            AwaitingInput::MaxDistance => self.collect_max_distance(trimmed),
            AwaitingInput::Scenery => self.collect_scenery(trimmed),
            AwaitingInput::RouteType => self.run_selection(trimmed).await,
            AwaitingInput::ConfirmSelection => self.confirm_selection(&lowered).await,
            AwaitingInput::ConfirmAmenities => self.confirm_amenities(&lowered).await,
            AwaitingInput::Done => self.presenter.done_fallback().to_string(),
        }
    }

    fn collect_difficulty(&mut self, lowered: &str) -> String {
        match Difficulty::scan(lowered) {
            Some(level) => {
                self.state.difficulty = Some(level);
                self.state.awaiting_input = AwaitingInput::MaxDistance;
                self.presenter.prompt_max_distance().to_string()
            }
            None => self.presenter.prompt_difficulty(),
        }
    }

    fn collect_max_distance(&mut self, raw: &str) -> String {
        match raw.parse::<f64>() {
            Ok(km) if km.is_finite() => {
                self.state.max_distance = Some(km);
                self.state.awaiting_input = AwaitingInput::Scenery;
                self.presenter.prompt_scenery().to_string()
            }
            _ => self.presenter.reprompt_max_distance().to_string(),
        }
    }

    fn collect_scenery(&mut self, raw: &str) -> String {
        self.state.scenery = if raw.is_empty() {
            None
        } else {
            Some(raw.to_string())
        };
        self.state.awaiting_input = AwaitingInput::RouteType;
        self.presenter.prompt_route_type().to_string()
    }

    /// The RouteType transition: run the selection pipeline and either
    /// recommend a trail or end the session with an apology.
    async fn run_selection(&mut self, raw: &str) -> String {
        self.state.route_type = if raw.is_empty() {
            None
        } else {
            Some(raw.to_string())
        };

        // Distance stays soft here so no valid trail is dropped purely on
        // distance; the slack only steers the fallback ranking.
        let query = TrailQuery {
            difficulty: self.state.difficulty,
            max_distance: self.state.max_distance,
            route_type: self.state.route_type.clone(),
            soft_distance: true,
        };
        let constrained = filter_trails(&self.catalog, &query);
        let after_constraints = constrained.len();
        let candidates = match_scenery(constrained, self.state.scenery.as_deref());
        let filter_counts = FilterCounts {
            after_constraints,
            after_scenery: candidates.len(),
        };

        let inputs = PreferenceInputs {
            difficulty: self.state.difficulty,
            max_distance: self.state.max_distance,
            scenery: self.state.scenery.clone(),
            route_type: self.state.route_type.clone(),
        };

        match self.reasoner.select(&candidates, &inputs, filter_counts).await {
            Some((trail, explanation)) => {
                let description = self.describe_trail(&trail).await;
                let reply = self
                    .presenter
                    .recommendation(&description, &explanation.reasoning);
                self.state.selected_trail = Some(trail);
                self.state.selection_reason = Some(explanation);
                self.state.awaiting_input = AwaitingInput::ConfirmSelection;
                reply
            }
            None => {
                self.state.awaiting_input = AwaitingInput::Done;
                self.presenter.no_trails_apology().to_string()
            }
        }
    }

    async fn confirm_selection(&mut self, lowered: &str) -> String {
        if !matches!(lowered, "yes" | "y") {
            self.state.awaiting_input = AwaitingInput::Done;
            return self.presenter.decline_selection().to_string();
        }

        // ConfirmSelection is only reachable with a selected trail in place
        let trail = match self.state.selected_trail.clone() {
            Some(trail) => trail,
            None => {
                self.state.awaiting_input = AwaitingInput::Done;
                return self.presenter.done_fallback().to_string();
            }
        };

        let report = self.weather.current(trail.lat, trail.lon).await;
        let narrative = self
            .narrate(&weather_prompt(&trail, &report), "weather narrative")
            .await;
        self.state.awaiting_input = AwaitingInput::ConfirmAmenities;
        self.presenter.weather_message(&trail, &report, narrative)
    }

    async fn confirm_amenities(&mut self, lowered: &str) -> String {
        // every outcome of this state ends the session
        self.state.awaiting_input = AwaitingInput::Done;

        let choice = match AmenityChoice::parse(lowered) {
            Some(choice) => choice,
            None => return self.presenter.decline_amenities().to_string(),
        };
        let trail = match self.state.selected_trail.clone() {
            Some(trail) => trail,
            None => return self.presenter.done_fallback().to_string(),
        };

        let places = self
            .places
            .nearby(trail.lat, trail.lon, AMENITY_RADIUS_M, choice.kinds())
            .await;
        if places.is_empty() {
            return self.presenter.no_places_apology(choice, AMENITY_RADIUS_M);
        }

        let listing = self.presenter.places_list(&places);
        let narrative = self.narrate(&places_prompt(&listing), "amenity summary").await;
        self.presenter.places_message(narrative, &places)
    }

    async fn describe_trail(&self, trail: &Trail) -> String {
        match self.narrate(&recommendation_prompt(trail), "trail description").await {
            Some(text) => text,
            None => self.presenter.fallback_description(trail),
        }
    }

    /// One narrative-generation call; a failure or empty reply means "use
    /// the template".
    async fn narrate(&self, prompt: &str, purpose: &str) -> Option<String> {
        match self.narrator.generate_text(prompt).await {
            Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Ok(_) => {
                warn!(purpose, "narrative generation returned empty text, using template");
                None
            }
            Err(err) => {
                warn!(
                    purpose,
                    provider = self.narrator.name(),
                    error = %err,
                    "narrative generation unavailable, using template"
                );
                None
            }
        }
    }
}

fn recommendation_prompt(trail: &Trail) -> String {
    format!(
        "You are a friendly hiking guide. Write a cheerful, natural paragraph \
         recommending this trail:\n\n\
         Name: {}\nDifficulty: {}\nDistance: {} km\nRoute type: {}\nTags: {}\n\n\
         Include the tags naturally and make it engaging.",
        trail.name,
        trail.difficulty,
        trail.distance_km,
        if trail.route.is_empty() {
            "unspecified"
        } else {
            trail.route.as_str()
        },
        trail.tags.join(", "),
    )
}

fn weather_prompt(trail: &Trail, report: &WeatherReport) -> String {
    format!(
        "You are a friendly hiking assistant. Here is the current weather at {}:\n\
         Temperature: {} C\nWind speed: {} km/h\nCondition: {}\n\n\
         Write a short, cheerful message including packing advice.",
        trail.name,
        report.temperature_c,
        report.windspeed_kmh,
        describe_weather_code(report.weather_code),
    )
}

fn places_prompt(listing: &str) -> String {
    format!(
        "You are a friendly local guide. Recommend these places naturally to \
         hikers:\n{listing}\n\n\
         Write a cheerful paragraph introducing these places as post-hike options."
    )
}
