// End-to-end dialogue flow against the public API, with substitute
// collaborators standing in for every external service.

use async_trait::async_trait;
use std::sync::Arc;

use trailhead::capabilities::{
    AmenityKind, NearbyPlace, PlacesProvider, WeatherProvider, WeatherReport,
};
use trailhead::catalog::{Difficulty, Trail, TrailCatalog};
use trailhead::dialogue::{AwaitingInput, DialogueController};
use trailhead::llm::{StubLlmProvider, StubReply};

struct StaticWeather;

#[async_trait]
impl WeatherProvider for StaticWeather {
    async fn current(&self, _lat: f64, _lon: f64) -> WeatherReport {
        WeatherReport {
            temperature_c: 9.0,
            windspeed_kmh: 25.0,
            weather_code: 61,
        }
    }
}

struct StaticPlaces;

#[async_trait]
impl PlacesProvider for StaticPlaces {
    async fn nearby(
        &self,
        _lat: f64,
        _lon: f64,
        _radius_m: u32,
        _kinds: &[AmenityKind],
    ) -> Vec<NearbyPlace> {
        vec![NearbyPlace {
            name: "The Mortal Man".to_string(),
            lat: 54.41,
            lon: -2.92,
            distance_km: 2.1,
            description: "amenity: pub".to_string(),
        }]
    }
}

fn catalog() -> Arc<TrailCatalog> {
    Arc::new(TrailCatalog::new(vec![
        Trail {
            name: "Tarn Circuit".to_string(),
            difficulty: Difficulty::Easy,
            distance_km: 6.5,
            route: "loop".to_string(),
            elevation_gain_m: 180.0,
            tags: vec!["lake".to_string(), "peaceful".to_string()],
            description: "A gentle circuit around the tarn.".to_string(),
            lat: 54.40,
            lon: -2.95,
            region: "Lake District".to_string(),
        },
        Trail {
            name: "Crag Traverse".to_string(),
            difficulty: Difficulty::Hard,
            distance_km: 15.0,
            route: "out-and-back".to_string(),
            elevation_gain_m: 900.0,
            tags: vec!["mountain".to_string(), "view".to_string()],
            description: String::new(),
            lat: 54.46,
            lon: -3.02,
            region: "Lake District".to_string(),
        },
    ]))
}

#[tokio::test]
async fn full_session_from_preferences_to_amenities() {
    let llm = StubLlmProvider::with_script(vec![
        // reasoner reply
        StubReply::Reply(
            "{\"best_trail\": \"Tarn Circuit\", \"reasoning\": \"Matches your easy lakeside wish.\"}"
                .to_string(),
        ),
        // description, weather narrative, and amenity summary all fail over
        // to templates
        StubReply::Failure,
        StubReply::Failure,
        StubReply::Failure,
    ]);
    let mut controller = DialogueController::new(
        catalog(),
        Arc::new(llm),
        Arc::new(StaticWeather),
        Arc::new(StaticPlaces),
    );

    let reply = controller.handle_turn("easy").await;
    assert!(reply.contains("kilometers"));

    let reply = controller.handle_turn("8").await;
    assert!(reply.contains("scenery"));

    let reply = controller.handle_turn("lake").await;
    assert!(reply.contains("route type"));

    let reply = controller.handle_turn("loop").await;
    assert!(reply.contains("Matches your easy lakeside wish."));
    assert_eq!(
        controller.state().selected_trail.as_ref().map(|t| t.name.as_str()),
        Some("Tarn Circuit")
    );

    let reply = controller.handle_turn("yes").await;
    // weather template renders the substitute report
    assert!(reply.contains("Slight rain"));
    assert!(reply.contains("9.0"));

    let reply = controller.handle_turn("pub").await;
    assert!(reply.contains("The Mortal Man"));
    assert_eq!(controller.state().awaiting_input, AwaitingInput::Done);
}

#[tokio::test]
async fn offline_session_degrades_to_deterministic_selection() {
    let mut controller = DialogueController::new(
        catalog(),
        Arc::new(StubLlmProvider::new()),
        Arc::new(StaticWeather),
        Arc::new(StaticPlaces),
    );

    controller.handle_turn("easy").await;
    controller.handle_turn("8").await;
    controller.handle_turn("").await;
    let reply = controller.handle_turn("loop").await;

    assert_eq!(
        controller.state().selected_trail.as_ref().map(|t| t.name.as_str()),
        Some("Tarn Circuit")
    );
    assert!(reply.contains("Reason for selection"));

    let explanation = controller.state().selection_reason.as_ref().unwrap();
    assert_eq!(explanation.selected_trail, "Tarn Circuit");
}
