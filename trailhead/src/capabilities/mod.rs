// External lookup collaborators: current weather and nearby amenities.
//
// Both traits promise never-raise semantics at the call boundary: an
// implementation absorbs upstream failures and returns its documented
// neutral value (zero-valued report, empty list). There is no retry.

pub mod places;
pub mod weather;

pub use places::{AmenityKind, NearbyPlace, OverpassPlaces, PlacesConfig, PlacesProvider};
pub use weather::{
    describe_weather_code, OpenMeteoWeather, WeatherConfig, WeatherProvider, WeatherReport,
};

#[derive(Debug, thiserror::Error)]
pub enum CapabilityError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected payload: {0}")]
    Payload(String),
}
