// Nearby-amenity lookup backed by the OpenStreetMap Overpass API.

use async_trait::async_trait;
use itertools::Itertools;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::warn;

use super::CapabilityError;

/// Results are truncated to the closest few places.
pub const MAX_RESULTS: usize = 3;

/// OSM amenity categories the dialogue can ask for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AmenityKind {
    Cafe,
    Pub,
}

impl AmenityKind {
    /// The OSM `amenity` tag value.
    pub fn tag(&self) -> &'static str {
        match self {
            AmenityKind::Cafe => "cafe",
            AmenityKind::Pub => "pub",
        }
    }
}

/// One amenity hit, closest first in any returned list.
#[derive(Clone, Debug, PartialEq)]
pub struct NearbyPlace {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub distance_km: f64,
    pub description: String,
}

#[async_trait]
pub trait PlacesProvider: Send + Sync {
    /// Find amenities around a point, sorted ascending by distance and
    /// truncated to [`MAX_RESULTS`]. Never fails; any upstream problem
    /// yields an empty list.
    async fn nearby(
        &self,
        lat: f64,
        lon: f64,
        radius_m: u32,
        kinds: &[AmenityKind],
    ) -> Vec<NearbyPlace>;
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PlacesConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl Default for PlacesConfig {
    fn default() -> Self {
        Self {
            base_url: "https://overpass-api.de/api/interpreter".to_string(),
            timeout_seconds: 30,
        }
    }
}

pub struct OverpassPlaces {
    config: PlacesConfig,
    client: reqwest::Client,
}

impl OverpassPlaces {
    pub fn new(config: PlacesConfig) -> Result<Self, CapabilityError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { config, client })
    }

    async fn fetch(
        &self,
        lat: f64,
        lon: f64,
        radius_m: u32,
        kinds: &[AmenityKind],
    ) -> Result<Vec<NearbyPlace>, CapabilityError> {
        let query = build_query(lat, lon, radius_m, kinds);
        let response: OverpassResponse = self
            .client
            .post(&self.config.base_url)
            .body(query)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(places_from_elements(response.elements, lat, lon))
    }
}

#[async_trait]
impl PlacesProvider for OverpassPlaces {
    async fn nearby(
        &self,
        lat: f64,
        lon: f64,
        radius_m: u32,
        kinds: &[AmenityKind],
    ) -> Vec<NearbyPlace> {
        match self.fetch(lat, lon, radius_m, kinds).await {
            Ok(places) => places,
            Err(err) => {
                warn!(error = %err, lat, lon, "amenity lookup failed, returning empty list");
                Vec::new()
            }
        }
    }
}

/// Construct an Overpass QL query for one or more amenity kinds.
fn build_query(lat: f64, lon: f64, radius_m: u32, kinds: &[AmenityKind]) -> String {
    let filters: String = kinds
        .iter()
        .map(|kind| {
            format!(
                "node[\"amenity\"=\"{}\"](around:{},{},{});",
                kind.tag(),
                radius_m,
                lat,
                lon
            )
        })
        .collect();
    format!("[out:json][timeout:25];{filters}out;")
}

#[derive(Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Deserialize)]
struct OverpassElement {
    lat: Option<f64>,
    lon: Option<f64>,
    // BTreeMap keeps the rendered description stable
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

fn places_from_elements(
    elements: Vec<OverpassElement>,
    lat: f64,
    lon: f64,
) -> Vec<NearbyPlace> {
    let mut places = Vec::new();
    for element in elements {
        let (place_lat, place_lon) = match (element.lat, element.lon) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => continue,
        };
        let name = element
            .tags
            .get("name")
            .cloned()
            .unwrap_or_else(|| "Unknown".to_string());
        let description = element
            .tags
            .iter()
            .map(|(key, value)| format!("{key}: {value}"))
            .join(", ");
        let distance_km = round2(haversine_km(lat, lon, place_lat, place_lon));
        places.push(NearbyPlace {
            name,
            lat: place_lat,
            lon: place_lon,
            distance_km,
            description,
        });
    }
    places.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    places.truncate(MAX_RESULTS);
    places
}

/// Great-circle distance in kilometers.
fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    EARTH_RADIUS_KM * 2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
