// Current-weather lookup backed by the Open-Meteo forecast API.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

use super::CapabilityError;

/// Current conditions at a point. Zero-valued when the lookup failed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WeatherReport {
    pub temperature_c: f64,
    pub windspeed_kmh: f64,
    pub weather_code: i64,
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Fetch current conditions. Never fails; any upstream problem yields
    /// the zero-valued report.
    async fn current(&self, lat: f64, lon: f64) -> WeatherReport;
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.open-meteo.com/v1/forecast".to_string(),
            timeout_seconds: 5,
        }
    }
}

pub struct OpenMeteoWeather {
    config: WeatherConfig,
    client: reqwest::Client,
}

impl OpenMeteoWeather {
    pub fn new(config: WeatherConfig) -> Result<Self, CapabilityError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { config, client })
    }

    async fn fetch(&self, lat: f64, lon: f64) -> Result<WeatherReport, CapabilityError> {
        let response: ForecastResponse = self
            .client
            .get(&self.config.base_url)
            .query(&[("latitude", lat), ("longitude", lon)])
            .query(&[("current_weather", "true")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let current = response
            .current_weather
            .ok_or_else(|| CapabilityError::Payload("missing current_weather".to_string()))?;
        Ok(WeatherReport {
            temperature_c: current.temperature,
            windspeed_kmh: current.windspeed,
            weather_code: current.weathercode,
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoWeather {
    async fn current(&self, lat: f64, lon: f64) -> WeatherReport {
        match self.fetch(lat, lon).await {
            Ok(report) => report,
            Err(err) => {
                warn!(error = %err, lat, lon, "weather lookup failed, returning zero-valued report");
                WeatherReport::default()
            }
        }
    }
}

#[derive(Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    current_weather: Option<CurrentWeather>,
}

#[derive(Deserialize)]
struct CurrentWeather {
    #[serde(default)]
    temperature: f64,
    #[serde(default)]
    windspeed: f64,
    #[serde(default)]
    weathercode: i64,
}

/// Map an Open-Meteo weather code to a short condition label.
pub fn describe_weather_code(code: i64) -> &'static str {
    match code {
        0 => "Clear",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        51 => "Light drizzle",
        53 => "Moderate drizzle",
        55 => "Dense drizzle",
        56 => "Light freezing drizzle",
        57 => "Dense freezing drizzle",
        61 => "Slight rain",
        63 => "Moderate rain",
        65 => "Heavy rain",
        66 => "Light freezing rain",
        67 => "Heavy freezing rain",
        71 => "Slight snow fall",
        73 => "Moderate snow fall",
        75 => "Heavy snow fall",
        77 => "Snow grains",
        80 => "Slight rain showers",
        81 => "Moderate rain showers",
        82 => "Violent rain showers",
        85 => "Slight snow showers",
        86 => "Heavy snow showers",
        95 => "Thunderstorm",
        96 => "Thunderstorm with slight hail",
        99 => "Thunderstorm with heavy hail",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_weather_code_known_and_unknown() {
        assert_eq!(describe_weather_code(0), "Clear");
        assert_eq!(describe_weather_code(63), "Moderate rain");
        assert_eq!(describe_weather_code(95), "Thunderstorm");
        assert_eq!(describe_weather_code(1234), "Unknown");
        assert_eq!(describe_weather_code(-1), "Unknown");
    }

    #[test]
    fn test_forecast_payload_parsing() {
        let response: ForecastResponse = serde_json::from_str(
            r#"{"current_weather": {"temperature": 12.5, "windspeed": 18.0, "weathercode": 2}}"#,
        )
        .unwrap();
        let current = response.current_weather.unwrap();
        assert_eq!(current.temperature, 12.5);
        assert_eq!(current.weathercode, 2);

        let empty: ForecastResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.current_weather.is_none());
    }

    #[test]
    fn test_default_report_is_zero_valued() {
        let report = WeatherReport::default();
        assert_eq!(report.temperature_c, 0.0);
        assert_eq!(report.windspeed_kmh, 0.0);
        assert_eq!(report.weather_code, 0);
    }
}
