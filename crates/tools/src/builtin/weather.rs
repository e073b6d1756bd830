//! Weather tool using Open-Meteo API (free, no API key required).

use super::keywords::{clean_word, mentions_any};
use crate::error::ToolError;
use crate::types::{Tool, ToolOutput};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

const DEFAULT_GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1";
const DEFAULT_FORECAST_URL: &str = "https://api.open-meteo.com/v1";

const WEATHER_KEYWORDS: &[&str] = &[
    "weather", "temperature", "temp", "climate", "forecast", "hot", "cold", "rain", "raining",
    "snow", "snowing", "sunny", "cloudy", "humidity", "wind", "windy", "storm",
];

/// Words after which a location is expected.
const PREPOSITIONS: &[&str] = &["in", "at", "for"];

/// Words that end a location phrase.
const LOCATION_STOPS: &[&str] = &[
    "and", "or", "but", "today", "tonight", "tomorrow", "now", "right", "this", "currently",
    "with", "plus", "then", "&",
];

/// Words dropped when no preposition points at the location.
const FILLER: &[&str] = &[
    "weather", "temperature", "temp", "climate", "forecast", "what's", "whats", "what", "is",
    "how's", "hows", "how", "in", "at", "for", "the", "current", "today", "now", "like", "it",
    "tell", "me", "about", "show", "get",
];

/// Weather tool using Open-Meteo API.
pub struct WeatherTool {
    client: Client,
    geocoding_url: String,
    forecast_url: String,
}

#[derive(Deserialize)]
struct GeocodingResponse {
    results: Option<Vec<GeocodingResult>>,
}

#[derive(Deserialize)]
struct GeocodingResult {
    name: String,
    latitude: f64,
    longitude: f64,
    country: Option<String>,
    admin1: Option<String>,
}

#[derive(Deserialize)]
struct WeatherResponse {
    current_weather: CurrentWeather,
}

#[derive(Deserialize)]
struct CurrentWeather {
    temperature: f64,
    windspeed: f64,
    weathercode: i32,
}

impl WeatherTool {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            geocoding_url: DEFAULT_GEOCODING_URL.into(),
            forecast_url: DEFAULT_FORECAST_URL.into(),
        }
    }

    /// Point the tool at other Open-Meteo compatible endpoints.
    pub fn with_base_urls(
        mut self,
        geocoding_url: impl Into<String>,
        forecast_url: impl Into<String>,
    ) -> Self {
        self.geocoding_url = geocoding_url.into();
        self.forecast_url = forecast_url.into();
        self
    }

    fn weather_code_to_description(code: i32) -> &'static str {
        match code {
            0 => "Clear sky",
            1..=3 => "Partly cloudy",
            45 | 48 => "Foggy",
            51 | 53 | 55 => "Drizzle",
            61 | 63 | 65 => "Rain",
            66 | 67 => "Freezing rain",
            71 | 73 | 75 => "Snow",
            77 => "Snow grains",
            80..=82 => "Rain showers",
            85 | 86 => "Snow showers",
            95 => "Thunderstorm",
            96 | 99 => "Thunderstorm with hail",
            _ => "Unknown",
        }
    }

    /// Pull a place name out of a free-form weather question.
    ///
    /// Prefers the words after "in"/"at"/"for" that follow a weather word,
    /// stopping at conjunctions, time words, digits or punctuation.
    fn extract_location(query: &str) -> Option<String> {
        let words: Vec<&str> = query.split_whitespace().collect();
        let lowered: Vec<String> = words.iter().map(|w| clean_word(w).to_lowercase()).collect();

        let anchor = lowered
            .iter()
            .position(|w| WEATHER_KEYWORDS.contains(&w.as_str()))
            .unwrap_or(0);

        let after_preposition = lowered[anchor..]
            .iter()
            .position(|w| PREPOSITIONS.contains(&w.as_str()))
            .map(|p| anchor + p + 1);

        if let Some(start) = after_preposition {
            let location = Self::collect_place(&words[start..]);
            if !location.is_empty() {
                return Some(location);
            }
        }

        // "Tokyo weather", "How cold is Oslo?"
        let location = words
            .iter()
            .map(|w| clean_word(w))
            .take_while(|w| !LOCATION_STOPS.contains(&w.to_lowercase().as_str()))
            .filter(|w| {
                let lower = w.to_lowercase();
                !w.is_empty()
                    && !FILLER.contains(&lower.as_str())
                    && !WEATHER_KEYWORDS.contains(&lower.as_str())
            })
            .collect::<Vec<_>>()
            .join(" ");

        (!location.is_empty()).then_some(location)
    }

    fn collect_place(words: &[&str]) -> String {
        let mut place = Vec::new();
        for raw in words {
            let word = clean_word(raw);
            let lower = word.to_lowercase();
            if word.is_empty()
                || LOCATION_STOPS.contains(&lower.as_str())
                || word.chars().any(|c| c.is_ascii_digit())
            {
                break;
            }
            if !(place.is_empty() && lower == "the") {
                place.push(word);
            }
            if raw.ends_with(|c: char| matches!(c, '?' | '!' | '.' | ',' | ';')) {
                break;
            }
        }
        place.join(" ")
    }
}

impl Default for WeatherTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        "weather"
    }

    fn description(&self) -> &str {
        "Get current weather for a location. Returns temperature, conditions, and wind speed."
    }

    fn is_relevant(&self, query: &str) -> bool {
        mentions_any(&query.to_lowercase(), WEATHER_KEYWORDS)
    }

    async fn execute(&self, query: &str) -> Result<ToolOutput, ToolError> {
        let location = Self::extract_location(query)
            .ok_or_else(|| ToolError::InvalidQuery("Could not find a location in query".into()))?;

        // Step 1: Geocode the location
        debug!(location = %location, "Geocoding location");
        let geocode_url = format!(
            "{}/search?name={}&count=1&language=en&format=json",
            self.geocoding_url,
            urlencoding::encode(&location)
        );

        let response = self.client.get(&geocode_url).send().await?;
        if !response.status().is_success() {
            return Err(ToolError::ExternalService(format!(
                "Geocoding API error: {}",
                response.status()
            )));
        }
        let geo_response: GeocodingResponse = response.json().await?;

        let geo = geo_response
            .results
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| ToolError::ExternalService(format!("Location '{}' not found", location)))?;

        // Step 2: Get weather data
        debug!(lat = geo.latitude, lon = geo.longitude, "Fetching weather");
        let weather_url = format!(
            "{}/forecast?latitude={}&longitude={}&current_weather=true",
            self.forecast_url, geo.latitude, geo.longitude
        );

        let response = self.client.get(&weather_url).send().await?;
        if !response.status().is_success() {
            return Err(ToolError::ExternalService(format!(
                "Forecast API error: {}",
                response.status()
            )));
        }
        let weather: WeatherResponse = response.json().await?;

        // Format nice location name
        let location_name = match (&geo.admin1, &geo.country) {
            (Some(admin), Some(country)) => format!("{}, {}, {}", geo.name, admin, country),
            (None, Some(country)) => format!("{}, {}", geo.name, country),
            _ => geo.name,
        };

        let description = Self::weather_code_to_description(weather.current_weather.weathercode);
        let temp_f = weather.current_weather.temperature * 9.0 / 5.0 + 32.0;

        let content = format!(
            "Weather in {}: {:.1}°C ({:.1}°F), {}. Wind: {:.1} km/h",
            location_name,
            weather.current_weather.temperature,
            temp_f,
            description,
            weather.current_weather.windspeed
        );

        Ok(ToolOutput::new(content)
            .with_confidence(0.9)
            .with_source("https://open-meteo.com"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_weather_code_descriptions() {
        assert_eq!(WeatherTool::weather_code_to_description(0), "Clear sky");
        assert_eq!(WeatherTool::weather_code_to_description(61), "Rain");
        assert_eq!(WeatherTool::weather_code_to_description(95), "Thunderstorm");
    }

    #[test]
    fn test_extract_location() {
        let cases = [
            ("weather in Tokyo and 15% tip on $40", "Tokyo"),
            ("What's the weather like in Paris?", "Paris"),
            ("temperature in New York today", "New York"),
            ("Weather forecast for San Francisco, please", "San Francisco"),
            ("Tokyo weather", "Tokyo"),
            ("How's the temperature in the Hague", "Hague"),
        ];
        for (query, expected) in cases {
            assert_eq!(
                WeatherTool::extract_location(query).as_deref(),
                Some(expected),
                "query: {}",
                query
            );
        }
        assert_eq!(WeatherTool::extract_location("weather"), None);
    }

    #[test]
    fn test_relevance() {
        let tool = WeatherTool::new();
        assert!(tool.is_relevant("Will it rain in London?"));
        assert!(tool.is_relevant("weather in Tokyo and 15% tip on $40"));
        assert!(!tool.is_relevant("Who is Ada Lovelace?"));
        assert!(!tool.is_relevant("attempt 3 times"));
    }

    #[tokio::test]
    async fn test_execute_with_mock_api() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("name", "Tokyo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{
                    "name": "Tokyo",
                    "latitude": 35.69,
                    "longitude": 139.69,
                    "country": "Japan",
                    "admin1": "Tokyo"
                }]
            })))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "current_weather": {
                    "temperature": 20.0,
                    "windspeed": 12.5,
                    "weathercode": 0
                }
            })))
            .mount(&mock_server)
            .await;

        let tool = WeatherTool::new().with_base_urls(mock_server.uri(), mock_server.uri());
        let output = tool.execute("weather in Tokyo and 15% tip on $40").await.unwrap();

        assert_eq!(
            output.content,
            "Weather in Tokyo, Tokyo, Japan: 20.0°C (68.0°F), Clear sky. Wind: 12.5 km/h"
        );
        assert_eq!(output.sources, vec!["https://open-meteo.com"]);
    }

    #[tokio::test]
    async fn test_unknown_location() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&mock_server)
            .await;

        let tool = WeatherTool::new().with_base_urls(mock_server.uri(), mock_server.uri());
        let result = tool.execute("weather in Atlantis").await;

        assert!(matches!(result, Err(ToolError::ExternalService(msg)) if msg.contains("Atlantis")));
    }

    // Integration test - requires network
    #[tokio::test]
    #[ignore] // Run with: cargo test -p tools -- --ignored
    async fn test_weather_integration() {
        let tool = WeatherTool::new();
        let output = tool.execute("weather in San Francisco").await.unwrap();
        assert!(output.content.contains("San Francisco"));
        assert!(output.content.contains("°C"));
    }
}
