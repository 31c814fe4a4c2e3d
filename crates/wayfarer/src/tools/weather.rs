use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use super::adapter::Adapter;
use super::configs::{ServiceConfig, ToolsConfig};
use super::http::{build_client, check_status, read_json, transport_message};
use super::schema::{required_str, ToolSpec};
use crate::errors::{AgentError, AgentResult};
use crate::models::tool::{Tool, ToolKind};

const SERVICE: &str = "Weather service";

/// Current conditions from OpenWeatherMap
pub struct WeatherAdapter {
    tool: ToolSpec,
    client: Client,
    service: ServiceConfig,
}

impl WeatherAdapter {
    pub fn new(config: &ToolsConfig) -> AgentResult<Self> {
        let tool = Tool::new(
            ToolKind::Weather.as_ref(),
            "Get the live weather for a city: temperature in Celsius, how it feels, the \
            condition, humidity, wind speed and a packing tip when conditions are extreme.",
            json!({
                "type": "object",
                "required": ["location"],
                "properties": {
                    "location": {
                        "type": "string",
                        "description": "City name, optionally with country, e.g. 'Mumbai' or 'Paris, FR'."
                    }
                }
            }),
        );

        Ok(Self {
            tool: ToolSpec::new(tool)?,
            client: build_client(config)?,
            service: config.weather.clone(),
        })
    }
}

/// A travel tip for extreme conditions; the first matching threshold wins
fn travel_advice(temp: f64, humidity: f64, wind_speed: f64) -> Option<&'static str> {
    if temp > 35.0 {
        Some("Very hot! Carry water, wear sunscreen and avoid travelling at midday.")
    } else if temp < 10.0 {
        Some("Cold weather! Pack warm clothes and layers.")
    } else if humidity > 80.0 {
        Some("High humidity! Light, breathable cotton clothing is recommended.")
    } else if wind_speed > 10.0 {
        Some("Windy conditions! Secure loose items and be cautious outdoors.")
    } else {
        None
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[async_trait]
impl Adapter for WeatherAdapter {
    fn kind(&self) -> ToolKind {
        ToolKind::Weather
    }

    fn spec(&self) -> &ToolSpec {
        &self.tool
    }

    fn missing_configuration(&self) -> Option<String> {
        match self.service.key() {
            Some(_) => None,
            None => Some(SERVICE.to_string()),
        }
    }

    async fn run(&self, arguments: &Value) -> AgentResult<Value> {
        let location = required_str(arguments, "location")?;
        let api_key = self.service.key().unwrap_or_default();

        let response = self
            .client
            .get(self.service.url("/data/2.5/weather"))
            .query(&[("q", location), ("appid", api_key), ("units", "metric")])
            .send()
            .await
            .map_err(|e| AgentError::dependency(SERVICE, transport_message(&e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(AgentError::Dependency(format!(
                "Location '{}' not found. Check the spelling and try again.",
                location
            )));
        }
        let data = read_json(SERVICE, check_status(SERVICE, response)?).await?;

        let main = data
            .get("main")
            .ok_or_else(|| AgentError::Dependency(format!("Weather data unavailable for '{}'", location)))?;
        let temp = main["temp"].as_f64().ok_or_else(|| {
            AgentError::Dependency(format!("{} sent a malformed response: missing temperature", SERVICE))
        })?;
        let feels_like = main["feels_like"].as_f64().unwrap_or(temp);
        let humidity = main["humidity"].as_f64().unwrap_or_default();
        let wind_speed = data["wind"]["speed"].as_f64().unwrap_or_default();
        let condition = data["weather"][0]["description"]
            .as_str()
            .unwrap_or("unknown");

        let mut payload = json!({
            "location": data["name"].as_str().unwrap_or(location),
            "country": data["sys"]["country"].as_str().unwrap_or_default(),
            "temp": round1(temp),
            "feels_like": round1(feels_like),
            "condition": condition,
            "humidity": humidity,
            "wind_speed": wind_speed,
        });
        if let Some(advice) = travel_advice(temp, humidity, wind_speed) {
            payload["advice"] = json!(advice);
        }

        Ok(payload)
    }
}
