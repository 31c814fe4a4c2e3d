use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use serde_json::{json, Value};

use super::adapter::Adapter;
use super::configs::{ServiceConfig, ToolsConfig};
use super::http::{build_client, fetch_json};
use super::schema::{optional_str, required_str, ToolSpec};
use crate::errors::{AgentError, AgentResult};
use crate::models::tool::{Tool, ToolKind};

const SERVICE: &str = "Route service";
const MAX_STEPS: usize = 5;

lazy_static! {
    static ref HTML_TAG: Regex = Regex::new(r"<[^>]+>").unwrap();
}

/// Routing profile for a travel mode. Transit has no profile of its own and is
/// approximated by road.
fn profile(mode: &str) -> Option<&'static str> {
    match mode {
        "driving" | "transit" => Some("driving-car"),
        "walking" => Some("foot-walking"),
        "bicycling" | "cycling" => Some("cycling-regular"),
        _ => None,
    }
}

fn duration_text(minutes: i64) -> String {
    if minutes >= 60 {
        format!("{}h {}m", minutes / 60, minutes % 60)
    } else {
        format!("{}m", minutes)
    }
}

fn clean_instruction(instruction: &str) -> String {
    HTML_TAG
        .replace_all(instruction, "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn maps_url(origin: &str, destination: &str) -> String {
    let part = |place: &str| {
        place
            .split_whitespace()
            .map(|w| urlencoding::encode(w).into_owned())
            .collect::<Vec<_>>()
            .join("+")
    };
    format!(
        "https://www.google.com/maps/dir/{}/{}",
        part(origin),
        part(destination)
    )
}

struct Geocoded {
    lon: f64,
    lat: f64,
    label: String,
}

/// Distance, duration and the first turns between two places from OpenRouteService
pub struct DirectionsAdapter {
    tool: ToolSpec,
    client: Client,
    service: ServiceConfig,
}

impl DirectionsAdapter {
    pub fn new(config: &ToolsConfig) -> AgentResult<Self> {
        let tool = Tool::new(
            ToolKind::Directions.as_ref(),
            "Get the route between two places: distance in km, travel time, the first few \
            directions and a Google Maps link.",
            json!({
                "type": "object",
                "required": ["origin", "destination"],
                "properties": {
                    "origin": {
                        "type": "string",
                        "description": "Starting point, e.g. 'Delhi'."
                    },
                    "destination": {
                        "type": "string",
                        "description": "Where the traveller is going, e.g. 'Agra'."
                    },
                    "mode": {
                        "enum": ["driving", "walking", "bicycling", "cycling", "transit"],
                        "default": "driving"
                    }
                }
            }),
        );

        Ok(Self {
            tool: ToolSpec::new(tool)?,
            client: build_client(config)?,
            service: config.directions.clone(),
        })
    }

    fn api_key(&self) -> &str {
        self.service.key().unwrap_or_default()
    }

    async fn geocode(&self, place: &str) -> AgentResult<Geocoded> {
        let request = self
            .client
            .get(self.service.url("/geocode/search"))
            .header("Authorization", self.api_key())
            .query(&[("text", place), ("size", "1")]);
        let data = fetch_json(SERVICE, request).await?;

        let feature = &data["features"][0];
        let coordinates = &feature["geometry"]["coordinates"];
        match (coordinates[0].as_f64(), coordinates[1].as_f64()) {
            (Some(lon), Some(lat)) => Ok(Geocoded {
                lon,
                lat,
                label: feature["properties"]["label"]
                    .as_str()
                    .unwrap_or(place)
                    .to_string(),
            }),
            _ => Err(AgentError::Dependency(format!(
                "Location '{}' not found. Try a more specific name.",
                place
            ))),
        }
    }
}

#[async_trait]
impl Adapter for DirectionsAdapter {
    fn kind(&self) -> ToolKind {
        ToolKind::Directions
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
        let origin = required_str(arguments, "origin")?;
        let destination = required_str(arguments, "destination")?;
        let mode = optional_str(arguments, "mode").unwrap_or("driving");
        let profile = profile(mode).ok_or_else(|| {
            AgentError::InvalidParameters(format!(
                "Unsupported mode '{}'. Use driving, walking or bicycling.",
                mode
            ))
        })?;

        let start = self.geocode(origin).await?;
        let end = self.geocode(destination).await?;

        let request = self
            .client
            .post(self.service.url(&format!("/v2/directions/{}", profile)))
            .header("Authorization", self.api_key())
            .json(&json!({
                "coordinates": [[start.lon, start.lat], [end.lon, end.lat]],
                "instructions": true,
                "units": "m"
            }));
        let data = fetch_json(SERVICE, request).await?;

        let route = data["routes"]
            .get(0)
            .ok_or_else(|| {
                AgentError::Dependency(format!(
                    "No route found from {} to {}",
                    origin, destination
                ))
            })?;
        let distance_m = route["summary"]["distance"].as_f64().unwrap_or_default();
        let duration_s = route["summary"]["duration"].as_f64().unwrap_or_default();
        let duration_min = (duration_s / 60.0).round() as i64;

        let steps: Vec<String> = route["segments"][0]["steps"]
            .as_array()
            .into_iter()
            .flatten()
            .take(MAX_STEPS)
            .map(|step| clean_instruction(step["instruction"].as_str().unwrap_or("Continue")))
            .collect();

        Ok(json!({
            "origin": start.label,
            "destination": end.label,
            "mode": mode,
            "distance_km": (distance_m / 100.0).round() / 10.0,
            "duration_min": duration_min,
            "duration_text": duration_text(duration_min),
            "steps": steps,
            "maps_url": maps_url(origin, destination),
        }))
    }
}
