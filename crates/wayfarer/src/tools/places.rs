use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashSet;

use super::adapter::Adapter;
use super::configs::{PlacesConfig, ToolsConfig};
use super::http::{build_client, fetch_json};
use super::schema::{optional_str, required_str, ToolSpec};
use crate::errors::AgentResult;
use crate::models::tool::{Tool, ToolKind};

const NOMINATIM: &str = "OpenStreetMap geocoder";
const OVERPASS: &str = "OpenStreetMap places search";

/// Box scales tried in turn until enough named places are found
const SEARCH_SCALES: [f64; 3] = [1.0, 1.8, 3.5];
const MIN_RESULTS: usize = 3;
const MAX_RESULTS: usize = 10;
/// Half-width in degrees used when the geocoder returns no bounding box
const POINT_MARGIN: f64 = 0.03;

/// Attractions, restaurants and hotels from OpenStreetMap (Nominatim + Overpass)
pub struct PlacesAdapter {
    tool: ToolSpec,
    client: Client,
    config: PlacesConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Place {
    pub name: String,
    pub category: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// South, west, north, east
#[derive(Debug, Clone, Copy, PartialEq)]
struct BoundingBox {
    south: f64,
    west: f64,
    north: f64,
    east: f64,
}

impl BoundingBox {
    fn scaled(&self, scale: f64) -> Self {
        let mid_lat = (self.south + self.north) / 2.0;
        let mid_lon = (self.west + self.east) / 2.0;
        let half_lat = (self.north - self.south) / 2.0 * scale;
        let half_lon = (self.east - self.west) / 2.0 * scale;
        Self {
            south: mid_lat - half_lat,
            west: mid_lon - half_lon,
            north: mid_lat + half_lat,
            east: mid_lon + half_lon,
        }
    }
}

fn tag_groups(place_type: &str) -> Vec<&'static str> {
    match place_type {
        "tourism" => vec![
            r#"node["tourism"="attraction"]"#,
            r#"way["tourism"="attraction"]"#,
            r#"relation["tourism"="attraction"]"#,
            r#"node["tourism"="viewpoint"]"#,
            r#"way["tourism"="viewpoint"]"#,
            r#"relation["tourism"="viewpoint"]"#,
            r#"node["tourism"="museum"]"#,
            r#"node["tourism"="gallery"]"#,
            r#"node["historic"]"#,
            r#"node["leisure"="park"]"#,
            r#"node["natural"="peak"]"#,
            r#"node["natural"="waterfall"]"#,
            r#"node["amenity"="theatre"]"#,
            r#"node["tourism"="information"]"#,
            r#"node["place"="locality"]"#,
        ],
        "restaurant" => vec![
            r#"node["amenity"="restaurant"]"#,
            r#"way["amenity"="restaurant"]"#,
            r#"relation["amenity"="restaurant"]"#,
        ],
        "hotel" => vec![
            r#"node["tourism"="hotel"]"#,
            r#"way["tourism"="hotel"]"#,
            r#"relation["tourism"="hotel"]"#,
        ],
        _ => vec![r#"node["name"]"#, r#"way["name"]"#, r#"relation["name"]"#],
    }
}

fn overpass_query(bbox: &BoundingBox, place_type: &str) -> String {
    let statements: String = tag_groups(place_type)
        .iter()
        .map(|group| {
            format!(
                "{}({},{},{},{});",
                group, bbox.south, bbox.west, bbox.north, bbox.east
            )
        })
        .collect();
    format!("[out:json][timeout:25];({});out center;", statements)
}

fn parse_coordinate(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Named elements from an Overpass response, first occurrence of each name only
fn parse_overpass(data: &Value) -> Vec<Place> {
    let mut seen = HashSet::new();
    let mut places = Vec::new();

    for element in data["elements"].as_array().into_iter().flatten() {
        let tags = &element["tags"];
        let name = match tags["name"].as_str().map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => continue,
        };
        if !seen.insert(name.to_lowercase()) {
            continue;
        }

        let position = if element["type"] == "node" {
            element
        } else {
            &element["center"]
        };
        let category = ["tourism", "amenity", "historic", "leisure", "natural"]
            .iter()
            .find_map(|key| tags[*key].as_str())
            .unwrap_or("place");

        places.push(Place {
            name: name.to_string(),
            category: category.to_string(),
            lat: parse_coordinate(&position["lat"]),
            lon: parse_coordinate(&position["lon"]),
        });
    }

    places
}

/// Nominatim search hits ordered by importance, first occurrence of each name only
fn parse_nominatim(data: &Value) -> Vec<(f64, Place)> {
    let mut seen = HashSet::new();
    let mut places = Vec::new();

    for item in data.as_array().into_iter().flatten() {
        let name = item["namedetails"]["name"]
            .as_str()
            .map(str::to_string)
            .or_else(|| {
                item["display_name"]
                    .as_str()
                    .and_then(|d| d.split(',').next())
                    .map(|s| s.trim().to_string())
            })
            .filter(|n| !n.is_empty());
        let name = match name {
            Some(name) => name,
            None => continue,
        };
        if !seen.insert(name.to_lowercase()) {
            continue;
        }

        let category = item["type"]
            .as_str()
            .or_else(|| item["class"].as_str())
            .unwrap_or("place");
        let importance = parse_coordinate(&item["importance"]).unwrap_or_default();
        places.push((
            importance,
            Place {
                name,
                category: category.to_string(),
                lat: parse_coordinate(&item["lat"]),
                lon: parse_coordinate(&item["lon"]),
            },
        ));
    }

    places.sort_by(|a, b| b.0.total_cmp(&a.0));
    places
}

impl PlacesAdapter {
    pub fn new(config: &ToolsConfig) -> AgentResult<Self> {
        let tool = Tool::new(
            ToolKind::Places.as_ref(),
            "Find named places around a destination from OpenStreetMap: tourist attractions, \
            restaurants or hotels, with their coordinates.",
            json!({
                "type": "object",
                "required": ["location"],
                "properties": {
                    "location": {
                        "type": "string",
                        "description": "City or area to search, e.g. 'Kochi'."
                    },
                    "place_type": {
                        "enum": ["tourism", "restaurant", "hotel", "other"],
                        "default": "tourism",
                        "description": "What kind of place to look for."
                    }
                }
            }),
        );

        Ok(Self {
            tool: ToolSpec::new(tool)?,
            client: build_client(config)?,
            config: config.places.clone(),
        })
    }

    fn nominatim_url(&self) -> String {
        format!("{}/search", self.config.nominatim_host.trim_end_matches('/'))
    }

    async fn geocode(&self, location: &str) -> AgentResult<Option<BoundingBox>> {
        let request = self
            .client
            .get(self.nominatim_url())
            .header("Accept-Language", "en")
            .query(&[("q", location), ("format", "json"), ("limit", "1")]);
        let data = fetch_json(NOMINATIM, request).await?;

        let item = match data.as_array().and_then(|items| items.first()) {
            Some(item) => item,
            None => return Ok(None),
        };
        let bounds: Vec<f64> = item["boundingbox"]
            .as_array()
            .map(|b| b.iter().filter_map(parse_coordinate).collect())
            .unwrap_or_default();

        // Nominatim orders the box as south, north, west, east
        if let [south, north, west, east] = bounds[..] {
            return Ok(Some(BoundingBox {
                south,
                west,
                north,
                east,
            }));
        }
        match (parse_coordinate(&item["lat"]), parse_coordinate(&item["lon"])) {
            (Some(lat), Some(lon)) => Ok(Some(BoundingBox {
                south: lat - POINT_MARGIN,
                west: lon - POINT_MARGIN,
                north: lat + POINT_MARGIN,
                east: lon + POINT_MARGIN,
            })),
            _ => Ok(None),
        }
    }

    async fn overpass(&self, bbox: &BoundingBox, place_type: &str) -> AgentResult<Vec<Place>> {
        let request = self
            .client
            .post(format!(
                "{}/api/interpreter",
                self.config.overpass_host.trim_end_matches('/')
            ))
            .body(overpass_query(bbox, place_type));
        let data = fetch_json(OVERPASS, request).await?;
        Ok(parse_overpass(&data))
    }

    async fn named_search(&self, location: &str, place_type: &str) -> AgentResult<Vec<Place>> {
        let query = format!("{} {}", place_type, location);
        let request = self
            .client
            .get(self.nominatim_url())
            .header("Accept-Language", "en")
            .query(&[
                ("q", query.as_str()),
                ("format", "json"),
                ("limit", "20"),
                ("namedetails", "1"),
            ]);
        let data = fetch_json(NOMINATIM, request).await?;
        Ok(parse_nominatim(&data).into_iter().map(|(_, p)| p).collect())
    }

    /// Widen the search box until enough places turn up, keeping the first non-empty hit
    async fn search_area(&self, bbox: BoundingBox, place_type: &str) -> Vec<Place> {
        let mut found = Vec::new();
        for scale in SEARCH_SCALES {
            match self.overpass(&bbox.scaled(scale), place_type).await {
                Ok(places) if places.len() >= MIN_RESULTS => return places,
                Ok(places) if found.is_empty() => found = places,
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, scale, "overpass search failed"),
            }
        }
        found
    }
}

#[async_trait]
impl Adapter for PlacesAdapter {
    fn kind(&self) -> ToolKind {
        ToolKind::Places
    }

    fn spec(&self) -> &ToolSpec {
        &self.tool
    }

    async fn run(&self, arguments: &Value) -> AgentResult<Value> {
        let location = required_str(arguments, "location")?;
        let place_type = optional_str(arguments, "place_type").unwrap_or("tourism");

        let mut places = match self.geocode(location).await? {
            Some(bbox) => self.search_area(bbox, place_type).await,
            None => Vec::new(),
        };

        if places.len() < MIN_RESULTS {
            match self.named_search(location, place_type).await {
                Ok(extra) => {
                    let mut seen: HashSet<String> =
                        places.iter().map(|p| p.name.to_lowercase()).collect();
                    places.extend(
                        extra
                            .into_iter()
                            .filter(|p| seen.insert(p.name.to_lowercase())),
                    );
                }
                Err(e) if places.is_empty() => return Err(e),
                Err(e) => tracing::warn!(error = %e, "nominatim fallback failed"),
            }
        }
        places.truncate(MAX_RESULTS);

        Ok(json!({
            "location": location,
            "place_type": place_type,
            "places": places,
        }))
    }
}
