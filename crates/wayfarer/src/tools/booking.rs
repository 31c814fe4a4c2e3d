use async_trait::async_trait;
use chrono::{Duration, Local, NaiveDate};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use super::adapter::Adapter;
use super::configs::{BookingConfig, ToolsConfig};
use super::http::{build_client, check_status, read_json, transport_message};
use super::schema::{optional_str, required_str, ToolSpec};
use crate::errors::{AgentError, AgentResult};
use crate::models::tool::{Tool, ToolKind};

const SERVICE: &str = "Booking service";
const MAX_HOTELS: usize = 10;
const CHECK_IN_AFTER_DAYS: i64 = 7;
const ADULTS: u32 = 2;
const ROOMS: u32 = 1;
const CURRENCY: &str = "INR";

/// Nightly price range in rupees for each budget level, `None` meaning unfiltered
fn price_range(budget: &str) -> Option<(u32, u32)> {
    match budget {
        "budget" => Some((0, 3000)),
        "average" => Some((3000, 8000)),
        "rich" => Some((8000, 20000)),
        "luxury" => Some((20000, 100000)),
        _ => None,
    }
}

/// Hotel availability and prices from Booking.com through RapidAPI
pub struct BookingAdapter {
    tool: ToolSpec,
    client: Client,
    config: BookingConfig,
}

/// A direct Booking.com search for when the traveller wants to book themselves
pub fn booking_url(
    location: &str,
    place_type: &str,
    budget: &str,
    check_in: NaiveDate,
    check_out: NaiveDate,
) -> String {
    let search = format!("{} in {}", place_type, location)
        .split_whitespace()
        .map(|word| urlencoding::encode(word).into_owned())
        .collect::<Vec<_>>()
        .join("+");
    let mut url = format!(
        "https://www.booking.com/searchresults.html?ss={}&checkin={}&checkout={}&group_adults={}&no_rooms={}&selected_currency={}",
        search, check_in, check_out, ADULTS, ROOMS, CURRENCY
    );
    if let Some((min, max)) = price_range(budget) {
        url.push_str(&format!("&price={}-{}-{}", CURRENCY, min, max));
    }
    url
}

fn parse_hotel(hotel: &Value) -> Option<Value> {
    let property = hotel.get("property").unwrap_or(hotel);
    let name = property["name"]
        .as_str()
        .or_else(|| hotel["hotel_name"].as_str())?;
    let price = &property["priceBreakdown"]["grossPrice"];

    Some(json!({
        "name": name,
        "price": price["value"].as_f64().map(|p| p.round()),
        "currency": price["currency"].as_str(),
        "rating": property["reviewScore"].as_f64(),
    }))
}

impl BookingAdapter {
    pub fn new(config: &ToolsConfig) -> AgentResult<Self> {
        let tool = Tool::new(
            ToolKind::Booking.as_ref(),
            "Search bookable stays at a destination for two adults, checking in a week from \
            today for one night. Returns hotel names with live prices in INR and a Booking.com \
            link to complete the booking.",
            json!({
                "type": "object",
                "required": ["location"],
                "properties": {
                    "location": {
                        "type": "string",
                        "description": "Destination city, e.g. 'Goa'."
                    },
                    "place_type": {
                        "enum": ["hotel", "resort", "cottage", "villa"],
                        "default": "hotel",
                        "description": "Kind of stay."
                    },
                    "budget": {
                        "enum": ["budget", "average", "rich", "luxury", "all"],
                        "default": "all",
                        "description": "Nightly price band: budget up to 3000, average 3000-8000, rich 8000-20000, luxury above 20000 rupees."
                    }
                }
            }),
        );

        Ok(Self {
            tool: ToolSpec::new(tool)?,
            client: build_client(config)?,
            config: config.booking.clone(),
        })
    }

    fn api_key(&self) -> Option<&str> {
        self.config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
    }
}

#[async_trait]
impl Adapter for BookingAdapter {
    fn kind(&self) -> ToolKind {
        ToolKind::Booking
    }

    fn spec(&self) -> &ToolSpec {
        &self.tool
    }

    fn missing_configuration(&self) -> Option<String> {
        if self.api_key().is_none() || self.config.rapidapi_host.trim().is_empty() {
            Some(SERVICE.to_string())
        } else {
            None
        }
    }

    async fn run(&self, arguments: &Value) -> AgentResult<Value> {
        let location = required_str(arguments, "location")?;
        let place_type = optional_str(arguments, "place_type").unwrap_or("hotel");
        let budget = optional_str(arguments, "budget").unwrap_or("all");

        let check_in = Local::now().date_naive() + Duration::days(CHECK_IN_AFTER_DAYS);
        let check_out = check_in + Duration::days(1);

        let mut query = vec![
            ("dest_id", location.to_string()),
            ("dest_type", "city".to_string()),
            ("search_type", "CITY".to_string()),
            ("arrival_date", check_in.to_string()),
            ("departure_date", check_out.to_string()),
            ("adults", ADULTS.to_string()),
            ("room_qty", ROOMS.to_string()),
            ("languagecode", "en-us".to_string()),
            ("currency_code", CURRENCY.to_string()),
        ];
        if let Some((min, max)) = price_range(budget) {
            query.push(("price_min", min.to_string()));
            query.push(("price_max", max.to_string()));
        }

        let response = self
            .client
            .get(format!(
                "{}/api/v1/hotels/searchHotels",
                self.config.host.trim_end_matches('/')
            ))
            .header("X-RapidAPI-Key", self.api_key().unwrap_or_default())
            .header("X-RapidAPI-Host", self.config.rapidapi_host.as_str())
            .query(&query)
            .send()
            .await
            .map_err(|e| AgentError::dependency(SERVICE, transport_message(&e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(AgentError::Dependency(format!(
                "Location '{}' not found by the booking service",
                location
            )));
        }
        let data = read_json(SERVICE, check_status(SERVICE, response)?).await?;

        let listed = data["data"]["hotels"].as_array();
        let hotels: Vec<Value> = listed
            .into_iter()
            .flatten()
            .filter_map(parse_hotel)
            .take(MAX_HOTELS)
            .collect();

        Ok(json!({
            "location": location,
            "place_type": place_type,
            "budget": budget,
            "check_in": check_in.to_string(),
            "check_out": check_out.to_string(),
            "hotel_count": listed.map(|h| h.len()).unwrap_or_default(),
            "hotels": hotels,
            "booking_url": booking_url(location, place_type, budget, check_in, check_out),
        }))
    }
}
