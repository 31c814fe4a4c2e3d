use serde::{Deserialize, Serialize};

use crate::models::contact::Contact;

pub const OPENWEATHER_HOST: &str = "http://api.openweathermap.org";
pub const NOMINATIM_HOST: &str = "https://nominatim.openstreetmap.org";
pub const OVERPASS_HOST: &str = "https://overpass-api.de";
pub const BOOKING_HOST: &str = "https://booking-com15.p.rapidapi.com";
pub const BOOKING_RAPIDAPI_HOST: &str = "booking-com15.p.rapidapi.com";
pub const OPENROUTESERVICE_HOST: &str = "https://api.openrouteservice.org";
pub const NEWSAPI_HOST: &str = "https://newsapi.org";
pub const UNSPLASH_HOST: &str = "https://api.unsplash.com";

pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_USER_AGENT: &str = concat!("wayfarer/", env!("CARGO_PKG_VERSION"));

/// A third party REST service reached with an API key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub host: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl ServiceConfig {
    pub fn new<S: Into<String>>(host: S) -> Self {
        Self {
            host: host.into(),
            api_key: None,
        }
    }

    pub fn with_api_key<S: Into<String>>(mut self, api_key: S) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// The API key, treating an empty value the same as an absent one
    pub fn key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.host.trim_end_matches('/'), path)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacesConfig {
    pub nominatim_host: String,
    pub overpass_host: String,
}

impl Default for PlacesConfig {
    fn default() -> Self {
        Self {
            nominatim_host: NOMINATIM_HOST.to_string(),
            overpass_host: OVERPASS_HOST.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingConfig {
    pub host: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_rapidapi_host")]
    pub rapidapi_host: String,
}

fn default_rapidapi_host() -> String {
    BOOKING_RAPIDAPI_HOST.to_string()
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            host: BOOKING_HOST.to_string(),
            api_key: None,
            rapidapi_host: default_rapidapi_host(),
        }
    }
}

/// Where emergency alerts are delivered and who they are addressed to
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SosConfig {
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub contacts: Vec<Contact>,
}

/// Settings for every tool adapter.
///
/// Only the hosts have defaults; an adapter whose API key is missing stays registered
/// and reports itself as not configured when called.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
    pub weather: ServiceConfig,
    pub places: PlacesConfig,
    pub booking: BookingConfig,
    pub directions: ServiceConfig,
    pub news: ServiceConfig,
    pub images: ServiceConfig,
    pub sos: SosConfig,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TOOL_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            weather: ServiceConfig::new(OPENWEATHER_HOST),
            places: PlacesConfig::default(),
            booking: BookingConfig::default(),
            directions: ServiceConfig::new(OPENROUTESERVICE_HOST),
            news: ServiceConfig::new(NEWSAPI_HOST),
            images: ServiceConfig::new(UNSPLASH_HOST),
            sos: SosConfig::default(),
        }
    }
}
