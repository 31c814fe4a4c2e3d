use serde::{Deserialize, Serialize};

use crate::errors::{AgentError, AgentResult};

const DEFAULT_COUNTRY_CODE: &str = "+91";

/// An emergency contact that receives SOS alerts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub number: String,
    #[serde(default = "default_relation")]
    pub relation: String,
}

fn default_relation() -> String {
    "family".to_string()
}

impl Contact {
    /// Create a contact, normalizing the number to international form.
    pub fn new<N, P, R>(name: N, number: P, relation: R) -> Self
    where
        N: Into<String>,
        P: AsRef<str>,
        R: Into<String>,
    {
        Self {
            name: name.into(),
            number: normalize_number(number.as_ref()),
            relation: relation.into(),
        }
    }

    pub fn normalized(self) -> Self {
        Self::new(self.name, &self.number, self.relation)
    }
}

/// Strip formatting from a phone number and make sure it carries a country code.
///
/// Ten digit numbers without a prefix are treated as Indian mobile numbers.
pub fn normalize_number(number: &str) -> String {
    let clean: String = number
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect();

    if clean.starts_with('+') {
        return clean;
    }
    if clean.starts_with("91") && clean.len() > 10 {
        return format!("+{}", clean);
    }
    format!("{}{}", DEFAULT_COUNTRY_CODE, clean)
}

/// The last known position reported by a user's device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserLocation {
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city_hint: Option<String>,
}

impl UserLocation {
    /// Human readable form used in alerts
    pub fn describe(&self) -> String {
        let mut text = format!("Lat: {}, Lon: {}", self.lat, self.lon);
        if let Some(city) = &self.city_hint {
            text.push_str(&format!(", Near: {}", city));
        }
        text
    }

    /// Reject positions outside the valid latitude and longitude ranges
    pub fn validate(&self) -> AgentResult<()> {
        if (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon) {
            Ok(())
        } else {
            Err(AgentError::InvalidParameters(format!(
                "Coordinates out of range: {}, {}",
                self.lat, self.lon
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_number() {
        assert_eq!(normalize_number("98765 43210"), "+919876543210");
        assert_eq!(normalize_number("919876543210"), "+919876543210");
        assert_eq!(normalize_number("+44 20 7946 0958"), "+442079460958");
        assert_eq!(normalize_number("(987) 654-3210"), "+919876543210");
    }

    #[test]
    fn test_contact_defaults_relation() {
        let contact: Contact =
            serde_json::from_str(r#"{"name": "Asha", "number": "9876543210"}"#).unwrap();
        assert_eq!(contact.relation, "family");
        assert_eq!(contact.normalized().number, "+919876543210");
    }

    #[test]
    fn test_location_describe() {
        let location = UserLocation {
            lat: 9.93,
            lon: 76.26,
            city_hint: Some("Kochi".to_string()),
        };
        assert_eq!(location.describe(), "Lat: 9.93, Lon: 76.26, Near: Kochi");
    }

    #[test]
    fn test_location_range_check() {
        let location = |lat, lon| UserLocation {
            lat,
            lon,
            city_hint: None,
        };
        assert!(location(9.93, 76.26).validate().is_ok());
        assert!(location(-90.0, 180.0).validate().is_ok());
        assert!(location(123.0, 76.26).validate().is_err());
        assert!(location(9.93, -181.0).validate().is_err());
        assert!(location(f64::NAN, 0.0).validate().is_err());
    }
}
