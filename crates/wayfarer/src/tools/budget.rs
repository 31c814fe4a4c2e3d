use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};

use super::adapter::Adapter;
use super::schema::{optional_str, required_str, ToolSpec};
use crate::errors::AgentResult;
use crate::models::tool::{Tool, ToolKind};

const DEFAULT_DAYS: u64 = 3;
const CURRENCY: &str = "INR";

/// Daily spend in rupees per traveller type
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyCosts {
    pub accommodation: u64,
    pub food: u64,
    pub transport: u64,
    pub activities: u64,
}

impl DailyCosts {
    fn for_traveler(traveler_type: &str) -> Self {
        match traveler_type {
            "mid-range" => Self {
                accommodation: 2500,
                food: 1200,
                transport: 800,
                activities: 1000,
            },
            "luxury" => Self {
                accommodation: 8000,
                food: 3000,
                transport: 2000,
                activities: 2500,
            },
            _ => Self {
                accommodation: 800,
                food: 500,
                transport: 300,
                activities: 400,
            },
        }
    }

    fn total(&self) -> u64 {
        self.accommodation + self.food + self.transport + self.activities
    }

    fn scaled(&self, multiplier: f64) -> Self {
        let scale = |cost: u64| (cost as f64 * multiplier).round() as u64;
        Self {
            accommodation: scale(self.accommodation),
            food: scale(self.food),
            transport: scale(self.transport),
            activities: scale(self.activities),
        }
    }
}

/// How much pricier a destination is than the baseline
fn cost_multiplier(destination: &str) -> f64 {
    match destination.to_lowercase().as_str() {
        "goa" => 1.2,
        "mumbai" => 1.5,
        "delhi" => 1.3,
        "kerala" => 1.1,
        "rajasthan" => 1.0,
        "himachal pradesh" => 1.3,
        "dubai" => 3.0,
        "singapore" => 2.8,
        "thailand" => 0.8,
        _ => 1.0,
    }
}

/// Rough trip cost estimate; purely local
pub struct BudgetAdapter {
    tool: ToolSpec,
}

impl BudgetAdapter {
    pub fn new() -> AgentResult<Self> {
        let tool = Tool::new(
            ToolKind::Budget.as_ref(),
            "Estimate the cost of a trip in INR: per day accommodation, food, transport and \
            activities, the daily total and the trip total.",
            json!({
                "type": "object",
                "required": ["destination"],
                "properties": {
                    "destination": {"type": "string"},
                    "days": {"type": "integer", "minimum": 1, "maximum": 60, "default": 3},
                    "traveler_type": {
                        "enum": ["budget", "mid-range", "luxury"],
                        "default": "budget"
                    }
                }
            }),
        );
        Ok(Self {
            tool: ToolSpec::new(tool)?,
        })
    }
}

#[async_trait]
impl Adapter for BudgetAdapter {
    fn kind(&self) -> ToolKind {
        ToolKind::Budget
    }

    fn spec(&self) -> &ToolSpec {
        &self.tool
    }

    async fn run(&self, arguments: &Value) -> AgentResult<Value> {
        let destination = required_str(arguments, "destination")?;
        let days = arguments["days"].as_u64().unwrap_or(DEFAULT_DAYS);
        let traveler_type = optional_str(arguments, "traveler_type").unwrap_or("budget");

        let base = DailyCosts::for_traveler(traveler_type);
        let multiplier = cost_multiplier(destination);
        let daily_total = (base.total() as f64 * multiplier).round() as u64;

        Ok(json!({
            "destination": destination,
            "days": days,
            "traveler_type": traveler_type,
            "per_day": base.scaled(multiplier),
            "daily_total": daily_total,
            "trip_total": daily_total * days,
            "currency": CURRENCY,
        }))
    }
}
