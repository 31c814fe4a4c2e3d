use async_trait::async_trait;
use chrono::{DateTime, Duration, Local};
use reqwest::Client;
use serde_json::{json, Value};

use super::adapter::Adapter;
use super::configs::{ServiceConfig, ToolsConfig};
use super::http::{build_client, fetch_json, truncate_chars};
use super::schema::{required_str, ToolSpec};
use crate::errors::AgentResult;
use crate::models::tool::{Tool, ToolKind};

const SERVICE: &str = "News service";
const LOOKBACK_DAYS: i64 = 30;
const PAGE_SIZE: &str = "20";
const MAX_ARTICLES: usize = 6;
const MAX_TITLE_CHARS: usize = 80;

/// Recent travel news for a destination from NewsAPI
pub struct NewsAdapter {
    tool: ToolSpec,
    client: Client,
    service: ServiceConfig,
}

fn published_label(published: &str) -> String {
    DateTime::parse_from_rfc3339(published)
        .map(|d| d.format("%b %d").to_string())
        .unwrap_or_else(|_| "Recent".to_string())
}

/// Articles that mention the location, or the first few when none do
fn relevant_articles<'a>(articles: &'a [Value], location: &str) -> Vec<&'a Value> {
    let needle = location.to_lowercase();
    let mentions = |article: &&Value| {
        ["title", "description"].iter().any(|field| {
            article[*field]
                .as_str()
                .map(|text| text.to_lowercase().contains(&needle))
                .unwrap_or(false)
        })
    };

    let matching: Vec<&Value> = articles.iter().filter(mentions).take(MAX_ARTICLES).collect();
    if matching.is_empty() {
        articles.iter().take(MAX_ARTICLES).collect()
    } else {
        matching
    }
}

impl NewsAdapter {
    pub fn new(config: &ToolsConfig) -> AgentResult<Self> {
        let tool = Tool::new(
            ToolKind::News.as_ref(),
            "Get recent travel and tourism news for a destination from the last month. Use it \
            to check festivals, closures, weather alerts and safety reports before recommending \
            a place.",
            json!({
                "type": "object",
                "required": ["location"],
                "properties": {
                    "location": {
                        "type": "string",
                        "description": "Destination or landmark, e.g. 'Athirappilly Falls'."
                    }
                }
            }),
        );

        Ok(Self {
            tool: ToolSpec::new(tool)?,
            client: build_client(config)?,
            service: config.news.clone(),
        })
    }

    async fn search(&self, query: &str) -> AgentResult<Vec<Value>> {
        let from = (Local::now() - Duration::days(LOOKBACK_DAYS))
            .format("%Y-%m-%d")
            .to_string();
        let request = self
            .client
            .get(self.service.url("/v2/everything"))
            .header("X-Api-Key", self.service.key().unwrap_or_default())
            .query(&[
                ("q", query),
                ("from", from.as_str()),
                ("sortBy", "publishedAt"),
                ("language", "en"),
                ("pageSize", PAGE_SIZE),
            ]);
        let data = fetch_json(SERVICE, request).await?;
        Ok(data["articles"].as_array().cloned().unwrap_or_default())
    }
}

#[async_trait]
impl Adapter for NewsAdapter {
    fn kind(&self) -> ToolKind {
        ToolKind::News
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

        let query = format!(
            "{} AND (travel OR tourism OR tourist OR hotel OR attraction OR festival OR destination)",
            location
        );
        let mut articles = self.search(&query).await?;
        if articles.is_empty() {
            // A narrower query often has nothing for small towns
            articles = match self.search(&format!("{} travel", location)).await {
                Ok(articles) => articles,
                Err(e) => {
                    tracing::warn!(error = %e, "simplified news search failed");
                    Vec::new()
                }
            };
        }

        let articles: Vec<Value> = relevant_articles(&articles, location)
            .into_iter()
            .map(|article| {
                json!({
                    "title": truncate_chars(article["title"].as_str().unwrap_or("No title"), MAX_TITLE_CHARS),
                    "source": article["source"]["name"].as_str().unwrap_or("Unknown"),
                    "published": published_label(article["publishedAt"].as_str().unwrap_or_default()),
                    "url": article["url"].as_str().unwrap_or_default(),
                })
            })
            .collect();

        Ok(json!({
            "location": location,
            "articles": articles,
        }))
    }
}
