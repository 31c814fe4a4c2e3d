use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use super::adapter::Adapter;
use super::configs::{ServiceConfig, ToolsConfig};
use super::http::{build_client, check_status, read_json, transport_message, truncate_chars};
use super::schema::{required_str, ToolSpec};
use crate::errors::{AgentError, AgentResult};
use crate::models::tool::{Tool, ToolKind};

const SERVICE: &str = "Image service";
const PER_PAGE: &str = "8";
const MAX_IMAGES: usize = 6;
const MAX_DESCRIPTION_CHARS: usize = 80;

/// Landscape photos of a place from Unsplash
pub struct ImagesAdapter {
    tool: ToolSpec,
    client: Client,
    service: ServiceConfig,
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn describe(photo: &Value, query: &str) -> String {
    let description = photo["alt_description"]
        .as_str()
        .filter(|d| d.chars().count() >= 5)
        .map(str::to_string)
        .unwrap_or_else(|| format!("Beautiful {}", query));
    capitalize(&truncate_chars(&description, MAX_DESCRIPTION_CHARS))
}

impl ImagesAdapter {
    pub fn new(config: &ToolsConfig) -> AgentResult<Self> {
        let tool = Tool::new(
            ToolKind::Images.as_ref(),
            "Find photos of a specific place, e.g. 'Athirappilly Falls' or 'Hawa Mahal'. \
            Returns descriptions, photographers and image links.",
            json!({
                "type": "object",
                "required": ["query"],
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The place to show, as specific as possible."
                    }
                }
            }),
        );

        Ok(Self {
            tool: ToolSpec::new(tool)?,
            client: build_client(config)?,
            service: config.images.clone(),
        })
    }

    async fn search(&self, query: &str) -> AgentResult<Vec<Value>> {
        let response = self
            .client
            .get(self.service.url("/search/photos"))
            .header(
                "Authorization",
                format!("Client-ID {}", self.service.key().unwrap_or_default()),
            )
            .header("Accept-Version", "v1")
            .query(&[
                ("query", query),
                ("per_page", PER_PAGE),
                ("order_by", "relevant"),
                ("orientation", "landscape"),
            ])
            .send()
            .await
            .map_err(|e| AgentError::dependency(SERVICE, transport_message(&e)))?;

        // Unsplash reports an exhausted hourly quota as 403
        if response.status() == StatusCode::FORBIDDEN {
            return Err(AgentError::Dependency(format!(
                "{} rate limit exceeded, try again later",
                SERVICE
            )));
        }
        let data = read_json(SERVICE, check_status(SERVICE, response)?).await?;
        Ok(data["results"].as_array().cloned().unwrap_or_default())
    }
}

#[async_trait]
impl Adapter for ImagesAdapter {
    fn kind(&self) -> ToolKind {
        ToolKind::Images
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
        let query = required_str(arguments, "query")?;

        let mut results = self.search(query).await?;
        let words: Vec<&str> = query.split_whitespace().collect();
        if results.is_empty() && words.len() > 1 {
            // The last word is usually the landmark type, e.g. "Falls" or "Fort"
            let fallback = words[words.len() - 1];
            results = match self.search(fallback).await {
                Ok(results) => results,
                Err(e) => {
                    tracing::warn!(error = %e, query = fallback, "simplified image search failed");
                    Vec::new()
                }
            };
        }

        let images: Vec<Value> = results
            .iter()
            .take(MAX_IMAGES)
            .map(|photo| {
                json!({
                    "description": describe(photo, query),
                    "photographer": photo["user"]["name"].as_str().unwrap_or("Unknown"),
                    "url": photo["urls"]["regular"].as_str().unwrap_or_default(),
                })
            })
            .collect();

        Ok(json!({
            "query": query,
            "images": images,
        }))
    }
}
