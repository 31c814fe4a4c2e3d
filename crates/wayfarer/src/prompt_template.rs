use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tera::{Context, Error as TeraError, Tera};

use crate::models::tool::Tool;

/// The persona and tool guide sent as the system message on every model call
const SYSTEM_TEMPLATE: &str = include_str!("prompts/system.md");

/// Get the path to the prompts directory
fn prompts_dir() -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    PathBuf::from(manifest_dir).join("src").join("prompts")
}

pub fn load_prompt<T: Serialize>(template: &str, context_data: &T) -> Result<String, TeraError> {
    let mut tera = Tera::default();
    tera.add_raw_template("inline_template", template)?;
    let context = Context::from_serialize(context_data)?;
    let rendered = tera.render("inline_template", &context)?;
    Ok(rendered)
}

pub fn load_prompt_file<T: Serialize>(
    template_file: impl Into<PathBuf>,
    context_data: &T,
) -> Result<String, TeraError> {
    let template_path = template_file.into();
    // if the template_file doesn't exist, try to load it from the prompts directory
    let file_path = if !template_path.exists() {
        prompts_dir().join(template_path)
    } else {
        template_path
    };

    let template_content = fs::read_to_string(file_path)
        .map_err(|e| TeraError::chain("Failed to read template file", e))?;
    load_prompt(&template_content, context_data)
}

#[derive(Debug, Serialize)]
struct SystemContext<'a> {
    date: String,
    tools: &'a [Tool],
    location: Option<&'a str>,
}

/// Render the system prompt describing the assistant and its tools.
///
/// `template_path` replaces the built-in template when set.
pub fn system_prompt(
    tools: &[Tool],
    location: Option<&str>,
    template_path: Option<&Path>,
) -> Result<String, TeraError> {
    let context = SystemContext {
        date: chrono::Local::now().format("%A, %d %B %Y").to_string(),
        tools,
        location,
    };

    match template_path {
        Some(path) => load_prompt_file(path, &context),
        None => load_prompt(SYSTEM_TEMPLATE, &context),
    }
}
