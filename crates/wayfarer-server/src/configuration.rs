use crate::error::{to_env_var, ConfigError};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::net::{AddrParseError, SocketAddr};
use std::time::Duration;
use wayfarer::agent::AgentConfig;
use wayfarer::providers::{
    configs::{
        OllamaProviderConfig, OpenAiProviderConfig, ProviderConfig, DEFAULT_MODEL_TIMEOUT_SECS,
    },
    factory::ProviderType,
    ollama, openai,
};
use wayfarer::tools::configs::{
    BOOKING_HOST, NEWSAPI_HOST, NOMINATIM_HOST, OPENROUTESERVICE_HOST, OPENWEATHER_HOST,
    OVERPASS_HOST, UNSPLASH_HOST,
};
use wayfarer::tools::ToolsConfig;

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory holding the chat UI
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum ProviderSettings {
    OpenAi {
        #[serde(default = "default_openai_host")]
        host: String,
        api_key: String,
        #[serde(default = "default_model")]
        model: String,
        #[serde(default = "default_temperature")]
        temperature: Option<f32>,
        #[serde(default)]
        max_tokens: Option<i32>,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
    Ollama {
        #[serde(default = "default_ollama_host")]
        host: String,
        #[serde(default = "default_ollama_model")]
        model: String,
        #[serde(default)]
        temperature: Option<f32>,
        #[serde(default)]
        max_tokens: Option<i32>,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
}

impl ProviderSettings {
    pub fn provider_type(&self) -> ProviderType {
        match self {
            ProviderSettings::OpenAi { .. } => ProviderType::OpenAi,
            ProviderSettings::Ollama { .. } => ProviderType::Ollama,
        }
    }

    pub fn into_config(self) -> ProviderConfig {
        match self {
            ProviderSettings::OpenAi {
                host,
                api_key,
                model,
                temperature,
                max_tokens,
                timeout_secs,
            } => ProviderConfig::OpenAi(OpenAiProviderConfig {
                host,
                api_key,
                model,
                temperature,
                max_tokens,
                timeout: Duration::from_secs(timeout_secs),
            }),
            ProviderSettings::Ollama {
                host,
                model,
                temperature,
                max_tokens,
                timeout_secs,
            } => ProviderConfig::Ollama(OllamaProviderConfig {
                host,
                model,
                temperature,
                max_tokens,
                timeout: Duration::from_secs(timeout_secs),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum StorageSettings {
    File {
        #[serde(default = "default_storage_path")]
        path: String,
    },
    Memory,
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings::File {
            path: default_storage_path(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub provider: ProviderSettings,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub storage: StorageSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_and_validate()
    }

    fn load_and_validate() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            // Hosts, so a section can be enabled by setting its key alone
            .set_default("tools.weather.host", OPENWEATHER_HOST)?
            .set_default("tools.places.nominatim_host", NOMINATIM_HOST)?
            .set_default("tools.places.overpass_host", OVERPASS_HOST)?
            .set_default("tools.booking.host", BOOKING_HOST)?
            .set_default("tools.directions.host", OPENROUTESERVICE_HOST)?
            .set_default("tools.news.host", NEWSAPI_HOST)?
            .set_default("tools.images.host", UNSPLASH_HOST)?
            // Optional file for settings that are awkward as variables, like SOS contacts
            .add_source(File::with_name("wayfarer").required(false))
            .add_source(
                Environment::with_prefix("WAYFARER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let result: Result<Self, config::ConfigError> = config.try_deserialize();

        match result {
            Ok(settings) => Ok(settings),
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                let error_str = err.to_string();
                if error_str.starts_with("missing field") {
                    // "missing field `api_key`" only names the leaf; the provider section is
                    // the only one with required fields
                    let field = error_str
                        .trim_start_matches("missing field `")
                        .trim_end_matches('`');
                    let path = match field {
                        "provider" => field.to_string(),
                        _ => format!("provider.{}", field),
                    };
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(&path),
                    })
                } else if let config::ConfigError::NotFound(field) = &err {
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    })
                } else {
                    Err(ConfigError::Other(err))
                }
            }
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    7860
}

fn default_static_dir() -> String {
    "frontend".to_string()
}

fn default_model() -> String {
    openai::GROQ_MODEL.to_string()
}

fn default_openai_host() -> String {
    openai::GROQ_HOST.to_string()
}

fn default_temperature() -> Option<f32> {
    Some(0.3)
}

fn default_timeout_secs() -> u64 {
    DEFAULT_MODEL_TIMEOUT_SECS
}

fn default_ollama_host() -> String {
    ollama::OLLAMA_HOST.to_string()
}

fn default_ollama_model() -> String {
    ollama::OLLAMA_MODEL.to_string()
}

fn default_storage_path() -> String {
    "~/.wayfarer".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn clean_env() {
        for (key, _) in env::vars() {
            if key.starts_with("WAYFARER_") {
                env::remove_var(&key);
            }
        }
    }

    #[test]
    #[serial]
    fn test_default_settings() {
        clean_env();
        env::set_var("WAYFARER_PROVIDER__TYPE", "openai");
        env::set_var("WAYFARER_PROVIDER__API_KEY", "test-key");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 7860);
        assert_eq!(settings.server.static_dir, "frontend");
        assert_eq!(settings.agent.max_iterations, 6);
        assert_eq!(settings.agent.max_history_messages, 40);
        assert_eq!(settings.tools.timeout_secs, 10);
        assert!(settings.tools.weather.key().is_none());
        assert!(matches!(
            settings.storage,
            StorageSettings::File { ref path } if path == "~/.wayfarer"
        ));

        if let ProviderSettings::OpenAi {
            host,
            api_key,
            model,
            temperature,
            max_tokens,
            timeout_secs,
        } = settings.provider
        {
            assert_eq!(host, "https://api.groq.com/openai");
            assert_eq!(api_key, "test-key");
            assert_eq!(model, "llama-3.1-8b-instant");
            assert_eq!(temperature, Some(0.3));
            assert_eq!(max_tokens, None);
            assert_eq!(timeout_secs, 30);
        } else {
            panic!("Expected OpenAI provider");
        }

        clean_env();
    }

    #[test]
    #[serial]
    fn test_ollama_settings() {
        clean_env();
        env::set_var("WAYFARER_PROVIDER__TYPE", "ollama");
        env::set_var("WAYFARER_PROVIDER__MODEL", "llama3.2");
        env::set_var("WAYFARER_PROVIDER__TEMPERATURE", "0.7");

        let settings = Settings::new().unwrap();
        assert!(matches!(settings.provider.provider_type(), ProviderType::Ollama));

        match settings.provider.into_config() {
            ProviderConfig::Ollama(config) => {
                assert_eq!(config.host, "http://localhost:11434");
                assert_eq!(config.model, "llama3.2");
                assert_eq!(config.temperature, Some(0.7));
                assert_eq!(config.timeout, Duration::from_secs(30));
            }
            other => panic!("Expected Ollama provider, got {:?}", other),
        }

        clean_env();
    }

    #[test]
    #[serial]
    fn test_tool_and_agent_overrides() {
        clean_env();
        env::set_var("WAYFARER_PROVIDER__TYPE", "openai");
        env::set_var("WAYFARER_PROVIDER__API_KEY", "test-key");
        env::set_var("WAYFARER_SERVER__PORT", "8080");
        env::set_var("WAYFARER_TOOLS__WEATHER__API_KEY", "owm-key");
        env::set_var("WAYFARER_TOOLS__TIMEOUT_SECS", "5");
        env::set_var("WAYFARER_AGENT__MAX_ITERATIONS", "4");
        env::set_var("WAYFARER_STORAGE__TYPE", "memory");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.tools.weather.key(), Some("owm-key"));
        assert!(settings.tools.weather.host.contains("openweathermap"));
        assert!(settings.tools.news.key().is_none());
        assert_eq!(settings.tools.timeout_secs, 5);
        assert_eq!(settings.agent.max_iterations, 4);
        assert!(matches!(settings.storage, StorageSettings::Memory));

        clean_env();
    }

    #[test]
    #[serial]
    fn test_missing_api_key_names_variable() {
        clean_env();
        env::set_var("WAYFARER_PROVIDER__TYPE", "openai");

        match Settings::new() {
            Err(ConfigError::MissingEnvVar { env_var }) => {
                assert_eq!(env_var, "WAYFARER_PROVIDER__API_KEY")
            }
            other => panic!("Expected missing variable, got {:?}", other),
        }

        clean_env();
    }

    #[test]
    #[serial]
    fn test_missing_provider_names_variable() {
        clean_env();

        match Settings::new() {
            Err(ConfigError::MissingEnvVar { env_var }) => {
                assert_eq!(env_var, "WAYFARER_PROVIDER")
            }
            other => panic!("Expected missing variable, got {:?}", other),
        }
    }

    #[test]
    fn test_socket_addr_conversion() {
        let server_settings = ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 7860,
            static_dir: default_static_dir(),
        };
        let addr = server_settings.socket_addr().unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:7860");
    }
}
