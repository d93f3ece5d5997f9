use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing::warn;

const DEFAULT_API_VERSION: &str = "2024-02-15-preview";
const DEFAULT_DEPLOYMENT: &str = "gpt-4o";

/// Which embedding backend vectorises attribute names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbeddingProvider {
    /// Deterministic in-process embedder, no network.
    Local,
    /// Azure OpenAI embeddings deployment.
    Azure { deployment: String },
}

/// Application configuration loaded from environment variables.
/// Azure credentials are optional at startup; generation fails per-request without them.
#[derive(Debug, Clone)]
pub struct Config {
    pub azure_api_key: Option<String>,
    pub azure_endpoint: Option<String>,
    pub azure_api_version: String,
    pub azure_deployment: String,
    pub embedding_provider: EmbeddingProvider,
    pub data_dir: PathBuf,
    pub index_path: PathBuf,
    pub collection_name: String,
    pub search_top_k: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Builds the config from any variable source. Unset and blank values fall back to defaults.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let get_or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let embedding_provider = match get_or("EMBEDDING_PROVIDER", "local")
            .trim()
            .to_lowercase()
            .as_str()
        {
            "local" => EmbeddingProvider::Local,
            "azure" => EmbeddingProvider::Azure {
                deployment: get("AZURE_OPENAI_EMBEDDING_DEPLOYMENT").context(
                    "Required environment variable 'AZURE_OPENAI_EMBEDDING_DEPLOYMENT' is not set",
                )?,
            },
            other => bail!("EMBEDDING_PROVIDER must be 'local' or 'azure', got '{other}'"),
        };

        Ok(Config {
            azure_api_key: get("AZURE_OPENAI_API_KEY"),
            azure_endpoint: get("AZURE_OPENAI_ENDPOINT"),
            azure_api_version: get_or("AZURE_OPENAI_API_VERSION", DEFAULT_API_VERSION),
            azure_deployment: get_or("AZURE_OPENAI_DEPLOYMENT_NAME", DEFAULT_DEPLOYMENT),
            embedding_provider,
            data_dir: PathBuf::from(get_or("DATA_DIR", ".")),
            index_path: PathBuf::from(get_or("INDEX_PATH", "data/attribute_index.db")),
            collection_name: get_or("COLLECTION_NAME", "attributes"),
            search_top_k: get_or("SEARCH_TOP_K", "3")
                .trim()
                .parse::<usize>()
                .context("SEARCH_TOP_K must be a non-negative integer")?,
            port: get_or("PORT", "8000")
                .trim()
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: get_or("RUST_LOG", "info"),
        })
    }

    /// Warns once at startup when the LLM cannot be reached with the current settings.
    pub fn warn_if_llm_unconfigured(&self) {
        if self.azure_api_key.is_none() || self.azure_endpoint.is_none() {
            warn!(
                "AZURE_OPENAI_API_KEY or AZURE_OPENAI_ENDPOINT environment variable not set. \
                 LLM generation will fail until they are provided."
            );
        }
    }
}

#[cfg(test)]
impl Config {
    /// Fixture used by router and pipeline tests.
    pub fn for_tests(data_dir: PathBuf) -> Self {
        Config {
            azure_api_key: None,
            azure_endpoint: None,
            azure_api_version: DEFAULT_API_VERSION.to_string(),
            azure_deployment: DEFAULT_DEPLOYMENT.to_string(),
            embedding_provider: EmbeddingProvider::Local,
            index_path: data_dir.join("index.db"),
            data_dir,
            collection_name: "attributes".to_string(),
            search_top_k: 3,
            port: 0,
            rust_log: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.embedding_provider, EmbeddingProvider::Local);
        assert_eq!(config.search_top_k, 3);
        assert_eq!(config.port, 8000);
        assert_eq!(config.azure_deployment, "gpt-4o");
        assert_eq!(config.azure_api_version, "2024-02-15-preview");
        assert_eq!(config.index_path, PathBuf::from("data/attribute_index.db"));
        assert!(config.azure_api_key.is_none());
    }

    #[test]
    fn test_blank_credentials_count_as_unset() {
        let config = config_from(&[("AZURE_OPENAI_API_KEY", "  "), ("PORT", "9100")]).unwrap();
        assert!(config.azure_api_key.is_none());
        assert_eq!(config.port, 9100);
    }

    #[test]
    fn test_invalid_numbers_are_rejected() {
        let err = config_from(&[("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));

        let err = config_from(&[("PORT", "70000")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));

        let err = config_from(&[("SEARCH_TOP_K", "-1")]).unwrap_err();
        assert!(err.to_string().contains("SEARCH_TOP_K"));
    }

    #[test]
    fn test_unknown_embedding_provider_is_rejected() {
        let err = config_from(&[("EMBEDDING_PROVIDER", "bert")]).unwrap_err();
        assert!(err.to_string().contains("'bert'"));
    }

    #[test]
    fn test_azure_embeddings_need_a_deployment() {
        let err = config_from(&[("EMBEDDING_PROVIDER", "azure")]).unwrap_err();
        assert!(err.to_string().contains("AZURE_OPENAI_EMBEDDING_DEPLOYMENT"));

        let config = config_from(&[
            ("EMBEDDING_PROVIDER", "Azure"),
            ("AZURE_OPENAI_EMBEDDING_DEPLOYMENT", "text-embedding-3-small"),
        ])
        .unwrap();
        assert_eq!(
            config.embedding_provider,
            EmbeddingProvider::Azure {
                deployment: "text-embedding-3-small".to_string()
            }
        );
    }
}
