//! Council configuration
//!
//! [`CouncilConfig`] maps model identifiers to their endpoint and credential
//! and names the council, chairman and title-generator models. It is an
//! ordinary value: build it in code, parse it from JSON, or load it from
//! `llm_config.json`, then hand it to [`CouncilClient`](crate::CouncilClient).
//! Reloading returns a fresh instance and never touches the old one.
//!
//! ```json
//! {
//!   "models": {
//!     "gpt-5.1": { "api_url": "https://api.openai.com/v1/chat/completions", "api_key": "sk-..." }
//!   },
//!   "council": ["gpt-5.1"],
//!   "chairman": "gpt-5.1",
//!   "title_generator": "gpt-5.1"
//! }
//! ```

use crate::core_types::ModelId;
use crate::error::{CouncilError, CouncilResult};
use crate::logging::log_debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the configuration file location
pub const CONFIG_PATH_ENV: &str = "LLM_COUNCIL_CONFIG";

/// Locations searched by [`CouncilConfig::load`] after [`CONFIG_PATH_ENV`]
pub const DEFAULT_CONFIG_PATHS: &[&str] = &["llm_config.json", "backend/llm_config.json"];

/// Endpoint and credential for one model
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelEndpoint {
    /// Full chat completions URL, e.g. `https://host/v1/chat/completions`
    pub api_url: String,
    /// Bearer token; omitted for local gateways that need none
    #[serde(default)]
    pub api_key: Option<String>,
}

impl ModelEndpoint {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: Some(api_key.into()),
        }
    }
}

// Keep credentials out of logs
impl fmt::Debug for ModelEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelEndpoint")
            .field("api_url", &self.api_url)
            .field("has_api_key", &self.api_key.is_some())
            .finish()
    }
}

/// Model endpoints plus council roles
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CouncilConfig {
    pub models: BTreeMap<ModelId, ModelEndpoint>,
    #[serde(default)]
    pub council: Vec<ModelId>,
    #[serde(default)]
    pub chairman: Option<ModelId>,
    #[serde(default)]
    pub title_generator: Option<ModelId>,
    #[serde(skip)]
    source: Option<PathBuf>,
}

impl CouncilConfig {
    /// Empty configuration, to be filled with [`with_model`](Self::with_model)
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: impl Into<ModelId>, endpoint: ModelEndpoint) -> Self {
        self.models.insert(model.into(), endpoint);
        self
    }

    pub fn with_council<I, S>(mut self, council: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ModelId>,
    {
        self.council = council.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_chairman(mut self, model: impl Into<ModelId>) -> Self {
        self.chairman = Some(model.into());
        self
    }

    pub fn with_title_generator(mut self, model: impl Into<ModelId>) -> Self {
        self.title_generator = Some(model.into());
        self
    }

    /// Parse and validate a JSON document
    ///
    /// # Errors
    ///
    /// Returns [`CouncilError::ConfigurationError`] if the JSON is malformed
    /// or fails [`validate`](Self::validate).
    pub fn from_json_str(json: &str) -> CouncilResult<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            CouncilError::configuration_error(format!("Invalid council config JSON: {e}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a configuration file
    pub fn from_path(path: impl AsRef<Path>) -> CouncilResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CouncilError::configuration_error(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;

        let mut config = Self::from_json_str(&raw)?;
        config.source = Some(path.to_path_buf());

        log_debug!(
            path = %path.display(),
            model_count = config.models.len(),
            council_size = config.council.len(),
            "Council configuration loaded"
        );

        Ok(config)
    }

    /// Load from `$LLM_COUNCIL_CONFIG`, or the first of
    /// [`DEFAULT_CONFIG_PATHS`] that exists
    ///
    /// # Errors
    ///
    /// Returns [`CouncilError::ConfigurationError`] listing every searched
    /// path when none exists, or when the file found is invalid.
    pub fn load() -> CouncilResult<Self> {
        let mut candidates = Vec::new();
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            candidates.push(PathBuf::from(path));
        }
        candidates.extend(DEFAULT_CONFIG_PATHS.iter().map(PathBuf::from));
        Self::load_first_of(&candidates)
    }

    /// Load from the first existing path in `candidates`
    pub fn load_first_of(candidates: &[PathBuf]) -> CouncilResult<Self> {
        match candidates.iter().find(|path| path.is_file()) {
            Some(path) => Self::from_path(path),
            None => {
                let searched: Vec<String> = candidates
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect();
                Err(CouncilError::configuration_error(format!(
                    "Config file not found. Searched: {searched:?}"
                )))
            }
        }
    }

    /// Re-read the file this configuration came from
    ///
    /// Returns a fresh instance; `self` is left untouched. Configurations
    /// built in memory have nothing to re-read and return a clone.
    pub fn reload(&self) -> CouncilResult<Self> {
        match &self.source {
            Some(path) => Self::from_path(path),
            None => Ok(self.clone()),
        }
    }

    /// The file this configuration was read from, if any
    pub fn source_path(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Check that every role refers to a configured model
    pub fn validate(&self) -> CouncilResult<()> {
        if self.models.is_empty() {
            return Err(CouncilError::configuration_error(
                "Council config defines no models",
            ));
        }

        for (model, endpoint) in &self.models {
            if endpoint.api_url.trim().is_empty() {
                return Err(CouncilError::configuration_error(format!(
                    "Model '{model}' has an empty api_url"
                )));
            }
        }

        let roles = self
            .council
            .iter()
            .map(|m| ("council", m))
            .chain(self.chairman.iter().map(|m| ("chairman", m)))
            .chain(self.title_generator.iter().map(|m| ("title_generator", m)));

        for (role, model) in roles {
            if !self.models.contains_key(model) {
                return Err(CouncilError::configuration_error(format!(
                    "{role} model '{model}' is not defined in models"
                )));
            }
        }

        Ok(())
    }

    /// Endpoint for `model`
    ///
    /// # Errors
    ///
    /// Returns [`CouncilError::ModelNotFound`] if the model is unconfigured.
    pub fn model_endpoint(&self, model: &str) -> CouncilResult<&ModelEndpoint> {
        self.models
            .get(model)
            .ok_or_else(|| CouncilError::model_not_found(model))
    }

    pub fn has_model(&self, model: &str) -> bool {
        self.models.contains_key(model)
    }

    pub fn council_models(&self) -> &[ModelId] {
        &self.council
    }

    pub fn chairman_model(&self) -> Option<&str> {
        self.chairman.as_deref()
    }

    pub fn title_generator_model(&self) -> Option<&str> {
        self.title_generator.as_deref()
    }
}
