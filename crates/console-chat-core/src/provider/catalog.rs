//! Provider catalog
//!
//! Loads provider data (key env var, model tiers) from embedded JSON at
//! compile time.

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::Deserialize;

const PROVIDERS_JSON: &str = include_str!("providers.json");

/// Model tier (fast, balanced, powerful)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelTier {
    Fast,
    Balanced,
    Powerful,
}

impl std::str::FromStr for ModelTier {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fast" => Ok(ModelTier::Fast),
            "balanced" | "default" => Ok(ModelTier::Balanced),
            "powerful" => Ok(ModelTier::Powerful),
            _ => Err(format!("Unknown model tier: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Model {
    pub id: String,
    pub name: String,
    pub context: usize,
}

#[derive(Debug, Clone)]
pub struct Provider {
    pub id: String,
    pub name: String,
    pub api_key_env: Option<String>,
    pub supports_thinking: bool,
    pub models: HashMap<ModelTier, Model>,
}

impl Provider {
    /// Model ID for a tier (falls back to balanced)
    pub fn model_id(&self, tier: ModelTier) -> Option<&str> {
        self.models
            .get(&tier)
            .or_else(|| self.models.get(&ModelTier::Balanced))
            .map(|m| m.id.as_str())
    }

    /// Whether the provider can be used without an API key
    pub fn is_local(&self) -> bool {
        self.api_key_env.is_none()
    }
}

#[derive(Deserialize)]
struct RawCatalog {
    providers: HashMap<String, RawProvider>,
}

#[derive(Deserialize)]
struct RawProvider {
    name: String,
    api_key_env: Option<String>,
    supports_thinking: bool,
    models: RawModels,
}

#[derive(Deserialize)]
struct RawModels {
    fast: Model,
    balanced: Model,
    powerful: Model,
}

static CATALOG: LazyLock<HashMap<String, Provider>> = LazyLock::new(|| {
    let raw: RawCatalog = match serde_json::from_str(PROVIDERS_JSON) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::error!(error = %e, "Failed to parse embedded provider catalog");
            return HashMap::new();
        }
    };

    raw.providers
        .into_iter()
        .map(|(id, raw)| {
            let models = HashMap::from([
                (ModelTier::Fast, raw.models.fast),
                (ModelTier::Balanced, raw.models.balanced),
                (ModelTier::Powerful, raw.models.powerful),
            ]);
            let provider = Provider {
                id: id.clone(),
                name: raw.name,
                api_key_env: raw.api_key_env,
                supports_thinking: raw.supports_thinking,
                models,
            };
            (id, provider)
        })
        .collect()
});

/// Get a provider by ID
pub fn get(provider_id: &str) -> Option<&'static Provider> {
    CATALOG.get(provider_id)
}

/// All provider IDs, sorted
pub fn ids() -> Vec<&'static str> {
    let mut ids: Vec<_> = CATALOG.keys().map(|s| s.as_str()).collect();
    ids.sort_unstable();
    ids
}

/// Get API key environment variable for a provider
pub fn api_key_env(provider_id: &str) -> Option<&'static str> {
    get(provider_id).and_then(|p| p.api_key_env.as_deref())
}

/// Get default model ID for a provider
pub fn default_model(provider_id: &str) -> Option<&'static str> {
    model_id(provider_id, ModelTier::Balanced)
}

/// Get model ID for a provider and tier
pub fn model_id(provider_id: &str, tier: ModelTier) -> Option<&'static str> {
    get(provider_id).and_then(|p| p.model_id(tier))
}

pub fn supports_thinking(provider_id: &str) -> bool {
    get(provider_id).map(|p| p.supports_thinking).unwrap_or(false)
}
