//! Provider registry: maps provider names to embedding endpoint configurations.
//!
//! All OpenAI-compatible embedding providers are defined here as static config
//! entries. The unified `OpenAiCompatibleEmbedder` uses these to connect.

/// How to attach auth credentials to requests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AuthStyle {
    /// `Authorization: Bearer <key>`
    Bearer,
    /// No authentication required (local servers).
    None,
}

/// Configuration for a single embedding provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Provider identifier.
    pub name: &'static str,
    /// Base URL for the API.
    pub base_url: &'static str,
    /// Path for the embeddings endpoint (appended to base_url).
    pub embeddings_path: &'static str,
    /// Environment variable names to try for the API key (in order).
    pub env_keys: &'static [&'static str],
    /// How to send auth credentials.
    pub auth_style: AuthStyle,
    /// Environment variable to override the base URL (e.g., OLLAMA_HOST).
    pub base_url_env: Option<&'static str>,
    /// Model used when the config leaves `model` empty.
    pub default_model: &'static str,
}

// ─── Provider Definitions ────────────────────────────────────────────────────

static PROVIDERS: &[ProviderConfig] = &[
    ProviderConfig {
        name: "openai",
        base_url: "https://api.openai.com/v1",
        embeddings_path: "/embeddings",
        env_keys: &["OPENAI_API_KEY"],
        auth_style: AuthStyle::Bearer,
        base_url_env: Some("OPENAI_BASE_URL"),
        default_model: "text-embedding-3-small",
    },
    ProviderConfig {
        name: "ollama",
        base_url: "http://localhost:11434/v1",
        embeddings_path: "/embeddings",
        env_keys: &[],
        auth_style: AuthStyle::None,
        base_url_env: Some("OLLAMA_HOST"),
        default_model: "nomic-embed-text",
    },
    ProviderConfig {
        name: "mistral",
        base_url: "https://api.mistral.ai/v1",
        embeddings_path: "/embeddings",
        env_keys: &["MISTRAL_API_KEY"],
        auth_style: AuthStyle::Bearer,
        base_url_env: None,
        default_model: "mistral-embed",
    },
    ProviderConfig {
        name: "together",
        base_url: "https://api.together.xyz/v1",
        embeddings_path: "/embeddings",
        env_keys: &["TOGETHER_API_KEY"],
        auth_style: AuthStyle::Bearer,
        base_url_env: None,
        default_model: "BAAI/bge-base-en-v1.5",
    },
];

/// Look up a provider config by name.
pub fn get_provider_config(name: &str) -> Option<&'static ProviderConfig> {
    // Also match aliases
    let lookup = match name {
        "together_ai" | "togetherai" => "together",
        other => other,
    };
    PROVIDERS.iter().find(|p| p.name == lookup)
}

/// List all known provider names.
pub fn all_provider_names() -> Vec<&'static str> {
    PROVIDERS.iter().map(|p| p.name).collect()
}
