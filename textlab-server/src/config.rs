//! Command-line and environment configuration.

use clap::Parser;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 9474;

/// Default Gemini model.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash-exp";

/// Default Generative Language API base URL.
pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// Command-line arguments for the Text Lab server.
#[derive(Debug, Clone, Parser)]
#[command(name = "text-lab")]
#[command(about = "Text Lab typographic composition server")]
#[command(version)]
pub struct CliArgs {
    /// Port to listen on (localhost only)
    #[arg(long, env = "TEXTLAB_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Google AI API key; without it drafts come from the offline sample service
    #[arg(long, env = "GOOGLE_AI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    /// Gemini model used for layout drafts
    #[arg(long, env = "TEXTLAB_GEMINI_MODEL", default_value = DEFAULT_GEMINI_MODEL)]
    pub gemini_model: String,

    /// Base URL of the Generative Language API
    #[arg(long, env = "TEXTLAB_GEMINI_ENDPOINT", default_value = DEFAULT_GEMINI_ENDPOINT)]
    pub gemini_endpoint: String,
}

/// Resolved server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen port.
    pub port: u16,
    /// Gemini settings; `None` selects the sample layout service.
    pub gemini: Option<GeminiConfig>,
}

/// Settings for the Gemini layout service.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key sent as the `key` query parameter.
    pub api_key: String,
    /// Model name.
    pub model: String,
    /// API base URL.
    pub endpoint: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            gemini: None,
        }
    }
}

impl From<CliArgs> for ServerConfig {
    fn from(args: CliArgs) -> Self {
        let gemini = args
            .gemini_api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .map(|api_key| GeminiConfig {
                api_key,
                model: args.gemini_model,
                endpoint: args.gemini_endpoint,
            });
        Self {
            port: args.port,
            gemini,
        }
    }
}
