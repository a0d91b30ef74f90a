/// Provider defaults, used when the deployment does not override them
pub const DEFAULT_BASE_URL: &str = "https://router.huggingface.co/v1";
pub const DEFAULT_MODEL: &str = "Qwen/Qwen3-Next-80B-A3B-Instruct:novita";

/// Last-resort persona when neither the request nor the deployment supplies one
pub const FALLBACK_PERSONA: &str =
    "You are a helpful trading and crypto assistant for ANDX. Provide concise, actionable answers.";

/// Persona the client starts with before the user edits it
pub const CLIENT_DEFAULT_PERSONA: &str = "You are a helpful trading and crypto assistant for ANDX. Provide concise, actionable answers. Respond in plain text without using markdown, bullet points, headings, tables, emojis, or special formatting.";

/// Deployment configuration keys
pub const ENV_PROVIDER_TOKEN: &str = "HF_TOKEN";
pub const ENV_PROVIDER_BASE_URL: &str = "HF_BASE_URL";
pub const ENV_PROVIDER_MODEL: &str = "HF_CHAT_MODEL";
pub const ENV_DEFAULT_PERSONA: &str = "AI_SYSTEM_PROMPT";
pub const ENV_CLIENT_PERSONA: &str = "CHAT_RELAY_PERSONA";

/// Decoding parameters sent with every completion
pub const TEMPERATURE: f32 = 0.7;
pub const MAX_OUTPUT_TOKENS: u32 = 512;

/// Per-message content bound, in characters
pub const MAX_MESSAGE_CHARS: usize = 4000;

/// Client-visible messages
pub const GREETING: &str = "Hello! I'm your ANDX AI Assistant. I can help you with AI trading strategies, crypto market analysis, tokenization insights, and more. How can I assist you today?";
pub const FALLBACK_REPLY: &str =
    "I encountered an error while retrieving information. Please try again.";
pub const MISSING_REPLY: &str = "Sorry, something went wrong. Please try again.";

/// Relay failure bodies
pub const MISCONFIGURED_MESSAGE: &str = "Server misconfigured: missing Hugging Face token.";
pub const INVALID_BODY_MESSAGE: &str = "Invalid request body";
pub const BODY_TOO_LARGE_MESSAGE: &str = "Request body too large";
pub const PROVIDER_FAILED_MESSAGE: &str = "Model request failed";
pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to fetch response from language model";

/// Viewport proximity to the bottom, in logical pixels, that keeps auto-scroll on
pub const AUTO_SCROLL_THRESHOLD_PX: f64 = 120.0;

pub const RELAY_PATH: &str = "/relay";
pub const RELAY_ALIAS_PATH: &str = "/api/chat";
