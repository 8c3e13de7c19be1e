use std::path::PathBuf;

pub fn default_api_endpoint() -> String {
    "https://openrouter.ai/api/v1/chat/completions".to_string()
}

pub fn default_model() -> String {
    "openai/gpt-4o-mini".to_string()
}

pub fn default_max_turns() -> usize {
    10
}

pub fn default_http_timeout() -> u64 {
    30
}

pub fn default_shell_timeout() -> u64 {
    30
}

pub fn default_max_output_bytes() -> u64 {
    1_048_576 // 1MB default
}

/// `~/.config/toolsmith/tools`, or `./tools` without a home directory.
pub fn default_tools_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".config").join("toolsmith").join("tools"))
        .unwrap_or_else(|| PathBuf::from("tools"))
}
