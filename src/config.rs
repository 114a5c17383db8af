use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{PilotError, PilotResult};

/// Environment variable that overrides `endpoint.api_key`.
pub const API_KEY_ENV: &str = "SCREENPILOT_API_KEY";

pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a desktop automation agent operating a real computer through tools.

Rules:
- Call `take_screenshot` to see the screen before acting and after any action whose effect you need to verify.
- `move_mouse` takes normalized coordinates: x and y from 0 to 1000, relative to the last screenshot.
- `click_mouse` clicks the left button wherever the cursor currently is.
- `type_text` types ASCII text into the focused control.
- `scroll_down` scrolls one notch.
- Call exactly one tool per response. Extra tool calls are rejected.
- When the task is complete, reply with a short plain-text answer and no tool call.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub endpoint: EndpointConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub prompts: PromptsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Full chat-completions URL, e.g. `http://127.0.0.1:8000/v1/chat/completions`.
    pub url: String,
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Optional bearer token (falls back to env var SCREENPILOT_API_KEY).
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    #[serde(default = "default_target_width")]
    pub target_width: u32,
    #[serde(default = "default_target_height")]
    pub target_height: u32,
    #[serde(default = "default_dump_dir")]
    pub dump_dir: PathBuf,
    #[serde(default = "default_dump_prefix")]
    pub dump_prefix: String,
    #[serde(default)]
    pub dump_start: u32,
    /// How many screenshot turns keep their image data in the request.
    #[serde(default = "default_keep_last")]
    pub keep_last_screenshots: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    #[serde(default = "default_step_delay_ms")]
    pub step_delay_ms: u64,
    /// Pause after each input action so the UI can catch up.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PromptsConfig {
    pub system_prompt: Option<String>,
    pub system_prompt_file: Option<PathBuf>,
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_target_width() -> u32 {
    1280
}

fn default_target_height() -> u32 {
    720
}

fn default_dump_dir() -> PathBuf {
    PathBuf::from("screenshots")
}

fn default_dump_prefix() -> String {
    "shot_".to_string()
}

fn default_keep_last() -> usize {
    2
}

fn default_max_steps() -> usize {
    30
}

fn default_step_delay_ms() -> u64 {
    250
}

fn default_settle_delay_ms() -> u64 {
    60
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            target_width: default_target_width(),
            target_height: default_target_height(),
            dump_dir: default_dump_dir(),
            dump_prefix: default_dump_prefix(),
            dump_start: 0,
            keep_last_screenshots: default_keep_last(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            step_delay_ms: default_step_delay_ms(),
            settle_delay_ms: default_settle_delay_ms(),
        }
    }
}

impl EndpointConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The env var wins over the file so keys can stay out of config.toml.
    pub fn resolved_api_key(&self) -> Option<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.is_empty())
            .or_else(|| self.api_key.clone().filter(|k| !k.is_empty()))
    }
}

impl AgentConfig {
    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl AppConfig {
    pub fn from_toml_str(content: &str) -> PilotResult<Self> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> PilotResult<()> {
        if self.endpoint.url.trim().is_empty() {
            return Err(PilotError::Config("endpoint.url must not be empty".into()));
        }
        if self.endpoint.model.trim().is_empty() {
            return Err(PilotError::Config("endpoint.model must not be empty".into()));
        }
        if self.endpoint.timeout_secs == 0 {
            return Err(PilotError::Config("endpoint.timeout_secs must be positive".into()));
        }
        if self.capture.target_width == 0 || self.capture.target_height == 0 {
            return Err(PilotError::Config(
                "capture.target_width and capture.target_height must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Inline prompt first, then the prompt file, then the built-in prompt.
    pub fn system_prompt(&self) -> PilotResult<String> {
        if let Some(prompt) = &self.prompts.system_prompt {
            return Ok(prompt.clone());
        }
        if let Some(path) = &self.prompts.system_prompt_file {
            let prompt = std::fs::read_to_string(path).map_err(|e| {
                PilotError::Config(format!("cannot read {}: {e}", path.display()))
            })?;
            return Ok(prompt);
        }
        Ok(DEFAULT_SYSTEM_PROMPT.to_string())
    }
}

fn resolve_config_path(explicit: Option<&Path>) -> PilotResult<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(PilotError::Config(format!(
            "config file {} does not exist",
            path.display()
        )));
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join("config.toml");
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Ok(candidate);
            }
        }
    }

    let cwd = std::env::current_dir()?;
    let candidate = cwd.join("config.toml");
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "config found in working directory");
        return Ok(candidate);
    }

    Err(PilotError::Config(
        "config.toml not found next to executable or in working directory".into(),
    ))
}

pub fn load_config(explicit: Option<&Path>) -> PilotResult<AppConfig> {
    let path = resolve_config_path(explicit)?;
    let content = std::fs::read_to_string(&path)?;
    let config = AppConfig::from_toml_str(&content)?;
    tracing::info!(
        path = %path.display(),
        model = %config.endpoint.model,
        max_steps = config.agent.max_steps,
        "config loaded"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[endpoint]
url = "http://127.0.0.1:8000/v1/chat/completions"
model = "ui-tars"
"#;

    #[test]
    fn minimal_config_fills_defaults() {
        let cfg = AppConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(cfg.endpoint.timeout_secs, 120);
        assert_eq!(cfg.endpoint.max_tokens, 1024);
        assert_eq!(cfg.capture.target_width, 1280);
        assert_eq!(cfg.capture.target_height, 720);
        assert_eq!(cfg.capture.dump_prefix, "shot_");
        assert_eq!(cfg.capture.keep_last_screenshots, 2);
        assert_eq!(cfg.agent.max_steps, 30);
        assert_eq!(cfg.agent.settle_delay(), Duration::from_millis(60));
    }

    #[test]
    fn full_config_overrides_defaults() {
        let cfg = AppConfig::from_toml_str(
            r#"
[endpoint]
url = "http://localhost:1234/v1/chat/completions"
model = "qwen2.5-vl"
timeout_secs = 30
temperature = 0.2
max_tokens = 256

[capture]
target_width = 1000
target_height = 1000
dump_dir = "/tmp/run-a"
dump_prefix = "a_"
dump_start = 40
keep_last_screenshots = 1

[agent]
max_steps = 5
step_delay_ms = 0
"#,
        )
        .unwrap();
        assert_eq!(cfg.endpoint.timeout(), Duration::from_secs(30));
        assert_eq!(cfg.capture.dump_start, 40);
        assert_eq!(cfg.capture.dump_dir, PathBuf::from("/tmp/run-a"));
        assert_eq!(cfg.agent.max_steps, 5);
        assert_eq!(cfg.agent.step_delay(), Duration::ZERO);
    }

    #[test]
    fn missing_endpoint_section_is_rejected() {
        assert!(matches!(
            AppConfig::from_toml_str("[agent]\nmax_steps = 3\n"),
            Err(PilotError::TomlDe(_))
        ));
    }

    #[test]
    fn zero_target_resolution_is_rejected() {
        let content = format!("{MINIMAL}\n[capture]\ntarget_width = 0\n");
        assert!(matches!(
            AppConfig::from_toml_str(&content),
            Err(PilotError::Config(_))
        ));
    }

    #[test]
    fn inline_system_prompt_wins() {
        let mut cfg = AppConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(cfg.system_prompt().unwrap(), DEFAULT_SYSTEM_PROMPT);
        cfg.prompts.system_prompt = Some("be brief".into());
        assert_eq!(cfg.system_prompt().unwrap(), "be brief");
    }
}
