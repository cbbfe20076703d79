use std::fs;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use caption_engine::{ModelSettings, DEFAULT_BASE_URL, DEFAULT_MAX_TOKENS, DEFAULT_MODEL};
use clap::Parser;

/// Review model-generated captions and tags for a list of images in the browser.
#[derive(Debug, Parser)]
#[command(name = "caption_app", version)]
pub struct Cli {
    /// Images to caption, in review order.
    #[arg(required = true, num_args = 1.., value_name = "IMAGES")]
    pub images: Vec<String>,

    /// Address to bind the viewer server to.
    #[arg(long, env = "CAPTION_BIND", default_value = "127.0.0.1")]
    pub bind: IpAddr,

    /// Port for the viewer page and WebSocket.
    #[arg(long, env = "CAPTION_PORT", default_value_t = 8888)]
    pub port: u16,

    /// OpenAI-compatible API root of the vision model.
    #[arg(long, env = "CAPTION_MODEL_URL", default_value = DEFAULT_BASE_URL)]
    pub model_url: String,

    #[arg(long, env = "CAPTION_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    #[arg(long, env = "CAPTION_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long, default_value_t = DEFAULT_MAX_TOKENS)]
    pub max_tokens: u32,

    /// Replace the built-in captioning instruction with the contents of a file.
    #[arg(long, value_name = "PATH")]
    pub prompt_file: Option<PathBuf>,

    /// Give up on a model call after this many seconds (default: wait forever).
    #[arg(long, value_name = "SECS")]
    pub request_timeout_secs: Option<u64>,

    /// Serve this file instead of the built-in viewer page.
    #[arg(long, value_name = "PATH")]
    pub index_html: Option<PathBuf>,

    /// Begin captioning the first image before any viewer connects.
    #[arg(long)]
    pub start_immediately: bool,

    #[arg(long, env = "CAPTION_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Also write logs to this file.
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    pub fn model_settings(&self) -> anyhow::Result<ModelSettings> {
        let mut settings = ModelSettings {
            base_url: self.model_url.clone(),
            model: self.model.clone(),
            api_key: self.api_key.clone().filter(|key| !key.is_empty()),
            max_tokens: self.max_tokens,
            request_timeout: self.request_timeout_secs.map(Duration::from_secs),
            ..ModelSettings::default()
        };
        if let Some(path) = &self.prompt_file {
            settings.prompt = fs::read_to_string(path)
                .with_context(|| format!("reading prompt file {}", path.display()))?;
        }
        Ok(settings)
    }
}
