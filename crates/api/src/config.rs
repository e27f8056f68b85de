use anyhow::{Context, Result};
use pipeline::PipelineTiming;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub mode: OperationMode,
    pub server: ServerConfig,
    pub data: DataConfig,
    pub chat: ChatConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum OperationMode {
    Realtime, // Default: stage animation at presentation speed
    Fast,     // Delays divided by 10, for demos and smoke runs
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// View sessions kept before the oldest quarter is evicted.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

fn default_max_sessions() -> usize {
    1024
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Directory that site-relative document paths resolve against.
    pub root: PathBuf,
    /// JSON array of case definitions; built-ins when absent.
    pub cases_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    pub base_url: String,
    pub client_tag: String,
    pub history_window: usize,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub timing: PipelineTiming,
    pub seed: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mode: OperationMode::Realtime,
            server: ServerConfig {
                bind_addr: "0.0.0.0:3000".to_string(),
                max_sessions: default_max_sessions(),
            },
            data: DataConfig {
                root: PathBuf::from("public"),
                cases_file: None,
            },
            chat: ChatConfig {
                base_url: chat::DEFAULT_BACKEND_URL.to_string(),
                client_tag: "nips".to_string(),
                history_window: 10,
                request_timeout_secs: 30,
            },
            pipeline: PipelineConfig {
                timing: PipelineTiming::default(),
                seed: None,
            },
        }
    }
}

impl AppConfig {
    pub fn fast_mode() -> Self {
        let mut config = Self::default();
        config.mode = OperationMode::Fast;
        config.pipeline.timing = PipelineTiming::accelerated(10);
        config
    }

    pub fn for_mode(mode: OperationMode) -> Self {
        match mode {
            OperationMode::Realtime => Self::default(),
            OperationMode::Fast => Self::fast_mode(),
        }
    }

    /// Config from `NIPS_CONFIG` (a JSON file) or the `NIPS_MODE` preset,
    /// then individual environment overrides.
    pub fn load() -> Result<Self> {
        let lookup = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());

        let mut config = match lookup("NIPS_CONFIG") {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => {
                let mode = lookup("NIPS_MODE")
                    .map(|m| parse_mode(&m))
                    .transpose()?
                    .unwrap_or(OperationMode::Realtime);
                Self::for_mode(mode)
            }
        };

        config.apply_overrides(lookup)?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {:?}", path))?;
        serde_json::from_str(&content).context("Failed to parse config file")
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("NIPS_BIND_ADDR") {
            self.server.bind_addr = addr;
        }
        if let Some(max) = lookup("NIPS_MAX_SESSIONS") {
            self.server.max_sessions = max
                .parse()
                .context(format!("NIPS_MAX_SESSIONS is not an integer: {}", max))?;
        }
        if let Some(root) = lookup("NIPS_DATA_ROOT") {
            self.data.root = PathBuf::from(root);
        }
        if let Some(file) = lookup("NIPS_CASES_FILE") {
            self.data.cases_file = Some(PathBuf::from(file));
        }
        if let Some(url) = lookup("NIPS_BACKEND_URL") {
            self.chat.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(seed) = lookup("NIPS_PIPELINE_SEED") {
            let seed = seed
                .parse()
                .context(format!("NIPS_PIPELINE_SEED is not an integer: {}", seed))?;
            self.pipeline.seed = Some(seed);
        }
        Ok(())
    }
}

fn parse_mode(value: &str) -> Result<OperationMode> {
    match value.to_ascii_lowercase().as_str() {
        "realtime" => Ok(OperationMode::Realtime),
        "fast" => Ok(OperationMode::Fast),
        other => anyhow::bail!("Unknown NIPS_MODE: {}", other),
    }
}
