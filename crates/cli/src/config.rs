use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tally_batch::BatchConfig;
use tally_rates::BackendConfig;

/// Config file read when `--config` is not given.
pub const DEFAULT_CONFIG: &str = "tally.toml";

/// Contents of `tally.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
	/// Coordinator tuning.
	pub batch: BatchConfig,
	/// In-process backend settings.
	pub backend: BackendConfig,
}

impl Config {
	/// Loads `explicit`, or [`DEFAULT_CONFIG`] if it exists, or defaults.
	///
	/// An explicitly named file must exist.
	pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
		let path = match explicit {
			Some(path) => path.to_path_buf(),
			None => {
				let fallback = PathBuf::from(DEFAULT_CONFIG);
				if !fallback.exists() {
					tracing::debug!("config.defaults");
					return Ok(Self::default());
				}
				fallback
			}
		};
		let text = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
		let config = Self::parse(&text).with_context(|| format!("parsing {}", path.display()))?;
		tracing::debug!(path = %path.display(), ?config, "config.loaded");
		Ok(config)
	}

	/// Parses config text.
	pub fn parse(text: &str) -> anyhow::Result<Self> {
		Ok(toml::from_str(text)?)
	}
}
