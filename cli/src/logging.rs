//! Logging setup for the `geobatch` binary.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// The `log` section of the config file.
///
/// Progress and retry chatter goes to stderr; stdout carries only results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Base filter directive; `warn` when unset.
    #[serde(default = "quiet")]
    pub level: String,
    /// Extra directives, crate name → level, e.g. `geobatch-core: debug` to
    /// watch retries without HTTP noise.
    #[serde(default)]
    pub components: HashMap<String, String>,
    /// One JSON object per event instead of text lines.
    #[serde(default)]
    pub json: bool,
}

fn quiet() -> String {
    "warn".into()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: quiet(),
            components: HashMap::default(),
            json: false,
        }
    }
}

impl LogConfig {
    /// Filter directives, e.g. `"warn,geobatch_core=debug"`.
    pub fn directives(&self) -> String {
        let mut components: Vec<_> = self.components.iter().collect();
        components.sort();
        let mut directives = self.level.clone();
        for (component, level) in components {
            directives.push_str(&format!(",{}={}", component.replace('-', "_"), level));
        }
        directives
    }
}

/// Install the global subscriber. Logs go to stderr so stdout stays clean
/// for results. `RUST_LOG`, when set, replaces the configured directives.
pub fn init_tracing(config: &LogConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.directives()))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let registry = tracing_subscriber::registry().with(filter);
    if config.json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?;
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()?;
    }
    Ok(())
}
