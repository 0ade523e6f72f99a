//! `geobatch batch`: geocode a line list or CSV sheet, results in input order.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

use geobatch_core::{BatchGeocoder, BatchSummary};
use geobatch_providers::build_chain;

use crate::config::AppConfig;
use crate::input::{BatchInput, InputFormat};
use crate::render::{self, Format};

pub struct BatchOptions {
    pub input: String,
    pub input_format: InputFormat,
    pub column: String,
    pub output: Option<PathBuf>,
    pub format: Option<Format>,
    pub max_parallel: Option<usize>,
    pub retry_limit: Option<u32>,
    pub delay_ms: Option<u64>,
}

impl BatchOptions {
    /// CSV in, CSV out unless another format was asked for.
    pub fn output_format(&self) -> Format {
        self.format.unwrap_or(match self.input_format {
            InputFormat::Csv => Format::Csv,
            InputFormat::Lines => Format::Table,
        })
    }

    /// Fold the command-line tunables over the config file's.
    pub fn apply(&self, cfg: &mut AppConfig) {
        if let Some(n) = self.max_parallel {
            cfg.batch.max_parallel = n;
        }
        if let Some(n) = self.retry_limit {
            cfg.batch.retry.retry_limit = n;
        }
        if let Some(ms) = self.delay_ms {
            cfg.batch.inter_call_delay = Duration::from_millis(ms);
        }
    }
}

pub async fn run(mut cfg: AppConfig, opts: BatchOptions) -> Result<()> {
    opts.apply(&mut cfg);

    let input = BatchInput::read(&opts.input, opts.input_format, &opts.column)?;
    let queries = input.queries();
    let backends = build_chain(&cfg.backends, &cfg.http).context("invalid backend chain")?;
    let batch = BatchGeocoder::new(backends, cfg.batch)?.with_progress(|done, total| {
        tracing::debug!(done, total, "batch progress");
    });

    eprintln!(
        "Geocoding {} queries via {} (max_parallel={})",
        queries.len(),
        batch.chain().backend_names().join(" → "),
        batch.max_parallel()
    );

    let results = batch.run(&queries).await;
    let rendered = render::render(&results, opts.output_format(), &input)?;

    match &opts.output {
        Some(path) => std::fs::write(path, rendered)
            .with_context(|| format!("cannot write '{}'", path.display()))?,
        None => print!("{rendered}"),
    }

    let summary = BatchSummary::from_results(&results);
    eprintln!("{summary}");
    for (backend, hits) in &summary.by_backend {
        eprintln!("  {backend}: {hits}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::DEFAULT_COLUMN;

    fn opts(input_format: InputFormat, format: Option<Format>) -> BatchOptions {
        BatchOptions {
            input: "-".into(),
            input_format,
            column: DEFAULT_COLUMN.into(),
            output: None,
            format,
            max_parallel: None,
            retry_limit: None,
            delay_ms: None,
        }
    }

    #[test]
    fn csv_input_defaults_to_csv_output() {
        assert_eq!(opts(InputFormat::Csv, None).output_format(), Format::Csv);
        assert_eq!(opts(InputFormat::Lines, None).output_format(), Format::Table);
        assert_eq!(
            opts(InputFormat::Csv, Some(Format::Json)).output_format(),
            Format::Json
        );
    }

    #[test]
    fn flags_override_the_config_file() {
        let mut cfg = AppConfig::from_json(
            r#"{"batch": {"max_parallel": 2, "retry_limit": 4, "inter_call_delay": 100}}"#,
        )
        .unwrap();
        let mut o = opts(InputFormat::Lines, None);
        o.max_parallel = Some(16);
        o.delay_ms = Some(0);
        o.apply(&mut cfg);

        assert_eq!(cfg.batch.max_parallel, 16);
        assert_eq!(cfg.batch.retry.retry_limit, 4);
        assert!(cfg.batch.inter_call_delay.is_zero());
    }
}
