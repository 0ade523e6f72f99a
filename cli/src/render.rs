//! Output formatting for batch and lookup results.

use clap::ValueEnum;

use geobatch_core::{Candidate, LookupResult};

use crate::input::BatchInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Aligned text table
    Table,
    /// JSON array, one object per input line
    Json,
    /// The input columns plus latitude and longitude
    Csv,
}

pub fn render(
    results: &[LookupResult],
    format: Format,
    input: &BatchInput,
) -> anyhow::Result<String> {
    match format {
        Format::Table => Ok(table(results)),
        Format::Json => Ok(serde_json::to_string_pretty(results)? + "\n"),
        Format::Csv => input.to_csv(results),
    }
}

/// `#  query  latitude  longitude  backend  outcome`, one row per input.
pub fn table(results: &[LookupResult]) -> String {
    let width = results
        .iter()
        .map(|r| r.query.chars().count())
        .max()
        .unwrap_or(0)
        .max("query".len());

    let mut out = format!(
        "{:>4}  {:<width$}  {:>11}  {:>12}  {:<10}  {}\n",
        "#", "query", "latitude", "longitude", "backend", "outcome"
    );
    for r in results {
        let (lat, lon) = match r.coordinate {
            Some(c) => (format!("{:.6}", c.lat), format!("{:.6}", c.lon)),
            None => ("-".to_string(), "-".to_string()),
        };
        out.push_str(&format!(
            "{:>4}  {:<width$}  {:>11}  {:>12}  {:<10}  {}\n",
            r.index,
            r.query,
            lat,
            lon,
            r.backend.as_deref().unwrap_or("-"),
            r.outcome
        ));
    }
    out
}

pub fn candidates(list: &[Candidate]) -> String {
    let mut out = String::new();
    for (i, c) in list.iter().enumerate() {
        out.push_str(&format!("{:>2}. {}  ({})", i + 1, c.label, c.coordinate));
        if let Some(t) = &c.place_type {
            out.push_str(&format!("  [{t}]"));
        }
        out.push('\n');
    }
    out
}
