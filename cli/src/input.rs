//! Batch input: plain query lines or a CSV sheet with a query column.

use anyhow::{anyhow, bail, Context, Result};
use clap::ValueEnum;
use std::io::Read;

use geobatch_core::LookupResult;

/// Column looked up in CSV input when none is given.
pub const DEFAULT_COLUMN: &str = "institute";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputFormat {
    /// One query per line; blank lines become blank results
    Lines,
    /// CSV with a header row; queries come from one column
    Csv,
}

/// Parsed input rows, kept so CSV output can echo them back.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchInput {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    column: usize,
}

impl BatchInput {
    /// Read `path` (or stdin for `-`) in the given format.
    pub fn read(path: &str, format: InputFormat, column: &str) -> Result<Self> {
        let content = if path == "-" {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("cannot read queries from stdin")?;
            buf
        } else {
            std::fs::read_to_string(path).with_context(|| format!("cannot read '{path}'"))?
        };
        match format {
            InputFormat::Lines => Ok(Self::from_lines(&content)),
            InputFormat::Csv => Self::from_csv(&content, column)
                .with_context(|| format!("invalid CSV input '{path}'")),
        }
    }

    /// Blank lines are kept so output rows line up with input rows.
    pub fn from_lines(content: &str) -> Self {
        Self {
            headers: vec!["query".to_string()],
            rows: content.lines().map(|l| vec![l.to_string()]).collect(),
            column: 0,
        }
    }

    /// Header row required; the file is rejected when `column` is missing.
    pub fn from_csv(content: &str, column: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(content.as_bytes());
        let headers: Vec<String> = reader
            .headers()
            .context("cannot read CSV header")?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let Some(index) = headers.iter().position(|h| h == column) else {
            bail!(
                "input needs a '{column}' column (found: {})",
                headers.join(", ")
            );
        };

        let mut rows = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record.with_context(|| format!("bad CSV record {}", line + 1))?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(Self {
            headers,
            rows,
            column: index,
        })
    }

    /// The query of every row, in order. Short rows give blank queries.
    pub fn queries(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|row| row.get(self.column).cloned().unwrap_or_default())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The input columns plus `latitude` and `longitude`, one row per input
    /// row. Unresolved rows get empty coordinates.
    pub fn to_csv(&self, results: &[LookupResult]) -> Result<String> {
        if results.len() != self.rows.len() {
            bail!(
                "{} results for {} input rows",
                results.len(),
                self.rows.len()
            );
        }
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(Vec::new());

        let mut header = self.headers.clone();
        header.extend(["latitude".to_string(), "longitude".to_string()]);
        writer.write_record(&header)?;

        for (row, result) in self.rows.iter().zip(results) {
            let (lat, lon) = match result.coordinate {
                Some(c) => (c.lat.to_string(), c.lon.to_string()),
                None => (String::new(), String::new()),
            };
            let mut record = row.clone();
            record.resize(self.headers.len(), String::new());
            record.push(lat);
            record.push(lon);
            writer.write_record(&record)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| anyhow!("cannot flush CSV output: {}", e.error()))?;
        Ok(String::from_utf8(bytes)?)
    }
}
