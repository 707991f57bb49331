// src/output/mod.rs
//! Rendering a [`ComparisonReport`] for people or other programs.

pub mod text;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::compare::ComparisonReport;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Text,
    Json,
    Yaml,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to encode report as JSON")]
    Json(#[from] serde_json::Error),
    #[error("failed to encode report as YAML")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Discrepancies listed per column in text output.
    pub max_discrepancies: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            max_discrepancies: 10,
        }
    }
}

pub fn render(
    report: &ComparisonReport,
    format: Format,
    options: &RenderOptions,
) -> Result<String, RenderError> {
    Ok(match format {
        Format::Text => text::render_text(report, options),
        Format::Json => {
            let mut s = serde_json::to_string_pretty(report)?;
            s.push('\n');
            s
        }
        Format::Yaml => serde_yaml::to_string(report)?,
    })
}
