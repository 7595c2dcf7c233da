//! KDL schema for config.kdl.
//!
//! This module provides:
//! - The Rust struct representing the file
//! - Conversion to and from KDL documents
//! - Validation and merging

use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use serde::{Deserialize, Serialize};

/// Output format preference for CLI commands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON output (default, machine-readable)
    #[default]
    Json,
    /// Human-readable output
    Human,
}

impl OutputFormat {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "human" => Some(OutputFormat::Human),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Human => "human",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// User preferences stored in config.kdl.
///
/// # KDL Schema
///
/// ```kdl
/// responsible "#editor"
/// examples 10
/// seed 42
/// output-format "human"  // or "json"
/// model "gpt-4o"
/// endpoint "https://api.openai.com/v1"
/// temperature 0.1
/// ```
///
/// The API key is never read from this file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RdgaiConfig {
    /// Provenance written by edits and imports
    pub responsible: Option<String>,

    /// Representative examples per category in prompts
    pub examples: Option<usize>,

    /// Seed for example sampling
    pub seed: Option<u64>,

    /// Default output format for CLI commands
    pub output_format: Option<OutputFormat>,

    /// Classification model name
    pub model: Option<String>,

    /// Base URL of the chat completions API
    pub endpoint: Option<String>,

    /// Sampling temperature, 0 to 2
    pub temperature: Option<f64>,
}

fn string_arg(doc: &KdlDocument, name: &str) -> Option<String> {
    doc.get(name)
        .and_then(|node| node.entries().first())
        .and_then(|entry| entry.value().as_string())
        .map(|s| s.to_string())
}

fn integer_arg(doc: &KdlDocument, name: &str) -> Option<i128> {
    doc.get(name)
        .and_then(|node| node.entries().first())
        .and_then(|entry| entry.value().as_integer())
}

fn float_arg(doc: &KdlDocument, name: &str) -> Option<f64> {
    let value = doc.get(name)?.entries().first()?.value();
    value
        .as_float()
        .or_else(|| value.as_integer().map(|i| i as f64))
}

fn push_node(doc: &mut KdlDocument, name: &str, value: KdlValue) {
    let mut node = KdlNode::new(name);
    node.push(KdlEntry::new(value));
    doc.nodes_mut().push(node);
}

impl RdgaiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the config values.
    ///
    /// Returns an error message if any value is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.examples == Some(0) {
            return Err("examples must be at least 1".to_string());
        }
        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(format!("temperature must be 0-2, got {}", temperature));
            }
        }
        if let Some(responsible) = &self.responsible {
            if responsible.trim().is_empty() {
                return Err("responsible must not be empty".to_string());
            }
        }
        Ok(())
    }

    /// Parse config from a KDL document.
    ///
    /// Unknown nodes are ignored. Values of the wrong type are dropped.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        Self {
            responsible: string_arg(doc, "responsible"),
            examples: integer_arg(doc, "examples").and_then(|i| usize::try_from(i).ok()),
            seed: integer_arg(doc, "seed").and_then(|i| u64::try_from(i).ok()),
            output_format: string_arg(doc, "output-format").and_then(|s| OutputFormat::parse(&s)),
            model: string_arg(doc, "model"),
            endpoint: string_arg(doc, "endpoint"),
            temperature: float_arg(doc, "temperature"),
        }
    }

    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        if let Some(ref responsible) = self.responsible {
            push_node(&mut doc, "responsible", KdlValue::String(responsible.clone()));
        }
        if let Some(examples) = self.examples {
            push_node(&mut doc, "examples", KdlValue::Integer(examples as i128));
        }
        if let Some(seed) = self.seed {
            push_node(&mut doc, "seed", KdlValue::Integer(seed as i128));
        }
        if let Some(ref format) = self.output_format {
            push_node(
                &mut doc,
                "output-format",
                KdlValue::String(format.as_str().to_string()),
            );
        }
        if let Some(ref model) = self.model {
            push_node(&mut doc, "model", KdlValue::String(model.clone()));
        }
        if let Some(ref endpoint) = self.endpoint {
            push_node(&mut doc, "endpoint", KdlValue::String(endpoint.clone()));
        }
        if let Some(temperature) = self.temperature {
            push_node(&mut doc, "temperature", KdlValue::Float(temperature));
        }

        doc
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` if they are Some.
    pub fn merge(&mut self, other: &RdgaiConfig) {
        if other.responsible.is_some() {
            self.responsible = other.responsible.clone();
        }
        if other.examples.is_some() {
            self.examples = other.examples;
        }
        if other.seed.is_some() {
            self.seed = other.seed;
        }
        if other.output_format.is_some() {
            self.output_format = other.output_format.clone();
        }
        if other.model.is_some() {
            self.model = other.model.clone();
        }
        if other.endpoint.is_some() {
            self.endpoint = other.endpoint.clone();
        }
        if other.temperature.is_some() {
            self.temperature = other.temperature;
        }
    }
}
