//! Precedence resolution for configuration.
//!
//! ## File location (highest to lowest)
//!
//! 1. `--config <path>` CLI flag
//! 2. `RDGAI_CONFIG` environment variable
//! 3. `<config dir>/rdgai/config.kdl` (e.g. `~/.config/rdgai/config.kdl`)
//!
//! An explicitly named file must exist; the default location is optional.
//!
//! ## Value precedence (highest to lowest)
//!
//! 1. CLI flags (passed at runtime)
//! 2. config.kdl
//! 3. Built-in defaults

use crate::classify::openai::{DEFAULT_ENDPOINT, DEFAULT_MODEL, DEFAULT_TEMPERATURE};
use crate::config::{OutputFormat, RdgaiConfig};
use crate::models::sampler::DEFAULT_SEED;
use crate::{Error, Result};
use kdl::KdlDocument;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "RDGAI_CONFIG";

pub const DEFAULT_RESPONSIBLE: &str = "#editor";
pub const DEFAULT_EXAMPLES: usize = 10;

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from environment variable
    EnvVar(String),
    /// Value from a config file
    ConfigFile(String),
    /// Value from CLI flag
    CliFlag,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::ConfigFile(path) => write!(f, "file:{}", path),
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

impl Serialize for ValueSource {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone, Serialize)]
pub struct Resolved<T> {
    pub value: T,
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Where config.kdl is looked for, and why.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigLocation {
    pub path: PathBuf,
    pub source: ValueSource,
    /// Whether the file must exist
    pub required: bool,
}

/// Default config file path, if the platform has a config directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("rdgai").join("config.kdl"))
}

/// Pick the config file: CLI flag, then `RDGAI_CONFIG`, then the default
/// location.
pub fn locate_config(flag: Option<&Path>) -> Option<ConfigLocation> {
    if let Some(path) = flag {
        return Some(ConfigLocation {
            path: path.to_path_buf(),
            source: ValueSource::CliFlag,
            required: true,
        });
    }
    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|value| !value.is_empty()) {
        return Some(ConfigLocation {
            path: PathBuf::from(path),
            source: ValueSource::EnvVar(CONFIG_ENV.to_string()),
            required: true,
        });
    }
    default_config_path().map(|path| ConfigLocation {
        path,
        source: ValueSource::Default,
        required: false,
    })
}

/// Read and validate a config file.
pub fn load_config(location: &ConfigLocation) -> Result<RdgaiConfig> {
    if !location.path.exists() {
        if location.required {
            return Err(Error::NotFound(format!(
                "Config file not found: {}",
                location.path.display()
            )));
        }
        return Ok(RdgaiConfig::default());
    }

    let content = std::fs::read_to_string(&location.path)?;
    let doc: KdlDocument = content.parse()?;
    let config = RdgaiConfig::from_kdl(&doc);
    config.validate().map_err(|e| {
        Error::InvalidInput(format!("{}: {}", location.path.display(), e))
    })?;
    Ok(config)
}

/// Fully resolved configuration with source tracking.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    /// The config file that was read, if any
    pub file: Option<PathBuf>,
    pub responsible: Resolved<String>,
    pub examples: Resolved<usize>,
    pub seed: Resolved<u64>,
    pub output_format: Resolved<OutputFormat>,
    pub model: Resolved<String>,
    pub endpoint: Resolved<String>,
    pub temperature: Resolved<f64>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            file: None,
            responsible: Resolved::new(DEFAULT_RESPONSIBLE.to_string(), ValueSource::Default),
            examples: Resolved::new(DEFAULT_EXAMPLES, ValueSource::Default),
            seed: Resolved::new(DEFAULT_SEED, ValueSource::Default),
            output_format: Resolved::new(OutputFormat::Json, ValueSource::Default),
            model: Resolved::new(DEFAULT_MODEL.to_string(), ValueSource::Default),
            endpoint: Resolved::new(DEFAULT_ENDPOINT.to_string(), ValueSource::Default),
            temperature: Resolved::new(DEFAULT_TEMPERATURE, ValueSource::Default),
        }
    }
}

impl ResolvedConfig {
    pub fn output_format(&self) -> &OutputFormat {
        &self.output_format.value
    }

    pub fn is_human(&self) -> bool {
        self.output_format.value == OutputFormat::Human
    }
}

/// CLI overrides for configuration resolution.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub responsible: Option<String>,
    pub examples: Option<usize>,
    pub seed: Option<u64>,
    pub output_format: Option<OutputFormat>,
    pub model: Option<String>,
    pub endpoint: Option<String>,
    pub temperature: Option<f64>,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responsible(mut self, responsible: impl Into<String>) -> Self {
        self.responsible = Some(responsible.into());
        self
    }

    pub fn with_examples(mut self, examples: usize) -> Self {
        self.examples = Some(examples);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// The overrides as a config, for validation.
    fn as_config(&self) -> RdgaiConfig {
        RdgaiConfig {
            responsible: self.responsible.clone(),
            examples: self.examples,
            seed: self.seed,
            output_format: self.output_format.clone(),
            model: self.model.clone(),
            endpoint: self.endpoint.clone(),
            temperature: self.temperature,
        }
    }
}

/// CLI value, else file value, else the default already in `slot`.
fn resolve_value<T>(slot: &mut Resolved<T>, cli: Option<T>, file: Option<T>, file_source: &ValueSource) {
    if let Some(value) = cli {
        *slot = Resolved::new(value, ValueSource::CliFlag);
    } else if let Some(value) = file {
        *slot = Resolved::new(value, file_source.clone());
    }
}

/// Resolve configuration from an already loaded file.
pub fn resolve_with(
    file: Option<(&Path, &RdgaiConfig)>,
    overrides: &ConfigOverrides,
) -> Result<ResolvedConfig> {
    overrides.as_config().validate().map_err(Error::InvalidInput)?;

    let mut result = ResolvedConfig::default();
    let empty = RdgaiConfig::default();
    let (config, source) = match file {
        Some((path, config)) => {
            result.file = Some(path.to_path_buf());
            (config, ValueSource::ConfigFile(path.display().to_string()))
        }
        None => (&empty, ValueSource::Default),
    };

    resolve_value(
        &mut result.responsible,
        overrides.responsible.clone(),
        config.responsible.clone(),
        &source,
    );
    resolve_value(&mut result.examples, overrides.examples, config.examples, &source);
    resolve_value(&mut result.seed, overrides.seed, config.seed, &source);
    resolve_value(
        &mut result.output_format,
        overrides.output_format.clone(),
        config.output_format.clone(),
        &source,
    );
    resolve_value(&mut result.model, overrides.model.clone(), config.model.clone(), &source);
    resolve_value(
        &mut result.endpoint,
        overrides.endpoint.clone(),
        config.endpoint.clone(),
        &source,
    );
    resolve_value(
        &mut result.temperature,
        overrides.temperature,
        config.temperature,
        &source,
    );

    Ok(result)
}

/// Resolve configuration with the full precedence chain.
pub fn resolve_config(flag: Option<&Path>, overrides: &ConfigOverrides) -> Result<ResolvedConfig> {
    let location = locate_config(flag);
    match location {
        Some(location) if location.path.exists() || location.required => {
            let config = load_config(&location)?;
            resolve_with(Some((&location.path, &config)), overrides)
        }
        _ => resolve_with(None, overrides),
    }
}

/// Write a config file holding every default value.
///
/// Refuses to replace an existing file unless `force` is set.
pub fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(Error::InvalidInput(format!(
            "Config file already exists: {} (use --force to overwrite)",
            path.display()
        )));
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let defaults = RdgaiConfig {
        responsible: Some(DEFAULT_RESPONSIBLE.to_string()),
        examples: Some(DEFAULT_EXAMPLES),
        seed: Some(DEFAULT_SEED),
        output_format: Some(OutputFormat::Json),
        model: Some(DEFAULT_MODEL.to_string()),
        endpoint: Some(DEFAULT_ENDPOINT.to_string()),
        temperature: Some(DEFAULT_TEMPERATURE),
    };
    let mut doc = defaults.to_kdl();
    doc.autoformat();
    std::fs::write(path, doc.to_string())?;
    Ok(())
}
