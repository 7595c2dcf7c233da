//! Command implementations for the rdgai CLI.
//!
//! Each command loads the document it works on, does its work through the
//! library and returns a serializable result. Commands that change a
//! document write it to the output path they were given:
//! - `show`, `summary`, `examples`, `keys` - Read-only views
//! - `clean`, `import`, `edit_*` - Document repairs and edits
//! - `export` - CSV export
//! - `classify`, `classify_prompts` - Classification service runs
//! - `config_show`, `config_init` - Configuration

use crate::classify::{
    self, ClassificationReport, Classifier, ClassifyOptions, Prompt, apparatus_prompt, pair_prompt,
};
use crate::config::{ResolvedConfig, init_config};
use crate::editor::{EditResponse, EditSession, EditTarget, Operation};
use crate::models::{ApparatusId, CleanReport, Document, ExampleSampler, PairId};
use crate::tabular::{self, ImportReport};
use crate::{Error, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait CommandResult {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

fn json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

// === Shared views ===

/// A pair as shown to users.
#[derive(Debug, Clone, Serialize)]
pub struct PairView {
    pub apparatus: String,
    pub active: String,
    pub passive: String,
    pub active_text: String,
    pub passive_text: String,
    pub label: String,
    pub description: String,
    pub responsible: Vec<String>,
}

impl PairView {
    fn new(doc: &Document, pair: PairId) -> Self {
        let active = doc.reading(doc.pair(pair).active());
        let passive = doc.reading(doc.pair(pair).passive());
        Self {
            apparatus: doc.apparatus_name(doc.pair(pair).apparatus()),
            active: active.identifier.clone(),
            passive: passive.identifier.clone(),
            active_text: active.text.clone(),
            passive_text: passive.text.clone(),
            label: doc.pair_label(pair),
            description: doc.pair_description(pair),
            responsible: doc.responsible(pair),
        }
    }

    fn human_line(&self) -> String {
        if self.description.is_empty() {
            format!("  {}", self.label)
        } else {
            format!("  {} ({})", self.label, self.description)
        }
    }
}

// === show ===

#[derive(Debug, Serialize)]
pub struct CategoryPairs {
    pub category: String,
    pub description: String,
    pub pairs: Vec<PairView>,
}

#[derive(Debug, Serialize)]
pub struct ShowResult {
    pub categories: Vec<CategoryPairs>,
}

impl CommandResult for ShowResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        for group in self.categories.iter().filter(|group| !group.pairs.is_empty()) {
            if group.description.is_empty() {
                lines.push(format!("{} ({})", group.category, group.pairs.len()));
            } else {
                lines.push(format!(
                    "{}: {} ({})",
                    group.category,
                    group.description,
                    group.pairs.len()
                ));
            }
            lines.extend(group.pairs.iter().map(PairView::human_line));
        }
        if lines.is_empty() {
            "No classified pairs.".to_string()
        } else {
            lines.join("\n")
        }
    }
}

/// Classified pairs grouped by category.
pub fn show(doc_path: &Path, ignore: &[String]) -> Result<ShowResult> {
    let doc = Document::load(doc_path)?;
    let categories = doc
        .relation_types()
        .filter(|relation_type| !ignore.contains(&relation_type.name))
        .map(|relation_type| CategoryPairs {
            category: relation_type.name.clone(),
            description: relation_type.description.clone(),
            pairs: relation_type
                .pairs()
                .iter()
                .map(|pair| PairView::new(&doc, *pair))
                .collect(),
        })
        .collect();
    Ok(ShowResult { categories })
}

// === summary ===

#[derive(Debug, Serialize)]
pub struct CategorySummary {
    pub name: String,
    pub description: String,
    pub inverse: Option<String>,
    pub pairs: usize,
}

#[derive(Debug, Serialize)]
pub struct SummaryResult {
    pub language: String,
    pub apparatuses: usize,
    pub readings: usize,
    /// Ordered pairs
    pub pairs: usize,
    pub classified_pairs: usize,
    /// Unordered reading combinations
    pub combinations: usize,
    pub classified_combinations: usize,
    pub categories: Vec<CategorySummary>,
}

impl CommandResult for SummaryResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("Language: {}", if self.language.is_empty() { "-" } else { &self.language }),
            format!("Apparatuses: {}", self.apparatuses),
            format!("Readings: {}", self.readings),
            format!(
                "Combinations classified: {}/{}",
                self.classified_combinations, self.combinations
            ),
            format!("Pairs classified: {}/{}", self.classified_pairs, self.pairs),
            format!("Categories: {}", self.categories.len()),
        ];
        for category in &self.categories {
            let inverse = category
                .inverse
                .as_ref()
                .map(|inverse| format!(" [inverse: {}]", inverse))
                .unwrap_or_default();
            lines.push(format!("  {}: {}{}", category.name, category.pairs, inverse));
        }
        lines.join("\n")
    }
}

pub fn summary(doc_path: &Path) -> Result<SummaryResult> {
    let doc = Document::load(doc_path)?;
    let categories = doc
        .relation_types()
        .map(|relation_type| CategorySummary {
            name: relation_type.name.clone(),
            description: relation_type.description.clone(),
            inverse: relation_type
                .inverse()
                .map(|inverse| doc.relation_type(inverse).name.clone()),
            pairs: relation_type.pairs().len(),
        })
        .collect();
    Ok(SummaryResult {
        language: doc.language(),
        apparatuses: doc.apparatuses().len(),
        readings: doc
            .apparatuses()
            .iter()
            .map(|app| app.readings().len())
            .sum(),
        pairs: doc.all_pairs().count(),
        classified_pairs: doc.get_classified_pairs(true).count(),
        combinations: doc
            .apparatuses()
            .iter()
            .map(|app| app.non_redundant_pairs().len())
            .sum(),
        classified_combinations: doc.get_classified_pairs(false).count(),
        categories,
    })
}

// === clean ===

#[derive(Debug, Serialize)]
pub struct CleanResult {
    pub output: PathBuf,
    #[serde(flatten)]
    pub report: CleanReport,
}

impl CommandResult for CleanResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Normalized {} ana attributes, merged {} relation groups, removed {} duplicates\nWrote {}",
            self.report.normalized,
            self.report.merged,
            self.report.removed,
            self.output.display()
        )
    }
}

pub fn clean(doc_path: &Path, output: &Path) -> Result<CleanResult> {
    let mut doc = Document::load(doc_path)?;
    let report = doc.clean();
    doc.write(output)?;
    Ok(CleanResult {
        output: output.to_path_buf(),
        report,
    })
}

// === export / import ===

#[derive(Debug, Serialize)]
pub struct ExportResult {
    pub output: PathBuf,
    pub rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories_output: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<usize>,
}

impl CommandResult for ExportResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut text = format!("Exported {} pairs to {}", self.rows, self.output.display());
        if let (Some(path), Some(count)) = (&self.categories_output, self.categories) {
            text.push_str(&format!(
                "\nExported {} categories to {}",
                count,
                path.display()
            ));
        }
        text
    }
}

pub fn export(
    doc_path: &Path,
    output: &Path,
    categories_output: Option<&Path>,
    all_pairs: bool,
) -> Result<ExportResult> {
    let mut doc = Document::load(doc_path)?;
    let rows = tabular::export_pairs(&mut doc, BufWriter::new(File::create(output)?), all_pairs)?;
    let categories = match categories_output {
        Some(path) => Some(tabular::export_categories(
            &doc,
            BufWriter::new(File::create(path)?),
        )?),
        None => None,
    };
    Ok(ExportResult {
        output: output.to_path_buf(),
        rows,
        categories_output: categories_output.map(Path::to_path_buf),
        categories,
    })
}

#[derive(Debug, Serialize)]
pub struct ImportResult {
    pub output: PathBuf,
    #[serde(flatten)]
    pub report: ImportReport,
}

impl CommandResult for ImportResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Imported {} rows ({} skipped): {} categories added, {} removed, {} descriptions changed\nWrote {}",
            self.report.rows,
            self.report.skipped,
            self.report.added,
            self.report.removed,
            self.report.descriptions_changed,
            self.output.display()
        )
    }
}

pub fn import(
    doc_path: &Path,
    spreadsheet: &Path,
    output: &Path,
    responsible: &str,
) -> Result<ImportResult> {
    let mut doc = Document::load(doc_path)?;
    let reader = BufReader::new(File::open(spreadsheet).map_err(|e| {
        Error::NotFound(format!("{}: {}", spreadsheet.display(), e))
    })?);
    let report = tabular::import_pairs(&mut doc, reader, responsible)?;
    doc.write(output)?;
    Ok(ImportResult {
        output: output.to_path_buf(),
        report,
    })
}

// === classify ===

/// How classification requests are grouped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifyMode {
    /// One request per apparatus covering all its combinations
    #[default]
    Apparatus,
    /// One request per pair
    Pair,
}

/// Everything a classification run needs besides the document.
#[derive(Debug, Clone)]
pub struct ClassifySettings {
    pub mode: ClassifyMode,
    pub options: ClassifyOptions,
    pub seed: u64,
    /// Pair mode: consider both directions of every combination
    pub all_pairs: bool,
    /// Restrict the run to these apparatuses
    pub apparatus: Vec<String>,
    /// Maximum number of requests
    pub limit: Option<usize>,
}

enum Target {
    Apparatus(ApparatusId),
    Pair(PairId),
}

fn select_apparatuses(doc: &Document, names: &[String]) -> Result<Vec<ApparatusId>> {
    if names.is_empty() {
        return Ok(doc.apparatuses().iter().map(|app| app.id()).collect());
    }
    names
        .iter()
        .map(|name| {
            doc.apparatus_by_name(name)
                .ok_or_else(|| Error::NotFound(format!("Apparatus not found: {}", name)))
        })
        .collect()
}

fn targets(doc: &Document, settings: &ClassifySettings) -> Result<Vec<Target>> {
    let apparatuses = select_apparatuses(doc, &settings.apparatus)?;
    let mut targets: Vec<Target> = match settings.mode {
        ClassifyMode::Apparatus => apparatuses
            .into_iter()
            .filter(|app| doc.non_redundant_pairs(*app).any(|pair| !pair.is_classified()))
            .map(Target::Apparatus)
            .collect(),
        ClassifyMode::Pair => apparatuses
            .into_iter()
            .flat_map(|app| {
                let pairs: Vec<PairId> = if settings.all_pairs {
                    doc.pairs(app).map(|pair| pair.id()).collect()
                } else {
                    doc.non_redundant_pairs(app).map(|pair| pair.id()).collect()
                };
                pairs
            })
            .filter(|pair| !doc.pair(*pair).is_classified())
            .map(Target::Pair)
            .collect(),
    };
    if let Some(limit) = settings.limit {
        targets.truncate(limit);
    }
    Ok(targets)
}

#[derive(Debug, Serialize)]
pub struct ClassifyResult {
    pub output: PathBuf,
    pub mode: ClassifyMode,
    #[serde(flatten)]
    pub report: ClassificationReport,
}

impl CommandResult for ClassifyResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut lines: Vec<String> = self
            .report
            .decisions
            .iter()
            .map(|decision| {
                format!(
                    "{}: {} ➞ {} = {}",
                    decision.apparatus, decision.active, decision.passive, decision.category
                )
            })
            .collect();
        lines.push(format!(
            "Classified {} of {} ({} skipped, {} failed) in {}s",
            self.report.classified,
            self.report.requested,
            self.report.skipped,
            self.report.failed,
            (self.report.finished_at - self.report.started_at).num_seconds()
        ));
        lines.push(format!("Wrote {}", self.output.display()));
        lines.join("\n")
    }
}

/// Classify unclassified pairs, writing the document after each decision.
pub fn classify(
    doc_path: &Path,
    output: &Path,
    settings: &ClassifySettings,
    classifier: &mut dyn Classifier,
) -> Result<ClassifyResult> {
    let mut doc = Document::load(doc_path)?;
    let mut sampler = ExampleSampler::new(settings.seed);
    let targets = targets(&doc, settings)?;

    let mut report = ClassificationReport::empty();
    match settings.mode {
        ClassifyMode::Apparatus => {
            doc.write(output)?;
            for target in targets {
                if let Target::Apparatus(app) = target {
                    report.absorb(classify::classify_apparatus(
                        &mut doc,
                        app,
                        classifier,
                        &mut sampler,
                        &settings.options,
                        output,
                    )?);
                }
            }
        }
        ClassifyMode::Pair => {
            let pairs: Vec<PairId> = targets
                .into_iter()
                .filter_map(|target| match target {
                    Target::Pair(pair) => Some(pair),
                    Target::Apparatus(_) => None,
                })
                .collect();
            report.absorb(classify::classify_pairs(
                &mut doc,
                &pairs,
                classifier,
                &mut sampler,
                &settings.options,
                output,
            )?);
        }
    }

    Ok(ClassifyResult {
        output: output.to_path_buf(),
        mode: settings.mode,
        report,
    })
}

#[derive(Debug, Serialize)]
pub struct RenderedPrompt {
    pub target: String,
    pub prompt: Prompt,
}

#[derive(Debug, Serialize)]
pub struct PromptsResult {
    pub prompts: Vec<RenderedPrompt>,
}

impl CommandResult for PromptsResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.prompts.is_empty() {
            return "Nothing to classify.".to_string();
        }
        self.prompts
            .iter()
            .map(|rendered| format!("=== {} ===\n{}", rendered.target, rendered.prompt))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Render the prompts a classification run would send, without sending them.
pub fn classify_prompts(doc_path: &Path, settings: &ClassifySettings) -> Result<PromptsResult> {
    let doc = Document::load(doc_path)?;
    let mut sampler = ExampleSampler::new(settings.seed);
    let prompts = targets(&doc, settings)?
        .into_iter()
        .map(|target| match target {
            Target::Apparatus(app) => RenderedPrompt {
                target: doc.apparatus_name(app),
                prompt: apparatus_prompt(&doc, app, &mut sampler, &settings.options),
            },
            Target::Pair(pair) => RenderedPrompt {
                target: doc.pair_label(pair),
                prompt: pair_prompt(&doc, pair, &mut sampler, &settings.options),
            },
        })
        .collect();
    Ok(PromptsResult { prompts })
}

// === examples ===

#[derive(Debug, Serialize)]
pub struct ExamplesResult {
    pub category: String,
    pub seed: u64,
    pub examples: Vec<PairView>,
}

impl CommandResult for ExamplesResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut lines = vec![format!(
            "{} representative examples of {}:",
            self.examples.len(),
            self.category
        )];
        lines.extend(self.examples.iter().map(PairView::human_line));
        lines.join("\n")
    }
}

/// Representative examples of a category, as used in prompts.
pub fn examples(doc_path: &Path, category: &str, count: usize, seed: u64) -> Result<ExamplesResult> {
    let doc = Document::load(doc_path)?;
    let relation_type = doc
        .relation_type_by_name(category)
        .ok_or_else(|| Error::NotFound(format!("Category not found: {}", category)))?
        .id();
    let mut sampler = ExampleSampler::new(seed);
    let examples = sampler
        .representative_examples(&doc, relation_type, count)
        .into_iter()
        .map(|pair| PairView::new(&doc, pair))
        .collect();
    Ok(ExamplesResult {
        category: category.to_string(),
        seed,
        examples,
    })
}

// === keys / edit ===

#[derive(Debug, Serialize)]
pub struct KeyEntry {
    pub key: String,
    pub kind: &'static str,
}

#[derive(Debug, Serialize)]
pub struct KeysResult {
    pub keys: Vec<KeyEntry>,
}

impl CommandResult for KeysResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        self.keys
            .iter()
            .map(|entry| format!("{}\t{}", entry.kind, entry.key))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Every key an editing front end can use for this document.
pub fn keys(doc_path: &Path) -> Result<KeysResult> {
    let session = EditSession::new(Document::load(doc_path)?, doc_path);
    let keys = session
        .keys()
        .map(|key| KeyEntry {
            key: key.to_string(),
            kind: match session.target(key) {
                Some(EditTarget::RelationType(_)) => "category",
                _ => "pair",
            },
        })
        .collect();
    Ok(KeysResult { keys })
}

#[derive(Debug, Serialize)]
pub struct EditResult {
    #[serde(flatten)]
    pub response: EditResponse,
}

impl CommandResult for EditResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.response.success {
            self.response.message.clone()
        } else {
            format!("Failed: {}", self.response.message)
        }
    }
}

pub fn edit_relation_type(
    doc_path: &Path,
    output: &Path,
    pair_key: &str,
    type_key: &str,
    operation: Operation,
    responsible: Option<String>,
) -> Result<EditResult> {
    let mut session =
        EditSession::new(Document::load(doc_path)?, output).with_responsible(responsible);
    let response = session.set_relation_type(pair_key, type_key, operation);
    Ok(EditResult { response })
}

pub fn edit_description(
    doc_path: &Path,
    output: &Path,
    pair_key: &str,
    text: Option<&str>,
) -> Result<EditResult> {
    let mut session = EditSession::new(Document::load(doc_path)?, output);
    let response = session.set_description(pair_key, text);
    Ok(EditResult { response })
}

// === config ===

#[derive(Debug, Serialize)]
pub struct ConfigShowResult {
    #[serde(flatten)]
    pub config: ResolvedConfig,
}

impl CommandResult for ConfigShowResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let config = &self.config;
        let mut lines = vec![match &config.file {
            Some(path) => format!("Config file: {}", path.display()),
            None => "Config file: (none)".to_string(),
        }];
        lines.push(format!(
            "responsible = {} ({})",
            config.responsible.value, config.responsible.source
        ));
        lines.push(format!(
            "examples = {} ({})",
            config.examples.value, config.examples.source
        ));
        lines.push(format!("seed = {} ({})", config.seed.value, config.seed.source));
        lines.push(format!(
            "output-format = {} ({})",
            config.output_format.value, config.output_format.source
        ));
        lines.push(format!("model = {} ({})", config.model.value, config.model.source));
        lines.push(format!(
            "endpoint = {} ({})",
            config.endpoint.value, config.endpoint.source
        ));
        lines.push(format!(
            "temperature = {} ({})",
            config.temperature.value, config.temperature.source
        ));
        lines.join("\n")
    }
}

pub fn config_show(config: &ResolvedConfig) -> ConfigShowResult {
    ConfigShowResult {
        config: config.clone(),
    }
}

#[derive(Debug, Serialize)]
pub struct ConfigInitResult {
    pub path: PathBuf,
}

impl CommandResult for ConfigInitResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!("Wrote default configuration to {}", self.path.display())
    }
}

/// Write a default config file. `path` is `None` when no config directory
/// could be determined.
pub fn config_init(path: Option<&Path>, force: bool) -> Result<ConfigInitResult> {
    let path = path.ok_or_else(|| {
        Error::NotFound("No configuration directory available; pass --config".into())
    })?;
    init_config(path, force)?;
    Ok(ConfigInitResult {
        path: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MINIMAL;
    use tempfile::TempDir;

    fn fixture(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("minimal.xml");
        std::fs::write(&path, MINIMAL).unwrap();
        path
    }

    fn settings(mode: ClassifyMode) -> ClassifySettings {
        ClassifySettings {
            mode,
            options: ClassifyOptions::default(),
            seed: 42,
            all_pairs: false,
            apparatus: Vec::new(),
            limit: None,
        }
    }

    struct Fixed(&'static str);

    impl Classifier for Fixed {
        fn complete(&mut self, _prompt: &Prompt) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn test_summary_counts() {
        let dir = TempDir::new().unwrap();
        let result = summary(&fixture(&dir)).unwrap();
        assert_eq!(result.apparatuses, 1);
        assert_eq!(result.readings, 3);
        assert_eq!(result.pairs, 6);
        assert_eq!(result.combinations, 3);
        assert_eq!(result.classified_pairs, 0);
        assert_eq!(result.categories.len(), 3);
        assert!(result.to_human().contains("Combinations classified: 0/3"));
    }

    #[test]
    fn test_classify_pair_mode_then_show() {
        let dir = TempDir::new().unwrap();
        let doc = fixture(&dir);
        let output = dir.path().join("output.xml");
        let mut classifier = Fixed("category2\nSimilar words");

        let result = classify(&doc, &output, &settings(ClassifyMode::Pair), &mut classifier).unwrap();
        assert_eq!(result.report.requested, 3);
        assert_eq!(result.report.classified, 3);

        let shown = show(&output, &[]).unwrap();
        let category2 = shown
            .categories
            .iter()
            .find(|group| group.category == "category2")
            .unwrap();
        assert_eq!(category2.pairs.len(), 6);
        assert_eq!(category2.pairs[0].description, "Similar words");
        assert_eq!(category2.pairs[0].responsible, vec!["#rdgai".to_string()]);
        assert!(shown.to_human().contains("category2: Description 2 (6)"));
    }

    #[test]
    fn test_classify_prompts_respects_limit() {
        let dir = TempDir::new().unwrap();
        let doc = fixture(&dir);
        let mut pair_settings = settings(ClassifyMode::Pair);
        pair_settings.limit = Some(2);
        let result = classify_prompts(&doc, &pair_settings).unwrap();
        assert_eq!(result.prompts.len(), 2);
        assert_eq!(result.prompts[0].target, "B1K1V1U2: Reading 1 ➞ Reading 2");

        let result = classify_prompts(&doc, &settings(ClassifyMode::Apparatus)).unwrap();
        assert_eq!(result.prompts.len(), 1);
        assert!(result.prompts[0].prompt.assistant.is_some());
    }

    #[test]
    fn test_classify_unknown_apparatus() {
        let dir = TempDir::new().unwrap();
        let mut unknown = settings(ClassifyMode::Apparatus);
        unknown.apparatus = vec!["missing".to_string()];
        assert!(matches!(
            classify_prompts(&fixture(&dir), &unknown),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_examples_unknown_category() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            examples(&fixture(&dir), "category9", 5, 42),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_config_init_without_location() {
        assert!(matches!(config_init(None, false), Err(Error::NotFound(_))));

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rdgai").join("config.kdl");
        let result = config_init(Some(&path), false).unwrap();
        assert_eq!(result.path, path);
        assert!(path.exists());
    }

    #[test]
    fn test_keys_kinds() {
        let dir = TempDir::new().unwrap();
        let result = keys(&fixture(&dir)).unwrap();
        assert_eq!(result.keys.len(), 9);
        assert_eq!(result.keys[0].kind, "category");
        assert_eq!(result.keys[8].kind, "pair");
    }
}
