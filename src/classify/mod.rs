//! Classification of reading pairs by an external service.
//!
//! - [`prompt`] renders the request for one pair or a whole apparatus
//! - [`parser`] pulls categories and justifications out of responses
//! - [`openai`] talks to an OpenAI-compatible chat completions endpoint
//!
//! Every accepted decision is applied with its inverse and the document is
//! written straight away, so an interrupted run leaves a valid file behind.
//! A failed call or an unusable response only skips that item.

pub mod openai;
pub mod parser;
pub mod prompt;

pub use openai::OpenAiClassifier;
pub use parser::{
    ApparatusResult, CategoryParser, parse_apparatus_output, parse_category_and_justification,
};
pub use prompt::{Prompt, apparatus_prompt, pair_prompt};

use crate::Result;
use crate::models::{
    ApparatusId, Document, ExampleSampler, PairId, RDGAI_RESPONSIBLE, RelationTypeId,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

/// A blocking request/response classification service.
pub trait Classifier {
    fn complete(&mut self, prompt: &Prompt) -> Result<String>;
}

/// Settings shared by every classification call in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifyOptions {
    /// Representative examples per category in each prompt
    pub examples: usize,
    /// Categories neither offered nor accepted
    pub ignore: Vec<String>,
    /// Provenance written into `resp`
    pub responsible: String,
}

impl Default for ClassifyOptions {
    fn default() -> Self {
        Self {
            examples: 10,
            ignore: Vec::new(),
            responsible: RDGAI_RESPONSIBLE.to_string(),
        }
    }
}

/// One accepted classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub apparatus: String,
    pub active: String,
    pub passive: String,
    pub category: String,
    pub justification: String,
}

/// Summary of a classification run.
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Pairs put to the service
    pub requested: usize,
    pub classified: usize,
    /// Responses without a usable category
    pub skipped: usize,
    /// Calls that failed outright
    pub failed: usize,
    pub decisions: Vec<Decision>,
}

impl ClassificationReport {
    fn start() -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: now,
            requested: 0,
            classified: 0,
            skipped: 0,
            failed: 0,
            decisions: Vec::new(),
        }
    }

    fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self
    }

    /// An empty report for a run that is about to start.
    pub fn empty() -> Self {
        Self::start()
    }

    /// Fold a later report into this one.
    pub fn absorb(&mut self, other: ClassificationReport) {
        self.finished_at = self.finished_at.max(other.finished_at);
        self.requested += other.requested;
        self.classified += other.classified;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.decisions.extend(other.decisions);
    }
}

/// Resolve a category name to a relation type the run may use.
fn accepted_type(
    doc: &Document,
    options: &ClassifyOptions,
    category: &str,
) -> Option<RelationTypeId> {
    if options.ignore.iter().any(|ignored| ignored == category) {
        return None;
    }
    doc.relation_type_by_name(category).map(|relation_type| relation_type.id())
}

fn apply(
    doc: &mut Document,
    pair: PairId,
    category: &str,
    justification: &str,
    options: &ClassifyOptions,
    output: &Path,
    report: &mut ClassificationReport,
) -> Result<()> {
    let Some(relation_type) = accepted_type(doc, options, category) else {
        warn!("Unknown category '{}' for {}", category, doc.pair_label(pair));
        report.skipped += 1;
        return Ok(());
    };

    doc.add_type_with_inverse(
        pair,
        relation_type,
        Some(&options.responsible),
        justification,
        None,
    );
    doc.write(output)?;

    info!("{}: {}", doc.pair_label(pair), category);
    let active = doc.pair(pair).active();
    let passive = doc.pair(pair).passive();
    report.decisions.push(Decision {
        apparatus: doc.apparatus_name(doc.pair(pair).apparatus()),
        active: doc.reading(active).identifier.clone(),
        passive: doc.reading(passive).identifier.clone(),
        category: category.to_string(),
        justification: justification.to_string(),
    });
    report.classified += 1;
    Ok(())
}

/// Classify pairs one at a time, writing the document to `output` after
/// each accepted decision.
pub fn classify_pairs(
    doc: &mut Document,
    pairs: &[PairId],
    classifier: &mut dyn Classifier,
    sampler: &mut ExampleSampler,
    options: &ClassifyOptions,
    output: &Path,
) -> Result<ClassificationReport> {
    let mut report = ClassificationReport::start();
    let parser = CategoryParser::new(
        doc.relation_types()
            .map(|relation_type| relation_type.name.clone())
            .filter(|name| !options.ignore.contains(name)),
    );
    doc.write(output)?;

    for &pair in pairs {
        let label = doc.pair_label(pair);
        if doc.pair(pair).is_classified() {
            debug!("{} was classified earlier in this run", label);
            continue;
        }
        report.requested += 1;
        let prompt = pair_prompt(doc, pair, sampler, options);

        let response = match classifier.complete(&prompt) {
            Ok(response) => response,
            Err(e) => {
                warn!("Classification of {} failed: {}", label, e);
                report.failed += 1;
                continue;
            }
        };
        debug!("Response for {}: {}", label, response);

        let Some((category, justification)) = parser.parse(&response) else {
            warn!("No known category in the response for {}", label);
            report.skipped += 1;
            continue;
        };
        apply(doc, pair, &category, &justification, options, output, &mut report)?;
    }

    Ok(report.finish())
}

/// Classify every unclassified combination of an apparatus with one request.
///
/// A response line naming `r1 → r2` is applied to that pair together with
/// its inverse; lines for pairs classified earlier in the run are ignored.
pub fn classify_apparatus(
    doc: &mut Document,
    app: ApparatusId,
    classifier: &mut dyn Classifier,
    sampler: &mut ExampleSampler,
    options: &ClassifyOptions,
    output: &Path,
) -> Result<ClassificationReport> {
    let mut report = ClassificationReport::start();
    let unclassified = doc
        .non_redundant_pairs(app)
        .filter(|pair| !pair.is_classified())
        .count();
    if unclassified == 0 {
        return Ok(report.finish());
    }
    report.requested = unclassified;

    let name = doc.apparatus_name(app);
    info!("Classifying apparatus {}", name);
    let prompt = apparatus_prompt(doc, app, sampler, options);
    let response = match classifier.complete(&prompt) {
        Ok(response) => response,
        Err(e) => {
            warn!("Classification of apparatus {} failed: {}", name, e);
            report.failed = unclassified;
            return Ok(report.finish());
        }
    };
    debug!("Response for {}: {}", name, response);

    for result in parse_apparatus_output(&response) {
        let Some(pair) = doc.pair_by_identifiers(app, &result.reading_1, &result.reading_2)
        else {
            warn!(
                "No pair {} → {} in apparatus {}",
                result.reading_1, result.reading_2, name
            );
            report.skipped += 1;
            continue;
        };
        if doc.pair(pair).is_classified() {
            debug!("{} is already classified", doc.pair_label(pair));
            continue;
        }
        apply(
            doc,
            pair,
            &result.category,
            &result.justification,
            options,
            output,
            &mut report,
        )?;
    }

    Ok(report.finish())
}
