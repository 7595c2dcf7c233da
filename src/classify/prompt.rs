//! Prompt rendering for the classification service.

use super::ClassifyOptions;
use crate::models::{ApparatusId, Document, ExampleSampler, PairId, RelationType};
use serde::Serialize;
use std::fmt;

/// A chat prompt: system instructions, the request, and an optional start
/// for the assistant's reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prompt {
    pub system: String,
    pub user: String,
    pub assistant: Option<String>,
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "System: {}", self.system)?;
        writeln!(f, "Human: {}", self.user)?;
        if let Some(assistant) = &self.assistant {
            writeln!(f, "AI: {}", assistant)?;
        }
        Ok(())
    }
}

/// English name for a language code, falling back to the code itself.
pub fn language_name(code: &str) -> String {
    let name = match code {
        "ar" => "Arabic",
        "arc" => "Aramaic",
        "cop" => "Coptic",
        "de" => "German",
        "el" => "Greek",
        "en" => "English",
        "es" => "Spanish",
        "fr" => "French",
        "gez" => "Geez",
        "grc" => "Ancient Greek",
        "he" => "Hebrew",
        "hbo" => "Ancient Hebrew",
        "hy" => "Armenian",
        "it" => "Italian",
        "ka" => "Georgian",
        "la" => "Latin",
        "sa" => "Sanskrit",
        "syc" => "Classical Syriac",
        "syr" => "Syriac",
        "" => "the original language",
        other => other,
    };
    name.to_string()
}

fn system_text(doc: &Document) -> String {
    format!(
        "You are an academic who is an expert in textual criticism in {}.",
        language_name(&doc.language())
    )
}

fn allowed_types<'a>(doc: &'a Document, options: &ClassifyOptions) -> Vec<&'a RelationType> {
    doc.relation_types()
        .filter(|relation_type| !options.ignore.contains(&relation_type.name))
        .collect()
}

/// Category list followed by representative examples of each category.
fn categories_section(
    doc: &Document,
    sampler: &mut ExampleSampler,
    options: &ClassifyOptions,
) -> String {
    let types = allowed_types(doc, options);
    let mut text = format!(
        "Here are {} possible categories for the types of changes in the text:\n",
        types.len()
    );
    for relation_type in &types {
        text.push_str(&relation_type.str_with_description());
        text.push('\n');
    }

    let mut examples = String::new();
    for relation_type in &types {
        let pairs = sampler.representative_examples(doc, relation_type.id(), options.examples);
        if pairs.is_empty() {
            continue;
        }
        examples.push_str(&format!("\n{}:\n", relation_type.name));
        for pair in pairs {
            examples.push_str(&example_line(doc, pair));
            examples.push('\n');
        }
    }
    if !examples.is_empty() {
        text.push_str("\nHere are some examples of changes in each category:\n");
        text.push_str(&examples);
    }
    text
}

fn example_line(doc: &Document, pair: PairId) -> String {
    let description = doc.pair_description(pair);
    if description.is_empty() {
        format!("- {}", doc.pair_display(pair))
    } else {
        format!("- {} ({})", doc.pair_display(pair), description)
    }
}

fn context_line(doc: &Document, app: ApparatusId, replacement: &str) -> Option<String> {
    let context = doc.apparatus_context(app, replacement);
    (!context.is_empty()).then_some(context)
}

/// Prompt asking for the category of one ordered pair.
pub fn pair_prompt(
    doc: &Document,
    pair: PairId,
    sampler: &mut ExampleSampler,
    options: &ClassifyOptions,
) -> Prompt {
    let language = language_name(&doc.language());
    let app = doc.pair(pair).apparatus();
    let active = doc.reading(doc.pair(pair).active());
    let passive = doc.reading(doc.pair(pair).passive());

    let mut user = format!(
        "I am analyzing textual variants in a document written in {}.\n\
         I want you to classify the type of change from one reading to another.\n",
        language
    );
    user.push_str(&categories_section(doc, sampler, options));

    user.push('\n');
    if let Some(context) = context_line(doc, app, active.display_text()) {
        user.push_str(&format!(
            "Here is the passage, with the place of variation marked like ⸂this⸃:\n{}\n",
            context
        ));
    }
    user.push_str(&format!(
        "The active reading is: {}\nThe passive reading is: {}\n\
         Which category describes the change from the active reading to the passive reading?\n\
         Give the name of the category on the first line, then a justification on the following lines.\n\
         When you are finished, output 5 hyphens: '-----'.",
        active.display_text(),
        passive.display_text()
    ));

    Prompt {
        system: system_text(doc),
        user,
        assistant: None,
    }
}

/// Prompt asking for the categories of every combination in an apparatus.
pub fn apparatus_prompt(
    doc: &Document,
    app: ApparatusId,
    sampler: &mut ExampleSampler,
    options: &ClassifyOptions,
) -> Prompt {
    let language = language_name(&doc.language());

    let mut user = format!(
        "I am analyzing textual variants in a document written in {}.\n\
         I want you to classify the types of changes between the readings of a variation unit.\n",
        language
    );
    user.push_str(&categories_section(doc, sampler, options));

    user.push('\n');
    if let Some(context) = context_line(doc, app, "…") {
        user.push_str(&format!(
            "Here is the passage, with the place of variation marked like ⸂this⸃:\n{}\n",
            context
        ));
    }
    user.push_str("Here are the readings:\n");
    for reading in doc.readings(app) {
        user.push_str(&format!("{}: {}\n", reading.identifier, reading.display_text()));
    }

    user.push_str("\nClassify the change for each of these combinations of readings:\n");
    for pair in doc.non_redundant_pairs(app) {
        user.push_str(&format!(
            "{} → {}\n",
            doc.reading(pair.active()).identifier,
            doc.reading(pair.passive()).identifier
        ));
    }
    user.push_str(
        "\nGive one line for each combination in the form 'reading_1 → reading_2 = category: justification'.\n\
         When you are finished, output 5 hyphens: '-----'.",
    );

    Prompt {
        system: system_text(doc),
        user,
        assistant: Some("Certainly, classifications for combinations of the readings are:".to_string()),
    }
}
