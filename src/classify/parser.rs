//! Parsing classification service responses.

use regex::Regex;
use std::sync::OnceLock;

/// One line of a whole-apparatus response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApparatusResult {
    pub reading_1: String,
    pub reading_2: String,
    pub category: String,
    pub justification: String,
}

/// Finds a known category name in free-form model output.
#[derive(Debug, Clone)]
pub struct CategoryParser {
    names: Vec<String>,
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Cut text at the first run of three or more hyphens and trim it.
fn cut_at_rule(text: &str) -> &str {
    match text.find("---") {
        Some(index) => text[..index].trim(),
        None => text.trim(),
    }
}

impl CategoryParser {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names
                .into_iter()
                .map(Into::into)
                .filter(|name: &String| !name.is_empty())
                .collect(),
        }
    }

    /// Earliest standalone occurrence of a known name, as (position, name).
    /// At equal positions the longer name wins.
    fn find_category(&self, output: &str) -> Option<(usize, &str)> {
        let mut best: Option<(usize, &str)> = None;
        for name in &self.names {
            for (position, _) in output.match_indices(name.as_str()) {
                let before = output[..position].chars().next_back();
                let after = output[position + name.len()..].chars().next();
                if before.is_some_and(is_word_char) || after.is_some_and(is_word_char) {
                    continue;
                }
                let better = match best {
                    None => true,
                    Some((best_position, best_name)) => {
                        position < best_position
                            || (position == best_position && name.len() > best_name.len())
                    }
                };
                if better {
                    best = Some((position, name.as_str()));
                }
                break;
            }
        }
        best
    }

    /// Extract (category, justification) from a response.
    ///
    /// The justification is the text after the line naming the category, up
    /// to the first `---`. When nothing follows that line, the rest of the
    /// line after the category name is used instead.
    pub fn parse(&self, output: &str) -> Option<(String, String)> {
        let (position, name) = self.find_category(output)?;

        let line_end = output[position..]
            .find('\n')
            .map(|offset| position + offset)
            .unwrap_or(output.len());
        let mut justification = cut_at_rule(&output[line_end..]).to_string();

        if justification.is_empty() {
            let rest = &output[position + name.len()..line_end];
            justification = cut_at_rule(rest)
                .trim_start_matches(|c: char| c == '*' || c == ':' || c.is_whitespace())
                .trim_end_matches('*')
                .trim()
                .to_string();
        }

        Some((name.to_string(), justification))
    }
}

/// Split output into its first line (the category) and the rest.
pub fn parse_category_and_justification(output: &str) -> (String, String) {
    let output = output.trim();
    match output.split_once('\n') {
        Some((category, justification)) => {
            (category.trim().to_string(), justification.trim().to_string())
        }
        None => (output.to_string(), String::new()),
    }
}

fn apparatus_line() -> &'static Regex {
    static LINE: OnceLock<Regex> = OnceLock::new();
    LINE.get_or_init(|| {
        Regex::new(r"^\s*(\S+)\s*(?:→|➞|->)\s*(\S+)\s*=\s*([^:]+?)\s*(?::\s*(.*?))?\s*$")
            .unwrap_or_else(|e| panic!("invalid apparatus line pattern: {}", e))
    })
}

/// Parse lines of the form `r1 → r2 = category: justification`.
///
/// Lines that do not have this shape are skipped.
pub fn parse_apparatus_output(output: &str) -> Vec<ApparatusResult> {
    let output = match output.find("-----") {
        Some(index) => &output[..index],
        None => output,
    };
    output
        .lines()
        .filter_map(|line| {
            let captures = apparatus_line().captures(line)?;
            Some(ApparatusResult {
                reading_1: captures[1].to_string(),
                reading_2: captures[2].to_string(),
                category: captures[3].trim().to_string(),
                justification: captures
                    .get(4)
                    .map(|m| m.as_str().trim().to_string())
                    .unwrap_or_default(),
            })
        })
        .collect()
}
