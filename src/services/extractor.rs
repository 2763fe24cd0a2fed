//! Pulls a JSON object out of a model answer that may carry prose or code fences.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;

use crate::config::ExtractionStrategy;
use crate::error::PipelineError;
use crate::models::{ExercisePlan, FoodResult};

static LAZY_OBJECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{.*?\}").expect("valid object pattern"));

/// Locate the JSON block in `text` without parsing it.
pub fn find_json_block(text: &str, strategy: ExtractionStrategy) -> Option<&str> {
    match strategy {
        ExtractionStrategy::Lazy => LAZY_OBJECT.find(text).map(|m| m.as_str()),
        ExtractionStrategy::Balanced => find_balanced(text),
    }
}

/// Span from the first `{` to its matching `}`, skipping braces inside string literals.
fn find_balanced(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + c.len_utf8();
                    return Some(&text[start..end]);
                }
            }
            _ => {}
        }
    }

    None
}

pub fn extract<T: DeserializeOwned>(
    text: &str,
    strategy: ExtractionStrategy,
) -> Result<T, PipelineError> {
    let block = find_json_block(text, strategy).ok_or(PipelineError::NoJsonFound)?;
    log::debug!("🔍 Extracted JSON block ({} bytes)", block.len());
    serde_json::from_str(block).map_err(PipelineError::MalformedJson)
}

pub fn extract_food(text: &str, strategy: ExtractionStrategy) -> Result<FoodResult, PipelineError> {
    extract(text, strategy)
}

pub fn extract_exercise(
    text: &str,
    strategy: ExtractionStrategy,
) -> Result<ExercisePlan, PipelineError> {
    let plan: ExercisePlan = extract(text, strategy)?;
    if plan.exercise.len() != 2 {
        log::warn!("⚠️ Expected 2 exercise options, model returned {}", plan.exercise.len());
    }
    Ok(plan)
}
