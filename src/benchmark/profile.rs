use crate::benchmark::parse::{decode_lenient, strip_code_fences};
use crate::error::{DevlicaError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Condensed, imitation-ready description of a developer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Synthesis {
    pub coding_philosophy: String,
    pub code_style_rules: String,
    pub review_priorities: String,
    pub review_voice: String,
    pub communication_patterns: String,
    pub testing_philosophy: String,
    pub distinctive_traits: String,
    pub developer_interests: String,
    pub project_patterns: String,
    pub collaboration_style: String,
}

impl Synthesis {
    /// Renders the synthesis as labelled sections for imitation prompts
    pub fn to_context(&self) -> String {
        let sections = [
            ("CODING PHILOSOPHY", &self.coding_philosophy),
            ("CODE STYLE RULES", &self.code_style_rules),
            ("REVIEW PRIORITIES", &self.review_priorities),
            ("REVIEW VOICE", &self.review_voice),
            ("COMMUNICATION PATTERNS", &self.communication_patterns),
            ("TESTING PHILOSOPHY", &self.testing_philosophy),
            ("DISTINCTIVE TRAITS", &self.distinctive_traits),
            ("DEVELOPER INTERESTS", &self.developer_interests),
            ("PROJECT PATTERNS", &self.project_patterns),
            ("COLLABORATION STYLE", &self.collaboration_style),
        ];
        let mut out = String::new();
        for (i, (title, body)) in sections.iter().enumerate() {
            out.push_str(&format!("{title}:\n{body}\n"));
            if i + 1 < sections.len() {
                out.push('\n');
            }
        }
        out
    }
}

/// A developer profile as produced by the analysis stage
///
/// The refinement loop only reads and replaces [`Synthesis`]; the free-form
/// sections are carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub username: String,
    pub code_style: String,
    pub review_style: String,
    pub communication: String,
    pub developer_identity: String,
    pub synthesis: Synthesis,
}

impl Profile {
    /// Returns a copy of this profile carrying `synthesis`
    pub fn with_synthesis(&self, synthesis: Synthesis) -> Self {
        Self {
            synthesis,
            ..self.clone()
        }
    }
}

/// Parses a model's synthesis answer
///
/// Accepts fenced output and bare control characters inside strings, and
/// joins array-valued fields with newlines.
pub fn parse_synthesis(raw: &str) -> Result<Synthesis> {
    let text = strip_code_fences(raw);
    let mut fields: Map<String, Value> = decode_lenient(text, raw)?;

    for value in fields.values_mut() {
        if let Value::Array(items) = value {
            let strings: Option<Vec<&str>> = items.iter().map(Value::as_str).collect();
            if let Some(strings) = strings {
                *value = Value::String(strings.join("\n"));
            }
        }
    }

    serde_json::from_value(Value::Object(fields)).map_err(|e| {
        DevlicaError::Parse(format!(
            "invalid synthesis after normalization: {e}\nraw response (first 500 bytes): {}",
            crate::utils::text::truncate(raw, 500, "...")
        ))
    })
}
