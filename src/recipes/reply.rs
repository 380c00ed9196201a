use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};

use super::formatter::{format, FormatOptions};

lazy_static! {
    static ref FENCE_RE: Regex = Regex::new(r"(?s)```(?:json)?\s*(.*?)```").unwrap();
    static ref LIST_ITEM_RE: Regex =
        Regex::new(r"^(?:\d+[.)]|[•\-*])\s*(?:\*\*)?(.+?)(?:\*\*)?\s*(?:[:–—-]\s+(.+))?$").unwrap();
}

const MAX_TITLE_CHARS: usize = 120;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionDraft {
    pub title: String,
    pub description: String,
}

/// Full recipe returned where suggestions were expected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeDraft {
    pub title: String,
    pub description: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
}

impl RecipeDraft {
    pub fn to_text(&self) -> String {
        let mut out = format!("{}\n===\n", self.title);
        if !self.description.is_empty() {
            out.push_str(&self.description);
            out.push('\n');
        }
        out.push_str("Ingredients:\n");
        for i in &self.ingredients {
            out.push_str(&format!("• {i}\n"));
        }
        out.push_str("Instructions:\n");
        for (n, step) in self.instructions.iter().enumerate() {
            out.push_str(&format!("{}. {step}\n", n + 1));
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuggestionList {
    Suggestions(Vec<SuggestionDraft>),
    FullRecipe(RecipeDraft),
    Title(String),
    Text(Vec<SuggestionDraft>),
    Fallback,
}

pub fn parse_suggestion_reply(raw: &str) -> SuggestionList {
    let body = strip_fences(raw);
    if body.is_empty() {
        return SuggestionList::Fallback;
    }

    if let Some(value) = parse_json(&body) {
        return from_json(value);
    }
    from_text(&body)
}

fn strip_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    match FENCE_RE.captures(trimmed).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str().trim().to_string(),
        None => trimmed.to_string(),
    }
}

/// Parses the whole body, or the outermost `[...]`/`{...}` span when the
/// JSON is wrapped in chatter.
fn parse_json(body: &str) -> Option<Value> {
    if let Ok(v) = serde_json::from_str::<Value>(body) {
        return Some(v);
    }
    for (open, close) in [('[', ']'), ('{', '}')] {
        if let (Some(start), Some(end)) = (body.find(open), body.rfind(close)) {
            if start < end {
                if let Ok(v) = serde_json::from_str::<Value>(&body[start..=end]) {
                    return Some(v);
                }
            }
        }
    }
    None
}

fn from_json(value: Value) -> SuggestionList {
    match value {
        Value::Array(items) => suggestions_from(items),
        Value::Object(obj) => {
            if let Some(Value::Array(items)) = obj.get("suggestions") {
                return suggestions_from(items.clone());
            }
            let Some(title) = str_field(&obj, &["title", "name", "recipeName"]) else {
                return SuggestionList::Fallback;
            };
            let ingredients = list_field(&obj, "ingredients");
            let instructions = list_field(&obj, "instructions");
            if ingredients.is_empty() && instructions.is_empty() {
                return SuggestionList::Title(title);
            }
            SuggestionList::FullRecipe(RecipeDraft {
                title,
                description: str_field(&obj, &["description", "summary"]).unwrap_or_default(),
                ingredients,
                instructions,
            })
        }
        Value::String(s) => {
            let title = s.trim();
            if title.is_empty() || title.chars().count() > MAX_TITLE_CHARS {
                SuggestionList::Fallback
            } else {
                SuggestionList::Title(title.to_string())
            }
        }
        _ => SuggestionList::Fallback,
    }
}

fn suggestions_from(items: Vec<Value>) -> SuggestionList {
    let drafts: Vec<SuggestionDraft> = items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(obj) => {
                let title = str_field(&obj, &["title", "name"])?;
                Some(SuggestionDraft {
                    title,
                    description: str_field(&obj, &["description", "summary"]).unwrap_or_default(),
                })
            }
            Value::String(s) if !s.trim().is_empty() => Some(SuggestionDraft {
                title: s.trim().to_string(),
                description: String::new(),
            }),
            _ => None,
        })
        .collect();
    if drafts.is_empty() {
        SuggestionList::Fallback
    } else {
        SuggestionList::Suggestions(drafts)
    }
}

/// Bare text: a sectioned recipe stays a recipe, list items become
/// suggestions, a single short line becomes a title.
fn from_text(body: &str) -> SuggestionList {
    let formatted = format(body, FormatOptions::default());
    if let (Some(title), false) = (&formatted.title, formatted.is_degraded()) {
        return SuggestionList::FullRecipe(RecipeDraft {
            title: title.clone(),
            description: formatted.intro_lines.join(" "),
            ingredients: formatted.ingredient_lines,
            instructions: formatted.instruction_lines,
        });
    }

    let drafts: Vec<SuggestionDraft> = body
        .lines()
        .filter_map(|line| LIST_ITEM_RE.captures(line.trim()))
        .filter_map(|c| {
            let title = c.get(1)?.as_str().trim().trim_matches('*').trim().to_string();
            if title.is_empty() {
                return None;
            }
            Some(SuggestionDraft {
                title,
                description: c.get(2).map(|d| d.as_str().trim().to_string()).unwrap_or_default(),
            })
        })
        .collect();
    if !drafts.is_empty() {
        return SuggestionList::Text(drafts);
    }

    let first = body.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or_default();
    if first.chars().count() <= MAX_TITLE_CHARS && !first.is_empty() {
        SuggestionList::Title(first.trim_matches(['*', '#', ' ']).to_string())
    } else {
        SuggestionList::Fallback
    }
}

fn str_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn list_field(obj: &Map<String, Value>, key: &str) -> Vec<String> {
    match obj.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) => s
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}
