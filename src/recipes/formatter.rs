use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

lazy_static! {
    static ref NUMBERED_RE: Regex = Regex::new(r"^\d+[.)]\s").unwrap();
    static ref ORDINAL_RE: Regex = Regex::new(r"^(?:\d+[.)]\s*|[•–·]\s*|[-*]\s+)").unwrap();
    static ref BULLET_RE: Regex = Regex::new(r"^(?:[•–·]\s*|[-*]\s+)").unwrap();
    static ref TITLE_LABEL_RE: Regex = Regex::new(r"(?i)^(?:recipe\s+name|recipe)\s*:\s*").unwrap();
    static ref BOLD_RE: Regex = Regex::new(r"\*\*(.+?)\*\*").unwrap();
    static ref SEPARATOR_RE: Regex = Regex::new(r"^={3,}$").unwrap();
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FormatOptions {
    /// Leaves the title out of the markup; `FormattedRecipe::title` is still set.
    pub hide_title: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedRecipe {
    pub html: String,
    pub has_ingredients: bool,
    pub has_instructions: bool,
    pub title: Option<String>,
    pub intro_lines: Vec<String>,
    pub ingredient_lines: Vec<String>,
    pub instruction_lines: Vec<String>,
}

impl FormattedRecipe {
    /// True when no section was detected and the markup is the raw text.
    pub fn is_degraded(&self) -> bool {
        !self.has_ingredients && !self.has_instructions
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Intro,
    Ingredients,
    Instructions,
}

enum Header {
    Ingredients,
    Instructions,
}

pub fn format(raw: &str, opts: FormatOptions) -> FormattedRecipe {
    let mut mode = Mode::Intro;
    let mut title: Option<String> = None;
    let mut title_checked = false;
    let mut intro = Vec::new();
    let mut ingredients = Vec::new();
    let mut instructions = Vec::new();

    for line in raw.lines().map(str::trim) {
        if line.is_empty() || SEPARATOR_RE.is_match(line) {
            continue;
        }
        match header(line) {
            Some(Header::Ingredients) => {
                mode = Mode::Ingredients;
                continue;
            }
            Some(Header::Instructions) => {
                mode = Mode::Instructions;
                continue;
            }
            None => {}
        }

        // Numbered item under ingredients: the steps began without a header.
        if mode == Mode::Ingredients && NUMBERED_RE.is_match(line) {
            mode = Mode::Instructions;
        }

        match mode {
            Mode::Intro => {
                if !title_checked {
                    title_checked = true;
                    let candidate = clean_title(line);
                    let lower = candidate.to_lowercase();
                    if !candidate.is_empty()
                        && !lower.contains("ingredients")
                        && !lower.contains("instructions")
                    {
                        title = Some(candidate);
                        continue;
                    }
                }
                intro.push(line.to_string());
            }
            Mode::Ingredients => {
                let item = BULLET_RE.replace(line, "").trim().to_string();
                if !item.is_empty() {
                    ingredients.push(item);
                }
            }
            Mode::Instructions => {
                let step = ORDINAL_RE.replace(line, "").trim().to_string();
                if !step.is_empty() {
                    instructions.push(step);
                }
            }
        }
    }

    let has_ingredients = !ingredients.is_empty();
    let has_instructions = !instructions.is_empty();

    let html = if !has_ingredients && !has_instructions {
        format!("<p>{}</p>", escape(raw))
    } else {
        render(
            title.as_deref().filter(|_| !opts.hide_title),
            &intro,
            &ingredients,
            &instructions,
        )
    };

    FormattedRecipe {
        html,
        has_ingredients,
        has_instructions,
        title,
        intro_lines: intro,
        ingredient_lines: ingredients,
        instruction_lines: instructions,
    }
}

fn header(line: &str) -> Option<Header> {
    let bare = line
        .trim_start_matches(['#', '*', ' '])
        .trim_end_matches(['*', ' '])
        .to_lowercase();
    if bare == "ingredients" || bare.starts_with("ingredients:") {
        Some(Header::Ingredients)
    } else if bare == "instructions" || bare.starts_with("instructions:") {
        Some(Header::Instructions)
    } else {
        None
    }
}

fn clean_title(line: &str) -> String {
    let bare = line.trim_matches(['#', '*', ' ']);
    TITLE_LABEL_RE
        .replace(bare, "")
        .trim_matches(['*', ' '])
        .to_string()
}

pub(crate) fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn inline(text: &str) -> String {
    BOLD_RE
        .replace_all(&escape(text), "<strong>$1</strong>")
        .into_owned()
}

fn render(
    title: Option<&str>,
    intro: &[String],
    ingredients: &[String],
    instructions: &[String],
) -> String {
    let mut html = String::new();
    if let Some(t) = title {
        html.push_str(&format!("<h2 class=\"recipe-title\">{}</h2>", inline(t)));
    }
    for line in intro {
        html.push_str(&format!("<p class=\"recipe-intro\">{}</p>", inline(line)));
    }
    if !ingredients.is_empty() {
        html.push_str("<h3>Ingredients</h3><ul class=\"recipe-ingredients\">");
        for item in ingredients {
            html.push_str(&format!("<li>{}</li>", inline(item)));
        }
        html.push_str("</ul>");
    }
    if !instructions.is_empty() {
        html.push_str("<h3>Instructions</h3><ol class=\"recipe-instructions\">");
        for step in instructions {
            html.push_str(&format!("<li>{}</li>", inline(step)));
        }
        html.push_str("</ol>");
    }
    html
}
