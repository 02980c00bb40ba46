//! Layered prompt builder for agents.
//!
//! Prompts are assembled from plain-text template fragments stored under the
//! configured prompts directory (`config/prompts/` by default). Each part is
//! appended in order and joined with a blank line.
//!
//! Agents ship an inline fallback for every template they load, so a missing
//! prompts directory degrades to the built-in wording instead of an empty
//! prompt.
//!
//! Variable substitution uses `{{key}}` syntax and is applied once at
//! [`build()`](PromptBuilder::build) time, after all parts are joined.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

const SEPARATOR: &str = "\n\n";

/// Fluent builder that assembles a prompt from template files.
///
/// ```rust
/// use entrybot::agents::prompt::PromptBuilder;
///
/// let prompt = PromptBuilder::new("config/prompts")
///     .template("does_not_exist.txt", "Respond to: {{user_input}}")
///     .var("user_input", "Hello!")
///     .build();
/// assert_eq!(prompt, "Respond to: Hello!");
/// ```
pub struct PromptBuilder {
    prompts_dir: PathBuf,
    parts: Vec<String>,
    vars: HashMap<String, String>,
}

impl PromptBuilder {
    /// Create a builder rooted at `prompts_dir` (e.g. `"config/prompts"`).
    pub fn new(prompts_dir: impl Into<PathBuf>) -> Self {
        Self {
            prompts_dir: prompts_dir.into(),
            parts: Vec::new(),
            vars: HashMap::new(),
        }
    }

    /// Append `filename`, or `fallback` when the file is missing or empty.
    pub fn template(mut self, filename: &str, fallback: &str) -> Self {
        let path = self.prompts_dir.join(filename);
        let text = fs::read_to_string(&path)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| {
                tracing::debug!("prompt: template '{}' not found — using built-in", path.display());
                fallback.to_string()
            });
        self.push(text);
        self
    }

    /// Register `{{key}}` → `value` substitution pairs applied at build time.
    pub fn with_vars<'a, I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (k, v) in vars {
            self.vars.insert(k.to_string(), v.to_string());
        }
        self
    }

    /// Register a single variable.
    pub fn var(mut self, key: &str, value: impl Into<String>) -> Self {
        self.vars.insert(key.to_string(), value.into());
        self
    }

    /// Join all parts with blank lines and apply variable substitution.
    ///
    /// Substitution is a single pass over the template, so placeholders
    /// that appear inside substituted values are left untouched.
    pub fn build(self) -> String {
        let template = self.parts.join(SEPARATOR);
        let mut out = String::with_capacity(template.len());
        let mut rest = template.as_str();

        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else {
                out.push_str(&rest[start..]);
                return out;
            };
            let key = &after[..end];
            match self.vars.get(key) {
                Some(value) => out.push_str(value),
                None => {
                    out.push_str("{{");
                    out.push_str(key);
                    out.push_str("}}");
                }
            }
            rest = &after[end + 2..];
        }
        out.push_str(rest);
        out
    }

    fn push(&mut self, text: String) {
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            self.parts.push(trimmed.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompts_dir() -> PathBuf {
        std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("config/prompts")
    }

    #[test]
    fn template_prefers_file_over_fallback() {
        let result = PromptBuilder::new(prompts_dir())
            .template("chat.txt", "FALLBACK {{user_input}}")
            .build();
        assert!(!result.starts_with("FALLBACK"));
        assert!(result.contains("{{user_input}}"));
    }

    #[test]
    fn template_falls_back_when_missing() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = PromptBuilder::new(dir.path())
            .template("chat.txt", "Respond to: {{user_input}}")
            .var("user_input", "hi")
            .build();
        assert_eq!(result, "Respond to: hi");
    }

    #[test]
    fn empty_template_file_uses_fallback() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(dir.path().join("chat.txt"), "  \n").unwrap();
        let result = PromptBuilder::new(dir.path()).template("chat.txt", "built-in").build();
        assert_eq!(result, "built-in");
    }

    #[test]
    fn parts_are_joined_in_order() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(dir.path().join("system.md"), "first\n").unwrap();
        let result = PromptBuilder::new(dir.path())
            .template("system.md", "unused")
            .template("missing.txt", "  second  ")
            .build();
        assert_eq!(result, "first\n\nsecond");
    }

    #[test]
    fn substitutes_variables_once() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = PromptBuilder::new(dir.path())
            .template("missing.txt", "Q: {{question}} / C: {{content}} / {{unknown}}")
            .with_vars([("question", "why {{content}}?"), ("content", "page")])
            .build();
        assert_eq!(result, "Q: why {{content}}? / C: page / {{unknown}}");
    }

    #[test]
    fn unterminated_placeholder_is_literal() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = PromptBuilder::new(dir.path())
            .template("missing.txt", "a {{b")
            .var("b", "x")
            .build();
        assert_eq!(result, "a {{b");
    }
}
