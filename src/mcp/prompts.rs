//! MCP prompt definitions and template rendering.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::mcp::content::{Content, Role};

/// A prompt argument definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptArgument {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
}

impl PromptArgument {
    pub fn required(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            required: false,
        }
    }
}

/// A prompt definition. The argument list is fixed once registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub arguments: Vec<PromptArgument>,
}

impl Prompt {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: None,
            description: None,
            arguments: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_argument(mut self, argument: PromptArgument) -> Self {
        self.arguments.push(argument);
        self
    }

    /// Check that every required argument is present.
    ///
    /// Arguments are reported in declaration order, so the first missing one
    /// names the error.
    pub fn validate_arguments(&self, arguments: &HashMap<String, String>) -> Result<()> {
        match self
            .arguments
            .iter()
            .find(|arg| arg.required && !arguments.contains_key(&arg.name))
        {
            Some(missing) => Err(Error::MissingPromptArgument(missing.name.clone())),
            None => Ok(()),
        }
    }
}

/// A prompt message (the actual content).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: Content,
}

impl PromptMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Content::text(text),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Content::text(text),
        }
    }
}

/// Result of prompts/list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPromptsResult {
    pub prompts: Vec<Prompt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// Result of prompts/get.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetPromptResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub messages: Vec<PromptMessage>,
}

/// Get prompt params.
#[derive(Debug, Clone, Deserialize)]
pub struct GetPromptParams {
    pub name: String,
    #[serde(default)]
    pub arguments: HashMap<String, String>,
}

/// Template for generating a single user message.
///
/// Supports `{{name}}` substitution and `{{#if name}}...{{/if}}` blocks that
/// are kept only when the argument is present and non-empty.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    pub template: String,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Render the template against `arguments`.
    pub fn render(&self, arguments: &HashMap<String, String>) -> String {
        let mut text = self.template.clone();

        // Conditionals first, so substitution cannot create new markers.
        while let Some(start) = text.find("{{#if ") {
            let Some(name_end) = text[start..].find("}}").map(|i| start + i) else {
                break;
            };
            let key = text[start + "{{#if ".len()..name_end].trim().to_string();
            let body_start = name_end + 2;
            let Some(end) = text[body_start..].find("{{/if}}").map(|i| body_start + i) else {
                break;
            };

            let keep = arguments.get(&key).is_some_and(|v| !v.is_empty());
            let body = if keep {
                text[body_start..end].to_string()
            } else {
                String::new()
            };
            text.replace_range(start..end + "{{/if}}".len(), &body);
        }

        substitute(&text, arguments)
    }
}

/// Replace `{{name}}` tokens in a single left-to-right pass. Substituted
/// values are never scanned again; unknown names are left as written.
fn substitute(text: &str, arguments: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + 2..];
        let Some(close) = after_open.find("}}") else {
            out.push_str(&rest[open..]);
            return out;
        };

        let token = &rest[open..open + 2 + close + 2];
        match arguments.get(after_open[..close].trim()) {
            Some(value) => out.push_str(value),
            None => out.push_str(token),
        }
        rest = &after_open[close + 2..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn review_prompt() -> Prompt {
        Prompt::new("review")
            .with_description("Review code")
            .with_argument(PromptArgument::required("code", "The code to review"))
            .with_argument(PromptArgument::optional("focus", "Areas to focus on"))
    }

    #[test]
    fn test_validate_arguments() {
        let prompt = review_prompt();
        assert!(prompt.validate_arguments(&args(&[("code", "fn main() {}")])).is_ok());

        let err = prompt.validate_arguments(&HashMap::new()).unwrap_err();
        assert!(matches!(err, Error::MissingPromptArgument(ref name) if name == "code"));
        assert!(err.to_string().contains("code"));
    }

    #[test]
    fn test_prompt_serialization() {
        let value = serde_json::to_value(review_prompt()).unwrap();
        assert_eq!(value["name"], "review");
        assert!(value.get("title").is_none());
        assert_eq!(value["arguments"][0], json!({
            "name": "code",
            "description": "The code to review",
            "required": true
        }));
        assert_eq!(value["arguments"][1]["required"], false);
    }

    #[test]
    fn test_prompt_message_serialization() {
        let message = PromptMessage::user("hello");
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({"role": "user", "content": {"type": "text", "text": "hello"}})
        );
    }

    #[test]
    fn test_render_substitution() {
        let template = PromptTemplate::new("Review this {{language}} code:\n{{code}}");
        let text = template.render(&args(&[("language", "rust"), ("code", "fn main() {}")]));
        assert_eq!(text, "Review this rust code:\nfn main() {}");
    }

    #[test]
    fn test_render_conditionals() {
        let template = PromptTemplate::new("Review:{{#if focus}} focus on {{focus}}{{/if}}.");

        let with = template.render(&args(&[("focus", "security")]));
        assert_eq!(with, "Review: focus on security.");

        let without = template.render(&HashMap::new());
        assert_eq!(without, "Review:.");

        let empty = template.render(&args(&[("focus", "")]));
        assert_eq!(empty, "Review:.");
    }

    #[test]
    fn test_render_does_not_rescan_values() {
        let template = PromptTemplate::new("A={{a}} B={{b}}");
        let mut seen = std::collections::HashSet::new();
        for i in 0..50 {
            let mut arguments = args(&[("a", "{{b}}"), ("b", "x0")]);
            arguments.insert(format!("filler{}", i), i.to_string());
            seen.insert(template.render(&arguments));
        }
        assert_eq!(seen.len(), 1);
        assert!(seen.contains("A={{b}} B=x0"));
    }

    #[test]
    fn test_render_leaves_unknown_and_unclosed_tokens() {
        let template = PromptTemplate::new("{{known}} {{unknown}} {{open");
        assert_eq!(template.render(&args(&[("known", "k")])), "k {{unknown}} {{open");
    }

    #[test]
    fn test_get_result_omits_missing_description() {
        let result = GetPromptResult {
            description: None,
            messages: vec![PromptMessage::assistant("ok")],
        };
        let value = serde_json::to_value(&result).unwrap();
        assert!(value.get("description").is_none());
        assert_eq!(value["messages"][0]["role"], "assistant");
    }
}
