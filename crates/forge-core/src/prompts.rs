//! Questions asked during the `prompting` phase
//!
//! Tasks describe questions as data; a [`Prompter`] answers them. Runs that
//! are not interactive never reach the prompter and take each default.

use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct Choice {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QuestionKind {
    Input { default: String },
    Confirm { default: bool },
    Select { choices: Vec<Choice>, default: usize },
}

/// One question; its answer is stored under `name` in the config store
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub name: String,
    pub message: String,
    pub kind: QuestionKind,
}

impl Question {
    pub fn input(name: impl Into<String>, message: impl Into<String>, default: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            kind: QuestionKind::Input {
                default: default.into(),
            },
        }
    }

    pub fn confirm(name: impl Into<String>, message: impl Into<String>, default: bool) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            kind: QuestionKind::Confirm { default },
        }
    }

    /// `choices` are `(value, label)` pairs; the first is the default.
    pub fn select<I, V, L>(name: impl Into<String>, message: impl Into<String>, choices: I) -> Self
    where
        I: IntoIterator<Item = (V, L)>,
        V: Into<String>,
        L: Into<String>,
    {
        Self {
            name: name.into(),
            message: message.into(),
            kind: QuestionKind::Select {
                choices: choices
                    .into_iter()
                    .map(|(value, label)| Choice {
                        value: value.into(),
                        label: label.into(),
                    })
                    .collect(),
                default: 0,
            },
        }
    }

    pub fn with_default_choice(mut self, index: usize) -> Self {
        if let QuestionKind::Select { default, .. } = &mut self.kind {
            *default = index;
        }
        self
    }

    pub fn default_answer(&self) -> Value {
        match &self.kind {
            QuestionKind::Input { default } => Value::String(default.clone()),
            QuestionKind::Confirm { default } => Value::Bool(*default),
            QuestionKind::Select { choices, default } => choices
                .get(*default)
                .or_else(|| choices.first())
                .map(|c| Value::String(c.value.clone()))
                .unwrap_or(Value::Null),
        }
    }
}

/// Answers questions for interactive runs
pub trait Prompter: Send + Sync {
    fn ask(&self, question: &Question) -> anyhow::Result<Value>;
}

/// Answers from a fixed map, falling back to each question's default
#[derive(Debug, Clone, Default)]
pub struct DefaultsPrompter {
    answers: Map<String, Value>,
}

impl DefaultsPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_answer(mut self, name: impl Into<String>, answer: Value) -> Self {
        self.answers.insert(name.into(), answer);
        self
    }
}

impl Prompter for DefaultsPrompter {
    fn ask(&self, question: &Question) -> anyhow::Result<Value> {
        Ok(self
            .answers
            .get(&question.name)
            .cloned()
            .unwrap_or_else(|| question.default_answer()))
    }
}

/// Charm-style terminal prompts using cliclack
#[cfg(feature = "tui")]
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompter;

#[cfg(feature = "tui")]
impl Prompter for TerminalPrompter {
    fn ask(&self, question: &Question) -> anyhow::Result<Value> {
        let answer = match &question.kind {
            QuestionKind::Input { default } => {
                let answer: String = cliclack::input(&question.message)
                    .default_input(default)
                    .interact()?;
                Value::String(answer)
            }
            QuestionKind::Confirm { default } => {
                let answer: bool = cliclack::confirm(&question.message)
                    .initial_value(*default)
                    .interact()?;
                Value::Bool(answer)
            }
            QuestionKind::Select { choices, default } => {
                let mut select = cliclack::select(&question.message);
                for choice in choices {
                    select = select.item(choice.value.clone(), &choice.label, "");
                }
                if let Some(initial) = choices.get(*default) {
                    select = select.initial_value(initial.value.clone());
                }
                let answer: String = select.interact()?;
                Value::String(answer)
            }
        };
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_answers() {
        assert_eq!(Question::input("baseName", "Name?", "app").default_answer(), json!("app"));
        assert_eq!(Question::confirm("git", "Git?", true).default_answer(), json!(true));

        let select = Question::select("pm", "Package manager?", [("npm", "npm"), ("pnpm", "pnpm")]);
        assert_eq!(select.default_answer(), json!("npm"));
        assert_eq!(select.with_default_choice(1).default_answer(), json!("pnpm"));
    }

    #[test]
    fn test_defaults_prompter_prefers_preset_answers() {
        let prompter = DefaultsPrompter::new().with_answer("baseName", json!("shop"));
        let named = Question::input("baseName", "Name?", "app");
        let other = Question::input("author", "Author?", "anon");
        assert_eq!(prompter.ask(&named).unwrap(), json!("shop"));
        assert_eq!(prompter.ask(&other).unwrap(), json!("anon"));
    }
}
