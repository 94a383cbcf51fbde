//! Terminal implementation of [`Wizard`] backed by `inquire`.

use colored::Colorize;
use inquire::validator::Validation;
use inquire::{Confirm, CustomUserError, InquireError, Select, Text};

use crate::error::{Result, SeedDeployError};

use super::wizard::{Choice, MessageKind, TextQuestion, Wizard};

/// [`Wizard`] that asks questions on the terminal.
#[derive(Debug, Default)]
pub struct InquireWizard;

impl InquireWizard {
    /// Creates a terminal wizard.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn map_prompt_error(err: InquireError) -> SeedDeployError {
    match err {
        InquireError::OperationCanceled | InquireError::OperationInterrupted => {
            SeedDeployError::cancelled("Cancelled")
        }
        other => SeedDeployError::internal(format!("Prompt failed: {other}")),
    }
}

impl Wizard for InquireWizard {
    fn intro(&mut self, title: &str) {
        eprintln!("\n{}\n", title.bold());
    }

    fn note(&mut self, title: &str, body: &str) {
        eprintln!("{}", title.cyan().bold());
        for line in body.lines() {
            eprintln!("  {line}");
        }
        eprintln!();
    }

    fn message(&mut self, kind: MessageKind, text: &str) {
        match kind {
            MessageKind::Info => eprintln!("{} {text}", "•".cyan()),
            MessageKind::Success => eprintln!("{} {text}", "✓".green()),
            MessageKind::Warning => eprintln!("{} {text}", "!".yellow()),
        }
    }

    fn text(&mut self, question: &TextQuestion<'_>) -> Result<String> {
        let validate = question.validator;
        let mut prompt = Text::new(question.message)
            .with_placeholder(question.placeholder)
            .with_validator(move |input: &str| {
                Ok::<Validation, CustomUserError>(match validate(input) {
                    Ok(()) => Validation::Valid,
                    Err(message) => Validation::Invalid(message.into()),
                })
            });
        if let Some(initial) = question.initial {
            prompt = prompt.with_initial_value(initial);
        }

        prompt
            .prompt()
            .map(|answer| answer.trim().to_string())
            .map_err(map_prompt_error)
    }

    fn select(&mut self, message: &str, choices: &[Choice], default: usize) -> Result<usize> {
        let options: Vec<String> = choices
            .iter()
            .map(|choice| format!("{}  {}", choice.label, choice.hint.dimmed()))
            .collect();

        Select::new(message, options)
            .with_starting_cursor(default)
            .raw_prompt()
            .map(|picked| picked.index)
            .map_err(map_prompt_error)
    }

    fn confirm(&mut self, message: &str, default: bool) -> Result<bool> {
        Confirm::new(message)
            .with_default(default)
            .prompt()
            .map_err(map_prompt_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_maps_to_cancelled() {
        assert!(map_prompt_error(InquireError::OperationCanceled).is_cancelled());
        assert!(map_prompt_error(InquireError::OperationInterrupted).is_cancelled());
        assert!(!map_prompt_error(InquireError::NotTTY).is_cancelled());
    }
}
