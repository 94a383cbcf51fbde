//! The interactive question capability used by the setup flows.
//!
//! Flows only describe questions; rendering and input handling belong to the
//! [`Wizard`] implementation.

use crate::error::Result;

/// Validation hook for a text answer. Returns a message to show on rejection.
pub type TextValidator = fn(&str) -> std::result::Result<(), String>;

/// A free-text question.
#[derive(Debug, Clone, Copy)]
pub struct TextQuestion<'q> {
    /// Prompt shown to the operator.
    pub message: &'q str,
    /// Example shown while the input is empty.
    pub placeholder: &'q str,
    /// Pre-filled, editable answer.
    pub initial: Option<&'q str>,
    /// Answer validation.
    pub validator: TextValidator,
}

/// One option of a select question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    /// Option label.
    pub label: &'static str,
    /// Short explanation shown next to the label.
    pub hint: &'static str,
}

/// Tone of a one-line message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Neutral information.
    Info,
    /// Something completed.
    Success,
    /// Something the operator should know about.
    Warning,
}

/// Asks the operator typed questions.
///
/// Every question returns [`crate::error::SeedDeployError::Cancelled`] when
/// the operator aborts it.
pub trait Wizard {
    /// Shows a title at the start of a flow.
    fn intro(&mut self, title: &str);

    /// Shows a titled block of text.
    fn note(&mut self, title: &str, body: &str);

    /// Shows a one-line message.
    fn message(&mut self, kind: MessageKind, text: &str);

    /// Asks for free text.
    ///
    /// # Errors
    ///
    /// Returns an error if the operator cancels.
    fn text(&mut self, question: &TextQuestion<'_>) -> Result<String>;

    /// Asks to pick one of `choices`, returning its index.
    ///
    /// # Errors
    ///
    /// Returns an error if the operator cancels.
    fn select(&mut self, message: &str, choices: &[Choice], default: usize) -> Result<usize>;

    /// Asks a yes/no question.
    ///
    /// # Errors
    ///
    /// Returns an error if the operator cancels.
    fn confirm(&mut self, message: &str, default: bool) -> Result<bool>;
}
