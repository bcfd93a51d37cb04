//! Human confirmation gate.
//!
//! Turns outcomes the automation cannot verify into explicit answers from an
//! operator. Waits indefinitely: the only way out of a pending question is an
//! answer, closed input, or the run's cancellation token.

pub mod scripted;
pub mod stdin;

use crate::runlog::SharedLog;
use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

pub use scripted::ScriptedInput;
pub use stdin::StdinInput;

#[derive(Debug, Error)]
pub enum ConfirmError {
    #[error("confirmation cancelled")]
    Cancelled,
    #[error("input closed before an answer was given")]
    InputClosed,
    #[error("failed to read answer: {0}")]
    Io(#[from] std::io::Error),
}

/// Source of raw answers (a terminal, a script file, a test double).
#[async_trait]
pub trait HumanInput: Send {
    async fn ask(&mut self, prompt: &str) -> Result<String, ConfirmError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionKind {
    YesNo,
    FreeText,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub prompt: String,
    pub kind: QuestionKind,
}

impl Question {
    pub fn yes_no(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            kind: QuestionKind::YesNo,
        }
    }

    pub fn free_text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            kind: QuestionKind::FreeText,
        }
    }

    /// The prompt as shown to the operator.
    pub fn render(&self) -> String {
        match &self.kind {
            QuestionKind::YesNo => format!("{} (yes/no): ", self.prompt),
            QuestionKind::FreeText => format!("{}: ", self.prompt),
        }
    }

    pub fn normalize(&self, raw: &str) -> Answer {
        let trimmed = raw.trim();
        match &self.kind {
            QuestionKind::YesNo => {
                if is_affirmative(trimmed) {
                    Answer::Yes
                } else {
                    Answer::No
                }
            }
            QuestionKind::FreeText => Answer::Text(trimmed.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
    Text(String),
}

impl Answer {
    pub fn is_yes(&self) -> bool {
        matches!(self, Answer::Yes)
    }
}

/// Only an explicit "y"/"yes" counts; everything else is a no.
pub fn is_affirmative(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "y" | "yes")
}

pub struct ConfirmationGate {
    input: Box<dyn HumanInput>,
    log: SharedLog,
    cancel: CancellationToken,
}

impl ConfirmationGate {
    pub fn new(input: Box<dyn HumanInput>, log: SharedLog, cancel: CancellationToken) -> Self {
        Self { input, log, cancel }
    }

    pub async fn ask(&mut self, question: &Question) -> Result<Answer, ConfirmError> {
        let rendered = question.render();
        self.log
            .record(&format!("QUESTION: {}", rendered.trim_end()));

        let raw = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ConfirmError::Cancelled),
            r = self.input.ask(&rendered) => r,
        };

        match raw {
            Ok(raw) => {
                self.log.record(&format!("ANSWER: {}", raw));
                Ok(question.normalize(&raw))
            }
            Err(e) => {
                self.log.record(&format!("ANSWER: <{}>", e));
                Err(e)
            }
        }
    }

    /// Yes/no question, fail-closed.
    pub async fn confirm(&mut self, prompt: &str) -> Result<bool, ConfirmError> {
        Ok(self.ask(&Question::yes_no(prompt)).await?.is_yes())
    }

    /// Free-text question; the answer is informational only.
    pub async fn describe(&mut self, prompt: &str) -> Result<String, ConfirmError> {
        match self.ask(&Question::free_text(prompt)).await? {
            Answer::Text(text) => Ok(text),
            Answer::Yes => Ok("yes".to_string()),
            Answer::No => Ok("no".to_string()),
        }
    }
}
