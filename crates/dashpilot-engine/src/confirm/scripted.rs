use super::{ConfirmError, HumanInput};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;

/// Answers questions from a fixed script, in order.
#[derive(Debug, Default, Clone)]
pub struct ScriptedInput {
    answers: VecDeque<String>,
}

impl ScriptedInput {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
        }
    }

    /// One answer per line; lines starting with '#' are comments.
    pub async fn from_file(path: &Path) -> Result<Self, ConfirmError> {
        let content = tokio::fs::read_to_string(path).await?;
        Ok(Self::new(
            content
                .lines()
                .filter(|l| !l.trim_start().starts_with('#'))
                .map(|l| l.to_string()),
        ))
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

#[async_trait]
impl HumanInput for ScriptedInput {
    async fn ask(&mut self, prompt: &str) -> Result<String, ConfirmError> {
        match self.answers.pop_front() {
            Some(answer) => {
                tracing::debug!("Scripted answer to '{}': {}", prompt.trim_end(), answer);
                Ok(answer)
            }
            None => Err(ConfirmError::InputClosed),
        }
    }
}
