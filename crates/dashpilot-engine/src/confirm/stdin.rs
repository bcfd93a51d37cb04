use super::{ConfirmError, HumanInput};
use async_trait::async_trait;
use std::io::{self, BufRead, BufReader, Write};
use tokio::sync::mpsc;

/// Reads answers from the terminal, one line per question.
///
/// Lines are read on a plain thread of their own: a read blocked on the
/// terminal must not keep the runtime from shutting down after Ctrl-C.
pub struct StdinInput {
    lines: mpsc::UnboundedReceiver<io::Result<String>>,
}

impl StdinInput {
    pub fn new() -> Self {
        Self::from_reader(BufReader::new(io::stdin()))
    }

    pub fn from_reader<R: BufRead + Send + 'static>(reader: R) -> Self {
        let (tx, lines) = mpsc::unbounded_channel();
        let spawned = std::thread::Builder::new()
            .name("dashpilot-stdin".to_string())
            .spawn(move || {
                for line in reader.lines() {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
            });
        // A failed spawn drops the sender, so the first question sees a
        // closed input.
        if let Err(e) = spawned {
            tracing::warn!("Cannot read answers from the terminal: {}", e);
        }
        Self { lines }
    }
}

impl Default for StdinInput {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HumanInput for StdinInput {
    async fn ask(&mut self, prompt: &str) -> Result<String, ConfirmError> {
        let mut stdout = io::stdout();
        print!("\n{}", prompt);
        stdout.flush()?;

        match self.lines.recv().await {
            Some(line) => Ok(line?),
            None => Err(ConfirmError::InputClosed),
        }
    }
}
