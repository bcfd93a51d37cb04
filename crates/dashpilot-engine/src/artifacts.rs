//! Files a run leaves behind: screenshots and the final summary.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Hands out numbered screenshot paths: `<dir>/<session>-<NN>-<slug>.png`.
#[derive(Debug, Clone)]
pub struct ScreenshotRecorder {
    dir: PathBuf,
    prefix: String,
    counter: u32,
}

impl ScreenshotRecorder {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
            counter: 0,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn next_path(&mut self, description: &str) -> PathBuf {
        self.counter += 1;
        self.dir.join(format!(
            "{}-{:02}-{}.png",
            self.prefix,
            self.counter,
            slug(description)
        ))
    }

    pub async fn ensure_dir(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }
}

/// Lowercase ASCII alphanumerics joined by single dashes.
pub fn slug(description: &str) -> String {
    let mut out = String::with_capacity(description.len());
    for c in description.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    if out.is_empty() {
        out.push_str("step");
    }
    out
}

/// What the summary file records about the dashboard the run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub dashboard: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

impl RunSummary {
    pub fn render(&self) -> String {
        format!(
            "Dashboard: {}\nURL: {}\nCreated: {}\n",
            self.dashboard,
            self.url,
            self.created_at.to_rfc3339()
        )
    }

    pub async fn write_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, self.render()).await
    }
}
