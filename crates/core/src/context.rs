//! Side-channel file context attached to a request on demand.

use crate::error::DispatchError;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File name -> (masked, possibly truncated) content.
pub type FileContext = BTreeMap<String, String>;

pub const TRUNCATION_MARKER: &str = "\n...[TRUNCATED]";
pub const MASK: &str = "[MASKED]";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextSettings {
    pub base_dir: PathBuf,
    pub extensions: Vec<String>,
    pub max_per_file: usize,
    pub max_total: usize,
    pub mask_pattern: String,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            extensions: [".py", ".sh", ".conf", ".yml", ".yaml", ".json"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
            max_per_file: 60_000,
            max_total: 250_000,
            mask_pattern: r"(api[_-]?key|password|secret|token|auth|authorization)".to_string(),
        }
    }
}

pub struct ContextLoader {
    settings: ContextSettings,
    mask: Regex,
}

impl ContextLoader {
    pub fn new(settings: ContextSettings) -> Result<Self, DispatchError> {
        let mask = RegexBuilder::new(&settings.mask_pattern)
            .case_insensitive(true)
            .build()?;
        Ok(Self { settings, mask })
    }

    pub fn base_dir(&self) -> &Path {
        &self.settings.base_dir
    }

    /// Collect eligible files from the base directory, sorted by name.
    ///
    /// Each file is masked, then capped at `max_per_file`. When the running
    /// total would exceed `max_total`, the current file is cut to fit and
    /// collection stops. Oversize content is truncated, never rejected.
    pub async fn load(&self) -> FileContext {
        let mut context = FileContext::new();

        let paths = match self.candidate_files().await {
            Ok(paths) => paths,
            Err(e) => {
                warn!(
                    dir = %self.settings.base_dir.display(),
                    error = %e,
                    "Cannot list context directory"
                );
                return context;
            }
        };

        let mut total = 0usize;
        for path in paths {
            let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                continue;
            };

            let raw = match tokio::fs::read(&path).await {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Context file read failed");
                    continue;
                }
            };

            let masked = self.mask_secrets(&raw);
            let capped = truncate_with_marker(&masked, self.settings.max_per_file);

            let remaining = self.settings.max_total.saturating_sub(total);
            if capped.len() > remaining {
                if remaining > TRUNCATION_MARKER.len() {
                    let fitted = truncate_with_marker(&capped, remaining - TRUNCATION_MARKER.len());
                    total += fitted.len();
                    context.insert(name, fitted);
                }
                debug!(total, "Context total cap reached");
                break;
            }

            total += capped.len();
            context.insert(name, capped);
        }

        context
    }

    pub fn mask_secrets(&self, text: &str) -> String {
        self.mask.replace_all(text, MASK).into_owned()
    }

    async fn candidate_files(&self) -> std::io::Result<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(&self.settings.base_dir).await?;
        let mut paths = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            if is_file && self.has_allowed_extension(&path) {
                paths.push(path);
            }
        }

        paths.sort();
        Ok(paths)
    }

    fn has_allowed_extension(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        let ext = format!(".{}", ext.to_ascii_lowercase());
        self.settings
            .extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&ext))
    }
}

/// Cut `text` to at most `max` bytes on a char boundary and append the marker.
pub fn truncate_with_marker(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut cut = max;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}{}", &text[..cut], TRUNCATION_MARKER)
}
