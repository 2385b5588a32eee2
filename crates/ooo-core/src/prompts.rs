use std::path::PathBuf;

use crate::error::{OooError, Result};

// ---------------------------------------------------------------------------
// PromptStore
// ---------------------------------------------------------------------------

/// Maps a template name to the content of `<dir>/<name>.txt`, with
/// `{{ placeholder }}` substitution.
///
/// Substitution is plain string replacement, not a templating engine: the
/// templates contain literal JSON example braces that must reach the model
/// untouched.
pub struct PromptStore {
    dir: PathBuf,
}

impl PromptStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        PromptStore { dir: dir.into() }
    }

    /// Raw template content for `name`.
    pub fn load(&self, name: &str) -> Result<String> {
        let path = self.dir.join(format!("{name}.txt"));
        std::fs::read_to_string(&path)
            .map_err(|_| OooError::TemplateNotFound(path.display().to_string()))
    }

    /// Template content with each `{{ key }}` replaced by its value.
    pub fn render(&self, name: &str, substitutions: &[(&str, &str)]) -> Result<String> {
        let mut text = self.load(name)?;
        for (key, value) in substitutions {
            text = text.replace(&format!("{{{{ {key} }}}}"), value);
        }
        Ok(text)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
