//! ChangeSet: an atomic, pre-computed bundle of file changes.
//!
//! Application order inside one ChangeSet is fixed: creates, then content
//! edits, then moves. Edits are planned against the pre-move paths, so moving
//! last keeps every planned path valid until the end.

use crate::error::{PrefixError, Result};
use crate::index::module::to_slash;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A single change to the project tree. Paths are relative to the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FileChange {
    /// Create a file (no-op when it already exists with the same content).
    Create { path: PathBuf, content: String },
    /// Replace the content of an existing file.
    Edit {
        path: PathBuf,
        /// Number of rewritten spans.
        replacements: usize,
        /// Content the edit was planned against.
        #[serde(skip)]
        original: String,
        #[serde(skip)]
        new_content: String,
    },
    /// Move a file or directory.
    Move { from: PathBuf, to: PathBuf },
}

impl FileChange {
    fn order(&self) -> u8 {
        match self {
            FileChange::Create { .. } => 0,
            FileChange::Edit { .. } => 1,
            FileChange::Move { .. } => 2,
        }
    }

    fn summary(&self) -> String {
        match self {
            FileChange::Create { path, .. } => format!("create {}", to_slash(path)),
            FileChange::Edit {
                path,
                replacements,
                ..
            } => format!("edit {} ({} replacement(s))", to_slash(path), replacements),
            FileChange::Move { from, to } => {
                format!("move {} -> {}", to_slash(from), to_slash(to))
            }
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ChangeSet {
    description: String,
    changes: Vec<FileChange>,
}

impl ChangeSet {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            changes: Vec::new(),
        }
    }

    pub fn push(&mut self, change: FileChange) {
        self.changes.push(change);
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn changes(&self) -> &[FileChange] {
        &self.changes
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Description plus a line per change and the changed source lines.
    pub fn render(&self) -> String {
        let mut out = self.description.clone();
        for change in &self.changes {
            out.push_str(&format!("\n  {}", change.summary()));
            if let FileChange::Edit {
                original,
                new_content,
                ..
            } = change
            {
                out.push_str(&line_diff(original, new_content));
            }
        }
        out
    }

    /// Check that every change can still be applied to the tree under `root`.
    fn preflight(&self, root: &Path) -> Result<()> {
        for change in &self.changes {
            match change {
                FileChange::Create { path, content } => {
                    let full = root.join(path);
                    if full.exists() && fs::read_to_string(&full)? != *content {
                        return Err(PrefixError::Apply(format!(
                            "{} already exists with different content",
                            to_slash(path)
                        )));
                    }
                }
                FileChange::Edit { path, original, .. } => {
                    let full = root.join(path);
                    let current = fs::read_to_string(&full).map_err(|e| {
                        PrefixError::Apply(format!("cannot read {}: {}", to_slash(path), e))
                    })?;
                    if current != *original {
                        return Err(PrefixError::Apply(format!(
                            "{} was modified after the change was planned",
                            to_slash(path)
                        )));
                    }
                }
                FileChange::Move { from, to } => {
                    if !root.join(from).exists() {
                        return Err(PrefixError::Apply(format!(
                            "move source {} does not exist",
                            to_slash(from)
                        )));
                    }
                    if root.join(to).exists() {
                        return Err(PrefixError::Apply(format!(
                            "move target {} already exists",
                            to_slash(to)
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Write the changes to disk. Returns the number of changes performed.
    pub fn apply(&self, root: &Path) -> Result<usize> {
        self.preflight(root)?;

        let mut ordered: Vec<&FileChange> = self.changes.iter().collect();
        ordered.sort_by_key(|c| c.order());

        let mut performed = 0;
        for change in ordered {
            match change {
                FileChange::Create { path, content } => {
                    let full = root.join(path);
                    if full.exists() {
                        continue;
                    }
                    if let Some(parent) = full.parent() {
                        fs::create_dir_all(parent)?;
                    }
                    fs::write(&full, content)?;
                }
                FileChange::Edit {
                    path, new_content, ..
                } => {
                    fs::write(root.join(path), new_content)?;
                }
                FileChange::Move { from, to } => {
                    let target = root.join(to);
                    if let Some(parent) = target.parent() {
                        fs::create_dir_all(parent)?;
                    }
                    fs::rename(root.join(from), &target)?;
                }
            }
            debug!(change = %change.summary(), "applied");
            performed += 1;
        }

        Ok(performed)
    }
}

/// Changed lines as `-`/`+` pairs when the line count is unchanged.
fn line_diff(original: &str, updated: &str) -> String {
    let old_lines: Vec<&str> = original.lines().collect();
    let new_lines: Vec<&str> = updated.lines().collect();
    let mut out = String::new();

    if old_lines.len() != new_lines.len() {
        out.push_str(&format!(
            "\n      ({} lines -> {} lines)",
            old_lines.len(),
            new_lines.len()
        ));
        return out;
    }

    for (number, (old, new)) in old_lines.iter().zip(&new_lines).enumerate() {
        if old != new {
            out.push_str(&format!("\n    {:>4} - {}", number + 1, old));
            out.push_str(&format!("\n    {:>4} + {}", number + 1, new));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edit(path: &str, original: &str, new_content: &str) -> FileChange {
        FileChange::Edit {
            path: PathBuf::from(path),
            replacements: 1,
            original: original.to_string(),
            new_content: new_content.to_string(),
        }
    }

    #[test]
    fn test_apply_edits_before_move() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("utils.py"), "import utils\n").unwrap();

        let mut changes = ChangeSet::new("move utils");
        changes.push(FileChange::Move {
            from: PathBuf::from("utils.py"),
            to: PathBuf::from("app/utils.py"),
        });
        changes.push(edit("utils.py", "import utils\n", "import app.utils\n"));

        assert_eq!(changes.apply(dir.path()).unwrap(), 2);
        assert!(!dir.path().join("utils.py").exists());
        assert_eq!(
            fs::read_to_string(dir.path().join("app/utils.py")).unwrap(),
            "import app.utils\n"
        );
    }

    #[test]
    fn test_conflicting_modification_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.py"), "import b\nprint(1)\n").unwrap();

        let mut changes = ChangeSet::new("rename b");
        changes.push(edit("a.py", "import b\n", "import c\n"));

        let err = changes.apply(dir.path()).unwrap_err();
        assert!(matches!(err, PrefixError::Apply(_)));
        assert_eq!(
            fs::read_to_string(dir.path().join("a.py")).unwrap(),
            "import b\nprint(1)\n"
        );
    }

    #[test]
    fn test_move_collision_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("app")).unwrap();
        fs::write(dir.path().join("utils.py"), "").unwrap();
        fs::write(dir.path().join("app/utils.py"), "").unwrap();

        let mut changes = ChangeSet::new("move utils");
        changes.push(FileChange::Move {
            from: PathBuf::from("utils.py"),
            to: PathBuf::from("app/utils.py"),
        });

        assert!(changes.apply(dir.path()).is_err());
        assert!(dir.path().join("utils.py").exists());
    }

    #[test]
    fn test_create_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut changes = ChangeSet::new("markers");
        changes.push(FileChange::Create {
            path: PathBuf::from("pkg/__init__.py"),
            content: String::new(),
        });

        assert_eq!(changes.apply(dir.path()).unwrap(), 1);
        assert_eq!(changes.apply(dir.path()).unwrap(), 0);
    }

    #[test]
    fn test_render_shows_changed_lines() {
        let mut changes = ChangeSet::new("Rename module <numpy> to <mynumpy>");
        changes.push(edit("a.py", "import numpy\nx = 1\n", "import mynumpy\nx = 1\n"));

        let rendered = changes.render();
        assert!(rendered.starts_with("Rename module <numpy> to <mynumpy>"));
        assert!(rendered.contains("edit a.py (1 replacement(s))"));
        assert!(rendered.contains("- import numpy"));
        assert!(rendered.contains("+ import mynumpy"));
        assert!(!rendered.contains("x = 1"));
    }
}
