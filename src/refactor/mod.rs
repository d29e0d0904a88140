//! Semantic refactor adapter.
//!
//! Planning calls are pure with respect to the filesystem: they read the
//! snapshot they are given and return a [`ChangeSet`], which only the change
//! applier writes to disk. The analysis itself sits behind [`RefactorBackend`]
//! so a different analyzer can be plugged in without touching orchestration.

pub mod changeset;
pub mod python;

pub use changeset::{ChangeSet, FileChange};
pub use python::PythonBackend;

use crate::error::Result;
use crate::index::{Module, ProjectState, SearchPath, TopLevelModule};
use std::path::PathBuf;

/// Everything a planning call may look at: the current snapshot and the
/// explicit import search path.
#[derive(Debug, Clone, Copy)]
pub struct PlanContext<'a> {
    pub state: &'a ProjectState,
    pub search_path: &'a SearchPath,
}

impl<'a> PlanContext<'a> {
    pub fn new(state: &'a ProjectState, search_path: &'a SearchPath) -> Self {
        Self { state, search_path }
    }
}

/// Refactoring capability trait
pub trait RefactorBackend {
    /// Backend name (e.g. "python")
    fn name(&self) -> &str;

    /// Rewrite every genuine reference to `old_name` into `new_name`, limited to `scope`.
    fn plan_rename(
        &self,
        ctx: PlanContext<'_>,
        old_name: &str,
        new_name: &str,
        scope: &[&Module],
    ) -> Result<ChangeSet>;

    /// Relocate a top-level module into `destination` and rewrite all references to it.
    fn plan_move(
        &self,
        ctx: PlanContext<'_>,
        module: &TopLevelModule,
        destination: &str,
    ) -> Result<ChangeSet>;

    /// Absolute import targets named by a source file.
    fn imported_names(&self, source: &str) -> Result<Vec<String>>;

    /// Create the package marker in every listed directory that lacks one.
    ///
    /// Idempotent: directories that already have a marker produce no change.
    fn plan_package_conversion(
        &self,
        ctx: PlanContext<'_>,
        directories: &[PathBuf],
    ) -> Result<ChangeSet> {
        let marker = &ctx.state.layout().package_marker;
        let mut missing: Vec<&PathBuf> = directories
            .iter()
            .filter(|dir| !ctx.state.has_marker(dir))
            .collect();
        missing.sort();
        missing.dedup();

        let names: Vec<String> = missing
            .iter()
            .map(|d| crate::index::module::to_slash(d))
            .collect();
        let mut changes = ChangeSet::new(format!(
            "Convert {} director{} to packages: {}",
            names.len(),
            if names.len() == 1 { "y" } else { "ies" },
            names.join(", ")
        ));
        for dir in missing {
            changes.push(FileChange::Create {
                path: dir.join(marker),
                content: String::new(),
            });
        }
        Ok(changes)
    }
}
