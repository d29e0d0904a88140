//! Python backend built on tree-sitter.

pub mod names;
pub mod rewrite;
pub mod scope;
pub mod syntax;

pub use names::QualifiedName;

use crate::error::{PrefixError, Result};
use crate::index::{Module, TopLevelModule};
use crate::refactor::{ChangeSet, FileChange, PlanContext, RefactorBackend};
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Default, Clone, Copy)]
pub struct PythonBackend;

impl PythonBackend {
    pub fn new() -> Self {
        Self
    }

    /// Collect per-file edits for `old` → `new` into `changes`.
    fn rewrite_references(
        &self,
        ctx: PlanContext<'_>,
        old: &QualifiedName,
        new: &QualifiedName,
        scope: &[&Module],
        changes: &mut ChangeSet,
    ) -> Result<()> {
        for module in scope {
            // 읽을 수 없는 파일은 참조 여부를 판단할 수 없으므로 계획 실패
            let source = ctx
                .state
                .read_source(module)
                .map_err(|e| PrefixError::Parse {
                    path: module.path_str(),
                    message: e.to_string(),
                })?;
            match rewrite::rename_module(&source, old, new) {
                Ok(Some(rewrite)) => {
                    debug!(
                        file = %module.path_str(),
                        replacements = rewrite.replacements,
                        "planned rewrite"
                    );
                    changes.push(FileChange::Edit {
                        path: module.path.clone(),
                        replacements: rewrite.replacements,
                        original: source,
                        new_content: rewrite.content,
                    });
                }
                Ok(None) => {}
                Err(message) => {
                    return Err(PrefixError::Planning(format!(
                        "{}: {}",
                        module.path_str(),
                        message
                    )))
                }
            }
        }
        Ok(())
    }
}

impl RefactorBackend for PythonBackend {
    fn name(&self) -> &str {
        "python"
    }

    fn plan_rename(
        &self,
        ctx: PlanContext<'_>,
        old_name: &str,
        new_name: &str,
        scope: &[&Module],
    ) -> Result<ChangeSet> {
        let old = QualifiedName::parse(old_name)?;
        let new = QualifiedName::parse(new_name)?;

        let mut changes = ChangeSet::new(format!("Rename module <{}> to <{}>", old, new));
        self.rewrite_references(ctx, &old, &new, scope, &mut changes)?;
        Ok(changes)
    }

    fn plan_move(
        &self,
        ctx: PlanContext<'_>,
        module: &TopLevelModule,
        destination: &str,
    ) -> Result<ChangeSet> {
        let destination = QualifiedName::parse(destination)?;
        let old = QualifiedName::parse(&module.name)?;
        let new = destination.child(&module.name)?;

        if module.path.components().count() != 1 {
            return Err(PrefixError::Planning(format!(
                "{} is not a top-level module",
                module.path.display()
            )));
        }
        if destination.first() == module.name {
            return Err(PrefixError::Planning(format!(
                "cannot move <{}> into its own package <{}>",
                module.name, destination
            )));
        }
        if !ctx.state.absolute(&module.path).exists() {
            return Err(PrefixError::Planning(format!(
                "module <{}> not found at {}",
                module.name,
                module.path.display()
            )));
        }

        let package_dir: PathBuf = destination.segments().iter().collect();
        let target = package_dir.join(&module.path);
        if ctx.state.absolute(&target).exists() {
            return Err(PrefixError::Planning(format!(
                "destination {} already exists",
                target.display()
            )));
        }

        let mut changes = ChangeSet::new(format!("Move module <{}> to <{}>", old, new));
        let everything: Vec<&Module> = ctx.state.modules().iter().collect();
        self.rewrite_references(ctx, &old, &new, &everything, &mut changes)?;
        changes.push(FileChange::Move {
            from: module.path.clone(),
            to: target,
        });
        Ok(changes)
    }

    fn imported_names(&self, source: &str) -> Result<Vec<String>> {
        let tree = syntax::parse(source).map_err(|message| PrefixError::Parse {
            path: "<source>".to_string(),
            message,
        })?;
        let src = source.as_bytes();

        let mut names = Vec::new();
        syntax::walk_nodes(tree.root_node(), &mut |node| match node.kind() {
            "import_statement" => {
                for item in syntax::field_children(node, "name") {
                    let dotted = match item.kind() {
                        "aliased_import" => item.child_by_field_name("name"),
                        _ => Some(item),
                    };
                    if let Some(dotted) = dotted {
                        names.push(syntax::dotted_segments(dotted, src).join("."));
                    }
                }
            }
            "import_from_statement" => {
                if let Some(module) = node.child_by_field_name("module_name") {
                    if module.kind() == "dotted_name" {
                        names.push(syntax::dotted_segments(module, src).join("."));
                    }
                }
            }
            _ => {}
        });

        Ok(names)
    }
}
