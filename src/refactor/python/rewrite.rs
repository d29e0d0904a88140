//! Reference rewriting for one source file.
//!
//! Rewrites import statements that name the renamed module and every
//! attribute chain rooted at an identifier bound by a matching non-aliased
//! `import` at the point of use. Names that merely look the same (function locals, parameters,
//! attributes of unrelated objects, keyword arguments, string contents) are
//! never touched.

use crate::refactor::python::names::QualifiedName;
use crate::refactor::python::scope::{Binding, BindingKind, NameUse, Role, ScopeTable, MODULE_SCOPE};
use crate::refactor::python::syntax::{
    dotted_segments, field_children, is_field, node_text, parse, walk_nodes,
};
use std::collections::HashSet;
use tree_sitter::Node;

#[derive(Debug, Clone, PartialEq, Eq)]
struct TextEdit {
    start: usize,
    end: usize,
    text: String,
}

/// Result of rewriting one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub content: String,
    pub replacements: usize,
}

/// Rename `old` to `new` in `source`. `Ok(None)` when nothing refers to `old`.
pub fn rename_module(
    source: &str,
    old: &QualifiedName,
    new: &QualifiedName,
) -> Result<Option<Rewrite>, String> {
    if !source.contains(old.first()) {
        return Ok(None);
    }

    let tree = parse(source)?;
    let src = source.as_bytes();
    let root = tree.root_node();

    let mut edits = Vec::new();
    walk_nodes(root, &mut |node| match node.kind() {
        "import_statement" => import_edits(node, src, old, new, &mut edits),
        "import_from_statement" => from_import_edits(node, source, old, new, &mut edits),
        _ => {}
    });

    let table = ScopeTable::build(root, src);
    check_import_scopes(&table, old, new)?;

    for name_use in table.uses() {
        if name_use.name != old.first() {
            continue;
        }
        let line = name_use.node.start_position().row + 1;
        let owner = table.resolve(name_use.scope, &name_use.name);

        match name_use.role {
            Role::Load => {
                let (segments, end) = attribute_chain(name_use.node, src, old.len());
                if !old.is_prefix_of(&segments) || !refers_to_import(&table, owner, name_use, old)? {
                    continue;
                }
                check_new_root(&table, name_use.scope, new, line)?;
                edits.push(TextEdit {
                    start: name_use.node.start_byte(),
                    end,
                    text: new.to_string(),
                });
            }
            Role::Store | Role::GlobalDecl => {
                if old.len() > 1 || !refers_to_import(&table, owner, name_use, old)? {
                    continue;
                }
                if new.len() > 1 {
                    return Err(format!(
                        "line {}: '{}' is rebound through a global declaration and cannot become the dotted name '{}'",
                        line, old, new
                    ));
                }
                check_new_root(&table, name_use.scope, new, line)?;
                edits.push(TextEdit {
                    start: name_use.node.start_byte(),
                    end: name_use.node.end_byte(),
                    text: new.to_string(),
                });
            }
        }
    }

    if edits.is_empty() {
        return Ok(None);
    }
    apply_edits(source, edits).map(Some)
}

fn imports_module(binding: &Binding, old: &QualifiedName) -> bool {
    match &binding.kind {
        BindingKind::Import(path) => old.is_prefix_of(path),
        BindingKind::Other => false,
    }
}

/// A rewritten `import old` binds `new`'s root in the same scope, so that
/// scope must not already use the root for something else.
fn check_import_scopes(
    table: &ScopeTable,
    old: &QualifiedName,
    new: &QualifiedName,
) -> Result<(), String> {
    for (index, scope) in table.scopes().iter().enumerate() {
        if !scope
            .bindings_of(old.first())
            .iter()
            .any(|b| imports_module(b, old))
        {
            continue;
        }
        if let Some(clash) = scope.bindings_of(new.first()).iter().find(|b| !b.is_import()) {
            let place = if index == MODULE_SCOPE {
                "module scope"
            } else {
                "a local scope"
            };
            return Err(format!(
                "'{}' is already bound at line {} in {}; renaming to '{}' would shadow it",
                new.first(),
                clash.line,
                place,
                new
            ));
        }
    }
    Ok(())
}

/// The rewritten reference must reach the module, not a name that happens
/// to share `new`'s root in an enclosing scope.
fn check_new_root(
    table: &ScopeTable,
    scope: usize,
    new: &QualifiedName,
    line: usize,
) -> Result<(), String> {
    let owner = table.resolve(scope, new.first());
    match table.scopes()[owner]
        .bindings_of(new.first())
        .iter()
        .find(|b| !b.is_import())
    {
        Some(clash) => Err(format!(
            "line {}: '{}' would resolve to the name bound at line {} instead of the module '{}'",
            line,
            new.first(),
            clash.line,
            new
        )),
        None => Ok(()),
    }
}

/// Whether `name_use` sees the import of `old` in its owning scope.
///
/// A scope that only imports the name is unambiguous. When the scope also
/// rebinds it, loads in that scope follow straight-line order: the last
/// binding that certainly ran before the load decides, and branch or loop
/// bindings in between make the load undecidable unless they agree.
fn refers_to_import(
    table: &ScopeTable,
    owner: usize,
    name_use: &NameUse,
    old: &QualifiedName,
) -> Result<bool, String> {
    let scope = &table.scopes()[owner];
    let bindings = scope.bindings_of(old.first());
    if !bindings.iter().any(|b| imports_module(b, old)) {
        return Ok(false);
    }
    if bindings.iter().all(Binding::is_import) {
        return Ok(true);
    }

    let line = name_use.node.start_position().row + 1;
    if name_use.scope != owner {
        return Err(format!(
            "line {}: '{}' is both imported and rebound in an enclosing scope; cannot tell which one is meant here",
            line,
            old.first()
        ));
    }
    // 같은 스코프의 대입은 재바인딩 자체
    if name_use.role != Role::Load {
        return Ok(false);
    }

    let (import, other) = reaching(bindings, name_use.node, scope.container);
    if import && other {
        return Err(format!(
            "line {}: '{}' may refer to either the imported module or a rebinding; cannot tell which",
            line,
            old.first()
        ));
    }
    Ok(import)
}

/// Kinds of binding (import, other) that may reach a load at `node`.
fn reaching(bindings: &[Binding], node: Node, container: usize) -> (bool, bool) {
    let position = node.start_byte();
    let mut enclosing = HashSet::new();
    let mut loop_end = None;
    let mut current = node;
    while let Some(parent) = current.parent() {
        if parent.id() == container {
            break;
        }
        enclosing.insert(parent.id());
        if matches!(parent.kind(), "for_statement" | "while_statement") {
            loop_end = Some(parent.end_byte());
        }
        current = parent;
    }

    let certain = |b: &Binding| b.guard.map_or(true, |g| enclosing.contains(&g));
    let floor = bindings
        .iter()
        .filter(|b| b.effective <= position && certain(b))
        .map(|b| b.effective)
        .max()
        .unwrap_or(0);

    let mut import = false;
    let mut other = false;
    for b in bindings {
        let before = b.effective >= floor && b.effective <= position;
        // 루프 안의 로드는 다음 반복에서 뒤쪽 바인딩을 볼 수 있다
        let looped = loop_end.map_or(false, |end| b.effective > position && b.effective <= end);
        if before || looped {
            if b.is_import() {
                import = true;
            } else {
                other = true;
            }
        }
    }
    (import, other)
}

/// Segments of the attribute chain starting at `node`, up to `limit` long,
/// with the end byte of the last collected segment.
fn attribute_chain(node: Node, src: &[u8], limit: usize) -> (Vec<String>, usize) {
    let mut segments = vec![node_text(node, src).to_string()];
    let mut end = node.end_byte();
    let mut current = node;

    while segments.len() < limit {
        let parent = match current.parent() {
            Some(p) if p.kind() == "attribute" && is_field(p, "object", current) => p,
            _ => break,
        };
        let attribute = match parent.child_by_field_name("attribute") {
            Some(a) => a,
            None => break,
        };
        segments.push(node_text(attribute, src).to_string());
        end = attribute.end_byte();
        current = parent;
    }

    (segments, end)
}

fn dotted_edit(
    dotted: Node,
    src: &[u8],
    old: &QualifiedName,
    new: &QualifiedName,
    edits: &mut Vec<TextEdit>,
) {
    let segments = dotted_segments(dotted, src);
    if old.is_prefix_of(&segments) {
        edits.push(TextEdit {
            start: dotted.start_byte(),
            end: dotted.end_byte(),
            text: old.replace_prefix(&segments, new),
        });
    }
}

/// `import a.b`, `import a.b as x`
fn import_edits(
    node: Node,
    src: &[u8],
    old: &QualifiedName,
    new: &QualifiedName,
    edits: &mut Vec<TextEdit>,
) {
    for item in field_children(node, "name") {
        let dotted = match item.kind() {
            "dotted_name" => Some(item),
            "aliased_import" => item.child_by_field_name("name"),
            _ => None,
        };
        if let Some(dotted) = dotted {
            dotted_edit(dotted, src, old, new, edits);
        }
    }
}

/// `from a.b import x`, and `from a import b` when `a.b` is the renamed module.
fn from_import_edits(
    node: Node,
    source: &str,
    old: &QualifiedName,
    new: &QualifiedName,
    edits: &mut Vec<TextEdit>,
) {
    let src = source.as_bytes();
    let module = match node.child_by_field_name("module_name") {
        Some(m) if m.kind() == "dotted_name" => m,
        _ => return,
    };

    let segments = dotted_segments(module, src);
    if old.is_prefix_of(&segments) {
        dotted_edit(module, src, old, new, edits);
        return;
    }

    let parent = match old.parent() {
        Some(parent) if parent == segments.join(".") => parent,
        _ => return,
    };

    let mut kept: Vec<String> = Vec::new();
    let mut moved: Vec<String> = Vec::new();
    for item in field_children(node, "name") {
        let (name, alias) = match item.kind() {
            "aliased_import" => (
                item.child_by_field_name("name").map(|n| node_text(n, src)),
                item.child_by_field_name("alias").map(|n| node_text(n, src)),
            ),
            _ => (Some(node_text(item, src)), None),
        };
        if name == Some(old.last()) {
            moved.push(import_line(new, alias.unwrap_or(old.last())));
        } else {
            kept.push(node_text(item, src).to_string());
        }
    }

    if moved.is_empty() {
        return;
    }

    let line_start = source[..node.start_byte()]
        .rfind('\n')
        .map(|i| i + 1)
        .unwrap_or(0);
    let indent = &source[line_start..node.start_byte()];
    let separator = if indent.trim().is_empty() {
        format!("\n{}", indent)
    } else {
        "; ".to_string()
    };

    let mut lines = Vec::new();
    if !kept.is_empty() {
        lines.push(format!("from {} import {}", parent, kept.join(", ")));
    }
    lines.extend(moved);

    edits.push(TextEdit {
        start: node.start_byte(),
        end: node.end_byte(),
        text: lines.join(&separator),
    });
}

/// Import statement that binds `bound` to the module `new`.
fn import_line(new: &QualifiedName, bound: &str) -> String {
    let alias = if new.last() == bound {
        String::new()
    } else {
        format!(" as {}", bound)
    };
    match new.parent() {
        Some(parent) => format!("from {} import {}{}", parent, new.last(), alias),
        None if alias.is_empty() => format!("import {}", new.last()),
        None => format!("import {}{}", new.last(), alias),
    }
}

fn apply_edits(source: &str, mut edits: Vec<TextEdit>) -> Result<Rewrite, String> {
    edits.sort_by(|a, b| b.start.cmp(&a.start));
    edits.dedup();

    for pair in edits.windows(2) {
        if pair[1].end > pair[0].start {
            return Err(format!(
                "overlapping edits at bytes {}..{} and {}..{}",
                pair[1].start, pair[1].end, pair[0].start, pair[0].end
            ));
        }
    }

    let mut content = source.to_string();
    for edit in &edits {
        content.replace_range(edit.start..edit.end, &edit.text);
    }

    Ok(Rewrite {
        content,
        replacements: edits.len(),
    })
}
