//! Python name binding and resolution.
//!
//! Builds a scope table for one parsed file: module, function (including
//! lambda), class body and comprehension scopes, what each of them binds,
//! and every identifier use together with the scope it appears in.
//! Resolution follows Python's rules: a name assigned anywhere in a function
//! is local to the whole function unless declared `global`/`nonlocal`, and
//! class bodies are not visible from nested scopes.
//!
//! Every binding also records where it takes effect in straight-line order
//! and the innermost branch, loop or handler it sits in, so callers can tell
//! which binding a given load sees.

use crate::refactor::python::syntax::{
    dotted_segments, field_children, is_field, named_children, node_text,
};
use std::collections::{HashMap, HashSet};
use tree_sitter::Node;

pub const MODULE_SCOPE: usize = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Module,
    Function,
    Class,
    Comprehension,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingKind {
    /// Non-aliased `import a.b.c`; binds `a`, keeps the full path.
    Import(Vec<String>),
    /// Anything else: assignment, def, class, parameter, aliased or from-import.
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub kind: BindingKind,
    pub line: usize,
    /// 이 바이트 위치 이후의 코드가 바인딩을 본다
    pub effective: usize,
    /// 바인딩을 조건부로 만드는 가장 안쪽 노드 (block, except, loop 등)
    pub guard: Option<usize>,
}

impl Binding {
    pub fn is_import(&self) -> bool {
        matches!(self.kind, BindingKind::Import(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Load,
    Store,
    GlobalDecl,
}

#[derive(Debug)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<usize>,
    /// Node id of the syntax node that delimits this scope.
    pub container: usize,
    bindings: HashMap<String, Vec<Binding>>,
    globals: HashSet<String>,
    nonlocals: HashSet<String>,
}

impl Scope {
    fn new(kind: ScopeKind, parent: Option<usize>, container: usize) -> Self {
        Self {
            kind,
            parent,
            container,
            bindings: HashMap::new(),
            globals: HashSet::new(),
            nonlocals: HashSet::new(),
        }
    }

    pub fn bindings_of(&self, name: &str) -> &[Binding] {
        self.bindings.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[derive(Debug, Clone)]
pub struct NameUse<'t> {
    pub name: String,
    pub scope: usize,
    pub role: Role,
    pub node: Node<'t>,
}

#[derive(Debug)]
pub struct ScopeTable<'t> {
    scopes: Vec<Scope>,
    uses: Vec<NameUse<'t>>,
}

impl<'t> ScopeTable<'t> {
    pub fn build(root: Node<'t>, src: &[u8]) -> Self {
        let mut table = Self {
            scopes: vec![Scope::new(ScopeKind::Module, None, root.id())],
            uses: Vec::new(),
        };
        table.visit_children(root, MODULE_SCOPE, src);
        table
    }

    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    pub fn uses(&self) -> &[NameUse<'t>] {
        &self.uses
    }

    /// Index of the scope that owns `name` as seen from `scope`.
    pub fn resolve(&self, scope: usize, name: &str) -> usize {
        let mut current = scope;
        let mut innermost = true;
        loop {
            let s = &self.scopes[current];
            match s.kind {
                ScopeKind::Module => return MODULE_SCOPE,
                ScopeKind::Class => {
                    if s.globals.contains(name) {
                        return MODULE_SCOPE;
                    }
                    if innermost && s.bindings.contains_key(name) {
                        return current;
                    }
                }
                ScopeKind::Function | ScopeKind::Comprehension => {
                    if s.globals.contains(name) {
                        return MODULE_SCOPE;
                    }
                    if !s.nonlocals.contains(name) && s.bindings.contains_key(name) {
                        return current;
                    }
                }
            }
            innermost = false;
            match s.parent {
                Some(parent) => current = parent,
                None => return MODULE_SCOPE,
            }
        }
    }

    fn push_scope(&mut self, kind: ScopeKind, parent: usize, container: Node) -> usize {
        self.scopes.push(Scope::new(kind, Some(parent), container.id()));
        self.scopes.len() - 1
    }

    fn bind(&mut self, scope: usize, name: &str, kind: BindingKind, node: Node) {
        let (effective, guard) = placement(node, self.scopes[scope].container);
        let binding = Binding {
            kind,
            line: node.start_position().row + 1,
            effective,
            guard,
        };
        self.scopes[scope]
            .bindings
            .entry(name.to_string())
            .or_default()
            .push(binding);
    }

    fn bind_other(&mut self, scope: usize, node: Node, src: &[u8]) {
        self.bind(scope, node_text(node, src), BindingKind::Other, node);
    }

    fn record(&mut self, scope: usize, node: Node<'t>, role: Role, src: &[u8]) {
        self.uses.push(NameUse {
            name: node_text(node, src).to_string(),
            scope,
            role,
            node,
        });
    }

    fn visit_children(&mut self, node: Node<'t>, scope: usize, src: &[u8]) {
        for child in named_children(node) {
            self.visit(child, scope, src);
        }
    }

    fn visit(&mut self, node: Node<'t>, scope: usize, src: &[u8]) {
        match node.kind() {
            "function_definition" => {
                if let Some(name) = node.child_by_field_name("name") {
                    self.bind_other(scope, name, src);
                }
                let inner = self.push_scope(ScopeKind::Function, scope, node);
                if let Some(params) = node.child_by_field_name("parameters") {
                    self.visit_parameters(params, inner, scope, src);
                }
                if let Some(ret) = node.child_by_field_name("return_type") {
                    self.visit(ret, scope, src);
                }
                if let Some(body) = node.child_by_field_name("body") {
                    self.visit_children(body, inner, src);
                }
            }
            "lambda" => {
                let inner = self.push_scope(ScopeKind::Function, scope, node);
                if let Some(params) = node.child_by_field_name("parameters") {
                    self.visit_parameters(params, inner, scope, src);
                }
                if let Some(body) = node.child_by_field_name("body") {
                    self.visit(body, inner, src);
                }
            }
            "class_definition" => {
                if let Some(name) = node.child_by_field_name("name") {
                    self.bind_other(scope, name, src);
                }
                if let Some(bases) = node.child_by_field_name("superclasses") {
                    self.visit(bases, scope, src);
                }
                let inner = self.push_scope(ScopeKind::Class, scope, node);
                if let Some(body) = node.child_by_field_name("body") {
                    self.visit_children(body, inner, src);
                }
            }
            "list_comprehension"
            | "set_comprehension"
            | "dictionary_comprehension"
            | "generator_expression" => {
                let inner = self.push_scope(ScopeKind::Comprehension, scope, node);
                self.visit_children(node, inner, src);
            }
            "import_statement" => {
                for item in field_children(node, "name") {
                    match item.kind() {
                        "dotted_name" => {
                            let segments = dotted_segments(item, src);
                            if let Some(first) = segments.first().cloned() {
                                self.bind(scope, &first, BindingKind::Import(segments), item);
                            }
                        }
                        "aliased_import" => {
                            if let Some(alias) = item.child_by_field_name("alias") {
                                self.bind_other(scope, alias, src);
                            }
                        }
                        _ => {}
                    }
                }
            }
            "import_from_statement" | "future_import_statement" => {
                for item in field_children(node, "name") {
                    let bound = match item.kind() {
                        "aliased_import" => item.child_by_field_name("alias"),
                        _ => Some(item),
                    };
                    if let Some(bound) = bound {
                        self.bind_other(scope, bound, src);
                    }
                }
            }
            "global_statement" | "nonlocal_statement" => {
                let is_global = node.kind() == "global_statement";
                for name in named_children(node) {
                    if name.kind() != "identifier" {
                        continue;
                    }
                    let text = node_text(name, src).to_string();
                    if is_global {
                        self.scopes[scope].globals.insert(text);
                        self.record(scope, name, Role::GlobalDecl, src);
                    } else {
                        self.scopes[scope].nonlocals.insert(text);
                    }
                }
            }
            "attribute" => {
                if let Some(object) = node.child_by_field_name("object") {
                    self.visit(object, scope, src);
                }
            }
            "keyword_argument" => {
                if let Some(value) = node.child_by_field_name("value") {
                    self.visit(value, scope, src);
                }
            }
            "identifier" => {
                if is_store(node) {
                    self.bind_other(scope, node, src);
                    self.record(scope, node, Role::Store, src);
                } else {
                    self.record(scope, node, Role::Load, src);
                }
            }
            _ => self.visit_children(node, scope, src),
        }
    }

    /// Parameter names bind in `inner`; defaults and annotations evaluate in `outer`.
    fn visit_parameters(&mut self, params: Node<'t>, inner: usize, outer: usize, src: &[u8]) {
        for param in named_children(params) {
            match param.kind() {
                "identifier" => self.bind_other(inner, param, src),
                "default_parameter" | "typed_default_parameter" => {
                    if let Some(name) = param.child_by_field_name("name") {
                        self.bind_pattern(inner, name, src);
                    }
                    if let Some(ty) = param.child_by_field_name("type") {
                        self.visit(ty, outer, src);
                    }
                    if let Some(value) = param.child_by_field_name("value") {
                        self.visit(value, outer, src);
                    }
                }
                "typed_parameter" => {
                    for part in named_children(param) {
                        if part.kind() == "type" {
                            self.visit(part, outer, src);
                        } else {
                            self.bind_pattern(inner, part, src);
                        }
                    }
                }
                "list_splat_pattern" | "dictionary_splat_pattern" | "tuple_pattern" => {
                    self.bind_pattern(inner, param, src)
                }
                _ => {}
            }
        }
    }

    fn bind_pattern(&mut self, scope: usize, node: Node<'t>, src: &[u8]) {
        if node.kind() == "identifier" {
            self.bind_other(scope, node, src);
            return;
        }
        for child in named_children(node) {
            self.bind_pattern(scope, child, src);
        }
    }
}

/// Byte offset after which `node`'s binding is visible, and the innermost
/// enclosing node (below `container`) that may keep it from running.
fn placement(node: Node, container: usize) -> (usize, Option<usize>) {
    let mut guard = None;
    let mut statement = None;
    let mut current = node;
    while let Some(parent) = current.parent() {
        if parent.id() == container {
            break;
        }
        if guard.is_none() && is_guard(parent, container) {
            guard = Some(parent.id());
        }
        if statement.is_none() && SIMPLE_STATEMENTS.contains(&parent.kind()) {
            statement = Some(parent);
        }
        current = parent;
    }
    // 단순 문장은 문장이 끝난 뒤에 바인딩된다 (`x = x.y`의 우변은 이전 값)
    let effective = statement.map_or(node.end_byte(), |s| s.end_byte());
    (effective, guard)
}

const SIMPLE_STATEMENTS: &[&str] = &[
    "expression_statement",
    "import_statement",
    "import_from_statement",
    "future_import_statement",
    "delete_statement",
];

/// Nodes whose contents may run zero times or more than once.
fn is_guard(node: Node, container: usize) -> bool {
    match node.kind() {
        "block" => node
            .parent()
            .map_or(true, |p| p.id() != container && p.kind() != "with_statement"),
        "except_clause" | "for_statement" | "while_statement" | "case_clause"
        | "conditional_expression" | "boolean_operator" => true,
        _ => false,
    }
}

/// Whether an identifier is an assignment target (directly or through
/// tuple/list unpacking).
fn is_store(node: Node) -> bool {
    let mut child = node;
    while let Some(parent) = child.parent() {
        match parent.kind() {
            "pattern_list" | "tuple_pattern" | "list_pattern" | "list_splat_pattern" | "tuple"
            | "list" | "list_splat" | "parenthesized_expression" | "expression_list" => {
                child = parent;
            }
            "assignment" | "augmented_assignment" | "for_statement" | "for_in_clause" => {
                return is_field(parent, "left", child);
            }
            "named_expression" => return is_field(parent, "name", child),
            "as_pattern_target" | "delete_statement" => return true,
            "except_clause" => {
                return child
                    .prev_sibling()
                    .map(|s| s.kind() == "as" || s.kind() == ",")
                    .unwrap_or(false);
            }
            _ => return false,
        }
    }
    false
}
