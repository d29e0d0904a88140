use tree_sitter::{Node, Parser, Tree};

/// Parse Python source. Trees containing syntax errors are rejected.
pub fn parse(source: &str) -> Result<Tree, String> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| format!("failed to load Python grammar: {}", e))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| "parser returned no tree".to_string())?;

    if tree.root_node().has_error() {
        let position = first_error(tree.root_node())
            .map(|n| n.start_position())
            .unwrap_or_else(|| tree.root_node().start_position());
        return Err(format!(
            "syntax error at line {}, column {}",
            position.row + 1,
            position.column + 1
        ));
    }

    Ok(tree)
}

fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error)
}

/// Extract a text slice from source bytes given a node.
pub fn node_text<'a>(node: Node, src: &'a [u8]) -> &'a str {
    node.utf8_text(src).unwrap_or("")
}

pub fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

pub fn field_children<'t>(node: Node<'t>, field: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children_by_field_name(field, &mut cursor).collect()
}

pub fn is_field(parent: Node, field: &str, child: Node) -> bool {
    parent
        .child_by_field_name(field)
        .map(|n| n.id() == child.id())
        .unwrap_or(false)
}

/// Identifier segments of a `dotted_name` node.
pub fn dotted_segments(node: Node, src: &[u8]) -> Vec<String> {
    if node.kind() == "identifier" {
        return vec![node_text(node, src).to_string()];
    }
    named_children(node)
        .into_iter()
        .filter(|n| n.kind() == "identifier")
        .map(|n| node_text(n, src).to_string())
        .collect()
}

/// Visit every node of the subtree, parents before children.
pub fn walk_nodes<'t>(node: Node<'t>, visit: &mut impl FnMut(Node<'t>)) {
    visit(node);
    let mut cursor = node.walk();
    let children: Vec<Node<'t>> = node.named_children(&mut cursor).collect();
    for child in children {
        walk_nodes(child, visit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_source() {
        let tree = parse("import numpy\nnumpy.random()\n").unwrap();
        assert_eq!(tree.root_node().kind(), "module");
    }

    #[test]
    fn test_parse_reports_syntax_error() {
        let err = parse("import numpy\ndef broken(:\n").unwrap_err();
        assert!(err.starts_with("syntax error at line"), "{}", err);
    }

    #[test]
    fn test_dotted_segments() {
        let src = "import a.b.c\n";
        let tree = parse(src).unwrap();
        let import = tree.root_node().named_child(0).unwrap();
        let dotted = import.child_by_field_name("name").unwrap();
        assert_eq!(dotted_segments(dotted, src.as_bytes()), vec!["a", "b", "c"]);
    }
}
