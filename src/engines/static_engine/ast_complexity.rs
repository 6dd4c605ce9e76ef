//! AST-driven cyclomatic complexity for the one embedded tree-sitter
//! language (Go): walk the parse tree counting control-flow decision points
//! per function.

use serde::{Deserialize, Serialize};
use tree_sitter::{Node, Parser};

use crate::core::errors::{Result, ValidationError};

/// Per-function complexity metrics, recorded in
/// `metrics.complexity_by_function`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionComplexity {
    pub name: String,
    pub file: String,
    pub start_line: usize,
    pub end_line: usize,
    pub complexity: u32,
    pub loc: usize,
    pub parameter_count: usize,
}

/// Node kinds counted as control-flow decision points:
/// "conditional, for-loop, range-loop, switch, type-switch, case-clause".
fn is_range_loop(node: &Node) -> bool {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .any(|child| child.kind() == "range_clause")
}

fn classify_decision(node: &Node) -> Option<&'static str> {
    match node.kind() {
        "if_statement" => Some("conditional"),
        "for_statement" => {
            if is_range_loop(node) {
                Some("range-loop")
            } else {
                Some("for-loop")
            }
        }
        "expression_switch_statement" => Some("switch"),
        "type_switch_statement" => Some("type-switch"),
        "expression_case" | "type_case" | "communication_case" => Some("case-clause"),
        _ => None,
    }
}

fn count_decision_points(node: &Node) -> u32 {
    let mut count = 0u32;
    if classify_decision(node).is_some() {
        count += 1;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        count += count_decision_points(&child);
    }
    count
}

fn node_name(node: &Node, source: &str) -> String {
    node.child_by_field_name("name")
        .and_then(|n| n.utf8_text(source.as_bytes()).ok())
        .unwrap_or("<anonymous>")
        .to_string()
}

fn parameter_count(node: &Node) -> usize {
    node.child_by_field_name("parameters")
        .map(|params| {
            let mut cursor = params.walk();
            params
                .children(&mut cursor)
                .filter(|c| c.kind() == "parameter_declaration")
                .count()
        })
        .unwrap_or(0)
}

/// Parse Go source and compute per-function cyclomatic complexity for every
/// top-level `function_declaration` and `method_declaration`.
pub fn analyze_go_source(file_path: &str, source: &str) -> Result<Vec<FunctionComplexity>> {
    let language = tree_sitter_go::LANGUAGE.into();
    let mut parser = Parser::new();
    parser
        .set_language(&language)
        .map_err(|e| ValidationError::fatal(format!("failed to load Go grammar: {e}")))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| ValidationError::config(format!("failed to parse Go source: {file_path}")))?;

    let root = tree.root_node();
    let mut results = Vec::new();
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        if matches!(child.kind(), "function_declaration" | "method_declaration") {
            let name = node_name(&child, source);
            let start_line = child.start_position().row + 1;
            let end_line = child.end_position().row + 1;
            let complexity = 1 + count_decision_points(&child);
            let loc = end_line.saturating_sub(start_line) + 1;
            let parameter_count = parameter_count(&child);

            results.push(FunctionComplexity {
                name,
                file: file_path.to_string(),
                start_line,
                end_line,
                complexity,
                loc,
                parameter_count,
            });
        }
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_function_has_complexity_one() {
        let source = "package main\n\nfunc main() {\n\tprintln(\"hi\")\n}\n";
        let result = analyze_go_source("main.go", source).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].name, "main");
        assert_eq!(result[0].complexity, 1);
        assert_eq!(result[0].start_line, 3);
    }

    #[test]
    fn twelve_nested_ifs_yield_complexity_thirteen() {
        let mut body = String::new();
        for i in 0..12 {
            body.push_str(&format!("if x > {i} {{\n"));
        }
        for _ in 0..12 {
            body.push_str("}\n");
        }
        let source = format!("package main\n\nfunc f(x int) {{\n{body}}}\n");
        let result = analyze_go_source("main.go", &source).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].complexity, 13);
    }

    #[test]
    fn for_range_is_classified_as_range_loop() {
        let source = "package main\n\nfunc sum(xs []int) int {\n\ts := 0\n\tfor _, x := range xs {\n\t\ts += x\n\t}\n\treturn s\n}\n";
        let result = analyze_go_source("sum.go", source).unwrap();
        assert_eq!(result[0].complexity, 2);
    }

    #[test]
    fn switch_cases_each_add_one() {
        let source = "package main\n\nfunc classify(x int) string {\n\tswitch x {\n\tcase 1:\n\t\treturn \"a\"\n\tcase 2:\n\t\treturn \"b\"\n\tdefault:\n\t\treturn \"c\"\n\t}\n\treturn \"\"\n}\n";
        let result = analyze_go_source("classify.go", source).unwrap();
        // switch itself + 2 expression_case arms (default_case is not counted)
        assert_eq!(result[0].complexity, 3);
    }

    #[test]
    fn parameter_count_is_recorded() {
        let source = "package main\n\nfunc add(a int, b int) int {\n\treturn a + b\n}\n";
        let result = analyze_go_source("add.go", source).unwrap();
        assert_eq!(result[0].parameter_count, 2);
    }
}
