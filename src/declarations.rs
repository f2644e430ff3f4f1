//! Synthetic declarations linking component classes to their template and selector.
//!
//! Exported classes whose first decorator is a call with an object literal
//! argument are treated as components. For each one the script virtual code
//! gets a type-level table entry so that tooling on the script side can resolve
//! `templateUrl` paths and selectors back to the class.

use std::path::{Path, PathBuf};

use path_clean::PathClean;
use serde::Serialize;
use tree_sitter::{Node, Tree};

use crate::mapping::CodeInformation;
use crate::virtual_code::Codegen;

/// Marker comment opening the synthetic block.
pub const SYNTHETIC_HEADER: &str = "\n/* treaty: synthetic declarations */\n";

/// A string literal copied from the script, quotes included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Literal {
    pub text: String,
    /// Script-text offsets
    pub start: usize,
    pub end: usize,
}

impl Literal {
    fn from_node(node: Node<'_>, script: &str) -> Option<Self> {
        let text = node.utf8_text(script.as_bytes()).ok()?;
        Some(Self {
            text: text.to_string(),
            start: node.start_byte(),
            end: node.end_byte(),
        })
    }

    /// Literal value without its quotes.
    pub fn value(&self) -> &str {
        let inner = self.text.get(1..self.text.len().saturating_sub(1));
        inner.unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDeclaration {
    pub class_name: String,
    pub decorator_name: String,
    pub selector: Option<Literal>,
    pub template_path: Option<PathBuf>,
    /// `templateUrl` and `styleUrls` literals in source order
    pub url_literals: Vec<Literal>,
}

/// Collect component declarations from the top level of a parsed script.
pub fn collect(tree: &Tree, script: &str, file_name: &Path) -> Vec<ComponentDeclaration> {
    let root = tree.root_node();
    let mut cursor = root.walk();

    root.named_children(&mut cursor)
        .filter(|node| node.kind() == "export_statement")
        .filter_map(|export| component_from_export(export, script, file_name))
        .collect()
}

fn component_from_export(
    export: Node<'_>,
    script: &str,
    file_name: &Path,
) -> Option<ComponentDeclaration> {
    let class = ["declaration", "value"]
        .into_iter()
        .filter_map(|field| export.child_by_field_name(field))
        .find(|node| {
            matches!(
                node.kind(),
                "class_declaration" | "abstract_class_declaration" | "class"
            )
        })?;

    // Decorators may precede `export` or sit between `export` and `class`
    let decorator = decorators_of(export)
        .into_iter()
        .chain(decorators_of(class))
        .next()?;

    let call = decorator
        .named_children(&mut decorator.walk())
        .find(|node| node.kind() == "call_expression")?;
    let decorator_name = call
        .child_by_field_name("function")?
        .utf8_text(script.as_bytes())
        .ok()?;
    let arguments = call.child_by_field_name("arguments")?;
    let object = arguments
        .named_children(&mut arguments.walk())
        .find(|node| node.kind() != "comment")
        .filter(|node| node.kind() == "object")?;

    let class_name = class
        .child_by_field_name("name")?
        .utf8_text(script.as_bytes())
        .ok()?;

    let mut component = ComponentDeclaration {
        class_name: class_name.to_string(),
        decorator_name: decorator_name.to_string(),
        selector: None,
        template_path: None,
        url_literals: Vec::new(),
    };

    let mut cursor = object.walk();
    for pair in object
        .named_children(&mut cursor)
        .filter(|node| node.kind() == "pair")
    {
        let (Some(key), Some(value)) = (
            pair.child_by_field_name("key"),
            pair.child_by_field_name("value"),
        ) else {
            continue;
        };
        if key.kind() != "property_identifier" {
            continue;
        }

        match key.utf8_text(script.as_bytes()).ok() {
            Some("selector") if value.kind() == "string" => {
                component.selector = Literal::from_node(value, script);
            }
            Some("templateUrl") if value.kind() == "string" => {
                if let Some(literal) = Literal::from_node(value, script) {
                    component.template_path = Some(resolve_template_path(file_name, literal.value()));
                    component.url_literals.push(literal);
                }
            }
            Some("styleUrls") if value.kind() == "array" => {
                let mut elements = value.walk();
                component.url_literals.extend(
                    value
                        .named_children(&mut elements)
                        .filter(|element| element.kind() == "string")
                        .filter_map(|element| Literal::from_node(element, script)),
                );
            }
            _ => {}
        }
    }

    Some(component)
}

fn decorators_of(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .filter(|child| child.kind() == "decorator")
        .collect()
}

/// `clean(dirname(file_name) / url)`
pub fn resolve_template_path(file_name: &Path, url: &str) -> PathBuf {
    file_name
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(url)
        .clean()
}

/// Append the synthetic declaration block for `declarations`.
///
/// `to_source` maps a script-text span to its physical source offset; literals
/// it cannot map are still emitted, unmapped. Nothing is emitted without
/// declarations.
pub fn emit(
    codegen: &mut Codegen,
    declarations: &[ComponentDeclaration],
    component_module: &str,
    to_source: impl Fn(usize, usize) -> Option<usize>,
) {
    if declarations.is_empty() {
        return;
    }

    let push_literal = |codegen: &mut Codegen, literal: &Literal| match to_source(
        literal.start,
        literal.end,
    ) {
        Some(source_offset) => codegen.push_mapped(
            &literal.text,
            source_offset,
            CodeInformation::navigation_and_semantic(),
        ),
        None => codegen.push(&literal.text),
    };

    codegen.push(SYNTHETIC_HEADER);
    for literal in declarations.iter().flat_map(|decl| &decl.url_literals) {
        codegen.push("import ");
        push_literal(codegen, literal);
        codegen.push(";\n");
    }

    codegen.push("declare global {\n");

    let templates: Vec<String> = declarations
        .iter()
        .filter_map(|decl| {
            decl.template_path.as_ref().map(|path| {
                format!(
                    "__WithComponent<'{}', {}, {}>",
                    path.display(),
                    decl.decorator_name,
                    decl.class_name
                )
            })
        })
        .collect();
    if !templates.is_empty() {
        codegen.push(&format!(
            "type __WithComponent<P extends string, C1, C2> = C1 extends import('{component_module}').Component ? {{ [k in P]: C2 }} : {{}};\n"
        ));
        codegen.push("interface __Templates2Components extends\n");
        codegen.push(&templates.join(",\n"));
        codegen.push("\n{ }\n");
    }

    let with_selector: Vec<(&ComponentDeclaration, &Literal)> = declarations
        .iter()
        .filter_map(|decl| decl.selector.as_ref().map(|selector| (decl, selector)))
        .collect();
    if !with_selector.is_empty() {
        codegen.push(&format!(
            "type __WithComponent2<P extends {{}}, C1> = C1 extends import('{component_module}').Component ? P : {{}};\n"
        ));
        for (decl, selector) in with_selector {
            codegen.push("interface __Selectors2Components extends __WithComponent2<{ ");
            push_literal(codegen, selector);
            codegen.push(&format!(
                ": {} }}, {}> {{ }}\n",
                decl.class_name, decl.decorator_name
            ));
        }
    }

    codegen.push("}\n");
}
