//! Tree primitives the engine drives: owner lookup, style attachment, scope
//! classes and inline custom properties.

use umbra_css::parser::{BlockItem, parse_component_values, parse_declaration_list};
use umbra_css::serializer::declaration_to_css;
use umbra_css::Declaration;
use umbra_dom::{DomTree, NodeId};

use crate::style_info::StyleInfoTable;

/// Class that marks an element carrying a generated scope token.
pub const SCOPE_MARKER_CLASS: &str = "x-scope";

/// The nearest enclosing host that has a style record, or `document_owner`.
///
/// Walks out through shadow roots: a host without a record is skipped and
/// its own enclosing host is tried next.
#[must_use]
pub fn structural_owner_of(tree: &DomTree, records: &StyleInfoTable, node: NodeId, document_owner: NodeId) -> NodeId {
    let mut current = node;
    while let Some(host) = tree.containing_host(current) {
        if records.contains(host) {
            return host;
        }
        current = host;
    }
    document_owner
}

/// Where generated styles for `host` go: its shadow root with native shadow
/// trees, otherwise the document head (or the document element).
#[must_use]
pub fn rendering_root_of(tree: &DomTree, host: NodeId, native_shadow: bool) -> Option<NodeId> {
    if native_shadow {
        tree.shadow_root(host)
    } else {
        tree.head().or_else(|| tree.document_element())
    }
}

/// The `<style scope="...">` child of `root` for `scope`, if attached.
#[must_use]
pub fn find_scoped_style(tree: &DomTree, root: NodeId, scope: &str) -> Option<NodeId> {
    tree.children(root).iter().copied().find(|&id| {
        tree.as_element(id).is_some_and(|e| {
            e.tag_name.eq_ignore_ascii_case("style") && e.get_attribute("scope") == Some(scope)
        })
    })
}

/// Ensure `root` holds a `<style scope="scope">` with `css_text`. Attaches at
/// most once per root; empty css attaches nothing.
pub fn attach_generated_stylesheet(tree: &mut DomTree, root: NodeId, scope: &str, css_text: &str) -> Option<NodeId> {
    if css_text.is_empty() {
        return None;
    }
    if let Some(existing) = find_scoped_style(tree, root, scope) {
        return Some(existing);
    }
    let style = tree.create_element("style");
    tree.set_attribute(style, "scope", scope);
    tree.set_text_content(style, css_text);
    tree.append_child(root, style);
    Some(style)
}

/// Replace `previous` with `token` in the scope classes of `host`.
pub fn set_scope_selector(tree: &mut DomTree, host: NodeId, token: &str, previous: Option<&str>) {
    let current = tree.get_attribute(host, "class").unwrap_or_default().to_string();
    let mut classes: Vec<&str> = current
        .split_ascii_whitespace()
        .filter(|&c| c != SCOPE_MARKER_CLASS && Some(c) != previous && c != token)
        .collect();
    classes.push(SCOPE_MARKER_CLASS);
    classes.push(token);
    let updated = classes.join(" ");
    if updated != current {
        tree.set_attribute(host, "class", updated);
    }
}

fn inline_declarations(tree: &DomTree, node: NodeId) -> Vec<Declaration> {
    tree.get_attribute(node, "style")
        .map(parse_declaration_list)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|item| match item {
            BlockItem::Declaration(d) => Some(d),
            BlockItem::Apply(_) => None,
        })
        .collect()
}

fn write_inline_declarations(tree: &mut DomTree, node: NodeId, declarations: &[Declaration]) {
    if declarations.is_empty() {
        tree.remove_attribute(node, "style");
        return;
    }
    let text: Vec<String> = declarations.iter().map(declaration_to_css).collect();
    tree.set_attribute(node, "style", format!("{};", text.join("; ")));
}

/// Set `name: value` in the inline style of `node`.
pub fn set_inline_property(tree: &mut DomTree, node: NodeId, name: &str, value: &str) {
    let mut declarations = inline_declarations(tree, node);
    let parsed = parse_component_values(value);
    match declarations.iter_mut().find(|d| d.name == name) {
        Some(existing) => existing.value = parsed,
        None => declarations.push(Declaration::new(name, parsed, false)),
    }
    write_inline_declarations(tree, node, &declarations);
}

/// Remove `name` from the inline style of `node`.
pub fn remove_inline_property(tree: &mut DomTree, node: NodeId, name: &str) {
    let mut declarations = inline_declarations(tree, node);
    let before = declarations.len();
    declarations.retain(|d| d.name != name);
    if declarations.len() != before {
        write_inline_declarations(tree, node, &declarations);
    }
}

/// The value the environment itself would report for `name` on `node`: the
/// nearest inline declaration on the node or its ancestors, crossing into
/// hosts at shadow roots.
#[must_use]
pub fn computed_property_value(tree: &DomTree, node: NodeId, name: &str) -> Option<String> {
    let mut current = Some(node);
    while let Some(id) = current {
        if let Some(d) = inline_declarations(tree, id).into_iter().rev().find(|d| d.name == name) {
            return Some(d.value_text());
        }
        current = tree.parent(id).map(|parent| tree.host(parent).unwrap_or(parent));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_classes_replace_previous() {
        let mut tree = DomTree::new();
        let host = tree.create_element("x-foo");
        tree.set_attribute(host, "class", "card");
        set_scope_selector(&mut tree, host, "x-foo-1", None);
        assert_eq!(tree.get_attribute(host, "class"), Some("card x-scope x-foo-1"));
        set_scope_selector(&mut tree, host, "x-foo-2", Some("x-foo-1"));
        assert_eq!(tree.get_attribute(host, "class"), Some("card x-scope x-foo-2"));
    }

    #[test]
    fn test_inline_properties() {
        let mut tree = DomTree::new();
        let host = tree.create_element("x-foo");
        tree.set_attribute(host, "style", "color: red");
        set_inline_property(&mut tree, host, "--gap", "4px");
        set_inline_property(&mut tree, host, "--gap", "8px");
        assert_eq!(tree.get_attribute(host, "style"), Some("color: red; --gap: 8px;"));
        remove_inline_property(&mut tree, host, "color");
        remove_inline_property(&mut tree, host, "--gap");
        assert_eq!(tree.get_attribute(host, "style"), None);
    }
}
