//! Integration tests for selector matching across shadow-root boundaries.

use umbra_css::parse_selector;
use umbra_dom::{DomTree, NodeId};

/// `html > body > x-outer#outer.card` with a shadow root holding
/// `div.wrap > x-inner[kind=big]`.
struct Scene {
    tree: DomTree,
    body: NodeId,
    outer: NodeId,
    wrap: NodeId,
    inner: NodeId,
}

fn element(tree: &mut DomTree, parent: NodeId, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
    let id = tree.create_element(tag);
    for (name, value) in attrs {
        tree.set_attribute(id, name, *value);
    }
    tree.append_child(parent, id);
    id
}

fn scene() -> Scene {
    let mut tree = DomTree::new();
    let html = element(&mut tree, NodeId::ROOT, "html", &[]);
    let body = element(&mut tree, html, "body", &[]);
    let outer = element(&mut tree, body, "x-outer", &[("id", "outer"), ("class", "card")]);
    let shadow = tree.attach_shadow(outer).unwrap();
    let wrap = element(&mut tree, shadow, "div", &[("class", "wrap")]);
    let inner = element(&mut tree, wrap, "x-inner", &[("kind", "big")]);
    Scene {
        tree,
        body,
        outer,
        wrap,
        inner,
    }
}

fn matches(selector: &str, tree: &DomTree, node: NodeId) -> bool {
    parse_selector(selector).unwrap().matches(tree, node)
}

#[test]
fn test_simple_selectors() {
    let s = scene();
    assert!(matches("x-outer#outer.card", &s.tree, s.outer));
    assert!(matches("[kind=big]", &s.tree, s.inner));
    assert!(matches("[kind^=b]", &s.tree, s.inner));
    assert!(!matches("[kind=small]", &s.tree, s.inner));
    assert!(matches("x-inner:not(.wrap)", &s.tree, s.inner));
    assert!(matches(":root", &s.tree, s.tree.document_element().unwrap()));
}

#[test]
fn test_combinators_inside_shadow_tree() {
    let s = scene();
    assert!(matches(".wrap > x-inner", &s.tree, s.inner));
    assert!(matches("div x-inner", &s.tree, s.inner));
    assert!(!matches("body x-inner", &s.tree, s.inner));
}

#[test]
fn test_host_crossing() {
    let s = scene();
    assert!(matches(":host .wrap", &s.tree, s.wrap));
    assert!(matches(":host(.card) > .wrap", &s.tree, s.wrap));
    assert!(!matches(":host(.other) > .wrap", &s.tree, s.wrap));
    // The host is featureless from inside: plain selectors never see it.
    assert!(!matches("x-outer .wrap", &s.tree, s.wrap));
}

#[test]
fn test_matches_host() {
    let s = scene();
    assert!(parse_selector(":host").unwrap().matches_host(&s.tree, s.outer));
    assert!(parse_selector(":host(#outer)").unwrap().matches_host(&s.tree, s.outer));
    assert!(!parse_selector(":host(.nope)").unwrap().matches_host(&s.tree, s.outer));
    assert!(!parse_selector(":host .wrap").unwrap().matches_host(&s.tree, s.outer));
    assert!(!parse_selector(":host").unwrap().matches(&s.tree, s.body));
}

#[test]
fn test_sibling_combinators() {
    let mut tree = DomTree::new();
    let list = element(&mut tree, NodeId::ROOT, "ul", &[]);
    let first = element(&mut tree, list, "li", &[("class", "first")]);
    let _ = tree.create_text("gap");
    let second = element(&mut tree, list, "li", &[]);
    let third = element(&mut tree, list, "li", &[]);
    assert!(matches(".first + li", &tree, second));
    assert!(!matches(".first + li", &tree, third));
    assert!(matches(".first ~ li", &tree, third));
    assert!(!matches(".first ~ li", &tree, first));
}
