//! Integration tests for document-level styles and their validation passes.

use umbra_dom::{DomTree, NodeId};
use umbra_style::tree::find_scoped_style;
use umbra_style::{OverrideMap, StyleEngine, StyleProvider, StyleSettings};

struct Page {
    tree: DomTree,
    head: NodeId,
    body: NodeId,
    engine: StyleEngine,
}

fn page(settings: StyleSettings) -> Page {
    let mut tree = DomTree::new();
    let html = tree.create_element("html");
    tree.append_child(NodeId::ROOT, html);
    let head = tree.create_element("head");
    tree.append_child(html, head);
    let body = tree.create_element("body");
    tree.append_child(html, body);
    let engine = StyleEngine::new(&mut tree, settings);
    Page {
        tree,
        head,
        body,
        engine,
    }
}

fn style(tree: &mut DomTree, parent: NodeId, css: &str) -> NodeId {
    let style = tree.create_element("style");
    tree.set_text_content(style, css);
    tree.append_child(parent, style);
    style
}

fn host(tree: &mut DomTree, parent: NodeId, tag: &str) -> NodeId {
    let id = tree.create_element(tag);
    tree.append_child(parent, id);
    let _ = tree.attach_shadow(id).unwrap();
    id
}

fn document_value(page: &Page, name: &str) -> Option<String> {
    let html = page.engine.document_owner();
    page.engine.get_computed_style_value(&page.tree, html, name)
}

#[test]
fn test_batched_registrations_validate_once() {
    let mut p = page(StyleSettings::default());
    let first = style(&mut p.tree, p.head, "html { --a: 1px; }");
    let second = style(&mut p.tree, p.head, ":root { --b: 2px; }");

    assert!(p.engine.add_custom_style(StyleProvider::Style(first)));
    assert!(p.engine.add_custom_style(StyleProvider::Style(second)));
    assert!(!p.engine.add_custom_style(StyleProvider::Style(first)));
    assert_eq!(p.engine.validation_passes(), 0);

    assert!(p.engine.validate_document(&mut p.tree));
    assert!(!p.engine.validate_document(&mut p.tree));
    assert_eq!(p.engine.validation_passes(), 1);
    assert_eq!(document_value(&p, "--a").as_deref(), Some("1px"));
    assert_eq!(document_value(&p, "--b").as_deref(), Some("2px"));
}

#[test]
fn test_document_rules_stay_out_of_components() {
    let mut p = page(StyleSettings::default());
    let sheet = style(&mut p.tree, p.head, ":root { --a: 3px; } p { margin: var(--a); }");
    let _ = p.engine.add_custom_style(StyleProvider::Style(sheet));
    let _ = p.engine.validate_document(&mut p.tree);

    assert_eq!(p.tree.text_content(sheet), "p:not(.style-scope) {\n  margin: 3px;\n}\n");
}

#[test]
fn test_document_properties_reach_components() {
    let mut p = page(StyleSettings::default());
    let sheet = style(&mut p.tree, p.head, "html { --x: navy; } x-leaf { --y: 1em; }");
    let _ = p.engine.add_custom_style(StyleProvider::Style(sheet));
    let _ = p.engine.prepare_template(&mut p.tree, "x-leaf", None, ".t { color: var(--x); font-size: var(--y); }", None);
    let leaf = host(&mut p.tree, p.body, "x-leaf");

    p.engine.apply_style(&mut p.tree, leaf, None);

    assert_eq!(p.engine.validation_passes(), 1);
    assert_eq!(p.engine.get_computed_style_value(&p.tree, leaf, "--x").as_deref(), Some("navy"));
    assert_eq!(p.engine.get_computed_style_value(&p.tree, leaf, "--y").as_deref(), Some("1em"));
    let generated = find_scoped_style(&p.tree, p.head, "x-leaf-1").unwrap();
    assert!(p.tree.text_content(generated).contains("color: navy;"));
}

#[test]
fn test_update_styles_cascades_from_document() {
    let mut p = page(StyleSettings::default());
    let _ = p.engine.prepare_template(&mut p.tree, "x-leaf", None, ".t { color: var(--x); }", None);
    let outer = host(&mut p.tree, p.body, "x-leaf");
    let shadow = p.tree.shadow_root(outer).unwrap();
    let inner = host(&mut p.tree, shadow, "x-leaf");
    p.engine.apply_style(&mut p.tree, outer, None);

    let update: OverrideMap = [("--x".to_string(), "olive".into())].into_iter().collect();
    p.engine.update_styles(&mut p.tree, &update);

    assert_eq!(p.engine.get_computed_style_value(&p.tree, inner, "--x").as_deref(), Some("olive"));
    assert_eq!(
        p.engine.style_info(inner).unwrap().scope_selector,
        p.engine.style_info(outer).unwrap().scope_selector
    );
}

#[test]
fn test_late_document_style_restyles_applied_elements() {
    let mut p = page(StyleSettings::default());
    let _ = p.engine.prepare_template(&mut p.tree, "x-leaf", None, ".t { color: var(--x, gray); }", None);
    let leaf = host(&mut p.tree, p.body, "x-leaf");
    p.engine.apply_style(&mut p.tree, leaf, None);
    assert_eq!(p.engine.get_computed_style_value(&p.tree, leaf, "--x"), None);

    let sheet = style(&mut p.tree, p.head, "html { --x: plum; }");
    let _ = p.engine.add_custom_style(StyleProvider::Style(sheet));
    assert!(p.engine.validate_document(&mut p.tree));

    assert_eq!(p.engine.get_computed_style_value(&p.tree, leaf, "--x").as_deref(), Some("plum"));
    assert_eq!(p.engine.style_info(leaf).unwrap().scope_selector.as_deref(), Some("x-leaf-2"));
}

#[test]
fn test_watched_document_picks_up_new_styles() {
    let mut p = page(StyleSettings::default());
    let _ = style(&mut p.tree, p.head, "html { --a: 1px; }");
    p.engine.watch_main_document_styles(&mut p.tree);
    assert!(p.engine.validate_document(&mut p.tree));
    assert_eq!(document_value(&p, "--a").as_deref(), Some("1px"));

    let wrapper = p.tree.create_element("div");
    let _ = style(&mut p.tree, wrapper, "html { --b: 2px; }");
    let scoped = style(&mut p.tree, wrapper, "html { --c: 3px; }");
    p.tree.set_attribute(scoped, "scope", "x-elsewhere");
    p.tree.append_child(p.body, wrapper);
    assert!(p.engine.validate_document(&mut p.tree));

    assert_eq!(document_value(&p, "--b").as_deref(), Some("2px"));
    assert_eq!(document_value(&p, "--c"), None);
}

#[test]
fn test_shadow_tree_styles_are_not_document_styles() {
    let mut p = page(StyleSettings::default());
    p.engine.watch_main_document_styles(&mut p.tree);
    let component = host(&mut p.tree, p.body, "x-a");
    let shadow = p.tree.shadow_root(component).unwrap();
    let inner_css = ".inner { --x: red; color: blue; }";
    let inner = style(&mut p.tree, shadow, inner_css);
    let _ = style(&mut p.tree, p.body, "html { --y: 1px; }");

    assert!(p.engine.validate_document(&mut p.tree));
    assert_eq!(p.tree.text_content(inner), inner_css);
    assert_eq!(document_value(&p, "--x"), None);
    assert_eq!(document_value(&p, "--y").as_deref(), Some("1px"));
}

#[test]
fn test_wrapper_provider_resolves_lazily() {
    let mut p = page(StyleSettings::default());
    let wrapper = p.tree.create_element("custom-style");
    p.tree.append_child(p.body, wrapper);
    let _ = p.engine.add_custom_style(StyleProvider::Wrapper(wrapper));
    let _ = style(&mut p.tree, wrapper, "html { --late: 5px; }");

    assert!(p.engine.validate_document(&mut p.tree));
    assert_eq!(document_value(&p, "--late").as_deref(), Some("5px"));
}

#[test]
fn test_reset_retransforms_from_original_text() {
    let mut p = page(StyleSettings::default());
    let sheet = style(&mut p.tree, p.head, ":root { --a: 1px; } p { margin: var(--a); }");
    let _ = p.engine.add_custom_style(StyleProvider::Style(sheet));
    let _ = p.engine.validate_document(&mut p.tree);

    p.engine.reset_cached_styles();
    assert!(p.engine.validate_document(&mut p.tree));
    assert_eq!(p.engine.validation_passes(), 2);
    assert_eq!(p.tree.text_content(sheet), "p:not(.style-scope) {\n  margin: 1px;\n}\n");
    assert_eq!(document_value(&p, "--a").as_deref(), Some("1px"));
}

#[test]
fn test_native_css_document_mixins() {
    let settings = StyleSettings {
        native_css: true,
        ..StyleSettings::default()
    };
    let mut p = page(settings);
    let sheet = style(&mut p.tree, p.head, "html { --card: { padding: 4px; }; } .card { @apply --card; }");
    let _ = p.engine.add_custom_style(StyleProvider::Style(sheet));
    assert!(p.engine.validate_document(&mut p.tree));

    let css = p.tree.text_content(sheet);
    assert!(css.contains("--card_-_padding: 4px;"));
    assert!(css.contains(".card:not(.style-scope) {\n  padding: var(--card_-_padding);\n}"));
}
