//! Integration tests for preparing element types and styling instances.

use std::num::NonZeroUsize;

use umbra_dom::{DomTree, NodeId};
use umbra_style::tree::find_scoped_style;
use umbra_style::{OverrideMap, OverrideValue, StyleEngine, StyleSettings};

const PARENT_CSS: &str = ":host { --x: red; } .frame { border-color: var(--x); }";
const LEAF_CSS: &str = ".label { color: var(--x); }";
const CARD_CSS: &str = ".title { color: var(--tone); }";

/// `html > (head, body)` and an engine over it.
fn document(settings: StyleSettings) -> (DomTree, NodeId, StyleEngine) {
    let mut tree = DomTree::new();
    let html = tree.create_element("html");
    tree.append_child(NodeId::ROOT, html);
    let head = tree.create_element("head");
    tree.append_child(html, head);
    let body = tree.create_element("body");
    tree.append_child(html, body);
    let engine = StyleEngine::new(&mut tree, settings);
    (tree, body, engine)
}

/// A `tag` element under `parent` with an empty shadow root.
fn host(tree: &mut DomTree, parent: NodeId, tag: &str) -> NodeId {
    let id = tree.create_element(tag);
    tree.append_child(parent, id);
    let _ = tree.attach_shadow(id).unwrap();
    id
}

fn overrides(pairs: &[(&str, OverrideValue)]) -> OverrideMap {
    pairs.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect()
}

fn scope_of(engine: &StyleEngine, node: NodeId) -> Option<String> {
    engine.style_info(node).and_then(|info| info.scope_selector.clone())
}

fn value(engine: &StyleEngine, tree: &DomTree, node: NodeId, name: &str) -> Option<String> {
    engine.get_computed_style_value(tree, node, name)
}

fn head_style(tree: &DomTree, scope: &str) -> Option<String> {
    let head = tree.head().unwrap();
    find_scoped_style(tree, head, scope).map(|style| tree.text_content(style))
}

#[test]
fn test_prepare_is_idempotent() {
    let (mut tree, _, mut engine) = document(StyleSettings::default());
    assert!(engine.prepare_template(&mut tree, "x-parent", None, PARENT_CSS, None));
    let own_before = engine.element_type("x-parent").unwrap().own_property_names.clone();
    assert_eq!(&*own_before, ["--x".to_string()]);

    assert!(!engine.prepare_template(&mut tree, "x-parent", None, ".other { color: var(--y); }", None));
    let entry = engine.element_type("x-parent").unwrap();
    assert_eq!(entry.own_property_names, own_before);
    assert_eq!(entry.source.style_rules().len(), 2);
}

#[test]
fn test_static_style_for_types_without_properties() {
    let (mut tree, _, mut engine) = document(StyleSettings::default());
    let _ = engine.prepare_template(&mut tree, "x-plain", None, ":host { display: block; } p { margin: 0; }", None);
    let css = head_style(&tree, "x-plain").unwrap();
    assert!(css.contains("x-plain {"));
    assert!(css.contains("p.x-plain {"));
    assert!(engine.element_type("x-plain").unwrap().element_style.is_some());

    let _ = engine.prepare_template(&mut tree, "x-vars", None, LEAF_CSS, None);
    assert!(head_style(&tree, "x-vars").is_none());
}

#[test]
fn test_cascade_inheritance_through_shadow_boundary() {
    let (mut tree, body, mut engine) = document(StyleSettings::default());
    let _ = engine.prepare_template(&mut tree, "x-parent", None, PARENT_CSS, None);
    let _ = engine.prepare_template(&mut tree, "x-leaf", None, LEAF_CSS, None);
    let parent = host(&mut tree, body, "x-parent");
    let shadow = tree.shadow_root(parent).unwrap();
    let leaf = host(&mut tree, shadow, "x-leaf");

    engine.apply_style(&mut tree, parent, None);

    assert_eq!(value(&engine, &tree, parent, "--x").as_deref(), Some("red"));
    assert_eq!(value(&engine, &tree, leaf, "--x").as_deref(), Some("red"));
    assert_eq!(scope_of(&engine, leaf).as_deref(), Some("x-leaf-1"));
    assert_eq!(tree.get_attribute(leaf, "class"), Some("x-scope x-leaf-1"));

    let css = head_style(&tree, "x-leaf-1").unwrap();
    assert!(css.contains(".x-leaf-1 .label.x-leaf {"));
    assert!(css.contains("color: red;"));
    assert!(!css.contains("--x"));
}

#[test]
fn test_falsy_but_present_overrides() {
    let (mut tree, body, mut engine) = document(StyleSettings::default());
    let _ = engine.prepare_template(&mut tree, "x-parent", None, PARENT_CSS, None);
    let _ = engine.prepare_template(&mut tree, "x-leaf", None, LEAF_CSS, None);
    let parent = host(&mut tree, body, "x-parent");
    let shadow = tree.shadow_root(parent).unwrap();
    let leaf = host(&mut tree, shadow, "x-leaf");
    engine.apply_style(&mut tree, parent, None);

    engine.apply_style(&mut tree, leaf, Some(&overrides(&[("--x", OverrideValue::Number(0.0))])));
    assert_eq!(value(&engine, &tree, leaf, "--x").as_deref(), Some("0"));

    engine.apply_style(&mut tree, leaf, Some(&overrides(&[("--x", OverrideValue::Null)])));
    assert_eq!(value(&engine, &tree, leaf, "--x").as_deref(), Some("red"));

    engine.apply_style(&mut tree, leaf, Some(&overrides(&[("--x", OverrideValue::from(""))])));
    assert_eq!(value(&engine, &tree, leaf, "--x").as_deref(), Some("red"));
}

#[test]
fn test_update_propagates_top_down_in_one_pass() {
    let (mut tree, body, mut engine) = document(StyleSettings::default());
    let _ = engine.prepare_template(&mut tree, "x-root", None, ":host { --x: green; }", None);
    let _ = engine.prepare_template(&mut tree, "x-leaf", None, LEAF_CSS, None);
    let root = host(&mut tree, body, "x-root");
    let root_shadow = tree.shadow_root(root).unwrap();
    let c1 = host(&mut tree, root_shadow, "x-leaf");
    let c2 = host(&mut tree, root_shadow, "x-leaf");
    let c1_shadow = tree.shadow_root(c1).unwrap();
    let wrapper = tree.create_element("div");
    tree.append_child(c1_shadow, wrapper);
    let g = host(&mut tree, wrapper, "x-leaf");

    engine.apply_style(&mut tree, root, None);
    assert_eq!(value(&engine, &tree, g, "--x").as_deref(), Some("green"));

    engine.apply_style(&mut tree, root, Some(&overrides(&[("--x", "blue".into())])));
    for node in [root, c1, c2, g] {
        assert_eq!(value(&engine, &tree, node, "--x").as_deref(), Some("blue"));
    }
    // Every leaf resolved to the same own values, so they share one style.
    assert_eq!(scope_of(&engine, c1).as_deref(), Some("x-leaf-2"));
    assert_eq!(scope_of(&engine, c2), scope_of(&engine, c1));
    assert_eq!(scope_of(&engine, g), scope_of(&engine, c1));
    assert_eq!(engine.cache().entry_count("x-leaf"), 2);
}

#[test]
fn test_scope_tokens_follow_first_appearance() {
    let (mut tree, body, mut engine) = document(StyleSettings::default());
    let _ = engine.prepare_template(&mut tree, "my-card", None, CARD_CSS, None);
    let cards: Vec<NodeId> = (0..3).map(|_| host(&mut tree, body, "my-card")).collect();

    for (card, tone) in cards.iter().zip(["red", "blue", "green"]) {
        engine.apply_style(&mut tree, *card, Some(&overrides(&[("--tone", tone.into())])));
    }
    assert_eq!(scope_of(&engine, cards[0]).as_deref(), Some("my-card-1"));
    assert_eq!(scope_of(&engine, cards[1]).as_deref(), Some("my-card-2"));
    assert_eq!(scope_of(&engine, cards[2]).as_deref(), Some("my-card-3"));

    engine.apply_style(&mut tree, cards[2], Some(&overrides(&[("--tone", "red".into())])));
    assert_eq!(scope_of(&engine, cards[2]).as_deref(), Some("my-card-1"));
    assert_eq!(tree.get_attribute(cards[2], "class"), Some("x-scope my-card-1"));
    assert_eq!(engine.cache().entry_count("my-card"), 3);
}

#[test]
fn test_cache_ignores_properties_outside_own_names() {
    let (mut tree, body, mut engine) = document(StyleSettings::default());
    let _ = engine.prepare_template(&mut tree, "my-card", None, CARD_CSS, None);
    let a = host(&mut tree, body, "my-card");
    let b = host(&mut tree, body, "my-card");

    engine.apply_style(&mut tree, a, Some(&overrides(&[("--tone", "red".into())])));
    engine.apply_style(
        &mut tree,
        b,
        Some(&overrides(&[("--tone", "red".into()), ("--unrelated", "9px".into())])),
    );
    assert_eq!(scope_of(&engine, b).as_deref(), Some("my-card-1"));
    assert_eq!(engine.cache().entry_count("my-card"), 1);
}

#[test]
fn test_bounded_cache_evicts_oldest() {
    let settings = StyleSettings {
        cache_type_max: NonZeroUsize::new(2),
        ..StyleSettings::default()
    };
    let (mut tree, body, mut engine) = document(settings);
    let _ = engine.prepare_template(&mut tree, "my-card", None, CARD_CSS, None);
    let card = host(&mut tree, body, "my-card");

    for tone in ["red", "blue", "green"] {
        engine.apply_style(&mut tree, card, Some(&overrides(&[("--tone", tone.into())])));
    }
    assert_eq!(engine.cache().entry_count("my-card"), 2);

    engine.apply_style(&mut tree, card, Some(&overrides(&[("--tone", "red".into())])));
    assert_eq!(scope_of(&engine, card).as_deref(), Some("my-card-4"));
    engine.apply_style(&mut tree, card, Some(&overrides(&[("--tone", "green".into())])));
    assert_eq!(scope_of(&engine, card).as_deref(), Some("my-card-3"));
}

#[test]
fn test_unprepared_type_inherits_only() {
    let (mut tree, body, mut engine) = document(StyleSettings::default());
    let _ = engine.prepare_template(&mut tree, "x-parent", None, PARENT_CSS, None);
    let parent = host(&mut tree, body, "x-parent");
    let shadow = tree.shadow_root(parent).unwrap();
    let stranger = host(&mut tree, shadow, "x-stranger");

    engine.apply_style(&mut tree, parent, None);

    let info = engine.style_info(stranger).unwrap();
    assert!(info.style_rules.is_none());
    assert!(info.scope_selector.is_none());
    assert_eq!(value(&engine, &tree, stranger, "--x").as_deref(), Some("red"));
}

#[test]
fn test_native_shadow_keeps_styles_in_shadow_root() {
    let settings = StyleSettings {
        native_shadow: true,
        ..StyleSettings::default()
    };
    let (mut tree, body, mut engine) = document(settings);
    let _ = engine.prepare_template(&mut tree, "x-parent", None, PARENT_CSS, None);
    let parent = host(&mut tree, body, "x-parent");
    engine.apply_style(&mut tree, parent, None);

    let shadow = tree.shadow_root(parent).unwrap();
    let style = find_scoped_style(&tree, shadow, "x-parent-1").unwrap();
    assert_eq!(tree.text_content(style), ".frame {\n  border-color: red;\n}\n");
    assert_eq!(tree.get_attribute(parent, "class"), None);
    assert!(head_style(&tree, "x-parent-1").is_none());
}

#[test]
fn test_type_extension_host_selector() {
    let (mut tree, body, mut engine) = document(StyleSettings::default());
    let css = ":host { --pad: 2px; } :host(.wide) { padding: var(--pad); }";
    let _ = engine.prepare_template(&mut tree, "x-btn", Some("button"), css, None);
    let button = tree.create_element("button");
    tree.set_attribute(button, "is", "x-btn");
    tree.set_attribute(button, "class", "wide");
    tree.append_child(body, button);
    let _ = tree.attach_shadow(button).unwrap();

    engine.apply_style(&mut tree, button, None);
    let css = head_style(&tree, "x-btn-1").unwrap();
    assert!(css.contains(".x-btn-1.wide {"));
    assert!(css.contains("padding: 2px;"));
    assert_eq!(tree.get_attribute(button, "class"), Some("wide x-scope x-btn-1"));
}

#[test]
fn test_native_css_writes_inline_overrides() {
    let settings = StyleSettings {
        native_css: true,
        native_css_apply: true,
        ..StyleSettings::default()
    };
    let (mut tree, body, mut engine) = document(settings);
    let _ = engine.prepare_template(&mut tree, "x-leaf", None, LEAF_CSS, None);
    assert!(head_style(&tree, "x-leaf").unwrap().contains("var(--x)"));

    let leaf = host(&mut tree, body, "x-leaf");
    let shadow = tree.shadow_root(leaf).unwrap();
    let label = tree.create_element("span");
    tree.append_child(shadow, label);

    engine.apply_style(
        &mut tree,
        leaf,
        Some(&overrides(&[("--x", "teal".into()), ("--n", OverrideValue::Number(0.0))])),
    );
    assert_eq!(tree.get_attribute(leaf, "style"), Some("--n: 0; --x: teal;"));
    assert!(engine.style_info(leaf).unwrap().scope_selector.is_none());
    assert_eq!(value(&engine, &tree, label, "--x").as_deref(), Some("teal"));

    engine.apply_style(&mut tree, leaf, Some(&overrides(&[("--x", OverrideValue::Null)])));
    assert_eq!(tree.get_attribute(leaf, "style"), Some("--n: 0;"));
    assert_eq!(value(&engine, &tree, label, "--x"), None);
}

#[test]
fn test_mixin_growth_reexpands_dependants() {
    let settings = StyleSettings {
        native_css: true,
        ..StyleSettings::default()
    };
    let (mut tree, body, mut engine) = document(settings);
    let _ = engine.prepare_template(&mut tree, "x-user", None, ".t { @apply --theme; }", None);
    assert!(!head_style(&tree, "x-user").unwrap().contains("--theme_-_"));

    let provider_css = ":host { --theme: { color: red; background: blue; }; }";
    let _ = engine.prepare_template(&mut tree, "x-provider", None, provider_css, None);
    assert!(engine.element_type("x-user").unwrap().invalid);
    assert!(head_style(&tree, "x-provider").unwrap().contains("--theme_-_color: red;"));

    let user = host(&mut tree, body, "x-user");
    engine.apply_style(&mut tree, user, None);
    let entry = engine.element_type("x-user").unwrap();
    assert!(!entry.invalid);
    let css = head_style(&tree, "x-user").unwrap();
    assert!(css.contains("color: var(--theme_-_color);"));
    assert!(css.contains("background: var(--theme_-_background);"));
}

#[test]
fn test_mixin_growth_refreshes_native_shadow_copies() {
    let settings = StyleSettings {
        native_css: true,
        native_shadow: true,
        ..StyleSettings::default()
    };
    let (mut tree, body, mut engine) = document(settings);
    let _ = engine.prepare_template(&mut tree, "x-user", None, ".t { @apply --theme; }", None);
    let users = [host(&mut tree, body, "x-user"), host(&mut tree, body, "x-user")];
    for user in users {
        engine.apply_style(&mut tree, user, None);
    }
    let shadow_css = |tree: &DomTree, user: NodeId| {
        let shadow = tree.shadow_root(user).unwrap();
        tree.text_content(find_scoped_style(tree, shadow, "x-user").unwrap())
    };
    assert!(!shadow_css(&tree, users[0]).contains("--theme_-_"));

    let provider_css = ":host { --theme: { color: red; }; }";
    let _ = engine.prepare_template(&mut tree, "x-provider", None, provider_css, None);
    for user in users {
        engine.apply_style(&mut tree, user, None);
    }
    for user in users {
        assert!(shadow_css(&tree, user).contains("color: var(--theme_-_color);"));
    }
    assert!(head_style(&tree, "x-user").is_none());
}

#[test]
fn test_forget_host_drops_record() {
    let (mut tree, body, mut engine) = document(StyleSettings::default());
    let _ = engine.prepare_template(&mut tree, "my-card", None, CARD_CSS, None);
    let card = host(&mut tree, body, "my-card");
    engine.style_element(&mut tree, card);
    assert!(engine.style_info(card).is_some());

    engine.forget_host(card);
    assert!(engine.style_info(card).is_none());
    assert_eq!(engine.rule_sets().instances_of("my-card").count(), 0);
}
