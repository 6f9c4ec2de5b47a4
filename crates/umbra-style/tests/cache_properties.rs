//! Property tests for generated-style reuse.

use quickcheck::TestResult;
use quickcheck_macros::quickcheck;
use umbra_dom::{DomTree, NodeId};
use umbra_style::{OverrideMap, StyleEngine, StyleSettings};

/// A document with two `x-swatch` hosts, both prepared and unstyled.
fn swatches() -> (DomTree, StyleEngine, NodeId, NodeId) {
    let mut tree = DomTree::new();
    let html = tree.create_element("html");
    tree.append_child(NodeId::ROOT, html);
    let body = tree.create_element("body");
    tree.append_child(html, body);
    let mut engine = StyleEngine::new(&mut tree, StyleSettings::default());
    let _ = engine.prepare_template(&mut tree, "x-swatch", None, ".fill { background: var(--fill); }", None);
    let mut hosts = [NodeId::ROOT; 2];
    for slot in &mut hosts {
        let host = tree.create_element("x-swatch");
        tree.append_child(body, host);
        let _ = tree.attach_shadow(host).unwrap();
        *slot = host;
    }
    (tree, engine, hosts[0], hosts[1])
}

fn props(fill: u8, unrelated: &str) -> OverrideMap {
    [
        ("--fill".to_string(), format!("#{fill:02x}").into()),
        ("--unrelated".to_string(), unrelated.into()),
    ]
    .into_iter()
    .collect()
}

fn scope(engine: &StyleEngine, node: NodeId) -> String {
    engine
        .style_info(node)
        .and_then(|info| info.scope_selector.clone())
        .unwrap_or_default()
}

#[quickcheck]
fn prop_equal_own_values_share_style(fill: u8, unrelated_a: String, unrelated_b: String) -> bool {
    let (mut tree, mut engine, a, b) = swatches();
    engine.apply_style(&mut tree, a, Some(&props(fill, &unrelated_a)));
    engine.apply_style(&mut tree, b, Some(&props(fill, &unrelated_b)));
    scope(&engine, a) == scope(&engine, b) && engine.cache().entry_count("x-swatch") == 1
}

#[quickcheck]
fn prop_distinct_own_values_get_distinct_tokens(fill_a: u8, fill_b: u8) -> TestResult {
    if fill_a == fill_b {
        return TestResult::discard();
    }
    let (mut tree, mut engine, a, b) = swatches();
    engine.apply_style(&mut tree, a, Some(&props(fill_a, "")));
    engine.apply_style(&mut tree, b, Some(&props(fill_b, "")));
    TestResult::from_bool(
        scope(&engine, a) == "x-swatch-1" && scope(&engine, b) == "x-swatch-2",
    )
}
