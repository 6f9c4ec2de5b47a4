//! Scene files: element types, document styles, a tree and updates, as JSON.

use std::collections::BTreeMap;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use umbra_css::CssBuild;
use umbra_dom::{DomTree, NodeId};
use umbra_style::{OverrideMap, StyleEngine, StyleSettings};

/// A whole scene.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Scene {
    /// Environment capabilities.
    #[serde(default)]
    pub settings: StyleSettings,
    /// Element types, prepared in order.
    #[serde(default)]
    pub elements: Vec<ElementDef>,
    /// Css of the document-level `<style>` elements in the head.
    #[serde(default)]
    pub document_styles: Vec<String>,
    /// Children of `<body>`.
    #[serde(default)]
    pub tree: Vec<SceneNode>,
    /// Overrides applied after the first styling pass.
    #[serde(default)]
    pub updates: Vec<Update>,
}

/// One element type and its css.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ElementDef {
    /// Custom element name.
    pub name: String,
    /// Built-in element this type extends.
    #[serde(default)]
    pub extends: Option<String>,
    /// `shady` or `shadow` for pre-built styles.
    #[serde(default)]
    pub css_build: Option<String>,
    /// The element type's css text.
    pub css: String,
}

/// An element, its light children and optionally a shadow tree.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SceneNode {
    /// Local name.
    pub tag: String,
    /// Id, also used as an update target.
    #[serde(default)]
    pub id: Option<String>,
    /// Other attributes.
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
    /// Shadow tree content; present means the element is a host.
    #[serde(default)]
    pub shadow: Option<Vec<SceneNode>>,
    /// Light children.
    #[serde(default)]
    pub children: Vec<SceneNode>,
}

/// Overrides for one element by id, or for the whole document.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Update {
    /// Element id; absent means the document.
    #[serde(default)]
    pub target: Option<String>,
    /// Custom properties to override.
    pub properties: OverrideMap,
}

/// The scene after it has been styled.
pub struct Styled {
    /// The styled tree.
    pub tree: DomTree,
    /// The engine that styled it.
    pub engine: StyleEngine,
    /// The document head, where shady-mode styles are attached.
    pub head: NodeId,
}

impl Scene {
    /// Parse a scene from JSON.
    ///
    /// # Errors
    /// Fails on malformed JSON or unknown keys.
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("invalid scene")
    }

    /// Build the tree, prepare every element type, style the document and
    /// run the updates in order.
    ///
    /// # Errors
    /// Fails on a bad `css-build` value, a duplicate id or an update that
    /// targets an unknown id.
    pub fn run(self) -> Result<Styled> {
        let mut tree = DomTree::new();
        let html = tree.create_element("html");
        tree.append_child(tree.root(), html);
        let head = tree.create_element("head");
        tree.append_child(html, head);
        let body = tree.create_element("body");
        tree.append_child(html, body);
        for css in &self.document_styles {
            let style = tree.create_element("style");
            tree.set_text_content(style, css);
            tree.append_child(head, style);
        }

        let mut engine = StyleEngine::new(&mut tree, self.settings);
        engine.watch_main_document_styles(&mut tree);
        for element in &self.elements {
            let css_build = element
                .css_build
                .as_deref()
                .map(str::parse::<CssBuild>)
                .transpose()
                .with_context(|| format!("bad css-build for <{}>", element.name))?;
            let _ = engine.prepare_template(
                &mut tree,
                &element.name,
                element.extends.as_deref(),
                &element.css,
                css_build,
            );
        }

        let mut ids = BTreeMap::new();
        for node in &self.tree {
            build(&mut tree, body, node, &mut ids)?;
        }
        let _ = engine.validate_document(&mut tree);
        engine.style_element(&mut tree, engine.document_owner());

        for update in &self.updates {
            match &update.target {
                None => engine.update_styles(&mut tree, &update.properties),
                Some(id) => {
                    let Some(&node) = ids.get(id) else {
                        bail!("update targets unknown id `{id}`");
                    };
                    engine.apply_style(&mut tree, node, Some(&update.properties));
                }
            }
            tracing::info!(on = update.target.as_deref().unwrap_or("document"), "update applied");
        }
        Ok(Styled { tree, engine, head })
    }
}

fn build(tree: &mut DomTree, parent: NodeId, node: &SceneNode, ids: &mut BTreeMap<String, NodeId>) -> Result<()> {
    let element = tree.create_element(&node.tag);
    for (name, value) in &node.attrs {
        tree.set_attribute(element, name, value.as_str());
    }
    if let Some(id) = &node.id {
        tree.set_attribute(element, "id", id.as_str());
        if ids.insert(id.clone(), element).is_some() {
            bail!("duplicate id `{id}`");
        }
    }
    tree.append_child(parent, element);
    if let Some(shadow) = &node.shadow {
        let root = tree.attach_shadow(element)?;
        for child in shadow {
            build(tree, root, child, ids)?;
        }
    }
    for child in &node.children {
        build(tree, element, child, ids)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(json: &str) -> Result<Styled> {
        Scene::parse(json)?.run()
    }

    fn error_text(json: &str) -> String {
        run(json).err().map(|e| format!("{e:#}")).unwrap_or_default()
    }

    #[test]
    fn test_scene_styles_and_updates() {
        let styled = run(r#"{
            "elements": [{ "name": "x-card", "css": ".t { color: var(--tone); }" }],
            "document-styles": ["html { --tone: navy; }"],
            "tree": [{ "tag": "x-card", "id": "a", "shadow": [] }, { "tag": "x-card", "id": "b", "shadow": [] }],
            "updates": [{ "target": "b", "properties": { "--tone": "red" } }]
        }"#)
        .unwrap();
        let body = styled.tree.head().and_then(|head| styled.tree.next_sibling(head)).unwrap();
        let cards = styled.tree.element_children(body);
        let scope = |node| styled.engine.style_info(node).and_then(|info| info.scope_selector.clone());
        assert_eq!(scope(cards[0]).as_deref(), Some("x-card-1"));
        assert_eq!(scope(cards[1]).as_deref(), Some("x-card-2"));
        assert_eq!(styled.engine.validation_passes(), 1);
    }

    #[test]
    fn test_unknown_scene_key_rejected() {
        assert!(Scene::parse(r#"{ "nodes": [] }"#).is_err());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let err = error_text(r#"{ "tree": [{ "tag": "div", "id": "a" }, { "tag": "p", "id": "a" }] }"#);
        assert!(err.contains("duplicate id `a`"), "{err}");
    }

    #[test]
    fn test_unknown_update_target_rejected() {
        let err = error_text(r#"{ "updates": [{ "target": "nope", "properties": {} }] }"#);
        assert!(err.contains("unknown id `nope`"), "{err}");
    }

    #[test]
    fn test_bad_css_build_rejected() {
        let err = error_text(r#"{ "elements": [{ "name": "x-a", "css-build": "flat", "css": "" }] }"#);
        assert!(err.contains("bad css-build for <x-a>"), "{err}");
    }
}
