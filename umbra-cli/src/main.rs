//! Umbra CLI
//!
//! Runs a JSON scene through the style engine and prints every styled host
//! with its scope and resolved custom properties, followed by the generated
//! stylesheets.

mod scene;

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use umbra_common::warning::clear_warnings;
use umbra_dom::{DomTree, NodeId};
use umbra_style::StyleEngine;

use scene::{Scene, Styled};

/// Umbra: scoped styles and custom-property cascades for shadow-tree components
#[derive(Parser, Debug)]
#[command(name = "umbra")]
#[command(author, version, about, long_about = None)]
#[command(after_help = r#"SCENE FORMAT:
    {
      "settings": { "native-shadow": false, "cache-type-max": 8 },
      "elements": [ { "name": "x-card", "css": ".t { color: var(--tone); }" } ],
      "document-styles": [ "html { --tone: navy; }" ],
      "tree": [ { "tag": "x-card", "id": "a", "shadow": [] } ],
      "updates": [ { "target": "a", "properties": { "--tone": "red" } } ]
    }

EXAMPLES:
    umbra scene.json
    umbra --json scene.json other.json
"#)]
struct Cli {
    /// Scene files to run
    #[arg(value_name = "SCENE", required = true)]
    scenes: Vec<PathBuf>,

    /// Print a JSON report instead of text
    #[arg(long)]
    json: bool,

    /// Leave generated stylesheets out of the report
    #[arg(long)]
    no_styles: bool,

    /// Log engine activity at debug level
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Serialize)]
struct HostReport {
    element: String,
    id: Option<String>,
    scope: Option<String>,
    properties: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
struct Report {
    scene: String,
    hosts: Vec<HostReport>,
    styles: BTreeMap<String, String>,
    validation_passes: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let mut reports = Vec::new();
    for path in &cli.scenes {
        clear_warnings();
        let text = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        let styled = Scene::parse(&text)
            .and_then(Scene::run)
            .with_context(|| format!("scene {}", path.display()))?;
        reports.push(report(&path.display().to_string(), &styled, !cli.no_styles));
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            print_report(report);
        }
    }
    Ok(())
}

fn report(scene: &str, styled: &Styled, with_styles: bool) -> Report {
    let mut hosts = Vec::new();
    collect_hosts(&styled.tree, &styled.engine, styled.engine.document_owner(), &mut hosts);
    let styles = if with_styles {
        generated_styles(&styled.tree, styled.head)
    } else {
        BTreeMap::new()
    };
    Report {
        scene: scene.to_string(),
        hosts,
        styles,
        validation_passes: styled.engine.validation_passes(),
    }
}

/// Styled hosts in tree order, descending into shadow roots.
fn collect_hosts(tree: &DomTree, engine: &StyleEngine, node: NodeId, out: &mut Vec<HostReport>) {
    if let Some(info) = engine.style_info(node) {
        out.push(HostReport {
            element: info.element_name.clone(),
            id: tree.get_attribute(node, "id").map(str::to_string),
            scope: info.scope_selector.clone(),
            properties: info
                .style_properties
                .iter()
                .flatten()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        });
    }
    if let Some(shadow) = tree.shadow_root(node) {
        for child in tree.element_children(shadow) {
            collect_hosts(tree, engine, child, out);
        }
    }
    for child in tree.element_children(node) {
        collect_hosts(tree, engine, child, out);
    }
}

/// Every `<style scope>` in the head and in shadow roots, keyed by scope.
fn generated_styles(tree: &DomTree, head: NodeId) -> BTreeMap<String, String> {
    let mut styles = BTreeMap::new();
    let mut roots = vec![head];
    roots.extend(
        (0..tree.len())
            .map(NodeId)
            .filter_map(|id| tree.shadow_root(id)),
    );
    for root in roots {
        for child in tree.element_children(root) {
            if let Some(scope) = tree.get_attribute(child, "scope") {
                let _ = styles.insert(scope.to_string(), tree.text_content(child));
            }
        }
    }
    styles
}

fn print_report(report: &Report) {
    println!("{} {}", "==>".bold(), report.scene.bold());
    println!("validation passes: {}", report.validation_passes);
    for host in &report.hosts {
        let id = host.id.as_deref().map(|id| format!("#{id}")).unwrap_or_default();
        let scope = host.scope.as_deref().unwrap_or("-");
        println!("<{}{}> {}", host.element.cyan(), id, scope.green());
        for (name, value) in &host.properties {
            println!("    {}: {}", name.yellow(), value);
        }
    }
    for (scope, css) in &report.styles {
        println!("{}", format!("/* {scope} */").dimmed());
        print!("{css}");
    }
    println!();
}
