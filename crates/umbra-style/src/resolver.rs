//! The custom-property cascade.
//!
//! An instance's map is layered, later layers winning:
//!
//! 1. the structural owner's resolved map,
//! 2. its own `:host` assignments,
//! 3. assignments from the owner's rules matching the instance,
//! 4. its own root assignments (`:host > *`),
//! 5. present override values.
//!
//! The result is then reified so no `var()` is left between properties.

use umbra_css::{PropertyMap, host_and_root_properties, property_data_from_styles, reify};
use umbra_dom::{DomTree, NodeId};

use crate::style_info::{StyleInfoTable, mixin_override_styles};
use crate::tree::structural_owner_of;

/// Compute the effective property map of `host` from current tree state.
///
/// A host without a record, or a record without a rule-set, contributes no
/// local rules; the inherited map and overrides still apply. The document
/// element is its own owner and inherits nothing.
#[must_use]
pub fn resolve(tree: &DomTree, records: &StyleInfoTable, host: NodeId, document_owner: NodeId) -> PropertyMap {
    let owner = structural_owner_of(tree, records, host, document_owner);
    let owner_info = records.get(owner);
    let mut props = if owner == host {
        PropertyMap::new()
    } else {
        owner_info
            .and_then(|info| info.style_properties.clone())
            .unwrap_or_default()
    };

    let Some(info) = records.get(host) else {
        return props;
    };
    let host_and_root = info
        .style_rules
        .as_deref()
        .map(|rules| host_and_root_properties(rules, tree, host))
        .unwrap_or_default();
    let matching_host = owner_info
        .and_then(|owner| owner.style_rules.as_deref())
        .map(|rules| property_data_from_styles(rules, tree, host))
        .unwrap_or_default();

    props.extend(host_and_root.host_props);
    props.extend(matching_host);
    props.extend(host_and_root.root_props);
    mixin_override_styles(&mut props, &info.override_properties);
    reify(&mut props);
    tracing::trace!(host = host.0, owner = owner.0, properties = props.len(), "properties resolved");
    props
}
