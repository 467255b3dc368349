//! Walking a host node tree into canonical records.

use indexmap::IndexMap;

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::host::{NodeTree, SceneNode};
use crate::manifest::{LinkRecord, NodeRecord};
use crate::normalize::{self, CanonicalNodeType, SocketDirection, SocketKey};
use crate::value::ParamValue;

/// Canonical type of `node`, recording a diagnostic for unknown types.
pub(super) fn node_type(
    material: &str,
    node: &SceneNode,
    diagnostics: &mut Vec<Diagnostic>,
) -> CanonicalNodeType {
    normalize::to_canonical(&node.type_id).unwrap_or_else(|e| {
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::UnknownNodeType,
            format!("{material}/{}", node.name),
            e.to_string(),
        ));
        CanonicalNodeType::Unknown
    })
}

/// Socket key for a runtime socket name.
///
/// Sockets of unknown node types are kept raw without a diagnostic; the
/// node itself already has one.
pub(super) fn socket_key(
    material: &str,
    node: &SceneNode,
    canonical: CanonicalNodeType,
    direction: SocketDirection,
    socket: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> SocketKey {
    if canonical == CanonicalNodeType::Unknown {
        return SocketKey::Raw(socket.to_string());
    }
    match normalize::socket_to_canonical(&node.type_id, direction, socket) {
        Ok(name) => SocketKey::Canonical(name),
        Err(e) => {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::UnknownSocketName,
                format!("{material}/{}", node.name),
                e.to_string(),
            ));
            SocketKey::Raw(socket.to_string())
        }
    }
}

/// Node record without its texture binding.
pub(super) fn node_record(
    material: &str,
    tree: &NodeTree,
    node: &SceneNode,
    diagnostics: &mut Vec<Diagnostic>,
) -> NodeRecord {
    let canonical = node_type(material, node, diagnostics);

    let mut inputs: IndexMap<SocketKey, ParamValue> = IndexMap::new();
    for (socket, value) in &node.inputs {
        let Some(value) = value else { continue };
        if tree.is_linked(&node.name, socket) {
            continue;
        }
        let key = socket_key(material, node, canonical, SocketDirection::Input, socket, diagnostics);
        inputs.insert(key, value.clone());
    }

    let mut outputs: IndexMap<SocketKey, ParamValue> = IndexMap::new();
    for (socket, value) in &node.outputs {
        let Some(value) = value else { continue };
        let key = socket_key(material, node, canonical, SocketDirection::Output, socket, diagnostics);
        outputs.insert(key, value.clone());
    }

    NodeRecord {
        name: node.name.clone(),
        canonical_type: canonical,
        raw_type: (canonical == CanonicalNodeType::Unknown).then(|| node.type_id.clone()),
        position: node.location,
        inputs,
        outputs,
        bound_texture_name: None,
    }
}

/// Link records for every link whose endpoints exist.
pub(super) fn link_records(
    material: &str,
    tree: &NodeTree,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<LinkRecord> {
    let mut links = Vec::with_capacity(tree.links.len());
    for link in &tree.links {
        let (Some(from), Some(to)) = (tree.node(&link.from_node), tree.node(&link.to_node)) else {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::LinkSkipped,
                format!("{material}/{}", link.to_node),
                format!("link {} -> {} references a missing node", link.from_node, link.to_node),
            ));
            continue;
        };
        // Node-type diagnostics were already recorded by `node_record`.
        let from_type = normalize::to_canonical(&from.type_id).unwrap_or(CanonicalNodeType::Unknown);
        let to_type = normalize::to_canonical(&to.type_id).unwrap_or(CanonicalNodeType::Unknown);
        links.push(LinkRecord {
            from_node: from.name.clone(),
            from_socket: socket_key(material, from, from_type, SocketDirection::Output, &link.from_socket, diagnostics),
            to_node: to.name.clone(),
            to_socket: socket_key(material, to, to_type, SocketDirection::Input, &link.to_socket, diagnostics),
        });
    }
    links
}
