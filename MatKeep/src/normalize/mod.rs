//! Node/socket normalization layer.
//!
//! Maps host-runtime node identifiers, socket names and color-space names to
//! the stable vocabulary stored in manifests, and back again for a given
//! host version. Everything here is a pure table lookup.
//!
//! # Example
//!
//! ```
//! use matkeep::normalize::{from_canonical, to_canonical, CanonicalNodeType, HostVersion};
//!
//! let id = from_canonical(CanonicalNodeType::ColorMix, HostVersion::new(3, 3)).unwrap();
//! assert_eq!(id, "ShaderNodeMixRGB");
//! let id = from_canonical(CanonicalNodeType::ColorMix, HostVersion::new(4, 1)).unwrap();
//! assert_eq!(id, "ShaderNodeMix");
//! assert_eq!(to_canonical("ShaderNodeMixRGB").unwrap(), CanonicalNodeType::ColorMix);
//! ```

mod tables;
mod version;
mod vocabulary;

pub use tables::{RUNTIME_NODES, RUNTIME_SOCKETS, RuntimeNode, RuntimeSocket};
pub use version::HostVersion;
pub use vocabulary::{
    CanonicalNodeType, CanonicalSocketName, ColorInterpretation, SocketDirection, SocketKey,
};

use crate::error::{Error, Result};

/// Canonical type of a runtime node identifier.
///
/// Every identifier any supported host version ever used is accepted.
///
/// # Errors
/// Returns [`Error::UnknownNodeType`] if the identifier is not in the table.
pub fn to_canonical(runtime_type_id: &str) -> Result<CanonicalNodeType> {
    RUNTIME_NODES
        .iter()
        .find(|n| n.id == runtime_type_id)
        .map(|n| n.canonical)
        .ok_or_else(|| Error::UnknownNodeType {
            type_id: runtime_type_id.to_string(),
        })
}

/// Runtime identifier to instantiate `canonical` on a host of `version`.
///
/// Picks the newest identifier introduced at or before `version`. When the
/// canonical type postdates the host, the oldest identifier is returned
/// anyway and the host is left to reject it, which is what drives
/// substitution during reconstruction. Only [`CanonicalNodeType::Unknown`]
/// maps to `None`.
#[must_use]
pub fn from_canonical(canonical: CanonicalNodeType, version: HostVersion) -> Option<&'static str> {
    tables::in_effect(
        RUNTIME_NODES.iter().filter(|n| n.canonical == canonical),
        version,
        |n| n.since,
    )
    .map(|n| n.id)
}

/// Canonical name of a runtime socket.
///
/// # Errors
/// Returns [`Error::UnknownSocketName`] if the node type has no socket of
/// that name in that direction.
pub fn socket_to_canonical(
    runtime_type_id: &str,
    direction: SocketDirection,
    runtime_name: &str,
) -> Result<CanonicalSocketName> {
    RUNTIME_SOCKETS
        .iter()
        .find(|s| s.node == runtime_type_id && s.direction == direction && s.name == runtime_name)
        .map(|s| s.canonical)
        .ok_or_else(|| Error::UnknownSocketName {
            node_type: runtime_type_id.to_string(),
            socket: runtime_name.to_string(),
            direction: direction.to_string(),
        })
}

/// Runtime socket name for `canonical` on `runtime_type_id` at `version`.
///
/// Returns `None` if the node type has no such socket in that direction.
#[must_use]
pub fn socket_from_canonical(
    runtime_type_id: &str,
    direction: SocketDirection,
    canonical: CanonicalSocketName,
    version: HostVersion,
) -> Option<&'static str> {
    tables::in_effect(
        RUNTIME_SOCKETS.iter().filter(|s| {
            s.node == runtime_type_id && s.direction == direction && s.canonical == canonical
        }),
        version,
        |s| s.since,
    )
    .map(|s| s.name)
}

/// Resolve a [`SocketKey`] to a runtime socket name.
///
/// Raw keys pass through unchanged so sockets that were never normalized
/// still get a chance to match on the host side.
#[must_use]
pub fn socket_key_to_runtime(
    runtime_type_id: &str,
    direction: SocketDirection,
    key: &SocketKey,
    version: HostVersion,
) -> Option<String> {
    match key {
        SocketKey::Canonical(canonical) => {
            socket_from_canonical(runtime_type_id, direction, *canonical, version)
                .map(str::to_string)
        }
        SocketKey::Raw(name) => Some(name.clone()),
    }
}

/// Normalize a host color-space name.
///
/// Unrecognized names are treated as color data, which is what hosts do
/// for display-referred spaces.
#[must_use]
pub fn color_space_to_canonical(name: &str) -> ColorInterpretation {
    match name.trim() {
        "Non-Color" | "Raw" | "Linear" | "Linear Rec.709" | "Linear CIE-XYZ E" | "XYZ" => {
            ColorInterpretation::NonColor
        }
        _ => ColorInterpretation::Color,
    }
}

/// Host color-space name for a canonical interpretation.
#[must_use]
pub fn color_space_from_canonical(interpretation: ColorInterpretation) -> &'static str {
    match interpretation {
        ColorInterpretation::Color => "sRGB",
        ColorInterpretation::NonColor => "Non-Color",
    }
}
