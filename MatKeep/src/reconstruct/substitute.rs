//! Node substitutions applied when a host rejects a node type.

use serde::{Deserialize, Serialize};

use crate::normalize::{CanonicalNodeType, CanonicalSocketName, SocketKey};

use CanonicalNodeType as N;
use CanonicalSocketName as S;

/// A simpler node kind to build when `from` cannot be instantiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Substitution {
    pub from: CanonicalNodeType,
    pub to: CanonicalNodeType,
    /// Canonical sockets of `from` that are called differently on `to`.
    pub sockets: &'static [(CanonicalSocketName, CanonicalSocketName)],
}

/// Substitutions in lookup order. The `Unknown` entry only applies to raw
/// types naming a BSDF.
pub const SUBSTITUTIONS: &[Substitution] = &[
    Substitution {
        from: N::SheenSurface,
        to: N::DiffuseSurface,
        sockets: &[],
    },
    Substitution {
        from: N::PrincipledSurface,
        to: N::DiffuseSurface,
        sockets: &[(S::BaseColor, S::Color)],
    },
    Substitution {
        from: N::CombineChannels,
        to: N::Rgb,
        sockets: &[],
    },
    Substitution {
        from: N::Bump,
        to: N::NormalFromTangentMap,
        sockets: &[(S::Height, S::Color)],
    },
    Substitution {
        from: N::Unknown,
        to: N::DiffuseSurface,
        sockets: &[],
    },
];

/// Substring of a raw runtime type that qualifies an unknown node for the
/// diffuse fallback.
const BSDF_MARKER: &str = "Bsdf";

/// The substitution for a node of `canonical` type, if there is one.
#[must_use]
pub fn substitution_for(canonical: CanonicalNodeType, raw_type: Option<&str>) -> Option<&'static Substitution> {
    if canonical == N::Unknown && !raw_type.is_some_and(|raw| raw.contains(BSDF_MARKER)) {
        return None;
    }
    SUBSTITUTIONS.iter().find(|s| s.from == canonical)
}

impl Substitution {
    /// Translate a socket key of the original node to the substitute.
    #[must_use]
    pub fn remap(&self, key: &SocketKey) -> SocketKey {
        match key {
            SocketKey::Canonical(name) => self
                .sockets
                .iter()
                .find(|(from, _)| from == name)
                .map_or(key.clone(), |(_, to)| SocketKey::Canonical(*to)),
            SocketKey::Raw(_) => key.clone(),
        }
    }
}

/// One substitution that was applied during reconstruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedSubstitution {
    pub material: String,
    pub node: String,
    pub from: CanonicalNodeType,
    /// Runtime type of the original node when it was `unknown`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_type: Option<String>,
    pub to: CanonicalNodeType,
}
