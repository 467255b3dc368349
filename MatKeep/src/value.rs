//! Socket parameter values shared by host scenes and manifests.

use serde::{Deserialize, Serialize};

/// Value held by an unlinked node input.
///
/// Serialized untagged so manifests stay readable: `true`, `0.5`,
/// `[0.8, 0.8, 0.8, 1.0]`, `"UV"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Scalar(f32),
    Vector(Vec<f32>),
    Text(String),
}

impl ParamValue {
    /// RGBA color value.
    #[must_use]
    pub fn rgba(color: [f32; 4]) -> Self {
        Self::Vector(color.to_vec())
    }

    /// Three-component vector value.
    #[must_use]
    pub fn vec3(v: [f32; 3]) -> Self {
        Self::Vector(v.to_vec())
    }

    /// Scalar contents, if this is a scalar.
    #[must_use]
    pub fn as_scalar(&self) -> Option<f32> {
        match self {
            Self::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    /// The first `N` vector components, padding with `fill`.
    #[must_use]
    pub fn as_array<const N: usize>(&self, fill: f32) -> Option<[f32; N]> {
        match self {
            Self::Vector(values) => {
                let mut out = [fill; N];
                for (slot, value) in out.iter_mut().zip(values) {
                    *slot = *value;
                }
                Some(out)
            }
            _ => None,
        }
    }

    /// Whether `other` may be stored in a socket currently holding `self`.
    ///
    /// Scalars and vectors are interchangeable the way host color/float
    /// sockets implicitly convert; bools and text must match exactly.
    #[must_use]
    pub fn accepts(&self, other: &ParamValue) -> bool {
        matches!(
            (self, other),
            (Self::Bool(_), Self::Bool(_))
                | (Self::Text(_), Self::Text(_))
                | (Self::Scalar(_) | Self::Vector(_), Self::Scalar(_) | Self::Vector(_))
        )
    }
}
