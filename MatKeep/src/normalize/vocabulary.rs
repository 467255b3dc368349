//! The canonical node, socket and color-space vocabulary.
//!
//! These identifiers are what manifests store. They never change meaning
//! across host releases; the tables in [`super::tables`] absorb the drift.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalNodeType {
    PrincipledSurface,
    DiffuseSurface,
    EmissionSurface,
    TransparentSurface,
    SheenSurface,
    MixSurface,
    SurfaceOutput,
    ImageSample,
    ColorMix,
    SeparateChannels,
    CombineChannels,
    NormalFromTangentMap,
    Bump,
    TextureCoordinate,
    Value,
    Rgb,
    /// A runtime type with no canonical counterpart. The runtime id is kept
    /// next to it (`NodeRecord::raw_type`) for diagnostics.
    Unknown,
}

impl CanonicalNodeType {
    /// Every known node kind (excludes [`CanonicalNodeType::Unknown`]).
    pub const ALL: &'static [CanonicalNodeType] = &[
        Self::PrincipledSurface,
        Self::DiffuseSurface,
        Self::EmissionSurface,
        Self::TransparentSurface,
        Self::SheenSurface,
        Self::MixSurface,
        Self::SurfaceOutput,
        Self::ImageSample,
        Self::ColorMix,
        Self::SeparateChannels,
        Self::CombineChannels,
        Self::NormalFromTangentMap,
        Self::Bump,
        Self::TextureCoordinate,
        Self::Value,
        Self::Rgb,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PrincipledSurface => "principled_surface",
            Self::DiffuseSurface => "diffuse_surface",
            Self::EmissionSurface => "emission_surface",
            Self::TransparentSurface => "transparent_surface",
            Self::SheenSurface => "sheen_surface",
            Self::MixSurface => "mix_surface",
            Self::SurfaceOutput => "surface_output",
            Self::ImageSample => "image_sample",
            Self::ColorMix => "color_mix",
            Self::SeparateChannels => "separate_channels",
            Self::CombineChannels => "combine_channels",
            Self::NormalFromTangentMap => "normal_from_tangent_map",
            Self::Bump => "bump",
            Self::TextureCoordinate => "texture_coordinate",
            Self::Value => "value",
            Self::Rgb => "rgb",
            Self::Unknown => "unknown",
        }
    }

    /// Whether nodes of this kind carry an image binding.
    #[must_use]
    pub fn samples_image(self) -> bool {
        self == Self::ImageSample
    }
}

impl fmt::Display for CanonicalNodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable socket names, shared across node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalSocketName {
    BaseColor,
    Metallic,
    Roughness,
    Ior,
    Alpha,
    Normal,
    SpecularLevel,
    EmissionColor,
    EmissionStrength,
    SubsurfaceWeight,
    Shader,
    ShaderA,
    ShaderB,
    Surface,
    Volume,
    Displacement,
    Color,
    Vector,
    Factor,
    ColorA,
    ColorB,
    Red,
    Green,
    Blue,
    Strength,
    Distance,
    Height,
    Uv,
    Generated,
    Object,
    Value,
}

impl CanonicalSocketName {
    pub const ALL: &'static [CanonicalSocketName] = &[
        Self::BaseColor,
        Self::Metallic,
        Self::Roughness,
        Self::Ior,
        Self::Alpha,
        Self::Normal,
        Self::SpecularLevel,
        Self::EmissionColor,
        Self::EmissionStrength,
        Self::SubsurfaceWeight,
        Self::Shader,
        Self::ShaderA,
        Self::ShaderB,
        Self::Surface,
        Self::Volume,
        Self::Displacement,
        Self::Color,
        Self::Vector,
        Self::Factor,
        Self::ColorA,
        Self::ColorB,
        Self::Red,
        Self::Green,
        Self::Blue,
        Self::Strength,
        Self::Distance,
        Self::Height,
        Self::Uv,
        Self::Generated,
        Self::Object,
        Self::Value,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BaseColor => "base_color",
            Self::Metallic => "metallic",
            Self::Roughness => "roughness",
            Self::Ior => "ior",
            Self::Alpha => "alpha",
            Self::Normal => "normal",
            Self::SpecularLevel => "specular_level",
            Self::EmissionColor => "emission_color",
            Self::EmissionStrength => "emission_strength",
            Self::SubsurfaceWeight => "subsurface_weight",
            Self::Shader => "shader",
            Self::ShaderA => "shader_a",
            Self::ShaderB => "shader_b",
            Self::Surface => "surface",
            Self::Volume => "volume",
            Self::Displacement => "displacement",
            Self::Color => "color",
            Self::Vector => "vector",
            Self::Factor => "factor",
            Self::ColorA => "color_a",
            Self::ColorB => "color_b",
            Self::Red => "red",
            Self::Green => "green",
            Self::Blue => "blue",
            Self::Strength => "strength",
            Self::Distance => "distance",
            Self::Height => "height",
            Self::Uv => "uv",
            Self::Generated => "generated",
            Self::Object => "object",
            Self::Value => "value",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.as_str() == name)
    }
}

impl fmt::Display for CanonicalSocketName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side of a node a socket sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocketDirection {
    Input,
    Output,
}

impl fmt::Display for SocketDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Input => "input",
            Self::Output => "output",
        })
    }
}

/// Socket identifier as stored in a manifest.
///
/// Canonical sockets serialize as their snake_case name; sockets the
/// normalization layer could not name keep the runtime name behind a
/// `raw:` prefix so nothing is silently lost.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SocketKey {
    Canonical(CanonicalSocketName),
    Raw(String),
}

const RAW_PREFIX: &str = "raw:";

impl SocketKey {
    #[must_use]
    pub fn canonical(&self) -> Option<CanonicalSocketName> {
        match self {
            Self::Canonical(c) => Some(*c),
            Self::Raw(_) => None,
        }
    }
}

impl From<CanonicalSocketName> for SocketKey {
    fn from(value: CanonicalSocketName) -> Self {
        Self::Canonical(value)
    }
}

impl From<String> for SocketKey {
    fn from(value: String) -> Self {
        if let Some(raw) = value.strip_prefix(RAW_PREFIX) {
            return Self::Raw(raw.to_string());
        }
        match CanonicalSocketName::from_name(&value) {
            Some(canonical) => Self::Canonical(canonical),
            None => Self::Raw(value),
        }
    }
}

impl From<SocketKey> for String {
    fn from(value: SocketKey) -> Self {
        value.to_string()
    }
}

impl fmt::Display for SocketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Canonical(c) => f.write_str(c.as_str()),
            Self::Raw(raw) => write!(f, "{RAW_PREFIX}{raw}"),
        }
    }
}

/// How the pixels of a texture are to be interpreted.
///
/// Normal, roughness and metallic maps hold linear data and must not be
/// gamma-decoded; getting this wrong is the most visible reconstruction bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorInterpretation {
    #[default]
    Color,
    NonColor,
}

impl fmt::Display for ColorInterpretation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Color => "color",
            Self::NonColor => "non_color",
        })
    }
}
