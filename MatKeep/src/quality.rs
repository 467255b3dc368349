//! Quality scoring of a restored asset.
//!
//! The grade comes from how much of the manifest the reconstruction report
//! says was rebuilt. The exported file size is only a cross-check: an
//! artifact much smaller than its textures can explain loses one grade.
//! Nothing here ever fails a run.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::reconstruct::ReconstructionReport;

/// Weight of texture binding completeness in the structural score.
pub const TEXTURE_WEIGHT: f64 = 0.7;
/// Weight of node and link completeness in the structural score.
pub const GRAPH_WEIGHT: f64 = 0.3;
/// Credit a substituted node earns compared to one built as recorded.
pub const SUBSTITUTED_CREDIT: f64 = 0.5;

/// Minimum structural score for [`QualityScore::Excellent`].
pub const EXCELLENT_THRESHOLD: f64 = 0.95;
/// Minimum structural score for [`QualityScore::Good`].
pub const GOOD_THRESHOLD: f64 = 0.8;
/// Minimum structural score for [`QualityScore::Acceptable`].
pub const ACCEPTABLE_THRESHOLD: f64 = 0.5;

/// Allowance for geometry, rig and document data on top of the textures.
pub const GEOMETRY_OVERHEAD_BYTES: u64 = 1024;
/// Artifacts below this fraction of the expected size lose one grade.
pub const SIZE_RATIO_FLOOR: f64 = 0.6;

/// Coarse grade of a restored asset, ordered worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityScore {
    Poor,
    Acceptable,
    Good,
    Excellent,
}

impl QualityScore {
    fn from_structural(value: f64) -> Self {
        if value >= EXCELLENT_THRESHOLD {
            Self::Excellent
        } else if value >= GOOD_THRESHOLD {
            Self::Good
        } else if value >= ACCEPTABLE_THRESHOLD {
            Self::Acceptable
        } else {
            Self::Poor
        }
    }

    /// One grade lower, saturating at [`QualityScore::Poor`].
    #[must_use]
    pub fn lowered(self) -> Self {
        match self {
            Self::Excellent => Self::Good,
            Self::Good => Self::Acceptable,
            Self::Acceptable | Self::Poor => Self::Poor,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Poor => "poor",
            Self::Acceptable => "acceptable",
            Self::Good => "good",
            Self::Excellent => "excellent",
        }
    }
}

impl fmt::Display for QualityScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for QualityScore {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "poor" => Ok(Self::Poor),
            "acceptable" => Ok(Self::Acceptable),
            "good" => Ok(Self::Good),
            "excellent" => Ok(Self::Excellent),
            other => Err(format!("unknown quality score '{other}'")),
        }
    }
}

/// Everything the score was derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityAssessment {
    pub score: QualityScore,
    /// Weighted completeness in `0.0..=1.0`.
    pub structural: f64,
    pub texture_completeness: f64,
    pub graph_completeness: f64,
    /// Artifact size divided by expected size.
    pub size_ratio: f64,
    /// Whether the size check lowered the grade.
    pub size_penalized: bool,
}

/// Grade a restored asset.
#[must_use]
pub fn score(report: &ReconstructionReport, expected_payload_bytes: u64, final_artifact_bytes: u64) -> QualityScore {
    assess(report, expected_payload_bytes, final_artifact_bytes, GEOMETRY_OVERHEAD_BYTES).score
}

/// Grade a restored asset and keep the intermediate figures.
#[must_use]
pub fn assess(
    report: &ReconstructionReport,
    expected_payload_bytes: u64,
    final_artifact_bytes: u64,
    geometry_overhead_bytes: u64,
) -> QualityAssessment {
    let texture_completeness = ratio(report.textures_bound as f64, report.textures_total());

    let graph_done = report.nodes_created as f64
        + report.nodes_substituted as f64 * SUBSTITUTED_CREDIT
        + report.links_created as f64;
    let graph_completeness = ratio(graph_done, report.nodes_total() + report.links_total());

    let structural = texture_completeness * TEXTURE_WEIGHT + graph_completeness * GRAPH_WEIGHT;
    let mut score = QualityScore::from_structural(structural);

    let expected = expected_payload_bytes.saturating_add(geometry_overhead_bytes).max(1);
    let size_ratio = final_artifact_bytes as f64 / expected as f64;
    let size_penalized = expected_payload_bytes > 0 && size_ratio < SIZE_RATIO_FLOOR;
    if size_penalized {
        tracing::debug!("Artifact is {size_ratio:.2} of the expected size; lowering grade");
        score = score.lowered();
    }

    QualityAssessment {
        score,
        structural,
        texture_completeness,
        graph_completeness,
        size_ratio,
        size_penalized,
    }
}

/// `done / total`, treating an empty total as complete.
fn ratio(done: f64, total: usize) -> f64 {
    if total == 0 {
        1.0
    } else {
        (done / total as f64).clamp(0.0, 1.0)
    }
}
