//! Collapsing per-segment predictions into per-species scores.

use crate::output::{PredictionSegment, SpeciesScore};
use std::fmt;
use std::str::FromStr;

/// How per-segment confidences of one species are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum PoolingMode {
    /// Mean confidence.
    #[default]
    Avg,
    /// Maximum confidence.
    Max,
}

impl PoolingMode {
    /// Parse a mode name case-insensitively; unknown names select `Avg`.
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("max") {
            Self::Max
        } else {
            Self::Avg
        }
    }
}

impl fmt::Display for PoolingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Avg => write!(f, "avg"),
            Self::Max => write!(f, "max"),
        }
    }
}

impl FromStr for PoolingMode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_name(s))
    }
}

/// Pool segments into at most `top_n` species, best first.
///
/// Species keep first-seen order when their scores tie.
pub fn pool(segments: &[PredictionSegment], top_n: usize, mode: PoolingMode) -> Vec<SpeciesScore> {
    // (species, sum, max, count) in first-seen order
    let mut groups: Vec<(String, f32, f32, usize)> = Vec::new();

    for segment in segments {
        let species = segment.scientific_name.replace(", ", "_");
        match groups.iter_mut().find(|(name, ..)| *name == species) {
            Some((_, sum, max, count)) => {
                *sum += segment.confidence;
                *max = max.max(segment.confidence);
                *count += 1;
            }
            None => groups.push((species, segment.confidence, segment.confidence, 1)),
        }
    }

    let mut scores: Vec<SpeciesScore> = groups
        .into_iter()
        .map(|(species, sum, max, count)| {
            #[allow(clippy::cast_precision_loss)]
            let score = match mode {
                PoolingMode::Max => max,
                PoolingMode::Avg => sum / count as f32,
            };
            SpeciesScore { species, score }
        })
        .collect();

    // sort_by is stable, so ties stay in first-seen order
    scores.sort_by(|a, b| b.score.total_cmp(&a.score));
    scores.truncate(top_n);
    scores
}
