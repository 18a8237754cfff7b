//! Region presets.
//!
//! A region bundles a trained classifier, its label set, an optional forced
//! locale and the signal profile the model expects. The desktop and server
//! front ends ship different model generations, so each [`Profile`] has its
//! own preset table.

use crate::constants::signal;
use crate::error::Error;
use std::path::{Path, PathBuf};

/// Registered region and classifier selections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    /// Bavaria bat model.
    Bavaria,
    /// European bat model.
    Eu,
    /// Scotland bat model.
    Scotland,
    /// South Wales bat model.
    SouthWales,
    /// United Kingdom bat model.
    Uk,
    /// USA bat model.
    Usa,
    /// Eastern USA bat model.
    UsaEast,
    /// Western USA bat model.
    UsaWest,
    /// Built-in global bird model.
    Birds,
    /// Custom trained bird model.
    CustomBird,
    /// Custom trained bat model.
    CustomBat,
}

impl Region {
    /// All registered regions.
    pub const ALL: [Self; 11] = [
        Self::Bavaria,
        Self::Eu,
        Self::Scotland,
        Self::SouthWales,
        Self::Uk,
        Self::Usa,
        Self::UsaEast,
        Self::UsaWest,
        Self::Birds,
        Self::CustomBird,
        Self::CustomBat,
    ];

    /// Canonical region name as accepted on the command line.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bavaria => "Bavaria",
            Self::Eu => "EU",
            Self::Scotland => "Scotland",
            Self::SouthWales => "South-Wales",
            Self::Uk => "UK",
            Self::Usa => "USA",
            Self::UsaEast => "USA-EAST",
            Self::UsaWest => "USA-WEST",
            Self::Birds => "BIRDS",
            Self::CustomBird => "CUSTOM_BIRD",
            Self::CustomBat => "CUSTOM_BAT",
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Region {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .iter()
            .find(|r| r.name() == s)
            .or_else(|| Self::ALL.iter().find(|r| r.name().eq_ignore_ascii_case(s)))
            .copied()
            .ok_or_else(|| Error::UnknownRegion {
                name: s.to_string(),
            })
    }
}

/// Which front end a configuration is resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Desktop analysis (144 kHz bat models).
    Desktop,
    /// HTTP server (256 kHz bat models and bird models).
    Server,
}

impl Profile {
    /// Region used when a desktop selection is empty or unknown.
    pub const fn default_region(self) -> Region {
        match self {
            Self::Desktop => Region::Eu,
            Self::Server => Region::Bavaria,
        }
    }

    /// Preset table of this profile.
    pub const fn presets(self) -> &'static [RegionPreset] {
        match self {
            Self::Desktop => DESKTOP_PRESETS,
            Self::Server => SERVER_PRESETS,
        }
    }

    /// Look up the preset of a region, if the profile registers it.
    pub fn preset(self, region: Region) -> Option<&'static RegionPreset> {
        self.presets().iter().find(|p| p.region == region)
    }
}

/// Audio framing a model expects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalProfile {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Segment length in seconds.
    pub segment_length: f32,
    /// Shortest trailing segment that is still analyzed, in seconds.
    pub min_segment_length: f32,
}

const BAT_144K: SignalProfile = SignalProfile {
    sample_rate: signal::BAT_144K_SAMPLE_RATE,
    segment_length: signal::BAT_SEGMENT_LENGTH,
    min_segment_length: signal::BAT_SEGMENT_LENGTH / 3.0,
};

const BAT_256K: SignalProfile = SignalProfile {
    sample_rate: signal::BAT_256K_SAMPLE_RATE,
    segment_length: signal::BAT_SEGMENT_LENGTH,
    min_segment_length: signal::BAT_SEGMENT_LENGTH / 3.0,
};

const BIRD_48K: SignalProfile = SignalProfile {
    sample_rate: signal::BIRD_SAMPLE_RATE,
    segment_length: signal::BIRD_SEGMENT_LENGTH,
    min_segment_length: signal::BIRD_SEGMENT_LENGTH / 3.0,
};

/// Where a preset's label set lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelSet {
    /// `<model stem>_Labels.txt` beside the model in the classifier directory.
    Model,
    /// The label file of the built-in global bird model.
    BirdGlobal,
}

/// One row of a preset table.
#[derive(Debug, Clone, Copy)]
pub struct RegionPreset {
    /// Region this row describes.
    pub region: Region,
    /// Model file stem in the classifier directory; `None` selects the built-in model.
    pub model: Option<&'static str>,
    /// High-accuracy model variant used with the no-noise option.
    pub high_accuracy_model: Option<&'static str>,
    /// Label set location.
    pub labels: LabelSet,
    /// Locale forced by the preset, overriding the requested one.
    pub locale: Option<&'static str>,
    /// Overlap default of the preset, in seconds.
    pub overlap: Option<f32>,
    /// Audio framing of the model.
    pub signal: SignalProfile,
}

impl RegionPreset {
    const fn bat(
        region: Region,
        model: &'static str,
        locale: Option<&'static str>,
        signal: SignalProfile,
    ) -> Self {
        Self {
            region,
            model: Some(model),
            high_accuracy_model: None,
            labels: LabelSet::Model,
            locale,
            overlap: None,
            signal,
        }
    }

    const fn with_high_accuracy(mut self, model: &'static str) -> Self {
        self.high_accuracy_model = Some(model);
        self
    }

    /// Model stem to use, honouring the no-noise option.
    pub fn model_stem(&self, high_accuracy: bool) -> Option<&'static str> {
        if high_accuracy && let Some(stem) = self.high_accuracy_model {
            return Some(stem);
        }
        self.model
    }

    /// Path of the classifier model, if the preset uses a custom one.
    pub fn classifier_path(&self, classifier_dir: &Path, high_accuracy: bool) -> Option<PathBuf> {
        self.model_stem(high_accuracy)
            .map(|stem| classifier_dir.join(format!("{stem}.tflite")))
    }

    /// Path of the label set.
    pub fn labels_path(
        &self,
        classifier_dir: &Path,
        bird_labels: &Path,
        high_accuracy: bool,
    ) -> PathBuf {
        match (self.labels, self.model_stem(high_accuracy)) {
            (LabelSet::Model, Some(stem)) => classifier_dir.join(format!("{stem}_Labels.txt")),
            _ => bird_labels.to_path_buf(),
        }
    }
}

static DESKTOP_PRESETS: &[RegionPreset] = &[
    RegionPreset::bat(
        Region::Bavaria,
        "BattyBirdNET-Bavaria-144kHz",
        Some("de"),
        BAT_144K,
    ),
    RegionPreset::bat(Region::Eu, "BattyBirdNET-EU-144kHz", Some("en"), BAT_144K),
    RegionPreset::bat(
        Region::Scotland,
        "BattyBirdNET-Scotland-144kHz",
        Some("en"),
        BAT_144K,
    ),
    RegionPreset::bat(Region::Uk, "BattyBirdNET-UK-144kHz", Some("en"), BAT_144K),
    RegionPreset::bat(Region::Usa, "BattyBirdNET-USA-144kHz", Some("en"), BAT_144K),
];

/// Server presets.
///
/// EU and Scotland are registered here too, so `--area EU` and
/// `--area Scotland` start a server instead of being rejected.
static SERVER_PRESETS: &[RegionPreset] = &[
    RegionPreset::bat(
        Region::Bavaria,
        "BattyBirdNET-Bavaria-256kHz",
        Some("en"),
        BAT_256K,
    )
    .with_high_accuracy("BattyBirdNET-Bavaria-256kHz-high"),
    RegionPreset::bat(Region::Eu, "BattyBirdNET-EU-256kHz", None, BAT_256K),
    RegionPreset::bat(
        Region::Scotland,
        "BattyBirdNET-Scotland-256kHz",
        None,
        BAT_256K,
    ),
    RegionPreset::bat(
        Region::SouthWales,
        "BattyBirdNET-SouthWales-256kHz",
        None,
        BAT_256K,
    ),
    RegionPreset::bat(Region::Uk, "BattyBirdNET-UK-256kHz", None, BAT_256K),
    RegionPreset::bat(Region::Usa, "BattyBirdNET-USA-256kHz", None, BAT_256K),
    RegionPreset::bat(
        Region::UsaEast,
        "BattyBirdNET-USA-EAST-256kHz",
        None,
        BAT_256K,
    )
    .with_high_accuracy("BattyBirdNET-USA-EAST-256kHz-high"),
    RegionPreset::bat(
        Region::UsaWest,
        "BattyBirdNET-USA-WEST-256kHz",
        None,
        BAT_256K,
    ),
    RegionPreset {
        region: Region::Birds,
        model: None,
        high_accuracy_model: None,
        labels: LabelSet::BirdGlobal,
        locale: None,
        overlap: Some(signal::BIRD_SEGMENT_LENGTH / 4.0),
        signal: BIRD_48K,
    },
    RegionPreset {
        region: Region::CustomBird,
        model: Some("CUSTOM-BIRD-48kHz"),
        high_accuracy_model: None,
        labels: LabelSet::Model,
        locale: None,
        overlap: Some(signal::BIRD_SEGMENT_LENGTH / 4.0),
        signal: BIRD_48K,
    },
    RegionPreset::bat(Region::CustomBat, "CUSTOM-BAT-256kHz", None, BAT_256K),
];
