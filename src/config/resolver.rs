//! Region selection to run configuration resolution.

use crate::config::{
    Config, DefaultsConfig, PathsConfig, Profile, Region, RegionPreset, RunConfiguration, RunMode,
};
use crate::constants::BASE_LOCALE;
use crate::error::Result;
use crate::inference::{FileLabels, LabelSource};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Builds [`RunConfiguration`]s from a region selection.
///
/// The desktop path resolves permissively ([`ConfigResolver::resolve`]) while
/// the server's `--area` option is strict ([`ConfigResolver::resolve_strict`]).
#[derive(Debug, Clone)]
pub struct ConfigResolver<L = FileLabels> {
    profile: Profile,
    paths: PathsConfig,
    defaults: DefaultsConfig,
    high_accuracy: bool,
    labels: L,
}

impl ConfigResolver<FileLabels> {
    /// Create a resolver reading label files from disk.
    pub fn new(profile: Profile, config: &Config) -> Self {
        Self::with_label_source(profile, config, FileLabels)
    }
}

impl<L: LabelSource> ConfigResolver<L> {
    /// Create a resolver with a custom label source.
    pub fn with_label_source(profile: Profile, config: &Config, labels: L) -> Self {
        Self {
            profile,
            paths: config.paths.clone(),
            defaults: config.defaults.clone(),
            high_accuracy: false,
            labels,
        }
    }

    /// Select the high-accuracy model variants where a region has one.
    #[must_use]
    pub fn high_accuracy(mut self, enabled: bool) -> Self {
        self.high_accuracy = enabled;
        self
    }

    /// Resolve a selection, falling back to the profile's default region.
    ///
    /// Empty, unknown, or unregistered selections never fail; they resolve to
    /// [`Profile::default_region`].
    pub fn resolve(&self, selection: &str, locale: &str, mode: RunMode) -> Result<RunConfiguration> {
        let preset = selection
            .parse::<Region>()
            .ok()
            .and_then(|region| self.profile.preset(region))
            .unwrap_or_else(|| {
                let fallback = self.profile.default_region();
                if !selection.trim().is_empty() {
                    debug!("Unknown region '{selection}', using {fallback}");
                }
                self.default_preset()
            });
        self.build(preset, locale, mode)
    }

    /// Resolve a selection, failing with `UnknownRegion` when it is not registered.
    pub fn resolve_strict(
        &self,
        selection: &str,
        locale: &str,
        mode: RunMode,
    ) -> Result<RunConfiguration> {
        let region: Region = selection.parse()?;
        let preset = self
            .profile
            .preset(region)
            .ok_or_else(|| crate::Error::UnknownRegion {
                name: selection.to_string(),
            })?;
        self.build(preset, locale, mode)
    }

    fn default_preset(&self) -> &'static RegionPreset {
        let region = self.profile.default_region();
        // Both tables register their default region.
        self.profile
            .preset(region)
            .unwrap_or(&self.profile.presets()[0])
    }

    fn build(
        &self,
        preset: &RegionPreset,
        locale: &str,
        mode: RunMode,
    ) -> Result<RunConfiguration> {
        let locale = effective_locale(preset, locale);
        let classifier = preset.classifier_path(&self.paths.classifier_dir, self.high_accuracy);
        let labels_path = preset.labels_path(
            &self.paths.classifier_dir,
            &self.paths.bird_labels,
            self.high_accuracy,
        );

        info!(
            "Resolved region {} (classifier: {}, locale: {locale})",
            preset.region,
            classifier
                .as_deref()
                .map_or_else(|| "built-in".into(), Path::to_string_lossy)
        );

        let labels: Arc<[String]> = self.labels.load_lines(&labels_path)?.into();
        let (translated_labels_path, translated_labels) =
            self.translated_labels(&labels_path, &locale, &labels)?;

        let (cpu_workers, inference_threads) = mode.concurrency();

        let config = RunConfiguration {
            region: preset.region,
            classifier,
            labels_path,
            labels,
            translated_labels_path,
            translated_labels,
            locale,
            location: None,
            week: None,
            species_filter_threshold: self.defaults.species_filter_threshold,
            species_list: Vec::new(),
            min_confidence: self.defaults.min_confidence,
            sensitivity: self.defaults.sensitivity,
            overlap: preset.overlap.unwrap_or(self.defaults.overlap),
            batch_size: self.defaults.batch_size.max(1),
            cpu_workers,
            inference_threads,
            result_format: self.defaults.result_format,
            signal: preset.signal,
        };

        config.log_species_count();
        Ok(config)
    }

    fn translated_labels(
        &self,
        labels_path: &Path,
        locale: &str,
        labels: &Arc<[String]>,
    ) -> Result<(Option<PathBuf>, Arc<[String]>)> {
        if locale == BASE_LOCALE {
            return Ok((None, Arc::clone(labels)));
        }

        let path = translated_labels_path(&self.paths.translated_labels_dir, labels_path, locale);
        if !self.labels.exists(&path) {
            debug!(
                "No translated labels for locale '{locale}' at {}",
                path.display()
            );
            return Ok((None, Arc::clone(labels)));
        }

        let translated = self.labels.load_lines(&path)?;
        if translated.len() != labels.len() {
            warn!(
                "Translated labels {} have {} entries, label set has {}",
                path.display(),
                translated.len(),
                labels.len()
            );
        }
        Ok((Some(path), translated.into()))
    }
}

/// Locale forced by the preset, or the requested one lower-cased.
fn effective_locale(preset: &RegionPreset, requested: &str) -> String {
    preset.locale.map_or_else(
        || {
            let requested = requested.trim().to_lowercase();
            if requested.is_empty() {
                BASE_LOCALE.to_string()
            } else {
                requested
            }
        },
        str::to_string,
    )
}

/// Path of the translated label file for a label set and locale.
///
/// `labels/Model_Labels.txt` with locale `de` maps to
/// `<dir>/Model_Labels_de.txt`.
pub fn translated_labels_path(dir: &Path, labels_path: &Path, locale: &str) -> PathBuf {
    let stem = labels_path
        .file_stem()
        .map_or_else(|| "labels".into(), |s| s.to_string_lossy());
    dir.join(format!("{stem}_{locale}.txt"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::Error;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        config: Config,
    }

    /// Lay out a classifier directory with label files for the given stems.
    fn fixture(stems: &[&str]) -> Fixture {
        let dir = TempDir::new().unwrap();
        let models = dir.path().join("models");
        let translations = dir.path().join("translations");
        fs::create_dir_all(&models).unwrap();
        fs::create_dir_all(&translations).unwrap();

        for stem in stems {
            fs::write(
                models.join(format!("{stem}_Labels.txt")),
                "Myotis myotis_Greater Mouse-eared Bat\nNyctalus noctula_Common Noctule\n",
            )
            .unwrap();
        }
        fs::write(dir.path().join("birds.txt"), "Parus major_Great Tit\n").unwrap();

        let mut config = Config::default();
        config.paths.classifier_dir = models;
        config.paths.translated_labels_dir = translations;
        config.paths.bird_labels = dir.path().join("birds.txt");
        Fixture { _dir: dir, config }
    }

    #[test]
    fn test_resolve_known_desktop_region() {
        let fx = fixture(&["BattyBirdNET-UK-144kHz"]);
        let resolver = ConfigResolver::new(Profile::Desktop, &fx.config);

        let config = resolver
            .resolve("UK", "fr", RunMode::SingleFile { threads: 4 })
            .unwrap();

        assert_eq!(config.region, Region::Uk);
        assert!(
            config
                .classifier
                .unwrap()
                .ends_with("BattyBirdNET-UK-144kHz.tflite")
        );
        assert_eq!(config.labels.len(), 2);
        // Desktop presets force their locale.
        assert_eq!(config.locale, "en");
        assert_eq!((config.cpu_workers, config.inference_threads), (1, 4));
    }

    #[test]
    fn test_resolve_unknown_region_falls_back_to_default() {
        let fx = fixture(&["BattyBirdNET-EU-144kHz"]);
        let resolver = ConfigResolver::new(Profile::Desktop, &fx.config);

        let unknown = resolver
            .resolve("Atlantis", "en", RunMode::Directory { threads: 3 })
            .unwrap();
        let empty = resolver
            .resolve("", "en", RunMode::Directory { threads: 3 })
            .unwrap();

        assert_eq!(unknown.region, Region::Eu);
        assert_eq!(empty.region, Region::Eu);
        assert_eq!((unknown.cpu_workers, unknown.inference_threads), (3, 1));
    }

    #[test]
    fn test_resolve_server_only_region_on_desktop_falls_back() {
        let fx = fixture(&["BattyBirdNET-EU-144kHz"]);
        let resolver = ConfigResolver::new(Profile::Desktop, &fx.config);

        let config = resolver
            .resolve("USA-EAST", "en", RunMode::SingleFile { threads: 1 })
            .unwrap();
        assert_eq!(config.region, Region::Eu);
    }

    #[test]
    fn test_resolve_strict_rejects_unknown_region() {
        let fx = fixture(&["BattyBirdNET-Bavaria-256kHz"]);
        let resolver = ConfigResolver::new(Profile::Server, &fx.config);

        let result = resolver.resolve_strict("Atlantis", "en", RunMode::SingleFile { threads: 4 });
        assert!(matches!(result, Err(Error::UnknownRegion { ref name }) if name == "Atlantis"));
    }

    #[test]
    fn test_resolve_strict_accepts_registered_region() {
        let fx = fixture(&["BattyBirdNET-SouthWales-256kHz"]);
        let resolver = ConfigResolver::new(Profile::Server, &fx.config);

        let config = resolver
            .resolve_strict("South-Wales", "en", RunMode::SingleFile { threads: 4 })
            .unwrap();
        assert_eq!(config.region, Region::SouthWales);
        assert_eq!(config.signal.sample_rate, 256_000);
    }

    #[test]
    fn test_resolve_no_noise_selects_high_accuracy_labels() {
        let fx = fixture(&["BattyBirdNET-USA-EAST-256kHz-high"]);
        let resolver = ConfigResolver::new(Profile::Server, &fx.config).high_accuracy(true);

        let config = resolver
            .resolve_strict("USA-EAST", "en", RunMode::SingleFile { threads: 2 })
            .unwrap();
        assert!(
            config
                .labels_path
                .ends_with("BattyBirdNET-USA-EAST-256kHz-high_Labels.txt")
        );
    }

    #[test]
    fn test_resolve_birds_uses_global_labels_and_bird_overlap() {
        let fx = fixture(&[]);
        let resolver = ConfigResolver::new(Profile::Server, &fx.config);

        let config = resolver
            .resolve_strict("BIRDS", "en", RunMode::SingleFile { threads: 2 })
            .unwrap();
        assert!(config.classifier.is_none());
        assert_eq!(config.labels.as_ref(), ["Parus major_Great Tit".to_string()]);
        assert_eq!(config.overlap, 0.75);
    }

    #[test]
    fn test_resolve_missing_labels_file_fails() {
        let fx = fixture(&[]);
        let resolver = ConfigResolver::new(Profile::Server, &fx.config);

        let result = resolver.resolve_strict("UK", "en", RunMode::SingleFile { threads: 1 });
        assert!(matches!(result, Err(Error::LabelsRead { .. })));
    }

    #[test]
    fn test_translated_labels_loaded_for_locale() {
        let fx = fixture(&["BattyBirdNET-Bavaria-144kHz"]);
        fs::write(
            fx.config
                .paths
                .translated_labels_dir
                .join("BattyBirdNET-Bavaria-144kHz_Labels_de.txt"),
            "Myotis myotis_Großes Mausohr\nNyctalus noctula_Großer Abendsegler\n",
        )
        .unwrap();
        let resolver = ConfigResolver::new(Profile::Desktop, &fx.config);

        // Bavaria forces German on the desktop.
        let config = resolver
            .resolve("Bavaria", "en", RunMode::SingleFile { threads: 1 })
            .unwrap();

        assert_eq!(config.locale, "de");
        assert!(config.translated_labels_path.is_some());
        assert_eq!(config.translated_labels[0], "Myotis myotis_Großes Mausohr");
    }

    #[test]
    fn test_missing_translation_falls_back_to_base_labels() {
        let fx = fixture(&["BattyBirdNET-UK-256kHz"]);
        let resolver = ConfigResolver::new(Profile::Server, &fx.config);

        let config = resolver
            .resolve_strict("UK", "IT", RunMode::SingleFile { threads: 1 })
            .unwrap();

        assert_eq!(config.locale, "it");
        assert!(config.translated_labels_path.is_none());
        assert_eq!(config.translated_labels, config.labels);
    }

    #[test]
    fn test_translated_labels_path_format() {
        let path = translated_labels_path(
            Path::new("/labels"),
            Path::new("/models/BattyBirdNET-EU-144kHz_Labels.txt"),
            "de",
        );
        assert_eq!(
            path,
            PathBuf::from("/labels/BattyBirdNET-EU-144kHz_Labels_de.txt")
        );
    }
}
