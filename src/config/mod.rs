//! Configuration loading, region presets and run configuration resolution.

mod file;
mod region;
mod resolver;
mod run;
mod types;
mod validate;

pub use file::{config_dir, config_file_path, load_config, load_config_file, save_config};
pub use region::{LabelSet, Profile, Region, RegionPreset, SignalProfile};
pub use resolver::{ConfigResolver, translated_labels_path};
pub use run::{Location, RunConfiguration, RunMode};
pub use types::{
    AnalyzerConfig, Config, DefaultsConfig, PathsConfig, ResultFormat, ServerConfig,
};
pub use validate::validate_config;
