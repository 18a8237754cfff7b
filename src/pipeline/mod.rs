//! Batch analysis pipeline.

mod inputs;
mod orchestrator;

pub use inputs::{collect_input_files, is_audio_file};
pub use orchestrator::{
    AnalysisResult, AudioFileTask, BatchOrchestrator, BatchResults, ProgressCallback,
};
