//! Progress bar for batch analysis.

use indicatif::{ProgressBar, ProgressStyle};

/// Create a progress bar for a batch of `total_files` files.
///
/// Returns `None` when progress is disabled or there is nothing to track.
pub fn create_batch_progress(total_files: usize, enabled: bool) -> Option<ProgressBar> {
    if !enabled || total_files == 0 {
        return None;
    }

    let pb = ProgressBar::new(total_files as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} files ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░ "),
    );
    Some(pb)
}

/// Move the bar to `completed` of `total`.
///
/// Matches the orchestrator's progress callback signature.
pub fn update_progress(pb: Option<&ProgressBar>, completed: usize, total: usize) {
    if let Some(pb) = pb {
        pb.set_length(total as u64);
        pb.set_position(completed as u64);
    }
}

/// Finish a progress bar with a message.
pub fn finish_progress(pb: Option<ProgressBar>, message: &str) {
    if let Some(pb) = pb {
        pb.finish_with_message(message.to_string());
    }
}
