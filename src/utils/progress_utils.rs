use indicatif::{ProgressBar, ProgressStyle};
use std::io::{stderr, IsTerminal};

/// Bounded progress bar, or `None` when stderr is not attended
pub fn progress_bar(len: u64, message: String) -> Option<ProgressBar> {
    if !stderr().is_terminal() {
        return None;
    }

    let bar = ProgressBar::new(len);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise} / {eta_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")
            .unwrap()
            .progress_chars("##-")
    );
    bar.set_message(message);

    Some(bar)
}

/// Spinner for work without a known length, or `None` when stderr is not
/// attended
pub fn indeterminate_bar(message: String) -> Option<ProgressBar> {
    if !stderr().is_terminal() {
        return None;
    }

    let bar = ProgressBar::new_spinner();
    bar.set_message(message);

    Some(bar)
}
