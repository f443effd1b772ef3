//! CLI progress rendering for queue runs.
//!
//! Presentation only. Consumes [`LoadEvent`]s and draws either an indicatif
//! bar (terminal) or one line per finished item (pipes, CI logs). Output
//! goes to stderr so stdout stays clean for summaries.

use std::io::{self, IsTerminal};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use preload_core::LoadEvent;

/// Resolution of the aggregate bar.
const BAR_STEPS: u64 = 1000;

/// Progress display that selects terminal or plain output.
pub struct LoadProgressPrinter {
    inner: ProgressRender,
}

enum ProgressRender {
    Fancy(FancyProgress),
    Plain(PlainProgress),
}

impl LoadProgressPrinter {
    /// Create a printer, auto-detecting terminal capability.
    pub fn new() -> Self {
        let inner = if io::stderr().is_terminal() {
            ProgressRender::Fancy(FancyProgress::new())
        } else {
            ProgressRender::Plain(PlainProgress::default())
        };
        Self { inner }
    }

    /// Update the display with one queue event.
    pub fn on_event(&mut self, event: &LoadEvent) {
        match &mut self.inner {
            ProgressRender::Fancy(inner) => inner.on_event(event),
            ProgressRender::Plain(inner) => inner.on_event(event),
        }
    }

    /// Finish and clear the display.
    pub fn finish(&self) {
        if let ProgressRender::Fancy(inner) = &self.inner {
            inner.bar.finish_and_clear();
        }
    }
}

impl Default for LoadProgressPrinter {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Fancy Terminal Progress (indicatif)
// ============================================================================

struct FancyProgress {
    bar: ProgressBar,
}

impl FancyProgress {
    fn new() -> Self {
        let bar = ProgressBar::with_draw_target(Some(BAR_STEPS), ProgressDrawTarget::stderr());
        bar.set_style(Self::bar_style());
        bar.set_message("waiting");
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }

    fn on_event(&self, event: &LoadEvent) {
        match event {
            LoadEvent::FileStart { item } => self.bar.set_message(item.id.clone()),
            LoadEvent::Progress { fraction } => self.bar.set_position(steps(*fraction)),
            LoadEvent::FileLoaded { .. } | LoadEvent::Error { .. } => {
                if let Some(line) = item_line(event) {
                    self.bar.println(line);
                }
            }
            LoadEvent::Complete => self.bar.set_message("done"),
            LoadEvent::LoadStart | LoadEvent::FileProgress { .. } => {}
        }
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} [{bar:30.cyan/blue}] {percent:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ")
    }
}

// ============================================================================
// Plain Progress (non-terminal)
// ============================================================================

#[derive(Default)]
struct PlainProgress {
    fraction: f64,
}

impl PlainProgress {
    fn on_event(&mut self, event: &LoadEvent) {
        if let LoadEvent::Progress { fraction } = event {
            self.fraction = *fraction;
        }
        if let Some(line) = plain_line(self.fraction, event) {
            eprintln!("{line}");
        }
    }
}

/// Bar position for an aggregate fraction.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn steps(fraction: f64) -> u64 {
    (fraction.clamp(0.0, 1.0) * BAR_STEPS as f64).round() as u64
}

/// One-line description of a finished or failed item.
fn item_line(event: &LoadEvent) -> Option<String> {
    match event {
        LoadEvent::FileLoaded { item, .. } => Some(format!("  ok     {}", item.id)),
        LoadEvent::Error {
            item: Some(item),
            error,
        } => Some(format!("  failed {}: {}", item.id, error.user_message())),
        LoadEvent::Error { item: None, error } => {
            Some(format!("  reject {}", error.user_message()))
        }
        _ => None,
    }
}

fn plain_line(fraction: f64, event: &LoadEvent) -> Option<String> {
    let line = item_line(event)?;
    Some(format!("[{:>3}%]{line}", steps(fraction) / 10))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use preload_core::{Formatted, LoadError, LoadItem, LoadOutput, RawContent, ResourceType};

    use super::*;

    fn item(id: &str) -> Arc<LoadItem> {
        Arc::new(LoadItem::new(id, ResourceType::Text))
    }

    #[test]
    fn test_steps_clamps_and_rounds() {
        assert_eq!(steps(0.0), 0);
        assert_eq!(steps(0.4996), 500);
        assert_eq!(steps(1.0), BAR_STEPS);
        assert_eq!(steps(1.5), BAR_STEPS);
        assert_eq!(steps(-0.2), 0);
    }

    #[test]
    fn test_plain_line_for_loaded_item() {
        let output = Arc::new(LoadOutput::new(
            RawContent::Text("hi".into()),
            Formatted::Text("hi".into()),
        ));
        let event = LoadEvent::FileLoaded {
            item: item("a.txt"),
            output,
        };
        assert_eq!(plain_line(0.5, &event).as_deref(), Some("[ 50%]  ok     a.txt"));
    }

    #[test]
    fn test_plain_line_for_failures() {
        let failed = LoadEvent::Error {
            item: Some(item("b.json")),
            error: LoadError::Cancelled,
        };
        assert_eq!(
            plain_line(1.0, &failed).as_deref(),
            Some("[100%]  failed b.json: Load was cancelled.")
        );

        let rejected = LoadEvent::Error {
            item: None,
            error: LoadError::invalid_source("bad src"),
        };
        assert!(plain_line(0.0, &rejected).is_some_and(|l| l.contains("reject")));
    }

    #[test]
    fn test_progress_events_print_nothing() {
        assert_eq!(plain_line(0.3, &LoadEvent::Progress { fraction: 0.3 }), None);
        assert_eq!(plain_line(1.0, &LoadEvent::Complete), None);
    }
}
