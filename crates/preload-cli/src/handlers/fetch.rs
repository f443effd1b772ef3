//! `preload fetch`: run sources through the queue.

use std::io::{self, Write};
use std::time::Instant;

use indicatif::HumanBytes;
use serde::Serialize;

use preload_core::{Descriptor, LoadEvent};

use crate::bootstrap::{CliContext, bootstrap};
use crate::commands::{QueueArgs, SourceArgs};
use crate::error::CliError;
use crate::presentation::LoadProgressPrinter;
use crate::presentation::tables::{format_optional, truncate_string, write_separator};

/// Outcome of one item in a run.
#[derive(Debug, Clone, Serialize)]
pub struct ItemReport {
    /// `None` for descriptors rejected before they became items.
    pub id: Option<String>,
    pub src: Option<String>,
    #[serde(rename = "type")]
    pub resource_type: Option<String>,
    /// Raw payload size; host-element loads read nothing.
    pub bytes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ItemReport {
    pub const fn failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Everything a run reported.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FetchSummary {
    pub items: Vec<ItemReport>,
    /// The queue stopped at the first failure.
    pub halted: bool,
    pub elapsed_ms: u128,
}

impl FetchSummary {
    fn observe(&mut self, event: &LoadEvent) {
        let report = match event {
            LoadEvent::FileLoaded { item, output } => ItemReport {
                id: Some(item.id.clone()),
                src: Some(item.src.clone()),
                resource_type: Some(item.resource_type.to_string()),
                bytes: Some(output.raw.len()),
                error: None,
            },
            LoadEvent::Error { item, error } => ItemReport {
                id: item.as_ref().map(|i| i.id.clone()),
                src: item.as_ref().map(|i| i.src.clone()),
                resource_type: item.as_ref().map(|i| i.resource_type.to_string()),
                bytes: None,
                error: Some(error.user_message()),
            },
            _ => return,
        };
        self.items.push(report);
    }

    pub fn loaded(&self) -> usize {
        self.items.iter().filter(|i| !i.failed()).count()
    }

    pub fn failed(&self) -> usize {
        self.items.iter().filter(|i| i.failed()).count()
    }

    /// Render a table of per-item outcomes.
    pub fn write_table(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "{:<8} {:<10} {:>10}  ID", "STATUS", "TYPE", "SIZE")?;
        write_separator(out, 72)?;
        for item in &self.items {
            let status = if item.failed() { "FAILED" } else { "ok" };
            let size = format_optional(item.bytes.map(|b| HumanBytes(b as u64)).as_ref(), "-");
            let id = item.id.as_deref().unwrap_or("(rejected)");
            writeln!(
                out,
                "{:<8} {:<10} {:>10}  {}",
                status,
                item.resource_type.as_deref().unwrap_or("-"),
                size,
                truncate_string(id, 48)
            )?;
            if let Some(error) = &item.error {
                writeln!(out, "{:>31}{}", "", error)?;
            }
        }
        write_separator(out, 72)?;
        writeln!(
            out,
            "Loaded {} of {} item(s) in {} ms{}",
            self.loaded(),
            self.items.len(),
            self.elapsed_ms,
            if self.halted { " (stopped on error)" } else { "" }
        )
    }

    pub fn write_json(&self, out: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut *out, self)?;
        writeln!(out)
    }
}

/// Execute the fetch command.
pub async fn execute(sources: &SourceArgs, queue: &QueueArgs, json: bool) -> anyhow::Result<()> {
    let descriptors = sources.descriptors()?;
    let context = bootstrap(queue)?;

    let mut printer = LoadProgressPrinter::new();
    let summary = run(context, descriptors, |event| printer.on_event(event)).await;
    printer.finish();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if json {
        summary.write_json(&mut out)?;
    } else {
        summary.write_table(&mut out)?;
    }

    match summary.failed() {
        0 => Ok(()),
        failed => Err(CliError::Load {
            failed,
            total: summary.items.len(),
        }
        .into()),
    }
}

/// Enqueue `descriptors`, start the queue and collect events until it drains.
///
/// With `stop_on_error` the queue never drains after a failure, so the run
/// ends at the first failed item instead. The queue is closed on return.
pub async fn run(
    context: CliContext,
    descriptors: Vec<Descriptor>,
    mut on_event: impl FnMut(&LoadEvent),
) -> FetchSummary {
    let CliContext { queue, mut events } = context;
    let stop_on_error = queue.config().stop_on_error;
    let started = Instant::now();

    let batch = queue.load_many(descriptors, true).await;
    tracing::info!(
        target: "preload.cli",
        enqueued = batch.enqueued.len(),
        skipped = batch.skipped,
        rejected = batch.rejected.len(),
        "fetch started"
    );

    let mut summary = FetchSummary::default();
    let mut waiting = !batch.enqueued.is_empty();
    loop {
        // Once nothing more is coming, drain what is already buffered
        let event = if waiting {
            events.recv().await
        } else {
            events.try_recv().ok()
        };
        let Some(event) = event else { break };

        on_event(&event);
        match &event {
            LoadEvent::Complete => waiting = false,
            LoadEvent::Error { item: Some(_), .. } if stop_on_error => {
                summary.halted = true;
                waiting = false;
            }
            _ => {}
        }
        summary.observe(&event);
    }

    queue.close().await;
    summary.elapsed_ms = started.elapsed().as_millis();
    tracing::info!(
        target: "preload.cli",
        loaded = summary.loaded(),
        failed = summary.failed(),
        elapsed_ms = summary.elapsed_ms,
        "fetch finished"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(id: &str, error: Option<&str>) -> ItemReport {
        ItemReport {
            id: Some(id.to_string()),
            src: Some(format!("https://cdn.test/{id}")),
            resource_type: Some("text".to_string()),
            bytes: error.is_none().then_some(2048),
            error: error.map(str::to_string),
        }
    }

    fn summary() -> FetchSummary {
        FetchSummary {
            items: vec![report("a.txt", None), report("b.txt", Some("boom"))],
            halted: false,
            elapsed_ms: 12,
        }
    }

    #[test]
    fn test_counts() {
        let summary = summary();
        assert_eq!(summary.loaded(), 1);
        assert_eq!(summary.failed(), 1);
    }

    #[test]
    fn test_table_lists_every_item_and_errors() {
        let mut out = Vec::new();
        summary().write_table(&mut out).expect("write");
        let text = String::from_utf8(out).expect("utf8");

        assert!(text.contains("a.txt"));
        assert!(text.contains("2.00 KiB"));
        assert!(text.contains("FAILED"));
        assert!(text.contains("boom"));
        assert!(text.contains("Loaded 1 of 2 item(s) in 12 ms"));
    }

    #[test]
    fn test_json_omits_missing_errors() {
        let mut out = Vec::new();
        summary().write_json(&mut out).expect("write");
        let value: serde_json::Value = serde_json::from_slice(&out).expect("json");

        let items = value["items"].as_array().expect("items");
        assert_eq!(items[0]["type"], "text");
        assert!(items[0].get("error").is_none());
        assert_eq!(items[1]["error"], "boom");
        assert_eq!(value["halted"], false);
    }
}
