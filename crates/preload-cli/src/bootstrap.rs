//! CLI bootstrap - the composition root.
//!
//! This module is the ONLY place where infrastructure is wired together
//! for the CLI adapter:
//! - HTTP backend (via preload-http)
//! - Terminal host elements (see [`crate::host`])
//! - Load queue (via preload-queue)
//!
//! Command handlers receive the composed queue and its event stream.

use std::sync::Arc;

use tokio::sync::mpsc;

use preload_core::{ChannelEmitter, HostElementFactory, LoadEvent, LoadQueueConfig};
use preload_http::{HttpBackend, ReqwestBackend};
use preload_queue::{LoadQueue, LoadQueueDeps, build_load_queue};

use crate::commands::QueueArgs;
use crate::error::CliError;
use crate::host::FetchElementFactory;

/// Fully composed context for the fetch command.
pub struct CliContext {
    pub queue: LoadQueue,
    /// Every event the queue emits, in order.
    pub events: mpsc::UnboundedReceiver<LoadEvent>,
}

/// Compose a queue over the reqwest backend.
pub fn bootstrap(args: &QueueArgs) -> Result<CliContext, CliError> {
    let backend = Arc::new(ReqwestBackend::new(&args.http_config())?);
    compose(backend, args.queue_config())
}

/// Compose a queue over any backend.
///
/// Host elements download through the same backend as network loads.
pub fn compose<B>(backend: Arc<B>, config: LoadQueueConfig) -> Result<CliContext, CliError>
where
    B: HttpBackend + 'static,
{
    let host_factory: Arc<dyn HostElementFactory> =
        Arc::new(FetchElementFactory::new(Arc::clone(&backend)));
    let (emitter, events) = ChannelEmitter::new();

    let queue = build_load_queue(LoadQueueDeps {
        http_backend: backend,
        host_factory: Some(host_factory),
        event_emitter: Arc::new(emitter),
        config,
    })?;

    tracing::debug!(
        target: "preload.cli",
        max_connections = queue.config().max_connections,
        base_path = ?queue.config().base_path,
        "queue composed"
    );
    Ok(CliContext { queue, events })
}
