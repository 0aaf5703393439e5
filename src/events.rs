//! Pipeline events
//!
//! The orchestrator, installers and storage backends report what they do by
//! emitting `PipelineEvent`s into an `EventSink` they receive at
//! construction. Sinks decide presentation; emitters never print.

use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Where a package's final content came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadySource {
    /// Pulled from a storage backend
    Cache { backend: String },
    /// Installed, pushed and verified
    Fresh,
    /// Installed without touching the cache (local or no-push mode)
    Uncached,
}

/// Facts emitted while processing a manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    RunStarted { packages: usize, jobs: usize },
    PackageStarted { package: String, key: String },
    PullAttempt { key: String, backend: String },
    BackendHit { key: String, backend: String },
    BackendMiss { key: String, backend: String },
    BackendError { key: String, backend: String, message: String },
    CacheHit { package: String, key: String, backend: String },
    CacheMiss { package: String, key: String },
    Installing { package: String, kind: String },
    InstallRetry { package: String, reason: String },
    Command { command: String },
    Pushing { package: String, key: String },
    PushStored { key: String, backend: String },
    Archived { key: String, location: String },
    PushSkipped { key: String, backend: String },
    PushFailed { key: String, backend: String, message: String },
    Verifying { package: String, key: String },
    VerifySkipped { package: String, key: String },
    Ready { package: String, key: String, source: ReadySource },
    Failed { package: String, error: String },
    Warning { message: String },
}

/// Severity of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventLevel {
    Debug,
    Info,
    Warn,
}

impl PipelineEvent {
    /// Severity used by logging sinks
    pub fn level(&self) -> EventLevel {
        match self {
            Self::BackendError { .. }
            | Self::PushFailed { .. }
            | Self::InstallRetry { .. }
            | Self::Failed { .. }
            | Self::Warning { .. } => EventLevel::Warn,
            Self::RunStarted { .. }
            | Self::CacheHit { .. }
            | Self::CacheMiss { .. }
            | Self::Installing { .. }
            | Self::Pushing { .. }
            | Self::Verifying { .. }
            | Self::Ready { .. } => EventLevel::Info,
            _ => EventLevel::Debug,
        }
    }

    /// Package the event belongs to, if any
    pub fn package(&self) -> Option<&str> {
        match self {
            Self::PackageStarted { package, .. }
            | Self::CacheHit { package, .. }
            | Self::CacheMiss { package, .. }
            | Self::Installing { package, .. }
            | Self::InstallRetry { package, .. }
            | Self::Pushing { package, .. }
            | Self::Verifying { package, .. }
            | Self::VerifySkipped { package, .. }
            | Self::Ready { package, .. }
            | Self::Failed { package, .. } => Some(package),
            _ => None,
        }
    }
}

impl fmt::Display for PipelineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RunStarted { packages, jobs } => {
                write!(f, "Processing {} package(s) with {} job(s)", packages, jobs)
            }
            Self::PackageStarted { package, key } => write!(f, "Package {} ({})", package, key),
            Self::PullAttempt { key, backend } => write!(f, "Pulling {} from {}", key, backend),
            Self::BackendHit { key, backend } => write!(f, "{} found in {}", key, backend),
            Self::BackendMiss { key, backend } => write!(f, "{} not in {}", key, backend),
            Self::BackendError {
                key,
                backend,
                message,
            } => write!(f, "Can't pull {} from {}: {}", key, backend, message),
            Self::CacheHit {
                package,
                key,
                backend,
            } => write!(f, "Cache hit for {} ({}) from {}", package, key, backend),
            Self::CacheMiss { package, key } => write!(f, "Cache miss for {} ({})", package, key),
            Self::Installing { package, kind } => write!(f, "Installing {} from {}", package, kind),
            Self::InstallRetry { package, reason } => {
                write!(f, "Retrying install of {}: {}", package, reason)
            }
            Self::Command { command } => write!(f, "exec: {}", command),
            Self::Pushing { package, key } => write!(f, "Pushing {} ({})", package, key),
            Self::PushStored { key, backend } => write!(f, "Stored {} in {}", key, backend),
            Self::Archived { key, location } => write!(f, "Wrote {} to {}", key, location),
            Self::PushSkipped { key, backend } => {
                write!(f, "{} is readonly, skipped push of {}", backend, key)
            }
            Self::PushFailed {
                key,
                backend,
                message,
            } => write!(f, "Can't push {} to {}: {}", key, backend, message),
            Self::Verifying { package, key } => write!(f, "Verifying {} ({})", package, key),
            Self::VerifySkipped { package, key } => write!(
                f,
                "No backend stored {} ({}), skipping verification",
                package, key
            ),
            Self::Ready {
                package,
                key,
                source,
            } => match source {
                ReadySource::Cache { backend } => {
                    write!(f, "{} ready ({}, from {})", package, key, backend)
                }
                ReadySource::Fresh => write!(f, "{} ready ({}, installed and cached)", package, key),
                ReadySource::Uncached => write!(f, "{} ready ({}, not cached)", package, key),
            },
            Self::Failed { package, error } => write!(f, "{} failed: {}", package, error),
            Self::Warning { message } => f.write_str(message),
        }
    }
}

/// Receiver of pipeline events
///
/// Called synchronously from the emitting task, possibly from several
/// worker tasks at once.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: PipelineEvent);
}

/// Shared handle to a sink
pub type SharedSink = Arc<dyn EventSink>;

/// Sink that forwards events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: PipelineEvent) {
        match event.level() {
            EventLevel::Debug => debug!("{}", event),
            EventLevel::Info => info!("{}", event),
            EventLevel::Warn => warn!("{}", event),
        }
    }
}

/// Sink that drops everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: PipelineEvent) {}
}

/// Sink that records events in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<PipelineEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Count events matching a predicate
    pub fn count(&self, predicate: impl Fn(&PipelineEvent) -> bool) -> usize {
        self.events().iter().filter(|e| predicate(e)).count()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: PipelineEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Sink that broadcasts to several sinks in order
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<SharedSink>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<SharedSink>) -> Self {
        Self { sinks }
    }
}

impl EventSink for FanoutSink {
    fn emit(&self, event: PipelineEvent) {
        if let Some((last, rest)) = self.sinks.split_last() {
            for sink in rest {
                sink.emit(event.clone());
            }
            last.emit(event);
        }
    }
}
