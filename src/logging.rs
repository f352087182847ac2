use tracing::Span;
use tracing::span::Entered;
use tracing_subscriber::EnvFilter;

/// Installs the process-wide subscriber. Call once, at the start of `main`.
///
/// The filter defaults to `info` and can be overridden with `RUST_LOG`.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Identifies one invocation of an entry point; passed down to the training
/// and evaluation procedures, whose log events are recorded inside its span.
#[derive(Clone, Debug)]
pub struct RunContext {
    span: Span,
}

impl RunContext {
    pub fn new(entry_point: &'static str, dataset: &str, model: &str) -> Self {
        Self {
            span: tracing::info_span!("run", entry_point, dataset, model),
        }
    }

    pub fn enter(&self) -> Entered<'_> {
        self.span.enter()
    }
}
