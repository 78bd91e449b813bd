//! Shared logging utilities for consistent tracing across the workspace

use chrono::{DateTime, Utc};
use std::fmt;
use tracing::{error, info, warn};

/// Workspace component that emitted a log line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Orchestrator,
    Provider(&'static str),
    Fidelity,
    Cli,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Orchestrator => write!(f, "orchestrator"),
            Component::Provider(name) => write!(f, "provider_{name}"),
            Component::Fidelity => write!(f, "fidelity"),
            Component::Cli => write!(f, "cli"),
        }
    }
}

/// Filter directive scoped to the workspace crates
pub fn filter_directive(level: &str) -> String {
    format!(
        "orchestrator={level},providers={level},fidelity={level},shared={level},reqwest=warn,hyper=warn"
    )
}

/// Initialize the stdout tracing subscriber at the given level.
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing(log_level: Option<&str>) {
    use tracing_subscriber::{fmt, EnvFilter};

    let base_level = log_level.unwrap_or("info");
    let env_filter = EnvFilter::try_new(filter_directive(base_level))
        .unwrap_or_else(|_| EnvFilter::new(filter_directive("info")));

    let _ = fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}

/// Get formatted timestamp for consistent logging
pub fn format_timestamp() -> String {
    let now: DateTime<Utc> = Utc::now();
    now.format("%H:%M:%S%.3f").to_string()
}

/// Macro for component-aware info logging
#[macro_export]
macro_rules! component_info {
    ($component:expr, $($arg:tt)*) => {
        tracing::info!(
            component = %$component,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for component-aware warning logging
#[macro_export]
macro_rules! component_warn {
    ($component:expr, $($arg:tt)*) => {
        tracing::warn!(
            component = %$component,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Contextual logging helper for startup messages
pub fn log_startup(component: &Component, details: &str) {
    info!(
        component = %component,
        timestamp = format_timestamp(),
        "🚀 Starting {}",
        details
    );
}

/// Contextual logging helper for error conditions
pub fn log_error(component: &Component, context: &str, error: &dyn fmt::Display) {
    error!(
        component = %component,
        timestamp = format_timestamp(),
        error = %error,
        "❌ {} failed: {}",
        context,
        error
    );
}

/// Contextual logging helper for tolerated sub-unit failures
pub fn log_partial_failure(component: &Component, unit: &str, error: &dyn fmt::Display) {
    warn!(
        component = %component,
        timestamp = format_timestamp(),
        error = %error,
        "⚠️ {} failed, continuing",
        unit
    );
}

/// Contextual logging helper for success conditions
pub fn log_success(component: &Component, message: &str) {
    info!(
        component = %component,
        timestamp = format_timestamp(),
        "✅ {}",
        message
    );
}

/// Contextual logging helper for progress updates
pub fn log_progress(component: &Component, action: &str, details: &str) {
    info!(
        component = %component,
        timestamp = format_timestamp(),
        "📋 {}: {}",
        action,
        details
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_display() {
        assert_eq!(Component::Orchestrator.to_string(), "orchestrator");
        assert_eq!(Component::Provider("fashn").to_string(), "provider_fashn");
        assert_eq!(Component::Fidelity.to_string(), "fidelity");
    }

    #[test]
    fn test_filter_directive_scopes_workspace_crates() {
        let directive = filter_directive("debug");
        assert!(directive.contains("providers=debug"));
        assert!(directive.contains("orchestrator=debug"));
        assert!(directive.contains("reqwest=warn"));
    }

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_tracing(Some("debug"));
        init_tracing(None);
    }
}
