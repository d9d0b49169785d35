/// Initialize tracing/logging for the application.
///
/// This uses a simple `with_max_level` configuration based on `default_level`;
/// unknown levels fall back to `info`.
pub fn init(default_level: &str) {
    let lvl = match default_level.to_lowercase().as_str() {
        "error" => tracing::Level::ERROR,
        "warn" | "warning" => tracing::Level::WARN,
        "debug" => tracing::Level::DEBUG,
        "trace" => tracing::Level::TRACE,
        _ => tracing::Level::INFO,
    };

    // try_init so tests and embedding applications can call this more than once
    let _ = tracing_subscriber::fmt()
        .with_max_level(lvl)
        .with_target(false)
        .try_init();
}

/// Initialize logging at the level named in the settings.
pub fn init_from_settings(settings: &crate::config::Settings) {
    init(&settings.logging.level);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logging_init_accepts_levels() {
        // Should not panic
        init("info");
        init("debug");
        init("WARNING");
        init("nonsense");
        init_from_settings(&crate::config::Settings::default());
    }
}
