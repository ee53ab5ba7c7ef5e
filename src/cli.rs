//! Helpers shared by the binaries.

/// Install the fmt subscriber. A second call is a no-op.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().try_init();
}

/// First `keep` characters of `id`, followed by `...` when cut.
pub fn short_id(id: &str, keep: usize) -> String {
    if id.chars().count() <= keep {
        id.to_string()
    } else {
        let head: String = id.chars().take(keep).collect();
        format!("{}...", head)
    }
}
