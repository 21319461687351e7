use std::str::FromStr;
use std::sync::Mutex;

use tracing::warn;

/// Receives a notice whenever a numeric field falls back to its default.
pub trait WarningSink {
    fn not_an_integer(&self, field: &'static str, raw: &str);
}

impl<T: WarningSink + ?Sized> WarningSink for &T {
    fn not_an_integer(&self, field: &'static str, raw: &str) {
        (**self).not_an_integer(field, raw)
    }
}

/// Emits a `tracing` warning per malformed field.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingWarnings;

impl WarningSink for TracingWarnings {
    fn not_an_integer(&self, field: &'static str, raw: &str) {
        warn!(field, value = raw, "not an integer, defaulting to 0");
    }
}

/// Keeps every warning it receives.
#[derive(Debug, Default)]
pub struct CollectedWarnings {
    entries: Mutex<Vec<(&'static str, String)>>,
}

impl CollectedWarnings {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(field, raw value)` pairs in arrival order.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

impl WarningSink for CollectedWarnings {
    fn not_an_integer(&self, field: &'static str, raw: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push((field, raw.to_string()));
        }
    }
}

/// Parse `raw`, or report it to `sink` and return the type's default.
pub fn parse_or_default<T, W>(raw: &str, field: &'static str, sink: &W) -> T
where
    T: FromStr + Default,
    W: WarningSink + ?Sized,
{
    match raw.parse() {
        Ok(value) => value,
        Err(_) => {
            sink.not_an_integer(field, raw);
            T::default()
        }
    }
}
