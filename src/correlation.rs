use std::sync::Mutex;
use uuid::Uuid;

/// Current correlation identifier for one relay.
///
/// Callers set a value to link a chain of events to one logical operation;
/// an empty store synthesizes a fresh identifier per built record. Every
/// Error emission clears the store so an error's correlation id cannot leak
/// into unrelated subsequent events.
#[derive(Debug, Default)]
pub struct CorrelationStore {
    current: Mutex<String>,
}

impl CorrelationStore {
    pub fn new() -> Self {
        CorrelationStore::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, String> {
        match self.current.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Set the current correlation identifier. The caller owns the lifecycle
    /// of this value until the next Error emission clears it.
    pub fn set(&self, id: impl Into<String>) {
        *self.lock() = id.into();
    }

    /// Current value, or `None` when the store is empty.
    pub fn current(&self) -> Option<String> {
        let guard = self.lock();
        if guard.is_empty() {
            None
        } else {
            Some(guard.clone())
        }
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Resolve the identifier for a record being built: the stored value if
    /// non-empty, else `fallback` (a framework-supplied trace identifier),
    /// else a fresh identifier. The flag is true only for the synthesized
    /// case.
    pub fn resolve(&self, fallback: Option<&str>) -> (String, bool) {
        if let Some(current) = self.current() {
            return (current, false);
        }
        match fallback {
            Some(id) if !id.is_empty() => (id.to_string(), false),
            _ => (Uuid::new_v4().to_string(), true),
        }
    }
}
