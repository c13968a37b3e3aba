use std::sync::Mutex;

/// Performs client-side redirects on behalf of the gate.
pub trait Navigator: Send + Sync {
    fn redirect(&self, route: &str);
}

/// Records redirects instead of performing them. Useful for headless
/// clients that report where the visitor would have been sent.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    redirects: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn redirects(&self) -> Vec<String> {
        self.redirects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.redirects.lock().unwrap_or_else(|poisoned| poisoned.into_inner()))
    }
}

impl Navigator for RecordingNavigator {
    fn redirect(&self, route: &str) {
        tracing::debug!("Redirecting to {}", route);
        self.redirects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(route.to_string());
    }
}
