use log::{debug, info, warn};

/// Thin front over the `log` facade that tags messages with a component name.
pub struct LogManager {
    component: &'static str,
}

impl LogManager {
    pub fn new(component: &'static str) -> Self {
        Self { component }
    }

    pub fn record(&self, message: &str) {
        info!("{}: {}", self.component, message);
    }

    pub fn detail(&self, message: &str) {
        debug!("{}: {}", self.component, message);
    }

    pub fn warn(&self, message: &str) {
        warn!("{}: {}", self.component, message);
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new("iqwave")
    }
}
