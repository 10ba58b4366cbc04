//! Tick callback that logs face geometry.

use epithel_core::TickCallback;
use epithel_types::{ElementKind, Tissue};
use tracing::{debug, info};

/// Logs the total face area after each tick.
#[derive(Debug, Default)]
pub struct AreaLogger {
    initial: Option<f64>,
    last: Option<f64>,
}

impl AreaLogger {
    /// Create a logger with no area observed yet.
    pub const fn new() -> Self {
        Self {
            initial: None,
            last: None,
        }
    }

    /// Total face area seen at the last tick.
    pub const fn last_area(&self) -> Option<f64> {
        self.last
    }

    /// Ratio of the last observed area to the first one.
    pub const fn shrinkage(&self) -> Option<f64> {
        match (self.initial, self.last) {
            (Some(initial), Some(last)) if initial > 0.0 => Some(last / initial),
            _ => None,
        }
    }
}

/// Sum of the `area` column of the face table, if present.
fn total_area(tissue: &Tissue) -> Option<f64> {
    let faces = tissue.dataset(ElementKind::Face)?;
    faces.floats("area").ok().map(|areas| areas.iter().sum())
}

impl TickCallback for AreaLogger {
    fn on_tick(&mut self, tick: u64, executed: usize, tissue: &Tissue) {
        let Some(area) = total_area(tissue) else {
            debug!(tick, "Face area unavailable");
            return;
        };
        if self.initial.is_none() {
            self.initial = Some(area);
        }
        self.last = Some(area);
        info!(tick, executed, total_area = area, "Tick complete");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use epithel_types::three_faces_sheet;

    use super::*;

    #[test]
    fn records_first_and_last_area() {
        let sheet = three_faces_sheet().unwrap();
        let mut logger = AreaLogger::new();
        assert!(logger.shrinkage().is_none());

        logger.on_tick(0, 1, &sheet);
        logger.on_tick(1, 3, &sheet);

        let area = logger.last_area().unwrap();
        assert!(area > 2.0);
        assert!((logger.shrinkage().unwrap() - 1.0).abs() < 1e-12);
    }
}
