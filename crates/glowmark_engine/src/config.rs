//! Engine timing and batching knobs.

use std::time::Duration;

/// Tunable delays and batch sizes for the sync engine.
///
/// Defaults match the hosted service's pacing expectations; tests shrink
/// the delays to zero.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Delay between init polls while the server prepares the export.
    pub poll_delay: Duration,
    /// Delay between download pages in cursor mode.
    pub page_delay: Duration,
    /// How many queued note ids a refresh pass drains at once.
    pub refresh_batch: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_delay: Duration::from_secs(3),
            page_delay: Duration::from_secs(5),
            refresh_batch: 6,
        }
    }
}

impl EngineConfig {
    /// Sets the delay between init polls.
    pub fn with_poll_delay(mut self, delay: Duration) -> Self {
        self.poll_delay = delay;
        self
    }

    /// Sets the delay between download pages.
    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    /// Sets the refresh drain batch size.
    pub fn with_refresh_batch(mut self, batch: usize) -> Self {
        self.refresh_batch = batch;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_service_pacing() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.poll_delay, Duration::from_secs(3));
        assert_eq!(cfg.page_delay, Duration::from_secs(5));
        assert_eq!(cfg.refresh_batch, 6);
    }

    #[test]
    fn builder_overrides() {
        let cfg = EngineConfig::default()
            .with_poll_delay(Duration::ZERO)
            .with_page_delay(Duration::ZERO)
            .with_refresh_batch(2);
        assert_eq!(cfg.poll_delay, Duration::ZERO);
        assert_eq!(cfg.refresh_batch, 2);
    }
}
