//! Service counters. Recorded through OpenTelemetry with the `metrics`
//! feature, no-ops otherwise.

#[cfg(feature = "metrics")]
use toto_core::metrics::ServiceMeters;

#[derive(Clone, Default)]
pub struct Meters {
    #[cfg(feature = "metrics")]
    inner: ServiceMeters,
}

impl Meters {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(feature = "metrics")]
    fn add(counter: &opentelemetry::metrics::Counter<u64>, n: usize) {
        counter.add(u64::try_from(n).unwrap_or(u64::MAX), &[]);
    }

    pub fn viewer_joined(&self) {
        #[cfg(feature = "metrics")]
        Self::add(&self.inner.viewer_joins, 1);
    }

    pub fn viewer_left(&self) {
        #[cfg(feature = "metrics")]
        Self::add(&self.inner.viewer_leaves, 1);
    }

    pub fn chat_message(&self) {
        #[cfg(feature = "metrics")]
        Self::add(&self.inner.chat_messages, 1);
    }

    pub fn presence_expired(&self, n: usize) {
        #[cfg(feature = "metrics")]
        Self::add(&self.inner.presence_expired, n);
        #[cfg(not(feature = "metrics"))]
        let _ = n;
    }

    pub fn watchers_reconciled(&self, n: usize) {
        #[cfg(feature = "metrics")]
        Self::add(&self.inner.watchers_reconciled, n);
        #[cfg(not(feature = "metrics"))]
        let _ = n;
    }
}
