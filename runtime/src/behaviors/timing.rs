//! Performance-measurement behavior.

use async_trait::async_trait;
use metrics::histogram;
use relay_core::{Behavior, DispatchResult, Inner, Request, RequestContext};
use std::time::{Duration, Instant};

/// Measures handler cost and records it as a
/// `relay_handler_duration_seconds` histogram labeled with the request
/// name.
///
/// Placed near the handler (registered early, so it runs as one of the
/// innermost layers) to measure actual handler cost rather than
/// cross-cutting overhead. Calls slower than the configured threshold are
/// additionally logged at warn level.
#[derive(Debug, Clone)]
pub struct TimingBehavior {
    slow_threshold: Duration,
}

impl Default for TimingBehavior {
    fn default() -> Self {
        Self {
            slow_threshold: Duration::from_millis(250),
        }
    }
}

impl TimingBehavior {
    /// Set the duration above which a call is logged as slow.
    #[must_use]
    pub const fn with_slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = threshold;
        self
    }
}

#[async_trait]
impl<R: Request> Behavior<R> for TimingBehavior {
    fn name(&self) -> &'static str {
        "timing"
    }

    async fn handle(
        &self,
        request: R,
        ctx: &RequestContext,
        next: &dyn Inner<R>,
    ) -> DispatchResult<R::Response> {
        let started = Instant::now();
        let result = next.call(request, ctx).await;
        let elapsed = started.elapsed();

        histogram!("relay_handler_duration_seconds", "request" => R::name())
            .record(elapsed.as_secs_f64());

        if elapsed >= self.slow_threshold {
            tracing::warn!(
                request = R::name(),
                correlation_id = %ctx.correlation_id(),
                elapsed_ms = elapsed.as_millis() as u64,
                "slow handler"
            );
        }

        result
    }
}
