use crate::publish_pipeline::PublishPipeline;
use crate::types::Route;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

/// Drives one device through its route until shutdown.
///
/// The route is traversed as a fixed cycle: no randomization, no skipping,
/// no backoff. A failed publish (swallowed inside the pipeline) affects
/// neither the cursor nor the schedule.
pub struct RouteSimulator {
    pipeline: PublishPipeline,
    route: Route,
    interval: Duration,
}

impl RouteSimulator {
    pub fn new(pipeline: PublishPipeline, route: Route, interval: Duration) -> Self {
        Self {
            pipeline,
            route,
            interval,
        }
    }

    /// Publish the sample under the cursor, wait one interval, advance the
    /// cursor, forever. Returns only when `shutdown` is cancelled.
    #[instrument(
        name = "route_simulator",
        skip_all,
        fields(client_id = %self.pipeline.client_id())
    )]
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(
            samples = self.route.len(),
            interval_secs = self.interval.as_secs_f64(),
            "starting route simulator"
        );

        let mut cursor = 0usize;
        loop {
            if shutdown.is_cancelled() {
                break;
            }

            let sample = self.route.sample(cursor);
            self.pipeline.publish_update(&sample).await;

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }

            cursor = (cursor + 1) % self.route.len();
        }

        debug!("closing session");
        self.pipeline.shutdown().await;
        info!("route simulator stopped");
    }
}
