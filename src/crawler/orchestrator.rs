//! Run orchestration across client identities
//!
//! Every configured client runs as an independent crawler instance. A run
//! starts all of them at once and finishes when the last one settles; the
//! orchestrator then waits for the next scheduled tick.

use crate::config::Config;
use crate::crawler::coordinator::CrawlerInstance;
use crate::output::{log_summary, RecordSink, RunSummary};
use crate::WarmError;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// Owns the crawler instances and runs them on a fixed schedule
pub struct Orchestrator {
    instances: Vec<Arc<CrawlerInstance>>,
    period: Duration,
}

impl Orchestrator {
    /// Builds one crawler instance per configured client
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    /// * `sink` - Destination for the rows of every instance
    ///
    /// # Returns
    ///
    /// * `Ok(Orchestrator)` - All instances were created
    /// * `Err(WarmError)` - An instance could not be created
    pub fn new(config: Config, sink: Arc<dyn RecordSink>) -> Result<Self, WarmError> {
        let period = config.crawler.schedule_interval();
        let config = Arc::new(config);

        let instances = config
            .clients
            .iter()
            .map(|client| {
                CrawlerInstance::new(Arc::clone(&config), client, Arc::clone(&sink)).map(Arc::new)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { instances, period })
    }

    pub fn instances(&self) -> &[Arc<CrawlerInstance>] {
        &self.instances
    }

    /// Time between the start of two scheduled runs
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Runs every instance once, concurrently
    ///
    /// Each instance runs in its own task; a panicking instance is logged and
    /// left out of the result without affecting the others.
    ///
    /// # Returns
    ///
    /// The client name and run summary of every instance that completed.
    pub async fn run_once(&self) -> Vec<(String, RunSummary)> {
        tracing::info!(
            "Starting cache warming run with {} client(s)",
            self.instances.len()
        );

        let handles: Vec<_> = self
            .instances
            .iter()
            .map(|instance| {
                let instance = Arc::clone(instance);
                let name = instance.name().to_string();
                (name, tokio::spawn(async move { instance.run().await }))
            })
            .collect();

        let mut summaries = Vec::with_capacity(handles.len());
        for (name, handle) in handles {
            match handle.await {
                Ok(summary) => {
                    log_summary(&name, &summary);
                    summaries.push((name, summary));
                }
                Err(e) => {
                    let error = WarmError::Task(e.to_string());
                    tracing::error!("[{}] {}", name, error);
                }
            }
        }

        tracing::info!("Cache warming run completed");
        summaries
    }

    /// Runs forever: once immediately, then once per period
    ///
    /// A run that overruns the period delays the next one rather than
    /// starting a burst of catch-up runs.
    pub async fn run_forever(&self) {
        let mut ticker = tokio::time::interval(self.period.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.run_once().await;
            tracing::info!("Next run in {:?}", self.period);
        }
    }
}
