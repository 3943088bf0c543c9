//! Poll loop. Claims queued sync runs one at a time, drains the queue before
//! sleeping, and periodically sweeps for runs whose worker died mid-flight.

use std::time::Duration as StdDuration;

use time::{Duration, OffsetDateTime};
use tokio::time as tokio_time;

use aula_sync::SyncService;

const POLL_INTERVAL_MS: u64 = 500;
const STALE_SWEEP_INTERVAL_SECONDS: i64 = 30;

pub async fn run_worker(service: SyncService) -> color_eyre::Result<()> {
	let mut last_sweep = OffsetDateTime::now_utc();

	tracing::info!("Sync worker started.");

	loop {
		let now = OffsetDateTime::now_utc();

		if now - last_sweep >= Duration::seconds(STALE_SWEEP_INTERVAL_SECONDS) {
			if let Err(err) = service.recover_stale_runs().await {
				tracing::error!(error = %err, "Stale run recovery failed.");
			} else {
				last_sweep = now;
			}
		}

		match service.process_next_run().await {
			Ok(Some(outcome)) => {
				tracing::debug!(run_id = %outcome.run_id, status = outcome.status.as_str(), "Run settled.");

				// More runs may be queued behind this one.
				continue;
			},
			Ok(None) => {},
			Err(err) => {
				tracing::error!(error = %err, "Sync run processing failed.");
			},
		}

		tokio_time::sleep(StdDuration::from_millis(POLL_INTERVAL_MS)).await;
	}
}
