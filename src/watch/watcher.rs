use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};
use chrono::Local;
use tracing::{debug, info, warn};

use crate::availability::classify;
use crate::config::secrets::Secrets;
use crate::config::watch_config::WatchConfig;
use crate::error::WatchError;
use crate::market::MarketScope;
use crate::notify::pushover::PushoverNotifier;
use crate::notify::throttle::{NotifyDecision, NotifyMode, NotifyThrottle};
use crate::runpod::gpu_query::{GpuQueryRequest, fetch_gpu_row};
use crate::runpod::runpod_client::RunpodClient;
use crate::watch::cycle::CycleReport;
use crate::watch::state::WatchState;

const NOTIFY_TITLE: &str = "RunPod GPU Available";

/// How a finite watch ended. The endless watch only ever returns an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    AvailableNow,
    NothingAvailable,
}

pub struct Watcher {
    runpod: RunpodClient,
    notifier: Option<PushoverNotifier>,
    throttle: NotifyThrottle,
    state: WatchState,
    targets: Vec<String>,
    markets: Vec<MarketScope>,
    datacenter_id: Option<String>,
    gpu_count: i64,
    refresh: Duration,
    print_on_change_only: bool,
}

impl Watcher {
    /// Wires up the outbound clients, resolves the datacenter scope from the
    /// network volume, reconciles it with an explicit id and validates the
    /// result against the API before the first cycle runs.
    pub async fn initialize(config: &WatchConfig, secrets: &Secrets) -> Result<Watcher> {
        let timeout = config.request_timeout();
        let runpod = RunpodClient::new(&secrets.runpod_api_key, timeout)?;

        // Missing pushover credentials disable alerts, never the watch.
        let notifier = if config.enable_pushover {
            match secrets.pushover_pair() {
                Some((token, user)) => Some(PushoverNotifier::new(
                    token.to_string(),
                    user.to_string(),
                    timeout,
                )?),
                None => {
                    warn!("pushover is enabled but its credentials are missing, alerts disabled");
                    None
                }
            }
        } else {
            None
        };

        let volume_datacenter = match config.volume_id() {
            Some(volume_id) => Some(
                runpod
                    .network_volume_datacenter(volume_id)
                    .await
                    .map_err(|cause| WatchError::ResolutionFailed {
                        volume_id: volume_id.to_string(),
                        cause,
                    })?,
            ),
            None => None,
        };

        let datacenter_id =
            reconcile_datacenter(config.explicit_datacenter_id(), volume_datacenter.as_deref())?;

        if config.explicit_datacenter_id().is_none() {
            if let Some(datacenter_id) = &datacenter_id {
                log_line(&format!("Using dataCenterId: {datacenter_id}"));
                println!();
            }
        }

        let mode = if config.notify_on_availability_change_only {
            NotifyMode::OnStateChange
        } else {
            NotifyMode::Periodic
        };

        let watcher = Watcher {
            runpod,
            notifier,
            throttle: NotifyThrottle::new(
                mode,
                config.state_change_cooldown(),
                config.periodic_cooldown(),
            ),
            state: WatchState::default(),
            targets: config.targets(),
            markets: config.market_mode.scopes(config.volume_id().is_some()),
            datacenter_id,
            gpu_count: config.gpu_count,
            refresh: config.refresh_interval(),
            print_on_change_only: config.print_on_availability_change_only,
        };

        watcher.validate_datacenter().await?;

        Ok(watcher)
    }

    /// The watch loop. With `once` set it runs a single cycle and reports
    /// whether anything was available; otherwise it polls until interrupted.
    pub async fn run(&mut self, once: bool) -> Result<WatchOutcome> {
        loop {
            let report = self.run_cycle().await?;
            let now = Instant::now();

            let state_changed = self.state.state_changed(report.any_available());
            let should_print = once || state_changed || !self.print_on_change_only;

            if should_print {
                for line in report.lines() {
                    log_line(line);
                }
            }

            self.dispatch_notification(&report, now).await;
            self.state.record_cycle(report.any_available());

            if once {
                return Ok(if report.any_available() {
                    WatchOutcome::AvailableNow
                } else {
                    WatchOutcome::NothingAvailable
                });
            }

            if should_print {
                println!();
            }

            debug!(seconds = self.refresh.as_secs(), "sleeping until next cycle");
            tokio::time::sleep(self.refresh).await;
        }
    }

    /// One pass over every watched GPU in every market, in config order. Any
    /// exhausted lookup aborts the cycle and the watch.
    async fn run_cycle(&self) -> Result<CycleReport> {
        let mut report = CycleReport::new(self.header_line());

        for gpu_type_id in &self.targets {
            for scope in &self.markets {
                let request = GpuQueryRequest {
                    gpu_type_id,
                    datacenter_id: self.datacenter_id.as_deref(),
                    scope: *scope,
                    gpu_count: self.gpu_count,
                };

                let row = fetch_gpu_row(&self.runpod, &request).await?;
                let tier = classify(&row);
                debug!(
                    gpu = %row.name,
                    scope = %scope,
                    stock = ?row.stock_status,
                    ?tier,
                    "row classified"
                );
                report.push(*scope, &row, tier);
            }
        }

        Ok(report)
    }

    fn header_line(&self) -> String {
        match &self.datacenter_id {
            Some(datacenter_id) => format!("Checking GPU Pool for {datacenter_id}..."),
            None => "Checking global GPU Pool...".to_string(),
        }
    }

    async fn dispatch_notification(&mut self, report: &CycleReport, now: Instant) {
        let Some(notifier) = &self.notifier else {
            return;
        };

        match self.throttle.decide(&self.state, report.any_available(), now) {
            NotifyDecision::Send => {
                let Some(message) = report.first_available_message() else {
                    return;
                };

                match notifier.send(NOTIFY_TITLE, message).await {
                    Ok(()) => info!(mode = ?self.throttle.mode(), "pushover notification sent"),
                    Err(error) => {
                        warn!("pushover notification failed, not retrying: {error:#}");
                    }
                }

                /* The cooldown runs from the attempt, delivered or not. */
                self.state.record_notified(now);
            }
            NotifyDecision::Skip(reason) => {
                debug!(?reason, "notification skipped");
            }
        }
    }

    /// Probes each market with the first watched GPU to confirm the scoped
    /// lookups return rows at all. A typo'd datacenter id otherwise reports
    /// every GPU as missing forever.
    async fn validate_datacenter(&self) -> Result<()> {
        let Some(datacenter_id) = self.datacenter_id.as_deref() else {
            return Ok(());
        };
        let Some(probe) = self.targets.first() else {
            return Ok(());
        };

        let mut last_error: Option<anyhow::Error> = None;

        for scope in &self.markets {
            let request = GpuQueryRequest {
                gpu_type_id: probe,
                datacenter_id: Some(datacenter_id),
                scope: *scope,
                gpu_count: self.gpu_count,
            };

            match fetch_gpu_row(&self.runpod, &request).await {
                Ok(row) if row.found => return Ok(()),
                Ok(_) => {
                    last_error = Some(anyhow!(
                        "no gpuTypes row for {probe:?} in the {scope} market"
                    ));
                }
                Err(error) => last_error = Some(error.into()),
            }
        }

        let cause = last_error.unwrap_or_else(|| anyhow!("no markets configured"));
        Err(WatchError::Configuration(format!(
            "dataCenterId {datacenter_id:?} failed validation: {cause:#}"
        ))
        .into())
    }
}

/// Explicit configuration wins, a volume-derived id fills the gap, and a
/// disagreement between the two is a configuration error.
fn reconcile_datacenter(
    explicit: Option<&str>,
    resolved: Option<&str>,
) -> Result<Option<String>, WatchError> {
    match (explicit, resolved) {
        (Some(explicit), Some(resolved)) if explicit != resolved => {
            Err(WatchError::Configuration(format!(
                "datacenter_id {explicit:?} disagrees with network volume datacenter {resolved:?}"
            )))
        }
        (Some(explicit), _) => Ok(Some(explicit.to_string())),
        (None, Some(resolved)) => Ok(Some(resolved.to_string())),
        (None, None) => Ok(None),
    }
}

fn log_line(line: &str) {
    println!("{} {line}", Local::now().format("%H:%M:%S"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_datacenter_wins_when_alone() {
        let scope = reconcile_datacenter(Some("EU-RO-1"), None).unwrap();
        assert_eq!(scope.as_deref(), Some("EU-RO-1"));
    }

    #[test]
    fn test_volume_datacenter_fills_the_gap() {
        let scope = reconcile_datacenter(None, Some("US-TX-3")).unwrap();
        assert_eq!(scope.as_deref(), Some("US-TX-3"));
    }

    #[test]
    fn test_agreeing_ids_pass() {
        let scope = reconcile_datacenter(Some("EU-RO-1"), Some("EU-RO-1")).unwrap();
        assert_eq!(scope.as_deref(), Some("EU-RO-1"));
    }

    #[test]
    fn test_disagreeing_ids_are_a_configuration_error() {
        let error = reconcile_datacenter(Some("EU-RO-1"), Some("US-TX-3")).unwrap_err();
        match error {
            WatchError::Configuration(message) => {
                assert!(message.contains("EU-RO-1"));
                assert!(message.contains("US-TX-3"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_no_scope_at_all_watches_globally() {
        assert_eq!(reconcile_datacenter(None, None).unwrap(), None);
    }
}
