//! Background scheduling
//!
//! Periodic jobs run on their own tokio tasks and never block request
//! handling: ICD-11 token refresh, ICD-11 catalog sync and (optionally)
//! automatic mapping generation.

use crate::state::AppState;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Spawn `job` every `period`, starting after one full period
fn spawn_interval<F, Fut>(name: &'static str, period: Duration, job: F) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(job = name, period_secs = period.as_secs(), "Scheduled background job");
        loop {
            ticker.tick().await;
            tracing::debug!(job = name, "Running background job");
            job().await;
        }
    })
}

/// Start all periodic jobs enabled by configuration
pub fn start_scheduler(state: &AppState) -> Vec<JoinHandle<()>> {
    let scheduler = &state.config.scheduler;
    let mut handles = Vec::new();

    if state.icd11.is_enabled() {
        let client = state.icd11.clone();
        handles.push(spawn_interval(
            "icd11_token_refresh",
            Duration::from_secs(scheduler.token_refresh_interval_seconds),
            move || {
                let client = client.clone();
                async move {
                    // failures are logged by the client and the slot is cleared
                    let _ = client.refresh_token().await;
                }
            },
        ));

        let client = state.icd11.clone();
        handles.push(spawn_interval(
            "icd11_sync",
            Duration::from_secs(scheduler.icd11_sync_interval_seconds),
            move || {
                let client = client.clone();
                async move {
                    client.sync_all().await;
                }
            },
        ));
    } else {
        tracing::info!("ICD-11 API disabled, skipping token refresh and sync jobs");
    }

    if let Some(secs) = scheduler.mapping_generation_interval_seconds {
        let generator = state.generator.clone();
        handles.push(spawn_interval(
            "mapping_generation",
            Duration::from_secs(secs),
            move || {
                let generator = generator.clone();
                async move {
                    generator.generate().await;
                }
            },
        ));
    }

    handles
}

/// Fire-and-forget ICD-11 sync used by the admin trigger
pub fn spawn_icd11_sync(state: &AppState) -> JoinHandle<()> {
    let client = state.icd11.clone();
    tokio::spawn(async move {
        client.sync_all().await;
    })
}

/// Initial token fetch so the first scheduled sync has credentials
pub fn spawn_initial_token_fetch(state: &AppState) -> Option<JoinHandle<()>> {
    if !state.icd11.is_enabled() {
        return None;
    }
    let client = state.icd11.clone();
    Some(tokio::spawn(async move {
        let _ = client.refresh_token().await;
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;

    #[tokio::test]
    async fn disabled_icd11_schedules_nothing_by_default() {
        let state = AppState::new(Config::default()).unwrap();
        assert!(start_scheduler(&state).is_empty());
        assert!(spawn_initial_token_fetch(&state).is_none());
    }

    #[tokio::test]
    async fn mapping_generation_job_is_optional() {
        let mut config = Config::default();
        config.scheduler.mapping_generation_interval_seconds = Some(60);
        let state = AppState::new(config).unwrap();
        let handles = start_scheduler(&state);
        assert_eq!(handles.len(), 1);
        for h in handles {
            h.abort();
        }
    }
}
