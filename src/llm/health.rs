//! Backend health tracking and model discovery.
//!
//! [`BackendHealth`] is a shared up/down flag.  The classifier reads it
//! before every LLM call and fails fast while the backend is down; it also
//! marks the backend down itself when a whole classification chain found it
//! unreachable.  [`HealthMonitor`] polls the backend's model listing on a
//! fixed interval and flips the flag back up once the backend answers.
//!
//! On every successful poll the monitor checks that the configured model is
//! actually served and switches to the closest match if it is not
//! ([`select_model`]).  Selection always starts from the configured name, so
//! a fallback model is dropped again once the configured one is back.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::llm::client::LlmClient;

// ---------------------------------------------------------------------------
// BackendHealth
// ---------------------------------------------------------------------------

/// Cheap-to-clone shared health flag.  Starts up.
#[derive(Debug, Clone)]
pub struct BackendHealth(Arc<AtomicBool>);

impl BackendHealth {
    pub fn new(up: bool) -> Self {
        Self(Arc::new(AtomicBool::new(up)))
    }

    pub fn is_up(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Returns `true` when this call changed the state.
    pub fn mark_up(&self) -> bool {
        !self.0.swap(true, Ordering::SeqCst)
    }

    /// Returns `true` when this call changed the state.
    pub fn mark_down(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

impl Default for BackendHealth {
    fn default() -> Self {
        Self::new(true)
    }
}

// ---------------------------------------------------------------------------
// Model discovery
// ---------------------------------------------------------------------------

/// Pick the model to use given the configured name and what the backend
/// serves.
///
/// 1. exact match → configured name;
/// 2. a served model with the same base name (before `:`) → that model;
/// 3. otherwise the first served model.
///
/// `None` when nothing is served.
pub fn select_model(configured: &str, available: &[String]) -> Option<String> {
    if available.iter().any(|m| m == configured) {
        return Some(configured.to_string());
    }
    let base = configured.split(':').next().unwrap_or(configured);
    available
        .iter()
        .find(|m| m.split(':').next() == Some(base))
        .or_else(|| available.first())
        .cloned()
}

// ---------------------------------------------------------------------------
// HealthMonitor
// ---------------------------------------------------------------------------

pub struct HealthMonitor {
    client: Arc<dyn LlmClient>,
    health: BackendHealth,
    interval: Duration,
    /// The client's model at construction.
    configured: String,
}

impl HealthMonitor {
    pub fn new(client: Arc<dyn LlmClient>, health: BackendHealth, interval: Duration) -> Self {
        Self {
            configured: client.model(),
            client,
            health,
            interval: interval.max(Duration::from_millis(10)),
        }
    }

    /// One probe: list models, update the flag, reconcile the model name.
    pub async fn check_once(&self) -> bool {
        match self.client.list_models().await {
            Ok(models) => {
                let current = self.client.model();
                match select_model(&self.configured, &models) {
                    Some(chosen) if chosen != current => {
                        log::warn!(
                            "llm: switching model '{current}' → '{chosen}' (configured '{}')",
                            self.configured
                        );
                        self.client.set_model(&chosen);
                    }
                    Some(_) => {}
                    None => log::warn!("llm: backend serves no models"),
                }
                if self.health.mark_up() {
                    log::info!("llm: backend reachable, full classification resumed");
                }
                true
            }
            Err(e) => {
                if self.health.mark_down() {
                    log::warn!("llm: backend unavailable ({e}), using rule-based fallback");
                } else {
                    log::debug!("llm: health check failed: {e}");
                }
                false
            }
        }
    }

    /// Poll until `cancel` fires.  The first probe runs immediately.
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.check_once().await;
                }
            }
        }
        log::debug!("llm: health monitor stopped");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::MockLlm;
    use crate::llm::LlmError;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn exact_model_is_kept() {
        let served = names(&["phi3", "llama3"]);
        assert_eq!(select_model("llama3", &served).as_deref(), Some("llama3"));
    }

    #[test]
    fn base_name_match_is_preferred() {
        let served = names(&["phi3:mini", "llama3:8b-instruct"]);
        assert_eq!(
            select_model("llama3", &served).as_deref(),
            Some("llama3:8b-instruct")
        );
        assert_eq!(
            select_model("llama3:70b", &served).as_deref(),
            Some("llama3:8b-instruct")
        );
    }

    #[test]
    fn falls_back_to_first_model() {
        let served = names(&["mistral", "phi3"]);
        assert_eq!(select_model("llama3", &served).as_deref(), Some("mistral"));
        assert_eq!(select_model("llama3", &[]), None);
    }

    #[test]
    fn health_transitions_report_changes() {
        let health = BackendHealth::default();
        assert!(health.is_up());
        assert!(health.mark_down());
        assert!(!health.mark_down());
        assert!(health.mark_up());
        assert!(!health.mark_up());
    }

    #[tokio::test]
    async fn check_marks_down_then_up_and_switches_model() {
        let llm = Arc::new(MockLlm::new());
        let health = BackendHealth::default();
        let monitor = HealthMonitor::new(llm.clone(), health.clone(), Duration::from_secs(10));

        llm.set_models(Err(LlmError::Unreachable("refused".into())));
        assert!(!monitor.check_once().await);
        assert!(!health.is_up());

        llm.set_models(Ok(names(&["llama3:latest"])));
        assert!(monitor.check_once().await);
        assert!(health.is_up());
        assert_eq!(llm.model(), "llama3:latest");
    }

    #[tokio::test]
    async fn configured_model_is_restored_when_served_again() {
        let llm = Arc::new(MockLlm::new());
        let configured = llm.model();
        let monitor = HealthMonitor::new(llm.clone(), BackendHealth::default(), Duration::from_secs(10));

        llm.set_models(Ok(names(&["mistral"])));
        monitor.check_once().await;
        assert_eq!(llm.model(), "mistral");

        llm.set_models(Ok(names(&["mistral", configured.as_str()])));
        monitor.check_once().await;
        assert_eq!(llm.model(), configured);
    }

    #[tokio::test]
    async fn run_stops_on_cancel() {
        let llm = Arc::new(MockLlm::new());
        let monitor = HealthMonitor::new(llm, BackendHealth::default(), Duration::from_millis(10));
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(monitor.run(cancel.clone()));
        tokio::time::sleep(Duration::from_millis(30)).await;
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("monitor did not stop")
            .unwrap();
    }
}
