//! `/health` endpoint.

use std::time::Instant;

use serde::Serialize;

use crate::sse::LifecycleSupervisor;

/// Overall server state reported by `/health`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Accepting new streams.
    Ok,
    /// Refusing new streams; existing ones are being closed.
    ShuttingDown,
}

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// `ok`, or `shutting_down` once new streams are refused.
    pub status: HealthStatus,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Streams currently registered.
    pub active_sessions: usize,
    /// Streams torn down since start.
    pub teardowns: u64,
}

/// Snapshot `supervisor`'s stream counters.
pub fn health_check(start_time: Instant, supervisor: &LifecycleSupervisor) -> HealthResponse {
    let status = if supervisor.is_shutting_down() {
        HealthStatus::ShuttingDown
    } else {
        HealthStatus::Ok
    };
    HealthResponse {
        status,
        uptime_secs: start_time.elapsed().as_secs(),
        active_sessions: supervisor.registry().len(),
        teardowns: supervisor.teardowns(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sse::test_support::{EchoConsumer, FixedIds, factory};
    use crate::sse::{CloseReason, HandleOptions, SessionRegistry};
    use std::sync::Arc;
    use std::time::Duration;

    fn supervisor() -> Arc<LifecycleSupervisor> {
        Arc::new(LifecycleSupervisor::new(
            Arc::new(SessionRegistry::new()),
            Arc::new(FixedIds::new(["a", "b"])),
            Arc::new(factory(Arc::new(EchoConsumer))),
            HandleOptions::default(),
            "/mcp-messages",
        ))
    }

    #[test]
    fn counts_sessions_and_teardowns() {
        let sup = supervisor();
        let _a = sup.open().unwrap();
        let _b = sup.open().unwrap();
        assert!(sup.close("b", CloseReason::TransportError));

        let resp = health_check(Instant::now(), &sup);
        assert_eq!(resp.status, HealthStatus::Ok);
        assert_eq!(resp.active_sessions, 1);
        assert_eq!(resp.teardowns, 1);
        assert!(resp.uptime_secs < 2);
    }

    #[test]
    fn uptime_from_start() {
        let start = Instant::now().checked_sub(Duration::from_secs(60)).unwrap();
        assert!(health_check(start, &supervisor()).uptime_secs >= 59);
    }

    #[test]
    fn reports_shutdown() {
        let sup = supervisor();
        let _ = sup.shutdown();
        let parsed = serde_json::to_value(health_check(Instant::now(), &sup)).unwrap();
        assert_eq!(parsed["status"], "shutting_down");
        assert_eq!(parsed["active_sessions"], 0);
        assert!(parsed["uptime_secs"].is_number());
    }
}
