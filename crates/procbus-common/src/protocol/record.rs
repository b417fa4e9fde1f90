use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Liveness window for process records.
///
/// A record is active iff its last heartbeat is strictly within this window.
// TODO: make the liveness window configurable instead of a fixed constant.
pub const HEARTBEAT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// One capability a process can serve remotely.
///
/// Lifecycle-only capabilities (start/tick/fixed-tick) are never advertised
/// and never remotely invocable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComponentDescriptor {
    pub type_name: String,
    pub interfaces: Vec<String>,
}

/// Registry entry for one live process.
///
/// Keyed by `endpoint` in the registry; re-registration overwrites the whole
/// record. Records are never explicitly deleted — staleness is filtering at
/// read time via [`ProcessRecord::is_active`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessRecord {
    pub process_id: u32,
    pub process_name: String,
    pub endpoint: String,
    pub last_heartbeat: DateTime<Utc>,
    pub components: Vec<ComponentDescriptor>,
}

impl ProcessRecord {
    /// Whether this record's last heartbeat falls strictly within the
    /// liveness window as of `now`.
    ///
    /// The boundary is exact: just under 30s is active, exactly 30s is not.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        let window = Duration::seconds(HEARTBEAT_TIMEOUT.as_secs() as i64);
        now.signed_duration_since(self.last_heartbeat) < window
    }

    /// Whether any advertised component matches the capability name, either
    /// as its concrete type or one of its interfaces.
    pub fn advertises(&self, capability: &str) -> bool {
        self.components.iter().any(|c| {
            c.type_name == capability || c.interfaces.iter().any(|i| i == capability)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(last_heartbeat: DateTime<Utc>) -> ProcessRecord {
        ProcessRecord {
            process_id: 42,
            process_name: "worker".to_string(),
            endpoint: "procbus-42".to_string(),
            last_heartbeat,
            components: vec![ComponentDescriptor {
                type_name: "demo::TaskWorker".to_string(),
                interfaces: vec!["demo::TaskService".to_string()],
            }],
        }
    }

    #[test]
    fn test_active_just_under_window() {
        let now = Utc::now();
        let r = record(now - Duration::milliseconds(29_999));
        assert!(r.is_active(now));
    }

    #[test]
    fn test_inactive_at_window_boundary() {
        let now = Utc::now();
        let r = record(now - Duration::seconds(30));
        assert!(!r.is_active(now));
    }

    #[test]
    fn test_inactive_past_window() {
        let now = Utc::now();
        let r = record(now - Duration::seconds(31));
        assert!(!r.is_active(now));
    }

    #[test]
    fn test_advertises_by_type_and_interface() {
        let r = record(Utc::now());
        assert!(r.advertises("demo::TaskWorker"));
        assert!(r.advertises("demo::TaskService"));
        assert!(!r.advertises("demo::Other"));
    }

    #[test]
    fn test_record_round_trip() {
        let r = record(Utc::now());
        let json = serde_json::to_string(&r).unwrap();
        let decoded: ProcessRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(r, decoded);
    }
}
