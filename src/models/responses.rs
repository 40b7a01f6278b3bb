//! Response DTOs for the image cache API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::CacheStats;
use crate::preload::BatchOutcome;

/// Response body for `POST /resolve`
#[derive(Debug, Clone, Serialize)]
pub struct ResolveResponse {
    /// The requested URL, as given
    pub url: Option<String>,
    /// What to render: the cached value, or the source URL after a failed load
    pub resolved: Option<String>,
}

impl ResolveResponse {
    pub fn new(url: Option<String>, resolved: Option<String>) -> Self {
        Self { url, resolved }
    }
}

/// Response body for a listing preload
#[derive(Debug, Clone, Serialize)]
pub struct PreloadResponse {
    pub listing: String,
    /// Present when the preload ran to completion before answering
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<BatchOutcome>,
    /// Present when the preload was scheduled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_delay_ms: Option<u64>,
}

impl PreloadResponse {
    pub fn scheduled(listing: impl Into<String>, start_delay_ms: u64) -> Self {
        Self {
            listing: listing.into(),
            outcome: None,
            start_delay_ms: Some(start_delay_ms),
        }
    }

    pub fn completed(listing: impl Into<String>, outcome: BatchOutcome) -> Self {
        Self {
            listing: listing.into(),
            outcome: Some(outcome),
            start_delay_ms: None,
        }
    }
}

/// Response body for `DELETE /listings/{id}`
#[derive(Debug, Clone, Serialize)]
pub struct TeardownResponse {
    pub listing: String,
    /// Whether the listing had a preloader to tear down
    pub removed: bool,
}

/// Response body for the memory cache stats endpoint
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: CacheStats,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl From<CacheStats> for StatsResponse {
    fn from(stats: CacheStats) -> Self {
        let hit_rate = stats.hit_rate();
        Self { stats, hit_rate }
    }
}

/// Response body for the clear endpoints
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    pub message: String,
    /// Entries removed, when the clear ran synchronously
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleared: Option<usize>,
}

impl ClearResponse {
    pub fn cleared(count: usize) -> Self {
        Self {
            message: format!("{count} entries cleared"),
            cleared: Some(count),
        }
    }

    pub fn queued() -> Self {
        Self {
            message: "Clear requested".to_string(),
            cleared: None,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_response_serialize() {
        let resp = ResolveResponse::new(None, None);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json, json!({"url": null, "resolved": null}));
    }

    #[test]
    fn test_preload_response_shapes() {
        let scheduled = serde_json::to_value(PreloadResponse::scheduled("l1", 100)).unwrap();
        assert_eq!(scheduled, json!({"listing": "l1", "start_delay_ms": 100}));

        let done = PreloadResponse::completed(
            "l1",
            BatchOutcome::Skipped {
                marker: "1-2".to_string(),
            },
        );
        let done = serde_json::to_value(done).unwrap();
        assert_eq!(done["outcome"]["status"], "skipped");
        assert!(done.get("start_delay_ms").is_none());
    }

    #[test]
    fn test_stats_response_flattens_counters() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        let json = serde_json::to_value(StatsResponse::from(stats)).unwrap();
        assert_eq!(json["hits"], 3);
        assert!((json["hit_rate"].as_f64().unwrap() - 0.75).abs() < 0.001);
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy();
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }
}
