//! Dashboard statistics

use serde::{Deserialize, Serialize};

/// Counters shown on the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_reservations: u64,
    pub upcoming_reservations: u64,
    pub band_count: u64,
}
