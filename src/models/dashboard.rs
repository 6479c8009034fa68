use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BoardCount {
    pub board: String,
    pub count: usize,
    /// Share of the active cards, 0–100.
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PeriodComparison {
    pub current: usize,
    pub previous: usize,
    /// Percentage change; `None` when the previous period is empty.
    pub growth: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_active: usize,
    pub total_completed: usize,
    pub total_cancelled: usize,
    pub total_trashed: usize,
    /// Completed share of all finalized cards, 0–100.
    pub completion_rate: f64,
    pub boards: Vec<BoardCount>,
    pub created: PeriodComparison,
    pub completed: PeriodComparison,
    pub pending_items_total: usize,
    pub pending_items_completed: usize,
    /// Completed share of the pending items of active cards, 0–100.
    pub pending_items_rate: f64,
    pub revision: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    pub value: String,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Breakdown {
    pub field: String,
    pub total: usize,
    pub buckets: Vec<Bucket>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthBucket {
    /// `YYYY-MM`
    pub month: String,
    pub created: usize,
    pub completed: usize,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardQuery {
    /// Include finalized cards in breakdowns.
    #[serde(default)]
    pub include_finalized: bool,
    /// Number of months in the timeline (default 6, max 36).
    pub months: Option<u32>,
}
