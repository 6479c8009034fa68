//! Dashboard aggregates, recomputed from a workspace on every request.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc};
use serde_json::Value;

use crate::models::board::BoardKind;
use crate::models::card::Card;
use crate::models::dashboard::{
    BoardCount, Breakdown, Bucket, DashboardSummary, MonthBucket, PeriodComparison,
};
use crate::services::workspace::Workspace;
use crate::services::{BoardError, BoardResult};

pub const EMPTY_BUCKET: &str = "(vazio)";
pub const DEFAULT_MONTHS: u32 = 6;
pub const MAX_MONTHS: u32 = 36;

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 * 1000.0 / whole as f64).round() / 10.0
}

fn growth(current: usize, previous: usize) -> Option<f64> {
    if previous == 0 {
        return None;
    }
    let change = (current as f64 - previous as f64) * 100.0 / previous as f64;
    Some((change * 10.0).round() / 10.0)
}

/// `(year, month)` shifted by `delta` months.
fn shift_month(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let index = year * 12 + month as i32 - 1 + delta;
    (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}

fn month_of(at: &DateTime<Utc>) -> (i32, u32) {
    (at.year(), at.month())
}

fn cards_of_kind(ws: &Workspace, kind: BoardKind) -> Vec<&Card> {
    ws.cards().filter(|c| ws.kind_of(c) == kind).collect()
}

fn compare(cards: &[&Card], at: impl Fn(&Card) -> Option<DateTime<Utc>>, now: DateTime<Utc>) -> PeriodComparison {
    let this_month = month_of(&now);
    let last_month = shift_month(this_month.0, this_month.1, -1);
    let months: Vec<(i32, u32)> = cards.iter().filter_map(|c| at(*c)).map(|t| month_of(&t)).collect();
    let current = months.iter().filter(|m| **m == this_month).count();
    let previous = months.iter().filter(|m| **m == last_month).count();
    PeriodComparison {
        current,
        previous,
        growth: growth(current, previous),
    }
}

pub fn summary(ws: &Workspace, now: DateTime<Utc>) -> DashboardSummary {
    let active: Vec<&Card> = cards_of_kind(ws, BoardKind::Regular);
    let completed = cards_of_kind(ws, BoardKind::Completed);
    let cancelled = cards_of_kind(ws, BoardKind::Cancelled);
    let trashed = cards_of_kind(ws, BoardKind::Trash).len();

    let boards = ws
        .regular_boards()
        .into_iter()
        .map(|b| {
            let count = active.iter().filter(|c| c.board == b.name).count();
            BoardCount {
                board: b.name.clone(),
                count,
                percentage: percentage(count, active.len()),
            }
        })
        .collect();

    let live: Vec<&Card> = ws.cards().filter(|c| ws.kind_of(c) != BoardKind::Trash).collect();
    let items = active.iter().flat_map(|c| c.pending_items.iter());
    let (pending_items_total, pending_items_completed) =
        items.fold((0, 0), |(total, done), item| (total + 1, done + usize::from(item.completed)));

    DashboardSummary {
        total_active: active.len(),
        total_completed: completed.len(),
        total_cancelled: cancelled.len(),
        total_trashed: trashed,
        completion_rate: percentage(completed.len(), completed.len() + cancelled.len()),
        boards,
        created: compare(&live, |c| Some(c.created_at), now),
        completed: compare(&completed, |c| c.completed_at, now),
        pending_items_total,
        pending_items_completed,
        pending_items_rate: percentage(pending_items_completed, pending_items_total),
        revision: ws.revision(),
    }
}

fn bucket_values(value: Option<&Value>) -> Vec<String> {
    match value {
        None | Some(Value::Null) => vec![EMPTY_BUCKET.to_string()],
        Some(Value::String(s)) if s.trim().is_empty() => vec![EMPTY_BUCKET.to_string()],
        Some(Value::String(s)) => vec![s.trim().to_string()],
        Some(Value::Bool(true)) => vec!["Sim".to_string()],
        Some(Value::Bool(false)) => vec!["Não".to_string()],
        Some(Value::Array(items)) if items.is_empty() => vec![EMPTY_BUCKET.to_string()],
        Some(Value::Array(items)) => items.iter().flat_map(|v| bucket_values(Some(v))).collect(),
        Some(other) => vec![other.to_string()],
    }
}

/// Groups cards by the value of one dynamic field. Multiselect values count
/// once per selected option, so percentages may add up past 100.
pub fn breakdown(ws: &Workspace, field: &str, include_finalized: bool) -> BoardResult<Breakdown> {
    let config = ws
        .fields()
        .into_iter()
        .find(|f| f.field_name == field)
        .ok_or_else(|| BoardError::FieldNotFound(field.to_string()))?;

    let cards: Vec<&Card> = ws
        .cards()
        .filter(|c| match ws.kind_of(c) {
            BoardKind::Regular => true,
            BoardKind::Completed | BoardKind::Cancelled => include_finalized,
            BoardKind::Trash => false,
        })
        .collect();

    let mut counts: BTreeMap<String, usize> = config.options.iter().map(|o| (o.clone(), 0)).collect();
    for card in &cards {
        let value = if field == "name" {
            Some(Value::String(card.name.clone()))
        } else {
            card.fields.get(field).cloned()
        };
        for bucket in bucket_values(value.as_ref()) {
            *counts.entry(bucket).or_default() += 1;
        }
    }

    let mut buckets: Vec<Bucket> = counts
        .into_iter()
        .map(|(value, count)| Bucket {
            percentage: percentage(count, cards.len()),
            value,
            count,
        })
        .collect();
    buckets.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));

    Ok(Breakdown {
        field: field.to_string(),
        total: cards.len(),
        buckets,
    })
}

/// Created and completed counts for the last `months` months, oldest first.
pub fn timeline(ws: &Workspace, months: Option<u32>, now: DateTime<Utc>) -> Vec<MonthBucket> {
    let months = months.unwrap_or(DEFAULT_MONTHS).clamp(1, MAX_MONTHS) as i32;
    let (year, month) = month_of(&now);
    let created: Vec<(i32, u32)> = ws
        .cards()
        .filter(|c| ws.kind_of(c) != BoardKind::Trash)
        .map(|c| month_of(&c.created_at))
        .collect();
    let completed: Vec<(i32, u32)> = cards_of_kind(ws, BoardKind::Completed)
        .iter()
        .filter_map(|c| c.completed_at.as_ref().map(month_of))
        .collect();

    (0..months)
        .rev()
        .map(|back| {
            let key = shift_month(year, month, -back);
            MonthBucket {
                month: format!("{:04}-{:02}", key.0, key.1),
                created: created.iter().filter(|m| **m == key).count(),
                completed: completed.iter().filter(|m| **m == key).count(),
            }
        })
        .collect()
}
