// Typed equality filters for subscriptions
//
// Filter keys are a closed enum rather than arbitrary strings, so a typo in
// a field name is a compile error instead of a subscription that silently
// matches nothing.

use serde_json::Value;

use crate::event::ChangeEvent;

/// The closed set of row fields a subscription may filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKey {
    /// The row's own primary key.
    Id,
    VenueId,
    BreweryId,
    EventId,
    UserId,
    ClaimId,
}

impl FilterKey {
    /// The column name this key compares against.
    pub fn column(self) -> &'static str {
        match self {
            FilterKey::Id => "id",
            FilterKey::VenueId => "venue_id",
            FilterKey::BreweryId => "brewery_id",
            FilterKey::EventId => "event_id",
            FilterKey::UserId => "user_id",
            FilterKey::ClaimId => "claim_id",
        }
    }
}

/// An equality filter over row fields.
///
/// Every clause must match exactly for the event to pass. Matching reads the
/// `after` snapshot, falling back to `before` when `after` is absent (e.g.
/// on delete).
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    clauses: Vec<(FilterKey, String)>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality clause. Values are compared against the JSON field's
    /// string form, so UUIDs and numeric ids both work.
    pub fn eq(mut self, key: FilterKey, value: impl ToString) -> Self {
        self.clauses.push((key, value.to_string()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// True when every clause matches the event's row snapshot.
    pub fn matches(&self, event: &ChangeEvent) -> bool {
        let Some(row) = event.row() else {
            return self.clauses.is_empty();
        };
        self.clauses.iter().all(|(key, expected)| {
            row.get(key.column())
                .map(|value| value_eq(value, expected))
                .unwrap_or(false)
        })
    }
}

fn value_eq(value: &Value, expected: &str) -> bool {
    match value {
        Value::String(s) => s == expected,
        Value::Number(n) => n.to_string() == expected,
        Value::Bool(b) => b.to_string() == expected,
        _ => false,
    }
}
