// Change events delivered by the multiplexer
//
// A ChangeEvent is the translated form of a raw transport event: tagged with
// the category derived from its table, carrying the row snapshots the
// transport supplied. Events are transient and never persisted.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::category::EventCategory;

/// A row snapshot as delivered by the change-stream transport.
pub type Row = serde_json::Map<String, Value>;

/// Row-level operation reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

/// A change event routed to subscribers.
///
/// `before` is present on updates and deletes, `after` on inserts and
/// updates; deletes carry no `after` snapshot.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub category: EventCategory,
    pub op: ChangeOp,
    pub before: Option<Row>,
    pub after: Option<Row>,
}

impl ChangeEvent {
    /// The row snapshot to read display data from: `after`, falling back to
    /// `before` on deletes.
    pub fn row(&self) -> Option<&Row> {
        self.after.as_ref().or(self.before.as_ref())
    }

    /// A field from [`ChangeEvent::row`].
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.row().and_then(|row| row.get(name))
    }

    /// A string field from [`ChangeEvent::row`].
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(Value::as_str)
    }

    /// A UUID field from [`ChangeEvent::row`].
    pub fn uuid_field(&self, name: &str) -> Option<Uuid> {
        self.str_field(name).and_then(|s| Uuid::parse_str(s).ok())
    }
}
