// Notification categories, per-user preference flags, and record shapes
//
// Only a subset of domain events is user-preference-gated. Each
// notification category maps to exactly one boolean preference flag; the
// two claim verdicts share one flag, since a user opts into claim
// decisions, not into a particular verdict.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user-preference-gated notification category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    VenueHoursUpdate,
    KitchenHoursUpdate,
    HappyHoursUpdate,
    DailySpecialUpdate,
    EventCreated,
    EventUpdated,
    ClaimApproved,
    ClaimRejected,
}

impl NotificationCategory {
    /// The persisted `type` column value.
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationCategory::VenueHoursUpdate => "venue_hours_update",
            NotificationCategory::KitchenHoursUpdate => "kitchen_hours_update",
            NotificationCategory::HappyHoursUpdate => "happy_hours_update",
            NotificationCategory::DailySpecialUpdate => "daily_special_update",
            NotificationCategory::EventCreated => "event_created",
            NotificationCategory::EventUpdated => "event_updated",
            NotificationCategory::ClaimApproved => "claim_approved",
            NotificationCategory::ClaimRejected => "claim_rejected",
        }
    }

    /// The preference flag gating this category.
    pub fn preference(self) -> PreferenceFlag {
        match self {
            NotificationCategory::VenueHoursUpdate => PreferenceFlag::VenueHours,
            NotificationCategory::KitchenHoursUpdate => PreferenceFlag::KitchenHours,
            NotificationCategory::HappyHoursUpdate => PreferenceFlag::HappyHours,
            NotificationCategory::DailySpecialUpdate => PreferenceFlag::DailySpecials,
            NotificationCategory::EventCreated => PreferenceFlag::EventCreated,
            NotificationCategory::EventUpdated => PreferenceFlag::EventUpdated,
            NotificationCategory::ClaimApproved | NotificationCategory::ClaimRejected => {
                PreferenceFlag::ClaimDecisions
            }
        }
    }
}

impl std::fmt::Display for NotificationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One boolean column on the `notification_preferences` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreferenceFlag {
    VenueHours,
    KitchenHours,
    HappyHours,
    DailySpecials,
    EventCreated,
    EventUpdated,
    ClaimDecisions,
}

impl PreferenceFlag {
    pub fn column(self) -> &'static str {
        match self {
            PreferenceFlag::VenueHours => "venue_hours",
            PreferenceFlag::KitchenHours => "kitchen_hours",
            PreferenceFlag::HappyHours => "happy_hours",
            PreferenceFlag::DailySpecials => "daily_specials",
            PreferenceFlag::EventCreated => "event_created",
            PreferenceFlag::EventUpdated => "event_updated",
            PreferenceFlag::ClaimDecisions => "claim_decisions",
        }
    }
}

/// Per-user notification preference flags.
///
/// The default is fully opted out. A user with no preference row is treated
/// as opted out of every category, on every resolution path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPrefs {
    pub venue_hours: bool,
    pub kitchen_hours: bool,
    pub happy_hours: bool,
    pub daily_specials: bool,
    pub event_created: bool,
    pub event_updated: bool,
    pub claim_decisions: bool,
}

impl NotificationPrefs {
    /// Fully opted in; used by tests and the preference-settings default
    /// offered at signup.
    pub fn all_enabled() -> Self {
        Self {
            venue_hours: true,
            kitchen_hours: true,
            happy_hours: true,
            daily_specials: true,
            event_created: true,
            event_updated: true,
            claim_decisions: true,
        }
    }

    /// Whether this user receives notifications of the given category.
    pub fn allows(&self, category: NotificationCategory) -> bool {
        match category.preference() {
            PreferenceFlag::VenueHours => self.venue_hours,
            PreferenceFlag::KitchenHours => self.kitchen_hours,
            PreferenceFlag::HappyHours => self.happy_hours,
            PreferenceFlag::DailySpecials => self.daily_specials,
            PreferenceFlag::EventCreated => self.event_created,
            PreferenceFlag::EventUpdated => self.event_updated,
            PreferenceFlag::ClaimDecisions => self.claim_decisions,
        }
    }
}

/// The entity a notification points back at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelatedEntityType {
    Venue,
    Event,
    Brewery,
    Claim,
}

impl RelatedEntityType {
    pub fn as_str(self) -> &'static str {
        match self {
            RelatedEntityType::Venue => "venue",
            RelatedEntityType::Event => "event",
            RelatedEntityType::Brewery => "brewery",
            RelatedEntityType::Claim => "claim",
        }
    }
}

/// A notification record to be written by the fan-out engine.
///
/// Immutable once written; only the read flag changes afterwards, and that
/// is owned by the feed UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub category: NotificationCategory,
    pub content: String,
    pub related_entity_id: Uuid,
    pub related_entity_type: RelatedEntityType,
}
