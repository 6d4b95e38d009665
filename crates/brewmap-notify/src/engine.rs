// Notification fan-out engine
//
// Turns one domain trigger into zero or more per-user notification writes:
// resolve candidates from the relationship sources, deduplicate, fetch
// preferences in one batch, keep only explicit opt-ins, compose content,
// write one batch. Stateless across invocations; delivery is best-effort
// and at-most-once, with no retry queue.

use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use brewmap_core::{
    DisplayNameStore, NewNotification, NotificationCategory, NotificationStore, PreferenceStore,
    RelatedEntityType, RelationshipStore,
};

use crate::error::Result;

/// Which venue-hours field group changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VenueUpdateKind {
    Hours,
    KitchenHours,
}

impl VenueUpdateKind {
    pub fn category(self) -> NotificationCategory {
        match self {
            VenueUpdateKind::Hours => NotificationCategory::VenueHoursUpdate,
            VenueUpdateKind::KitchenHours => NotificationCategory::KitchenHoursUpdate,
        }
    }
}

/// Whether an event trigger is for a newly created or a changed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventChangeKind {
    Created,
    Updated,
}

impl EventChangeKind {
    pub fn category(self) -> NotificationCategory {
        match self {
            EventChangeKind::Created => NotificationCategory::EventCreated,
            EventChangeKind::Updated => NotificationCategory::EventUpdated,
        }
    }
}

/// Outcome of a brewery claim review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimStatus {
    Approved,
    Rejected,
}

impl ClaimStatus {
    pub fn category(self) -> NotificationCategory {
        match self {
            ClaimStatus::Approved => NotificationCategory::ClaimApproved,
            ClaimStatus::Rejected => NotificationCategory::ClaimRejected,
        }
    }
}

/// Counts from one fan-out invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanoutReport {
    /// Distinct candidates resolved from the relationship sources.
    pub candidates: usize,
    /// Candidates whose preference flag for the category is true.
    pub eligible: usize,
    /// Records actually written.
    pub written: usize,
}

/// The fan-out engine. Explicitly constructed with its store seams and
/// passed by reference; it holds no per-invocation state.
pub struct NotificationEngine {
    relationships: Arc<dyn RelationshipStore>,
    preferences: Arc<dyn PreferenceStore>,
    display_names: Arc<dyn DisplayNameStore>,
    notifications: Arc<dyn NotificationStore>,
}

impl NotificationEngine {
    pub fn new(
        relationships: Arc<dyn RelationshipStore>,
        preferences: Arc<dyn PreferenceStore>,
        display_names: Arc<dyn DisplayNameStore>,
        notifications: Arc<dyn NotificationStore>,
    ) -> Self {
        Self {
            relationships,
            preferences,
            display_names,
            notifications,
        }
    }

    /// Venue hours or kitchen hours changed: notify the venue's
    /// favoriters.
    pub async fn notify_venue_update(
        &self,
        venue_id: Uuid,
        kind: VenueUpdateKind,
        content: &str,
    ) -> Result<FanoutReport> {
        let category = kind.category();
        let candidates = self.relationships.venue_favoriters(venue_id).await?;
        let (candidates, recipients) = self.eligible_recipients(category, candidates).await?;
        if recipients.is_empty() {
            return Ok(self.none_eligible(category, candidates));
        }
        let message = self.venue_message(venue_id, content).await?;
        self.write_records(
            category,
            recipients,
            message,
            venue_id,
            RelatedEntityType::Venue,
            candidates,
        )
        .await
    }

    /// Happy hour added, changed, or removed: notify the venue's
    /// favoriters.
    pub async fn notify_happy_hour_update(
        &self,
        venue_id: Uuid,
        content: &str,
    ) -> Result<FanoutReport> {
        let category = NotificationCategory::HappyHoursUpdate;
        let candidates = self.relationships.venue_favoriters(venue_id).await?;
        let (candidates, recipients) = self.eligible_recipients(category, candidates).await?;
        if recipients.is_empty() {
            return Ok(self.none_eligible(category, candidates));
        }
        let message = self.venue_message(venue_id, content).await?;
        self.write_records(
            category,
            recipients,
            message,
            venue_id,
            RelatedEntityType::Venue,
            candidates,
        )
        .await
    }

    /// Daily special added, changed, or removed: notify the venue's
    /// favoriters.
    pub async fn notify_daily_special_update(
        &self,
        venue_id: Uuid,
        content: &str,
    ) -> Result<FanoutReport> {
        let category = NotificationCategory::DailySpecialUpdate;
        let candidates = self.relationships.venue_favoriters(venue_id).await?;
        let (candidates, recipients) = self.eligible_recipients(category, candidates).await?;
        if recipients.is_empty() {
            return Ok(self.none_eligible(category, candidates));
        }
        let message = self.venue_message(venue_id, content).await?;
        self.write_records(
            category,
            recipients,
            message,
            venue_id,
            RelatedEntityType::Venue,
            candidates,
        )
        .await
    }

    /// Event created or updated at a venue.
    ///
    /// Created events go to the venue's favoriters. Updated events go to
    /// the union of the venue's favoriters and the users interested in
    /// this specific event; a user qualifying through both sources still
    /// receives exactly one record.
    pub async fn notify_event_update(
        &self,
        event_id: Uuid,
        venue_id: Uuid,
        kind: EventChangeKind,
        content: &str,
    ) -> Result<FanoutReport> {
        let category = kind.category();
        let mut candidates = self.relationships.venue_favoriters(venue_id).await?;
        if kind == EventChangeKind::Updated {
            candidates.extend(self.relationships.event_interested_users(event_id).await?);
        }
        let (candidates, recipients) = self.eligible_recipients(category, candidates).await?;
        if recipients.is_empty() {
            return Ok(self.none_eligible(category, candidates));
        }
        let message = self.venue_message(venue_id, content).await?;
        self.write_records(
            category,
            recipients,
            message,
            event_id,
            RelatedEntityType::Event,
            candidates,
        )
        .await
    }

    /// A brewery claim was decided: notify the claim's owner, and nobody
    /// else.
    pub async fn notify_claim_status_update(
        &self,
        user_id: Uuid,
        claim_id: Uuid,
        status: ClaimStatus,
        brewery_name: &str,
    ) -> Result<FanoutReport> {
        let category = status.category();
        let (candidates, recipients) =
            self.eligible_recipients(category, vec![user_id]).await?;
        if recipients.is_empty() {
            return Ok(self.none_eligible(category, candidates));
        }
        let message = match status {
            ClaimStatus::Approved => {
                format!("Your claim for {brewery_name} has been approved")
            }
            ClaimStatus::Rejected => {
                format!("Your claim for {brewery_name} was not approved")
            }
        };
        self.write_records(
            category,
            recipients,
            message,
            claim_id,
            RelatedEntityType::Claim,
            candidates,
        )
        .await
    }

    /// Dedup candidates, then keep those whose preference flag for the
    /// category is explicitly true. A user with no preference row is
    /// opted out, on every resolution path.
    async fn eligible_recipients(
        &self,
        category: NotificationCategory,
        mut candidates: Vec<Uuid>,
    ) -> Result<(usize, Vec<Uuid>)> {
        let mut seen = HashSet::new();
        candidates.retain(|id| seen.insert(*id));
        let total = candidates.len();
        if candidates.is_empty() {
            return Ok((0, Vec::new()));
        }
        let prefs = self.preferences.preferences_for(&candidates).await?;
        candidates.retain(|id| prefs.get(id).map(|p| p.allows(category)).unwrap_or(false));
        Ok((total, candidates))
    }

    fn none_eligible(&self, category: NotificationCategory, candidates: usize) -> FanoutReport {
        tracing::debug!(
            category = %category,
            candidates,
            "no eligible recipients, skipping write"
        );
        FanoutReport {
            candidates,
            eligible: 0,
            written: 0,
        }
    }

    /// Prefix the caller's wording with the venue's display name.
    async fn venue_message(&self, venue_id: Uuid, content: &str) -> Result<String> {
        Ok(match self.display_names.venue_name(venue_id).await? {
            Some(name) => format!("{name} {content}"),
            None => format!("A venue you favorited {content}"),
        })
    }

    /// One batched insert for the whole trigger instance.
    async fn write_records(
        &self,
        category: NotificationCategory,
        recipients: Vec<Uuid>,
        content: String,
        related_entity_id: Uuid,
        related_entity_type: RelatedEntityType,
        candidates: usize,
    ) -> Result<FanoutReport> {
        let eligible = recipients.len();
        let records: Vec<NewNotification> = recipients
            .into_iter()
            .map(|user_id| NewNotification {
                user_id,
                category,
                content: content.clone(),
                related_entity_id,
                related_entity_type,
            })
            .collect();
        let written = self.notifications.insert_notifications(records).await?;
        tracing::info!(
            category = %category,
            candidates,
            eligible,
            written,
            "notification fan-out complete"
        );
        Ok(FanoutReport {
            candidates,
            eligible,
            written,
        })
    }
}
