// Event categories and the static category -> table -> channel mapping
//
// Every category maps to exactly one underlying table and one physical
// channel. The mapping is total: a channel serves a fixed, disjoint set of
// categories, and a channel once open must be able to serve any sibling
// category without reopening.

/// A logical event category, identifying which domain table a change event
/// or subscription concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventCategory {
    /// Row changes on the `venues` table.
    VenueUpdated,
    /// Row changes on the `venue_hours` table (regular and kitchen hours).
    VenueHoursUpdated,
    /// Row changes on the `happy_hours` table.
    HappyHourUpdated,
    /// Row changes on the `daily_specials` table.
    DailySpecialUpdated,
    /// Row changes on the `venue_events` table.
    VenueEventsUpdated,
    /// Row changes on the `checkins` table.
    CheckinCreated,
    /// Row changes on the `breweries` table.
    BreweryUpdated,
    /// Row changes on the `brewery_owners` table.
    BreweryOwnersUpdated,
    /// Row changes on the `brewery_claims` table.
    BreweryClaimsUpdated,
    /// Row changes on the `notifications` table (in-app notification feed).
    NotificationReceived,
}

impl EventCategory {
    /// The underlying table this category observes.
    pub fn table(self) -> &'static str {
        match self {
            EventCategory::VenueUpdated => "venues",
            EventCategory::VenueHoursUpdated => "venue_hours",
            EventCategory::HappyHourUpdated => "happy_hours",
            EventCategory::DailySpecialUpdated => "daily_specials",
            EventCategory::VenueEventsUpdated => "venue_events",
            EventCategory::CheckinCreated => "checkins",
            EventCategory::BreweryUpdated => "breweries",
            EventCategory::BreweryOwnersUpdated => "brewery_owners",
            EventCategory::BreweryClaimsUpdated => "brewery_claims",
            EventCategory::NotificationReceived => "notifications",
        }
    }

    /// The physical channel this category is multiplexed onto.
    pub fn channel(self) -> ChannelName {
        match self {
            EventCategory::VenueUpdated
            | EventCategory::VenueHoursUpdated
            | EventCategory::HappyHourUpdated
            | EventCategory::DailySpecialUpdated
            | EventCategory::VenueEventsUpdated
            | EventCategory::CheckinCreated => ChannelName::Venue,
            EventCategory::BreweryUpdated
            | EventCategory::BreweryOwnersUpdated
            | EventCategory::BreweryClaimsUpdated => ChannelName::Brewery,
            EventCategory::NotificationReceived => ChannelName::User,
        }
    }

    /// Inverse of [`EventCategory::table`]. Tables are unique per category,
    /// so this is a total inverse over the mapped tables.
    pub fn from_table(table: &str) -> Option<EventCategory> {
        ChannelName::ALL
            .iter()
            .flat_map(|channel| channel.categories())
            .copied()
            .find(|category| category.table() == table)
    }
}

/// One physical channel on the change-stream transport, multiplexing
/// several event categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelName {
    /// Venue-related tables.
    Venue,
    /// Brewery-related tables.
    Brewery,
    /// User-related tables.
    User,
}

impl ChannelName {
    /// All channels, in a fixed order.
    pub const ALL: [ChannelName; 3] = [ChannelName::Venue, ChannelName::Brewery, ChannelName::User];

    /// The transport-side channel name.
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelName::Venue => "venue-changes",
            ChannelName::Brewery => "brewery-changes",
            ChannelName::User => "user-changes",
        }
    }

    /// The fixed set of categories this channel serves. The sets are
    /// pairwise disjoint and together cover every [`EventCategory`].
    pub fn categories(self) -> &'static [EventCategory] {
        match self {
            ChannelName::Venue => &[
                EventCategory::VenueUpdated,
                EventCategory::VenueHoursUpdated,
                EventCategory::HappyHourUpdated,
                EventCategory::DailySpecialUpdated,
                EventCategory::VenueEventsUpdated,
                EventCategory::CheckinCreated,
            ],
            ChannelName::Brewery => &[
                EventCategory::BreweryUpdated,
                EventCategory::BreweryOwnersUpdated,
                EventCategory::BreweryClaimsUpdated,
            ],
            ChannelName::User => &[EventCategory::NotificationReceived],
        }
    }
}

impl std::fmt::Display for ChannelName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
