// Assistant state: the listing set, highlight, favorites, active page,
// preferences, and drafted messages, mutated by tool actions.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::listing::Listing;
use crate::preferences::Preferences;
use crate::tool_result::{OutgoingMessage, ToolAction};

/// Which listing view is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Page {
    /// All listings from the latest search.
    #[default]
    Listings,
    /// Only listings the user marked as favorite.
    Favorites,
}

impl Page {
    /// Resolve a `navigate_to` target. `home` and `search` are accepted as
    /// aliases for the listings view.
    pub fn from_id(id: &str) -> Option<Page> {
        match id.trim().to_ascii_lowercase().as_str() {
            "listings" | "home" | "search" => Some(Page::Listings),
            "favorites" | "favourites" => Some(Page::Favorites),
            _ => None,
        }
    }

    pub fn id(self) -> &'static str {
        match self {
            Page::Listings => "listings",
            Page::Favorites => "favorites",
        }
    }
}

/// One observable change produced by [`AssistantState::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChange {
    PreferencesChanged,
    ListingsReplaced,
    HighlightChanged,
    FavoritesChanged,
    PageChanged,
    MessageDrafted,
}

/// Everything the assistant has shown or been told during a session.
///
/// Invariant: `highlighted`, when set, names a listing in `listings`.
#[derive(Debug, Clone, Default)]
pub struct AssistantState {
    listings: Vec<Listing>,
    highlighted: Option<String>,
    favorites: BTreeSet<String>,
    page: Page,
    preferences: Preferences,
    outbox: Vec<OutgoingMessage>,
}

impl AssistantState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed state restored from persistent storage.
    pub fn restore(&mut self, preferences: Preferences, favorites: BTreeSet<String>) {
        self.preferences = preferences;
        self.favorites = favorites;
    }

    /// Apply a tool action and report what changed. An empty result means
    /// the action was a no-op.
    pub fn apply(&mut self, action: ToolAction) -> Vec<StateChange> {
        match action {
            ToolAction::UpdatePreferences(update) => {
                let outcome = self.preferences.apply(&update);
                if outcome.changed {
                    info!("Preferences updated");
                    vec![StateChange::PreferencesChanged]
                } else {
                    debug!("Preference update changed nothing");
                    Vec::new()
                }
            }
            ToolAction::ShowListings(listings) => self.replace_listings(listings),
            ToolAction::SendMessage(message) => {
                info!(listing = %message.listing_id, "Drafted message for listing");
                self.outbox.push(message);
                vec![StateChange::MessageDrafted]
            }
            ToolAction::Highlight { listing_id } => self.highlight(&listing_id),
            ToolAction::ToggleFavorite { listing_id } => self.toggle_favorite(&listing_id),
            ToolAction::Navigate { page } => self.navigate(page),
        }
    }

    /// Replace the listing set wholesale and highlight its first entry.
    pub fn replace_listings(&mut self, listings: Vec<Listing>) -> Vec<StateChange> {
        info!("Showing {} listings", listings.len());
        let previous_highlight = self.highlighted.take();
        self.highlighted = listings.first().map(|l| l.id.clone());
        self.listings = listings;

        let mut changes = vec![StateChange::ListingsReplaced];
        if self.highlighted != previous_highlight {
            changes.push(StateChange::HighlightChanged);
        }
        changes
    }

    /// Highlight a listing from the current set. Unknown ids are ignored.
    pub fn highlight(&mut self, listing_id: &str) -> Vec<StateChange> {
        if !self.listings.iter().any(|l| l.id == listing_id) {
            warn!(listing = %listing_id, "Cannot highlight listing that is not shown");
            return Vec::new();
        }
        if self.highlighted.as_deref() == Some(listing_id) {
            return Vec::new();
        }
        self.highlighted = Some(listing_id.to_string());
        vec![StateChange::HighlightChanged]
    }

    /// Add the listing to favorites if absent, remove it if present.
    pub fn toggle_favorite(&mut self, listing_id: &str) -> Vec<StateChange> {
        if !self.favorites.remove(listing_id) {
            self.favorites.insert(listing_id.to_string());
            info!(listing = %listing_id, "Added favorite");
        } else {
            info!(listing = %listing_id, "Removed favorite");
        }
        vec![StateChange::FavoritesChanged]
    }

    pub fn navigate(&mut self, page: Page) -> Vec<StateChange> {
        if self.page == page {
            return Vec::new();
        }
        info!("Navigating to {}", page.id());
        self.page = page;
        vec![StateChange::PageChanged]
    }

    /// Listings for the active page, in result order.
    pub fn visible_listings(&self) -> Vec<&Listing> {
        match self.page {
            Page::Listings => self.listings.iter().collect(),
            Page::Favorites => self
                .listings
                .iter()
                .filter(|l| self.favorites.contains(&l.id))
                .collect(),
        }
    }

    pub fn listings(&self) -> &[Listing] {
        &self.listings
    }

    pub fn highlighted(&self) -> Option<&Listing> {
        let id = self.highlighted.as_deref()?;
        self.listings.iter().find(|l| l.id == id)
    }

    pub fn favorites(&self) -> &BTreeSet<String> {
        &self.favorites
    }

    pub fn is_favorite(&self, listing_id: &str) -> bool {
        self.favorites.contains(listing_id)
    }

    pub fn page(&self) -> Page {
        self.page
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn outbox(&self) -> &[OutgoingMessage] {
        &self.outbox
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::{Feature, PreferencesUpdate, Range};

    fn listing(id: &str) -> Listing {
        Listing::with_id(id)
    }

    fn state_with(ids: &[&str]) -> AssistantState {
        let mut state = AssistantState::new();
        state.apply(ToolAction::ShowListings(ids.iter().map(|id| listing(id)).collect()));
        state
    }

    fn ids(listings: Vec<&Listing>) -> Vec<String> {
        listings.into_iter().map(|l| l.id.clone()).collect()
    }

    #[test]
    fn new_state_is_empty() {
        let state = AssistantState::new();
        assert!(state.listings().is_empty());
        assert!(state.highlighted().is_none());
        assert_eq!(state.page(), Page::Listings);
        assert!(state.preferences().is_empty());
    }

    #[test]
    fn listings_replace_and_highlight_first() {
        let mut state = state_with(&["A", "B", "C"]);
        let changes = state.apply(ToolAction::ShowListings(vec![listing("L1"), listing("L2")]));

        assert_eq!(
            changes,
            vec![StateChange::ListingsReplaced, StateChange::HighlightChanged]
        );
        assert_eq!(ids(state.visible_listings()), vec!["L1", "L2"]);
        assert_eq!(state.highlighted().map(|l| l.id.as_str()), Some("L1"));
    }

    #[test]
    fn empty_result_clears_highlight() {
        let mut state = state_with(&["A"]);
        state.apply(ToolAction::ShowListings(vec![]));
        assert!(state.listings().is_empty());
        assert!(state.highlighted().is_none());
    }

    #[test]
    fn preferences_update_keeps_previous_fields() {
        let mut state = AssistantState::new();
        state.apply(ToolAction::UpdatePreferences(PreferencesUpdate {
            budget: Some(Range::new(700.0, 1100.0)),
            location: Some("Mariahilf".into()),
            ..Default::default()
        }));

        let changes = state.apply(ToolAction::UpdatePreferences(PreferencesUpdate {
            rooms: Some(3),
            ..Default::default()
        }));

        assert_eq!(changes, vec![StateChange::PreferencesChanged]);
        let prefs = state.preferences();
        assert_eq!(prefs.rooms, Some(3));
        assert_eq!(prefs.budget, Some(Range::new(700.0, 1100.0)));
        assert_eq!(prefs.location.as_deref(), Some("Mariahilf"));
    }

    #[test]
    fn unchanged_preferences_report_nothing() {
        let mut state = AssistantState::new();
        let update = PreferencesUpdate {
            rooms: Some(2),
            ..Default::default()
        };
        state.apply(ToolAction::UpdatePreferences(update.clone()));
        assert!(state.apply(ToolAction::UpdatePreferences(update)).is_empty());
    }

    #[test]
    fn favorite_toggles_membership() {
        let mut state = state_with(&["L1", "L2"]);
        let toggle = || ToolAction::ToggleFavorite {
            listing_id: "L1".into(),
        };

        assert_eq!(state.apply(toggle()), vec![StateChange::FavoritesChanged]);
        assert!(state.is_favorite("L1"));

        state.apply(toggle());
        assert!(!state.is_favorite("L1"));
        assert!(state.favorites().is_empty());
    }

    #[test]
    fn favorites_page_filters_listings() {
        let mut state = state_with(&["L1", "L2", "L3"]);
        state.toggle_favorite("L3");
        state.toggle_favorite("L1");

        let changes = state.apply(ToolAction::Navigate {
            page: Page::Favorites,
        });

        assert_eq!(changes, vec![StateChange::PageChanged]);
        assert_eq!(state.page(), Page::Favorites);
        assert_eq!(ids(state.visible_listings()), vec!["L1", "L3"]);
    }

    #[test]
    fn favorites_outside_current_results_are_kept_but_not_shown() {
        let mut state = state_with(&["L1"]);
        state.toggle_favorite("OLD");
        state.navigate(Page::Favorites);
        assert!(state.visible_listings().is_empty());
        assert!(state.is_favorite("OLD"));
    }

    #[test]
    fn navigating_to_current_page_is_a_no_op() {
        let mut state = AssistantState::new();
        assert!(state.navigate(Page::Listings).is_empty());
    }

    #[test]
    fn highlight_requires_shown_listing() {
        let mut state = state_with(&["L1", "L2"]);
        assert_eq!(
            state.apply(ToolAction::Highlight {
                listing_id: "L2".into()
            }),
            vec![StateChange::HighlightChanged]
        );
        assert_eq!(state.highlighted().map(|l| l.id.as_str()), Some("L2"));

        assert!(state
            .apply(ToolAction::Highlight {
                listing_id: "missing".into()
            })
            .is_empty());
        assert_eq!(state.highlighted().map(|l| l.id.as_str()), Some("L2"));
    }

    #[test]
    fn send_message_goes_to_outbox() {
        let mut state = AssistantState::new();
        let message = OutgoingMessage {
            listing_id: "L1".into(),
            contact: None,
            message: "Hello".into(),
        };
        assert_eq!(
            state.apply(ToolAction::SendMessage(message.clone())),
            vec![StateChange::MessageDrafted]
        );
        assert_eq!(state.outbox(), &[message]);
    }

    #[test]
    fn restore_seeds_preferences_and_favorites() {
        let mut prefs = Preferences::default();
        prefs.set_feature(Feature::Garden, true);
        let mut favorites = BTreeSet::new();
        favorites.insert("L9".to_string());

        let mut state = AssistantState::new();
        state.restore(prefs.clone(), favorites);

        assert_eq!(state.preferences(), &prefs);
        assert!(state.is_favorite("L9"));
    }

    #[test]
    fn page_ids_resolve() {
        assert_eq!(Page::from_id("favorites"), Some(Page::Favorites));
        assert_eq!(Page::from_id(" Home "), Some(Page::Listings));
        assert_eq!(Page::from_id("settings"), None);
        for page in [Page::Listings, Page::Favorites] {
            assert_eq!(Page::from_id(page.id()), Some(page));
        }
    }
}
