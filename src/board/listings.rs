//! # Listing Repository
//!
//! Reads and writes bus-listing documents in the `buses` collection. The
//! document store orders by timestamp but has no substring queries, so the
//! route search filters client-side over the already-ordered sequence.
//! No validation happens here; the posting workflow owns that.

use anyhow::Result;
use chrono::DateTime;
use log::{info, warn};
use serde_json::Value;

use crate::backend::{server_timestamp, Direction, Document, DocumentStore, Identity};
use crate::logutil::escape_log;
use crate::validation::non_empty_after_trim;

/// Collection holding bus listings, keyed by generated id.
pub const BUSES_COLLECTION: &str = "buses";

/// The four caller-supplied listing fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingDraft {
    pub bus_number: String,
    pub bus_route: String,
    pub bus_type: String,
    pub contact_info: String,
}

impl ListingDraft {
    /// All four fields survive trimming.
    pub fn is_complete(&self) -> bool {
        [
            &self.bus_number,
            &self.bus_route,
            &self.bus_type,
            &self.contact_info,
        ]
        .iter()
        .all(|f| non_empty_after_trim(f))
    }
}

/// Display model for one listing. Documents written by this system always
/// carry every field; out-of-band writes may not, so absent values render
/// as "N/A" / "Unknown".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingCard {
    pub bus_number: String,
    pub bus_route: String,
    pub bus_type: String,
    pub contact_info: String,
    pub posted_by: String,
    pub posted_at: String,
}

impl ListingCard {
    fn field_or(doc: &Document, key: &str, fallback: &str) -> String {
        doc.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(fallback)
            .to_string()
    }

    pub fn from_document(doc: &Document) -> ListingCard {
        let posted_at = doc
            .get("timestamp")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "N/A".to_string());
        ListingCard {
            bus_number: Self::field_or(doc, "busNumber", "N/A"),
            bus_route: Self::field_or(doc, "busRoute", "N/A"),
            bus_type: Self::field_or(doc, "busType", "N/A"),
            contact_info: Self::field_or(doc, "contactInfo", "N/A"),
            posted_by: Self::field_or(doc, "postedBy", "Unknown"),
            posted_at,
        }
    }
}

/// Result of a fetch: the empty backend and an empty filter result render
/// distinct messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingPage {
    /// The backend holds no listings at all.
    BackendEmpty,
    /// Listings exist but none matched the current search.
    NoMatches,
    /// Matching listings, newest first.
    Cards(Vec<ListingCard>),
}

/// Client-side route filter. A listing matches iff each filter is empty
/// (after trim) or the lowercased route contains the lowercased filter.
/// Both filters test the same route string; there is no separate
/// source/destination field model.
pub fn matches_filters(route: &str, source_filter: &str, destination_filter: &str) -> bool {
    let route_lower = route.to_lowercase();
    let matches_source = source_filter.trim().is_empty()
        || route_lower.contains(&source_filter.to_lowercase());
    let matches_destination = destination_filter.trim().is_empty()
        || route_lower.contains(&destination_filter.to_lowercase());
    matches_source && matches_destination
}

/// Fetch all listings ordered newest first, then filter by route substring.
pub async fn fetch_listings<D: DocumentStore + ?Sized>(
    store: &D,
    source_filter: &str,
    destination_filter: &str,
) -> Result<ListingPage> {
    info!(
        "Fetching listings, filters: source=\"{}\" destination=\"{}\"",
        escape_log(source_filter),
        escape_log(destination_filter)
    );
    if !source_filter.trim().is_empty() || !destination_filter.trim().is_empty() {
        // The store cannot run substring queries; this fetch pulls the full
        // ordered collection and filters locally.
        warn!("Route search is filtered client-side; full collection fetched");
    }

    let docs = store
        .query_collection(BUSES_COLLECTION, "timestamp", Direction::Descending)
        .await?;
    if docs.is_empty() {
        info!("No listing documents in the backend");
        return Ok(ListingPage::BackendEmpty);
    }

    let cards: Vec<ListingCard> = docs
        .iter()
        .filter(|doc| {
            let route = doc.get("busRoute").and_then(Value::as_str).unwrap_or("");
            matches_filters(route, source_filter, destination_filter)
        })
        .map(ListingCard::from_document)
        .collect();

    if cards.is_empty() {
        info!("No listings matched the current search");
        Ok(ListingPage::NoMatches)
    } else {
        info!("{} listings matched", cards.len());
        Ok(ListingPage::Cards(cards))
    }
}

/// Write a new listing with a server-assigned timestamp, stamped with the
/// author's email and uid. Returns the generated document id.
pub async fn post_listing<D: DocumentStore + ?Sized>(
    store: &D,
    draft: &ListingDraft,
    author: &Identity,
) -> Result<String> {
    let mut doc = Document::new();
    doc.insert("busNumber".to_string(), Value::String(draft.bus_number.clone()));
    doc.insert("busRoute".to_string(), Value::String(draft.bus_route.clone()));
    doc.insert("busType".to_string(), Value::String(draft.bus_type.clone()));
    doc.insert(
        "contactInfo".to_string(),
        Value::String(draft.contact_info.clone()),
    );
    doc.insert("timestamp".to_string(), server_timestamp());
    doc.insert("postedBy".to_string(), Value::String(author.email.clone()));
    doc.insert("postedByUid".to_string(), Value::String(author.uid.clone()));

    let id = store.add_document(BUSES_COLLECTION, doc).await?;
    info!(
        "Listing {} posted by {} (bus {})",
        id,
        escape_log(&author.email),
        escape_log(&draft.bus_number)
    );
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filters_are_case_insensitive_substrings() {
        assert!(matches_filters("Delhi-Agra", "agra", ""));
        assert!(matches_filters("Delhi-Agra", "", "DELHI"));
        assert!(matches_filters("Delhi-Agra", "delhi", "agra"));
        assert!(!matches_filters("Delhi-Agra", "jaipur", ""));
        assert!(!matches_filters("Delhi-Agra", "delhi", "jaipur"));
    }

    #[test]
    fn empty_filters_match_everything() {
        assert!(matches_filters("anything", "", ""));
        assert!(matches_filters("", "", ""));
        assert!(matches_filters("route", "   ", "\t"));
    }

    #[test]
    fn draft_completeness_requires_all_fields() {
        let full = ListingDraft {
            bus_number: "42".to_string(),
            bus_route: "Delhi-Agra".to_string(),
            bus_type: "AC".to_string(),
            contact_info: "555-0100".to_string(),
        };
        assert!(full.is_complete());

        let blank_type = ListingDraft {
            bus_type: "   ".to_string(),
            ..full.clone()
        };
        assert!(!blank_type.is_complete());
        assert!(!ListingDraft::default().is_complete());
    }

    #[test]
    fn card_falls_back_for_absent_fields() {
        let doc: Document = json!({
            "busNumber": "42",
            "busRoute": "Delhi-Agra"
        })
        .as_object()
        .cloned()
        .unwrap();
        let card = ListingCard::from_document(&doc);
        assert_eq!(card.bus_number, "42");
        assert_eq!(card.bus_type, "N/A");
        assert_eq!(card.contact_info, "N/A");
        assert_eq!(card.posted_by, "Unknown");
        assert_eq!(card.posted_at, "N/A");
    }

    #[test]
    fn card_formats_timestamp() {
        let doc: Document = json!({
            "busNumber": "7",
            "busRoute": "Agra-Jaipur",
            "timestamp": "2024-05-01T12:30:00+00:00",
            "postedBy": "d@example.com"
        })
        .as_object()
        .cloned()
        .unwrap();
        let card = ListingCard::from_document(&doc);
        assert_eq!(card.posted_at, "2024-05-01 12:30:00 UTC");
        assert_eq!(card.posted_by, "d@example.com");
    }
}
