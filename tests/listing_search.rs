use busboard::backend::local::LocalBackend;
use busboard::backend::{Document, DocumentStore, Identity};
use busboard::board::listings::{self, ListingDraft, ListingPage, BUSES_COLLECTION};
use serde_json::{json, Value};
use tokio::runtime::Runtime;

fn listing_doc(number: &str, route: &str, ts: &str) -> Document {
    let value = json!({
        "busNumber": number,
        "busRoute": route,
        "busType": "AC",
        "contactInfo": "555-0100",
        "timestamp": ts,
        "postedBy": "driver@example.com",
        "postedByUid": "uid-driver"
    });
    value.as_object().cloned().unwrap()
}

async fn seeded_backend(dir: &str) -> LocalBackend {
    let backend = LocalBackend::new(dir).await.unwrap();
    backend
        .add_document(
            BUSES_COLLECTION,
            listing_doc("1", "Delhi-Agra", "2024-03-02T10:00:00+00:00"),
        )
        .await
        .unwrap();
    backend
        .add_document(
            BUSES_COLLECTION,
            listing_doc("2", "Agra-Jaipur", "2024-03-01T10:00:00+00:00"),
        )
        .await
        .unwrap();
    backend
}

#[test]
fn shared_substring_matches_both_ordered_newest_first() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let tmpdir = tempfile::tempdir().unwrap();
        let backend = seeded_backend(tmpdir.path().to_str().unwrap()).await;

        let page = listings::fetch_listings(&backend, "agra", "").await.unwrap();
        match page {
            ListingPage::Cards(cards) => {
                assert_eq!(cards.len(), 2);
                assert_eq!(cards[0].bus_route, "Delhi-Agra");
                assert_eq!(cards[1].bus_route, "Agra-Jaipur");
            }
            other => panic!("expected cards, got {:?}", other),
        }
    });
}

#[test]
fn both_filters_test_the_route_field() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let tmpdir = tempfile::tempdir().unwrap();
        let backend = seeded_backend(tmpdir.path().to_str().unwrap()).await;

        let page = listings::fetch_listings(&backend, "agra", "jaipur")
            .await
            .unwrap();
        match page {
            ListingPage::Cards(cards) => {
                assert_eq!(cards.len(), 1);
                assert_eq!(cards[0].bus_route, "Agra-Jaipur");
            }
            other => panic!("expected one card, got {:?}", other),
        }
    });
}

#[test]
fn empty_filters_return_everything() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let tmpdir = tempfile::tempdir().unwrap();
        let backend = seeded_backend(tmpdir.path().to_str().unwrap()).await;

        let page = listings::fetch_listings(&backend, "", "").await.unwrap();
        assert!(matches!(page, ListingPage::Cards(ref cards) if cards.len() == 2));
    });
}

#[test]
fn empty_states_are_distinct() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let tmpdir = tempfile::tempdir().unwrap();
        let bare = LocalBackend::new(tmpdir.path().join("bare").to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(
            listings::fetch_listings(&bare, "", "").await.unwrap(),
            ListingPage::BackendEmpty
        );
        assert_eq!(
            listings::fetch_listings(&bare, "agra", "").await.unwrap(),
            ListingPage::BackendEmpty,
            "an empty backend is reported as empty even under filters"
        );

        let seeded = seeded_backend(tmpdir.path().join("seeded").to_str().unwrap()).await;
        assert_eq!(
            listings::fetch_listings(&seeded, "bhopal", "").await.unwrap(),
            ListingPage::NoMatches
        );
    });
}

#[test]
fn fetch_is_idempotent_for_unchanged_backend() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let tmpdir = tempfile::tempdir().unwrap();
        let backend = seeded_backend(tmpdir.path().to_str().unwrap()).await;

        let first = listings::fetch_listings(&backend, "agra", "").await.unwrap();
        let second = listings::fetch_listings(&backend, "agra", "").await.unwrap();
        assert_eq!(first, second);
    });
}

#[test]
fn post_stamps_author_and_server_timestamp() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let tmpdir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(tmpdir.path().to_str().unwrap())
            .await
            .unwrap();
        let author = Identity {
            uid: "uid-9".to_string(),
            email: "driver@example.com".to_string(),
        };
        let draft = ListingDraft {
            bus_number: "42".to_string(),
            bus_route: "Delhi-Agra".to_string(),
            bus_type: "Sleeper".to_string(),
            contact_info: "555-0101".to_string(),
        };

        let id = listings::post_listing(&backend, &draft, &author).await.unwrap();
        let doc = backend
            .read_document(BUSES_COLLECTION, &id)
            .await
            .unwrap()
            .expect("written document");
        assert_eq!(doc.get("postedBy").and_then(Value::as_str), Some("driver@example.com"));
        assert_eq!(doc.get("postedByUid").and_then(Value::as_str), Some("uid-9"));
        let ts = doc.get("timestamp").and_then(Value::as_str).unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(ts).is_ok());
    });
}
