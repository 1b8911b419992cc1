//! # Posting Workflow
//!
//! Gate in front of the listing repository. Preconditions run in order and
//! short-circuit with distinct user-facing messages: an authenticated
//! identity, a posting-capable role, then field completeness. Only when all
//! pass does a write happen.

use log::warn;

use super::listings::{self, ListingDraft};
use super::session::Session;
use crate::backend::{DocumentStore, Identity};
use crate::logutil::escape_log;

/// Rejected or failed listing submissions. `Display` text for the gate
/// variants is the user-facing message.
#[derive(Debug, thiserror::Error)]
pub enum PostError {
    #[error("Please log in to post bus information.")]
    NotSignedIn,

    #[error("Only users with a \"driver\" or \"admin\" role can post bus information.")]
    InsufficientRole,

    #[error("Please fill in all bus information fields (Bus Number, Route, Type, Contact)!")]
    MissingFields,

    /// The write itself failed after the gate passed.
    #[error("Error posting bus information: {0}")]
    Backend(#[from] anyhow::Error),
}

/// Run the precondition gate and, if it passes, write the listing stamped
/// with the session's identity. Returns the new document id.
///
/// On success the caller is expected to clear the post inputs and refresh
/// the listing display with the currently entered search filters, so the
/// user's search context survives the post.
pub async fn submit_listing<D: DocumentStore + ?Sized>(
    session: &Session,
    store: &D,
    draft: &ListingDraft,
) -> Result<String, PostError> {
    let (uid, email) = match session.identity() {
        Some(pair) => pair,
        None => {
            warn!("Post attempt blocked: not signed in");
            return Err(PostError::NotSignedIn);
        }
    };

    let can_post = session.role().map(|r| r.can_post()).unwrap_or(false);
    if !can_post {
        warn!(
            "Post attempt blocked: insufficient role ({}) for {}",
            session
                .role()
                .map(|r| r.as_str())
                .unwrap_or("unrecognized"),
            escape_log(email)
        );
        return Err(PostError::InsufficientRole);
    }

    if !draft.is_complete() {
        warn!("Post attempt blocked: missing required fields");
        return Err(PostError::MissingFields);
    }

    let author = Identity {
        uid: uid.to_string(),
        email: email.to_string(),
    };
    let id = listings::post_listing(store, draft, &author).await?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::roles::Role;
    use crate::board::session::AuthState;

    fn signed_in(role: Option<Role>) -> Session {
        let mut session = Session::new();
        session.apply(AuthState::SignedIn {
            uid: "u1".to_string(),
            email: "p@example.com".to_string(),
            role,
            profile_missing: false,
        });
        session
    }

    fn complete_draft() -> ListingDraft {
        ListingDraft {
            bus_number: "42".to_string(),
            bus_route: "Delhi-Agra".to_string(),
            bus_type: "AC".to_string(),
            contact_info: "555-0100".to_string(),
        }
    }

    // The gate variants short-circuit before any store access, so a store
    // that panics on use proves no write was attempted.
    struct UnreachableStore;

    #[async_trait::async_trait]
    impl DocumentStore for UnreachableStore {
        async fn write_document(
            &self,
            _: &str,
            _: &str,
            _: crate::backend::Document,
        ) -> anyhow::Result<()> {
            unreachable!("gate must reject before writing")
        }
        async fn add_document(
            &self,
            _: &str,
            _: crate::backend::Document,
        ) -> anyhow::Result<String> {
            unreachable!("gate must reject before writing")
        }
        async fn read_document(
            &self,
            _: &str,
            _: &str,
        ) -> anyhow::Result<Option<crate::backend::Document>> {
            unreachable!()
        }
        async fn query_collection(
            &self,
            _: &str,
            _: &str,
            _: crate::backend::Direction,
        ) -> anyhow::Result<Vec<crate::backend::Document>> {
            unreachable!()
        }
    }

    #[test]
    fn rejects_when_signed_out() {
        tokio_test::block_on(async {
            let session = Session::new();
            let err = submit_listing(&session, &UnreachableStore, &complete_draft())
                .await
                .unwrap_err();
            assert!(matches!(err, PostError::NotSignedIn));
        });
    }

    #[test]
    fn rejects_plain_user_role() {
        tokio_test::block_on(async {
            let session = signed_in(Some(Role::User));
            let err = submit_listing(&session, &UnreachableStore, &complete_draft())
                .await
                .unwrap_err();
            assert!(matches!(err, PostError::InsufficientRole));
        });
    }

    #[test]
    fn rejects_unrecognized_role() {
        tokio_test::block_on(async {
            let session = signed_in(None);
            let err = submit_listing(&session, &UnreachableStore, &complete_draft())
                .await
                .unwrap_err();
            assert!(matches!(err, PostError::InsufficientRole));
        });
    }

    #[test]
    fn rejects_incomplete_fields_for_driver() {
        tokio_test::block_on(async {
            let session = signed_in(Some(Role::Driver));
            let mut draft = complete_draft();
            draft.bus_type = "  ".to_string();
            let err = submit_listing(&session, &UnreachableStore, &draft)
                .await
                .unwrap_err();
            assert!(matches!(err, PostError::MissingFields));
        });
    }

    #[test]
    fn precondition_order_identity_before_fields() {
        tokio_test::block_on(async {
            // Signed out AND incomplete: the identity check wins.
            let session = Session::new();
            let err = submit_listing(&session, &UnreachableStore, &ListingDraft::default())
                .await
                .unwrap_err();
            assert!(matches!(err, PostError::NotSignedIn));

            // Wrong role AND incomplete: the role check wins.
            let session = signed_in(Some(Role::User));
            let err = submit_listing(&session, &UnreachableStore, &ListingDraft::default())
                .await
                .unwrap_err();
            assert!(matches!(err, PostError::InsufficientRole));
        });
    }
}
