//! Optimistic like/unlike engine.
//!
//! Each item walks its own little state machine: idle, pending while one call
//! is in flight, then settled. The flip and the ±1 on the count land locally
//! before the request is even sent; the server's answer replaces them
//! wholesale on success, and on failure the page is re-fetched instead of
//! restoring the snapshot, because a concurrent toggle on the same item could
//! have made a field-level undo wrong.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::debug;

use crate::api::{self, Api, ApiError};
use crate::feed::FeedStore;
use crate::session::SessionStore;

/// Like state of an item just before a speculative flip. Kept per in-flight
/// call, mostly so a discarded delta can be reported; reconciliation itself
/// trusts the server, not this record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LikeSnapshot {
    pub liked_by_me: bool,
    pub likes_count: u64,
}

pub struct LikeEngine {
    api: Rc<dyn Api>,
    sessions: Rc<SessionStore>,
    feed: Rc<FeedStore>,
    /// One entry per item with a call in flight. Doubles as the guard that
    /// keeps a second call for the same item from going out.
    pending: RefCell<HashMap<String, LikeSnapshot>>,
}

impl LikeEngine {
    pub fn new(api: Rc<dyn Api>, sessions: Rc<SessionStore>, feed: Rc<FeedStore>) -> Rc<Self> {
        Rc::new(LikeEngine {
            api,
            sessions,
            feed,
            pending: RefCell::new(HashMap::new()),
        })
    }

    /// True while a call for this item is in flight. The UI disables the one
    /// control this covers; every other item stays interactive.
    pub fn is_pending(&self, post_id: &str) -> bool {
        self.pending.borrow().contains_key(post_id)
    }

    /// Toggles the like on one feed item.
    ///
    /// Refused outright without a session (no state change, no network call).
    /// Otherwise the local flip is applied immediately and the call goes out;
    /// on success the server's `{liked, likesCount}` replaces the local
    /// values, on failure the current page is re-fetched and the speculative
    /// delta disappears with it.
    pub async fn toggle(&self, post_id: &str) -> Result<(), ApiError> {
        let session = self.sessions.current();
        let token = match session.token {
            Some(token) => token,
            None => return Err(ApiError::Unauthenticated),
        };

        if self.pending.borrow().contains_key(post_id) {
            debug!("like toggle for {} already in flight, ignoring", post_id);
            return Ok(());
        }

        let snapshot = match self.feed.apply_optimistic_flip(post_id) {
            Some(snapshot) => snapshot,
            None => return Err(ApiError::NotFound("that post is no longer available".to_owned())),
        };
        self.pending.borrow_mut().insert(post_id.to_owned(), snapshot);

        let result = api::toggle_like(&*self.api, post_id, &token).await;
        let previous = self.pending.borrow_mut().remove(post_id);

        match result {
            Ok(outcome) => {
                self.feed.apply_like_outcome(post_id, &outcome);
                Ok(())
            }
            Err(err) => {
                debug!(
                    "like toggle for {} failed ({}), discarding delta over {:?}",
                    post_id, err, previous
                );
                if let ApiError::SessionExpired = err {
                    self.sessions.force_expire();
                }
                // The snapshot may already be stale; trust fresh copies of
                // the loaded pages instead of restoring it.
                let _ = self.feed.reload_loaded_pages().await;
                Err(err)
            }
        }
    }
}
