//! Post deletion.
//!
//! Deletion is destructive, so nothing happens optimistically: the item
//! leaves the local collection only after the server acknowledged the delete.

use std::rc::Rc;

use crate::api::{self, Api, ApiError};
use crate::feed::FeedStore;
use crate::session::SessionStore;

pub const CONFIRM_DELETE_MESSAGE: &'static str = "Are you sure you want to delete this post?";

/// Blocking yes/no prompt, `window.confirm` in the browser.
pub trait ConfirmPrompt {
    fn confirm(&self, message: &str) -> bool;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Removal {
    Removed,
    Cancelled,
}

pub struct RemovalFlow {
    api: Rc<dyn Api>,
    sessions: Rc<SessionStore>,
    feed: Rc<FeedStore>,
    prompt: Rc<dyn ConfirmPrompt>,
}

impl RemovalFlow {
    pub fn new(
        api: Rc<dyn Api>,
        sessions: Rc<SessionStore>,
        feed: Rc<FeedStore>,
        prompt: Rc<dyn ConfirmPrompt>,
    ) -> Rc<Self> {
        Rc::new(RemovalFlow { api, sessions, feed, prompt })
    }

    /// Deletes a post after explicit confirmation. Declining the prompt makes
    /// no network call at all. On failure the collection is left untouched
    /// and the server's reason comes back as the error.
    pub async fn remove(&self, post_id: &str) -> Result<Removal, ApiError> {
        let token = match self.sessions.current().token {
            Some(token) => token,
            None => return Err(ApiError::Unauthenticated),
        };

        if !self.prompt.confirm(CONFIRM_DELETE_MESSAGE) {
            return Ok(Removal::Cancelled);
        }

        match api::delete_post(&*self.api, post_id, &token).await {
            Ok(()) => {
                self.feed.remove_item(post_id);
                Ok(Removal::Removed)
            }
            Err(err) => {
                if let ApiError::SessionExpired = err {
                    self.sessions.force_expire();
                }
                Err(err)
            }
        }
    }
}
