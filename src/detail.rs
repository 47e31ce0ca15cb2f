//! Post-detail view state: one post, its comments, and comment creation.
//!
//! Plain fetch-and-apply, no optimistic machinery: a new comment shows up
//! locally only once the server has stored it and sent it back.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use log::debug;

use crate::api::{self, Api, ApiError, CommentPayload, PostDraft, PostPayload};
use crate::feed::FeedItem;
use crate::session::SessionStore;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Comment {
    pub id: String,
    pub author: String,
    pub body: String,
    pub created_at: String,
}

impl Comment {
    fn from_payload(payload: CommentPayload) -> Comment {
        let author = payload
            .author
            .as_ref()
            .and_then(|a| a.nick_name.clone())
            .filter(|nick| !nick.is_empty())
            .unwrap_or_else(|| "Member".to_owned());

        Comment {
            id: payload.id,
            author,
            body: payload.body,
            created_at: payload.created_at,
        }
    }
}

pub struct DetailStore {
    api: Rc<dyn Api>,
    sessions: Rc<SessionStore>,
    post: RefCell<Option<FeedItem>>,
    comments: RefCell<Vec<Comment>>,
    disposed: Cell<bool>,
}

impl DetailStore {
    pub fn new(api: Rc<dyn Api>, sessions: Rc<SessionStore>) -> Rc<Self> {
        Rc::new(DetailStore {
            api,
            sessions,
            post: RefCell::new(None),
            comments: RefCell::new(Vec::new()),
            disposed: Cell::new(false),
        })
    }

    pub fn post(&self) -> Option<FeedItem> {
        self.post.borrow().clone()
    }

    pub fn comments(&self) -> Vec<Comment> {
        self.comments.borrow().clone()
    }

    pub fn dispose(&self) {
        self.disposed.set(true);
    }

    /// Loads the post by slug, then its comments by id. A missing post
    /// surfaces as `NotFound`; the local list may stay stale until the next
    /// reload.
    pub async fn load(&self, slug: &str) -> Result<(), ApiError> {
        let session = self.sessions.current();
        let payload = api::fetch_post(&*self.api, slug).await?;
        let comments = api::fetch_comments(&*self.api, &payload.id).await?;

        if self.disposed.get() {
            debug!("detail disposed, dropping load of {}", slug);
            return Ok(());
        }

        *self.post.borrow_mut() = Some(FeedItem::from_payload(payload, &session));
        *self.comments.borrow_mut() = comments.into_iter().map(Comment::from_payload).collect();
        Ok(())
    }

    /// Posts a comment on the loaded post and appends the server's copy.
    pub async fn add_comment(&self, body: &str) -> Result<(), ApiError> {
        let token = match self.sessions.current().token {
            Some(token) => token,
            None => return Err(ApiError::Unauthenticated),
        };

        let post_id = match &*self.post.borrow() {
            Some(post) => post.id.clone(),
            None => return Err(ApiError::NotFound("no post loaded".to_owned())),
        };

        let body = body.trim();
        if body.is_empty() {
            return Err(ApiError::Rejected("a comment needs some text".to_owned()));
        }

        let result = api::create_comment(&*self.api, &post_id, body, &token).await;
        match result {
            Ok(stored) => {
                if !self.disposed.get() {
                    self.comments.borrow_mut().push(Comment::from_payload(stored));
                }
                Ok(())
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

/// Creates a post from a filled-in draft. Title and body are mandatory, the
/// same rule the compose form enforces; the created post (with its
/// server-assigned slug) comes back for the caller to navigate to.
pub async fn create_post(
    api: &dyn Api,
    sessions: &SessionStore,
    draft: &PostDraft,
) -> Result<PostPayload, ApiError> {
    let token = match sessions.current().token {
        Some(token) => token,
        None => return Err(ApiError::Unauthenticated),
    };

    if draft.title.trim().is_empty() || draft.body.trim().is_empty() {
        return Err(ApiError::Rejected("Title and content are mandatory.".to_owned()));
    }

    let result = api::create_post(api, draft, &token).await;
    if let Err(ApiError::SessionExpired) = &result {
        sessions.force_expire();
    }
    result
}
