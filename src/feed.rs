//! Cumulative paginated post feed.
//!
//! Page 1 replaces the collection, later pages merge in without duplicating,
//! and the server's ordering is kept as-is. The collection owned here is the
//! one the like engine and the removal flow mutate in place.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use log::debug;

use crate::api::{self, Api, ApiError, LikeOutcome, PostPayload};
use crate::likes::LikeSnapshot;
use crate::session::{Session, SessionStore};

pub const PAGE_SIZE: u32 = 10;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Author {
    pub id: Option<String>,
    pub name: String,
    pub image: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FeedItem {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub body: String,
    pub author: Author,
    pub created_at: String,
    pub tags: Vec<String>,
    pub likes_count: u64,
    pub liked_by_me: bool,
    pub comments_count: u64,
    pub can_delete: bool,
}

impl FeedItem {
    /// Maps a wire payload into an item, defaulting `liked_by_me` and
    /// `can_delete` to `false` before any server-supplied value applies.
    ///
    /// When the server omits `canDelete`, ownership is inferred by comparing
    /// author id against the session user id as strings (ids show up in more
    /// than one representation). That inference is a UI affordance only; the
    /// server re-checks on the actual delete.
    pub fn from_payload(payload: PostPayload, session: &Session) -> FeedItem {
        let author = match &payload.author {
            Some(raw) => Author {
                id: raw.id.clone(),
                name: author_display_name(raw),
                image: raw.profile_image.clone(),
            },
            None => Author { id: None, name: "Member".to_owned(), image: None },
        };

        let can_delete = match payload.can_delete {
            Some(flag) => flag,
            None => match (&author.id, &session.user) {
                (Some(author_id), Some(user)) => author_id.as_str() == user.id.as_str(),
                _ => false,
            },
        };

        FeedItem {
            id: payload.id,
            slug: payload.slug,
            title: payload.title,
            body: payload.body,
            author,
            created_at: payload.created_at,
            tags: payload.tags,
            likes_count: payload.likes_count,
            liked_by_me: payload.liked_by_me.unwrap_or(false),
            comments_count: payload.comments_count,
            can_delete,
        }
    }
}

fn author_display_name(raw: &crate::api::AuthorPayload) -> String {
    if let Some(nick) = &raw.nick_name {
        if !nick.is_empty() {
            return nick.clone();
        }
    }

    let full = format!(
        "{} {}",
        raw.first_name.as_deref().unwrap_or(""),
        raw.last_name.as_deref().unwrap_or(""),
    );
    let full = full.trim();
    if full.is_empty() {
        "Member".to_owned()
    } else {
        full.to_owned()
    }
}

#[derive(Default)]
struct FeedState {
    items: Vec<FeedItem>,
    page: u32,
    total: u64,
    loading: bool,
    error: Option<String>,
}

pub struct FeedStore {
    api: Rc<dyn Api>,
    sessions: Rc<SessionStore>,
    state: RefCell<FeedState>,
    /// Token the collection was last loaded with; a session change is only a
    /// reload trigger when the token actually differs.
    loaded_token: RefCell<Option<String>>,
    disposed: Cell<bool>,
}

impl FeedStore {
    pub fn new(api: Rc<dyn Api>, sessions: Rc<SessionStore>) -> Rc<Self> {
        Rc::new(FeedStore {
            api,
            sessions,
            state: RefCell::new(FeedState::default()),
            loaded_token: RefCell::new(None),
            disposed: Cell::new(false),
        })
    }

    pub fn items(&self) -> Vec<FeedItem> {
        self.state.borrow().items.clone()
    }

    pub fn item(&self, post_id: &str) -> Option<FeedItem> {
        self.state.borrow().items.iter().find(|i| i.id == post_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.borrow().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().items.is_empty()
    }

    pub fn page(&self) -> u32 {
        self.state.borrow().page
    }

    pub fn total(&self) -> u64 {
        self.state.borrow().total
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    pub fn has_more(&self) -> bool {
        let state = self.state.borrow();
        (state.items.len() as u64) < state.total
    }

    /// Stops this store from applying any late-arriving results. Called when
    /// the consuming view unmounts; responses already in flight settle into
    /// the void.
    pub fn dispose(&self) {
        self.disposed.set(true);
    }

    /// Loads page `p` (1-indexed) with the current token attached when there
    /// is one. Page 1 replaces the collection; later pages merge in, with
    /// items the server re-sends overwriting the local copy. On failure the
    /// previously loaded items are kept and the error is recorded for the UI
    /// to retry.
    pub async fn load_page(&self, page: u32) -> Result<(), ApiError> {
        let session = self.sessions.current();
        self.state.borrow_mut().loading = true;

        let result =
            api::fetch_posts(&*self.api, page, PAGE_SIZE, session.token.as_deref()).await;

        if self.disposed.get() {
            debug!("feed disposed, dropping page {} result", page);
            return Ok(());
        }

        match result {
            Ok(fetched) => {
                let mut state = self.state.borrow_mut();
                state.loading = false;
                state.error = None;
                state.page = page;
                state.total = fetched.total;

                let incoming = fetched
                    .posts
                    .into_iter()
                    .map(|payload| FeedItem::from_payload(payload, &session));

                if page == 1 {
                    state.items = incoming.collect();
                } else {
                    for item in incoming {
                        // Server copy is authoritative for re-sent items.
                        match state.items.iter().position(|existing| existing.id == item.id) {
                            Some(at) => state.items[at] = item,
                            None => state.items.push(item),
                        }
                    }
                }

                drop(state);
                *self.loaded_token.borrow_mut() = session.token;
                Ok(())
            }
            Err(err) => {
                {
                    let mut state = self.state.borrow_mut();
                    state.loading = false;
                    state.error = Some(err.to_string());
                }
                if let ApiError::SessionExpired = err {
                    self.sessions.force_expire();
                }
                Err(err)
            }
        }
    }

    pub async fn load_more(&self) -> Result<(), ApiError> {
        let next = self.state.borrow().page + 1;
        self.load_page(next.max(1)).await
    }

    /// Re-fetches every page loaded so far, in order. Used to reconcile after
    /// a failed optimistic mutation: the mutated item can sit on any earlier
    /// page of a cumulative feed, and page 1 replaces while later pages merge
    /// by id, so the whole collection ends up server-authoritative again.
    pub async fn reload_loaded_pages(&self) -> Result<(), ApiError> {
        let last = self.state.borrow().page.max(1);
        for page in 1..=last {
            self.load_page(page).await?;
        }
        Ok(())
    }

    /// Invalidation-broadcast handler: re-reads the session and reloads from
    /// page 1 iff the token changed since the last load. Stale per-user flags
    /// (`liked_by_me`, `can_delete`) must not survive a login or logout.
    pub async fn sync_session(&self) -> Result<(), ApiError> {
        let token = self.sessions.current().token;
        if *self.loaded_token.borrow() == token {
            return Ok(());
        }
        self.load_page(1).await
    }

    /// Flips the like state of one item in place and returns the snapshot
    /// taken just before. `None` when the item is gone from the collection.
    pub(crate) fn apply_optimistic_flip(&self, post_id: &str) -> Option<LikeSnapshot> {
        let mut state = self.state.borrow_mut();
        let item = state.items.iter_mut().find(|i| i.id == post_id)?;

        let snapshot = LikeSnapshot {
            liked_by_me: item.liked_by_me,
            likes_count: item.likes_count,
        };

        item.liked_by_me = !item.liked_by_me;
        item.likes_count = if item.liked_by_me {
            item.likes_count + 1
        } else {
            item.likes_count.saturating_sub(1)
        };

        Some(snapshot)
    }

    /// Applies the server's authoritative like result, replacing (never
    /// merging with) whatever speculative values are in place. Ignored when
    /// the item has gone away or the store is disposed.
    pub(crate) fn apply_like_outcome(&self, post_id: &str, outcome: &LikeOutcome) {
        if self.disposed.get() {
            return;
        }
        let mut state = self.state.borrow_mut();
        if let Some(item) = state.items.iter_mut().find(|i| i.id == post_id) {
            item.liked_by_me = outcome.liked;
            item.likes_count = outcome.likes_count;
        }
    }

    /// Removes a server-confirmed deleted item. The total only drops when the
    /// item was actually present locally, so `items.len() <= total` keeps
    /// holding.
    pub(crate) fn remove_item(&self, post_id: &str) {
        if self.disposed.get() {
            return;
        }
        let mut state = self.state.borrow_mut();
        let before = state.items.len();
        state.items.retain(|i| i.id != post_id);
        if state.items.len() < before {
            state.total = state.total.saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::AuthorPayload;
    use crate::session::Profile;

    fn payload(id: &str) -> PostPayload {
        PostPayload {
            id: id.to_owned(),
            slug: format!("slug-{}", id),
            title: "Leg day".to_owned(),
            body: "".to_owned(),
            author: Some(AuthorPayload {
                id: Some("author-1".to_owned()),
                nick_name: Some("coach".to_owned()),
                first_name: None,
                last_name: None,
                profile_image: None,
            }),
            created_at: "".to_owned(),
            tags: vec![],
            likes_count: 0,
            comments_count: 0,
            liked_by_me: None,
            can_delete: None,
        }
    }

    fn session_for(user_id: &str) -> Session {
        Session {
            token: Some("tok".to_owned()),
            user: Some(Profile {
                id: user_id.to_owned(),
                email: None,
                nick_name: None,
                first_name: None,
                last_name: None,
                profile_image: None,
            }),
        }
    }

    #[test]
    fn missing_flags_default_to_false() {
        let item = FeedItem::from_payload(payload("p1"), &Session::default());
        assert!(!item.liked_by_me);
        assert!(!item.can_delete);
    }

    #[test]
    fn server_can_delete_flag_wins_over_inference() {
        let mut raw = payload("p1");
        raw.can_delete = Some(false);
        // Session user owns the post, but the server explicitly said no.
        let item = FeedItem::from_payload(raw, &session_for("author-1"));
        assert!(!item.can_delete);
    }

    #[test]
    fn ownership_inferred_when_flag_omitted() {
        let item = FeedItem::from_payload(payload("p1"), &session_for("author-1"));
        assert!(item.can_delete);

        let item = FeedItem::from_payload(payload("p1"), &session_for("someone-else"));
        assert!(!item.can_delete);

        let item = FeedItem::from_payload(payload("p1"), &Session::default());
        assert!(!item.can_delete);
    }

    #[test]
    fn author_name_falls_back_like_profile() {
        let mut raw = payload("p1");
        raw.author = Some(AuthorPayload {
            id: None,
            nick_name: None,
            first_name: Some("Ana".to_owned()),
            last_name: None,
            profile_image: None,
        });
        let item = FeedItem::from_payload(raw, &Session::default());
        assert_eq!(item.author.name, "Ana");

        let mut raw = payload("p1");
        raw.author = None;
        let item = FeedItem::from_payload(raw, &Session::default());
        assert_eq!(item.author.name, "Member");
    }
}
