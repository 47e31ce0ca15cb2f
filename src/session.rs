//! Shared authentication session.
//!
//! One persisted record (two durable keys) plus a broadcast invalidation
//! channel. Independently-rendered regions of the page all hold a handle to
//! the same [`SessionStore`]; whenever the session changes they receive a
//! [`SessionChanged`] message and re-read through [`SessionStore::current`].
//! The message never carries the new values: another browser tab can write
//! the same storage behind our back, so the durable record is the only source
//! of truth and observers must always re-consult it.

use std::cell::RefCell;
use std::rc::Rc;

use futures_channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use log::warn;

use crate::api::ApiError;

pub const TOKEN_STORAGE_KEY: &'static str = "fitness_world_token";
pub const USER_STORAGE_KEY: &'static str = "fitness_world_user";

/// Durable key-value storage, `localStorage` in the browser. Implementations
/// swallow their own failures: an unavailable store reads as empty, which
/// degrades to "logged out" everywhere.
pub trait SessionStorage {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// Invalidation signal. Carries no payload on purpose; re-read the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionChanged;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub nick_name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub profile_image: Option<String>,
}

impl Profile {
    pub fn display_name(&self) -> String {
        if let Some(nick) = &self.nick_name {
            if !nick.is_empty() {
                return nick.clone();
            }
        }

        let full = format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or(""),
            self.last_name.as_deref().unwrap_or(""),
        );
        let full = full.trim();
        if full.is_empty() {
            "Member".to_owned()
        } else {
            full.to_owned()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct Session {
    pub token: Option<String>,
    pub user: Option<Profile>,
}

impl Session {
    pub fn is_logged_in(&self) -> bool {
        self.token.is_some()
    }
}

pub struct SessionStore {
    storage: Rc<dyn SessionStorage>,
    subscribers: RefCell<Vec<UnboundedSender<SessionChanged>>>,
}

impl SessionStore {
    pub fn new(storage: Rc<dyn SessionStorage>) -> Rc<Self> {
        Rc::new(SessionStore {
            storage,
            subscribers: RefCell::new(Vec::new()),
        })
    }

    /// Reads the session from durable storage. Every call re-reads; nothing
    /// is cached between notifications.
    ///
    /// A token with an unreadable profile record stays authenticated but
    /// anonymous; the profile alone being broken is no reason to log the
    /// user out.
    pub fn current(&self) -> Session {
        let token = self.storage.get(TOKEN_STORAGE_KEY);

        let user = match (&token, self.storage.get(USER_STORAGE_KEY)) {
            (Some(_), Some(raw)) => match serde_json::from_str(&raw) {
                Ok(profile) => Some(profile),
                Err(err) => {
                    warn!("stored profile is unreadable, treating as anonymous: {}", err);
                    None
                }
            },
            _ => None,
        };

        Session { token, user }
    }

    pub fn login(&self, token: &str, user: &Profile) {
        self.storage.set(TOKEN_STORAGE_KEY, token);
        match serde_json::to_string(user) {
            Ok(raw) => self.storage.set(USER_STORAGE_KEY, &raw),
            Err(err) => warn!("could not persist profile: {}", err),
        }
        self.notify();
    }

    pub fn logout(&self) {
        self.storage.remove(TOKEN_STORAGE_KEY);
        self.storage.remove(USER_STORAGE_KEY);
        self.notify();
    }

    /// Called at the operation boundary that saw a 401. Clears the session
    /// like [`logout`](Self::logout) and hands back the distinguishable
    /// "expired" reason for the caller to surface.
    pub fn force_expire(&self) -> ApiError {
        self.logout();
        ApiError::SessionExpired
    }

    /// Registers an observer. The receiver gets one [`SessionChanged`] per
    /// write to the store; dropped receivers are pruned on the next notify.
    pub fn subscribe(&self) -> UnboundedReceiver<SessionChanged> {
        let (tx, rx) = unbounded();
        self.subscribers.borrow_mut().push(tx);
        rx
    }

    fn notify(&self) {
        self.subscribers
            .borrow_mut()
            .retain(|tx| tx.unbounded_send(SessionChanged).is_ok());
    }
}
