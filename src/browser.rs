//! Browser glue: `localStorage`, `window.confirm`, console logging.
//!
//! Everything behind the injected traits lives here, so the rest of the
//! crate never touches `web_sys` and stays testable off-wasm.

use std::rc::Rc;

use wasm_bindgen::prelude::*;
use web_sys::Storage;

use crate::removal::ConfirmPrompt;
use crate::session::{SessionStorage, SessionStore};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console)]
    pub fn log(contents: &str);
}

/// `localStorage`-backed session storage. When the browser refuses to hand
/// out storage (private mode, disabled), every read comes back empty and the
/// app behaves as permanently logged out.
pub struct LocalStorage {
    storage: Option<Storage>,
}

impl LocalStorage {
    pub fn new() -> Self {
        let storage = web_sys::window().and_then(|w| w.local_storage().ok().flatten());
        LocalStorage { storage }
    }
}

impl SessionStorage for LocalStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.storage.as_ref()?.get_item(key).ok().flatten()
    }

    fn set(&self, key: &str, value: &str) {
        if let Some(storage) = &self.storage {
            let _ = storage.set_item(key, value);
        }
    }

    fn remove(&self, key: &str) {
        if let Some(storage) = &self.storage {
            let _ = storage.remove_item(key);
        }
    }
}

/// `window.confirm` as the blocking yes/no prompt. No window means no
/// confirmation, which safely cancels the destructive action.
pub struct WindowPrompt;

impl ConfirmPrompt for WindowPrompt {
    fn confirm(&self, message: &str) -> bool {
        web_sys::window()
            .and_then(|w| w.confirm_with_message(message).ok())
            .unwrap_or(false)
    }
}

/// Builds the shared session store over real browser storage.
pub fn session_store() -> Rc<SessionStore> {
    SessionStore::new(Rc::new(LocalStorage::new()))
}

#[wasm_bindgen]
pub fn bootstrap() {
    std::panic::set_hook(Box::new(console_error_panic_hook::hook));
    log("fitness world frontend core ready");
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn local_storage_roundtrip() {
        let storage = LocalStorage::new();
        storage.set("fw_test_key", "v1");
        assert_eq!(storage.get("fw_test_key").as_deref(), Some("v1"));
        storage.remove("fw_test_key");
        assert_eq!(storage.get("fw_test_key"), None);
    }
}
