//! Map context persisted in the browser's `localStorage`.

use mapform_core::ContextStore;

pub struct LocalStorageStore {
    key: String,
}

impl LocalStorageStore {
    pub fn new(key: &str) -> Self {
        Self { key: key.to_string() }
    }

    fn storage() -> Option<web_sys::Storage> {
        web_sys::window()?.local_storage().ok()?
    }
}

impl ContextStore for LocalStorageStore {
    fn load(&self) -> Option<String> {
        Self::storage()?.get_item(&self.key).ok()?
    }

    fn save(&mut self, text: &str) {
        let Some(storage) = Self::storage() else {
            log::debug!("localStorage unavailable, context not saved");
            return;
        };
        if let Err(e) = storage.set_item(&self.key, text) {
            log::warn!("could not save map context: {e:?}");
        }
    }
}
