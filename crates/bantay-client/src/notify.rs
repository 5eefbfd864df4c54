//! Notification store — shared ephemeral UI flags.
//!
//! Carries visibility state that several disconnected surfaces read and
//! write (the header button, the composer overlay, keyboard shortcuts),
//! never domain data. Last write wins; access is through the accessors
//! only.

use std::sync::RwLock;

#[derive(Default)]
pub struct NotificationStore {
    composer_open: RwLock<bool>,
}

impl NotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_composer(&self) {
        *self.composer_open.write().unwrap() = true;
    }

    pub fn close_composer(&self) {
        *self.composer_open.write().unwrap() = false;
    }

    pub fn is_composer_open(&self) -> bool {
        *self.composer_open.read().unwrap()
    }
}
