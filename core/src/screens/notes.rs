use tracing::debug;

use super::{require, Screen};
use crate::error::GatewayError;
use crate::gateway::Gateway;
use crate::store::ListStore;
use crate::types::Note;

pub const TITLE_REQUIRED: &str = "note title is required";

pub struct NotesScreen {
    gateway: Gateway,
    notes: ListStore<Note>,
}

impl NotesScreen {
    pub fn new(gateway: Gateway) -> Self {
        Self {
            gateway,
            notes: ListStore::new(),
        }
    }

    pub fn notes(&self) -> &[Note] {
        self.notes.items()
    }

    /// Creates a note and puts the server's copy at the top of the list.
    /// The title is required; the content may be empty.
    pub fn create(&mut self, title: &str, content: &str) -> Result<&Note, GatewayError> {
        require(title, TITLE_REQUIRED)?;
        let gateway = &self.gateway;
        self.notes
            .create_with(|| gateway.create_note(title.trim(), content.trim()))
    }

    pub fn delete(&mut self, id: &str) -> Result<(), GatewayError> {
        let gateway = &self.gateway;
        self.notes.delete_with(id, || gateway.delete_note(id))?;
        Ok(())
    }

    pub fn unmount(self) {
        debug!(notes = self.notes.len(), "notes screen unmounted");
    }
}

impl Screen for NotesScreen {
    fn refresh(&mut self) -> Result<(), GatewayError> {
        let gateway = &self.gateway;
        self.notes.reload(|| gateway.list_notes())
    }
}
