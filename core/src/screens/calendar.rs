use tracing::debug;

use super::{require, Screen};
use crate::error::GatewayError;
use crate::gateway::Gateway;
use crate::store::ListStore;
use crate::types::CalendarEvent;

pub const TITLE_AND_TIME_REQUIRED: &str = "event title and time are required";

pub struct CalendarScreen {
    gateway: Gateway,
    events: ListStore<CalendarEvent>,
}

impl CalendarScreen {
    pub fn new(gateway: Gateway) -> Self {
        Self {
            gateway,
            events: ListStore::new(),
        }
    }

    pub fn events(&self) -> &[CalendarEvent] {
        self.events.items()
    }

    pub fn create(&mut self, title: &str, datetime: &str, description: &str) -> Result<&CalendarEvent, GatewayError> {
        require(title, TITLE_AND_TIME_REQUIRED)?;
        require(datetime, TITLE_AND_TIME_REQUIRED)?;
        let gateway = &self.gateway;
        self.events
            .create_with(|| gateway.create_event(title.trim(), datetime.trim(), description.trim()))
    }

    pub fn delete(&mut self, id: &str) -> Result<(), GatewayError> {
        let gateway = &self.gateway;
        self.events.delete_with(id, || gateway.delete_event(id))?;
        Ok(())
    }

    pub fn unmount(self) {
        debug!(events = self.events.len(), "calendar screen unmounted");
    }
}

impl Screen for CalendarScreen {
    fn refresh(&mut self) -> Result<(), GatewayError> {
        let gateway = &self.gateway;
        self.events.reload(|| gateway.list_events())
    }
}
