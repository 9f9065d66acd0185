use tracing::debug;

use super::{require, Screen};
use crate::error::GatewayError;
use crate::gateway::Gateway;
use crate::store::ListStore;
use crate::types::Reminder;

pub const TITLE_AND_TIME_REQUIRED: &str = "reminder title and time are required";

/// Reminders list. Completing a reminder flips its flag in place; it stays
/// listed until the next reload decides otherwise.
pub struct RemindersScreen {
    gateway: Gateway,
    reminders: ListStore<Reminder>,
    include_completed: bool,
}

impl RemindersScreen {
    pub fn new(gateway: Gateway) -> Self {
        Self {
            gateway,
            reminders: ListStore::new(),
            include_completed: false,
        }
    }

    pub fn reminders(&self) -> &[Reminder] {
        self.reminders.items()
    }

    pub fn include_completed(&self) -> bool {
        self.include_completed
    }

    /// Changes the completed-filter and reloads with it.
    pub fn set_include_completed(&mut self, include: bool) -> Result<(), GatewayError> {
        self.include_completed = include;
        self.refresh()
    }

    pub fn create(
        &mut self,
        title: &str,
        description: Option<&str>,
        reminder_time: &str,
    ) -> Result<&Reminder, GatewayError> {
        require(title, TITLE_AND_TIME_REQUIRED)?;
        require(reminder_time, TITLE_AND_TIME_REQUIRED)?;
        let gateway = &self.gateway;
        self.reminders.create_with(|| {
            gateway.create_reminder(title.trim(), description.map(str::trim), reminder_time.trim())
        })
    }

    /// Replaces the local entry with the server's updated copy.
    pub fn update(
        &mut self,
        id: &str,
        title: &str,
        description: Option<&str>,
        reminder_time: &str,
    ) -> Result<(), GatewayError> {
        require(title, TITLE_AND_TIME_REQUIRED)?;
        require(reminder_time, TITLE_AND_TIME_REQUIRED)?;
        let updated = self
            .gateway
            .update_reminder(id, title.trim(), description.map(str::trim), reminder_time.trim())?;
        self.reminders.apply_update(id, |reminder| *reminder = updated);
        Ok(())
    }

    pub fn complete(&mut self, id: &str) -> Result<(), GatewayError> {
        self.gateway.complete_reminder(id)?;
        self.reminders.apply_update(id, |reminder| reminder.completed = true);
        Ok(())
    }

    pub fn delete(&mut self, id: &str) -> Result<(), GatewayError> {
        let gateway = &self.gateway;
        self.reminders.delete_with(id, || gateway.delete_reminder(id))?;
        Ok(())
    }

    pub fn unmount(self) {
        debug!(reminders = self.reminders.len(), "reminders screen unmounted");
    }
}

impl Screen for RemindersScreen {
    fn refresh(&mut self) -> Result<(), GatewayError> {
        let gateway = &self.gateway;
        let include = self.include_completed;
        self.reminders.reload(|| gateway.list_reminders(include))
    }
}
