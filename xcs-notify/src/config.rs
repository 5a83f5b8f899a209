//! Build time configuration of the notifications.

#[cfg(feature = "defmt-03")]
use crate::defmt;

/// The largest number of scheduler events a single notification may trigger.
pub const MAX_EVENTS_PER_NOTIFICATION: usize = 4;

/// Identifies a scheduler event (or event processor) on the notified core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct EventId(pub u32);

/// How the notification parameter is handed to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum EventKind {
    /// An ordinary event; the parameter becomes the task parameter.
    Ordinary,
    /// A countable event; the parameter is the event mask and must not be zero.
    Countable,
}

/// A scheduler event triggered by a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct EventBinding {
    /// The triggered event.
    pub event: EventId,
    /// How the parameter is passed.
    pub kind: EventKind,
}

impl EventBinding {
    /// Bind an ordinary event.
    pub const fn ordinary(event: u32) -> Self {
        Self {
            event: EventId(event),
            kind: EventKind::Ordinary,
        }
    }

    /// Bind a countable event.
    pub const fn countable(event: u32) -> Self {
        Self {
            event: EventId(event),
            kind: EventKind::Countable,
        }
    }
}

/// One notification of the table.
///
/// The index of the entry in the table is the notification's id. It selects the software
/// settable interrupt used to deliver it and the parameter slot.
#[derive(Debug, Clone, Copy)]
pub struct NotificationConfig {
    /// The notified core. Notifying the sending core itself works, too.
    pub core: usize,
    /// INTC priority of the notification interrupt, `1..=15`.
    pub priority: u8,
    /// Called on the notified core with the notification parameter.
    pub callback: Option<fn(u32)>,
    /// Scheduler events triggered on the notified core, after the callback.
    pub events: &'static [EventBinding],
}

/// Rejection of the notification table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum ConfigError {
    /// A notification has neither a callback nor an event.
    NoActionSpecified,
    /// A notification addresses a core the derivative doesn't have.
    BadCoreIndex,
    /// A notification has an interrupt priority outside `1..=15`.
    BadPriority,
    /// A notification triggers events on a core without a scheduler.
    ActionRequiresScheduler,
    /// The table has more notifications than there are software settable interrupts.
    TooManyNotifications,
    /// A notification triggers more than [`MAX_EVENTS_PER_NOTIFICATION`] events.
    TooManyEvents,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg = match self {
            ConfigError::NoActionSpecified => "no action specified",
            ConfigError::BadCoreIndex => "notified core does not exist",
            ConfigError::BadPriority => "interrupt priority out of range",
            ConfigError::ActionRequiresScheduler => "events sent to a core without scheduler",
            ConfigError::TooManyNotifications => "not enough software settable interrupts",
            ConfigError::TooManyEvents => "too many events",
        };
        f.write_str(msg)
    }
}

impl NotificationConfig {
    /// Check the entry on its own. `num_cores` is the core count of the derivative,
    /// `has_scheduler` tells whether a core runs a scheduler.
    pub(crate) fn validate(
        &self,
        num_cores: usize,
        has_scheduler: impl Fn(usize) -> bool,
    ) -> Result<(), ConfigError> {
        if self.callback.is_none() && self.events.is_empty() {
            return Err(ConfigError::NoActionSpecified);
        }

        if self.core >= num_cores {
            return Err(ConfigError::BadCoreIndex);
        }

        if !(1..=15).contains(&self.priority) {
            return Err(ConfigError::BadPriority);
        }

        if self.events.len() > MAX_EVENTS_PER_NOTIFICATION {
            return Err(ConfigError::TooManyEvents);
        }

        if !self.events.is_empty() && !has_scheduler(self.core) {
            return Err(ConfigError::ActionRequiresScheduler);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn callback(_: u32) {}

    const EVENTS: &[EventBinding] = &[EventBinding::ordinary(0), EventBinding::countable(3)];

    fn entry() -> NotificationConfig {
        NotificationConfig {
            core: 1,
            priority: 1,
            callback: Some(callback),
            events: &[],
        }
    }

    #[test]
    fn accepted() {
        assert_eq!(entry().validate(3, |_| false), Ok(()));

        let with_events = NotificationConfig {
            callback: None,
            events: EVENTS,
            priority: 15,
            ..entry()
        };
        assert_eq!(with_events.validate(3, |core| core == 1), Ok(()));
    }

    #[test]
    fn rejected() {
        let no_action = NotificationConfig {
            callback: None,
            ..entry()
        };
        assert_eq!(
            no_action.validate(3, |_| true),
            Err(ConfigError::NoActionSpecified)
        );

        let bad_core = NotificationConfig { core: 2, ..entry() };
        assert_eq!(bad_core.validate(2, |_| true), Err(ConfigError::BadCoreIndex));

        for priority in [0, 16] {
            let bad_priority = NotificationConfig { priority, ..entry() };
            assert_eq!(
                bad_priority.validate(3, |_| true),
                Err(ConfigError::BadPriority)
            );
        }

        let no_scheduler = NotificationConfig {
            events: EVENTS,
            ..entry()
        };
        assert_eq!(
            no_scheduler.validate(3, |core| core != 1),
            Err(ConfigError::ActionRequiresScheduler)
        );

        const MANY: &[EventBinding] = &[EventBinding::ordinary(0); MAX_EVENTS_PER_NOTIFICATION + 1];
        let too_many = NotificationConfig {
            events: MANY,
            ..entry()
        };
        assert_eq!(too_many.validate(3, |_| true), Err(ConfigError::TooManyEvents));
    }

    #[test]
    fn error_display() {
        assert_eq!(
            format!("{}", ConfigError::BadPriority),
            "interrupt priority out of range"
        );
    }
}
