//! The scheduler of the notified core.

use crate::config::EventId;

#[cfg(feature = "defmt-03")]
use crate::defmt;

/// Why the scheduler refused an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum EventError {
    /// A task of the event has not completed its previous activation.
    ActivationLoss,
    /// The multiplicity counter of a countable event would overflow.
    Overflow,
    /// The event does not exist on the calling core.
    UnknownEvent,
}

impl core::fmt::Display for EventError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            EventError::ActivationLoss => write!(f, "previous activation not completed"),
            EventError::Overflow => write!(f, "event counter overflow"),
            EventError::UnknownEvent => write!(f, "unknown event"),
        }
    }
}

/// Event dispatch of the scheduler running on the notified core.
///
/// The send functions are called from the notification interrupt, on the core the event
/// belongs to.
pub trait Scheduler {
    /// `true` if a scheduler runs on `core`, so events can be sent there.
    fn runs_on(&self, core: usize) -> bool;

    /// Trigger an ordinary event; `param` is passed to the activated tasks.
    fn send_event(&self, event: EventId, param: u32) -> Result<(), EventError>;

    /// Trigger a countable event with the event mask `mask`.
    fn send_countable_event(&self, event: EventId, mask: u32) -> Result<(), EventError>;
}
