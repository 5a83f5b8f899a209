//! Notifications between the cores of a multi-core MPC57xx microcontroller.
//!
//! A notification is a software settable interrupt of the INTC, raised by one core and
//! serviced on another, together with a 32 bit parameter passed in shared memory. On the
//! notified core the interrupt invokes a callback and/or hands the parameter to the
//! scheduler as an event. The set of notifications is fixed at build time, see
//! [`NotificationConfig`].
//!
//! ```rust
//! use xcs_common::{sim::SimCore, Derivative};
//! use xcs_notify::{
//!     EventId, InterruptController, NotificationConfig, NotificationDriver, Registration,
//!     Scheduler, EventError, SoftwareInterrupts,
//! };
//! # use core::sync::atomic::{AtomicU8, Ordering};
//! # struct Flags([AtomicU8; 1]);
//! # impl SoftwareInterrupts for Flags {
//! #     fn is_pending(&self, irq: usize) -> bool { self.0[irq].load(Ordering::SeqCst) != 0 }
//! #     fn raise(&self, irq: usize) { self.0[irq].store(1, Ordering::SeqCst) }
//! #     fn acknowledge(&self, irq: usize) { self.0[irq].store(0, Ordering::SeqCst) }
//! # }
//! # struct NoScheduler;
//! # impl Scheduler for NoScheduler {
//! #     fn runs_on(&self, _: usize) -> bool { false }
//! #     fn send_event(&self, _: EventId, _: u32) -> Result<(), EventError> { Ok(()) }
//! #     fn send_countable_event(&self, _: EventId, _: u32) -> Result<(), EventError> { Ok(()) }
//! # }
//! # struct Vectors(Option<Registration>);
//! # impl InterruptController for Vectors {
//! #     fn register(&mut self, r: Registration) { self.0 = Some(r) }
//! # }
//!
//! fn on_core_1(param: u32) {
//!     assert_eq!(param, 42);
//! }
//!
//! static NOTIFICATIONS: [NotificationConfig; 1] = [NotificationConfig {
//!     core: 1,
//!     priority: 5,
//!     callback: Some(on_core_1),
//!     events: &[],
//! }];
//!
//! static DRIVER: NotificationDriver<'static, SimCore, Flags, NoScheduler, 1> = NotificationDriver::new(
//!     Derivative::Mpc5748g,
//!     0,
//!     &NOTIFICATIONS,
//!     Flags([AtomicU8::new(0)]),
//!     NoScheduler,
//! );
//!
//! let mut vectors = Vectors(None);
//! DRIVER
//!     .init(&xcs_notify::notification_handlers!(DRIVER; 0), &mut vectors)
//!     .unwrap();
//!
//! assert!(DRIVER.send(0, 42));
//! assert!(!DRIVER.send(0, 7));
//!
//! // The vector table entry of the notification, running on core 1.
//! let registration = vectors.0.unwrap();
//! (registration.handler)();
//! assert!(!DRIVER.is_pending(0));
//! ```

#![no_std]
#![deny(missing_docs)]

#[macro_use]
mod fmt;

mod config;
mod driver;
pub mod intc;
mod interrupt;
mod scheduler;

pub use config::{
    ConfigError, EventBinding, EventId, EventKind, NotificationConfig,
    MAX_EVENTS_PER_NOTIFICATION,
};
pub use driver::NotificationDriver;
pub use interrupt::{Handler, InterruptController, Registration, SoftwareInterrupts};
pub use scheduler::{EventError, Scheduler};

#[cfg(feature = "defmt-03")]
use defmt_03 as defmt;

#[cfg(test)]
#[macro_use]
extern crate std;
