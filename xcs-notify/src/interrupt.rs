//! The interrupt controller, as far as notifications need it.

#[cfg(feature = "defmt-03")]
use crate::defmt;

/// The software settable interrupts which carry the notifications.
///
/// `irq` is the zero based index of the software settable interrupt, not its vector number.
/// The pending flag of an interrupt is visible to and writable by all cores.
pub trait SoftwareInterrupts {
    /// `true` if the interrupt has been raised and not acknowledged yet.
    fn is_pending(&self, irq: usize) -> bool;

    /// Set the pending flag, requesting the interrupt on the core it is routed to.
    fn raise(&self, irq: usize);

    /// Clear the pending flag. Called at the end of the service routine.
    fn acknowledge(&self, irq: usize);
}

/// An interrupt service routine.
pub type Handler = fn();

/// A notification interrupt together with its service routine.
#[derive(Debug, Clone, Copy)]
pub struct Registration {
    /// The service routine; it calls
    /// [`NotificationDriver::service`](crate::NotificationDriver::service) for `notification`.
    pub handler: Handler,
    /// The core which services the interrupt.
    pub core: usize,
    /// Vector number of the interrupt in the INTC.
    pub vector: usize,
    /// INTC priority, `1..=15`.
    pub priority: u8,
    /// Whether interrupts of higher priority may preempt the handler.
    pub preemptable: bool,
    /// The notification served by `handler`.
    pub notification: usize,
}

#[cfg(feature = "defmt-03")]
impl defmt::Format for Registration {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "Registration(core={}, vector={}, priority={}, preemptable={}, notification={})",
            self.core,
            self.vector,
            self.priority,
            self.preemptable,
            self.notification
        )
    }
}

/// Installation of interrupt handlers.
pub trait InterruptController {
    /// Install `registration.handler` for the vector and enable the interrupt with the given
    /// routing.
    fn register(&mut self, registration: Registration);
}

/// The service routines of a notification table, one per notification in id order, as
/// expected by [`NotificationDriver::init`](crate::NotificationDriver::init).
///
/// `$driver` names the `static` driver; the ids must be listed as `0, 1, 2, ...`, which is
/// checked at compile time.
///
/// ```ignore
/// static DRIVER: NotificationDriver<'static, E200z4, Intc, Rtos, 3> = /* ... */;
///
/// DRIVER.init(&notification_handlers!(DRIVER; 0, 1, 2), &mut vectors)?;
/// ```
#[macro_export]
macro_rules! notification_handlers {
    ($driver:path; $($id:literal),* $(,)?) => {{
        const _: () = {
            let ids: &[usize] = &[$($id),*];
            let mut i = 0;
            while i < ids.len() {
                assert!(ids[i] == i, "notification ids must be listed as 0, 1, 2, ...");
                i += 1;
            }
        };

        fn handler<const ID: usize>() {
            $driver.service(ID)
        }

        [$(handler::<$id> as $crate::Handler),*]
    }};
}
