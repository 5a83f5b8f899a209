use core::marker::PhantomData;

use xcs_common::{AtomicStorage, Derivative, SharedWord};

use crate::{
    config::{ConfigError, EventKind, NotificationConfig},
    interrupt::{Handler, InterruptController, Registration, SoftwareInterrupts},
    scheduler::Scheduler,
};

#[cfg(feature = "defmt-03")]
use crate::defmt;

/// The notification driver for a table of `N` notifications.
///
/// The driver owns the parameter slot of each notification, so it has to live in memory that
/// all cores share and that bypasses the data caches; usually it is a `static`.
///
/// The notifications occupy the software settable interrupts `first_irq..first_irq + N`.
///
/// ## Races
///
/// A notification must only be sent from one context at a time. Two cores sending the same
/// notification concurrently can both see it idle and both succeed, with only one of the two
/// parameters arriving. Serializing such senders is up to the caller.
///
/// Only a single word is passed per notification. Larger payloads need their own handshake,
/// e.g. a buffer guarded by a cross-core mutex.
pub struct NotificationDriver<'a, B, I, S, const N: usize> {
    derivative: Derivative,
    first_irq: usize,
    config: &'a [NotificationConfig; N],
    params: [SharedWord; N],
    event_failures: [SharedWord; N],
    irqs: I,
    scheduler: S,
    _backend: PhantomData<fn() -> B>,
}

impl<'a, B, I, S, const N: usize> NotificationDriver<'a, B, I, S, N>
where
    B: AtomicStorage,
    I: SoftwareInterrupts,
    S: Scheduler,
{
    /// Create the driver for the notification table `config`, delivered through the software
    /// settable interrupts `first_irq..first_irq + N` of `irqs`.
    #[cfg(not(loom))]
    pub const fn new(
        derivative: Derivative,
        first_irq: usize,
        config: &'a [NotificationConfig; N],
        irqs: I,
        scheduler: S,
    ) -> Self {
        Self {
            derivative,
            first_irq,
            config,
            params: [const { SharedWord::new(0) }; N],
            event_failures: [const { SharedWord::new(0) }; N],
            irqs,
            scheduler,
            _backend: PhantomData,
        }
    }

    /// Create the driver for the notification table `config`, delivered through the software
    /// settable interrupts `first_irq..first_irq + N` of `irqs`.
    #[cfg(loom)]
    pub fn new(
        derivative: Derivative,
        first_irq: usize,
        config: &'a [NotificationConfig; N],
        irqs: I,
        scheduler: S,
    ) -> Self {
        Self {
            derivative,
            first_irq,
            config,
            params: core::array::from_fn(|_| SharedWord::new(0)),
            event_failures: core::array::from_fn(|_| SharedWord::new(0)),
            irqs,
            scheduler,
            _backend: PhantomData,
        }
    }

    /// Validate the notification table and register the interrupt handlers.
    ///
    /// `handlers[id]` is the service routine of notification `id`; it has to call
    /// [`service(id)`](Self::service). [`notification_handlers!`](crate::notification_handlers)
    /// generates them.
    ///
    /// The whole table is checked before the first handler is registered; on error nothing
    /// is registered and the error of the first bad entry is returned. The system must not
    /// go on running then.
    pub fn init(
        &self,
        handlers: &[Handler; N],
        controller: &mut impl InterruptController,
    ) -> Result<(), ConfigError> {
        if self.first_irq + N > self.derivative.sw_interrupts() {
            error!(
                "{} notifications from software interrupt {} exceed the {} available",
                N,
                self.first_irq,
                self.derivative.sw_interrupts()
            );
            return Err(ConfigError::TooManyNotifications);
        }

        for (id, notification) in self.config.iter().enumerate() {
            let num_cores = self.derivative.num_cores();
            if let Err(e) = notification.validate(num_cores, |core| self.scheduler.runs_on(core)) {
                error!("notification {}: {}", id, e);
                return Err(e);
            }
        }

        for (id, (notification, &handler)) in self.config.iter().zip(handlers).enumerate() {
            B::store_word(0, &self.params[id]);
            B::store_word(0, &self.event_failures[id]);

            controller.register(Registration {
                handler,
                core: notification.core,
                vector: self.vector(id),
                priority: notification.priority,
                preemptable: true,
                notification: id,
            });
        }

        debug!("{} notifications registered", N);

        Ok(())
    }

    /// Send notification `id` with parameter `param`.
    ///
    /// Returns `false` if the previous notification `id` has not been serviced yet; the
    /// parameter slot is left untouched then. Also `false` if there is no notification `id`.
    ///
    /// For a notification with a countable event, `param` is the event mask and must not be
    /// zero.
    pub fn send(&self, id: usize, param: u32) -> bool {
        let Some(irq) = self.irq(id) else {
            warn!("send of unknown notification {}", id);
            return false;
        };

        if self.irqs.is_pending(irq) {
            return false;
        }

        B::store_word(param, &self.params[id]);

        // The parameter is in shared memory before the notified core can see the request.
        B::full_barrier();
        self.irqs.raise(irq);

        true
    }

    /// `true` if notification `id` has been sent and is not serviced yet. A sender may poll
    /// this to avoid a failing [`send`](Self::send).
    pub fn is_pending(&self, id: usize) -> bool {
        self.irq(id).is_some_and(|irq| self.irqs.is_pending(irq))
    }

    /// The interrupt handler of notification `id`, to be called from its vector table entry
    /// on the notified core.
    ///
    /// Runs the callback, then sends the configured events and finally acknowledges the
    /// interrupt, after which the notification can be sent again.
    pub fn service(&self, id: usize) {
        let (Some(notification), Some(irq)) = (self.config.get(id), self.irq(id)) else {
            warn!("service of unknown notification {}", id);
            return;
        };

        let param = B::load_word(&self.params[id]);
        B::full_barrier();

        // The callback may be latency critical, events take effect after the handler anyway.
        if let Some(callback) = notification.callback {
            callback(param);
        }

        for binding in notification.events {
            let result = match binding.kind {
                EventKind::Ordinary => self.scheduler.send_event(binding.event, param),
                EventKind::Countable => {
                    debug_assert!(param != 0, "countable event with empty mask");
                    self.scheduler.send_countable_event(binding.event, param)
                }
            };

            if let Err(e) = result {
                warn!("notification {}: event {} refused: {}", id, binding.event, e);
                let failures = &self.event_failures[id];
                B::store_word(B::load_word(failures).wrapping_add(1), failures);
            }
        }

        self.irqs.acknowledge(irq);
    }

    /// The software settable interrupt of notification `id`, if both exist.
    fn irq(&self, id: usize) -> Option<usize> {
        let irq = self.first_irq + id;
        (id < N && irq < self.derivative.sw_interrupts()).then_some(irq)
    }

    /// Vector number of the interrupt of notification `id`.
    pub fn vector(&self, id: usize) -> usize {
        self.derivative.first_sw_interrupt_vector() + self.first_irq + id
    }

    /// Number of events of notification `id` which the scheduler refused so far.
    pub fn event_failures(&self, id: usize) -> u32 {
        self.event_failures
            .get(id)
            .map_or(0, |failures| B::load_word(failures))
    }

    /// The software settable interrupts the notifications are delivered through.
    pub fn interrupts(&self) -> &I {
        &self.irqs
    }

    /// The scheduler the events are sent to.
    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// The notification table.
    pub fn config(&self) -> &'a [NotificationConfig; N] {
        self.config
    }

    /// Number of notifications.
    pub const fn len(&self) -> usize {
        N
    }

    /// `true` if the table is empty.
    pub const fn is_empty(&self) -> bool {
        N == 0
    }
}

#[cfg(test)]
#[cfg(not(loom))]
mod tests {
    use super::*;
    use crate::config::{EventBinding, EventId};
    use crate::scheduler::EventError;
    use core::sync::atomic::{AtomicU32, AtomicU8, Ordering};
    use std::vec::Vec;
    use xcs_common::sim::SimCore;

    struct Flags([AtomicU8; 24]);

    impl Flags {
        const fn new() -> Self {
            Self([const { AtomicU8::new(0) }; 24])
        }
    }

    impl SoftwareInterrupts for Flags {
        fn is_pending(&self, irq: usize) -> bool {
            self.0[irq].load(Ordering::SeqCst) != 0
        }

        fn raise(&self, irq: usize) {
            self.0[irq].store(1, Ordering::SeqCst)
        }

        fn acknowledge(&self, irq: usize) {
            self.0[irq].store(0, Ordering::SeqCst)
        }
    }

    /// Refuses every event, counting the attempts.
    struct Refusing(AtomicU32);

    impl Scheduler for Refusing {
        fn runs_on(&self, _core: usize) -> bool {
            true
        }

        fn send_event(&self, _: EventId, _: u32) -> Result<(), EventError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(EventError::ActivationLoss)
        }

        fn send_countable_event(&self, _: EventId, _: u32) -> Result<(), EventError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(EventError::Overflow)
        }
    }

    #[derive(Default)]
    struct Recorder(Vec<Registration>);

    impl InterruptController for Recorder {
        fn register(&mut self, registration: Registration) {
            self.0.push(registration);
        }
    }

    fn noop() {}

    const EVENTS: &[EventBinding] = &[EventBinding::ordinary(1), EventBinding::countable(2)];

    static TABLE: [NotificationConfig; 2] = [
        NotificationConfig {
            core: 2,
            priority: 3,
            callback: None,
            events: EVENTS,
        },
        NotificationConfig {
            core: 0,
            priority: 15,
            callback: None,
            events: &[EventBinding::ordinary(1)],
        },
    ];

    #[test]
    fn registrations() {
        let driver = NotificationDriver::<SimCore, _, _, 2>::new(
            Derivative::Mpc5748g,
            4,
            &TABLE,
            Flags::new(),
            Refusing(AtomicU32::new(0)),
        );
        let mut recorder = Recorder::default();

        assert_eq!(driver.init(&[noop as Handler; 2], &mut recorder), Ok(()));

        let placed: Vec<_> = recorder
            .0
            .iter()
            .map(|r| (r.core, r.vector, r.priority, r.preemptable, r.notification))
            .collect();
        assert_eq!(placed, [(2, 4, 3, true, 0), (0, 5, 15, true, 1)]);
        assert_eq!(driver.len(), 2);
    }

    #[test]
    fn not_enough_interrupts() {
        let driver = NotificationDriver::<SimCore, _, _, 2>::new(
            Derivative::Mpc5775b,
            7,
            &TABLE,
            Flags::new(),
            Refusing(AtomicU32::new(0)),
        );
        let mut recorder = Recorder::default();

        assert_eq!(
            driver.init(&[noop as Handler; 2], &mut recorder),
            Err(ConfigError::TooManyNotifications)
        );
        assert!(recorder.0.is_empty());
    }

    #[test]
    fn send_uses_offset_interrupt() {
        let driver = NotificationDriver::<SimCore, _, _, 2>::new(
            Derivative::Mpc5748g,
            4,
            &TABLE,
            Flags::new(),
            Refusing(AtomicU32::new(0)),
        );

        assert!(driver.send(1, 9));
        assert!(driver.irqs.is_pending(5));
        assert!(!driver.irqs.is_pending(4));
        assert!(driver.is_pending(1));
        assert!(!driver.is_pending(0));

        assert!(!driver.send(2, 9));
        assert!(!driver.is_pending(2));
    }

    #[test]
    fn refused_events_are_counted() {
        let driver = NotificationDriver::<SimCore, _, _, 2>::new(
            Derivative::Mpc5748g,
            0,
            &TABLE,
            Flags::new(),
            Refusing(AtomicU32::new(0)),
        );

        assert!(driver.send(0, 0b11));
        driver.service(0);

        // Refusals are not retried, the notification is acknowledged regardless.
        assert_eq!(driver.scheduler.0.load(Ordering::SeqCst), 2);
        assert_eq!(driver.event_failures(0), 2);
        assert_eq!(driver.event_failures(1), 0);
        assert!(!driver.is_pending(0));
        assert!(driver.send(0, 1));
    }

    #[test]
    fn interrupts_past_the_derivative_are_refused() {
        let driver = NotificationDriver::<SimCore, _, _, 2>::new(
            Derivative::Mpc5775b,
            7,
            &TABLE,
            Flags::new(),
            Refusing(AtomicU32::new(0)),
        );

        assert!(driver.send(0, 1));
        assert!(!driver.send(1, 1));
        assert!(!driver.is_pending(1));
        assert!(!driver.irqs.is_pending(8));
    }

    #[test]
    #[should_panic(expected = "countable event with empty mask")]
    #[cfg(debug_assertions)]
    fn countable_event_needs_a_mask() {
        let driver = NotificationDriver::<SimCore, _, _, 2>::new(
            Derivative::Mpc5748g,
            0,
            &TABLE,
            Flags::new(),
            Refusing(AtomicU32::new(0)),
        );

        assert!(driver.send(0, 0));
        driver.service(0);
    }
}
