//! `critical_section::with` bound to an intercore critical section of the simulated cores.
//!
//! Needs the `critical-section-impl` feature.
#![cfg(not(loom))]

use std::cell::RefCell;

use xcs_common::sim::{self, SimCore};
use xcs_sync::critical_section::{critical_section, IntercoreCriticalSection};

static SECTION: IntercoreCriticalSection<SimCore> = IntercoreCriticalSection::new();

xcs_sync::set_critical_section_impl!(SECTION);

static LOG: critical_section::Mutex<RefCell<Vec<(usize, u32)>>> =
    critical_section::Mutex::new(RefCell::new(Vec::new()));

#[test]
fn with_spans_cores() {
    const NUM_RUNS: u32 = 1_000;

    sim::cores(3, |core| {
        for i in 0..NUM_RUNS {
            critical_section::with(|cs| {
                assert!(!sim::interrupts_enabled());
                assert_eq!(SECTION.depth(), 1);

                // Nested use is fine and keeps the section.
                critical_section::with(|cs| {
                    assert_eq!(SECTION.depth(), 1);
                    LOG.borrow_ref_mut(cs).push((core, i));
                });

                let log = LOG.borrow_ref(cs);
                assert_eq!(log.last(), Some(&(core, i)));
            });

            assert!(sim::interrupts_enabled());
        }
    });

    let log = critical_section::with(|cs| LOG.borrow_ref(cs).clone());
    assert_eq!(log.len(), 3 * NUM_RUNS as usize);

    for core in 0..3 {
        let mine: Vec<u32> = log
            .iter()
            .filter(|(c, _)| *c == core)
            .map(|(_, i)| *i)
            .collect();
        assert_eq!(mine, (0..NUM_RUNS).collect::<Vec<_>>());
    }

    assert!(!SECTION.is_entered());
}
