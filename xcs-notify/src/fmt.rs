//! Logging shims. With this crate's `defmt-03` feature these forward to `defmt`, otherwise
//! they expand to nothing but still evaluate (and borrow) their arguments.
//!
//! `defmt` resolves `defmt::` at the call site, so a module which logs imports
//! `crate::defmt` when the feature is on.
#![allow(unused_macros)]

#[cfg(feature = "defmt-03")]
macro_rules! error {
    ($($arg:tt)*) => { defmt::error!($($arg)*) };
}

#[cfg(not(feature = "defmt-03"))]
macro_rules! error {
    ($s:literal $(, $x:expr)* $(,)?) => {{
        let _ = ($( & $x ),*);
    }};
}

#[cfg(feature = "defmt-03")]
macro_rules! warn {
    ($($arg:tt)*) => { defmt::warn!($($arg)*) };
}

#[cfg(not(feature = "defmt-03"))]
macro_rules! warn {
    ($s:literal $(, $x:expr)* $(,)?) => {{
        let _ = ($( & $x ),*);
    }};
}

#[cfg(feature = "defmt-03")]
macro_rules! debug {
    ($($arg:tt)*) => { defmt::debug!($($arg)*) };
}

#[cfg(not(feature = "defmt-03"))]
macro_rules! debug {
    ($s:literal $(, $x:expr)* $(,)?) => {{
        let _ = ($( & $x ),*);
    }};
}

#[cfg(test)]
mod tests {
    #[cfg(feature = "defmt-03")]
    use crate::defmt;

    #[test]
    fn arguments_evaluated_once() {
        let mut calls = 0u32;
        let mut call = || {
            calls += 1;
            calls
        };

        error!("{}", call());
        warn!("{} {}", call(), 7u8);
        debug!("no arguments");

        assert_eq!(calls, 2);
    }
}
