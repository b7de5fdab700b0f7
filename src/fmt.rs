// Logging shims: forward to `log` or `defmt`, whichever feature is enabled,
// and swallow the arguments otherwise.

#![macro_use]
#![allow(unused_macros)]

macro_rules! emit {
    ($level:ident, $s:literal $(, $x:expr)* $(,)?) => {
        {
            cfg_if::cfg_if! {
                if #[cfg(feature = "log")] {
                    ::log::$level!($s $(, $x)*);
                } else if #[cfg(feature = "defmt")] {
                    ::defmt::$level!($s $(, $x)*);
                } else {
                    let _ = ($( & $x ),*);
                }
            }
        }
    };
}

macro_rules! trace {
    ($($arg:tt)*) => {
        emit!(trace, $($arg)*)
    };
}

macro_rules! debug {
    ($($arg:tt)*) => {
        emit!(debug, $($arg)*)
    };
}

macro_rules! info {
    ($($arg:tt)*) => {
        emit!(info, $($arg)*)
    };
}

macro_rules! warn {
    ($($arg:tt)*) => {
        emit!(warn, $($arg)*)
    };
}

macro_rules! error {
    ($($arg:tt)*) => {
        emit!(error, $($arg)*)
    };
}
