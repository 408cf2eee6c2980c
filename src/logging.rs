//! Crate-internal logging macros.
//!
//! Every level macro funnels into [`__feed_log!`], which forwards to `tracing` under the
//! `event_feed` target when the `tracing` feature is enabled and otherwise only evaluates the
//! field expressions by reference, so disabling logging never changes borrow or move behaviour.

#[doc(hidden)]
#[macro_export]
#[cfg(feature = "tracing")]
macro_rules! __feed_log {
    ($level:ident, $($arg:tt)*) => {
        tracing::$level!(target: "event_feed", $($arg)*)
    };
}

#[doc(hidden)]
#[macro_export]
#[cfg(not(feature = "tracing"))]
macro_rules! __feed_log {
    ($level:ident, $($arg:tt)*) => {
        $crate::__feed_log_fields!($($arg)*)
    };
}

#[doc(hidden)]
#[macro_export]
#[cfg(not(feature = "tracing"))]
macro_rules! __feed_log_fields {
    ($field:ident = % $value:expr, $($rest:tt)*) => {{
        let _ = &$value;
        $crate::__feed_log_fields!($($rest)*);
    }};
    ($field:ident = ? $value:expr, $($rest:tt)*) => {{
        let _ = &$value;
        $crate::__feed_log_fields!($($rest)*);
    }};
    ($field:ident = $value:expr, $($rest:tt)*) => {{
        let _ = &$value;
        $crate::__feed_log_fields!($($rest)*);
    }};
    ($message:literal $($rest:tt)*) => {};
    () => {};
}

#[allow(unused_macros)]
macro_rules! error {
    ($($arg:tt)*) => { $crate::__feed_log!(error, $($arg)*) };
}

#[allow(unused_macros)]
macro_rules! warn {
    ($($arg:tt)*) => { $crate::__feed_log!(warn, $($arg)*) };
}

#[allow(unused_macros)]
macro_rules! info {
    ($($arg:tt)*) => { $crate::__feed_log!(info, $($arg)*) };
}

#[allow(unused_macros)]
macro_rules! debug {
    ($($arg:tt)*) => { $crate::__feed_log!(debug, $($arg)*) };
}

#[allow(unused_macros)]
macro_rules! trace {
    ($($arg:tt)*) => { $crate::__feed_log!(trace, $($arg)*) };
}
