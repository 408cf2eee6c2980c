//! Assertion macros for tests that consume [`EventSubscription`](crate::EventSubscription)s or any
//! other stream of [`FeedResult`](crate::FeedResult)s.

pub mod macros;
