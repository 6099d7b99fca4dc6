//! Service module that exports interfaces to external applications, APIs, etc.

pub mod matching;

// rexport some traits and utilty functions
pub use matching::{mapmatch, new_matching_handler, plan_requests, MapMatchingService, OsrmServer};
