//! Roster Attrs - attribute conversion for imported wrestler rosters
//!
//! Converts raw source-database attributes onto the game's target scale
//! through a data-driven mapping profile, and reports on the result.

pub mod convert;
pub mod core;
pub mod profile;
pub mod report;
