//! HTTP handlers, one module per API surface.

pub mod auth;
pub mod calendar;
pub mod equipment;
pub mod payments;
pub mod profile;
pub mod sessions;
pub mod workouts;
