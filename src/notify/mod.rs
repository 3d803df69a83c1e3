pub mod pushover;
pub mod throttle;
