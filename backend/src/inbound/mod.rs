//! Driving adapters that accept work from the outside world.

pub mod http;
