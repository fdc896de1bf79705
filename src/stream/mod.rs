//! Stream combinators for timing subscriptions

mod throttle;

pub use throttle::{Throttle, ThrottleExt};
