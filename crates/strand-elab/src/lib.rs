//! Strand delay resolution
//!
//! Turns rise/fall/decay delay specifications into tick counts at the design
//! precision, runtime expressions, or nets carrying the delay value.

pub mod error;
pub mod pass;
pub mod resolve;

pub use error::{DelayError, Result};
pub use pass::{resolve_design, DelayStats};
pub use resolve::{calculate_value, make_delay_net, real_to_ticks, resolve, scale_to_precision};
