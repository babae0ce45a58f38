//! The five update-path primitives applications actually touch: [`Counter`], [`Histogram`],
//! [`Meter`], [`Timer`], and [`Gauge`].
//!
//! Each owns whichever L0/L1/L2 machinery it needs (a striped adder, a reservoir, a
//! [`SimpleMeter`](crate::rate::SimpleMeter)) and packages it into the [`crate::value`] types an
//! exporter actually wants to read.

mod counter;
mod gauge;
mod histogram;
mod meter;
mod timer;

pub use counter::Counter;
pub use gauge::Gauge;
pub use histogram::Histogram;
pub use meter::Meter;
pub use timer::{Timer, TimerContext, TimerStart};
