//! Timed multi-stage alert controller for devices with addressable glyph
//! lights.
//!
//! Every alert feature (USB-disconnect guard, low-battery flash, unlock
//! animation, battery peek) runs through the same life-cycle: the user
//! confirms, a short countdown gives them a chance to back out, then a timed
//! alert runs to completion or is cancelled. The [`alert`] module holds that
//! controller, [`feature`] describes the individual alerts, and [`hw_trait`]
//! defines the peripherals the controller drives.

pub mod alert;
pub mod feature;
pub mod hw_trait;
pub mod settings;
pub mod sim;
pub mod tracing;
