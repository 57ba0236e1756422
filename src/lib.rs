#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![cfg_attr(not(any(test, feature = "std")), no_std)]

mod bus;
mod common;
pub mod dev;
mod error;
mod isr;
mod pin;

pub use bus::I2cBus;
pub use common::mode;
pub use common::Config;
pub use common::Group;
pub use common::InterruptType;
pub use common::PinMode;
pub use common::PinSelect;
pub use common::PortDriver;
pub use error::Error;
pub use pin::{Pin, PinError};

pub(crate) use bus::I2cExt;

pub use dev::ch423::{gpio_pin_description, gpo_pin_description, Ch423, Driver, Parts};
pub use isr::ExtIPin;
pub use isr::InterruptHandler;
