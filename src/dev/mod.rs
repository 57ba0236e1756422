//! Device drivers

pub mod ch423;
