//! Camera attendance monitoring: periodic frame capture, person/chair detection, occupancy
//! tracking and threshold alerts.

#[macro_use]
extern crate quick_error;

pub mod capture;
pub mod config;
pub mod model;
pub mod processing;
pub mod store;
