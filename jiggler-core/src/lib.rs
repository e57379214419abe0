#![no_std]

// Shared logic for the jiggle mouse.
//
// Everything here stays portable across the RP2040 firmware and host tooling:
// no standard library, no executor, and hardware reached only through the
// traits each module exposes.

pub mod config;
pub mod driver;
pub mod jiggle;
pub mod jitter;
pub mod power;
pub mod schedule;
pub mod telemetry;
