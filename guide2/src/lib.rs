#![no_std]

pub mod hcsr04;
pub mod light;
