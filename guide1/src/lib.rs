#![no_std]

pub mod led_control;
