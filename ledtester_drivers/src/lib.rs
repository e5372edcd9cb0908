//! Board support of the LED tester: pin map, converter front end with DMA and
//! the four-channel PWM timer. Implements the engine ports of `ledtester_algo`.

#![no_std]

pub mod analog;
pub mod pinout;
pub mod pwm;
