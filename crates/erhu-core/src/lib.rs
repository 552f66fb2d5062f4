#![no_std]

#[cfg(test)]
extern crate std;

pub mod app;
pub mod consts;
pub mod input;
pub mod speaker;

mod screen;
