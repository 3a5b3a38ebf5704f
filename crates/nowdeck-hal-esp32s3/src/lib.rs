#![no_std]
#![allow(async_fn_in_trait)]

//! ESP32-S3 board glue for the now-playing deck: buttons,
//! HTTPS transport, flash-backed credentials and the memory-LCD renderer.

pub mod input;
pub mod network;
pub mod platform;
pub mod render;
pub mod storage;
