#![cfg_attr(not(test), no_std)]
#![allow(async_fn_in_trait)]

//! Now-playing controller core: playback polling, command relay, shared
//! state and the button gesture engine. Board specifics live behind the
//! traits in [`http`], [`clock`], [`credentials`], [`input`] and [`render`].

extern crate alloc;

pub mod api;
pub mod app;
pub mod auth;
pub mod clock;
pub mod commands;
pub mod config;
pub mod credentials;
pub mod http;
pub mod input;
pub mod link;
pub mod render;
pub mod session;
pub mod shared;
pub mod snapshot;
pub mod text;
pub mod worker;

#[cfg(test)]
mod testing;
