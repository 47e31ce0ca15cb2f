extern crate futures_channel;
extern crate futures_util;
extern crate log;
extern crate serde;
#[macro_use]
extern crate serde_derive;
extern crate serde_json;
extern crate thiserror;

pub mod api;
pub mod auth;
pub mod detail;
pub mod feed;
pub mod likes;
pub mod removal;
pub mod session;

#[cfg(target_arch = "wasm32")]
pub mod browser;
