use std::error::Error;

pub mod client;
pub mod config;
pub mod drag;
pub mod error;
pub mod fetch;
pub mod frame;
pub mod model;
pub mod navigation;
pub mod overlay;
pub mod runtime;
pub mod view;

pub fn unpack_error(err: &(dyn Error)) -> String {
    let mut parts = Vec::new();
    parts.push(err.to_string());
    let mut current = err.source();
    while let Some(source) = current {
        parts.push(source.to_string());
        current = source.source();
    }
    parts.join(": ")
}
