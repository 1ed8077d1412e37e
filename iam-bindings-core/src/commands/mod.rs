//! Commands module - service layer for binding operations

mod apply;
mod plan;
pub(crate) mod service;

pub use service::BindingsService;
