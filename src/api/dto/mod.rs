//! Data Transfer Objects for the diagnostics REST responses.

pub mod presence_dto;

pub use presence_dto::*;
