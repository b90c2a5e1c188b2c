//! Progress output driven by pipeline events

pub mod reporter;
