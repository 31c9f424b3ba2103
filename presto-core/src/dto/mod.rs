//! Data Transfer Objects for the HTTP API
//!
//! DTOs are lightweight, network-safe projections of domain entities. Server
//! local details such as artifact paths never appear here.

pub mod job;
pub mod report;
