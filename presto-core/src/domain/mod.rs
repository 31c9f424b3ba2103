//! Core domain types
//!
//! This module contains the domain structures shared between the job engine
//! (which produces them), the HTTP server (which exposes them) and the client.

pub mod job;
pub mod report;
