//! Presto Core
//!
//! Core types and abstractions for the Presto report-rendering job system.
//!
//! This crate contains:
//! - Domain types: job codes, job descriptors, report targets, request signatures
//! - DTOs: Data transfer objects for the HTTP API

pub mod domain;
pub mod dto;
