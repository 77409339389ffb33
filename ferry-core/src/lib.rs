//! Ferry Core
//!
//! Core types and abstractions for the Ferry bucket transfer pipeline.
//!
//! This crate contains:
//! - Domain types: Core business entities (tasks, stages, pipeline runs, credentials)
//! - DTOs: Data transfer objects for the service surface and its clients

pub mod domain;
pub mod dto;
