//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls, resolver and coordinator into use-case
//!   level APIs.
//! - Keep CLI and other hosts decoupled from storage details.

pub mod variant_service;
