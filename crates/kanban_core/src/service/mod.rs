//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate lookup, engine and save calls into board use-cases.
//! - Keep callers decoupled from storage details.

pub mod board_service;
