//! Shared helpers for the integration tests.

#![allow(dead_code)]

pub mod hir_helpers;
pub mod source_fixtures;
