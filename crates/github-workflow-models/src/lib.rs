//! Data models for GitHub Actions workflow definitions.
//!
//! These models are intentionally minimal: they capture the trigger,
//! job, and step structure that static analysis cares about, and
//! tolerate (by ignoring) everything else in the document.

#![forbid(unsafe_code)]

pub mod common;
pub mod workflow;
