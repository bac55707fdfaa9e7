//! Core types and the enrollment engine for Registro.
//!
//! The engine is split into the prerequisite graph ([`graph`]), the
//! eligibility check ([`eligibility`]) and the enrollment lifecycle
//! ([`lifecycle`]). All three talk to persistence through the
//! [`catalog::CatalogStore`] trait and never open transactions themselves;
//! backends wrap each call in one. This crate has no database or transport
//! dependencies.

// Native `async fn` in traits; the `Send` bounds are spelled out on
// `Registry`'s return types.
#![allow(async_fn_in_trait)]

pub mod cache;
pub mod catalog;
pub mod course;
pub mod eligibility;
pub mod enrollment;
pub mod error;
pub mod graph;
pub mod lifecycle;
pub mod memory;
pub mod registry;
pub mod student;

pub use error::{Error, ErrorKind, Result};
