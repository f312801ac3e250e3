//! # condop-domain
//!
//! Pure domain model for the condop conditional operation dispatcher.
//!
//! ## Responsibilities
//! - Foundational types: trigger times, typed identifiers, error conventions
//! - Define **state records** (what perception reports: named states and when
//!   they were last observed)
//! - Define **conditions** (declarative predicates over state records)
//! - Define **operation specs** (declarative descriptions of atomic operations)
//! - Define **scene configuration** (ordered handlers plus a polling interval)
//! - Define **dispatch events** and **fired records** for observability
//! - Contain all invariant enforcement and validation
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or an async runtime.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod condition;
pub mod event;
pub mod fired;
pub mod operation;
pub mod scene;
pub mod state;
