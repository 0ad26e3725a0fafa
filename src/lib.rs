//! Deployment metrics (DORA style) computed from a repository's deployment
//! history, usable as a CLI or as a GitHub Action step.

pub mod action;
pub mod auth;
pub mod cli;
pub mod deployments;
pub mod error;
pub mod metrics;
pub mod providers;
