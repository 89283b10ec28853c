//! gitdash: status cache and sync engine of a git provider dashboard.
//!
//! Work items, branches and build statuses from several GitHub and GitLab
//! instances are normalized into a provider-independent [`model::Model`].
//! The [`cache`] keeps the expensive statuses models between dispatches and
//! the [`controller`] decides what to fetch for each view.

pub mod cache;
pub mod config;
pub mod controller;
pub mod model;
pub mod provider;
pub mod report;
pub mod services;
pub mod view;
