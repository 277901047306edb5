//! gwctl — deploy and operate a self-hosted Kong gateway on serverless containers.
//!
//! The tool has two halves:
//! - `infra` provisions the cloud resources the gateway runs on (managed
//!   Postgres, a container namespace, a public gateway container and a
//!   private admin container) and snapshots the resulting endpoints into a
//!   local config file.
//! - `route`/`consumer`/`jwt` drive the Kong admin API of a deployed
//!   gateway using that snapshot.

pub mod admin;
pub mod cli;
pub mod cloud;
pub mod config;
pub mod infra;
