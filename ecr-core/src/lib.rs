//! ECR Core
//!
//! Core types shared by the ECR operator crates.
//!
//! This crate contains:
//! - API types: the `ECR` custom resource declared by users in the cluster
//! - Domain types: validated repository names and object references

pub mod api;
pub mod domain;
