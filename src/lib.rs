//! Habit tracking storage with interchangeable local and remote backends.
//!
//! Every entity family (habits, events, categories, rules, logs) is reached
//! through a repository trait in [`repository`]. [`db`] implements them over
//! SQLite, [`remote`] over the habit service's HTTP API, and [`selector`]
//! wires one of the two behind each trait according to [`config`].

pub mod config;
pub mod db;
pub mod models;
pub mod remote;
pub mod repository;
pub mod selector;
