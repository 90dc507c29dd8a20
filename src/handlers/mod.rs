//! HTTP handlers

pub mod health;
pub mod dashboard;
pub mod form;
pub mod detection;
pub mod duration;
pub mod predict;
pub mod models;
