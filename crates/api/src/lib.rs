//! HTTP delivery surface: the embed, leads, events, and stats endpoints.

pub mod rest;
pub mod server;

pub use server::ApiServer;
