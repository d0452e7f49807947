//! Inbound API surfaces.

pub mod rest;
