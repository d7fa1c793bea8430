#![deny(unsafe_code)]

/// Coordinator that merges the chat session and the emotion sampler into one view.
pub mod app;
/// Transcript model and the chat request/response state machine.
pub mod chat;
/// Layered configuration (defaults, JSON file, environment).
pub mod settings;
/// Line-oriented rendering of view updates for the terminal binary.
pub mod terminal;
/// Pure view derivation consumed by the presentation layer.
pub mod view;
