//! Reference concepts and synchronizations for Concord.
//!
//! This crate provides:
//! - [`Api`] - Inbound requests and their responses
//! - [`Quiz`] - Quizzes, questions, and options
//! - [`Activation`] - Live polls over a question and the votes cast in them
//! - [`syncs`] - The rules composing them into an HTTP-shaped quiz service
//! - [`Route`] - Concrete paths resolved to rule-facing templates
//! - [`QuizApp`] - Everything wired into one engine

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod activation;
pub mod api;
pub mod app;
pub mod ids;
pub mod payload;
pub mod quiz;
pub mod routes;
pub mod syncs;

pub use activation::Activation;
pub use api::Api;
pub use app::QuizApp;
pub use ids::IdGen;
pub use quiz::Quiz;
pub use routes::{ROUTES, Route};
