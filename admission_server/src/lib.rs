//! # Admission server
//! This module hosts the HTTP server for school admissions. It is responsible for:
//! Accepting admission forms and opening applications.
//! Letting administrators move applications through the admission stages.
//! Checking out carts with the payment provider, and applying the provider's payment notifications.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `POST /submissions`, `GET /submissions/{id}`: Admission forms.
//! * `GET /progresses`, `GET /progresses/{id}`: The applicant's applications.
//! * `PUT /progresses/{id}`: Move an application to a new stage. Admins only.
//! * `POST /transactions/checkout`, `GET /transactions`, `GET /transactions/{school_id}`: Carts and checkouts.
//! * `POST /notif`: The payment provider's notification webhook. Unauthenticated.
//! * `GET /notifications/stats`: Notification delivery counters. Admins only.
//!
//! Every other route needs an `Authorization: Bearer <token>` header carrying a token issued by the account service.

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
