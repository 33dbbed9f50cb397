//! # Hermes Test
//!
//! In-memory testing for Hermes dispatchers.
//!
//! [`TestClient`] feeds requests straight into
//! [`Dispatcher::execute`](hermes_server::Dispatcher::execute) without binding
//! a socket, and returns a buffered [`TestResponse`] with assertion helpers.
//!
//! ```ignore
//! use hermes_test::TestClient;
//!
//! let client = TestClient::new(dispatcher);
//! let response = client.post("/users").json(&json!({"name": "ada"})).send().await;
//! response.assert_status(StatusCode::CREATED);
//! ```

#![doc(html_root_url = "https://docs.rs/hermes-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod response;

pub use client::{TestClient, TestClientRequest};
pub use error::TestError;
pub use response::TestResponse;
