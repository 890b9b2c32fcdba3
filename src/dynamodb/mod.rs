//! # DynamoDB Module
//!
//! Thin wrapper over Amazon DynamoDB used to store subscription records.
//!
//! ## Components
//!
//! - `DynamoDb`: A client wrapper for performing DynamoDB operations.
//! - `Item`: A DynamoDB item, convertible to and from serde records.
//! - `Table`: A DynamoDB table name and key configuration.
//!
//! ## Usage
//!
//! Credentials and region come from the usual AWS environment variables
//! (`AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`, `AWS_REGION`, optionally
//! `AWS_SESSION_TOKEN`). Setting `AWS_ENDPOINT_URL` points the client at a
//! local DynamoDB for development.

mod client;
mod item;
mod table;

pub use client::DynamoDb;
pub use item::Item;
pub use table::Table;
