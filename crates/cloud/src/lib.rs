//! External providers used by the beat store.
//!
//! Each provider sits behind an `async-trait` trait so the fulfillment
//! pipeline and HTTP handlers can be exercised against in-process doubles:
//!
//! - [`storage::ObjectStorage`] -- S3-compatible object storage with
//!   presigned attachment URLs.
//! - [`payment::PaymentGateway`] -- hosted checkout sessions and webhook
//!   event decoding.

pub mod payment;
pub mod storage;
