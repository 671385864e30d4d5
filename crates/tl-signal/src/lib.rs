//! Reactive primitives for the timeline toolkit
//!
//! This crate provides the two state containers everything else is built on:
//! [`Store`], a writable value container with equality-gated synchronous
//! notification, and [`Signal`], its read-only handle. Subscriptions are
//! RAII handles ([`Subscription`]) that unsubscribe on drop.

mod store;
mod subscription;

pub use store::{Signal, Store};
pub use subscription::Subscription;
