// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Invalidation events and the bus that broadcasts them.
//!
//! After a write lands in the shared tier, the writing node publishes an
//! [`InvalidationEvent`] so that every node, the writer included, evicts its
//! local copy of the key. Events travel as JSON:
//!
//! ```json
//! {"key": "user:42", "operation": "update"}
//! ```
//!
//! The bus is a plain topic-based publish/subscribe channel of raw payloads
//! ([`InvalidationBus`], [`Subscription`]). Delivery is at-least-once with no
//! ordering across publishers; a subscriber that falls behind is told how many
//! payloads it missed through [`Delivery::Lagged`].
//!
//! [`MemoryBus`] implements the bus in-process on `tokio::sync::broadcast`.
//!
//! # Example
//!
//! ```
//! use tiersync_bus::{DEFAULT_TOPIC, Delivery, InvalidationBus, InvalidationEvent, MemoryBus, Subscription};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> tiersync_tier::Result<()> {
//! let bus = MemoryBus::new();
//! let mut subscription = bus.subscribe(DEFAULT_TOPIC).await?;
//!
//! let event = InvalidationEvent::delete("user:42");
//! bus.publish(DEFAULT_TOPIC, event.encode()?).await?;
//!
//! let Some(Delivery::Payload(payload)) = subscription.next_delivery().await else {
//!     panic!("expected a payload");
//! };
//! assert_eq!(InvalidationEvent::decode(&payload)?, event);
//! # Ok(())
//! # }
//! ```

mod bus;
mod event;
mod memory;

#[doc(inline)]
pub use bus::{DEFAULT_TOPIC, Delivery, InvalidationBus, Subscription};
#[doc(inline)]
pub use event::{InvalidationEvent, Operation};
#[doc(inline)]
pub use memory::{MemoryBus, MemorySubscription};
