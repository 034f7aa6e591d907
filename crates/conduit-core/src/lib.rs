//! Conduit Core -- transactional item routing for pipe networks.
//!
//! Interface nodes periodically pull items from one storage endpoint and
//! push them into the insertion targets reachable through the pipe network,
//! nearest first. Every transfer is atomic: it either commits in full or
//! leaves every container exactly as it was.
//!
//! # Per-Tick State Machine
//!
//! Each call to [`network::PipeNetwork::step`] ticks every interface once,
//! in ascending position order. A node tick moves through:
//!
//! 1. **Gate** -- Skip unless the tick is on the node's period, or a boost
//!    is available.
//! 2. **Source scan** -- Probe the first source with content inside a
//!    transaction that always aborts.
//! 3. **Resolve** -- Fetch the filtered, distance-sorted target list,
//!    reusing the memoized list while the topology fingerprint is unchanged.
//! 4. **Distribute** -- Insert into targets and extract the same amount from
//!    the source in one transaction; commit or abort.
//! 5. **Notify** -- Mark the node dirty, consume the boost, emit events.
//!
//! # Key Types
//!
//! - [`network::PipeNetwork`] -- Per-world state and the step loop.
//! - [`node::InterfaceNode`] -- One routing endpoint with its caches.
//! - [`endpoint::StorageEndpoint`] -- Transactional capability of one
//!   container face.
//! - [`transaction::Transaction`] -- Undo journal with commit/abort.
//! - [`resolver::TargetResolver`] -- Fingerprint-memoized target filter.
//! - [`rate::RateController`] -- Cadence gate and boosted capacity.
//! - [`event::EventBus`] -- Buffered routing events with passive listeners.
//! - [`world::ContainerWorld`] -- In-memory containers for hosts and tests.

pub mod cache;
pub mod config;
pub mod dirty;
pub mod endpoint;
pub mod event;
pub mod id;
pub mod item;
pub mod network;
pub mod node;
pub mod rate;
pub mod resolver;
pub mod topology;
pub mod transaction;
pub mod transfer;
pub mod world;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
