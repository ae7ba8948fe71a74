#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Center-out reaching trial controller (transport-agnostic).
//!
//! The crate consumes normalized events and produces serialized snapshots; it
//! never opens a socket. Collaborators plug in through
//! `centerout_traits::{Observer, RewardDispenser}` and `SourceLoader`.
//!
//! ## Architecture
//!
//! - **Machine**: trial state enum, transition table and generation-guarded
//!   timeouts (`machine` module)
//! - **Geometry**: linear map, EMA, containment and randomized holds
//! - **Layout**: half-circle outer ring plus a center inner ring
//! - **Store**: validated parameters with derived layout and deadlines
//! - **Sequencer**: cyclic target index reader
//! - **Hub**: observer registry and snapshot fan-out
//! - **Controller**: single-owner thread fed by one input queue, with a
//!   background deadline timer

pub mod controller;
pub mod cursor;
pub mod error;
pub mod event;
pub mod geometry;
pub mod hub;
pub mod layout;
pub mod machine;
pub mod mocks;
pub mod sequencer;
pub mod store;
pub mod timer;
pub mod util;

pub use controller::{
    Controller, ControllerHandle, ControllerSettings, FsSources, Input, InputSender, SourceLoader,
    Status,
};
pub use error::CoreError;
pub use event::{Event, EventError, Snapshot};
pub use hub::{BroadcastHub, ChannelObserver, ObserverId};
pub use machine::{Block, Direction, Machine, TrialCounters, TrialState, Trigger};
pub use store::ParameterStore;
