//! TechHealth Cloud
//!
//! Provider abstraction shared by the TechHealth tooling: the plan model,
//! the provider trait and the local record of what each stack declared
//! the last time it was applied.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                 techhealth CLI                   │
//! │        (synth / plan / deploy / destroy)         │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │               techhealth-cloud                   │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │          Provider Abstraction             │   │
//! │  │  trait CloudProvider { ... }              │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────┐            │
//! │  │  Plan model  │  │  State Mgmt  │            │
//! │  └──────────────┘  └──────────────┘            │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//!           ┌───────▼────────┐
//!           │ cloudformation │
//!           │    provider    │
//!           └────────────────┘
//! ```

pub mod action;
pub mod error;
pub mod provider;
pub mod state;

pub use action::{Action, ActionResult, ActionType, ApplyResult, Plan, PlanSummary};
pub use error::{CloudError, Result};
pub use provider::{CloudProvider, DeletionPolicy, ResourceConfig, ResourceSet};
pub use state::{
    GlobalState, ResourceState, ResourceStatus, STATE_DIR, StackState, StateLock, StateManager,
};
