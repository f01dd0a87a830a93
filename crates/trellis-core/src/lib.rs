//! Core systems for Trellis.
//!
//! This crate provides the reactive foundation the Trellis data layer is
//! built on:
//!
//! - **Signals**: ordered, synchronous, re-entrancy-safe slot lists
//! - **Event Bus**: per-instance keyed publish/subscribe over signals
//! - **Varying**: reactive value cells with derivation and lifetime-scoped
//!   listening
//! - **Key Paths**: structured dotted attribute keys
//!
//! # Varying Example
//!
//! ```
//! use trellis_core::Varying;
//!
//! let name = Varying::new("Ada".to_string());
//! let greeting = name.map(|n| format!("Hello, {n}"));
//!
//! let _sub = greeting.react_now(|text| println!("{text}"));
//! name.set_value("Grace".to_string());
//! assert_eq!(greeting.get(), "Hello, Grace");
//! ```
//!
//! # Event Bus Example
//!
//! ```
//! use trellis_core::EventBus;
//!
//! let bus = EventBus::<&'static str, i32>::new();
//! let listener = bus.on("saved", |version| println!("saved v{version}"));
//! bus.emit(&"saved", 3);
//! bus.off(&listener);
//! ```

mod error;
mod event;
pub mod logging;
pub mod path;
pub mod signal;
mod subscription;
pub mod varying;

pub use error::{Result, TrellisError};
pub use event::{EventBus, Listenable, Listener};
pub use logging::{TreeFormatOptions, TreeStyle};
pub use path::{IntoKeyPath, KeyPath};
pub use signal::{ConnectionId, Signal, SignalEmitter};
pub use subscription::Subscription;
pub use varying::{Varying, VaryingEvent, WeakVarying};
