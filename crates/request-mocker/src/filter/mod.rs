//! Request filters: the rules the mocking engine matches against.
//!
//! ## Module Structure
//!
//! - `types`: request view, payloads and the response descriptor
//! - `state`: per-filter mutable key-value state
//! - `core`: `RequestFilter` and its builder

mod core;
mod state;
mod types;

pub use self::core::{PayloadGenerator, PayloadSource, RequestFilter, RequestFilterBuilder};
pub use state::FilterState;
pub use types::{BodyMode, MockRequest, Payload, ResponseDescriptor};
