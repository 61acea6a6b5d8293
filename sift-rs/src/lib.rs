//! `sift`: a guarded expression and template engine.
//!
//! Evaluates short, user-authored expressions such as
//! `this.value.length > 10 ? 'Too long' : 'OK'` against a sanitized,
//! host-supplied context, and substitutes results into `{{...}}`
//! placeholders.
//!
//! ```rust
//! use sift::{Engine, RawContext, RawValue, Value};
//!
//! let engine = Engine::new();
//! let ctx = RawContext::from([("name".to_string(), RawValue::from("World"))]);
//!
//! assert_eq!(engine.evaluate("name + '!'", &ctx), Ok(Value::from("World!")));
//! assert_eq!(engine.interpolate("Hello {{name}}!", &ctx), "Hello World!");
//! ```

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod expr;
pub mod interpolate;
pub mod limiter;

pub use cache::CacheStats;
pub use config::{ConfigError, EngineConfig};
pub use engine::{Engine, EvalOutcome};
pub use error::ExprError;
pub use expr::{HostObject, RawContext, RawValue, Value};
