//! The expression language core.
//!
//! Source text flows through four stages:
//!
//! - [`lexer`]: screening and tokenization
//! - [`parser`]: recursive descent into an [`ast::Expr`]
//! - [`context`]: host data → sanitized [`Context`]
//! - [`eval`]: AST + context → [`Value`]
//!
//! # Quick start
//!
//! ```rust
//! use sift::expr::{evaluate, parse_expr, sanitize, RawContext, RawValue, Value};
//!
//! let mut raw = RawContext::new();
//! raw.insert("count".into(), RawValue::from(3i64));
//!
//! let ast = parse_expr("count > 2 ? 'many' : 'few'").unwrap();
//! let value = evaluate(&ast, &sanitize(&raw)).unwrap();
//! assert_eq!(value, Value::from("many"));
//! ```

pub mod ast;
pub mod context;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod value;

pub use ast::Expr;
pub use context::{is_safe_key, sanitize, Context, HostObject, HostView};
pub use eval::{evaluate, Evaluator};
pub use lexer::{tokenize, Lexer, Token, TokenKind};
pub use parser::{parse, parse_expr};
pub use value::{RawContext, RawValue, Value};
