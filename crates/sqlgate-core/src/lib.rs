//! # sqlgate-core: Pure Query Compilation
//!
//! This crate turns structured filter, join and payload descriptions into
//! PostgreSQL statement text. It performs no I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        sqlgate Data Flow                                │
//! │                                                                         │
//! │  Caller ──► Model (sqlgate-db) ──► Statement Builder ──► driver        │
//! │                                          │                              │
//! │  ┌───────────────────────────────────────▼─────────────────────────┐   │
//! │  │               ★ sqlgate-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │  literal  │  │  filter   │  │  params   │  │   join    │  │   │
//! │  │   │  encode   │◄─│  compile  │  │  bind     │  │  compile  │  │   │
//! │  │   └───────────┘  └─────┬─────┘  └─────┬─────┘  └─────┬─────┘  │   │
//! │  │                        └──────────────┼──────────────┘        │   │
//! │  │                                ┌──────▼──────┐                 │   │
//! │  │                                │  statement  │                 │   │
//! │  │                                └─────────────┘                 │   │
//! │  │   NO I/O • NO ASYNC • PURE FUNCTIONS                          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`value`] - `SqlValue` scalars and the `Row` type
//! - [`literal`] - SQL literal encoding for inlined filter values
//! - [`filter`] - Filter expressions and the filter compiler
//! - [`params`] - Positional parameter binding for INSERT / UPDATE
//! - [`join`] - Join descriptors and the join compiler
//! - [`payload`] - Ordered field → value maps
//! - [`statement`] - Statement text composition
//! - [`validation`] - Table name validation
//! - [`error`] - Compilation error types
//!
//! ## Example Usage
//!
//! ```rust
//! use sqlgate_core::{compile_filter, bind_parameters, Filter, Payload};
//!
//! let filter = Filter::any_of([Filter::eq("a", 1), Filter::eq("b", 2)]);
//! assert_eq!(compile_filter(&filter), "((a = 1) OR (b = 2))");
//!
//! let bound = bind_parameters(&Payload::new().with("x", 1).with("y", "s")).unwrap();
//! assert_eq!(bound.fields, "x, y");
//! assert_eq!(bound.placeholders, "$1, $2");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod filter;
pub mod join;
pub mod literal;
pub mod params;
pub mod payload;
pub mod statement;
pub mod validation;
pub mod value;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use filter::{compile_filter, where_clause, Combinator, Condition, Filter, Operator};
pub use join::{compile_join, Join, JoinKind};
pub use literal::encode;
pub use params::{bind_assignments, bind_parameters, BoundAssignments, BoundParams};
pub use payload::Payload;
pub use statement::Statement;
pub use value::{Row, SqlValue};
