//! Search specification and query compilation.

pub mod spec;
pub mod normalize;
pub mod ast;
pub mod compiler;
pub mod render;

pub use spec::{Category, MatchStrategy, OrderBy, Projection, Scope, SearchProperty, SearchSpec, TagOperator};
pub use ast::{CompiledQuery, Field, Pattern, Predicate, QueryAst, Statement};
pub use compiler::{build_search, compile_search};
