//! Lexigraph Core - weighted fact graph engine
//!
//! This crate provides the in-memory graph of subject-verb-object facts,
//! its balanced indexes and heaps, and the budgeted query engine that
//! answers questions over it.

pub mod disambiguation;
pub mod entity;
pub mod error;
pub mod fact;
pub mod graph;
pub mod heap;
pub mod limits;
pub mod query;
pub mod question;
pub mod registry;
pub mod relation;
pub mod text;
pub mod tree;

pub use disambiguation::{Candidate, Disambiguator, FirstCandidate, Scripted, Selection};
pub use entity::{EntityId, Noun, NounKey};
pub use error::{Error, Result};
pub use fact::{parse_facts, Fact};
pub use graph::{EntitySummary, Graph, GraphStats};
pub use limits::UNSPECIFIED_ID;
pub use query::{AnswerLine, AnswerQuery, LineRounder, LineSink, QueryContext, QueryEngine};
pub use question::{recognize, Question};
pub use registry::{Registry, Symbol};
pub use relation::{Direction, Edge};
