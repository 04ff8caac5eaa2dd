//! Spec layer: the operator specification XML and its validated model.
//!
//! This module owns:
//! - the element tree over `quick-xml` events
//! - shape/rank consistency rules
//! - the immutable model every later pass reads

pub mod load;
pub mod model;
pub mod shape;
pub mod xml;

pub use model::{
    Argument, Category, CategoryKind, Enum, Level, Operator, OperatorGroup, ProfileExpression,
    RankBound, RankRange, Spec, TypeSupport, UNSPECIFIED,
};
