#![allow(clippy::module_inception)]

mod attributes;
mod element;
mod node;

pub use attributes::{Attribute, AttributeLookup, Attributes};
pub use element::ElementData;
pub use node::*;
