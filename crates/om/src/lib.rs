//! Object-model readers: the three FDD/FED dialects (FDD1516 attribute XML,
//! FDD1516E child-element XML, FED parenthesized tokens) and the shared
//! builder/validator that normalizes whichever one was read into a single
//! canonical [`model::FomStringModule`].

pub mod builder;
pub mod error;
pub mod fdd1516;
pub mod fdd1516e;
pub mod fed;
pub mod loader;
pub mod model;

pub use builder::FomStringModuleBuilder;
pub use error::OmError;
pub use loader::load;
pub use model::{
    Attribute, Dimension, FomStringModule, InteractionClass, ObjectClass, Parameter,
    QualifiedName, TransportationType, UpdateRate,
};
