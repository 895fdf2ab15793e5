//! The canonical object-model module record (§3 "Object-model module"):
//! what every one of the three dialect readers (`fdd1516`, `fdd1516e`,
//! `fed`) produces, and what [`crate::builder::FomStringModuleBuilder`]
//! validates and normalizes into.
//!
//! A class's `name` is its fully qualified chain, `["HLAobjectRoot",
//! "Platform", "Aircraft"]` rather than just `"Aircraft"`, built up by
//! [`crate::builder::FomStringModuleBuilder::validate`] from the single
//! token each dialect reader records at parse time.

/// A fully qualified class name: one token per ancestor, root first.
pub type QualifiedName = Vec<String>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportationType {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateRate {
    pub name: String,
    pub rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dimension {
    pub name: String,
    pub upper_bound: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub order_type: String,
    pub transportation_type: String,
    /// Dimension names this attribute varies over; validated against the
    /// module's global dimension set by `validate()` (§4.10 step 4).
    pub dimensions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectClass {
    pub name: QualifiedName,
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InteractionClass {
    pub name: QualifiedName,
    pub order_type: String,
    pub transportation_type: String,
    pub parameters: Vec<Parameter>,
    pub dimensions: Vec<String>,
}

/// The complete, dialect-independent result of reading an FDD/FED document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FomStringModule {
    pub transportation_types: Vec<TransportationType>,
    pub update_rates: Vec<UpdateRate>,
    pub dimensions: Vec<Dimension>,
    pub object_classes: Vec<ObjectClass>,
    pub interaction_classes: Vec<InteractionClass>,
    /// Set by `validate()` when no `HLAobjectRoot`/`HLAinteractionRoot`
    /// class was present in the source and one had to be synthesized
    /// (§4.10 step 5).
    pub artificial_object_root: bool,
    pub artificial_interaction_root: bool,
}
