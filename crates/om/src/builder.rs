//! The common object-model builder/validator (§4.10 "Common builder"):
//! every dialect reader (`fdd1516`, `fdd1516e`, `fed`) drives the same
//! `push_*`/`add_*`/`current_*` calls while parsing, then calls
//! [`FomStringModuleBuilder::validate`] once at end-of-document to qualify
//! names, check uniqueness, synthesize the `HLAobjectRoot`/
//! `HLAinteractionRoot` classes, and force the privilege-to-delete
//! attribute.
//!
//! `push_object_class`/`push_interaction_class` record the stack top at
//! push time as the new class's parent index (`None` at top level); the
//! parent-index table is walked by `validate`'s ancestor-uniqueness passes
//! (steps 7/9) and is kept in lock-step with the class list whenever a
//! synthetic root is inserted at index 0.

use std::collections::HashSet;

use crate::error::OmError;
use crate::model::{
    Attribute, Dimension, FomStringModule, InteractionClass, ObjectClass, Parameter,
    TransportationType, UpdateRate,
};

#[derive(Debug, Default)]
pub struct FomStringModuleBuilder {
    module: FomStringModule,
    object_class_stack: Vec<usize>,
    parent_object_class: Vec<Option<usize>>,
    interaction_class_stack: Vec<usize>,
    parent_interaction_class: Vec<Option<usize>>,
}

impl FomStringModuleBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_transportation_type(&mut self) {
        self.module.transportation_types.push(TransportationType::default());
    }

    /// # Panics
    /// If called without a preceding [`add_transportation_type`](Self::add_transportation_type),
    /// an invariant every dialect reader maintains itself, never driven by
    /// untrusted input.
    pub fn current_transportation_type(&mut self) -> &mut TransportationType {
        self.module
            .transportation_types
            .last_mut()
            .expect("no current transportation type")
    }

    pub fn add_update_rate(&mut self) {
        self.module.update_rates.push(UpdateRate::default());
    }

    pub fn current_update_rate(&mut self) -> &mut UpdateRate {
        self.module.update_rates.last_mut().expect("no current update rate")
    }

    pub fn add_dimension(&mut self) {
        self.module.dimensions.push(Dimension::default());
    }

    pub fn current_dimension(&mut self) -> &mut Dimension {
        self.module.dimensions.last_mut().expect("no current dimension")
    }

    pub fn push_object_class(&mut self) {
        let parent = self.object_class_stack.last().copied();
        let index = self.module.object_classes.len();
        self.module.object_classes.push(ObjectClass::default());
        self.parent_object_class.push(parent);
        self.object_class_stack.push(index);
    }

    pub fn pop_object_class(&mut self) {
        self.object_class_stack.pop().expect("pop_object_class without matching push");
    }

    pub fn current_object_class(&mut self) -> &mut ObjectClass {
        let index = *self.object_class_stack.last().expect("no current object class");
        &mut self.module.object_classes[index]
    }

    pub fn add_attribute(&mut self) {
        self.current_object_class().attributes.push(Attribute::default());
    }

    pub fn current_object_class_attribute(&mut self) -> &mut Attribute {
        self.current_object_class().attributes.last_mut().expect("no current attribute")
    }

    /// §4.10: duplicate dimension references on the *same* attribute are a
    /// parse-time `ErrorReadingFDD`, not deferred to `validate`.
    pub fn add_attribute_dimension(&mut self, name: &str) -> Result<(), OmError> {
        let class_name = self.current_object_class().name.join(".");
        let attribute = self.current_object_class_attribute();
        if attribute.dimensions.iter().any(|d| d == name) {
            return Err(OmError::reading_fdd(format!(
                "Duplicate dimension \"{name}\" while processing attribute \"{}\" for ObjectClass \"{class_name}\"",
                attribute.name
            )));
        }
        attribute.dimensions.push(name.to_string());
        Ok(())
    }

    pub fn push_interaction_class(&mut self) {
        let parent = self.interaction_class_stack.last().copied();
        let index = self.module.interaction_classes.len();
        self.module.interaction_classes.push(InteractionClass::default());
        self.parent_interaction_class.push(parent);
        self.interaction_class_stack.push(index);
    }

    pub fn pop_interaction_class(&mut self) {
        self.interaction_class_stack
            .pop()
            .expect("pop_interaction_class without matching push");
    }

    pub fn current_interaction_class(&mut self) -> &mut InteractionClass {
        let index = *self.interaction_class_stack.last().expect("no current interaction class");
        &mut self.module.interaction_classes[index]
    }

    pub fn add_interaction_dimension(&mut self, name: &str) -> Result<(), OmError> {
        let class = self.current_interaction_class();
        if class.dimensions.iter().any(|d| d == name) {
            return Err(OmError::reading_fdd(format!(
                "Duplicate dimension \"{name}\" while processing InteractionClass \"{}\"",
                class.name.join(".")
            )));
        }
        class.dimensions.push(name.to_string());
        Ok(())
    }

    pub fn add_parameter(&mut self) {
        self.current_interaction_class().parameters.push(Parameter::default());
    }

    pub fn current_interaction_class_parameter(&mut self) -> &mut Parameter {
        self.current_interaction_class()
            .parameters
            .last_mut()
            .expect("no current parameter")
    }

    #[must_use]
    pub fn into_module(self) -> FomStringModule {
        self.module
    }

    #[must_use]
    pub fn module(&self) -> &FomStringModule {
        &self.module
    }

    /// Runs the full §4.10 validation/normalization pass. Consumes nothing;
    /// mutates the module in place (qualifying names, synthesizing the two
    /// root classes) and returns the first violated invariant, if any.
    pub fn validate(&mut self) -> Result<(), OmError> {
        self.qualify_names();
        self.check_transportation_types()?;
        let dimension_names = self.check_dimensions()?;
        self.check_interaction_classes(&dimension_names)?;
        self.check_object_classes(&dimension_names)?;
        self.synthesize_interaction_root();
        self.check_ancestor_parameter_uniqueness()?;
        self.synthesize_object_root();
        self.check_ancestor_attribute_uniqueness()?;
        Ok(())
    }

    fn qualify_names(&mut self) {
        for i in 0..self.module.interaction_classes.len() {
            let Some(parent) = self.parent_interaction_class[i] else { continue };
            let mut chain = self.module.interaction_classes[parent].name.clone();
            let own = self.module.interaction_classes[i]
                .name
                .first()
                .cloned()
                .unwrap_or_default();
            chain.push(own);
            self.module.interaction_classes[i].name = chain;
        }
        for i in 0..self.module.object_classes.len() {
            let Some(parent) = self.parent_object_class[i] else { continue };
            let mut chain = self.module.object_classes[parent].name.clone();
            let own = self.module.object_classes[i].name.first().cloned().unwrap_or_default();
            chain.push(own);
            self.module.object_classes[i].name = chain;
        }
    }

    fn check_transportation_types(&self) -> Result<(), OmError> {
        let mut seen = HashSet::new();
        for t in &self.module.transportation_types {
            if t.name.is_empty() {
                return Err(OmError::reading_fdd("Empty transportation type name."));
            }
            if !seen.insert(t.name.clone()) {
                return Err(OmError::reading_fdd(format!(
                    "Duplicate transportation type name \"{}\".",
                    t.name
                )));
            }
        }
        Ok(())
    }

    fn check_dimensions(&self) -> Result<HashSet<String>, OmError> {
        let mut seen = HashSet::new();
        for d in &self.module.dimensions {
            if d.name.is_empty() {
                return Err(OmError::reading_fdd("Empty dimension name."));
            }
            if !seen.insert(d.name.clone()) {
                return Err(OmError::reading_fdd(format!("Duplicate dimension name \"{}\".", d.name)));
            }
        }
        Ok(seen)
    }

    fn check_interaction_classes(&self, dimension_names: &HashSet<String>) -> Result<(), OmError> {
        let mut seen = HashSet::new();
        for c in &self.module.interaction_classes {
            if c.name.is_empty() {
                return Err(OmError::reading_fdd("Empty interaction class name."));
            }
            if !seen.insert(c.name.clone()) {
                return Err(OmError::reading_fdd(format!(
                    "Duplicate interactionClass name \"{}\".",
                    c.name.join(".")
                )));
            }
            for dim in &c.dimensions {
                if !dimension_names.contains(dim) {
                    return Err(OmError::reading_fdd(format!(
                        "Undefined dimension for interactionClass name \"{}\".",
                        c.name.join(".")
                    )));
                }
            }
        }
        Ok(())
    }

    fn check_object_classes(&self, dimension_names: &HashSet<String>) -> Result<(), OmError> {
        let mut seen = HashSet::new();
        for c in &self.module.object_classes {
            if c.name.is_empty() {
                return Err(OmError::reading_fdd("Empty object class name."));
            }
            if !seen.insert(c.name.clone()) {
                return Err(OmError::reading_fdd(format!(
                    "Duplicate objectClass name \"{}\".",
                    c.name.join(".")
                )));
            }
            for attribute in &c.attributes {
                for dim in &attribute.dimensions {
                    if !dimension_names.contains(dim) {
                        return Err(OmError::reading_fdd(format!(
                            "Undefined dimension for attribute \"{}\" in objectClass name \"{}\".",
                            attribute.name,
                            c.name.join(".")
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn synthesize_interaction_root(&mut self) {
        let has_root = self
            .module
            .interaction_classes
            .first()
            .is_some_and(|c| c.name == ["HLAinteractionRoot"]);
        if has_root {
            self.module.artificial_interaction_root = false;
            return;
        }
        self.module.artificial_interaction_root = true;
        self.module.interaction_classes.insert(0, InteractionClass::default());
        self.parent_interaction_class.insert(0, None);
        for parent in &mut self.parent_interaction_class[1..] {
            if let Some(p) = parent {
                *p += 1;
            }
        }
        for c in &mut self.module.interaction_classes {
            c.name.insert(0, "HLAinteractionRoot".to_string());
        }
    }

    fn synthesize_object_root(&mut self) {
        let has_root = self
            .module
            .object_classes
            .first()
            .is_some_and(|c| c.name == ["HLAobjectRoot"]);
        if has_root {
            self.module.artificial_object_root = false;
        } else {
            self.module.artificial_object_root = true;
            self.module.object_classes.insert(0, ObjectClass::default());
            self.parent_object_class.insert(0, None);
            for parent in &mut self.parent_object_class[1..] {
                if let Some(p) = parent {
                    *p += 1;
                }
            }
            for c in &mut self.module.object_classes {
                c.name.insert(0, "HLAobjectRoot".to_string());
            }
        }

        // Unconditionally: whatever sits at object class 0 carries exactly
        // one attribute, named HLAprivilegeToDeleteObject, whether or not
        // the root itself was synthesized (§4.10 step 6).
        let root = &mut self.module.object_classes[0];
        root.attributes.truncate(1);
        if root.attributes.is_empty() {
            root.attributes.push(Attribute::default());
        }
        root.attributes[0].name = "HLAprivilegeToDeleteObject".to_string();
    }

    /// Walks the parent-index chain from each interaction class to the
    /// root, accumulating parameter names into a single set per class so a
    /// name reused by an ancestor and descendant is rejected (step 7).
    fn check_ancestor_parameter_uniqueness(&self) -> Result<(), OmError> {
        for i in 0..self.module.interaction_classes.len() {
            let mut seen = HashSet::new();
            let mut cursor = Some(i);
            while let Some(j) = cursor {
                for p in &self.module.interaction_classes[j].parameters {
                    if !seen.insert(p.name.clone()) {
                        return Err(OmError::reading_fdd(format!(
                            "Duplicate parameter name \"{}\" in interactionClass \"{}\".",
                            p.name,
                            self.module.interaction_classes[i].name.join(".")
                        )));
                    }
                }
                cursor = self.parent_interaction_class[j];
            }
        }
        Ok(())
    }

    fn check_ancestor_attribute_uniqueness(&self) -> Result<(), OmError> {
        for i in 0..self.module.object_classes.len() {
            let mut seen = HashSet::new();
            let mut cursor = Some(i);
            while let Some(j) = cursor {
                for a in &self.module.object_classes[j].attributes {
                    if !seen.insert(a.name.clone()) {
                        return Err(OmError::reading_fdd(format!(
                            "Duplicate attribute name \"{}\" in objectClass \"{}\".",
                            a.name,
                            self.module.object_classes[i].name.join(".")
                        )));
                    }
                }
                cursor = self.parent_object_class[j];
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesizes_both_roots_when_absent() {
        let mut builder = FomStringModuleBuilder::new();
        builder.push_object_class();
        builder.current_object_class().name.push("Aircraft".to_string());
        builder.pop_object_class();
        builder.push_interaction_class();
        builder.current_interaction_class().name.push("Fire".to_string());
        builder.pop_interaction_class();

        builder.validate().unwrap();
        let module = builder.into_module();

        assert!(module.artificial_object_root);
        assert!(module.artificial_interaction_root);
        assert_eq!(module.object_classes[0].name, vec!["HLAobjectRoot"]);
        assert_eq!(module.object_classes[1].name, vec!["HLAobjectRoot", "Aircraft"]);
        assert_eq!(module.object_classes[0].attributes.len(), 1);
        assert_eq!(module.object_classes[0].attributes[0].name, "HLAprivilegeToDeleteObject");
        assert_eq!(module.interaction_classes[0].name, vec!["HLAinteractionRoot"]);
        assert_eq!(module.interaction_classes[1].name, vec!["HLAinteractionRoot", "Fire"]);
    }

    #[test]
    fn does_not_duplicate_root_when_already_present() {
        let mut builder = FomStringModuleBuilder::new();
        builder.push_object_class();
        builder.current_object_class().name.push("HLAobjectRoot".to_string());
        builder.pop_object_class();
        builder.push_interaction_class();
        builder.current_interaction_class().name.push("HLAinteractionRoot".to_string());
        builder.pop_interaction_class();

        builder.validate().unwrap();
        let module = builder.into_module();
        assert!(!module.artificial_object_root);
        assert!(!module.artificial_interaction_root);
        assert_eq!(module.object_classes.len(), 1);
        assert_eq!(module.interaction_classes.len(), 1);
    }

    #[test]
    fn duplicate_dimension_on_same_attribute_is_rejected() {
        let mut builder = FomStringModuleBuilder::new();
        builder.add_dimension();
        builder.current_dimension().name = "Position".to_string();
        builder.push_object_class();
        builder.current_object_class().name.push("Aircraft".to_string());
        builder.add_attribute();
        builder.add_attribute_dimension("Position").unwrap();
        let err = builder.add_attribute_dimension("Position").unwrap_err();
        assert!(matches!(err, OmError::ErrorReadingFdd(_)));
    }

    #[test]
    fn undefined_dimension_reference_is_rejected() {
        let mut builder = FomStringModuleBuilder::new();
        builder.push_interaction_class();
        builder.current_interaction_class().name.push("Fire".to_string());
        builder.current_interaction_class().dimensions.push("Nope".to_string());
        builder.pop_interaction_class();
        let err = builder.validate().unwrap_err();
        assert!(matches!(err, OmError::ErrorReadingFdd(_)));
    }

    #[test]
    fn ancestor_parameter_collision_is_rejected() {
        let mut builder = FomStringModuleBuilder::new();
        builder.push_interaction_class();
        builder.current_interaction_class().name.push("HLAinteractionRoot".to_string());
        builder.add_parameter();
        builder.current_interaction_class_parameter().name = "Shared".to_string();
        builder.push_interaction_class();
        builder.current_interaction_class().name.push("Fire".to_string());
        builder.add_parameter();
        builder.current_interaction_class_parameter().name = "Shared".to_string();
        builder.pop_interaction_class();
        builder.pop_interaction_class();

        let err = builder.validate().unwrap_err();
        assert!(matches!(err, OmError::ErrorReadingFdd(_)));
    }
}
