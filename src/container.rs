use std::{any::TypeId, sync::Arc};

use bevy::{
    ecs::reflect::AppTypeRegistry,
    prelude::*,
    reflect::{ReflectRef, TypeInfo},
};
use jackdaw_commands::{PropertyAccessError, PropertyTarget, read_property, values_equal, write_all};

use crate::attributes::FieldAttributes;

// ---------------------------------------------------------------------------
// ContainerValue
// ---------------------------------------------------------------------------

/// The live state of one property across every selected target.
#[derive(Debug)]
pub enum ContainerValue {
    /// Every target holds this value.
    Uniform(Box<dyn PartialReflect>),
    /// Targets disagree; one value per target, in target order.
    Mixed(Vec<Box<dyn PartialReflect>>),
}

impl ContainerValue {
    fn from_values(mut values: Vec<Box<dyn PartialReflect>>) -> Self {
        let uniform = values
            .split_first()
            .is_none_or(|(first, rest)| rest.iter().all(|value| values_equal(&**first, &**value)));
        if uniform && !values.is_empty() {
            ContainerValue::Uniform(values.swap_remove(0))
        } else {
            ContainerValue::Mixed(values)
        }
    }

    pub fn is_uniform(&self) -> bool {
        matches!(self, ContainerValue::Uniform(_))
    }

    pub fn uniform(&self) -> Option<&dyn PartialReflect> {
        match self {
            ContainerValue::Uniform(value) => Some(&**value),
            ContainerValue::Mixed(_) => None,
        }
    }

    /// Every per-target value. A uniform value yields once.
    pub fn values(&self) -> impl Iterator<Item = &dyn PartialReflect> {
        let values: &[Box<dyn PartialReflect>] = match self {
            ContainerValue::Uniform(value) => std::slice::from_ref(value),
            ContainerValue::Mixed(values) => values,
        };
        values.iter().map(|value| &**value)
    }

    /// Length shared by every target's list or array value.
    pub fn common_len(&self) -> Option<usize> {
        let mut len = None;
        for value in self.values() {
            let this = match value.reflect_ref() {
                ReflectRef::List(list) => list.len(),
                ReflectRef::Array(array) => array.len(),
                _ => return None,
            };
            match len {
                None => len = Some(this),
                Some(known) if known != this => return None,
                Some(_) => {}
            }
        }
        len
    }

    /// Variant name shared by every target's enum value.
    pub fn common_variant(&self) -> Option<&str> {
        let mut variant = None;
        for value in self.values() {
            let ReflectRef::Enum(value) = value.reflect_ref() else {
                return None;
            };
            let name = value.variant_name();
            match variant {
                None => variant = Some(name),
                Some(known) if known != name => return None,
                Some(_) => {}
            }
        }
        variant
    }
}

// ---------------------------------------------------------------------------
// Path segments
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathSegment<'a> {
    Field(&'a str),
    TupleIndex(usize),
    Element(usize),
}

pub(crate) fn join_path(base: &str, segment: PathSegment<'_>) -> String {
    match (base.is_empty(), segment) {
        (true, PathSegment::Field(name)) => name.to_string(),
        (false, PathSegment::Field(name)) => format!("{base}.{name}"),
        (true, PathSegment::TupleIndex(i)) => format!(".{i}"),
        (false, PathSegment::TupleIndex(i)) => format!("{base}.{i}"),
        (true, PathSegment::Element(i)) => format!("[{i}]"),
        (false, PathSegment::Element(i)) => format!("{base}[{i}]"),
    }
}

// ---------------------------------------------------------------------------
// ValueContainer
// ---------------------------------------------------------------------------

/// Binds one logical property (component + field path) across the selection.
///
/// Nothing read from the targets is cached: each [`ValueContainer::read`]
/// queries the world again.
#[derive(Clone, Debug)]
pub struct ValueContainer {
    targets: Arc<[Entity]>,
    component_type_id: TypeId,
    field_path: String,
    type_info: Option<&'static TypeInfo>,
    attributes: Arc<FieldAttributes>,
}

impl ValueContainer {
    pub fn new(
        targets: impl Into<Arc<[Entity]>>,
        component_type_id: TypeId,
        field_path: impl Into<String>,
        type_info: Option<&'static TypeInfo>,
        attributes: FieldAttributes,
    ) -> Self {
        let targets = targets.into();
        debug_assert!(!targets.is_empty(), "a container needs at least one target");
        Self {
            targets,
            component_type_id,
            field_path: field_path.into(),
            type_info,
            attributes: Arc::new(attributes),
        }
    }

    /// Container for a nested member, bound to the same targets.
    pub fn child(
        &self,
        segment: PathSegment<'_>,
        type_info: Option<&'static TypeInfo>,
        attributes: FieldAttributes,
    ) -> Self {
        Self {
            targets: self.targets.clone(),
            component_type_id: self.component_type_id,
            field_path: join_path(&self.field_path, segment),
            type_info,
            attributes: Arc::new(attributes),
        }
    }

    pub fn targets(&self) -> &[Entity] {
        &self.targets
    }

    pub fn component_type_id(&self) -> TypeId {
        self.component_type_id
    }

    pub fn field_path(&self) -> &str {
        &self.field_path
    }

    /// Declared type of the bound property.
    pub fn type_info(&self) -> Option<&'static TypeInfo> {
        self.type_info
    }

    pub fn type_path(&self) -> &'static str {
        self.type_info.map_or("<unknown>", |info| info.type_path())
    }

    pub fn attributes(&self) -> &FieldAttributes {
        &self.attributes
    }

    pub fn property_targets(&self) -> Vec<PropertyTarget> {
        self.targets
            .iter()
            .map(|&entity| PropertyTarget::new(entity, self.component_type_id, self.field_path.clone()))
            .collect()
    }

    pub fn read(&self, world: &World) -> Result<ContainerValue, PropertyAccessError> {
        let registry = world.resource::<AppTypeRegistry>().clone();
        let registry = registry.read();
        let values = self
            .property_targets()
            .iter()
            .map(|target| read_property(world, &registry, target))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ContainerValue::from_values(values))
    }

    /// Write `value` to every target, or fail without touching any of them.
    pub fn write(
        &self,
        world: &mut World,
        value: &dyn PartialReflect,
    ) -> Result<(), PropertyAccessError> {
        let registry = world.resource::<AppTypeRegistry>().clone();
        let registry = registry.read();
        write_all(world, &registry, &self.property_targets(), value)
    }
}
