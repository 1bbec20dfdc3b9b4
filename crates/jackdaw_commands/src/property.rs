use std::any::TypeId;

use bevy::{
    ecs::reflect::ReflectComponent,
    prelude::*,
    reflect::{ApplyError, ReflectMut, ReflectRef, TypeRegistry},
};

// ---------------------------------------------------------------------------
// PropertyTarget: one (entity, component, field path) triple
// ---------------------------------------------------------------------------

/// Addresses a single reflected property on a single entity.
///
/// An empty `field_path` addresses the whole component.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PropertyTarget {
    pub entity: Entity,
    pub component_type_id: TypeId,
    pub field_path: String,
}

impl PropertyTarget {
    pub fn new(entity: Entity, component_type_id: TypeId, field_path: impl Into<String>) -> Self {
        Self {
            entity,
            component_type_id,
            field_path: field_path.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PropertyAccessError {
    #[error("entity {0} does not exist")]
    MissingEntity(Entity),
    #[error("component {0:?} is not registered with ReflectComponent")]
    UnregisteredComponent(TypeId),
    #[error("entity {entity} has no `{component}` component")]
    MissingComponent {
        entity: Entity,
        component: &'static str,
    },
    #[error("invalid field path '{path}' on entity {entity}: {message}")]
    InvalidPath {
        entity: Entity,
        path: String,
        message: String,
    },
    #[error("entity {entity} rejected the value at '{path}': {source}")]
    Rejected {
        entity: Entity,
        path: String,
        #[source]
        source: ApplyError,
    },
}

fn reflect_component(
    registry: &TypeRegistry,
    component_type_id: TypeId,
) -> Result<&ReflectComponent, PropertyAccessError> {
    registry
        .get(component_type_id)
        .and_then(|registration| registration.data::<ReflectComponent>())
        .ok_or(PropertyAccessError::UnregisteredComponent(component_type_id))
}

fn component_name(registry: &TypeRegistry, component_type_id: TypeId) -> &'static str {
    registry
        .get(component_type_id)
        .map(|registration| registration.type_info().type_path_table().short_path())
        .unwrap_or("<unregistered>")
}

// ---------------------------------------------------------------------------
// Value helpers
// ---------------------------------------------------------------------------

/// Detached copy of a reflected value.
///
/// Prefers a concrete clone so downcasts keep working on the copy; falls back
/// to a dynamic representation for types that cannot be cloned through
/// reflection.
pub fn snapshot_value(value: &dyn PartialReflect) -> Box<dyn PartialReflect> {
    match value.reflect_clone() {
        Ok(cloned) => cloned.into_partial_reflect(),
        Err(_) => value.to_dynamic(),
    }
}

/// Type-appropriate equality between two reflected values.
///
/// Types without a reflected `PartialEq` are compared by their debug
/// representation.
pub fn values_equal(a: &dyn PartialReflect, b: &dyn PartialReflect) -> bool {
    match a.reflect_partial_eq(b) {
        Some(equal) => equal,
        None => format!("{a:?}") == format!("{b:?}"),
    }
}

/// Assign `value` onto `target`, replacing collection contents wholesale.
///
/// A concrete `value` of the same type replaces `target` outright. Otherwise
/// lists and maps anywhere inside `target` are cut down to the shape of
/// `value` before applying, since plain `apply` only ever grows them.
pub fn assign_value(
    target: &mut dyn PartialReflect,
    value: &dyn PartialReflect,
) -> Result<(), ApplyError> {
    if let Some(source) = value.try_as_reflect()
        && let Ok(replacement) = source.reflect_clone()
        && let Some(live) = target.try_as_reflect_mut()
        && live.as_any().type_id() == source.as_any().type_id()
    {
        return live
            .set(replacement)
            .map_err(|rejected| ApplyError::MismatchedTypes {
                from_type: rejected.reflect_type_path().into(),
                to_type: source.reflect_type_path().into(),
            });
    }
    trim_to_shape(target, value);
    target.try_apply(value)
}

/// Drop list elements and map entries of `target` that `source` lacks.
fn trim_to_shape(target: &mut dyn PartialReflect, source: &dyn PartialReflect) {
    match (target.reflect_mut(), source.reflect_ref()) {
        (ReflectMut::List(list), ReflectRef::List(source)) => {
            while list.len() > source.len() {
                list.pop();
            }
            for (index, item) in source.iter().enumerate() {
                if let Some(live) = list.get_mut(index) {
                    trim_to_shape(live, item);
                }
            }
        }
        (ReflectMut::Array(array), ReflectRef::Array(source)) => {
            for (index, item) in source.iter().enumerate() {
                if let Some(live) = array.get_mut(index) {
                    trim_to_shape(live, item);
                }
            }
        }
        (ReflectMut::Map(map), ReflectRef::Map(source)) => {
            let stale: Vec<Box<dyn PartialReflect>> = map
                .iter()
                .filter(|(key, _)| source.get(*key).is_none())
                .map(|(key, _)| key.to_dynamic())
                .collect();
            for key in stale {
                map.remove(&*key);
            }
        }
        (ReflectMut::Struct(fields), ReflectRef::Struct(source)) => {
            for index in 0..source.field_len() {
                if let (Some(name), Some(item)) = (source.name_at(index), source.field_at(index))
                    && let Some(live) = fields.field_mut(name)
                {
                    trim_to_shape(live, item);
                }
            }
        }
        (ReflectMut::TupleStruct(fields), ReflectRef::TupleStruct(source)) => {
            for (index, item) in source.iter_fields().enumerate() {
                if let Some(live) = fields.field_mut(index) {
                    trim_to_shape(live, item);
                }
            }
        }
        (ReflectMut::Tuple(fields), ReflectRef::Tuple(source)) => {
            for (index, item) in source.iter_fields().enumerate() {
                if let Some(live) = fields.field_mut(index) {
                    trim_to_shape(live, item);
                }
            }
        }
        (ReflectMut::Enum(live), ReflectRef::Enum(source))
            if live.variant_name() == source.variant_name() =>
        {
            for index in 0..source.field_len() {
                if let (Some(item), Some(field)) = (source.field_at(index), live.field_at_mut(index))
                {
                    trim_to_shape(field, item);
                }
            }
        }
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// World access
// ---------------------------------------------------------------------------

/// Run `f` against the live value of `target`.
pub fn with_property<R>(
    world: &World,
    registry: &TypeRegistry,
    target: &PropertyTarget,
    f: impl FnOnce(&dyn PartialReflect) -> R,
) -> Result<R, PropertyAccessError> {
    let reflect_component = reflect_component(registry, target.component_type_id)?;
    let Ok(entity_ref) = world.get_entity(target.entity) else {
        return Err(PropertyAccessError::MissingEntity(target.entity));
    };
    let Some(reflected) = reflect_component.reflect(entity_ref) else {
        return Err(PropertyAccessError::MissingComponent {
            entity: target.entity,
            component: component_name(registry, target.component_type_id),
        });
    };

    if target.field_path.is_empty() {
        return Ok(f(reflected.as_partial_reflect()));
    }
    let field = reflected
        .reflect_path(target.field_path.as_str())
        .map_err(|err| PropertyAccessError::InvalidPath {
            entity: target.entity,
            path: target.field_path.clone(),
            message: err.to_string(),
        })?;
    Ok(f(field))
}

/// Snapshot the live value of `target`.
pub fn read_property(
    world: &World,
    registry: &TypeRegistry,
    target: &PropertyTarget,
) -> Result<Box<dyn PartialReflect>, PropertyAccessError> {
    with_property(world, registry, target, snapshot_value)
}

/// Run `f` against the live, mutable value of `target`.
pub fn modify_property<R>(
    world: &mut World,
    registry: &TypeRegistry,
    target: &PropertyTarget,
    f: impl FnOnce(&mut dyn PartialReflect) -> R,
) -> Result<R, PropertyAccessError> {
    let reflect_component = reflect_component(registry, target.component_type_id)?;
    let component = component_name(registry, target.component_type_id);
    let Ok(entity_mut) = world.get_entity_mut(target.entity) else {
        return Err(PropertyAccessError::MissingEntity(target.entity));
    };
    let Some(reflected) = reflect_component.reflect_mut(entity_mut) else {
        return Err(PropertyAccessError::MissingComponent {
            entity: target.entity,
            component,
        });
    };
    let reflected = reflected.into_inner();

    if target.field_path.is_empty() {
        return Ok(f(reflected.as_partial_reflect_mut()));
    }
    let field = reflected
        .reflect_path_mut(target.field_path.as_str())
        .map_err(|err| PropertyAccessError::InvalidPath {
            entity: target.entity,
            path: target.field_path.clone(),
            message: err.to_string(),
        })?;
    Ok(f(field))
}

/// Write `value` to a single property.
pub fn write_property(
    world: &mut World,
    registry: &TypeRegistry,
    target: &PropertyTarget,
    value: &dyn PartialReflect,
) -> Result<(), PropertyAccessError> {
    modify_property(world, registry, target, |field| assign_value(field, value))?.map_err(
        |source| PropertyAccessError::Rejected {
            entity: target.entity,
            path: target.field_path.clone(),
            source,
        },
    )
}

/// Write `value` to every target, or to none of them.
///
/// Each target is first checked by assigning onto a detached copy of its
/// current value; the live writes only start once every check has passed.
pub fn write_all(
    world: &mut World,
    registry: &TypeRegistry,
    targets: &[PropertyTarget],
    value: &dyn PartialReflect,
) -> Result<(), PropertyAccessError> {
    for target in targets {
        let mut probe = read_property(world, registry, target)?;
        assign_value(probe.as_mut(), value).map_err(|source| PropertyAccessError::Rejected {
            entity: target.entity,
            path: target.field_path.clone(),
            source,
        })?;
    }
    for target in targets {
        write_property(world, registry, target, value)?;
    }
    Ok(())
}

/// All descendants of `root` in hierarchy order, excluding `root` itself.
pub fn descendants(world: &World, root: Entity) -> Vec<Entity> {
    let mut found = Vec::new();
    let mut stack = vec![root];
    while let Some(entity) = stack.pop() {
        if entity != root {
            found.push(entity);
        }
        let Some(children) = world.get::<Children>(entity) else {
            continue;
        };
        let children: &[Entity] = children;
        stack.extend(children.iter().rev().copied());
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::{ecs::reflect::AppTypeRegistry, platform::collections::HashMap};

    #[derive(Component, Reflect, Default, Clone, Debug, PartialEq)]
    #[reflect(Component, Default)]
    struct Gauge {
        level: f32,
        marks: Vec<u32>,
    }

    fn setup() -> World {
        let mut world = World::new();
        world.init_resource::<AppTypeRegistry>();
        world.resource::<AppTypeRegistry>().write().register::<Gauge>();
        world
    }

    #[test]
    fn assign_truncates_longer_lists() {
        let mut target: Vec<u32> = vec![1, 2, 3, 4];
        let source: Vec<u32> = vec![9, 8];
        assign_value(&mut target, &source).unwrap();
        assert_eq!(target, vec![9, 8]);
    }

    #[test]
    fn assign_shrinks_nested_lists() {
        let before = Gauge {
            level: 0.5,
            marks: vec![1],
        };
        let grown = || Gauge {
            level: 2.0,
            marks: vec![1, 2, 3],
        };

        let mut live = grown();
        assign_value(&mut live, &before).unwrap();
        assert_eq!(live, before);

        let mut live = grown();
        assign_value(&mut live, &*before.to_dynamic()).unwrap();
        assert_eq!(live, before);
    }

    #[test]
    fn assign_drops_stale_map_entries() {
        let mut live = HashMap::<u32, f32>::default();
        live.insert(1, 1.0);
        live.insert(2, 2.0);
        let mut source = HashMap::<u32, f32>::default();
        source.insert(1, 5.0);
        assign_value(&mut live, &*source.to_dynamic()).unwrap();
        assert_eq!(live.len(), 1);
        assert_eq!(live.get(&1), Some(&5.0));
    }

    #[test]
    fn read_and_write_field_path() {
        let mut world = setup();
        let entity = world.spawn(Gauge { level: 0.5, marks: vec![1] }).id();
        let registry = world.resource::<AppTypeRegistry>().clone();
        let registry = registry.read();
        let target = PropertyTarget::new(entity, TypeId::of::<Gauge>(), "level");

        let value = read_property(&world, &registry, &target).unwrap();
        assert_eq!(value.try_downcast_ref::<f32>(), Some(&0.5));

        write_property(&mut world, &registry, &target, &2.0_f32).unwrap();
        assert_eq!(world.get::<Gauge>(entity).unwrap().level, 2.0);
    }

    #[test]
    fn write_all_leaves_targets_untouched_when_one_is_missing() {
        let mut world = setup();
        let a = world.spawn(Gauge::default()).id();
        let b = world.spawn_empty().id();
        let registry = world.resource::<AppTypeRegistry>().clone();
        let registry = registry.read();
        let targets = [
            PropertyTarget::new(a, TypeId::of::<Gauge>(), "level"),
            PropertyTarget::new(b, TypeId::of::<Gauge>(), "level"),
        ];

        let result = write_all(&mut world, &registry, &targets, &3.0_f32);
        assert!(matches!(
            result,
            Err(PropertyAccessError::MissingComponent { .. })
        ));
        assert_eq!(world.get::<Gauge>(a).unwrap().level, 0.0);
    }

    #[test]
    fn mismatched_value_is_rejected_before_any_write() {
        let mut world = setup();
        let a = world.spawn(Gauge::default()).id();
        let registry = world.resource::<AppTypeRegistry>().clone();
        let registry = registry.read();
        let targets = [PropertyTarget::new(a, TypeId::of::<Gauge>(), "level")];

        let result = write_all(&mut world, &registry, &targets, &String::from("x"));
        assert!(matches!(result, Err(PropertyAccessError::Rejected { .. })));
    }

    #[test]
    fn descendants_walks_the_hierarchy() {
        let mut world = setup();
        let root = world.spawn_empty().id();
        let child = world.spawn(ChildOf(root)).id();
        let grandchild = world.spawn(ChildOf(child)).id();
        assert_eq!(descendants(&world, root), vec![child, grandchild]);
    }
}
