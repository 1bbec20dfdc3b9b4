use bevy::{
    ecs::reflect::AppTypeRegistry,
    prelude::*,
    reflect::{
        DynamicEnum, DynamicStruct, DynamicTuple, DynamicVariant, EnumInfo, ReflectRef, TypeInfo,
        TypeRegistry, VariantInfo, std_traits::ReflectDefault,
    },
};

use crate::{
    container::ContainerValue,
    error::EditorFault,
    node::{BuildContext, EditAction, EventContext, PropertyEditor, Refresh, RefreshContext},
    widget::{WidgetDisplay, WidgetEvent, WidgetEventKind, WidgetId, WidgetKind, WidgetValue},
};

use super::mismatch;

/// Variant picker. Fields of the current variant are child nodes, so a
/// variant change on a data-carrying enum rebuilds the node.
#[derive(Debug)]
pub struct EnumEditor {
    type_info: &'static TypeInfo,
    info: &'static EnumInfo,
    variants: Vec<String>,
    combo: Option<WidgetId>,
    /// Variant shown by the last refresh; `Some(None)` when targets disagreed.
    seen: Option<Option<String>>,
}

impl EnumEditor {
    pub fn new(type_info: &'static TypeInfo) -> Option<Self> {
        let TypeInfo::Enum(info) = type_info else {
            return None;
        };
        Some(Self {
            type_info,
            info,
            variants: info.variant_names().iter().map(|name| name.to_string()).collect(),
            combo: None,
            seen: None,
        })
    }

    fn carries_data(&self) -> bool {
        self.info
            .iter()
            .any(|variant| !matches!(variant, VariantInfo::Unit(_)))
    }
}

impl PropertyEditor for EnumEditor {
    fn build(&mut self, cx: &mut BuildContext) {
        self.combo = Some(cx.widget(WidgetKind::ComboBox {
            options: self.variants.clone(),
        }));
    }

    fn refresh(
        &mut self,
        cx: &mut RefreshContext,
        value: &ContainerValue,
    ) -> Result<Refresh, EditorFault> {
        for item in value.values() {
            if !matches!(item.reflect_ref(), ReflectRef::Enum(_)) {
                return Err(mismatch("enum", item));
            }
        }

        let current = value.common_variant().map(str::to_string);
        let display = current
            .as_deref()
            .and_then(|name| self.info.index_of(name))
            .map_or(WidgetDisplay::Mixed, WidgetDisplay::Selected);
        if let Some(combo) = self.combo {
            cx.show(combo, display);
        }

        let previous = self.seen.replace(current.clone());
        let reshaped = previous.is_some_and(|previous| previous != current);
        Ok(if reshaped && self.carries_data() {
            Refresh::Rebuild
        } else {
            Refresh::Unchanged
        })
    }

    fn on_event(&mut self, event: &WidgetEvent, cx: &EventContext) -> Option<EditAction> {
        let WidgetEventKind::Changed(WidgetValue::Index(index)) = event.kind else {
            return None;
        };
        let name = self.variants.get(index)?;
        if self.seen.as_ref().and_then(Option::as_deref) == Some(name.as_str()) {
            return None;
        }

        let registry = cx.world.resource::<AppTypeRegistry>().read();
        let Some(variant) = build_dynamic_variant(self.info, name, &registry) else {
            warn!(
                "Cannot switch '{}' to `{name}`: a field has no default value",
                self.type_info.type_path()
            );
            return Some(EditAction::Revert);
        };
        let mut value = DynamicEnum::new(name.as_str(), variant);
        value.set_represented_type(Some(self.type_info));
        Some(EditAction::Submit(Box::new(value)))
    }

    fn has_children(&self) -> bool {
        self.carries_data()
    }
}

/// Build the [`DynamicVariant`] for `variant_name` with every field at its
/// default. Returns `None` if a field's default cannot be constructed.
pub fn build_dynamic_variant(
    info: &EnumInfo,
    variant_name: &str,
    registry: &TypeRegistry,
) -> Option<DynamicVariant> {
    let default_of = |type_id| {
        registry
            .get(type_id)
            .and_then(|registration| registration.data::<ReflectDefault>())
            .map(|default| default.default().into_partial_reflect())
    };

    match info.variant(variant_name)? {
        VariantInfo::Unit(_) => Some(DynamicVariant::Unit),
        VariantInfo::Tuple(tuple_info) => {
            let mut tuple = DynamicTuple::default();
            for field in tuple_info.iter() {
                tuple.insert_boxed(default_of(field.type_id())?);
            }
            Some(DynamicVariant::Tuple(tuple))
        }
        VariantInfo::Struct(struct_info) => {
            let mut fields = DynamicStruct::default();
            for field in struct_info.iter() {
                fields.insert_boxed(field.name(), default_of(field.type_id())?);
            }
            Some(DynamicVariant::Struct(fields))
        }
    }
}

#[cfg(test)]
mod tests {
    use bevy::reflect::Typed;

    use super::*;

    #[derive(Reflect, Default, Debug, PartialEq)]
    enum Falloff {
        #[default]
        None,
        Linear(f32),
        Curve {
            power: f32,
            inverted: bool,
        },
    }

    #[derive(Reflect, Debug)]
    struct Opaque;

    #[derive(Reflect, Debug)]
    enum NeedsDefault {
        Empty,
        Holding(Opaque),
    }

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::default();
        registry.register::<f32>();
        registry.register::<bool>();
        registry
    }

    fn info<T: Typed>() -> &'static EnumInfo {
        let TypeInfo::Enum(info) = T::type_info() else {
            panic!("expected an enum");
        };
        info
    }

    #[test]
    fn builds_variants_from_defaults() {
        let registry = registry();
        let variant = build_dynamic_variant(info::<Falloff>(), "Curve", &registry).unwrap();
        let mut value = DynamicEnum::new("Curve", variant);
        value.set_represented_type(Some(Falloff::type_info()));
        assert_eq!(
            Falloff::from_reflect(&value),
            Some(Falloff::Curve {
                power: 0.0,
                inverted: false
            })
        );

        let variant = build_dynamic_variant(info::<Falloff>(), "Linear", &registry).unwrap();
        assert!(matches!(variant, DynamicVariant::Tuple(_)));
        assert!(build_dynamic_variant(info::<Falloff>(), "Missing", &registry).is_none());
    }

    #[test]
    fn missing_field_default_fails() {
        let registry = registry();
        assert!(build_dynamic_variant(info::<NeedsDefault>(), "Holding", &registry).is_none());
        assert!(build_dynamic_variant(info::<NeedsDefault>(), "Empty", &registry).is_some());
    }

    #[test]
    fn only_data_carrying_enums_have_children() {
        #[derive(Reflect)]
        enum Mode {
            A,
            B,
        }
        assert!(!EnumEditor::new(Mode::type_info()).unwrap().has_children());
        assert!(EnumEditor::new(Falloff::type_info()).unwrap().has_children());
        assert!(EnumEditor::new(f32::type_info()).is_none());
    }
}
