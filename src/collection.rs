//! Editor for sequence-typed properties (`Vec<T>`, `[T; N]`).

use std::any::TypeId;

use bevy::{
    prelude::*,
    reflect::{
        DynamicEnum, DynamicList, DynamicVariant, ReflectRef, TypeInfo, TypeRegistry,
        std_traits::ReflectDefault,
    },
};
use jackdaw_commands::snapshot_value;
use jackdaw_widgets::NumericInput;

use crate::{
    attributes::FieldAttributes,
    container::ContainerValue,
    error::{CollectionError, EditorFault},
    node::{BuildContext, EditAction, EventContext, PropertyEditor, Refresh, RefreshContext},
    widget::{WidgetDisplay, WidgetEvent, WidgetEventKind, WidgetId, WidgetKind, WidgetValue},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollectionState {
    Uninitialized,
    Bound { len: usize },
    /// Targets hold lists of different lengths.
    Divergent,
    /// A resize is being applied.
    Resizing { from: usize, to: usize },
}

/// How new elements are filled when a list grows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementSemantics {
    /// Plain data; new slots copy the last element.
    Value,
    /// Nullable handles (`Option`, asset handles); new slots start empty.
    Reference,
}

impl ElementSemantics {
    pub fn of(type_path: &str) -> Self {
        const REFERENCE_PREFIXES: [&str; 2] =
            ["core::option::Option<", "bevy_asset::handle::Handle<"];
        if REFERENCE_PREFIXES
            .iter()
            .any(|prefix| type_path.starts_with(prefix))
        {
            ElementSemantics::Reference
        } else {
            ElementSemantics::Value
        }
    }
}

/// What a resize request turns into.
#[derive(Debug)]
pub enum ResizePlan {
    Unchanged { len: usize },
    /// Write `list` to every target, taking the length from `from` to `to`.
    Write {
        from: usize,
        to: usize,
        list: DynamicList,
    },
}

#[derive(Debug)]
pub struct CollectionEditor {
    list_info: Option<&'static TypeInfo>,
    item_type_id: TypeId,
    item_type_path: &'static str,
    item_info: Option<&'static TypeInfo>,
    fixed_len: bool,
    semantics: ElementSemantics,
    no_null_items: bool,
    state: CollectionState,
    size_widget: Option<WidgetId>,
}

impl CollectionEditor {
    /// Editor for a list or array type. Returns `None` for any other kind.
    pub fn for_type(type_info: &'static TypeInfo, attributes: &FieldAttributes) -> Option<Self> {
        let (item_type_id, item_type_path, item_info, fixed_len) = match type_info {
            TypeInfo::List(info) => (
                info.item_ty().id(),
                info.item_ty().path(),
                info.item_info(),
                false,
            ),
            TypeInfo::Array(info) => (
                info.item_ty().id(),
                info.item_ty().path(),
                info.item_info(),
                true,
            ),
            _ => return None,
        };
        Some(Self {
            list_info: Some(type_info),
            item_type_id,
            item_type_path,
            item_info,
            fixed_len,
            semantics: ElementSemantics::of(item_type_path),
            no_null_items: attributes.no_null_items,
            state: CollectionState::Uninitialized,
            size_widget: None,
        })
    }

    pub fn state(&self) -> CollectionState {
        self.state
    }

    pub fn semantics(&self) -> ElementSemantics {
        self.semantics
    }

    pub fn item_type_path(&self) -> &'static str {
        self.item_type_path
    }

    pub fn is_fixed_len(&self) -> bool {
        self.fixed_len
    }

    /// Whether growing clones the last element rather than filling defaults.
    fn fills_by_clone(&self) -> bool {
        self.semantics == ElementSemantics::Value || self.no_null_items
    }

    /// The empty value of one element.
    pub fn element_default(
        &self,
        registry: &TypeRegistry,
    ) -> Result<Box<dyn PartialReflect>, CollectionError> {
        if let Some(default) = registry
            .get(self.item_type_id)
            .and_then(|registration| registration.data::<ReflectDefault>())
        {
            return Ok(default.default().into_partial_reflect());
        }

        // Enums without a `Default` registration fall back to their `None` variant.
        if let Some(TypeInfo::Enum(info)) = self.item_info
            && info.contains_variant("None")
        {
            let mut none = DynamicEnum::new("None", DynamicVariant::Unit);
            none.set_represented_type(self.item_info);
            return Ok(Box::new(none));
        }
        Err(CollectionError::MissingDefault(self.item_type_path))
    }

    fn new_list(&self) -> DynamicList {
        let mut list = DynamicList::default();
        if let Some(info @ TypeInfo::List(_)) = self.list_info {
            list.set_represented_type(Some(info));
        }
        list
    }

    /// A fresh list of `size` element defaults.
    pub fn allocate(
        &self,
        registry: &TypeRegistry,
        size: usize,
    ) -> Result<DynamicList, CollectionError> {
        let mut list = self.new_list();
        for _ in 0..size {
            list.push_box(self.element_default(registry)?);
        }
        Ok(list)
    }

    /// Work out the list that takes `value` to `new_size` elements.
    ///
    /// On a `Write` plan the editor enters `Resizing` until
    /// [`finish_resize`](Self::finish_resize) or
    /// [`abort_resize`](Self::abort_resize).
    pub fn prepare_resize(
        &mut self,
        registry: &TypeRegistry,
        value: &ContainerValue,
        new_size: i64,
    ) -> Result<ResizePlan, CollectionError> {
        if matches!(self.state, CollectionState::Resizing { .. }) {
            return Err(CollectionError::Busy);
        }
        let to = usize::try_from(new_size).map_err(|_| CollectionError::NegativeSize(new_size))?;
        if self.fixed_len {
            let type_path = self.list_info.map_or(self.item_type_path, |info| info.type_path());
            return Err(CollectionError::FixedLength(type_path));
        }
        let Some(current) = value.uniform() else {
            return Err(CollectionError::DivergentSelection);
        };
        let ReflectRef::List(current) = current.reflect_ref() else {
            return Err(CollectionError::NotAList(format!("{current:?}")));
        };

        let from = current.len();
        if to == from {
            return Ok(ResizePlan::Unchanged { len: from });
        }

        let mut list = self.new_list();
        for element in current.iter().take(to) {
            list.push_box(snapshot_value(element));
        }
        let last = from.checked_sub(1).and_then(|i| current.get(i));
        for _ in from..to {
            let element = match last {
                Some(last) if self.fills_by_clone() => snapshot_value(last),
                _ => self.element_default(registry)?,
            };
            list.push_box(element);
        }

        self.state = CollectionState::Resizing { from, to };
        Ok(ResizePlan::Write { from, to, list })
    }

    pub fn finish_resize(&mut self) {
        if let CollectionState::Resizing { to, .. } = self.state {
            self.state = CollectionState::Bound { len: to };
        }
    }

    pub fn abort_resize(&mut self) {
        if let CollectionState::Resizing { from, .. } = self.state {
            self.state = CollectionState::Bound { len: from };
        }
    }

    /// Independent deep copies of the shared elements.
    pub fn clone_values(
        &self,
        value: &ContainerValue,
    ) -> Result<Vec<Box<dyn PartialReflect>>, CollectionError> {
        let Some(current) = value.uniform() else {
            return Err(CollectionError::DivergentSelection);
        };
        match current.reflect_ref() {
            ReflectRef::List(list) => Ok(list.iter().map(snapshot_value).collect()),
            ReflectRef::Array(array) => Ok(array.iter().map(snapshot_value).collect()),
            _ => Err(CollectionError::NotAList(format!("{current:?}"))),
        }
    }
}

impl PropertyEditor for CollectionEditor {
    fn build(&mut self, cx: &mut BuildContext) {
        let kind = if self.fixed_len {
            WidgetKind::Header
        } else {
            WidgetKind::Numeric(NumericInput::integer(0.0).with_range(0.0..=f64::from(u32::MAX)))
        };
        self.size_widget = Some(cx.widget(kind));
    }

    fn refresh(
        &mut self,
        cx: &mut RefreshContext,
        value: &ContainerValue,
    ) -> Result<Refresh, EditorFault> {
        for item in value.values() {
            if !matches!(item.reflect_ref(), ReflectRef::List(_) | ReflectRef::Array(_)) {
                return Err(EditorFault::TypeMismatch {
                    expected: "list",
                    found: item
                        .get_represented_type_info()
                        .map_or_else(|| format!("{item:?}"), |info| info.type_path().to_string()),
                });
            }
        }

        let next = match value.common_len() {
            Some(len) => CollectionState::Bound { len },
            None => CollectionState::Divergent,
        };
        let previous = std::mem::replace(&mut self.state, next);

        if let Some(widget) = self.size_widget {
            let display = match next {
                CollectionState::Bound { len } => WidgetDisplay::Length(len),
                _ => WidgetDisplay::Mixed,
            };
            cx.show(widget, display);
        }

        let reshaped = previous != CollectionState::Uninitialized && previous != next;
        Ok(if reshaped {
            Refresh::Rebuild
        } else {
            Refresh::Unchanged
        })
    }

    fn on_event(&mut self, event: &WidgetEvent, _cx: &EventContext) -> Option<EditAction> {
        if Some(event.widget) != self.size_widget {
            return None;
        }
        match &event.kind {
            WidgetEventKind::Changed(WidgetValue::Number(size)) if !size.is_finite() => {
                debug!("Ignoring list size {size}");
                Some(EditAction::Revert)
            }
            WidgetEventKind::Changed(WidgetValue::Number(size)) => {
                Some(EditAction::Resize(size.round() as i64))
            }
            WidgetEventKind::Submitted(text) => match text.trim().parse::<i64>() {
                Ok(size) => Some(EditAction::Resize(size)),
                Err(_) => {
                    debug!("Ignoring list size '{text}'");
                    Some(EditAction::Revert)
                }
            },
            _ => None,
        }
    }

    fn has_children(&self) -> bool {
        true
    }

    fn as_collection(&self) -> Option<&CollectionEditor> {
        Some(self)
    }

    fn as_collection_mut(&mut self) -> Option<&mut CollectionEditor> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use bevy::reflect::{List, Typed};

    use super::*;

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::default();
        registry.register::<Vec<f32>>();
        registry.register::<Vec<Option<u8>>>();
        registry.register::<f32>();
        registry
    }

    fn editor<T: Typed>(attributes: FieldAttributes) -> CollectionEditor {
        CollectionEditor::for_type(T::type_info(), &attributes).unwrap()
    }

    fn uniform<T: Reflect>(value: T) -> ContainerValue {
        ContainerValue::Uniform(Box::new(value))
    }

    fn written<T: FromReflect>(plan: ResizePlan) -> T {
        let ResizePlan::Write { list, .. } = plan else {
            panic!("expected a write plan");
        };
        T::from_reflect(&list).unwrap()
    }

    #[test]
    fn semantics_follow_element_type() {
        assert_eq!(ElementSemantics::of("f32"), ElementSemantics::Value);
        assert_eq!(
            ElementSemantics::of("core::option::Option<u8>"),
            ElementSemantics::Reference
        );
        assert_eq!(
            ElementSemantics::of("bevy_asset::handle::Handle<bevy_image::image::Image>"),
            ElementSemantics::Reference
        );
    }

    #[test]
    fn growing_value_list_clones_last_element() {
        let registry = registry();
        let mut editor = editor::<Vec<f32>>(FieldAttributes::default());
        let plan = editor
            .prepare_resize(&registry, &uniform(vec![1.0_f32, 2.0]), 5)
            .unwrap();
        assert_eq!(written::<Vec<f32>>(plan), vec![1.0, 2.0, 2.0, 2.0, 2.0]);
        assert_eq!(editor.state(), CollectionState::Resizing { from: 2, to: 5 });
        editor.finish_resize();
        assert_eq!(editor.state(), CollectionState::Bound { len: 5 });
    }

    #[test]
    fn growing_nullable_list_fills_none() {
        let registry = registry();
        let mut editor = editor::<Vec<Option<u8>>>(FieldAttributes::default());
        let plan = editor
            .prepare_resize(&registry, &uniform(vec![Some(3_u8)]), 3)
            .unwrap();
        assert_eq!(written::<Vec<Option<u8>>>(plan), vec![Some(3), None, None]);
    }

    #[test]
    fn no_null_items_clones_references() {
        let registry = registry();
        let attributes = FieldAttributes {
            no_null_items: true,
            ..default()
        };
        let mut editor = editor::<Vec<Option<u8>>>(attributes);
        let plan = editor
            .prepare_resize(&registry, &uniform(vec![Some(3_u8)]), 3)
            .unwrap();
        assert_eq!(written::<Vec<Option<u8>>>(plan), vec![Some(3); 3]);
    }

    #[test]
    fn growing_from_empty_fills_defaults() {
        let registry = registry();
        let mut editor = editor::<Vec<f32>>(FieldAttributes::default());
        let plan = editor
            .prepare_resize(&registry, &uniform(Vec::<f32>::new()), 2)
            .unwrap();
        assert_eq!(written::<Vec<f32>>(plan), vec![0.0, 0.0]);
    }

    #[test]
    fn shrinking_truncates() {
        let registry = registry();
        let mut editor = editor::<Vec<f32>>(FieldAttributes::default());
        let plan = editor
            .prepare_resize(&registry, &uniform(vec![1.0_f32, 2.0, 3.0]), 1)
            .unwrap();
        assert_eq!(written::<Vec<f32>>(plan), vec![1.0]);
    }

    #[test]
    fn rejected_resizes() {
        let registry = registry();
        let mut editor = editor::<Vec<f32>>(FieldAttributes::default());

        assert!(matches!(
            editor.prepare_resize(&registry, &uniform(vec![1.0_f32]), -1),
            Err(CollectionError::NegativeSize(-1))
        ));
        assert_eq!(editor.state(), CollectionState::Uninitialized);

        let mixed = ContainerValue::Mixed(vec![Box::new(vec![1.0_f32]), Box::new(vec![2.0_f32])]);
        assert!(matches!(
            editor.prepare_resize(&registry, &mixed, 3),
            Err(CollectionError::DivergentSelection)
        ));

        assert!(matches!(
            editor.prepare_resize(&registry, &uniform(vec![1.0_f32]), 1),
            Ok(ResizePlan::Unchanged { len: 1 })
        ));

        let mut array = self::editor::<[f32; 3]>(FieldAttributes::default());
        assert!(matches!(
            array.prepare_resize(&registry, &uniform([0.0_f32; 3]), 4),
            Err(CollectionError::FixedLength(_))
        ));
    }

    #[test]
    fn second_resize_waits_for_the_first() {
        let registry = registry();
        let mut editor = editor::<Vec<f32>>(FieldAttributes::default());
        editor
            .prepare_resize(&registry, &uniform(vec![1.0_f32]), 2)
            .unwrap();
        assert!(matches!(
            editor.prepare_resize(&registry, &uniform(vec![1.0_f32]), 3),
            Err(CollectionError::Busy)
        ));
        editor.abort_resize();
        assert_eq!(editor.state(), CollectionState::Bound { len: 1 });
    }

    #[test]
    fn allocate_builds_defaults() {
        let registry = registry();
        let editor = editor::<Vec<Option<u8>>>(FieldAttributes::default());
        let list = editor.allocate(&registry, 2).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(
            Vec::<Option<u8>>::from_reflect(&list).unwrap(),
            vec![None, None]
        );
    }

    #[test]
    fn missing_default_is_reported() {
        #[derive(Reflect, Clone, Debug)]
        struct NoDefault(u8);

        let editor = editor::<Vec<NoDefault>>(FieldAttributes::default());
        assert!(matches!(
            editor.allocate(&TypeRegistry::default(), 1),
            Err(CollectionError::MissingDefault(_))
        ));
    }

    #[test]
    fn cloned_values_are_detached() {
        let editor = editor::<Vec<f32>>(FieldAttributes::default());
        let value = uniform(vec![1.0_f32, 2.0]);
        let mut copies = editor.clone_values(&value).unwrap();
        copies[0].apply(&9.0_f32);

        let live = value.uniform().unwrap().try_downcast_ref::<Vec<f32>>().unwrap();
        assert_eq!(live, &vec![1.0, 2.0]);
        assert_eq!(copies[0].try_downcast_ref::<f32>(), Some(&9.0));
    }
}
