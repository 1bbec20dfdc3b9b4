use std::{any::TypeId, collections::HashMap, sync::Arc};

use bevy::{
    prelude::*,
    reflect::{TypeInfo, Typed},
};

use crate::{
    attributes::FieldAttributes,
    collection::CollectionEditor,
    editors::{
        BoolEditor, CompositeEditor, EnumEditor, NumberEditor, NumberKind, ReadOnlyEditor,
        TextEditor,
    },
    node::PropertyEditor,
    settings::InspectorSettings,
};

/// Everything a factory may look at when choosing how to present a value.
pub struct EditorRequest<'a> {
    pub type_info: Option<&'static TypeInfo>,
    pub attributes: &'a FieldAttributes,
    pub settings: &'a InspectorSettings,
    pub depth: usize,
}

pub type EditorFactory =
    Arc<dyn Fn(&EditorRequest) -> Box<dyn PropertyEditor> + Send + Sync + 'static>;

/// Maps value types to editor factories.
///
/// Lookup is by exact `TypeId` first, then by reflection kind.
#[derive(Resource, Clone)]
pub struct EditorRegistry {
    factories: HashMap<TypeId, EditorFactory>,
}

impl Default for EditorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl EditorRegistry {
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with editors for `bool`, `String` and every primitive number.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register::<bool>(|_| Box::new(BoolEditor::default()));
        registry.register::<String>(|_| Box::new(TextEditor::default()));
        for kind in NumberKind::ALL {
            registry.register_type_id(kind.type_id(), move |request| {
                Box::new(NumberEditor::new(kind, request.attributes, request.settings))
            });
        }
        registry
    }

    pub fn register<T: Typed>(
        &mut self,
        factory: impl Fn(&EditorRequest) -> Box<dyn PropertyEditor> + Send + Sync + 'static,
    ) -> &mut Self {
        self.register_type_id(TypeId::of::<T>(), factory)
    }

    pub fn register_type_id(
        &mut self,
        type_id: TypeId,
        factory: impl Fn(&EditorRequest) -> Box<dyn PropertyEditor> + Send + Sync + 'static,
    ) -> &mut Self {
        self.factories.insert(type_id, Arc::new(factory));
        self
    }

    pub fn contains(&self, type_id: TypeId) -> bool {
        self.factories.contains_key(&type_id)
    }

    /// The editor for a value described by `request`.
    pub fn resolve(&self, request: &EditorRequest) -> Box<dyn PropertyEditor> {
        let precision = request.settings.float_precision;
        let Some(type_info) = request.type_info else {
            return Box::new(ReadOnlyEditor::new(precision));
        };
        if let Some(factory) = self.factories.get(&type_info.type_id()) {
            return factory(request);
        }
        if request.depth > request.settings.max_depth {
            return Box::new(ReadOnlyEditor::new(precision));
        }

        match type_info {
            TypeInfo::Struct(_) | TypeInfo::TupleStruct(_) | TypeInfo::Tuple(_) => {
                Box::new(CompositeEditor::default())
            }
            TypeInfo::Enum(_) => match EnumEditor::new(type_info) {
                Some(editor) => Box::new(editor),
                None => Box::new(ReadOnlyEditor::new(precision)),
            },
            TypeInfo::List(_) | TypeInfo::Array(_) => {
                match CollectionEditor::for_type(type_info, request.attributes) {
                    Some(editor) => Box::new(editor),
                    None => Box::new(ReadOnlyEditor::new(precision)),
                }
            }
            TypeInfo::Map(_) | TypeInfo::Set(_) | TypeInfo::Opaque(_) => {
                debug!("No editor for `{}`, showing it read-only", type_info.type_path());
                Box::new(ReadOnlyEditor::new(precision))
            }
        }
    }
}
