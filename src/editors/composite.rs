use bevy::{prelude::*, reflect::ReflectRef};

use crate::{
    container::ContainerValue,
    error::EditorFault,
    node::{BuildContext, PropertyEditor, Refresh, RefreshContext},
    widget::{WidgetDisplay, WidgetId, WidgetKind},
};

use super::{mismatch, type_name_of};

/// Header for structs, tuple structs and tuples. Members get their own nodes.
#[derive(Debug, Default)]
pub struct CompositeEditor {
    header: Option<WidgetId>,
}

impl PropertyEditor for CompositeEditor {
    fn build(&mut self, cx: &mut BuildContext) {
        self.header = Some(cx.widget(WidgetKind::Header));
    }

    fn refresh(
        &mut self,
        cx: &mut RefreshContext,
        value: &ContainerValue,
    ) -> Result<Refresh, EditorFault> {
        let mut type_name = None;
        for item in value.values() {
            match item.reflect_ref() {
                ReflectRef::Struct(_) | ReflectRef::TupleStruct(_) | ReflectRef::Tuple(_) => {}
                _ => return Err(mismatch("struct or tuple", item)),
            }
            type_name.get_or_insert_with(|| type_name_of(item));
        }
        if let (Some(header), Some(type_name)) = (self.header, type_name) {
            cx.show(header, WidgetDisplay::Text(type_name));
        }
        Ok(Refresh::Unchanged)
    }

    fn has_children(&self) -> bool {
        true
    }
}
