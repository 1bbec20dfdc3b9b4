use bevy::prelude::*;

use crate::{
    container::ContainerValue,
    error::EditorFault,
    node::{BuildContext, EditAction, EventContext, PropertyEditor, Refresh, RefreshContext},
    widget::{WidgetDisplay, WidgetEvent, WidgetEventKind, WidgetId, WidgetKind, WidgetValue},
};

use super::mismatch;

#[derive(Debug, Default)]
pub struct BoolEditor {
    checkbox: Option<WidgetId>,
}

impl PropertyEditor for BoolEditor {
    fn build(&mut self, cx: &mut BuildContext) {
        self.checkbox = Some(cx.widget(WidgetKind::Checkbox));
    }

    fn refresh(
        &mut self,
        cx: &mut RefreshContext,
        value: &ContainerValue,
    ) -> Result<Refresh, EditorFault> {
        for item in value.values() {
            if item.try_downcast_ref::<bool>().is_none() {
                return Err(mismatch("bool", item));
            }
        }
        let display = match value.uniform().and_then(|v| v.try_downcast_ref::<bool>()) {
            Some(&checked) => WidgetDisplay::Bool(checked),
            None => WidgetDisplay::Mixed,
        };
        if let Some(checkbox) = self.checkbox {
            cx.show(checkbox, display);
        }
        Ok(Refresh::Unchanged)
    }

    fn on_event(&mut self, event: &WidgetEvent, _cx: &EventContext) -> Option<EditAction> {
        match event.kind {
            WidgetEventKind::Changed(WidgetValue::Bool(checked)) => {
                Some(EditAction::Submit(Box::new(checked)))
            }
            _ => None,
        }
    }
}
