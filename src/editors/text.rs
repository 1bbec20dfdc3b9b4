use bevy::prelude::*;

use crate::{
    container::ContainerValue,
    error::EditorFault,
    node::{BuildContext, EditAction, EventContext, PropertyEditor, Refresh, RefreshContext},
    widget::{WidgetDisplay, WidgetEvent, WidgetEventKind, WidgetId, WidgetKind, WidgetValue},
};

use super::mismatch;

/// `String` field. Typing writes live under the focus gesture; Enter or blur
/// closes it.
#[derive(Debug, Default)]
pub struct TextEditor {
    field: Option<WidgetId>,
}

impl PropertyEditor for TextEditor {
    fn build(&mut self, cx: &mut BuildContext) {
        self.field = Some(cx.widget(WidgetKind::Text));
    }

    fn refresh(
        &mut self,
        cx: &mut RefreshContext,
        value: &ContainerValue,
    ) -> Result<Refresh, EditorFault> {
        for item in value.values() {
            if item.try_downcast_ref::<String>().is_none() {
                return Err(mismatch("String", item));
            }
        }
        let display = match value.uniform().and_then(|v| v.try_downcast_ref::<String>()) {
            Some(text) => WidgetDisplay::Text(text.clone()),
            None => WidgetDisplay::Mixed,
        };
        if let Some(field) = self.field {
            cx.show(field, display);
        }
        Ok(Refresh::Unchanged)
    }

    fn on_event(&mut self, event: &WidgetEvent, _cx: &EventContext) -> Option<EditAction> {
        match &event.kind {
            WidgetEventKind::GestureBegin => Some(EditAction::BeginGesture),
            WidgetEventKind::Changed(WidgetValue::Text(text)) => {
                Some(EditAction::Set(Box::new(text.clone())))
            }
            WidgetEventKind::Submitted(text) => Some(EditAction::Submit(Box::new(text.clone()))),
            WidgetEventKind::GestureEnd => Some(EditAction::EndGesture),
            WidgetEventKind::GestureCancel => Some(EditAction::CancelGesture),
            _ => None,
        }
    }
}
