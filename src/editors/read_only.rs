use crate::{
    container::ContainerValue,
    error::EditorFault,
    node::{BuildContext, PropertyEditor, Refresh, RefreshContext},
    widget::{WidgetDisplay, WidgetId, WidgetKind},
};

use super::format_value;

/// Fallback label for values with no dedicated editor (maps, sets, opaque
/// types, anything nested too deep).
#[derive(Debug)]
pub struct ReadOnlyEditor {
    precision: usize,
    label: Option<WidgetId>,
}

impl ReadOnlyEditor {
    pub fn new(precision: usize) -> Self {
        Self {
            precision,
            label: None,
        }
    }
}

impl PropertyEditor for ReadOnlyEditor {
    fn build(&mut self, cx: &mut BuildContext) {
        self.label = Some(cx.widget(WidgetKind::Label));
    }

    fn refresh(
        &mut self,
        cx: &mut RefreshContext,
        value: &ContainerValue,
    ) -> Result<Refresh, EditorFault> {
        let display = match value.uniform() {
            Some(value) => WidgetDisplay::Text(format_value(value, self.precision)),
            None => WidgetDisplay::Mixed,
        };
        if let Some(label) = self.label {
            cx.show(label, display);
        }
        Ok(Refresh::Unchanged)
    }
}
