//! The seam between editor nodes and whatever draws them.
//!
//! Editors never touch UI entities directly. They ask a [`WidgetHost`] for
//! widgets, push [`WidgetDisplay`] states into them, and receive
//! [`WidgetEvent`]s back, routed by [`WidgetId`].

use std::collections::BTreeMap;

use jackdaw_widgets::{DragModifiers, NumericInput};

use crate::node::NodeId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WidgetId(pub u64);

#[derive(Clone, Debug, PartialEq)]
pub enum WidgetKind {
    /// Foldout header for composite values and collections.
    Header,
    Checkbox,
    Numeric(NumericInput),
    Text,
    ComboBox { options: Vec<String> },
    /// Non-interactive text.
    Label,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WidgetRequest {
    pub label: String,
    pub kind: WidgetKind,
    pub read_only: bool,
}

/// What a widget should currently show.
#[derive(Clone, Debug, PartialEq)]
pub enum WidgetDisplay {
    Bool(bool),
    Number(f64),
    Text(String),
    /// Index into a combo box's options.
    Selected(usize),
    /// Element count of a collection header.
    Length(usize),
    /// The selected targets disagree.
    Mixed,
    /// The node faulted; the payload describes why.
    Unsupported(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum WidgetValue {
    Bool(bool),
    Number(f64),
    Text(String),
    Index(usize),
}

#[derive(Clone, Debug, PartialEq)]
pub enum WidgetEventKind {
    /// Live value change (checkbox toggle, combo pick, typing, slider).
    Changed(WidgetValue),
    /// Text confirmed with Enter or focus loss.
    Submitted(String),
    /// Press, focus or drag start.
    GestureBegin,
    /// Release or blur.
    GestureEnd,
    /// Escape during a gesture: everything it wrote is undone.
    GestureCancel,
    /// Horizontal drag over a numeric field.
    Scrub {
        screen_x: f32,
        modifiers: DragModifiers,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct WidgetEvent {
    pub widget: WidgetId,
    pub kind: WidgetEventKind,
}

impl WidgetEvent {
    pub fn new(widget: WidgetId, kind: WidgetEventKind) -> Self {
        Self { widget, kind }
    }

    pub fn changed(widget: WidgetId, value: WidgetValue) -> Self {
        Self::new(widget, WidgetEventKind::Changed(value))
    }

    pub fn submitted(widget: WidgetId, text: impl Into<String>) -> Self {
        Self::new(widget, WidgetEventKind::Submitted(text.into()))
    }
}

/// Creates, updates and destroys the widgets an editor tree asks for.
pub trait WidgetHost {
    fn create(&mut self, node: NodeId, request: WidgetRequest) -> WidgetId;
    fn display(&mut self, widget: WidgetId, display: WidgetDisplay);
    fn destroy(&mut self, widget: WidgetId);
}

// ---------------------------------------------------------------------------
// HeadlessHost
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct HeadlessWidget {
    pub node: NodeId,
    pub request: WidgetRequest,
    pub display: Option<WidgetDisplay>,
    /// Number of display updates received.
    pub updates: usize,
}

/// Records widget state in memory. Used for tests and for running the
/// inspector without a UI.
#[derive(Debug, Default)]
pub struct HeadlessHost {
    next_id: u64,
    widgets: BTreeMap<WidgetId, HeadlessWidget>,
    destroyed: usize,
}

impl HeadlessHost {
    pub fn get(&self, widget: WidgetId) -> Option<&HeadlessWidget> {
        self.widgets.get(&widget)
    }

    pub fn display_of(&self, widget: WidgetId) -> Option<&WidgetDisplay> {
        self.widgets.get(&widget)?.display.as_ref()
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    /// Total widgets destroyed since the host was created.
    pub fn destroyed(&self) -> usize {
        self.destroyed
    }

    pub fn iter(&self) -> impl Iterator<Item = (WidgetId, &HeadlessWidget)> {
        self.widgets.iter().map(|(id, widget)| (*id, widget))
    }

    /// First live widget whose label matches.
    pub fn find(&self, label: &str) -> Option<WidgetId> {
        self.iter()
            .find(|(_, widget)| widget.request.label == label)
            .map(|(id, _)| id)
    }

    pub fn widgets_of(&self, node: NodeId) -> Vec<WidgetId> {
        self.iter()
            .filter(|(_, widget)| widget.node == node)
            .map(|(id, _)| id)
            .collect()
    }
}

impl WidgetHost for HeadlessHost {
    fn create(&mut self, node: NodeId, request: WidgetRequest) -> WidgetId {
        self.next_id += 1;
        let id = WidgetId(self.next_id);
        self.widgets.insert(
            id,
            HeadlessWidget {
                node,
                request,
                display: None,
                updates: 0,
            },
        );
        id
    }

    fn display(&mut self, widget: WidgetId, display: WidgetDisplay) {
        if let Some(widget) = self.widgets.get_mut(&widget) {
            widget.display = Some(display);
            widget.updates += 1;
        }
    }

    fn destroy(&mut self, widget: WidgetId) {
        if self.widgets.remove(&widget).is_some() {
            self.destroyed += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(text: &str) -> WidgetRequest {
        WidgetRequest {
            label: text.into(),
            kind: WidgetKind::Label,
            read_only: true,
        }
    }

    #[test]
    fn headless_host_tracks_widgets() {
        let mut host = HeadlessHost::default();
        let a = host.create(NodeId(1), label("a"));
        let b = host.create(NodeId(2), label("b"));
        assert_ne!(a, b);
        assert_eq!(host.find("b"), Some(b));

        host.display(a, WidgetDisplay::Text("hi".into()));
        assert_eq!(host.display_of(a), Some(&WidgetDisplay::Text("hi".into())));
        assert_eq!(host.get(a).unwrap().updates, 1);

        host.destroy(a);
        host.destroy(a);
        assert_eq!(host.len(), 1);
        assert_eq!(host.destroyed(), 1);
        assert_eq!(host.widgets_of(NodeId(2)), vec![b]);
    }
}
