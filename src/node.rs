use std::collections::HashMap;

use bevy::prelude::*;
use jackdaw_commands::EditToken;

use crate::{
    attributes::FieldAttributes,
    collection::CollectionEditor,
    container::{ContainerValue, ValueContainer},
    error::EditorFault,
    settings::InspectorSettings,
    widget::{WidgetDisplay, WidgetEvent, WidgetHost, WidgetId, WidgetKind, WidgetRequest},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u64);

#[derive(Clone, Debug, PartialEq)]
pub enum NodeState {
    /// Constructed, no widgets yet. Nodes whose editor is not ready wait here.
    Created,
    /// Widgets built, first refresh pending.
    Initialized,
    Active,
    /// Stopped rendering after a fault.
    Faulted(EditorFault),
    Deinitialized,
}

/// Result of an editor refresh.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Refresh {
    Unchanged,
    /// The value changed shape; the node must be replaced.
    Rebuild,
}

/// What an editor wants done in response to a widget event.
#[derive(Debug)]
pub enum EditAction {
    /// Write under the node's current gesture, if any.
    Set(Box<dyn PartialReflect>),
    /// Final write: commits immediately, closing any gesture of this node.
    Submit(Box<dyn PartialReflect>),
    BeginGesture,
    EndGesture,
    /// Abandon the gesture, restoring the values it started from.
    CancelGesture,
    Resize(i64),
    /// Discard the edit and repaint from the live value.
    Revert,
}

/// Label and metadata of a child node, open to adjustment by the parent editor.
#[derive(Clone, Debug, PartialEq)]
pub struct ChildConfig {
    pub label: String,
    pub attributes: FieldAttributes,
}

// ---------------------------------------------------------------------------
// Editor contexts
// ---------------------------------------------------------------------------

pub struct BuildContext<'a> {
    node: NodeId,
    label: &'a str,
    read_only: bool,
    container: &'a ValueContainer,
    settings: &'a InspectorSettings,
    host: &'a mut dyn WidgetHost,
    created: &'a mut Vec<WidgetId>,
}

impl BuildContext<'_> {
    /// Create a widget owned by this node. Its events route back to the node.
    pub fn widget(&mut self, kind: WidgetKind) -> WidgetId {
        let request = WidgetRequest {
            label: self.label.to_string(),
            kind,
            read_only: self.read_only,
        };
        let id = self.host.create(self.node, request);
        self.created.push(id);
        id
    }

    pub fn label(&self) -> &str {
        self.label
    }

    pub fn container(&self) -> &ValueContainer {
        self.container
    }

    pub fn attributes(&self) -> &FieldAttributes {
        self.container.attributes()
    }

    pub fn settings(&self) -> &InspectorSettings {
        self.settings
    }
}

pub struct RefreshContext<'a> {
    host: &'a mut dyn WidgetHost,
    shown: &'a mut HashMap<WidgetId, WidgetDisplay>,
    editing: bool,
    force: bool,
}

impl RefreshContext<'_> {
    /// Push `display` into `widget` unless it already shows it or the user is
    /// mid-gesture on this node.
    pub fn show(&mut self, widget: WidgetId, display: WidgetDisplay) {
        if self.editing && !self.force {
            return;
        }
        if !self.force && self.shown.get(&widget) == Some(&display) {
            return;
        }
        self.shown.insert(widget, display.clone());
        self.host.display(widget, display);
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }
}

pub struct EventContext<'a> {
    pub world: &'a World,
    pub container: &'a ValueContainer,
    pub settings: &'a InspectorSettings,
}

// ---------------------------------------------------------------------------
// PropertyEditor
// ---------------------------------------------------------------------------

/// Presents one value container through widgets.
pub trait PropertyEditor: Send + Sync + 'static {
    /// Editors waiting on something external return `false`; the node stays
    /// `Created` and is retried on later refreshes.
    fn is_ready(&self, _world: &World) -> bool {
        true
    }

    fn build(&mut self, cx: &mut BuildContext);

    fn refresh(
        &mut self,
        cx: &mut RefreshContext,
        value: &ContainerValue,
    ) -> Result<Refresh, EditorFault>;

    fn on_event(&mut self, _event: &WidgetEvent, _cx: &EventContext) -> Option<EditAction> {
        None
    }

    /// Whether the tree should build child nodes for the members of this value.
    fn has_children(&self) -> bool {
        false
    }

    /// Adjust the configuration of the child at `index` before it is built.
    fn configure_child(&self, _index: usize, _child: &mut ChildConfig) {}

    fn as_collection(&self) -> Option<&CollectionEditor> {
        None
    }

    fn as_collection_mut(&mut self) -> Option<&mut CollectionEditor> {
        None
    }
}

// ---------------------------------------------------------------------------
// EditorNode
// ---------------------------------------------------------------------------

pub struct EditorNode {
    pub(crate) id: NodeId,
    pub(crate) label: String,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) depth: usize,
    pub(crate) container: ValueContainer,
    pub(crate) editor: Box<dyn PropertyEditor>,
    pub(crate) state: NodeState,
    pub(crate) widgets: Vec<WidgetId>,
    pub(crate) gesture: Option<EditToken>,
    pub(crate) force_display: bool,
    shown: HashMap<WidgetId, WidgetDisplay>,
}

impl EditorNode {
    pub(crate) fn new(
        id: NodeId,
        label: String,
        parent: Option<NodeId>,
        depth: usize,
        container: ValueContainer,
        editor: Box<dyn PropertyEditor>,
    ) -> Self {
        Self {
            id,
            label,
            parent,
            children: Vec::new(),
            depth,
            container,
            editor,
            state: NodeState::Created,
            widgets: Vec::new(),
            gesture: None,
            force_display: false,
            shown: HashMap::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn container(&self) -> &ValueContainer {
        &self.container
    }

    pub fn state(&self) -> &NodeState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == NodeState::Active
    }

    /// Widgets this node owns, in creation order.
    pub fn widgets(&self) -> &[WidgetId] {
        &self.widgets
    }

    /// Token of the gesture in progress on this node.
    pub fn gesture(&self) -> Option<EditToken> {
        self.gesture
    }

    pub fn editor(&self) -> &dyn PropertyEditor {
        &*self.editor
    }

    pub fn is_read_only(&self) -> bool {
        self.container.attributes().read_only
    }

    /// Build widgets and run the first refresh.
    ///
    /// Returns `false` when the editor is not ready yet; the node then stays
    /// `Created`.
    pub(crate) fn initialize(
        &mut self,
        world: &World,
        host: &mut dyn WidgetHost,
        settings: &InspectorSettings,
    ) -> bool {
        if self.state != NodeState::Created {
            return self.state != NodeState::Deinitialized;
        }
        if !self.editor.is_ready(world) {
            return false;
        }

        let mut cx = BuildContext {
            node: self.id,
            label: &self.label,
            read_only: self.is_read_only(),
            container: &self.container,
            settings,
            host: &mut *host,
            created: &mut self.widgets,
        };
        self.editor.build(&mut cx);
        self.state = NodeState::Initialized;

        self.force_display = true;
        match self.refresh(world, host) {
            // Children are spawned from the value this refresh just read, so
            // a reshape reported now has nothing stale to replace.
            Some(Refresh::Unchanged | Refresh::Rebuild) => self.state = NodeState::Active,
            // Faulted during the first read.
            None => {}
        }
        true
    }

    pub(crate) fn refresh(&mut self, world: &World, host: &mut dyn WidgetHost) -> Option<Refresh> {
        if !matches!(self.state, NodeState::Initialized | NodeState::Active) {
            return None;
        }

        let outcome = match self.container.read(world) {
            Ok(value) => {
                let mut cx = RefreshContext {
                    host: &mut *host,
                    shown: &mut self.shown,
                    editing: self.gesture.is_some(),
                    force: self.force_display,
                };
                self.editor.refresh(&mut cx, &value)
            }
            Err(err) => Err(EditorFault::Unreadable(err.to_string())),
        };
        self.force_display = false;

        match outcome {
            Ok(refresh) => Some(refresh),
            Err(fault) => {
                self.fault(host, fault);
                None
            }
        }
    }

    fn fault(&mut self, host: &mut dyn WidgetHost, fault: EditorFault) {
        warn!(
            "Editor for '{}' ({}) stopped: {fault}",
            self.label,
            self.container.type_path()
        );
        for &widget in &self.widgets {
            host.display(widget, WidgetDisplay::Unsupported(fault.to_string()));
        }
        self.gesture = None;
        self.state = NodeState::Faulted(fault);
    }

    /// Release every widget and route owned by this node.
    pub(crate) fn deinitialize(&mut self, host: &mut dyn WidgetHost) -> Vec<WidgetId> {
        let widgets = std::mem::take(&mut self.widgets);
        for &widget in &widgets {
            host.destroy(widget);
        }
        self.shown.clear();
        self.gesture = None;
        self.state = NodeState::Deinitialized;
        widgets
    }
}

impl std::fmt::Debug for EditorNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorNode")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("path", &self.container.field_path())
            .field("state", &self.state)
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        any::TypeId,
        sync::{
            Arc,
            atomic::{AtomicBool, Ordering},
        },
    };

    use bevy::{ecs::reflect::AppTypeRegistry, reflect::Typed};

    use super::*;
    use crate::widget::HeadlessHost;

    #[derive(Component, Reflect, Default)]
    #[reflect(Component)]
    struct Caption {
        text: String,
    }

    /// Shows the text, or waits until `ready` flips.
    struct Probe {
        ready: Arc<AtomicBool>,
        widget: Option<WidgetId>,
        refreshes: usize,
        outcome: Refresh,
    }

    impl PropertyEditor for Probe {
        fn is_ready(&self, _world: &World) -> bool {
            self.ready.load(Ordering::Relaxed)
        }

        fn build(&mut self, cx: &mut BuildContext) {
            self.widget = Some(cx.widget(WidgetKind::Text));
        }

        fn refresh(
            &mut self,
            cx: &mut RefreshContext,
            value: &ContainerValue,
        ) -> Result<Refresh, EditorFault> {
            self.refreshes += 1;
            let Some(widget) = self.widget else {
                return Ok(Refresh::Unchanged);
            };
            let display = match value.uniform() {
                Some(value) => match value.try_downcast_ref::<String>() {
                    Some(text) => WidgetDisplay::Text(text.clone()),
                    None => {
                        return Err(EditorFault::TypeMismatch {
                            expected: "String",
                            found: format!("{value:?}"),
                        });
                    }
                },
                None => WidgetDisplay::Mixed,
            };
            cx.show(widget, display);
            Ok(self.outcome)
        }
    }

    fn setup(texts: &[&str]) -> (World, Vec<Entity>) {
        let mut world = World::new();
        world.init_resource::<AppTypeRegistry>();
        world.resource::<AppTypeRegistry>().write().register::<Caption>();
        let targets = texts
            .iter()
            .map(|text| world.spawn(Caption { text: text.to_string() }).id())
            .collect();
        (world, targets)
    }

    fn node(targets: &[Entity], path: &str, ready: bool) -> EditorNode {
        let container = ValueContainer::new(
            targets.to_vec(),
            TypeId::of::<Caption>(),
            path,
            Some(String::type_info()),
            FieldAttributes::default(),
        );
        let editor = Probe {
            ready: Arc::new(AtomicBool::new(ready)),
            widget: None,
            refreshes: 0,
            outcome: Refresh::Unchanged,
        };
        EditorNode::new(NodeId(1), "text".into(), None, 1, container, Box::new(editor))
    }

    #[test]
    fn initialize_builds_and_refreshes_once() {
        let (world, targets) = setup(&["hello"]);
        let mut host = HeadlessHost::default();
        let mut node = node(&targets, "text", true);

        assert!(node.initialize(&world, &mut host, &InspectorSettings::default()));
        assert!(node.is_active());
        assert_eq!(node.widgets().len(), 1);
        let widget = node.widgets()[0];
        assert_eq!(host.display_of(widget), Some(&WidgetDisplay::Text("hello".into())));
        assert_eq!(host.get(widget).unwrap().updates, 1);
    }

    #[test]
    fn reshape_on_first_refresh_still_activates() {
        let (world, targets) = setup(&["hello"]);
        let mut host = HeadlessHost::default();
        let mut node = node(&targets, "text", true);
        node.editor = Box::new(Probe {
            ready: Arc::new(AtomicBool::new(true)),
            widget: None,
            refreshes: 0,
            outcome: Refresh::Rebuild,
        });

        assert!(node.initialize(&world, &mut host, &InspectorSettings::default()));
        assert!(node.is_active());
        assert_eq!(node.refresh(&world, &mut host), Some(Refresh::Rebuild));
    }

    #[test]
    fn unready_editor_stays_created() {
        let (world, targets) = setup(&["hello"]);
        let mut host = HeadlessHost::default();
        let mut node = node(&targets, "text", false);

        assert!(!node.initialize(&world, &mut host, &InspectorSettings::default()));
        assert_eq!(node.state(), &NodeState::Created);
        assert!(host.is_empty());
    }

    #[test]
    fn mixed_values_show_mixed_but_not_mid_gesture() {
        let (mut world, targets) = setup(&["a", "a"]);
        let mut host = HeadlessHost::default();
        let mut node = node(&targets, "text", true);
        node.initialize(&world, &mut host, &InspectorSettings::default());
        let widget = node.widgets()[0];

        node.gesture = Some(jackdaw_commands::Transactions::enabled().new_token());
        world.get_mut::<Caption>(targets[1]).unwrap().text = "b".into();
        node.refresh(&world, &mut host);
        assert_eq!(host.display_of(widget), Some(&WidgetDisplay::Text("a".into())));

        node.gesture = None;
        node.refresh(&world, &mut host);
        assert_eq!(host.display_of(widget), Some(&WidgetDisplay::Mixed));
    }

    #[test]
    fn unchanged_display_is_not_pushed_again() {
        let (world, targets) = setup(&["a"]);
        let mut host = HeadlessHost::default();
        let mut node = node(&targets, "text", true);
        node.initialize(&world, &mut host, &InspectorSettings::default());
        let widget = node.widgets()[0];

        node.refresh(&world, &mut host);
        node.refresh(&world, &mut host);
        assert_eq!(host.get(widget).unwrap().updates, 1);
    }

    #[test]
    fn unreadable_path_faults_the_node() {
        let (world, targets) = setup(&["a"]);
        let mut host = HeadlessHost::default();
        let mut node = node(&targets, "missing", true);
        node.initialize(&world, &mut host, &InspectorSettings::default());

        assert!(matches!(node.state(), NodeState::Faulted(EditorFault::Unreadable(_))));
        let widget = node.widgets()[0];
        assert!(matches!(host.display_of(widget), Some(WidgetDisplay::Unsupported(_))));
    }

    #[test]
    fn deinitialize_releases_every_widget() {
        let (world, targets) = setup(&["a"]);
        let mut host = HeadlessHost::default();
        let mut node = node(&targets, "text", true);
        node.initialize(&world, &mut host, &InspectorSettings::default());

        let released = node.deinitialize(&mut host);
        assert_eq!(released.len(), 1);
        assert!(host.is_empty());
        assert!(node.widgets().is_empty());
        assert_eq!(node.state(), &NodeState::Deinitialized);
    }
}
