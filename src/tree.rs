use std::{any::TypeId, collections::HashMap};

use bevy::{
    ecs::reflect::{AppTypeRegistry, ReflectComponent},
    prelude::*,
    reflect::{NamedField, TypeInfo, UnnamedField, VariantInfo},
};
use jackdaw_commands::{EditToken, Transactions};

use crate::{
    attributes::FieldAttributes,
    collection::ResizePlan,
    container::{ContainerValue, PathSegment, ValueContainer},
    error::{CollectionError, NodeError},
    node::{ChildConfig, EditAction, EditorNode, EventContext, NodeId, NodeState, Refresh},
    registry::{EditorRegistry, EditorRequest},
    settings::InspectorSettings,
    widget::{WidgetEvent, WidgetHost, WidgetId},
};

/// A component every target carries, as listed by the tree.
#[derive(Clone, Debug)]
pub struct ComponentEntry {
    pub type_id: TypeId,
    pub type_info: &'static TypeInfo,
    pub name: String,
    pub group: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RebuiltNode {
    pub old: NodeId,
    pub new: NodeId,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Nodes refreshed in place.
    pub refreshed: usize,
    /// Nodes still waiting for their editor to become ready.
    pub deferred: Vec<NodeId>,
    /// Nodes replaced because their value changed shape.
    pub rebuilt: Vec<RebuiltNode>,
    pub faulted: Vec<NodeId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResizeOutcome {
    Unchanged { len: usize },
    Resized { from: usize, to: usize },
}

/// Human-readable group for a component's module path.
/// e.g. `bevy_pbr::material` → "Render", `bevy_transform` → "Transform".
fn component_group(module_path: Option<&str>) -> String {
    let Some(path) = module_path else {
        return "Other".to_string();
    };
    let first = path.split("::").next().unwrap_or(path);
    let name = first.strip_prefix("bevy_").unwrap_or(first);
    match name {
        "pbr" | "core_pipeline" | "render" => "Render".to_string(),
        "transform" => "Transform".to_string(),
        "ecs" => "ECS".to_string(),
        "asset" => "Asset".to_string(),
        "scene" => "Scene".to_string(),
        "audio" => "Audio".to_string(),
        "animation" => "Animation".to_string(),
        _ => {
            let mut chars = name.chars();
            match chars.next() {
                None => "Other".to_string(),
                Some(c) => c.to_uppercase().to_string() + chars.as_str(),
            }
        }
    }
}

/// Reflected components present on every target, sorted by group then name.
pub fn shared_components(
    world: &World,
    targets: &[Entity],
    settings: &InspectorSettings,
) -> Vec<ComponentEntry> {
    let Some((&primary, others)) = targets.split_first() else {
        return Vec::new();
    };
    let Ok(primary) = world.get_entity(primary) else {
        return Vec::new();
    };
    let registry = world.resource::<AppTypeRegistry>().read();

    let mut entries: Vec<ComponentEntry> = primary
        .archetype()
        .iter_components()
        .filter_map(|component_id| {
            let type_id = world.components().get_info(component_id)?.type_id()?;
            let registration = registry.get(type_id)?;
            registration.data::<ReflectComponent>()?;
            let table = registration.type_info().type_path_table();
            if settings.is_hidden(table.path()) {
                return None;
            }
            let shared = others.iter().all(|&entity| {
                world
                    .get_entity(entity)
                    .is_ok_and(|entity| entity.contains_id(component_id))
            });
            shared.then(|| ComponentEntry {
                type_id,
                type_info: registration.type_info(),
                name: table.short_path().to_string(),
                group: component_group(table.module_path()),
            })
        })
        .collect();

    entries.sort_by(|a, b| {
        a.group
            .cmp(&b.group)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
    entries
}

struct ChildSpec {
    label: String,
    segment: PathSegment<'static>,
    type_info: Option<&'static TypeInfo>,
    attributes: FieldAttributes,
}

/// Members of `value` that get their own node.
fn child_specs(container: &ValueContainer, value: &ContainerValue) -> Vec<ChildSpec> {
    let type_info = container
        .type_info()
        .or_else(|| value.values().next()?.get_represented_type_info());
    let Some(type_info) = type_info else {
        return Vec::new();
    };
    let parent = container.attributes();

    let named = |field: &NamedField| ChildSpec {
        label: field.name().to_string(),
        segment: PathSegment::Field(field.name()),
        type_info: field.type_info(),
        attributes: FieldAttributes::from_custom(field.custom_attributes()).inherit(parent),
    };
    let unnamed = |field: &UnnamedField| ChildSpec {
        label: field.index().to_string(),
        segment: PathSegment::TupleIndex(field.index()),
        type_info: field.type_info(),
        attributes: FieldAttributes::from_custom(field.custom_attributes()).inherit(parent),
    };

    match type_info {
        TypeInfo::Struct(info) => info.iter().map(named).collect(),
        TypeInfo::TupleStruct(info) => info.iter().map(unnamed).collect(),
        TypeInfo::Tuple(info) => info.iter().map(unnamed).collect(),
        TypeInfo::List(_) | TypeInfo::Array(_) => {
            let item_info = match type_info {
                TypeInfo::List(info) => info.item_info(),
                TypeInfo::Array(info) => info.item_info(),
                _ => None,
            };
            let len = value.common_len().unwrap_or(0);
            (0..len)
                .map(|index| ChildSpec {
                    label: format!("[{index}]"),
                    segment: PathSegment::Element(index),
                    type_info: item_info,
                    attributes: FieldAttributes {
                        no_null_items: false,
                        ..parent.clone()
                    },
                })
                .collect()
        }
        TypeInfo::Enum(info) => {
            match value.common_variant().and_then(|name| info.variant(name)) {
                Some(VariantInfo::Struct(variant)) => variant.iter().map(named).collect(),
                Some(VariantInfo::Tuple(variant)) => variant.iter().map(unnamed).collect(),
                Some(VariantInfo::Unit(_)) | None => Vec::new(),
            }
        }
        TypeInfo::Map(_) | TypeInfo::Set(_) | TypeInfo::Opaque(_) => Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// EditorTree
// ---------------------------------------------------------------------------

/// Editor nodes for every component shared by a fixed set of targets.
///
/// The target list never changes; a new selection means a new tree.
pub struct EditorTree {
    targets: Vec<Entity>,
    components: Vec<TypeId>,
    nodes: HashMap<NodeId, EditorNode>,
    roots: Vec<NodeId>,
    routes: HashMap<WidgetId, NodeId>,
    next_node: u64,
    registry: EditorRegistry,
    settings: InspectorSettings,
    pending_rebuild: Vec<NodeId>,
}

impl EditorTree {
    pub fn build(
        world: &World,
        targets: &[Entity],
        registry: &EditorRegistry,
        settings: &InspectorSettings,
        host: &mut dyn WidgetHost,
    ) -> Self {
        let components = shared_components(world, targets, settings);
        let mut tree = Self {
            targets: targets.to_vec(),
            components: components.iter().map(|entry| entry.type_id).collect(),
            nodes: HashMap::new(),
            roots: Vec::new(),
            routes: HashMap::new(),
            next_node: 0,
            registry: registry.clone(),
            settings: settings.clone(),
            pending_rebuild: Vec::new(),
        };

        for entry in components {
            let container = ValueContainer::new(
                targets.to_vec(),
                entry.type_id,
                "",
                Some(entry.type_info),
                FieldAttributes::default(),
            );
            let id = tree.spawn_node(entry.name, None, 0, container);
            tree.roots.push(id);
        }

        let mut deferred = Vec::new();
        for id in tree.roots.clone() {
            tree.initialize_node(world, host, id, &mut deferred);
        }
        info!(
            "Inspector built {} nodes for {} target(s)",
            tree.nodes.len(),
            tree.targets.len()
        );
        tree
    }

    pub fn targets(&self) -> &[Entity] {
        &self.targets
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn node(&self, id: NodeId) -> Option<&EditorNode> {
        self.nodes.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &EditorNode> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node receiving events from `widget`.
    pub fn route(&self, widget: WidgetId) -> Option<NodeId> {
        self.routes.get(&widget).copied()
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Node bound to `field_path` of component `component`.
    pub fn node_at(&self, component: TypeId, field_path: &str) -> Option<NodeId> {
        self.nodes
            .values()
            .find(|node| {
                node.container.component_type_id() == component
                    && node.container.field_path() == field_path
            })
            .map(|node| node.id)
    }

    /// Whether the targets' shared components no longer match this tree.
    pub fn is_stale(&self, world: &World) -> bool {
        let current: Vec<TypeId> = shared_components(world, &self.targets, &self.settings)
            .into_iter()
            .map(|entry| entry.type_id)
            .collect();
        current != self.components
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut EditorNode, NodeError> {
        self.nodes.get_mut(&id).ok_or(NodeError::UnknownNode(id))
    }

    /// An active, writable node.
    fn editable(&mut self, id: NodeId) -> Result<&mut EditorNode, NodeError> {
        let node = self.node_mut(id)?;
        if !node.is_active() {
            return Err(NodeError::NotActive(node.label.clone()));
        }
        if node.is_read_only() {
            return Err(NodeError::ReadOnly(node.label.clone()));
        }
        Ok(node)
    }

    fn spawn_node(
        &mut self,
        label: String,
        parent: Option<NodeId>,
        depth: usize,
        container: ValueContainer,
    ) -> NodeId {
        self.next_node += 1;
        let id = NodeId(self.next_node);
        let editor = self.registry.resolve(&EditorRequest {
            type_info: container.type_info(),
            attributes: container.attributes(),
            settings: &self.settings,
            depth,
        });
        self.nodes
            .insert(id, EditorNode::new(id, label, parent, depth, container, editor));
        id
    }

    /// Initialize `id` and, once it is active, build and initialize its
    /// children.
    fn initialize_node(
        &mut self,
        world: &World,
        host: &mut dyn WidgetHost,
        id: NodeId,
        deferred: &mut Vec<NodeId>,
    ) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        if !node.initialize(world, host, &self.settings) {
            deferred.push(id);
            return;
        }
        for &widget in node.widgets() {
            self.routes.insert(widget, id);
        }
        if node.is_active() && node.editor.has_children() && node.children.is_empty() {
            self.spawn_children(world, id);
        }

        let children = self.nodes.get(&id).map(|node| node.children.clone());
        for child in children.unwrap_or_default() {
            self.initialize_node(world, host, child, deferred);
        }
    }

    fn spawn_children(&mut self, world: &World, id: NodeId) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        let Ok(value) = node.container.read(world) else {
            return;
        };
        let specs = child_specs(&node.container, &value);

        let mut children = Vec::with_capacity(specs.len());
        for (index, spec) in specs.into_iter().enumerate() {
            let Some(node) = self.nodes.get(&id) else {
                return;
            };
            let mut config = ChildConfig {
                label: spec.label,
                attributes: spec.attributes,
            };
            node.editor.configure_child(index, &mut config);
            let container = node
                .container
                .child(spec.segment, spec.type_info, config.attributes);
            let depth = node.depth + 1;
            children.push(self.spawn_node(config.label, Some(id), depth, container));
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.children = children;
        }
    }

    /// Deinitialize and drop `id` and everything below it.
    fn remove_subtree(&mut self, host: &mut dyn WidgetHost, id: NodeId) {
        let Some(mut node) = self.nodes.remove(&id) else {
            return;
        };
        for child in std::mem::take(&mut node.children) {
            self.remove_subtree(host, child);
        }
        for widget in node.deinitialize(host) {
            self.routes.remove(&widget);
        }
    }

    /// Replace `id` with a fresh node bound to the same container.
    fn rebuild(
        &mut self,
        world: &World,
        host: &mut dyn WidgetHost,
        id: NodeId,
        deferred: &mut Vec<NodeId>,
    ) -> Option<NodeId> {
        let node = self.nodes.get(&id)?;
        let label = node.label.clone();
        let parent = node.parent;
        let depth = node.depth;
        let container = node.container.clone();

        self.remove_subtree(host, id);
        let new = self.spawn_node(label, parent, depth, container);
        let siblings = match parent.and_then(|parent| self.nodes.get_mut(&parent)) {
            Some(parent) => &mut parent.children,
            None => &mut self.roots,
        };
        if let Some(slot) = siblings.iter_mut().find(|sibling| **sibling == id) {
            *slot = new;
        }
        self.initialize_node(world, host, new, deferred);
        debug!("Rebuilt node {id:?} as {new:?}");
        Some(new)
    }

    /// Re-read every node, initialize waiting ones and replace nodes whose
    /// value changed shape.
    pub fn refresh(&mut self, world: &World, host: &mut dyn WidgetHost) -> RefreshReport {
        let mut report = RefreshReport::default();

        for id in std::mem::take(&mut self.pending_rebuild) {
            if let Some(new) = self.rebuild(world, host, id, &mut report.deferred) {
                report.rebuilt.push(RebuiltNode { old: id, new });
            }
        }

        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get_mut(&id) else {
                continue;
            };
            match node.state {
                NodeState::Created => {
                    self.initialize_node(world, host, id, &mut report.deferred);
                    continue;
                }
                NodeState::Active => {}
                _ => continue,
            }

            match node.refresh(world, host) {
                Some(Refresh::Unchanged) => {
                    report.refreshed += 1;
                    stack.extend(node.children.iter().rev().copied());
                }
                Some(Refresh::Rebuild) => {
                    if let Some(new) = self.rebuild(world, host, id, &mut report.deferred) {
                        report.rebuilt.push(RebuiltNode { old: id, new });
                    }
                }
                None => {
                    // Faulted: its members stop rendering with it.
                    let children = std::mem::take(&mut node.children);
                    for child in children {
                        self.remove_subtree(host, child);
                    }
                    report.faulted.push(id);
                }
            }
        }
        report
    }

    /// Route a widget event to its node and carry out the resulting edit.
    pub fn handle_event(
        &mut self,
        world: &mut World,
        tx: &mut Transactions,
        event: &WidgetEvent,
    ) -> Result<(), NodeError> {
        let Some(id) = self.route(event.widget) else {
            debug!("Dropping event for unrouted widget {:?}", event.widget);
            return Ok(());
        };
        let node = self.node_mut(id)?;
        if !node.is_active() {
            return Err(NodeError::NotActive(node.label.clone()));
        }

        let Some(node) = self.nodes.get_mut(&id) else {
            return Err(NodeError::UnknownNode(id));
        };
        let cx = EventContext {
            world,
            container: &node.container,
            settings: &self.settings,
        };
        let Some(action) = node.editor.on_event(event, &cx) else {
            return Ok(());
        };

        match action {
            EditAction::Set(value) => {
                let token = node.gesture;
                self.set_value(world, tx, id, &*value, token)
            }
            EditAction::Submit(value) => self.set_value(world, tx, id, &*value, None),
            EditAction::BeginGesture => self.begin_gesture(world, tx, id).map(|_| ()),
            EditAction::EndGesture => self.commit_gesture(world, tx, id),
            EditAction::CancelGesture => self.cancel_gesture(world, tx, id),
            EditAction::Resize(size) => self.resize(world, tx, id, size).map(|_| ()),
            EditAction::Revert => {
                node.force_display = true;
                Ok(())
            }
        }
    }

    /// Write `value` to every target of node `id`.
    ///
    /// Writes carrying the same token share one transaction. A write with no
    /// token commits immediately; if the node's own gesture is open, the
    /// write joins it and closes it.
    pub fn set_value(
        &mut self,
        world: &mut World,
        tx: &mut Transactions,
        id: NodeId,
        value: &dyn PartialReflect,
        token: Option<EditToken>,
    ) -> Result<(), NodeError> {
        let node = self.editable(id)?;
        let own_gesture = node.gesture;
        let container = node.container.clone();
        let label = format!("Set {}", node.label);

        if tx.is_open() {
            let joins = match (tx.open_token(), token) {
                (Some(open), Some(token)) => open == token,
                (Some(open), None) => own_gesture == Some(open),
                (None, _) => false,
            };
            if !joins {
                tx.commit(world);
            }
        }
        if tx.is_open() {
            tx.include(world, container.property_targets())?;
        } else {
            tx.begin(world, container.property_targets(), label, token)?;
        }

        let written = container.write(world, value);
        let node = self.node_mut(id)?;
        match token {
            Some(token) => node.gesture = Some(token),
            None => {
                tx.commit(world);
                node.gesture = None;
                node.force_display = true;
            }
        }
        Ok(written?)
    }

    /// Start a gesture on `id`, returning its coalescing token.
    pub fn begin_gesture(
        &mut self,
        world: &World,
        tx: &mut Transactions,
        id: NodeId,
    ) -> Result<EditToken, NodeError> {
        let node = self.editable(id)?;
        if tx.is_open() {
            tx.commit(world);
        }
        let token = tx.new_token();
        node.gesture = Some(token);
        Ok(token)
    }

    /// End the gesture on `id`, committing whatever it wrote.
    pub fn commit_gesture(
        &mut self,
        world: &World,
        tx: &mut Transactions,
        id: NodeId,
    ) -> Result<(), NodeError> {
        let node = self.node_mut(id)?;
        let Some(token) = node.gesture.take() else {
            return Ok(());
        };
        node.force_display = true;
        if tx.open_token() == Some(token) {
            tx.commit(world);
        }
        Ok(())
    }

    /// Abandon the gesture on `id`, restoring every target to the value it
    /// held when the gesture's first write landed.
    ///
    /// Without history there is no snapshot to return to; the gesture just
    /// ends.
    pub fn cancel_gesture(
        &mut self,
        world: &mut World,
        tx: &mut Transactions,
        id: NodeId,
    ) -> Result<(), NodeError> {
        let node = self.node_mut(id)?;
        let Some(token) = node.gesture.take() else {
            return Ok(());
        };
        node.force_display = true;
        if tx.open_token() == Some(token) {
            tx.cancel(world)?;
        }
        Ok(())
    }

    /// Resize the list bound to `id`. The node is rebuilt on the next refresh.
    pub fn resize(
        &mut self,
        world: &mut World,
        tx: &mut Transactions,
        id: NodeId,
        new_size: i64,
    ) -> Result<ResizeOutcome, NodeError> {
        let node = self.editable(id)?;
        let value = node.container.read(world)?;
        let container = node.container.clone();
        let label = format!("Resize {}", node.label);
        let Some(collection) = node.editor.as_collection_mut() else {
            return Err(CollectionError::NotAList(node.label.clone()).into());
        };

        let registry = world.resource::<AppTypeRegistry>().clone();
        let plan = collection.prepare_resize(&registry.read(), &value, new_size)?;
        let (from, to, list) = match plan {
            ResizePlan::Unchanged { len } => return Ok(ResizeOutcome::Unchanged { len }),
            ResizePlan::Write { from, to, list } => (from, to, list),
        };

        if tx.is_open() {
            tx.commit(world);
        }
        let written = tx
            .begin(world, container.property_targets(), label, None)
            .map_err(NodeError::from)
            .and_then(|_| container.write(world, &list).map_err(NodeError::from));
        tx.commit(world);

        let node = self.node_mut(id)?;
        let Some(collection) = node.editor.as_collection_mut() else {
            return Err(CollectionError::NotAList(node.label.clone()).into());
        };
        match written {
            Ok(()) => {
                collection.finish_resize();
                if !self.pending_rebuild.contains(&id) {
                    self.pending_rebuild.push(id);
                }
                Ok(ResizeOutcome::Resized { from, to })
            }
            Err(err) => {
                collection.abort_resize();
                Err(err)
            }
        }
    }

    /// Detached copies of the elements of the list bound to `id`.
    pub fn clone_values(
        &self,
        world: &World,
        id: NodeId,
    ) -> Result<Vec<Box<dyn PartialReflect>>, NodeError> {
        let node = self.nodes.get(&id).ok_or(NodeError::UnknownNode(id))?;
        let Some(collection) = node.editor.as_collection() else {
            return Err(CollectionError::NotAList(node.label.clone()).into());
        };
        let value = node.container.read(world)?;
        Ok(collection.clone_values(&value)?)
    }

    /// Deinitialize every node, releasing all widgets and routes.
    pub fn teardown(&mut self, host: &mut dyn WidgetHost) {
        for id in std::mem::take(&mut self.roots) {
            self.remove_subtree(host, id);
        }
        self.pending_rebuild.clear();
        debug_assert!(self.routes.is_empty(), "routes outlived their nodes");
        self.routes.clear();
    }
}

impl std::fmt::Debug for EditorTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorTree")
            .field("targets", &self.targets)
            .field("roots", &self.roots)
            .field("nodes", &self.nodes.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_follow_module_paths() {
        assert_eq!(component_group(Some("bevy_pbr::material")), "Render");
        assert_eq!(component_group(Some("bevy_transform::components")), "Transform");
        assert_eq!(component_group(Some("my_game::stats")), "My_game");
        assert_eq!(component_group(None), "Other");
    }
}
