use bevy::prelude::*;
use jackdaw_commands::Transactions;

use crate::{
    registry::EditorRegistry,
    selection::{Selection, SelectionPlugin},
    settings::InspectorSettings,
    tree::EditorTree,
    widget::{HeadlessHost, WidgetEvent, WidgetHost},
};

/// Keeps an [`EditorTree`] in step with the [`Selection`].
///
/// Insert [`InspectorSettings`] or an [`Inspector`] with a custom host before
/// adding the plugin to override the defaults.
pub struct InspectorPlugin;

impl Plugin for InspectorPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<InspectorSettings>()
            .init_resource::<EditorRegistry>()
            .init_resource::<Inspector>()
            .init_resource::<PendingWidgetEvents>()
            .add_plugins(SelectionPlugin)
            .add_systems(Update, update_inspector);

        if !app.world().contains_resource::<Transactions>() {
            let transactions = app.world().resource::<InspectorSettings>().transactions();
            app.insert_resource(transactions);
        }
    }
}

/// The live editor tree and the host drawing it.
#[derive(Resource)]
pub struct Inspector {
    tree: Option<EditorTree>,
    host: Box<dyn WidgetHost + Send + Sync>,
}

impl Default for Inspector {
    fn default() -> Self {
        Self::new(HeadlessHost::default())
    }
}

impl Inspector {
    pub fn new(host: impl WidgetHost + Send + Sync + 'static) -> Self {
        Self {
            tree: None,
            host: Box::new(host),
        }
    }

    pub fn tree(&self) -> Option<&EditorTree> {
        self.tree.as_ref()
    }

    pub fn host(&self) -> &(dyn WidgetHost + Send + Sync) {
        &*self.host
    }
}

/// Widget events waiting to be routed on the next update.
#[derive(Resource, Default, Debug)]
pub struct PendingWidgetEvents(pub Vec<WidgetEvent>);

impl PendingWidgetEvents {
    pub fn push(&mut self, event: WidgetEvent) {
        self.0.push(event);
    }
}

fn update_inspector(world: &mut World) {
    world.resource_scope(|world, mut inspector: Mut<Inspector>| {
        world.resource_scope(|world, mut transactions: Mut<Transactions>| {
            let inspector = &mut *inspector;
            let tx = &mut *transactions;

            let targets = world.resource::<Selection>().targets();
            let stale = match &inspector.tree {
                Some(tree) => tree.targets() != targets.as_slice() || tree.is_stale(world),
                None => !targets.is_empty(),
            };
            if stale {
                tx.commit(world);
                if let Some(mut tree) = inspector.tree.take() {
                    tree.teardown(&mut *inspector.host);
                }
                if !targets.is_empty() {
                    inspector.tree = Some(EditorTree::build(
                        world,
                        &targets,
                        world.resource::<EditorRegistry>(),
                        world.resource::<InspectorSettings>(),
                        &mut *inspector.host,
                    ));
                }
            }

            let events = std::mem::take(&mut world.resource_mut::<PendingWidgetEvents>().0);
            let Some(tree) = inspector.tree.as_mut() else {
                if !events.is_empty() {
                    debug!("Dropping {} widget events with nothing inspected", events.len());
                }
                return;
            };
            for event in &events {
                if let Err(err) = tree.handle_event(world, tx, event) {
                    warn!("Inspector edit failed: {err}");
                }
            }

            let report = tree.refresh(world, &mut *inspector.host);
            if !report.faulted.is_empty() {
                debug!("{} inspector node(s) faulted", report.faulted.len());
            }
        });
    });
}
