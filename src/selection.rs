use bevy::prelude::*;

/// Keeps [`Selection`] in step with the [`Selected`] markers.
pub struct SelectionPlugin;

impl Plugin for SelectionPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Selection>()
            .add_observer(on_selected_added)
            .add_observer(on_selected_removed);
    }
}

/// Marker component placed on selected entities. Multiple entities can have this.
#[derive(Component)]
pub struct Selected;

/// The entities the inspector edits.
#[derive(Resource, Default, Debug)]
pub struct Selection {
    /// Selected entities in the order they were marked. The last one is the
    /// primary selection.
    pub entities: Vec<Entity>,
}

impl Selection {
    pub fn primary(&self) -> Option<Entity> {
        self.entities.last().copied()
    }

    /// Inspector targets: the primary first, then the rest in selection order.
    pub fn targets(&self) -> Vec<Entity> {
        let Some((&primary, rest)) = self.entities.split_last() else {
            return Vec::new();
        };
        std::iter::once(primary).chain(rest.iter().copied()).collect()
    }
}

fn on_selected_added(trigger: On<Add, Selected>, mut selection: ResMut<Selection>) {
    let entity = trigger.event_target();
    if !selection.entities.contains(&entity) {
        selection.entities.push(entity);
    }
}

/// Covers both deselection and despawning a selected entity.
fn on_selected_removed(trigger: On<Remove, Selected>, mut selection: ResMut<Selection>) {
    let entity = trigger.event_target();
    selection.entities.retain(|&e| e != entity);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_leads_the_targets() {
        let mut world = World::new();
        let a = world.spawn_empty().id();
        let b = world.spawn_empty().id();
        let c = world.spawn_empty().id();
        let selection = Selection {
            entities: vec![a, b, c],
        };
        assert_eq!(selection.primary(), Some(c));
        assert_eq!(selection.targets(), vec![c, a, b]);
        assert!(Selection::default().targets().is_empty());
    }

    #[test]
    fn markers_drive_the_selection() {
        let mut app = App::new();
        app.add_plugins(SelectionPlugin);
        let a = app.world_mut().spawn(Selected).id();
        let b = app.world_mut().spawn(Selected).id();
        assert_eq!(app.world().resource::<Selection>().entities, vec![a, b]);

        app.world_mut().entity_mut(a).remove::<Selected>();
        assert_eq!(app.world().resource::<Selection>().primary(), Some(b));

        app.world_mut().despawn(b);
        assert!(app.world().resource::<Selection>().entities.is_empty());
    }
}
