use std::{any::TypeId, num::NonZeroU64};

use bevy::{ecs::reflect::AppTypeRegistry, prelude::*};

use crate::{
    CommandGroup, CommandHistory, EditorCommand, PropertyAccessError, PropertyTarget,
    SetComponentField, modify_property, read_property, values_equal, with_property,
    write_property,
};

/// Identity of one continuous interaction (a drag, a live-typing session).
///
/// Tokens are handed out by [`Transactions::new_token`] and never reused, so two
/// gestures only coalesce when they carry the very same token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EditToken(NonZeroU64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TransactionId(u64);

#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    #[error("transaction '{0}' is still open")]
    AlreadyOpen(String),
    #[error("no transaction is open")]
    NotOpen,
    #[error(transparent)]
    Access(#[from] PropertyAccessError),
}

struct OpenTransaction {
    id: TransactionId,
    label: String,
    token: Option<EditToken>,
    snapshots: Vec<(PropertyTarget, Box<dyn PartialReflect>)>,
}

/// Groups property writes into reversible history entries.
///
/// A coordinator built with [`Transactions::disabled`] keeps no history: writes
/// still go through, but `begin`/`commit` never snapshot or record anything.
#[derive(Resource)]
pub struct Transactions {
    history: Option<CommandHistory>,
    open: Option<OpenTransaction>,
    next_id: u64,
    next_token: u64,
}

impl Default for Transactions {
    fn default() -> Self {
        Self::enabled()
    }
}

impl Transactions {
    pub fn enabled() -> Self {
        Self::with_history(CommandHistory::default())
    }

    pub fn disabled() -> Self {
        Self {
            history: None,
            open: None,
            next_id: 0,
            next_token: 0,
        }
    }

    pub fn with_history(history: CommandHistory) -> Self {
        Self {
            history: Some(history),
            ..Self::disabled()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.history.is_some()
    }

    pub fn history(&self) -> Option<&CommandHistory> {
        self.history.as_ref()
    }

    /// A fresh token, distinct from every token handed out before.
    pub fn new_token(&mut self) -> EditToken {
        self.next_token += 1;
        EditToken(NonZeroU64::MIN.saturating_add(self.next_token - 1))
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    pub fn open_id(&self) -> Option<TransactionId> {
        self.open.as_ref().map(|open| open.id)
    }

    /// Token of the open transaction, if it belongs to a gesture.
    pub fn open_token(&self) -> Option<EditToken> {
        self.open.as_ref().and_then(|open| open.token)
    }

    /// Snapshot `targets` and open a transaction over them.
    ///
    /// Returns `None` when the coordinator is disabled.
    pub fn begin(
        &mut self,
        world: &World,
        targets: impl IntoIterator<Item = PropertyTarget>,
        label: impl Into<String>,
        token: Option<EditToken>,
    ) -> Result<Option<TransactionId>, TransactionError> {
        if let Some(open) = &self.open {
            return Err(TransactionError::AlreadyOpen(open.label.clone()));
        }
        if !self.is_enabled() {
            return Ok(None);
        }

        self.next_id += 1;
        let id = TransactionId(self.next_id);
        self.open = Some(OpenTransaction {
            id,
            label: label.into(),
            token,
            snapshots: Vec::new(),
        });
        if let Err(err) = self.include(world, targets) {
            self.open = None;
            return Err(err);
        }
        Ok(Some(id))
    }

    /// Add targets to the open transaction; already-snapshotted targets keep
    /// their original snapshot.
    pub fn include(
        &mut self,
        world: &World,
        targets: impl IntoIterator<Item = PropertyTarget>,
    ) -> Result<(), TransactionError> {
        let Some(open) = &mut self.open else {
            return Ok(());
        };
        let registry = world.resource::<AppTypeRegistry>().clone();
        let registry = registry.read();
        for target in targets {
            if open.snapshots.iter().any(|(known, _)| *known == target) {
                continue;
            }
            let before = read_property(world, &registry, &target)?;
            open.snapshots.push((target, before));
        }
        Ok(())
    }

    /// Close the open transaction and record one history entry for it.
    ///
    /// Targets whose value did not change are left out of the entry; a
    /// transaction that changed nothing records nothing. Returns whether an
    /// entry was recorded.
    pub fn commit(&mut self, world: &World) -> bool {
        let Some(open) = self.open.take() else {
            return false;
        };
        let Some(history) = &mut self.history else {
            return false;
        };
        let registry = world.resource::<AppTypeRegistry>().clone();
        let registry = registry.read();

        let mut commands: Vec<Box<dyn EditorCommand>> = Vec::new();
        for (target, old_value) in open.snapshots {
            let new_value = match read_property(world, &registry, &target) {
                Ok(value) => value,
                Err(err) => {
                    warn!("Dropping '{}' from '{}': {err}", target.field_path, open.label);
                    continue;
                }
            };
            if values_equal(&*old_value, &*new_value) {
                continue;
            }
            commands.push(Box::new(SetComponentField {
                target,
                old_value,
                new_value,
            }));
        }

        if commands.is_empty() {
            debug!("Transaction '{}' changed nothing", open.label);
            return false;
        }
        let command: Box<dyn EditorCommand> = if commands.len() == 1 {
            commands.remove(0)
        } else {
            Box::new(CommandGroup {
                label: open.label,
                commands,
            })
        };
        history.record(command);
        true
    }

    /// Close the open transaction, restoring every snapshotted target.
    ///
    /// A target that can no longer be written does not stop the others from
    /// being restored; the first such failure is returned afterwards.
    pub fn cancel(&mut self, world: &mut World) -> Result<(), TransactionError> {
        let Some(open) = self.open.take() else {
            return Err(TransactionError::NotOpen);
        };
        let registry = world.resource::<AppTypeRegistry>().clone();
        let registry = registry.read();
        let mut failure = None;
        for (target, before) in open.snapshots.iter().rev() {
            if let Err(err) = write_property(world, &registry, target, &**before) {
                warn!("Could not restore '{}' while cancelling '{}': {err}", target.field_path, open.label);
                failure.get_or_insert(err);
            }
        }
        match failure {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    pub fn undo(&mut self, world: &mut World) -> bool {
        self.commit(world);
        self.history
            .as_mut()
            .is_some_and(|history| history.undo(world))
    }

    pub fn redo(&mut self, world: &mut World) -> bool {
        self.commit(world);
        self.history
            .as_mut()
            .is_some_and(|history| history.redo(world))
    }

    /// Apply `mutate` to one property on `primary` and on every dependent
    /// returned by `dependents`, recording a single entry for all of them.
    ///
    /// Every target is resolved before the first mutation so a missing
    /// dependent aborts the edit without touching anything. Returns the number
    /// of mutated targets.
    pub fn apply_cascading(
        &mut self,
        world: &mut World,
        label: &str,
        component_type_id: TypeId,
        field_path: &str,
        primary: Entity,
        dependents: impl FnOnce(&World, Entity) -> Vec<Entity>,
        mut mutate: impl FnMut(&mut dyn PartialReflect),
    ) -> Result<usize, TransactionError> {
        if self.is_open() {
            self.commit(world);
        }

        let mut entities = vec![primary];
        for entity in dependents(world, primary) {
            if !entities.contains(&entity) {
                entities.push(entity);
            }
        }
        let targets: Vec<PropertyTarget> = entities
            .into_iter()
            .map(|entity| PropertyTarget::new(entity, component_type_id, field_path))
            .collect();

        let registry = world.resource::<AppTypeRegistry>().clone();
        let registry = registry.read();
        for target in &targets {
            with_property(world, &registry, target, |_| ())?;
        }

        self.begin(world, targets.iter().cloned(), label, None)?;
        for target in &targets {
            if let Err(err) = modify_property(world, &registry, target, &mut mutate) {
                drop(registry);
                if self.is_open() {
                    self.cancel(world)?;
                }
                return Err(err.into());
            }
        }
        drop(registry);
        self.commit(world);
        Ok(targets.len())
    }
}
