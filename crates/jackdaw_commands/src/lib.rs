mod property;
mod transaction;

pub use property::{
    PropertyAccessError, PropertyTarget, assign_value, descendants, modify_property,
    read_property, snapshot_value, values_equal, with_property, write_all, write_property,
};
pub use transaction::{EditToken, TransactionError, TransactionId, Transactions};

use bevy::{ecs::reflect::AppTypeRegistry, prelude::*};

// ---------------------------------------------------------------------------
// EditorCommand trait
// ---------------------------------------------------------------------------

pub trait EditorCommand: Send + Sync + 'static {
    fn execute(&self, world: &mut World);
    fn undo(&self, world: &mut World);
    fn description(&self) -> &str;

    /// Entities this command touches.
    fn targets(&self) -> Vec<Entity> {
        Vec::new()
    }
}

// ---------------------------------------------------------------------------
// CommandHistory
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct CommandHistory {
    pub undo_stack: Vec<Box<dyn EditorCommand>>,
    pub redo_stack: Vec<Box<dyn EditorCommand>>,
    /// Oldest entries are dropped past this many; `None` keeps everything.
    pub limit: Option<usize>,
}

impl CommandHistory {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Default::default()
        }
    }

    pub fn execute(&mut self, command: Box<dyn EditorCommand>, world: &mut World) {
        command.execute(world);
        self.record(command);
    }

    /// Push a command whose effects are already applied to the world.
    pub fn record(&mut self, command: Box<dyn EditorCommand>) {
        self.undo_stack.push(command);
        self.redo_stack.clear();
        if let Some(limit) = self.limit {
            let excess = self.undo_stack.len().saturating_sub(limit);
            self.undo_stack.drain(..excess);
        }
    }

    pub fn undo(&mut self, world: &mut World) -> bool {
        let Some(command) = self.undo_stack.pop() else {
            return false;
        };
        command.undo(world);
        self.redo_stack.push(command);
        true
    }

    pub fn redo(&mut self, world: &mut World) -> bool {
        let Some(command) = self.redo_stack.pop() else {
            return false;
        };
        command.execute(world);
        self.undo_stack.push(command);
        true
    }

    pub fn last(&self) -> Option<&dyn EditorCommand> {
        self.undo_stack.last().map(|command| command.as_ref())
    }
}

// ---------------------------------------------------------------------------
// CommandGroup: atomic multi-step command
// ---------------------------------------------------------------------------

pub struct CommandGroup {
    pub commands: Vec<Box<dyn EditorCommand>>,
    pub label: String,
}

impl EditorCommand for CommandGroup {
    fn execute(&self, world: &mut World) {
        for cmd in &self.commands {
            cmd.execute(world);
        }
    }

    fn undo(&self, world: &mut World) {
        for cmd in self.commands.iter().rev() {
            cmd.undo(world);
        }
    }

    fn description(&self) -> &str {
        &self.label
    }

    fn targets(&self) -> Vec<Entity> {
        let mut targets = Vec::new();
        for cmd in &self.commands {
            for entity in cmd.targets() {
                if !targets.contains(&entity) {
                    targets.push(entity);
                }
            }
        }
        targets
    }
}

// ---------------------------------------------------------------------------
// SetComponentField
// ---------------------------------------------------------------------------

pub struct SetComponentField {
    pub target: PropertyTarget,
    pub old_value: Box<dyn PartialReflect>,
    pub new_value: Box<dyn PartialReflect>,
}

impl SetComponentField {
    fn apply(&self, world: &mut World, value: &dyn PartialReflect) {
        let registry = world.resource::<AppTypeRegistry>().clone();
        let registry = registry.read();
        if let Err(err) = write_property(world, &registry, &self.target, value) {
            warn!("Failed to restore '{}': {err}", self.target.field_path);
        }
    }
}

impl EditorCommand for SetComponentField {
    fn execute(&self, world: &mut World) {
        self.apply(world, &*self.new_value);
    }

    fn undo(&self, world: &mut World) {
        self.apply(world, &*self.old_value);
    }

    fn description(&self) -> &str {
        "Set component field"
    }

    fn targets(&self) -> Vec<Entity> {
        vec![self.target.entity]
    }
}
