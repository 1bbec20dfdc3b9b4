//! Reflection-driven property inspector.
//!
//! One [`EditorTree`] edits the same properties across every selected
//! entity: each property is bound through a [`ValueContainer`] that reports
//! uniform or mixed values, presented by an [`EditorNode`] and written back
//! through [`Transactions`] so continuous edits land as one undo entry.

pub mod attributes;
pub mod collection;
pub mod container;
pub mod editors;
pub mod error;
pub mod node;
pub mod plugin;
pub mod registry;
pub mod selection;
pub mod settings;
pub mod tree;
pub mod widget;

pub use attributes::{Category, FieldAttributes, Limit, NoNullItems, ReadOnly};
pub use collection::{CollectionEditor, CollectionState, ElementSemantics, ResizePlan};
pub use container::{ContainerValue, PathSegment, ValueContainer};
pub use error::{CollectionError, EditorFault, NodeError};
pub use jackdaw_commands::{
    CommandHistory, EditToken, EditorCommand, PropertyAccessError, PropertyTarget,
    TransactionError, Transactions, descendants,
};
pub use node::{
    BuildContext, ChildConfig, EditAction, EditorNode, EventContext, NodeId, NodeState,
    PropertyEditor, Refresh, RefreshContext,
};
pub use plugin::{Inspector, InspectorPlugin, PendingWidgetEvents};
pub use registry::{EditorFactory, EditorRegistry, EditorRequest};
pub use selection::{Selected, Selection, SelectionPlugin};
pub use settings::InspectorSettings;
pub use tree::{
    ComponentEntry, EditorTree, RebuiltNode, RefreshReport, ResizeOutcome, shared_components,
};
pub use widget::{
    HeadlessHost, HeadlessWidget, WidgetDisplay, WidgetEvent, WidgetEventKind, WidgetHost,
    WidgetId, WidgetKind, WidgetRequest, WidgetValue,
};

/// Errors raised while reading a property from its targets.
pub type ReadError = PropertyAccessError;
/// Errors raised while writing a property to its targets.
pub type WriteError = PropertyAccessError;
