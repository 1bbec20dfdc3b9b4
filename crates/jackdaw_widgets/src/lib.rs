//! Headless widget models shared by the inspector's editors.

pub mod numeric_input;

pub use numeric_input::{DragModifiers, NumericDrag, NumericInput, NumericParseError};
