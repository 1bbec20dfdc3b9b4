use std::any::TypeId;

use bevy::prelude::*;
use jackdaw_widgets::{NumericDrag, NumericInput};

use crate::{
    attributes::FieldAttributes,
    container::ContainerValue,
    error::EditorFault,
    node::{BuildContext, EditAction, EventContext, PropertyEditor, Refresh, RefreshContext},
    settings::InspectorSettings,
    widget::{WidgetDisplay, WidgetEvent, WidgetEventKind, WidgetId, WidgetKind, WidgetValue},
};

use super::{reflect_to_f64, type_name_of};

/// The primitive a numeric field stores.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NumberKind {
    F32,
    F64,
    I8,
    I16,
    I32,
    I64,
    Isize,
    U8,
    U16,
    U32,
    U64,
    Usize,
}

impl NumberKind {
    pub const ALL: [NumberKind; 12] = [
        NumberKind::F32,
        NumberKind::F64,
        NumberKind::I8,
        NumberKind::I16,
        NumberKind::I32,
        NumberKind::I64,
        NumberKind::Isize,
        NumberKind::U8,
        NumberKind::U16,
        NumberKind::U32,
        NumberKind::U64,
        NumberKind::Usize,
    ];

    pub fn type_id(self) -> TypeId {
        match self {
            NumberKind::F32 => TypeId::of::<f32>(),
            NumberKind::F64 => TypeId::of::<f64>(),
            NumberKind::I8 => TypeId::of::<i8>(),
            NumberKind::I16 => TypeId::of::<i16>(),
            NumberKind::I32 => TypeId::of::<i32>(),
            NumberKind::I64 => TypeId::of::<i64>(),
            NumberKind::Isize => TypeId::of::<isize>(),
            NumberKind::U8 => TypeId::of::<u8>(),
            NumberKind::U16 => TypeId::of::<u16>(),
            NumberKind::U32 => TypeId::of::<u32>(),
            NumberKind::U64 => TypeId::of::<u64>(),
            NumberKind::Usize => TypeId::of::<usize>(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            NumberKind::F32 => "f32",
            NumberKind::F64 => "f64",
            NumberKind::I8 => "i8",
            NumberKind::I16 => "i16",
            NumberKind::I32 => "i32",
            NumberKind::I64 => "i64",
            NumberKind::Isize => "isize",
            NumberKind::U8 => "u8",
            NumberKind::U16 => "u16",
            NumberKind::U32 => "u32",
            NumberKind::U64 => "u64",
            NumberKind::Usize => "usize",
        }
    }

    pub fn is_integer(self) -> bool {
        !matches!(self, NumberKind::F32 | NumberKind::F64)
    }

    /// Representable range, used when the field declares none.
    fn bounds(self) -> Option<(f64, f64)> {
        macro_rules! bounds {
            ($ty:ty) => {
                Some((<$ty>::MIN as f64, <$ty>::MAX as f64))
            };
        }
        match self {
            NumberKind::F32 | NumberKind::F64 => None,
            NumberKind::I8 => bounds!(i8),
            NumberKind::I16 => bounds!(i16),
            NumberKind::I32 => bounds!(i32),
            NumberKind::I64 => bounds!(i64),
            NumberKind::Isize => bounds!(isize),
            NumberKind::U8 => bounds!(u8),
            NumberKind::U16 => bounds!(u16),
            NumberKind::U32 => bounds!(u32),
            NumberKind::U64 => bounds!(u64),
            NumberKind::Usize => bounds!(usize),
        }
    }

    /// Box `value` as this primitive. Integer conversion saturates.
    pub fn make(self, value: f64) -> Box<dyn PartialReflect> {
        match self {
            NumberKind::F32 => Box::new(value as f32),
            NumberKind::F64 => Box::new(value),
            NumberKind::I8 => Box::new(value as i8),
            NumberKind::I16 => Box::new(value as i16),
            NumberKind::I32 => Box::new(value as i32),
            NumberKind::I64 => Box::new(value as i64),
            NumberKind::Isize => Box::new(value as isize),
            NumberKind::U8 => Box::new(value as u8),
            NumberKind::U16 => Box::new(value as u16),
            NumberKind::U32 => Box::new(value as u32),
            NumberKind::U64 => Box::new(value as u64),
            NumberKind::Usize => Box::new(value as usize),
        }
    }
}

/// Numeric field with range clamping, typed entry and drag-to-scrub.
#[derive(Debug)]
pub struct NumberEditor {
    kind: NumberKind,
    input: NumericInput,
    drag: Option<NumericDrag>,
    field: Option<WidgetId>,
}

impl NumberEditor {
    pub fn new(kind: NumberKind, attributes: &FieldAttributes, settings: &InspectorSettings) -> Self {
        let mut input = if kind.is_integer() {
            NumericInput::integer(0.0)
        } else {
            NumericInput::new(0.0)
                .with_step(settings.drag_step)
                .with_precision(settings.float_precision)
        };
        if let Some(step) = attributes.step {
            input.step = step;
        }
        if let Some(range) = &attributes.range {
            input.range = Some(range.clone());
        } else if let Some((min, max)) = kind.bounds() {
            input.range = Some(min..=max);
        }
        Self {
            kind,
            input,
            drag: None,
            field: None,
        }
    }

    pub fn kind(&self) -> NumberKind {
        self.kind
    }

    pub fn input(&self) -> &NumericInput {
        &self.input
    }

    fn write(&self, value: f64) -> Box<dyn PartialReflect> {
        self.kind.make(self.input.constrain(value))
    }
}

impl PropertyEditor for NumberEditor {
    fn build(&mut self, cx: &mut BuildContext) {
        self.field = Some(cx.widget(WidgetKind::Numeric(self.input.clone())));
    }

    fn refresh(
        &mut self,
        cx: &mut RefreshContext,
        value: &ContainerValue,
    ) -> Result<Refresh, EditorFault> {
        let mut numbers = value.values().map(|item| {
            reflect_to_f64(item).ok_or_else(|| EditorFault::TypeMismatch {
                expected: self.kind.name(),
                found: type_name_of(item),
            })
        });
        let first = numbers.next().transpose()?;
        for number in numbers {
            number?;
        }

        let display = match (value.is_uniform(), first) {
            (true, Some(number)) => {
                if !cx.is_editing() {
                    self.input.value = number;
                }
                WidgetDisplay::Number(number)
            }
            _ => WidgetDisplay::Mixed,
        };
        if let Some(field) = self.field {
            cx.show(field, display);
        }
        Ok(Refresh::Unchanged)
    }

    fn on_event(&mut self, event: &WidgetEvent, _cx: &EventContext) -> Option<EditAction> {
        match &event.kind {
            WidgetEventKind::Changed(WidgetValue::Number(number)) => {
                let value = self.input.set(*number);
                Some(EditAction::Set(self.write(value)))
            }
            WidgetEventKind::Submitted(text) => match self.input.parse(text) {
                Ok(value) => {
                    self.input.value = value;
                    Some(EditAction::Submit(self.write(value)))
                }
                Err(err) => {
                    debug!("Discarding numeric entry: {err}");
                    Some(EditAction::Revert)
                }
            },
            WidgetEventKind::GestureBegin => Some(EditAction::BeginGesture),
            WidgetEventKind::Scrub {
                screen_x,
                modifiers,
            } => match &mut self.drag {
                None => {
                    self.drag = Some(NumericDrag::start(&self.input, *screen_x));
                    None
                }
                Some(drag) => {
                    let value = drag.update(&mut self.input, *screen_x, *modifiers)?;
                    Some(EditAction::Set(self.write(value)))
                }
            },
            WidgetEventKind::GestureEnd => {
                self.drag = None;
                Some(EditAction::EndGesture)
            }
            WidgetEventKind::GestureCancel => {
                self.drag = None;
                Some(EditAction::CancelGesture)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn make_saturates_integers() {
        let value = NumberKind::U8.make(300.0);
        assert_eq!(value.try_downcast_ref::<u8>(), Some(&255));
        let value = NumberKind::I16.make(-3.7);
        assert_eq!(value.try_downcast_ref::<i16>(), Some(&-3));
    }

    #[test]
    fn attribute_range_and_step_apply() {
        let attributes = FieldAttributes {
            range: Some(0.0..=1.0),
            step: Some(0.25),
            ..default()
        };
        let editor = NumberEditor::new(NumberKind::F32, &attributes, &InspectorSettings::default());
        assert_eq!(editor.input().step, 0.25);
        assert_eq!(editor.write(4.0).try_downcast_ref::<f32>(), Some(&1.0));
    }

    #[test]
    fn integer_fields_clamp_to_their_type() {
        let editor = NumberEditor::new(
            NumberKind::U8,
            &FieldAttributes::default(),
            &InspectorSettings::default(),
        );
        assert_eq!(editor.input().range, Some(0.0..=255.0));
        assert!(editor.input().integer);
    }
}
