use std::ops::RangeInclusive;

/// Drag movement below this many pixels is ignored.
const DRAG_DEAD_ZONE: f32 = 0.1;

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum NumericParseError {
    #[error("'{0}' is not a number")]
    NotANumber(String),
    #[error("'{0}' is not a whole number")]
    NotAnInteger(String),
}

/// Headless state of a numeric field: the value being shown plus how it is
/// stepped, rounded and clamped.
#[derive(Clone, Debug, PartialEq)]
pub struct NumericInput {
    pub value: f64,
    pub step: f64,
    pub precision: usize,
    pub range: Option<RangeInclusive<f64>>,
    pub integer: bool,
}

impl NumericInput {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            step: 0.01,
            precision: 3,
            range: None,
            integer: false,
        }
    }

    /// A whole-number field, stepping by one.
    pub fn integer(value: f64) -> Self {
        Self {
            step: 1.0,
            precision: 0,
            integer: true,
            ..Self::new(value)
        }
    }

    pub fn with_step(mut self, step: f64) -> Self {
        self.step = step;
        self
    }

    pub fn with_precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_range(mut self, range: RangeInclusive<f64>) -> Self {
        self.range = Some(range);
        self
    }

    pub fn formatted(&self) -> String {
        if self.integer {
            return format!("{}", self.value.round());
        }
        format!("{:.prec$}", self.value, prec = self.precision)
    }

    /// Round and clamp `value` the way this field stores it.
    pub fn constrain(&self, value: f64) -> f64 {
        let value = if self.integer { value.round() } else { value };
        match &self.range {
            Some(range) => value.clamp(*range.start(), *range.end()),
            None => value,
        }
    }

    /// Parse typed text into a constrained value without changing the field.
    pub fn parse(&self, text: &str) -> Result<f64, NumericParseError> {
        let trimmed = text.trim();
        let value: f64 = trimmed
            .parse()
            .map_err(|_| NumericParseError::NotANumber(trimmed.to_string()))?;
        if !value.is_finite() {
            return Err(NumericParseError::NotANumber(trimmed.to_string()));
        }
        if self.integer && value.fract() != 0.0 {
            return Err(NumericParseError::NotAnInteger(trimmed.to_string()));
        }
        Ok(self.constrain(value))
    }

    pub fn set(&mut self, value: f64) -> f64 {
        self.value = self.constrain(value);
        self.value
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DragModifiers {
    /// Fine adjustment (Shift).
    pub fine: bool,
    /// Coarse adjustment (Ctrl).
    pub coarse: bool,
}

/// Tracks one drag-to-scrub gesture over a numeric field.
#[derive(Clone, Debug, PartialEq)]
pub struct NumericDrag {
    pub last_screen_x: f32,
    /// Unconstrained value, so integer fields still move on slow drags.
    accumulated: f64,
}

impl NumericDrag {
    pub fn start(input: &NumericInput, screen_x: f32) -> Self {
        Self {
            last_screen_x: screen_x,
            accumulated: input.value,
        }
    }

    /// Advance the drag to `screen_x`, returning the new field value when it
    /// moved.
    pub fn update(
        &mut self,
        input: &mut NumericInput,
        screen_x: f32,
        modifiers: DragModifiers,
    ) -> Option<f64> {
        let delta_x = screen_x - self.last_screen_x;
        self.last_screen_x = screen_x;
        if delta_x.abs() < DRAG_DEAD_ZONE {
            return None;
        }

        let mut sensitivity = input.step;
        if modifiers.fine {
            sensitivity *= 0.1;
        }
        if modifiers.coarse {
            sensitivity *= 10.0;
        }
        self.accumulated += f64::from(delta_x) * sensitivity;

        let previous = input.value;
        let value = input.set(self.accumulated);
        (value != previous).then_some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_precision() {
        assert_eq!(NumericInput::new(1.23456).formatted(), "1.235");
        assert_eq!(NumericInput::integer(4.0).formatted(), "4");
    }

    #[test]
    fn parse_clamps_to_range() {
        let input = NumericInput::new(0.0).with_range(0.0..=10.0);
        assert_eq!(input.parse(" 42 "), Ok(10.0));
        assert_eq!(input.parse("-3"), Ok(0.0));
    }

    #[test]
    fn parse_rejects_garbage() {
        let input = NumericInput::new(0.0);
        assert!(matches!(input.parse("abc"), Err(NumericParseError::NotANumber(_))));
        assert!(matches!(input.parse("NaN"), Err(NumericParseError::NotANumber(_))));
        assert!(matches!(
            NumericInput::integer(0.0).parse("1.5"),
            Err(NumericParseError::NotAnInteger(_))
        ));
    }

    #[test]
    fn drag_respects_modifiers_and_dead_zone() {
        let mut input = NumericInput::new(0.0).with_step(1.0);
        let mut drag = NumericDrag::start(&input, 100.0);

        assert_eq!(drag.update(&mut input, 100.0625, DragModifiers::default()), None);
        assert_eq!(drag.update(&mut input, 110.0625, DragModifiers::default()), Some(10.0));

        let fine = DragModifiers {
            fine: true,
            coarse: false,
        };
        let value = drag.update(&mut input, 120.0625, fine).unwrap();
        assert!((value - 11.0).abs() < 1e-6);
    }

    #[test]
    fn integer_drag_accumulates_small_moves() {
        let mut input = NumericInput::integer(0.0).with_step(0.25);
        let mut drag = NumericDrag::start(&input, 0.0);
        assert_eq!(drag.update(&mut input, 1.0, DragModifiers::default()), None);
        assert_eq!(drag.update(&mut input, 2.0, DragModifiers::default()), Some(1.0));
    }
}
