//! Field metadata read from reflected custom attributes.
//!
//! Attach these to fields with `#[reflect(@...)]`:
//!
//! ```ignore
//! #[derive(Component, Reflect)]
//! #[reflect(Component)]
//! struct Light {
//!     #[reflect(@Limit::new(0.0, 10.0).with_step(0.1), @Category::new("Output"))]
//!     intensity: f32,
//!     #[reflect(@0.0..=1.0_f32)]
//!     falloff: f32,
//!     #[reflect(@NoNullItems)]
//!     layers: Vec<Option<u8>>,
//! }
//! ```

use std::ops::RangeInclusive;

use bevy::{prelude::*, reflect::attributes::CustomAttributes};

/// Numeric limits for a field.
#[derive(Reflect, Clone, Copy, Debug, PartialEq)]
pub struct Limit {
    pub min: f64,
    pub max: f64,
    /// Drag/step increment; zero uses the inspector default.
    pub step: f64,
}

impl Limit {
    pub const fn new(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            step: 0.0,
        }
    }

    pub const fn with_step(mut self, step: f64) -> Self {
        self.step = step;
        self
    }
}

/// Display category for a field or component.
#[derive(Reflect, Clone, Debug, PartialEq, Eq)]
pub struct Category(pub String);

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

/// The field is shown but never written by the inspector.
#[derive(Reflect, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReadOnly;

/// Growing the list clones the last element instead of inserting an empty slot.
#[derive(Reflect, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NoNullItems;

/// Immutable metadata bound to a value container.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldAttributes {
    pub range: Option<RangeInclusive<f64>>,
    pub step: Option<f64>,
    pub category: Option<String>,
    pub read_only: bool,
    pub no_null_items: bool,
}

impl FieldAttributes {
    pub fn from_custom(attributes: &CustomAttributes) -> Self {
        let mut out = Self::default();

        if let Some(limit) = attributes.get::<Limit>() {
            out.range = Some(limit.min..=limit.max);
            if limit.step > 0.0 {
                out.step = Some(limit.step);
            }
        } else if let Some(range) = attributes.get::<RangeInclusive<f32>>() {
            out.range = Some(f64::from(*range.start())..=f64::from(*range.end()));
        } else if let Some(range) = attributes.get::<RangeInclusive<f64>>() {
            out.range = Some(range.clone());
        }

        out.category = attributes.get::<Category>().map(|category| category.0.clone());
        out.read_only = attributes.contains::<ReadOnly>();
        out.no_null_items = attributes.contains::<NoNullItems>();
        out
    }

    /// Attributes a nested field picks up from its parent.
    pub fn inherit(mut self, parent: &FieldAttributes) -> Self {
        self.read_only |= parent.read_only;
        if self.category.is_none() {
            self.category = parent.category.clone();
        }
        self
    }
}
