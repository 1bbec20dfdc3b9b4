//! Concrete editors. Each one is a thin consumer of the node contract.

mod composite;
mod enums;
mod number;
mod read_only;
mod text;
mod toggle;

pub use composite::CompositeEditor;
pub use enums::{EnumEditor, build_dynamic_variant};
pub use number::{NumberEditor, NumberKind};
pub use read_only::ReadOnlyEditor;
pub use text::TextEditor;
pub use toggle::BoolEditor;

use bevy::prelude::*;

use crate::error::EditorFault;

/// Readable name of a value's type, for fault messages.
pub(crate) fn type_name_of(value: &dyn PartialReflect) -> String {
    match value.get_represented_type_info() {
        Some(info) => info.type_path_table().short_path().to_string(),
        None => value.reflect_type_path().to_string(),
    }
}

pub(crate) fn mismatch(expected: &'static str, value: &dyn PartialReflect) -> EditorFault {
    EditorFault::TypeMismatch {
        expected,
        found: type_name_of(value),
    }
}

/// Widen any primitive number to `f64`.
pub fn reflect_to_f64(value: &dyn PartialReflect) -> Option<f64> {
    macro_rules! widen {
        ($($ty:ty),*) => {
            $(
                if let Some(&v) = value.try_downcast_ref::<$ty>() {
                    return Some(v as f64);
                }
            )*
        };
    }
    widen!(f32, f64, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
    None
}

/// Short display string for any reflected value.
pub fn format_value(value: &dyn PartialReflect, precision: usize) -> String {
    if let Some(v) = value.try_downcast_ref::<f32>() {
        return format!("{v:.precision$}");
    }
    if let Some(v) = value.try_downcast_ref::<f64>() {
        return format!("{v:.precision$}");
    }
    if let Some(v) = reflect_to_f64(value) {
        return format!("{v}");
    }
    if let Some(v) = value.try_downcast_ref::<bool>() {
        return format!("{v}");
    }
    if let Some(v) = value.try_downcast_ref::<String>() {
        return format!("\"{v}\"");
    }
    if let bevy::reflect::ReflectRef::Enum(value) = value.reflect_ref() {
        return value.variant_name().to_string();
    }
    if let Some(info) = value.get_represented_type_info() {
        return format!("<{}>", info.type_path_table().short_path());
    }
    format!("{value:?}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widens_every_primitive() {
        assert_eq!(reflect_to_f64(&3_u8), Some(3.0));
        assert_eq!(reflect_to_f64(&-2_i64), Some(-2.0));
        assert_eq!(reflect_to_f64(&0.5_f32), Some(0.5));
        assert_eq!(reflect_to_f64(&String::from("1")), None);
    }

    #[test]
    fn formats_values() {
        assert_eq!(format_value(&1.23456_f32, 2), "1.23");
        assert_eq!(format_value(&7_u16, 2), "7");
        assert_eq!(format_value(&true, 2), "true");
        assert_eq!(format_value(&String::from("hi"), 2), "\"hi\"");
        assert_eq!(format_value(&Some(1_u8), 2), "Some");
    }
}
