//! Loosely-typed overlay parameters.
//!
//! Clients send overlay parameters as JSON arrays such as
//! `["Hello", "DejaVuSans.ttf", 32, [10, 20], [255, 255, 255]]`. Each array is
//! read into a `Vec<SpecValue>` and then checked position by position; the
//! first violated constraint is reported.

use image::Rgb;
use serde::{Deserialize, Serialize};

use crate::error::OverlayError;

/// A single parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpecValue {
    Integer(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    List(Vec<SpecValue>),
}

impl SpecValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            SpecValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Integers and floats both count as numbers
    pub fn as_number(&self) -> Option<f64> {
        match self {
            SpecValue::Integer(i) => Some(*i as f64),
            SpecValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SpecValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[SpecValue]> {
        match self {
            SpecValue::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<i64> for SpecValue {
    fn from(value: i64) -> Self {
        SpecValue::Integer(value)
    }
}

impl From<i32> for SpecValue {
    fn from(value: i32) -> Self {
        SpecValue::Integer(value as i64)
    }
}

impl From<f64> for SpecValue {
    fn from(value: f64) -> Self {
        SpecValue::Float(value)
    }
}

impl From<bool> for SpecValue {
    fn from(value: bool) -> Self {
        SpecValue::Bool(value)
    }
}

impl From<&str> for SpecValue {
    fn from(value: &str) -> Self {
        SpecValue::Text(value.to_string())
    }
}

impl From<String> for SpecValue {
    fn from(value: String) -> Self {
        SpecValue::Text(value)
    }
}

impl<T: Into<SpecValue>> From<Vec<T>> for SpecValue {
    fn from(values: Vec<T>) -> Self {
        SpecValue::List(values.into_iter().map(Into::into).collect())
    }
}

/// Parse a JSON array of parameters
pub fn parse_specs(json: &str) -> Result<Vec<SpecValue>, OverlayError> {
    serde_json::from_str(json).map_err(|e| OverlayError::Malformed {
        reason: e.to_string(),
    })
}

/// Parameters of a text overlay:
/// `[text, font, size, [x, y], [r, g, b]]`
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpec {
    pub text: String,
    pub font: String,
    pub size: u32,
    pub offset: (i32, i32),
    pub color: Rgb<u8>,
}

impl TextSpec {
    pub const ARITY: usize = 5;

    pub fn from_values(specs: &[SpecValue]) -> Result<Self, OverlayError> {
        expect_arity(specs, Self::ARITY)?;

        let text = text_field(&specs[0], "text")?;
        let font = text_field(&specs[1], "font")?;

        let size = int_field(&specs[2], "size")?;
        if size <= 0 || size > u32::MAX as i64 {
            return Err(out_of_range("size", size));
        }

        let offset = position_field(&specs[3], "offset")?;
        let color = color_field(&specs[4], "color")?;

        Ok(Self {
            text,
            font,
            size: size as u32,
            offset,
            color,
        })
    }
}

/// Where and how strongly an image is stamped onto another:
/// `[[x, y], size, opacity]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementSpec {
    pub position: (i32, i32),
    pub size: f64,
    pub opacity: f64,
}

impl PlacementSpec {
    pub const ARITY: usize = 3;

    pub fn from_values(specs: &[SpecValue]) -> Result<Self, OverlayError> {
        expect_arity(specs, Self::ARITY)?;

        let size = number_field(&specs[1], "size")?;
        let opacity = number_field(&specs[2], "opacity")?;
        let position = position_field(&specs[0], "position")?;

        if !(0.0..=1.0).contains(&size) {
            return Err(out_of_range("size", size));
        }
        if !(0.0..=1.0).contains(&opacity) {
            return Err(out_of_range("opacity", opacity));
        }

        Ok(Self {
            position,
            size,
            opacity,
        })
    }
}

/// Parameters of an emoji stamp: `[file, [x, y], size, opacity]`
#[derive(Debug, Clone, PartialEq)]
pub struct EmojiSpec {
    pub file: String,
    pub placement: PlacementSpec,
}

impl EmojiSpec {
    pub const ARITY: usize = 4;

    /// Check the emoji file name; the placement is read by
    /// [`placement`](Self::placement) once the file is known to exist
    pub fn file_from_values(specs: &[SpecValue]) -> Result<String, OverlayError> {
        expect_arity(specs, Self::ARITY)?;

        let file = text_field(&specs[0], "file")?;
        if !file.ends_with(".png") {
            return Err(OverlayError::WrongType {
                field: "file".to_string(),
                expected: "a .png file name".to_string(),
            });
        }
        if file.contains(['/', '\\']) || file.starts_with("..") {
            return Err(out_of_range("file", &file));
        }

        Ok(file)
    }

    pub fn placement(specs: &[SpecValue]) -> Result<PlacementSpec, OverlayError> {
        expect_arity(specs, Self::ARITY)?;
        PlacementSpec::from_values(&specs[1..])
    }

    pub fn from_values(specs: &[SpecValue]) -> Result<Self, OverlayError> {
        Ok(Self {
            file: Self::file_from_values(specs)?,
            placement: Self::placement(specs)?,
        })
    }
}

fn expect_arity(specs: &[SpecValue], expected: usize) -> Result<(), OverlayError> {
    if specs.len() != expected {
        return Err(OverlayError::WrongArity {
            expected,
            found: specs.len(),
        });
    }
    Ok(())
}

fn wrong_type(field: &str, expected: &str) -> OverlayError {
    OverlayError::WrongType {
        field: field.to_string(),
        expected: expected.to_string(),
    }
}

fn out_of_range<V: ToString>(field: &str, value: V) -> OverlayError {
    OverlayError::OutOfRange {
        field: field.to_string(),
        value: value.to_string(),
    }
}

fn text_field(value: &SpecValue, field: &str) -> Result<String, OverlayError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| wrong_type(field, "a string"))
}

fn int_field(value: &SpecValue, field: &str) -> Result<i64, OverlayError> {
    value.as_int().ok_or_else(|| wrong_type(field, "an integer"))
}

fn number_field(value: &SpecValue, field: &str) -> Result<f64, OverlayError> {
    value.as_number().ok_or_else(|| wrong_type(field, "a number"))
}

fn position_field(value: &SpecValue, field: &str) -> Result<(i32, i32), OverlayError> {
    let items = value
        .as_list()
        .ok_or_else(|| wrong_type(field, "a list [x, y]"))?;
    if items.len() != 2 {
        return Err(wrong_type(field, "a list [x, y]"));
    }

    let coordinate = |item: &SpecValue| -> Result<i32, OverlayError> {
        let v = item
            .as_int()
            .ok_or_else(|| wrong_type(field, "a list of two integers"))?;
        i32::try_from(v).map_err(|_| out_of_range(field, v))
    };

    Ok((coordinate(&items[0])?, coordinate(&items[1])?))
}

fn color_field(value: &SpecValue, field: &str) -> Result<Rgb<u8>, OverlayError> {
    let items = value
        .as_list()
        .ok_or_else(|| wrong_type(field, "a list [r, g, b]"))?;
    if items.len() != 3 {
        return Err(wrong_type(field, "a list [r, g, b]"));
    }

    let mut channels = [0u8; 3];
    for (channel, item) in channels.iter_mut().zip(items) {
        let v = item
            .as_int()
            .ok_or_else(|| wrong_type(field, "a list of three integers"))?;
        *channel = u8::try_from(v).map_err(|_| out_of_range(field, v))?;
    }

    Ok(Rgb(channels))
}
