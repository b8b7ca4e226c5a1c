use crate::error::{Error, Result};

use serde::Serialize;

/// Wire formats a datapoint value can take.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
pub enum ValueKind {
    Bool,
    Float,
    Int,
    ShortEnum,
}

impl ValueKind {
    /// Fixed width of the encoded value in bytes.
    pub fn width(self) -> usize {
        match self {
            ValueKind::Bool => 1,
            ValueKind::Float => 4,
            ValueKind::Int => 4,
            ValueKind::ShortEnum => 2,
        }
    }
}

/// A decoded property value. `Raw` holds payloads of datapoints the registry
/// doesn't know the type of.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Float(f32),
    Int(i32),
    ShortEnum(u16),
    Raw(Vec<u8>),
}

impl Value {
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Value::Bool(_) => Some(ValueKind::Bool),
            Value::Float(_) => Some(ValueKind::Float),
            Value::Int(_) => Some(ValueKind::Int),
            Value::ShortEnum(_) => Some(ValueKind::ShortEnum),
            Value::Raw(_) => None,
        }
    }

    /// Encodes in the value's own kind; raw values go out untouched.
    pub fn bytes(&self) -> Vec<u8> {
        match self {
            Value::Bool(b) => vec![u8::from(*b)],
            Value::Float(f) => f.to_le_bytes().to_vec(),
            Value::Int(i) => i.to_le_bytes().to_vec(),
            Value::ShortEnum(e) => e.to_le_bytes().to_vec(),
            Value::Raw(r) => r.clone(),
        }
    }

    /// Converts into `kind`, failing when the value doesn't fit.
    pub fn coerce(&self, kind: ValueKind) -> Result<Value> {
        let out_of_range = || Error::ValueOutOfRange {
            kind,
            value: self.to_string(),
        };

        // no device parameter takes NaN or infinity
        if matches!(self, Value::Float(f) if !f.is_finite()) {
            return Err(out_of_range());
        }
        if self.kind() == Some(kind) {
            return Ok(self.clone());
        }

        match (self, kind) {
            (Value::Raw(raw), _) => decode(kind, raw),
            (Value::Bool(b), ValueKind::Float) => Ok(Value::Float(f32::from(u8::from(*b)))),
            (Value::Bool(b), ValueKind::Int) => Ok(Value::Int(i32::from(*b))),
            (Value::Bool(b), ValueKind::ShortEnum) => Ok(Value::ShortEnum(u16::from(*b))),
            (Value::Int(i), ValueKind::Bool) => match i {
                0 | 1 => Ok(Value::Bool(*i == 1)),
                _ => Err(out_of_range()),
            },
            (Value::Int(i), ValueKind::ShortEnum) => {
                u16::try_from(*i).map(Value::ShortEnum).map_err(|_| out_of_range())
            }
            (Value::Int(i), ValueKind::Float) => Ok(Value::Float(*i as f32)),
            (Value::ShortEnum(e), ValueKind::Bool) => match e {
                0 | 1 => Ok(Value::Bool(*e == 1)),
                _ => Err(out_of_range()),
            },
            (Value::ShortEnum(e), ValueKind::Int) => Ok(Value::Int(i32::from(*e))),
            (Value::ShortEnum(e), ValueKind::Float) => Ok(Value::Float(f32::from(*e))),
            (Value::Float(f), ValueKind::Bool) => {
                if *f == 0.0 || *f == 1.0 {
                    Ok(Value::Bool(*f == 1.0))
                } else {
                    Err(out_of_range())
                }
            }
            (Value::Float(f), ValueKind::Int) => {
                if f.fract() == 0.0 && *f >= i32::MIN as f32 && *f < i32::MAX as f32 {
                    Ok(Value::Int(*f as i32))
                } else {
                    Err(out_of_range())
                }
            }
            (Value::Float(f), ValueKind::ShortEnum) => {
                if f.fract() == 0.0 && *f >= 0.0 && *f <= f32::from(u16::MAX) {
                    Ok(Value::ShortEnum(*f as u16))
                } else {
                    Err(out_of_range())
                }
            }
            // same-kind pairs returned early above
            _ => Ok(self.clone()),
        }
    }

    /// Parses user input (CLI) for a datapoint of the given kind.
    pub fn parse(kind: ValueKind, input: &str) -> Result<Value> {
        let input = input.trim();
        let unparsable = || Error::UnparsableValue {
            kind,
            input: input.to_string(),
        };
        let out_of_range = || Error::ValueOutOfRange {
            kind,
            value: input.to_string(),
        };

        match kind {
            ValueKind::Bool => match input.to_ascii_lowercase().as_str() {
                "1" | "true" | "on" | "yes" => Ok(Value::Bool(true)),
                "0" | "false" | "off" | "no" => Ok(Value::Bool(false)),
                _ => Err(unparsable()),
            },
            ValueKind::Float => {
                let f: f64 = input.parse().map_err(|_| unparsable())?;
                if !f.is_finite() || f.abs() > f64::from(f32::MAX) {
                    return Err(out_of_range());
                }
                Ok(Value::Float(f as f32))
            }
            ValueKind::Int => {
                let i: i64 = input.parse().map_err(|_| unparsable())?;
                i32::try_from(i).map(Value::Int).map_err(|_| out_of_range())
            }
            ValueKind::ShortEnum => {
                let i: i64 = input.parse().map_err(|_| unparsable())?;
                u16::try_from(i)
                    .map(Value::ShortEnum)
                    .map_err(|_| out_of_range())
            }
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::Bool(b) => Some(f32::from(u8::from(*b))),
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f32),
            Value::ShortEnum(e) => Some(f32::from(*e)),
            Value::Raw(_) => None,
        }
    }

    pub fn as_u16(&self) -> Option<u16> {
        match self {
            Value::ShortEnum(e) => Some(*e),
            Value::Int(i) => u16::try_from(*i).ok(),
            Value::Bool(b) => Some(u16::from(*b)),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Float(v) => write!(f, "{}", v),
            Value::Int(i) => write!(f, "{}", i),
            Value::ShortEnum(e) => write!(f, "{}", e),
            Value::Raw(r) => {
                for b in r {
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
        }
    }
}

pub fn encode(kind: ValueKind, value: &Value) -> Result<Vec<u8>> {
    Ok(value.coerce(kind)?.bytes())
}

pub fn decode(kind: ValueKind, input: &[u8]) -> Result<Value> {
    if input.len() != kind.width() {
        return Err(Error::MalformedValue {
            kind,
            expected: kind.width(),
            actual: input.len(),
        });
    }

    let value = match kind {
        ValueKind::Bool => Value::Bool(input[0] != 0),
        ValueKind::Float => Value::Float(f32::from_le_bytes([input[0], input[1], input[2], input[3]])),
        ValueKind::Int => Value::Int(i32::from_le_bytes([input[0], input[1], input[2], input[3]])),
        ValueKind::ShortEnum => Value::ShortEnum(u16::from_le_bytes([input[0], input[1]])),
    };

    Ok(value)
}
