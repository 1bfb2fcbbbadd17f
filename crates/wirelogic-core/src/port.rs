//! Typed port payloads
//!
//! A port carries one [`PortValue`] whose variant is fixed by its
//! [`PortType`]. [`Port<T>`] is a typed view over a config entry for the Rust
//! types that implement [`PortData`].

use crate::observable::ObservableValue;
use crate::signal::Connection;
use crate::value::{AttrValue, AttributeBag};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// The value type declared for a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortType {
    Bool,
    Number,
    Byte,
    Vector3,
    String,
}

impl PortType {
    /// Numeric-like types accept `min`/`max`/`step` constraints
    pub fn is_numeric(&self) -> bool {
        matches!(self, PortType::Number | PortType::Byte)
    }

    /// The zero value of this type
    pub fn zero(&self) -> PortValue {
        match self {
            PortType::Bool => PortValue::Bool(false),
            PortType::Number => PortValue::Number(0.0),
            PortType::Byte => PortValue::Byte(0),
            PortType::Vector3 => PortValue::Vector3(Vector3::default()),
            PortType::String => PortValue::String(String::new()),
        }
    }
}

impl fmt::Display for PortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PortType::Bool => "bool",
            PortType::Number => "number",
            PortType::Byte => "byte",
            PortType::Vector3 => "vector3",
            PortType::String => "string",
        };
        write!(f, "{}", name)
    }
}

/// A point or direction in world space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// The payload of one port
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PortValue {
    Bool(bool),
    Number(f64),
    Byte(u8),
    Vector3(Vector3),
    String(String),
}

impl PortValue {
    /// The type this value belongs to
    pub fn port_type(&self) -> PortType {
        match self {
            PortValue::Bool(_) => PortType::Bool,
            PortValue::Number(_) => PortType::Number,
            PortValue::Byte(_) => PortType::Byte,
            PortValue::Vector3(_) => PortType::Vector3,
            PortValue::String(_) => PortType::String,
        }
    }

    /// Numeric view of number and byte values
    pub fn as_number(&self) -> Option<f64> {
        match self {
            PortValue::Number(n) => Some(*n),
            PortValue::Byte(b) => Some(f64::from(*b)),
            _ => None,
        }
    }

    /// Whether every number in this value is finite
    ///
    /// NaN never compares equal to itself, so a port holding one would
    /// report a change on every assignment.
    pub fn is_finite(&self) -> bool {
        match self {
            PortValue::Number(n) => n.is_finite(),
            PortValue::Vector3(v) => v.x.is_finite() && v.y.is_finite() && v.z.is_finite(),
            PortValue::Bool(_) | PortValue::Byte(_) | PortValue::String(_) => true,
        }
    }

    /// Decode a raw attribute as a value of `port_type`
    ///
    /// Returns `None` when the attribute does not have that type or holds a
    /// non-finite number; the caller then falls back to the schema default.
    pub fn from_attr(port_type: PortType, raw: &AttrValue) -> Option<Self> {
        let value = Self::decode(port_type, raw)?;
        value.is_finite().then_some(value)
    }

    fn decode(port_type: PortType, raw: &AttrValue) -> Option<Self> {
        match port_type {
            PortType::Bool => raw.as_bool().map(PortValue::Bool),
            PortType::Number => raw.as_float().map(PortValue::Number),
            PortType::Byte => match raw {
                AttrValue::Int(i) => u8::try_from(*i).ok().map(PortValue::Byte),
                AttrValue::Float(f) if f.fract() == 0.0 && (0.0..=255.0).contains(f) => {
                    Some(PortValue::Byte(*f as u8))
                }
                _ => None,
            },
            PortType::Vector3 => decode_vector3(raw).map(PortValue::Vector3),
            PortType::String => raw.as_str().map(|s| PortValue::String(s.to_string())),
        }
    }

    /// Encode back into a raw attribute (inverse of [`PortValue::from_attr`])
    pub fn to_attr(&self) -> AttrValue {
        match self {
            PortValue::Bool(b) => AttrValue::Bool(*b),
            PortValue::Number(n) => AttrValue::Float(*n),
            PortValue::Byte(b) => AttrValue::Int(i64::from(*b)),
            PortValue::Vector3(v) => AttrValue::List(vec![
                AttrValue::Float(v.x),
                AttrValue::Float(v.y),
                AttrValue::Float(v.z),
            ]),
            PortValue::String(s) => AttrValue::String(s.clone()),
        }
    }
}

fn decode_vector3(raw: &AttrValue) -> Option<Vector3> {
    match raw {
        AttrValue::List(items) => match items.as_slice() {
            [x, y, z] => Some(Vector3::new(x.as_float()?, y.as_float()?, z.as_float()?)),
            _ => None,
        },
        AttrValue::Map(map) => {
            let axis = |bag: &AttributeBag, key: &str| bag.get(key).and_then(AttrValue::as_float);
            Some(Vector3::new(axis(map, "x")?, axis(map, "y")?, axis(map, "z")?))
        }
        _ => None,
    }
}

impl fmt::Display for PortValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortValue::Bool(b) => write!(f, "{}", b),
            PortValue::Number(n) => write!(f, "{}", n),
            PortValue::Byte(b) => write!(f, "{}", b),
            PortValue::Vector3(v) => write!(f, "({}, {}, {})", v.x, v.y, v.z),
            PortValue::String(s) => write!(f, "\"{}\"", s),
        }
    }
}

/// Rust types that can be read from and written to a port
pub trait PortData: Clone + PartialEq + Default + 'static {
    /// The port type carrying this Rust type
    const PORT_TYPE: PortType;

    /// Extract from a port value of the matching variant
    fn from_port(value: &PortValue) -> Option<Self>;

    /// Wrap into a port value
    fn into_port(self) -> PortValue;
}

impl PortData for bool {
    const PORT_TYPE: PortType = PortType::Bool;

    fn from_port(value: &PortValue) -> Option<Self> {
        match value {
            PortValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    fn into_port(self) -> PortValue {
        PortValue::Bool(self)
    }
}

impl PortData for f64 {
    const PORT_TYPE: PortType = PortType::Number;

    fn from_port(value: &PortValue) -> Option<Self> {
        match value {
            PortValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    fn into_port(self) -> PortValue {
        PortValue::Number(self)
    }
}

impl PortData for u8 {
    const PORT_TYPE: PortType = PortType::Byte;

    fn from_port(value: &PortValue) -> Option<Self> {
        match value {
            PortValue::Byte(b) => Some(*b),
            _ => None,
        }
    }

    fn into_port(self) -> PortValue {
        PortValue::Byte(self)
    }
}

impl PortData for Vector3 {
    const PORT_TYPE: PortType = PortType::Vector3;

    fn from_port(value: &PortValue) -> Option<Self> {
        match value {
            PortValue::Vector3(v) => Some(*v),
            _ => None,
        }
    }

    fn into_port(self) -> PortValue {
        PortValue::Vector3(self)
    }
}

impl PortData for String {
    const PORT_TYPE: PortType = PortType::String;

    fn from_port(value: &PortValue) -> Option<Self> {
        match value {
            PortValue::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    fn into_port(self) -> PortValue {
        PortValue::String(self)
    }
}

/// Typed view over one config entry
///
/// Obtained from [`Config::port`](crate::Config::port), which checks that the
/// declared port type matches `T`.
#[derive(Clone)]
pub struct Port<T: PortData> {
    value: ObservableValue<PortValue>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: PortData> Port<T> {
    pub(crate) fn new(value: ObservableValue<PortValue>) -> Self {
        Self {
            value,
            _marker: PhantomData,
        }
    }

    /// Current value
    pub fn get(&self) -> T {
        T::from_port(&self.value.get()).unwrap_or_default()
    }

    /// Assign a value (decorated and change-checked like any observable)
    pub fn set(&self, value: T) {
        self.value.set(value.into_port());
    }

    /// Subscribe with typed `(value, prev)` arguments
    pub fn subscribe(
        &self,
        callback: impl Fn(T, T) + 'static,
        fire_immediately: bool,
    ) -> Connection {
        self.value.subscribe(
            move |value, prev| {
                callback(
                    T::from_port(value).unwrap_or_default(),
                    T::from_port(prev).unwrap_or_default(),
                )
            },
            fire_immediately,
        )
    }

    /// The untyped observable behind this port
    pub fn observable(&self) -> &ObservableValue<PortValue> {
        &self.value
    }
}

impl<T: PortData + fmt::Debug> fmt::Debug for Port<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Port")
            .field("type", &T::PORT_TYPE)
            .field("value", &self.get())
            .finish()
    }
}
