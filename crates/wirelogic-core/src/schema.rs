//! Port schema definitions
//!
//! A [`BlockSchema`] declares the input and output ports of one block kind.
//! Each [`PortDescriptor`] names the value type, the default, and for
//! numeric-like ports optional `min`/`max`/`step` constraints.
//!
//! RON spelling of a schema:
//!
//! ```text
//! (
//!     input: {
//!         "x": (type: Number, default: Number(0.0), min: Some(0.0), max: Some(10.0), step: Some(1.0)),
//!     },
//!     output: {
//!         "result": (type: Bool, default: Bool(false)),
//!     },
//! )
//! ```

use crate::error::{Error, Result};
use crate::port::{PortType, PortValue, Vector3};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Round `value` to the nearest multiple of `step`
///
/// `value - ((value + step / 2) mod step) + step / 2`, using the Euclidean
/// remainder so negative values land on the grid too. `step == 0` is the
/// identity.
pub fn round_to_step(value: f64, step: f64) -> f64 {
    if step == 0.0 {
        return value;
    }
    let half = step / 2.0;
    value - (value + half).rem_euclid(step) + half
}

/// Declaration of one port
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortDescriptor {
    /// Value type
    #[serde(rename = "type")]
    pub port_type: PortType,
    /// Value used when the attribute bag has no usable entry
    pub default: PortValue,
    /// Lower bound (numeric-like types)
    #[serde(default)]
    pub min: Option<f64>,
    /// Upper bound (numeric-like types)
    #[serde(default)]
    pub max: Option<f64>,
    /// Grid spacing; 0 or absent disables rounding
    #[serde(default)]
    pub step: Option<f64>,
    /// Description
    #[serde(default)]
    pub description: String,
}

impl PortDescriptor {
    fn with_type(port_type: PortType, default: PortValue) -> Self {
        Self {
            port_type,
            default,
            min: None,
            max: None,
            step: None,
            description: String::new(),
        }
    }

    /// Create a bool port
    pub fn bool(default: bool) -> Self {
        Self::with_type(PortType::Bool, PortValue::Bool(default))
    }

    /// Create a number port
    pub fn number(default: f64) -> Self {
        Self::with_type(PortType::Number, PortValue::Number(default))
    }

    /// Create a byte port
    pub fn byte(default: u8) -> Self {
        Self::with_type(PortType::Byte, PortValue::Byte(default))
    }

    /// Create a vector3 port
    pub fn vector3(default: Vector3) -> Self {
        Self::with_type(PortType::Vector3, PortValue::Vector3(default))
    }

    /// Create a string port
    pub fn string(default: impl Into<String>) -> Self {
        Self::with_type(PortType::String, PortValue::String(default.into()))
    }

    /// Set the `[min, max]` range
    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    /// Set the grid step
    pub fn with_step(mut self, step: f64) -> Self {
        self.step = Some(step);
        self
    }

    /// Set a description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Whether any numeric constraint is declared
    pub fn has_constraints(&self) -> bool {
        self.min.is_some() || self.max.is_some() || self.step.is_some_and(|s| s > 0.0)
    }

    /// `min(max(round_to_step(v, step), min), max)`
    pub fn clamp(&self, value: f64) -> f64 {
        let mut clamped = round_to_step(value, self.step.unwrap_or(0.0));
        if let Some(min) = self.min {
            clamped = clamped.max(min);
        }
        if let Some(max) = self.max {
            clamped = clamped.min(max);
        }
        clamped
    }

    /// The decorator enforcing this port's numeric constraints, if it needs one
    ///
    /// Byte ports are always decorated so they stay inside `0..=255`.
    pub fn decorator(&self) -> Option<Box<dyn Fn(PortValue) -> PortValue>> {
        match self.port_type {
            PortType::Number if self.has_constraints() => {
                let descriptor = self.clone();
                Some(Box::new(move |value| match value {
                    PortValue::Number(n) => PortValue::Number(descriptor.clamp(n)),
                    other => other,
                }))
            }
            PortType::Byte => {
                let descriptor = self.clone();
                Some(Box::new(move |value| match value {
                    PortValue::Byte(b) => {
                        let clamped = descriptor.clamp(f64::from(b)).round().clamp(0.0, 255.0);
                        PortValue::Byte(clamped as u8)
                    }
                    other => other,
                }))
            }
            _ => None,
        }
    }

    /// Check the descriptor is self-consistent
    pub fn validate(&self, name: &str) -> Result<()> {
        if self.default.port_type() != self.port_type {
            return Err(Error::InvalidSchema(format!(
                "port '{}' declared {} but default is {}",
                name,
                self.port_type,
                self.default.port_type()
            )));
        }
        if !self.default.is_finite() {
            return Err(Error::InvalidSchema(format!(
                "port '{}' has a non-finite default",
                name
            )));
        }
        let constrained = self.min.is_some() || self.max.is_some() || self.step.is_some();
        if constrained && !self.port_type.is_numeric() {
            return Err(Error::InvalidSchema(format!(
                "port '{}' of type {} cannot have numeric constraints",
                name, self.port_type
            )));
        }
        for bound in [self.min, self.max].into_iter().flatten() {
            if !bound.is_finite() {
                return Err(Error::InvalidSchema(format!(
                    "port '{}' has a non-finite bound",
                    name
                )));
            }
        }
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(Error::InvalidSchema(format!(
                    "port '{}' has min {} above max {}",
                    name, min, max
                )));
            }
        }
        if let Some(step) = self.step {
            if !step.is_finite() || step < 0.0 {
                return Err(Error::InvalidSchema(format!(
                    "port '{}' has invalid step {}",
                    name, step
                )));
            }
        }
        Ok(())
    }
}

/// Ordered map of port name to descriptor
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortSchema(IndexMap<String, PortDescriptor>);

impl PortSchema {
    /// Create an empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a port (replaces an existing port of the same name)
    pub fn with_port(mut self, name: impl Into<String>, descriptor: PortDescriptor) -> Self {
        self.0.insert(name.into(), descriptor);
        self
    }

    /// Get a port descriptor
    pub fn get(&self, name: &str) -> Option<&PortDescriptor> {
        self.0.get(name)
    }

    /// Iterate ports in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &PortDescriptor)> {
        self.0.iter()
    }

    /// Number of ports
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if no ports are declared
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Validate every port
    pub fn validate(&self) -> Result<()> {
        for (name, descriptor) in &self.0 {
            descriptor.validate(name)?;
        }
        Ok(())
    }
}

/// The `{input, output}` schema pair of one block kind
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BlockSchema {
    #[serde(default)]
    pub input: PortSchema,
    #[serde(default)]
    pub output: PortSchema,
}

impl BlockSchema {
    /// Create a schema pair
    pub fn new(input: PortSchema, output: PortSchema) -> Self {
        Self { input, output }
    }

    /// Validate both sides
    pub fn validate(&self) -> Result<()> {
        self.input.validate().map_err(|e| prefix("input", e))?;
        self.output.validate().map_err(|e| prefix("output", e))
    }
}

fn prefix(side: &str, error: Error) -> Error {
    match error {
        Error::InvalidSchema(msg) => Error::InvalidSchema(format!("{}: {}", side, msg)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to_step_examples() {
        let cases = [
            (7.6, 1.0, 8.0),
            (7.4, 1.0, 7.0),
            (7.5, 1.0, 8.0),
            (0.3, 0.5, 0.5),
            (-1.6, 1.0, -2.0),
            (-0.6, 1.0, -1.0),
            (3.3, 0.0, 3.3),
        ];
        for (value, step, expected) in cases {
            let rounded = round_to_step(value, step);
            assert!(
                (rounded - expected).abs() < 1e-9,
                "round_to_step({}, {}) = {}, expected {}",
                value,
                step,
                rounded,
                expected
            );
        }
    }

    #[test]
    fn test_round_to_step_is_idempotent() {
        for step in [0.25, 0.5, 1.0, 2.0, 5.0] {
            for i in -400..=400 {
                let v = i as f64 * 0.125;
                let once = round_to_step(v, step);
                assert_eq!(
                    round_to_step(once, step),
                    once,
                    "round_to_step not idempotent for v={} step={}",
                    v,
                    step
                );
            }
        }
    }

    #[test]
    fn test_clamp_order() {
        let port = PortDescriptor::number(0.0).with_range(0.0, 10.0).with_step(1.0);
        assert_eq!(port.clamp(7.6), 8.0);
        assert_eq!(port.clamp(-3.0), 0.0);
        assert_eq!(port.clamp(10.4), 10.0);
        assert_eq!(port.clamp(12.0), 10.0);
    }

    #[test]
    fn test_byte_decorator_stays_in_range() {
        let port = PortDescriptor::byte(0).with_range(10.0, 20.0);
        let decorate = port.decorator().expect("byte ports are decorated");
        assert_eq!(decorate(PortValue::Byte(3)), PortValue::Byte(10));
        assert_eq!(decorate(PortValue::Byte(255)), PortValue::Byte(20));
        assert_eq!(decorate(PortValue::Byte(15)), PortValue::Byte(15));
    }

    #[test]
    fn test_unconstrained_number_has_no_decorator() {
        assert!(PortDescriptor::number(1.0).decorator().is_none());
        assert!(PortDescriptor::bool(false).decorator().is_none());
        assert!(PortDescriptor::number(1.0).with_step(0.5).decorator().is_some());
    }

    #[test]
    fn test_validate() {
        assert!(PortDescriptor::number(0.0)
            .with_range(0.0, 1.0)
            .validate("x")
            .is_ok());

        let mut wrong_default = PortDescriptor::number(0.0);
        wrong_default.default = PortValue::Bool(true);
        assert!(matches!(
            wrong_default.validate("x"),
            Err(Error::InvalidSchema(_))
        ));

        let inverted = PortDescriptor::number(0.0).with_range(5.0, 1.0);
        assert!(inverted.validate("x").is_err());

        let negative_step = PortDescriptor::number(0.0).with_step(-1.0);
        assert!(negative_step.validate("x").is_err());

        let constrained_bool = PortDescriptor::bool(false).with_range(0.0, 1.0);
        assert!(constrained_bool.validate("x").is_err());

        assert!(matches!(
            PortDescriptor::number(f64::NAN).validate("x"),
            Err(Error::InvalidSchema(_))
        ));
    }

    #[test]
    fn test_block_schema_validate_names_side() {
        let mut bad = PortDescriptor::string("a");
        bad.default = PortValue::Number(1.0);
        let schema = BlockSchema::new(PortSchema::new(), PortSchema::new().with_port("y", bad));

        match schema.validate() {
            Err(Error::InvalidSchema(msg)) => assert!(msg.starts_with("output:"), "{}", msg),
            other => panic!("expected InvalidSchema, got {:?}", other),
        }
    }

    #[test]
    fn test_schema_from_ron() {
        let schema: BlockSchema = ron::from_str(
            r#"(
                input: {
                    "x": (type: Number, default: Number(0.0), min: Some(0.0), max: Some(10.0), step: Some(1.0)),
                    "on": (type: Bool, default: Bool(true)),
                },
            )"#,
        )
        .expect("schema should parse");

        assert!(schema.validate().is_ok());
        assert!(schema.output.is_empty());
        let names: Vec<_> = schema.input.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["x", "on"]);
        assert_eq!(schema.input.get("x").and_then(|d| d.max), Some(10.0));
    }
}
