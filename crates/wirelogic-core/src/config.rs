//! Schema-driven port configuration
//!
//! A [`Config`] is one side (input or output) of a block: an ordered set of
//! observable port values built from a [`PortSchema`] and a raw attribute
//! bag. Building never fails. A missing or mistyped attribute falls back to
//! the port default, and numeric ports are clamped to their declared range
//! and grid on every assignment.

use crate::error::{Error, Result};
use crate::observable::ObservableValue;
use crate::port::{Port, PortData, PortType, PortValue};
use crate::schema::PortSchema;
use crate::value::AttributeBag;
use indexmap::IndexMap;
use log::debug;

/// The live port values of one side of a block
#[derive(Debug, Clone, Default)]
pub struct Config {
    ports: IndexMap<String, ObservableValue<PortValue>>,
}

impl Config {
    /// Build a config from a schema and a raw attribute bag
    ///
    /// Keys in `raw` that the schema does not declare are ignored.
    pub fn build(schema: &PortSchema, raw: &AttributeBag) -> Self {
        let mut ports = IndexMap::with_capacity(schema.len());

        for (name, descriptor) in schema.iter() {
            let expected = descriptor.port_type;
            let resolved = match raw.get(name) {
                Some(attr) => match PortValue::from_attr(expected, attr) {
                    Some(value) => value,
                    None => {
                        debug!(
                            "port '{}': {} attribute is not a {}, using default",
                            name,
                            attr.type_name(),
                            expected
                        );
                        descriptor.default.clone()
                    }
                },
                None => descriptor.default.clone(),
            };
            // unvalidated schemas may carry a mistyped or non-finite default
            let initial = if resolved.port_type() == expected && resolved.is_finite() {
                resolved
            } else {
                expected.zero()
            };

            let value = match descriptor.decorator() {
                Some(decorate) => ObservableValue::with_decorator(initial, decorate),
                None => ObservableValue::new(initial),
            };
            let port = name.clone();
            value.add_middleware(move |candidate: PortValue, prev: &PortValue| {
                if candidate.port_type() != expected {
                    debug!(
                        "port '{}': rejected {} value, port is {}",
                        port,
                        candidate.port_type(),
                        expected
                    );
                    prev.clone()
                } else if !candidate.is_finite() {
                    debug!("port '{}': rejected non-finite value {}", port, candidate);
                    prev.clone()
                } else {
                    candidate
                }
            });

            ports.insert(name.clone(), value);
        }

        Self { ports }
    }

    /// Get the observable behind a port
    pub fn get(&self, name: &str) -> Option<&ObservableValue<PortValue>> {
        self.ports.get(name)
    }

    /// Current value of a port
    pub fn value(&self, name: &str) -> Option<PortValue> {
        self.ports.get(name).map(ObservableValue::get)
    }

    /// Declared type of a port
    pub fn port_type(&self, name: &str) -> Option<PortType> {
        self.value(name).map(|value| value.port_type())
    }

    /// Get a typed view of a port
    pub fn port<T: PortData>(&self, name: &str) -> Result<Port<T>> {
        let value = self
            .ports
            .get(name)
            .ok_or_else(|| Error::PortNotFound(name.to_string()))?;
        let got = value.get().port_type();
        if got != T::PORT_TYPE {
            return Err(Error::PortTypeMismatch {
                port: name.to_string(),
                expected: T::PORT_TYPE,
                got,
            });
        }
        Ok(Port::new(value.clone()))
    }

    /// Check if a port exists
    pub fn contains(&self, name: &str) -> bool {
        self.ports.contains_key(name)
    }

    /// Port names in declaration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.ports.keys().map(String::as_str)
    }

    /// Iterate ports in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ObservableValue<PortValue>)> {
        self.ports.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of ports
    pub fn len(&self) -> usize {
        self.ports.len()
    }

    /// Check if the config has no ports
    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    /// Snapshot current values back into an attribute bag
    pub fn to_attributes(&self) -> AttributeBag {
        self.ports
            .iter()
            .map(|(name, value)| (name.clone(), value.get().to_attr()))
            .collect()
    }
}
