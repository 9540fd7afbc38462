use crate::MetaError;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};

/// One entry of `PRE_PROCESSOR` / `POST_PROCESSOR`.
///
/// In the file a step is either a bare name (`- DivideBy255`) or a single-key
/// mapping from the name to its parameters (`- Resize: {size: [224, 224]}`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub struct StepDescriptor {
    pub name: String,
    pub params: Value,
}

impl StepDescriptor {
    pub fn new(name: impl Into<String>, params: Value) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }

    /// Step without parameters.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, Value::Null)
    }

    /// Deserializes the parameters into the step's own type. A step with no
    /// parameters deserializes from an empty mapping, so types whose fields
    /// all have defaults still build.
    pub fn params<T: DeserializeOwned>(&self) -> Result<T, serde_yaml::Error> {
        match &self.params {
            Value::Null => serde_yaml::from_value(Value::Mapping(Mapping::new())),
            params => serde_yaml::from_value(params.clone()),
        }
    }
}

impl TryFrom<Value> for StepDescriptor {
    type Error = MetaError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(name) => Ok(Self::named(name)),
            Value::Mapping(mapping) => {
                if mapping.len() != 1 {
                    return Err(MetaError::InvalidStep(format!(
                        "expected a single step name, got {} keys",
                        mapping.len()
                    )));
                }
                let Some((key, params)) = mapping.into_iter().next() else {
                    return Err(MetaError::InvalidStep("empty step".to_string()));
                };
                let Value::String(name) = key else {
                    return Err(MetaError::InvalidStep(format!(
                        "step name must be a string, got {:?}",
                        key
                    )));
                };
                match params {
                    Value::Null | Value::Mapping(_) => Ok(Self::new(name, params)),
                    other => Err(MetaError::InvalidStep(format!(
                        "parameters of {} must be a mapping, got {:?}",
                        name, other
                    ))),
                }
            }
            other => Err(MetaError::InvalidStep(format!(
                "expected a step name or mapping, got {:?}",
                other
            ))),
        }
    }
}
