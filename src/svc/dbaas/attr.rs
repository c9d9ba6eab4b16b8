//! # Attribute module
//!
//! This module provide the three-state attribute used by declarative models,
//! an attribute is either unknown (not mentioned by the user), explicitly
//! null or set to a value.

use schemars::{gen::SchemaGenerator, schema::Schema, JsonSchema};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// -----------------------------------------------------------------------------
// Attr enum

#[derive(PartialEq, Eq, Clone, Debug)]
pub enum Attr<T> {
    Unknown,
    Null,
    Value(T),
}

impl<T> Attr<T> {
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// returns if the attribute is either null or set
    pub fn is_known(&self) -> bool {
        !self.is_unknown()
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    /// returns null for an absent value
    pub fn from_option(value: Option<T>) -> Self {
        match value {
            Some(value) => Self::Value(value),
            None => Self::Null,
        }
    }

    /// resolves an unknown attribute to null, used for inputs the server
    /// never reports back
    pub fn or_null(self) -> Self {
        match self {
            Self::Unknown => Self::Null,
            attr => attr,
        }
    }

    /// returns the attribute as observed on the server, an explicit null is
    /// preserved while unknown and set attributes take the server value
    pub fn observe(self, server: Option<T>) -> Self {
        match self {
            Self::Null => Self::Null,
            _ => Self::from_option(server),
        }
    }
}

impl<T> Attr<T>
where
    T: PartialEq,
{
    /// returns if the planned attribute is known and differs from the state
    pub fn changed(&self, state: &Self) -> bool {
        self.is_known() && self != state
    }

    /// returns if both sides are set to different values, an unset side is
    /// either left to the api or was never observed
    pub fn differs(&self, state: &Self) -> bool {
        matches!((self, state), (Self::Value(planned), Self::Value(state)) if planned != state)
    }
}

impl<T> Default for Attr<T> {
    fn default() -> Self {
        Self::Unknown
    }
}

impl<T> From<T> for Attr<T> {
    fn from(value: T) -> Self {
        Self::Value(value)
    }
}

impl<T> Serialize for Attr<T>
where
    T: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Value(value) => serializer.serialize_some(value),
            _ => serializer.serialize_none(),
        }
    }
}

impl<'de, T> Deserialize<'de> for Attr<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Self::from_option(Option::<T>::deserialize(deserializer)?))
    }
}

impl<T> JsonSchema for Attr<T>
where
    T: JsonSchema,
{
    fn is_referenceable() -> bool {
        false
    }

    fn schema_name() -> String {
        Option::<T>::schema_name()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        gen.subschema_for::<Option<T>>()
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Block {
        #[serde(default, skip_serializing_if = "Attr::is_unknown")]
        plan: Attr<String>,
        #[serde(default, skip_serializing_if = "Attr::is_unknown")]
        version: Attr<String>,
        #[serde(default, skip_serializing_if = "Attr::is_unknown")]
        termination_protection: Attr<bool>,
    }

    #[test]
    fn missing_key_is_unknown_and_null_is_null() {
        let block: Block = serde_json::from_str(r#"{"plan": "hobbyist-2", "version": null}"#)
            .expect("block to deserialize");

        assert_eq!(Attr::Value("hobbyist-2".to_string()), block.plan);
        assert_eq!(Attr::Null, block.version);
        assert_eq!(Attr::Unknown, block.termination_protection);
    }

    #[test]
    fn unknown_is_not_serialized() {
        let block = Block {
            plan: Attr::Value("startup-4".to_string()),
            version: Attr::Null,
            termination_protection: Attr::Unknown,
        };

        assert_eq!(
            r#"{"plan":"startup-4","version":null}"#,
            serde_json::to_string(&block).expect("block to serialize")
        );
    }

    #[test]
    fn observe_preserves_explicit_null() {
        assert_eq!(Attr::Null, Attr::<i64>::Null.observe(Some(3)));
        assert_eq!(Attr::Value(3), Attr::<i64>::Unknown.observe(Some(3)));
        assert_eq!(Attr::Value(3), Attr::Value(1).observe(Some(3)));
        assert_eq!(Attr::Null, Attr::Value(1).observe(None));
    }

    #[test]
    fn unknown_plan_never_changes() {
        let state = Attr::Value(true);

        assert!(!Attr::<bool>::Unknown.changed(&state));
        assert!(!Attr::Value(true).changed(&state));
        assert!(Attr::Value(false).changed(&state));
        assert!(Attr::<bool>::Null.changed(&state));
    }

    #[test]
    fn differs_requires_both_values() {
        let state = Attr::Value(1);

        assert!(Attr::Value(2).differs(&state));
        assert!(!Attr::Value(1).differs(&state));
        assert!(!Attr::<i64>::Unknown.differs(&state));
        assert!(!Attr::<i64>::Null.differs(&state));
        assert!(!Attr::Value(2).differs(&Attr::Null));
    }
}
