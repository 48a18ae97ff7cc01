//! Typed field access over raw JSON payloads

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ModelError;
use crate::value_objects::Snowflake;

/// Borrowed view over a raw object payload of a known entity kind
#[derive(Debug, Clone, Copy)]
pub(crate) struct Fields<'a> {
    kind: &'static str,
    raw: &'a Value,
}

impl<'a> Fields<'a> {
    pub(crate) fn new(raw: &'a Value, kind: &'static str) -> Result<Self, ModelError> {
        if raw.is_object() {
            Ok(Self { kind, raw })
        } else {
            Err(ModelError::NotAnObject { kind })
        }
    }

    fn decode<T: DeserializeOwned>(&self, field: &'static str, value: &Value) -> Result<T, ModelError> {
        T::deserialize(value).map_err(|source| ModelError::InvalidField {
            kind: self.kind,
            field,
            source,
        })
    }

    /// Field that must be present and non-null
    pub(crate) fn required<T: DeserializeOwned>(&self, field: &'static str) -> Result<T, ModelError> {
        match self.raw.get(field) {
            None | Some(Value::Null) => Err(ModelError::MissingField {
                kind: self.kind,
                field,
            }),
            Some(value) => self.decode(field, value),
        }
    }

    /// Field that may be absent or null
    pub(crate) fn optional<T: DeserializeOwned>(&self, field: &'static str) -> Result<Option<T>, ModelError> {
        match self.raw.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => self.decode(field, value).map(Some),
        }
    }

    /// Field with a default when absent or null
    pub(crate) fn or_default<T: DeserializeOwned + Default>(&self, field: &'static str) -> Result<T, ModelError> {
        self.optional(field).map(Option::unwrap_or_default)
    }

    /// `id` of a nested object such as `author` or `user`
    pub(crate) fn nested_id(&self, field: &'static str) -> Result<Option<Snowflake>, ModelError> {
        match self.raw.get(field).and_then(|nested| nested.get("id")) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => self.decode(field, value).map(Some),
        }
    }

    /// IDs of an array of nested objects, e.g. `recipients`
    pub(crate) fn nested_ids(&self, field: &'static str) -> Result<Option<Vec<Snowflake>>, ModelError> {
        let Some(items) = self.raw.get(field).and_then(Value::as_array) else {
            return Ok(None);
        };
        items
            .iter()
            .filter_map(|item| item.get("id"))
            .map(|id| self.decode(field, id))
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    /// Overwrite `target` if the field is present and non-null
    pub(crate) fn patch<T: DeserializeOwned>(&self, target: &mut T, field: &'static str) -> Result<(), ModelError> {
        if let Some(value) = self.optional(field)? {
            *target = value;
        }
        Ok(())
    }

    /// Overwrite a nullable `target` if the field is present; `null` clears it
    pub(crate) fn patch_nullable<T: DeserializeOwned>(
        &self,
        target: &mut Option<T>,
        field: &'static str,
    ) -> Result<(), ModelError> {
        if self.raw.get(field).is_some() {
            *target = self.optional(field)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_required_and_optional() {
        let raw = json!({"id": "42", "name": null, "count": 3});
        let fields = Fields::new(&raw, "thing").unwrap();

        assert_eq!(fields.required::<Snowflake>("id").unwrap(), Snowflake::new(42));
        assert!(matches!(
            fields.required::<String>("name"),
            Err(ModelError::MissingField { field: "name", .. })
        ));
        assert_eq!(fields.optional::<String>("name").unwrap(), None);
        assert!(matches!(
            fields.required::<String>("count"),
            Err(ModelError::InvalidField { field: "count", .. })
        ));
    }

    #[test]
    fn test_not_an_object() {
        let raw = json!([1, 2]);
        assert!(matches!(
            Fields::new(&raw, "thing"),
            Err(ModelError::NotAnObject { kind: "thing" })
        ));
    }

    #[test]
    fn test_patch_nullable_distinguishes_absent_and_null() {
        let mut topic = Some("old".to_string());

        let absent = json!({});
        Fields::new(&absent, "channel")
            .unwrap()
            .patch_nullable(&mut topic, "topic")
            .unwrap();
        assert_eq!(topic.as_deref(), Some("old"));

        let cleared = json!({"topic": null});
        Fields::new(&cleared, "channel")
            .unwrap()
            .patch_nullable(&mut topic, "topic")
            .unwrap();
        assert_eq!(topic, None);
    }

    #[test]
    fn test_nested_ids() {
        let raw = json!({"recipients": [{"id": "1"}, {"id": 2}], "author": {"id": "7"}});
        let fields = Fields::new(&raw, "channel").unwrap();

        assert_eq!(
            fields.nested_ids("recipients").unwrap(),
            Some(vec![Snowflake::new(1), Snowflake::new(2)])
        );
        assert_eq!(fields.nested_id("author").unwrap(), Some(Snowflake::new(7)));
        assert_eq!(fields.nested_id("missing").unwrap(), None);
    }
}
