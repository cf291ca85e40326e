//! Field transforms applied when reading and writing columns

use std::fmt;
use std::sync::Arc;

use chrono::Utc;

use crate::dialect::Dialect;
use crate::error::{ModelError, OrmResult};
use crate::literal::{HexUuidLiteral, Literal};
use crate::value::{Params, Value};

/// Inputs available to a transform.
pub struct MapperContext<'a> {
    /// Value of the field being transformed
    pub value: &'a Value,
    /// Every property of the entity (or row) being processed
    pub instance: &'a Params,
    pub dialect: Option<&'a dyn Dialect>,
}

impl<'a> MapperContext<'a> {
    pub fn new(value: &'a Value, instance: &'a Params, dialect: Option<&'a dyn Dialect>) -> Self {
        Self {
            value,
            instance,
            dialect,
        }
    }
}

pub type CustomMapperFn = dyn Fn(&MapperContext<'_>) -> OrmResult<Option<Value>> + Send + Sync;

/// A transform returns `None` when the field must be left out.
#[derive(Clone, Default)]
pub enum MapperFunction {
    /// Pass the value through; an empty string becomes NULL
    #[default]
    Standard,
    /// Never written
    ReadOnly,
    /// 16-byte binary or UUID text to `XXXXXXXX-XXXX-...` upper-case text
    FormatUuidOnSelect,
    /// UUID text to a dialect binary literal
    FormatUuidOnUpdate,
    /// The dialect's current timestamp
    Now,
    Custom(Arc<CustomMapperFn>),
}

impl MapperFunction {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&MapperContext<'_>) -> OrmResult<Option<Value>> + Send + Sync + 'static,
    {
        MapperFunction::Custom(Arc::new(f))
    }

    pub fn is_read_only(&self) -> bool {
        matches!(self, MapperFunction::ReadOnly)
    }

    pub fn apply(&self, ctx: &MapperContext<'_>) -> OrmResult<Option<Value>> {
        match self {
            MapperFunction::Standard => Ok(Some(match ctx.value {
                Value::String(s) if s.is_empty() => Value::Null,
                other => other.clone(),
            })),
            MapperFunction::ReadOnly => Ok(None),
            MapperFunction::FormatUuidOnSelect => format_uuid_on_select(ctx.value).map(Some),
            MapperFunction::FormatUuidOnUpdate => format_uuid_on_update(ctx).map(Some),
            MapperFunction::Now => Ok(Some(match ctx.dialect {
                Some(dialect) => Value::Literal(Literal::new(dialect.now())),
                None => Value::DateTime(Utc::now()),
            })),
            MapperFunction::Custom(f) => f(ctx),
        }
    }
}

fn format_uuid_on_select(value: &Value) -> OrmResult<Value> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Bytes(bytes) => HexUuidLiteral::format_bytes(bytes).map(Value::String),
        Value::Uuid(uuid) => Ok(Value::String(HexUuidLiteral::format_uuid(uuid))),
        Value::String(s) if s.is_empty() => Ok(Value::Null),
        Value::String(s) => HexUuidLiteral::normalize(s).map(Value::String),
        other => Err(ModelError::Mapping(format!(
            "cannot read {:?} as a uuid",
            other
        ))),
    }
}

fn format_uuid_on_update(ctx: &MapperContext<'_>) -> OrmResult<Value> {
    match ctx.value {
        Value::Null => Ok(Value::Null),
        Value::String(s) if s.trim().is_empty() => Ok(Value::Null),
        Value::String(s) => HexUuidLiteral::from_uuid_str(s, ctx.dialect).map(Value::Literal),
        Value::Uuid(uuid) => Ok(Value::Literal(HexUuidLiteral::from_uuid(uuid, ctx.dialect))),
        Value::Bytes(bytes) => HexUuidLiteral::from_bytes(bytes, ctx.dialect).map(Value::Literal),
        Value::Literal(literal) => Ok(Value::Literal(literal.clone())),
        other => Err(ModelError::Mapping(format!(
            "cannot write {:?} as a uuid",
            other
        ))),
    }
}

impl fmt::Debug for MapperFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapperFunction::Standard => write!(f, "Standard"),
            MapperFunction::ReadOnly => write!(f, "ReadOnly"),
            MapperFunction::FormatUuidOnSelect => write!(f, "FormatUuidOnSelect"),
            MapperFunction::FormatUuidOnUpdate => write!(f, "FormatUuidOnUpdate"),
            MapperFunction::Now => write!(f, "Now"),
            MapperFunction::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::SqlDialect;

    fn apply(function: &MapperFunction, value: Value, dialect: Option<&dyn Dialect>) -> Option<Value> {
        let instance = Params::new();
        function
            .apply(&MapperContext::new(&value, &instance, dialect))
            .unwrap()
    }

    #[test]
    fn test_standard_nulls_empty_strings() {
        assert_eq!(apply(&MapperFunction::Standard, Value::from(""), None), Some(Value::Null));
        assert_eq!(apply(&MapperFunction::Standard, Value::from(3), None), Some(Value::from(3)));
        assert_eq!(apply(&MapperFunction::ReadOnly, Value::from(3), None), None);
    }

    #[test]
    fn test_uuid_round_trip() {
        let written = apply(
            &MapperFunction::FormatUuidOnUpdate,
            Value::from("0f8fad5b-d9cb-469f-a165-70867728950e"),
            Some(&SqlDialect::MySQL),
        );
        assert_eq!(
            written,
            Some(Value::Literal(Literal::new("X'0F8FAD5BD9CB469FA16570867728950E'")))
        );

        let stored = uuid::Uuid::parse_str("0f8fad5b-d9cb-469f-a165-70867728950e").unwrap();
        let read = apply(
            &MapperFunction::FormatUuidOnSelect,
            Value::Bytes(stored.as_bytes().to_vec()),
            None,
        );
        assert_eq!(read, Some(Value::from("0F8FAD5B-D9CB-469F-A165-70867728950E")));
    }

    #[test]
    fn test_now_uses_dialect() {
        assert_eq!(
            apply(&MapperFunction::Now, Value::Null, Some(&SqlDialect::PostgreSQL)),
            Some(Value::Literal(Literal::new("NOW()")))
        );
        assert!(matches!(
            apply(&MapperFunction::Now, Value::Null, None),
            Some(Value::DateTime(_))
        ));
    }

    #[test]
    fn test_custom_reads_instance() {
        let slug = MapperFunction::custom(|ctx| {
            let title = ctx.instance.get("title").and_then(Value::as_str).unwrap_or_default();
            Ok(Some(Value::from(title.to_lowercase().replace(' ', "-"))))
        });

        let mut instance = Params::new();
        instance.insert("title".into(), Value::from("Hello World"));
        let value = Value::Null;
        let result = slug.apply(&MapperContext::new(&value, &instance, None)).unwrap();
        assert_eq!(result, Some(Value::from("hello-world")));
    }
}
