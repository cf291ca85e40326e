//! Entity to table mapping
//!
//! A [`Mapper`] describes how one entity type is stored: table, alias,
//! primary key columns, per-property [`FieldMapping`]s, key generation and
//! soft delete. It also owns the relationships declared from its table.

pub mod field;
pub mod functions;

use std::fmt;
use std::sync::Arc;

pub use field::FieldMapping;
pub use functions::{MapperContext, MapperFunction};

use crate::dialect::Dialect;
use crate::error::{ModelError, OrmResult};
use crate::literal::HexUuidLiteral;
use crate::query::param_name;
use crate::relationship::DatabaseRelationship;
use crate::security::validate_identifier;
use crate::value::{Params, Value};

pub type KeyGenFn = dyn Fn(&Params) -> OrmResult<Value> + Send + Sync;

/// How a primary key is produced for new rows
#[derive(Clone)]
pub enum KeyGen {
    /// The database assigns the key; it is read back after the insert
    AutoIncrement,
    /// A random UUID, written through the key field's update transform
    Uuid,
    Custom(Arc<KeyGenFn>),
}

impl KeyGen {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&Params) -> OrmResult<Value> + Send + Sync + 'static,
    {
        KeyGen::Custom(Arc::new(f))
    }

    /// Produce a key before the insert. Auto-increment keys come from the
    /// database and yield `None`.
    pub fn generate(&self, instance: &Params) -> OrmResult<Option<Value>> {
        match self {
            KeyGen::AutoIncrement => Ok(None),
            KeyGen::Uuid => Ok(Some(Value::String(HexUuidLiteral::generate()))),
            KeyGen::Custom(f) => f(instance).map(Some),
        }
    }
}

impl fmt::Debug for KeyGen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyGen::AutoIncrement => write!(f, "AutoIncrement"),
            KeyGen::Uuid => write!(f, "Uuid"),
            KeyGen::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Mapper {
    entity: String,
    table: String,
    table_alias: Option<String>,
    primary_key: Vec<String>,
    fields: Vec<FieldMapping>,
    key_gen: Option<KeyGen>,
    soft_delete: bool,
    relationships: DatabaseRelationship,
}

impl Mapper {
    /// Create a mapper. `primary_key` lists the key columns in order.
    pub fn new(entity: &str, table: &str, primary_key: &[&str]) -> OrmResult<Self> {
        validate_identifier(table)?;
        if primary_key.is_empty() {
            return Err(ModelError::InvalidKey(format!(
                "mapper for '{}' needs at least one primary key column",
                table
            )));
        }
        for column in primary_key {
            validate_identifier(column)?;
        }

        let primary_key: Vec<String> = primary_key.iter().map(|c| c.to_string()).collect();
        let mut relationships = DatabaseRelationship::new();
        relationships.register_table(table, primary_key.clone(), false);

        Ok(Self {
            entity: entity.to_string(),
            table: table.to_string(),
            table_alias: None,
            primary_key,
            fields: Vec::new(),
            key_gen: None,
            soft_delete: false,
            relationships,
        })
    }

    /// Create a mapper named after the entity type
    pub fn for_entity<T>(table: &str, primary_key: &[&str]) -> OrmResult<Self> {
        let name = std::any::type_name::<T>();
        let short = name.rsplit("::").next().unwrap_or(name);
        Self::new(short, table, primary_key)
    }

    pub fn with_table_alias(mut self, alias: &str) -> Self {
        self.table_alias = Some(alias.to_string());
        self
    }

    pub fn with_key_gen(mut self, key_gen: KeyGen) -> Self {
        self.key_gen = Some(key_gen);
        self
    }

    /// Rows are flagged through `deleted_at` instead of removed
    pub fn with_soft_delete(mut self) -> Self {
        self.soft_delete = true;
        self.relationships
            .register_table(&self.table, self.primary_key.clone(), true);
        self
    }

    pub fn with_field(mut self, mapping: FieldMapping) -> Self {
        match self
            .fields
            .iter_mut()
            .find(|f| f.property() == mapping.property())
        {
            Some(existing) => *existing = mapping,
            None => self.fields.push(mapping),
        }
        self
    }

    /// This table references `parent_table` through `foreign_key`
    pub fn with_parent(mut self, parent_table: &str, foreign_key: &str) -> Self {
        self.relationships
            .add_relationship(parent_table, &self.table, foreign_key, None);
        self
    }

    /// `child_table` references this table through `foreign_key`
    pub fn with_child(mut self, child_table: &str, foreign_key: &str) -> Self {
        let pk = self.primary_key[0].clone();
        self.relationships
            .add_relationship(&self.table, child_table, foreign_key, Some(&pk));
        self
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn table_alias(&self) -> Option<&str> {
        self.table_alias.as_deref()
    }

    /// Name qualifying this table's columns: the alias, or the table
    pub fn table_reference(&self) -> &str {
        self.table_alias.as_deref().unwrap_or(&self.table)
    }

    pub fn primary_key(&self) -> &[String] {
        &self.primary_key
    }

    pub fn fields(&self) -> &[FieldMapping] {
        &self.fields
    }

    pub fn key_gen(&self) -> Option<&KeyGen> {
        self.key_gen.as_ref()
    }

    pub fn has_soft_delete(&self) -> bool {
        self.soft_delete
    }

    pub fn is_auto_increment(&self) -> bool {
        matches!(self.key_gen, Some(KeyGen::AutoIncrement))
    }

    pub fn relationships(&self) -> &DatabaseRelationship {
        &self.relationships
    }

    pub fn mapping_for_property(&self, property: &str) -> Option<&FieldMapping> {
        self.fields.iter().find(|f| f.property() == property)
    }

    pub fn mapping_for_field(&self, field: &str) -> Option<&FieldMapping> {
        self.fields.iter().find(|f| f.field() == field)
    }

    /// Column for a property; unmapped properties use their own name
    pub fn field_name(&self, property: &str) -> String {
        self.mapping_for_property(property)
            .map(|f| f.field().to_string())
            .unwrap_or_else(|| property.to_string())
    }

    /// Property for a result-set label (alias) or column name
    pub fn property_name(&self, column: &str) -> String {
        self.fields
            .iter()
            .find(|f| f.alias() == column)
            .or_else(|| self.mapping_for_field(column))
            .map(|f| f.property().to_string())
            .unwrap_or_else(|| column.to_string())
    }

    pub fn primary_key_properties(&self) -> Vec<String> {
        self.primary_key
            .iter()
            .map(|column| self.property_name(column))
            .collect()
    }

    /// Key values of an instance, in key column order
    pub fn pk_values(&self, instance: &Params) -> Vec<Value> {
        self.primary_key_properties()
            .iter()
            .map(|p| instance.get(p).cloned().unwrap_or(Value::Null))
            .collect()
    }

    pub fn has_empty_key(&self, instance: &Params) -> bool {
        self.pk_values(instance).iter().any(Value::is_empty_key)
    }

    /// `ref.column as alias` for every synced mapping, or `ref.*`
    pub fn select_fields(&self) -> Vec<String> {
        let reference = self.table_reference();
        let fields: Vec<String> = self
            .fields
            .iter()
            .filter(|f| f.is_synced())
            .map(|f| format!("{}.{} as {}", reference, f.field(), f.alias()))
            .collect();
        if fields.is_empty() {
            vec![format!("{}.*", reference)]
        } else {
            fields
        }
    }

    /// WHERE fragment matching `values` against the key columns.
    ///
    /// Key values pass through the key field's update transform, so keys
    /// stored in binary form are compared in that form.
    pub fn pk_filter(
        &self,
        values: &[Value],
        dialect: Option<&dyn Dialect>,
        qualified: bool,
    ) -> OrmResult<(String, Params)> {
        if values.len() != self.primary_key.len() {
            return Err(ModelError::InvalidKey(format!(
                "'{}' has {} key column(s), got {} value(s)",
                self.table,
                self.primary_key.len(),
                values.len()
            )));
        }

        let mut params = Params::new();
        let mut parts = Vec::with_capacity(values.len());
        for (column, value) in self.primary_key.iter().zip(values) {
            let value = self.key_value(column, value, dialect)?;
            let name = format!("pk_{}", param_name(column));
            let target = if qualified {
                format!("{}.{}", self.table_reference(), column)
            } else {
                column.clone()
            };
            parts.push(format!("{} = :{}", target, name));
            params.insert(name, value);
        }

        Ok((parts.join(" AND "), params))
    }

    /// A key value in stored form: passed through the column's update
    /// transform unless that transform is read-only.
    pub fn key_value(
        &self,
        column: &str,
        value: &Value,
        dialect: Option<&dyn Dialect>,
    ) -> OrmResult<Value> {
        let instance = Params::new();
        match self.mapping_for_field(column) {
            Some(mapping) if !mapping.update_function().is_read_only() => Ok(mapping
                .update_function()
                .apply(&MapperContext::new(value, &instance, dialect))?
                .unwrap_or_else(|| value.clone())),
            _ => Ok(value.clone()),
        }
    }

    /// Column values for a write, keyed by column.
    ///
    /// Mapped fields come first (a missing property is NULL); properties
    /// without a mapping are written unchanged under their own name.
    /// Unsynced fields and fields whose transform yields nothing are left out.
    pub fn to_columns(&self, instance: &Params, dialect: Option<&dyn Dialect>) -> OrmResult<Params> {
        let mut columns = Params::new();

        for mapping in &self.fields {
            if !mapping.is_synced() {
                continue;
            }
            let value = instance
                .get(mapping.property())
                .cloned()
                .unwrap_or(Value::Null);
            let ctx = MapperContext::new(&value, instance, dialect);
            if let Some(written) = mapping.update_function().apply(&ctx)? {
                columns.insert(mapping.field().to_string(), written);
            }
        }

        for (property, value) in instance {
            if self.mapping_for_property(property).is_some() {
                continue;
            }
            let ctx = MapperContext::new(value, instance, dialect);
            if let Some(written) = MapperFunction::Standard.apply(&ctx)? {
                columns.insert(property.clone(), written);
            }
        }

        Ok(columns)
    }

    /// Entity properties from a result row, applying select transforms.
    /// Columns without a mapping are copied through.
    pub fn from_columns(&self, row: &Params, dialect: Option<&dyn Dialect>) -> OrmResult<Params> {
        let mut instance = Params::new();

        for (column, value) in row {
            let mapping = self
                .fields
                .iter()
                .find(|f| f.alias() == column)
                .or_else(|| self.mapping_for_field(column));
            match mapping {
                Some(mapping) => {
                    let ctx = MapperContext::new(value, row, dialect);
                    if let Some(read) = mapping.select_function().apply(&ctx)? {
                        instance.insert(mapping.property().to_string(), read);
                    }
                }
                None => {
                    instance.insert(column.clone(), value.clone());
                }
            }
        }

        Ok(instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::SqlDialect;
    use crate::literal::Literal;
    use crate::params;

    fn user_mapper() -> Mapper {
        Mapper::new("User", "users", &["id"])
            .unwrap()
            .with_table_alias("u")
            .with_field(FieldMapping::new("id"))
            .with_field(FieldMapping::new("email").with_field_name("email_address"))
            .with_field(FieldMapping::new("display").dont_sync_with_db())
            .with_field(
                FieldMapping::new("created")
                    .with_field_name("created_at")
                    .read_only(),
            )
    }

    #[test]
    fn test_mapper_validation() {
        assert!(Mapper::new("User", "users", &[]).is_err());
        assert!(Mapper::new("User", "bad table", &["id"]).is_err());
        assert!(Mapper::new("User", "public.users", &["id"]).is_ok());
    }

    #[test]
    fn test_for_entity_uses_type_name() {
        struct Invoice;
        let mapper = Mapper::for_entity::<Invoice>("invoices", &["id"]).unwrap();
        assert_eq!(mapper.entity(), "Invoice");
    }

    #[test]
    fn test_select_fields_skip_unsynced() {
        assert_eq!(
            user_mapper().select_fields(),
            vec![
                "u.id as id",
                "u.email_address as email",
                "u.created_at as created"
            ]
        );

        let bare = Mapper::new("Tag", "tags", &["id"]).unwrap();
        assert_eq!(bare.select_fields(), vec!["tags.*"]);
    }

    #[test]
    fn test_to_columns_applies_update_functions() {
        let instance = params! {
            "id" => 3,
            "email" => "",
            "display" => "Ann <a@x>",
            "created" => "2024-01-01",
            "nickname" => "annie"
        };
        let columns = user_mapper().to_columns(&instance, None).unwrap();

        assert_eq!(
            columns,
            params! { "id" => 3, "email_address" => Value::Null, "nickname" => "annie" }
        );
    }

    #[test]
    fn test_from_columns_maps_aliases() {
        let row = params! { "id" => 3, "email" => "a@x", "extra" => true };
        let instance = user_mapper().from_columns(&row, None).unwrap();
        assert_eq!(instance, params! { "id" => 3, "email" => "a@x", "extra" => true });
    }

    #[test]
    fn test_pk_filter_uses_key_transform() {
        let mapper = Mapper::new("Device", "devices", &["id"])
            .unwrap()
            .with_field(
                FieldMapping::new("id")
                    .with_update_function(MapperFunction::FormatUuidOnUpdate)
                    .with_select_function(MapperFunction::FormatUuidOnSelect),
            );

        let (filter, params) = mapper
            .pk_filter(
                &[Value::from("0f8fad5b-d9cb-469f-a165-70867728950e")],
                Some(&SqlDialect::SQLite),
                true,
            )
            .unwrap();
        assert_eq!(filter, "devices.id = :pk_id");
        assert_eq!(
            params["pk_id"],
            Value::Literal(Literal::new("X'0F8FAD5BD9CB469FA16570867728950E'"))
        );

        assert!(mapper.pk_filter(&[], None, false).is_err());
    }

    #[test]
    fn test_key_generation() {
        assert_eq!(KeyGen::AutoIncrement.generate(&Params::new()).unwrap(), None);
        let generated = KeyGen::Uuid.generate(&Params::new()).unwrap().unwrap();
        assert_eq!(generated.as_str().map(str::len), Some(36));

        let custom = KeyGen::custom(|instance| {
            let prefix = instance.get("kind").and_then(Value::as_str).unwrap_or("x");
            Ok(Value::from(format!("{}-1", prefix)))
        });
        let key = custom.generate(&params! { "kind" => "inv" }).unwrap();
        assert_eq!(key, Some(Value::from("inv-1")));
    }

    #[test]
    fn test_relationship_declarations() {
        let orders = Mapper::new("Order", "orders", &["id"])
            .unwrap()
            .with_parent("users", "user_id")
            .with_child("order_lines", "order_id");

        let graph = orders.relationships();
        assert_eq!(graph.incomplete_keys().collect::<Vec<_>>(), vec!["orders,users"]);
        assert_eq!(
            graph.edge("order_lines,orders").map(|e| e.join_condition()),
            Some("orders.id = order_lines.order_id".to_string())
        );
    }
}
