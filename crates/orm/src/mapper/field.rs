//! Per-property column metadata

use super::functions::MapperFunction;

static NOT_WRITTEN: MapperFunction = MapperFunction::ReadOnly;

/// How one entity property maps to a column.
///
/// Configure it with the `with_*` methods before handing it to
/// [`Mapper::with_field`](super::Mapper::with_field); it is immutable after.
#[derive(Debug, Clone)]
pub struct FieldMapping {
    property: String,
    field: String,
    alias: Option<String>,
    select_function: MapperFunction,
    update_function: MapperFunction,
    sync_with_db: bool,
}

impl FieldMapping {
    /// Map `property` to a column of the same name
    pub fn new(property: &str) -> Self {
        Self {
            property: property.to_string(),
            field: property.to_string(),
            alias: None,
            select_function: MapperFunction::Standard,
            update_function: MapperFunction::Standard,
            sync_with_db: true,
        }
    }

    pub fn with_field_name(mut self, field: &str) -> Self {
        self.field = field.to_string();
        self
    }

    pub fn with_field_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_string());
        self
    }

    pub fn with_select_function(mut self, function: MapperFunction) -> Self {
        self.select_function = function;
        self
    }

    pub fn with_update_function(mut self, function: MapperFunction) -> Self {
        self.update_function = function;
        self
    }

    /// Read the column but never write it
    pub fn read_only(self) -> Self {
        self.with_update_function(MapperFunction::ReadOnly)
    }

    /// The property has no column: it is neither selected nor written
    pub fn dont_sync_with_db(mut self) -> Self {
        self.sync_with_db = false;
        self.update_function = MapperFunction::ReadOnly;
        self
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// Column label in result sets: the alias, or the property name
    pub fn alias(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.property)
    }

    pub fn select_function(&self) -> &MapperFunction {
        &self.select_function
    }

    pub fn update_function(&self) -> &MapperFunction {
        if self.sync_with_db {
            &self.update_function
        } else {
            &NOT_WRITTEN
        }
    }

    pub fn is_synced(&self) -> bool {
        self.sync_with_db
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let mapping = FieldMapping::new("email");
        assert_eq!(mapping.field(), "email");
        assert_eq!(mapping.alias(), "email");
        assert!(mapping.is_synced());
        assert!(!mapping.update_function().is_read_only());
    }

    #[test]
    fn test_unsynced_field_is_never_written() {
        let mapping = FieldMapping::new("full_name")
            .with_update_function(MapperFunction::Standard)
            .dont_sync_with_db();
        assert!(!mapping.is_synced());
        assert!(mapping.update_function().is_read_only());
    }

    #[test]
    fn test_column_and_alias() {
        let mapping = FieldMapping::new("createdAt")
            .with_field_name("created_at")
            .with_field_alias("created");
        assert_eq!(mapping.field(), "created_at");
        assert_eq!(mapping.alias(), "created");
    }
}
