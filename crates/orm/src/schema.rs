//! Mapper registry
//!
//! A [`Schema`] is assembled once at startup and then shared behind an
//! `Arc`. It owns the relationship graph built from every registered
//! mapper's declarations.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{ModelError, OrmResult};
use crate::mapper::Mapper;
use crate::query::{Query, QueryBasic};
use crate::relationship::DatabaseRelationship;

#[derive(Debug, Clone, Default)]
pub struct Schema {
    mappers: BTreeMap<String, Arc<Mapper>>,
    relationships: DatabaseRelationship,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mapper under its table name and merge its relationships.
    pub fn register(&mut self, mapper: Mapper) -> OrmResult<Arc<Mapper>> {
        let table = mapper.table_name().to_string();
        if self.mappers.contains_key(&table) {
            return Err(ModelError::Configuration(format!(
                "a mapper for table '{}' is already registered",
                table
            )));
        }

        self.relationships.register_mapper(&mapper);
        self.relationships.merge(mapper.relationships());

        let mapper = Arc::new(mapper);
        self.mappers.insert(table, mapper.clone());
        Ok(mapper)
    }

    pub fn mapper(&self, table: &str) -> Option<Arc<Mapper>> {
        self.mappers.get(table).cloned()
    }

    pub fn mapper_for_entity(&self, entity: &str) -> Option<Arc<Mapper>> {
        self.mappers.values().find(|m| m.entity() == entity).cloned()
    }

    pub fn mappers(&self) -> impl Iterator<Item = &Arc<Mapper>> {
        self.mappers.values()
    }

    pub fn add_relationship(
        &mut self,
        parent_table: &str,
        child_table: &str,
        foreign_key: &str,
        primary_key: Option<&str>,
    ) {
        self.relationships
            .add_relationship(parent_table, child_table, foreign_key, primary_key);
    }

    pub fn relationships(&self) -> &DatabaseRelationship {
        &self.relationships
    }

    pub fn get_relationship(&self, tables: &[&str]) -> Vec<String> {
        self.relationships.get_relationship(tables)
    }

    pub fn get_query_instance(&self, tables: &[&str]) -> OrmResult<Query> {
        self.relationships.get_query_instance(tables)
    }

    /// Flag every referenced table whose mapper uses soft delete.
    /// Unsafe queries are returned unchanged.
    pub fn resolve(&self, query: Query) -> Query {
        if query.is_unsafe() {
            return query;
        }
        let flagged = self.soft_delete_tables(query.basic());
        flagged
            .into_iter()
            .fold(query, |query, table| query.soft_delete(&table))
    }

    pub fn resolve_basic(&self, query: QueryBasic) -> QueryBasic {
        if query.is_unsafe() {
            return query;
        }
        let flagged = self.soft_delete_tables(&query);
        flagged
            .into_iter()
            .fold(query, |query, table| query.soft_delete(&table))
    }

    fn soft_delete_tables(&self, query: &QueryBasic) -> Vec<String> {
        query
            .referenced_tables()
            .into_iter()
            .filter(|table| self.mappers.get(*table).is_some_and(|m| m.has_soft_delete()))
            .map(str::to_string)
            .collect()
    }
}
