//! Entity repositories
//!
//! A [`Repository`] joins a [`Mapper`], an [`Executor`] and an
//! [`OrmSubject`]. Entities cross the boundary as serde values: they are
//! serialized into a property map, mapped to columns through the field
//! transforms, and rebuilt from rows the same way in reverse.

pub mod constraint;

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;

pub use constraint::UpdateConstraint;

use crate::error::{ModelError, OrmResult};
use crate::events::{Observer, ObserverData, ObserverEvent};
use crate::executor::{Executor, Row};
use crate::literal::Literal;
use crate::mapper::{KeyGen, Mapper};
use crate::observers::OrmSubject;
use crate::query::{
    DeleteQuery, InsertQuery, Query, QueryRaw, SqlStatement, Updatable, UpdateQuery,
    SOFT_DELETE_COLUMN,
};
use crate::schema::Schema;
use crate::value::{Params, Value};

/// Hook run on the property map right before it is written
pub type EntityProcessor = dyn Fn(&mut Params) -> OrmResult<()> + Send + Sync;

/// Serialize an entity into its property map
pub fn to_properties<T: Serialize>(entity: &T) -> OrmResult<Params> {
    match serde_json::to_value(entity)? {
        JsonValue::Object(map) => Ok(map
            .into_iter()
            .map(|(key, value)| (key, Value::from_json(value)))
            .collect()),
        other => Err(ModelError::Serialization(format!(
            "entity must serialize to an object, got {}",
            other
        ))),
    }
}

/// Rebuild an entity from its property map
pub fn from_properties<T: DeserializeOwned>(properties: &Params) -> OrmResult<T> {
    let map: serde_json::Map<String, JsonValue> = properties
        .iter()
        .map(|(key, value)| (key.clone(), value.to_json()))
        .collect();
    Ok(serde_json::from_value(JsonValue::Object(map))?)
}

fn properties_json(properties: &Params) -> JsonValue {
    JsonValue::Object(
        properties
            .iter()
            .map(|(key, value)| (key.clone(), value.to_json()))
            .collect(),
    )
}

pub struct Repository<T> {
    mapper: Arc<Mapper>,
    executor: Arc<dyn Executor>,
    subject: OrmSubject,
    schema: Option<Arc<Schema>>,
    constraint: Option<UpdateConstraint>,
    before_insert: Option<Arc<EntityProcessor>>,
    before_update: Option<Arc<EntityProcessor>>,
    read_only: bool,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Repository<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    pub fn new(mapper: Arc<Mapper>, executor: Arc<dyn Executor>) -> Self {
        Self {
            mapper,
            executor,
            subject: OrmSubject::new(),
            schema: None,
            constraint: None,
            before_insert: None,
            before_update: None,
            read_only: false,
            _entity: PhantomData,
        }
    }

    /// Publish changes on a shared subject instead of a private one
    pub fn with_subject(mut self, subject: OrmSubject) -> Self {
        self.subject = subject;
        self
    }

    /// Resolve queries against a schema, so soft-deleted rows of any
    /// registered table are filtered out.
    pub fn with_schema(mut self, schema: Arc<Schema>) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_constraint(mut self, constraint: UpdateConstraint) -> Self {
        self.constraint = Some(constraint);
        self
    }

    /// Reject every write through this repository
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn set_before_insert<F>(&mut self, f: F)
    where
        F: Fn(&mut Params) -> OrmResult<()> + Send + Sync + 'static,
    {
        self.before_insert = Some(Arc::new(f));
    }

    pub fn set_before_update<F>(&mut self, f: F)
    where
        F: Fn(&mut Params) -> OrmResult<()> + Send + Sync + 'static,
    {
        self.before_update = Some(Arc::new(f));
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    pub fn subject(&self) -> &OrmSubject {
        &self.subject
    }

    pub fn add_observer(&self, observer: Arc<dyn Observer>) -> OrmResult<()> {
        Ok(self.subject.add_observer(observer)?)
    }

    /// Build an entity from a property map
    pub fn entity(&self, properties: Params) -> OrmResult<T> {
        from_properties(&properties)
    }

    /// SELECT of every mapped field of this repository's table
    pub fn query(&self) -> Query {
        Query::new()
            .fields_mapper(&self.mapper)
            .table_mapper(&self.mapper)
    }

    /// Fetch by a single-column primary key
    pub async fn get(&self, id: impl Into<Value>) -> OrmResult<Option<T>> {
        self.get_composite(&[id.into()]).await
    }

    /// Fetch by primary key values, in key column order
    pub async fn get_composite(&self, key: &[Value]) -> OrmResult<Option<T>> {
        match self.fetch_properties(key).await? {
            Some(properties) => Ok(Some(from_properties(&properties)?)),
            None => Ok(None),
        }
    }

    pub async fn get_by_filter(&self, filter: &str, params: Params) -> OrmResult<Vec<T>> {
        self.get_by_query(self.query().where_clause(filter, params))
            .await
    }

    pub async fn get_by_query(&self, query: Query) -> OrmResult<Vec<T>> {
        let query = self.resolve(query);
        let statement = query.build(Some(self.executor.dialect()))?;
        self.fetch_entities(&statement).await
    }

    pub async fn get_by_query_raw(&self, query: QueryRaw) -> OrmResult<Vec<T>> {
        let statement = query.build(Some(self.executor.dialect()))?;
        self.fetch_entities(&statement).await
    }

    /// First column of the first row, if any
    pub async fn get_scalar(&self, query: &(dyn Updatable + Sync)) -> OrmResult<Option<Value>> {
        let statement = query.build(Some(self.executor.dialect()))?;
        let rows = self.executor.fetch_all(&statement).await?;
        Ok(rows.first().and_then(Row::first_value).cloned())
    }

    /// Fetch every entity whose single-column key is in `keys`.
    /// An empty `keys` matches nothing and runs no query.
    pub async fn filter_in(&self, keys: Vec<Value>) -> OrmResult<Vec<T>> {
        let column = match self.mapper.primary_key() {
            [column] => column.clone(),
            _ => {
                return Err(ModelError::InvalidKey(format!(
                    "filter_in needs a single key column on '{}'",
                    self.mapper.table_name()
                )))
            }
        };

        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let dialect = self.executor.dialect();
        let keys = keys
            .iter()
            .map(|key| self.mapper.key_value(&column, key, Some(dialect)))
            .collect::<OrmResult<Vec<Value>>>()?;
        let field = format!("{}.{}", self.mapper.table_reference(), column);
        self.get_by_query(self.query().where_in(&field, keys)).await
    }

    /// Insert or update an entity and return it as stored.
    ///
    /// The row is inserted when its key is empty or no row exists for the
    /// key; otherwise the stored row is updated after the update
    /// constraint accepts the change.
    pub async fn save(&self, entity: &T) -> OrmResult<T> {
        self.ensure_writable()?;

        let mut instance = to_properties(entity)?;
        let old = if self.mapper.has_empty_key(&instance) {
            None
        } else {
            let key = self.mapper.pk_values(&instance);
            self.fetch_properties(&key).await?
        };

        let event = match &old {
            None => {
                self.insert(&mut instance).await?;
                ObserverEvent::Insert
            }
            Some(old) => {
                self.update(old, &mut instance).await?;
                ObserverEvent::Update
            }
        };

        if self.subject.observer_count(self.mapper.table_name()) > 0 {
            let key = self.mapper.pk_values(&instance);
            let stored = self.fetch_properties(&key).await?;
            let mut data = ObserverData::new(self.mapper.table_name(), event)
                .with_data(properties_json(stored.as_ref().unwrap_or(&instance)));
            if let Some(old) = &old {
                data = data.with_old_data(properties_json(old));
            }
            self.subject.notify(&data).await;
        }

        from_properties(&instance)
    }

    /// Delete an entity by its key. Soft-delete tables get `deleted_at`
    /// set instead.
    pub async fn delete(&self, entity: &T) -> OrmResult<u64> {
        self.ensure_writable()?;

        let instance = to_properties(entity)?;
        if self.mapper.has_empty_key(&instance) {
            return Err(ModelError::InvalidKey(format!(
                "cannot delete from '{}' without a primary key",
                self.mapper.table_name()
            )));
        }

        let dialect = self.executor.dialect();
        let key = self.mapper.pk_values(&instance);
        let (filter, params) = self.mapper.pk_filter(&key, Some(dialect), false)?;
        let target = DeleteQuery::new(self.mapper.table_name()).where_clause(&filter, params.clone());
        let old = self.snapshot(&target).await?;

        let statement = if self.mapper.has_soft_delete() {
            tracing::debug!(table = %self.mapper.table_name(), "soft delete");
            UpdateQuery::new(self.mapper.table_name())
                .set(SOFT_DELETE_COLUMN, Value::Literal(Literal::new(dialect.now())))
                .where_clause(&filter, params)
                .build(Some(dialect))?
        } else {
            target.build(Some(dialect))?
        };

        let affected = self.executor.execute(&statement).await?;
        self.notify_deleted(old).await;
        Ok(affected)
    }

    /// Run a DELETE as given and notify observers with the removed rows
    pub async fn delete_by_query(&self, query: DeleteQuery) -> OrmResult<u64> {
        self.ensure_writable()?;

        let old = self.snapshot(&query).await?;
        let statement = query.build(Some(self.executor.dialect()))?;
        let affected = self.executor.execute(&statement).await?;
        self.notify_deleted(old).await;
        Ok(affected)
    }

    /// Build every statement first, then run them in order.
    /// Returns the total number of affected rows.
    pub async fn bulk_execute(&self, statements: &[&(dyn Updatable + Sync)]) -> OrmResult<u64> {
        self.ensure_writable()?;

        let dialect = self.executor.dialect();
        let built = statements
            .iter()
            .map(|statement| statement.build(Some(dialect)))
            .collect::<OrmResult<Vec<SqlStatement>>>()?;

        let mut affected = 0;
        for statement in &built {
            affected += self.executor.execute(statement).await?;
        }
        tracing::debug!(statements = built.len(), affected, "bulk execute");
        Ok(affected)
    }

    async fn insert(&self, instance: &mut Params) -> OrmResult<()> {
        if let Some(processor) = &self.before_insert {
            processor(instance)?;
        }

        let key_properties = self.mapper.primary_key_properties();
        if let Some(key_gen) = self.mapper.key_gen() {
            if let [property] = key_properties.as_slice() {
                let empty = instance.get(property).map_or(true, Value::is_empty_key);
                if empty {
                    if let Some(key) = key_gen.generate(instance)? {
                        instance.insert(property.clone(), key);
                    }
                }
            }
        }

        let dialect = self.executor.dialect();
        let mut columns = self.mapper.to_columns(instance, Some(dialect))?;
        let generated_id = matches!(self.mapper.key_gen(), Some(KeyGen::AutoIncrement))
            && self.mapper.has_empty_key(instance);
        if generated_id {
            for column in self.mapper.primary_key() {
                if columns.get(column).map_or(true, Value::is_empty_key) {
                    columns.remove(column);
                }
            }
        }

        tracing::debug!(table = %self.mapper.table_name(), "insert");
        let statement = InsertQuery::new(self.mapper.table_name())
            .values(columns)
            .build(Some(dialect))?;

        match (generated_id, key_properties.as_slice(), self.mapper.primary_key()) {
            (true, [property], [column]) => {
                let id = self.executor.insert_and_get_id(&statement, column).await?;
                instance.insert(property.clone(), id);
            }
            _ => {
                self.executor.execute(&statement).await?;
            }
        }
        Ok(())
    }

    async fn update(&self, old: &Params, instance: &mut Params) -> OrmResult<()> {
        if let Some(constraint) = &self.constraint {
            constraint.check(old, instance)?;
        }
        if let Some(processor) = &self.before_update {
            processor(instance)?;
        }

        let dialect = self.executor.dialect();
        let mut columns = self.mapper.to_columns(instance, Some(dialect))?;
        // Read-only key fields still identify the row
        let key = self.mapper.pk_values(instance);
        for (column, value) in self.mapper.primary_key().iter().zip(&key) {
            if !columns.contains_key(column) {
                let stored = self.mapper.key_value(column, value, Some(dialect))?;
                columns.insert(column.clone(), stored);
            }
        }
        let query = UpdateQuery::from_mapper(&columns, &self.mapper)?;
        if query.columns().next().is_none() {
            tracing::debug!(table = %self.mapper.table_name(), "update skipped, no columns");
            return Ok(());
        }

        tracing::debug!(table = %self.mapper.table_name(), "update");
        let statement = query.build(Some(dialect))?;
        self.executor.execute(&statement).await?;
        Ok(())
    }

    fn ensure_writable(&self) -> OrmResult<()> {
        if self.read_only {
            return Err(ModelError::ReadOnly(self.mapper.table_name().to_string()));
        }
        Ok(())
    }

    fn resolve(&self, query: Query) -> Query {
        match &self.schema {
            Some(schema) => schema.resolve(query),
            None => query,
        }
    }

    async fn fetch_properties(&self, key: &[Value]) -> OrmResult<Option<Params>> {
        let dialect = self.executor.dialect();
        let (filter, params) = self.mapper.pk_filter(key, Some(dialect), true)?;
        let statement = self
            .resolve(self.query().where_clause(&filter, params))
            .build(Some(dialect))?;

        let rows = self.executor.fetch_all(&statement).await?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(self.mapper.from_columns(&row.into_params(), Some(dialect))?)),
            None => Ok(None),
        }
    }

    async fn fetch_entities(&self, statement: &SqlStatement) -> OrmResult<Vec<T>> {
        let dialect = self.executor.dialect();
        let rows = self.executor.fetch_all(statement).await?;
        rows.into_iter()
            .map(|row| {
                let properties = self.mapper.from_columns(&row.into_params(), Some(dialect))?;
                from_properties(&properties)
            })
            .collect()
    }

    /// Rows a delete is about to touch, read only when someone listens
    async fn snapshot(&self, query: &DeleteQuery) -> OrmResult<Vec<Params>> {
        if self.subject.observer_count(self.mapper.table_name()) == 0 {
            return Ok(Vec::new());
        }
        let dialect = self.executor.dialect();
        let statement = query.convert().build(Some(dialect))?;
        self.executor
            .fetch_all(&statement)
            .await?
            .into_iter()
            .map(|row| self.mapper.from_columns(&row.into_params(), Some(dialect)))
            .collect()
    }

    async fn notify_deleted(&self, rows: Vec<Params>) {
        for row in rows {
            let data = ObserverData::new(self.mapper.table_name(), ObserverEvent::Delete)
                .with_old_data(properties_json(&row));
            self.subject.notify(&data).await;
        }
    }
}

impl<T> fmt::Debug for Repository<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("table", &self.mapper.table_name())
            .field("read_only", &self.read_only)
            .finish()
    }
}
