//! Foreign-key graph between tables
//!
//! Edges are stored once per unordered table pair, so `(a, b)` and `(b, a)`
//! address the same relationship. Paths are searched breadth-first over the
//! undirected graph; JOINs are generated from the directed parent/child
//! information of each edge.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::error::{OrmResult, RelationshipError};
use crate::mapper::Mapper;
use crate::query::Query;

/// Primary key placeholder for edges whose parent table is not known yet
pub const UNRESOLVED_KEY: &str = "?";

/// A parent/child foreign key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub parent_table: String,
    pub child_table: String,
    pub primary_key: String,
    pub foreign_key: String,
}

impl Relationship {
    pub fn is_complete(&self) -> bool {
        self.primary_key != UNRESOLVED_KEY
    }

    /// The endpoint that is not `table`
    pub fn other(&self, table: &str) -> &str {
        if self.parent_table == table {
            &self.child_table
        } else {
            &self.parent_table
        }
    }

    /// `parent.pk = child.fk`
    pub fn join_condition(&self) -> String {
        format!(
            "{}.{} = {}.{}",
            self.parent_table, self.primary_key, self.child_table, self.foreign_key
        )
    }
}

/// What the graph knows about a table's mapper
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    pub primary_key: Vec<String>,
    pub soft_delete: bool,
}

#[derive(Debug, Clone, Default)]
pub struct DatabaseRelationship {
    edges: BTreeMap<String, Relationship>,
    incomplete: BTreeSet<String>,
    tables: BTreeMap<String, TableInfo>,
}

impl DatabaseRelationship {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key shared by both orientations of a table pair
    pub fn relationship_key(a: &str, b: &str) -> String {
        if a <= b {
            format!("{},{}", a, b)
        } else {
            format!("{},{}", b, a)
        }
    }

    pub fn register_table(&mut self, table: &str, primary_key: Vec<String>, soft_delete: bool) {
        self.tables.insert(
            table.to_string(),
            TableInfo {
                primary_key,
                soft_delete,
            },
        );
        self.resolve_incomplete();
    }

    pub fn register_mapper(&mut self, mapper: &Mapper) {
        self.register_table(
            mapper.table_name(),
            mapper.primary_key().to_vec(),
            mapper.has_soft_delete(),
        );
    }

    /// Add a directed edge. Without an explicit primary key, the parent's
    /// registered key is used; if the parent is unknown the edge stays
    /// incomplete until it is registered.
    pub fn add_relationship(
        &mut self,
        parent_table: &str,
        child_table: &str,
        foreign_key: &str,
        primary_key: Option<&str>,
    ) {
        let primary_key = primary_key
            .map(str::to_string)
            .or_else(|| self.first_key_of(parent_table))
            .unwrap_or_else(|| UNRESOLVED_KEY.to_string());

        let key = Self::relationship_key(parent_table, child_table);
        let relationship = Relationship {
            parent_table: parent_table.to_string(),
            child_table: child_table.to_string(),
            primary_key,
            foreign_key: foreign_key.to_string(),
        };

        if relationship.is_complete() {
            self.incomplete.remove(&key);
        } else {
            self.incomplete.insert(key.clone());
        }
        self.edges.insert(key, relationship);
    }

    /// Import the edges and table registrations of `other`.
    ///
    /// An imported edge replaces the local edge for the same table pair. An
    /// imported edge without a primary key is resolved against local tables
    /// first, then against the tables of `other`.
    pub fn merge(&mut self, other: &DatabaseRelationship) {
        for (table, info) in &other.tables {
            self.tables
                .entry(table.clone())
                .or_insert_with(|| info.clone());
        }

        for (key, edge) in &other.edges {
            let mut edge = edge.clone();
            if !edge.is_complete() {
                if let Some(pk) = self
                    .first_key_of(&edge.parent_table)
                    .or_else(|| other.first_key_of(&edge.parent_table))
                {
                    edge.primary_key = pk;
                }
            }
            if edge.is_complete() {
                self.incomplete.remove(key);
            } else {
                self.incomplete.insert(key.clone());
            }
            self.edges.insert(key.clone(), edge);
        }

        self.resolve_incomplete();
    }

    pub fn edge(&self, key: &str) -> Option<&Relationship> {
        self.edges.get(key)
    }

    pub fn edges(&self) -> impl Iterator<Item = (&str, &Relationship)> {
        self.edges.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn incomplete_keys(&self) -> impl Iterator<Item = &str> {
        self.incomplete.iter().map(String::as_str)
    }

    pub fn table(&self, table: &str) -> Option<&TableInfo> {
        self.tables.get(table)
    }

    /// Edge keys connecting the tables in order, without duplicates.
    /// Empty when fewer than two tables are given or any pair is
    /// disconnected.
    pub fn get_relationship(&self, tables: &[&str]) -> Vec<String> {
        self.path_through(tables).unwrap_or_default()
    }

    /// A SELECT joining every table on the path through `tables`.
    pub fn get_query_instance(&self, tables: &[&str]) -> OrmResult<Query> {
        let first = *tables.first().ok_or(RelationshipError::NoTables)?;

        if tables.iter().all(|t| *t == first) {
            let mut query = Query::new().table(first);
            if self.is_soft_delete(first) {
                query = query.soft_delete(first);
            }
            return Ok(query);
        }

        let path = self.path_through(tables)?;
        let mut edges = Vec::with_capacity(path.len());
        for key in &path {
            let edge = self
                .edges
                .get(key)
                .ok_or_else(|| RelationshipError::InvalidConfiguration(format!("unknown edge '{}'", key)))?;
            if !edge.is_complete() {
                return Err(RelationshipError::IncompleteRelationship(key.clone()).into());
            }
            edges.push(edge);
        }

        let root = edges
            .first()
            .map(|edge| edge.parent_table.as_str())
            .unwrap_or(first);

        let mut joined: Vec<&str> = vec![root];
        let mut query = Query::new().table(root);
        for edge in edges {
            let target = if joined.contains(&edge.parent_table.as_str()) {
                edge.child_table.as_str()
            } else {
                edge.parent_table.as_str()
            };
            if joined.contains(&target) {
                continue;
            }
            query = query.join(target, &edge.join_condition());
            joined.push(target);
        }

        for table in &joined {
            if self.is_soft_delete(table) {
                query = query.soft_delete(table);
            }
        }

        Ok(query)
    }

    /// Shortest edge-key sequence from `start` to `end`.
    ///
    /// Neighbours are expanded in edge-key order, so ties always resolve
    /// the same way.
    pub fn find_path(&self, start: &str, end: &str) -> Option<Vec<String>> {
        if start == end {
            return Some(Vec::new());
        }

        let mut adjacency: BTreeMap<&str, Vec<(&str, &str)>> = BTreeMap::new();
        for (key, edge) in &self.edges {
            adjacency
                .entry(edge.parent_table.as_str())
                .or_default()
                .push((key.as_str(), edge.child_table.as_str()));
            adjacency
                .entry(edge.child_table.as_str())
                .or_default()
                .push((key.as_str(), edge.parent_table.as_str()));
        }

        let mut visited: BTreeSet<&str> = BTreeSet::new();
        let mut queue: VecDeque<(&str, Vec<String>)> = VecDeque::new();
        visited.insert(start);
        queue.push_back((start, Vec::new()));

        while let Some((table, path)) = queue.pop_front() {
            let Some(neighbours) = adjacency.get(table) else {
                continue;
            };
            for &(key, next) in neighbours {
                if !visited.insert(next) {
                    continue;
                }
                let mut next_path = path.clone();
                next_path.push(key.to_string());
                if next == end {
                    tracing::trace!(from = start, to = end, hops = next_path.len(), "relationship path found");
                    return Some(next_path);
                }
                queue.push_back((next, next_path));
            }
        }

        tracing::trace!(from = start, to = end, "no relationship path");
        None
    }

    fn path_through(&self, tables: &[&str]) -> Result<Vec<String>, RelationshipError> {
        if tables.len() < 2 {
            return Ok(Vec::new());
        }

        let mut path: Vec<String> = Vec::new();
        for pair in tables.windows(2) {
            let segment = self.find_path(pair[0], pair[1]).ok_or_else(|| RelationshipError::NoPath {
                from: pair[0].to_string(),
                to: pair[1].to_string(),
            })?;
            for key in segment {
                if !path.contains(&key) {
                    path.push(key);
                }
            }
        }
        Ok(path)
    }

    fn first_key_of(&self, table: &str) -> Option<String> {
        self.tables
            .get(table)
            .and_then(|info| info.primary_key.first().cloned())
    }

    fn is_soft_delete(&self, table: &str) -> bool {
        self.tables.get(table).is_some_and(|info| info.soft_delete)
    }

    fn resolve_incomplete(&mut self) {
        let pending: Vec<String> = self.incomplete.iter().cloned().collect();
        for key in pending {
            let Some(parent) = self.edges.get(&key).map(|e| e.parent_table.clone()) else {
                self.incomplete.remove(&key);
                continue;
            };
            if let Some(pk) = self.first_key_of(&parent) {
                if let Some(edge) = self.edges.get_mut(&key) {
                    edge.primary_key = pk;
                }
                self.incomplete.remove(&key);
            }
        }
    }
}
