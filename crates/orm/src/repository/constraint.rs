//! Checks run before an existing row is overwritten

use std::fmt;
use std::sync::Arc;

use crate::error::{ModelError, OrmResult};
use crate::value::Params;

/// Receives the stored instance and the instance about to be written
pub type ConstraintFn = dyn Fn(&Params, &Params) -> OrmResult<()> + Send + Sync;

#[derive(Clone)]
enum Check {
    NewValuesOnly(Vec<String>),
    Closure(Arc<ConstraintFn>),
}

/// Rules an update has to satisfy. Every rule must pass.
#[derive(Clone, Default)]
pub struct UpdateConstraint {
    checks: Vec<Check>,
}

impl UpdateConstraint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject an update that leaves any of `properties` unchanged
    pub fn allow_only_new_values_for_fields(mut self, properties: &[&str]) -> Self {
        self.checks.push(Check::NewValuesOnly(
            properties.iter().map(|p| p.to_string()).collect(),
        ));
        self
    }

    pub fn with_closure<F>(mut self, f: F) -> Self
    where
        F: Fn(&Params, &Params) -> OrmResult<()> + Send + Sync + 'static,
    {
        self.checks.push(Check::Closure(Arc::new(f)));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    pub fn check(&self, old: &Params, new: &Params) -> OrmResult<()> {
        for check in &self.checks {
            match check {
                Check::NewValuesOnly(properties) => {
                    for property in properties {
                        let (Some(before), Some(after)) = (old.get(property), new.get(property)) else {
                            return Err(ModelError::ConstraintViolation(format!(
                                "property '{}' cannot be read",
                                property
                            )));
                        };
                        if before == after {
                            return Err(ModelError::ConstraintViolation(format!(
                                "property '{}' only accepts new values",
                                property
                            )));
                        }
                    }
                }
                Check::Closure(f) => f(old, new)?,
            }
        }
        Ok(())
    }
}

impl fmt::Debug for UpdateConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateConstraint")
            .field("checks", &self.checks.len())
            .finish()
    }
}
