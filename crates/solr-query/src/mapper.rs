//! Field name mapping between the datastore API and the Solr schema.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, ErrorKind, Result};

/// Name under which [`default_field_mapper`] is registered.
pub const DEFAULT_MAPPER: &str = "default";

/// Map an API field name to a Solr field name by dropping every character
/// outside `[a-zA-Z0-9_]`.
///
/// ```rust
/// use datasolr_query::default_field_mapper;
///
/// assert_eq!(default_field_mapper("Scientific name (2)"), "Scientificname2");
/// ```
pub fn default_field_mapper(field: &str) -> String {
    field
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

/// A pure function from API field names to Solr field names.
#[derive(Clone)]
pub struct FieldMapper {
    name: String,
    map: Arc<dyn Fn(&str) -> String + Send + Sync>,
}

impl FieldMapper {
    pub fn new<F>(name: impl Into<String>, map: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            map: Arc::new(map),
        }
    }

    pub fn map(&self, field: &str) -> String {
        (self.map)(field)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Default for FieldMapper {
    fn default() -> Self {
        FieldMapper::new(DEFAULT_MAPPER, default_field_mapper)
    }
}

impl fmt::Debug for FieldMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldMapper")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Named field mappers that configuration can refer to.
///
/// The `default` mapper is always present.
#[derive(Debug, Clone)]
pub struct FieldMapperRegistry {
    mappers: HashMap<String, FieldMapper>,
}

impl Default for FieldMapperRegistry {
    fn default() -> Self {
        let mut mappers = HashMap::new();
        mappers.insert(DEFAULT_MAPPER.to_string(), FieldMapper::default());
        Self { mappers }
    }
}

impl FieldMapperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `map` under `name`, replacing any mapper of the same name.
    pub fn register<F>(&mut self, name: impl Into<String>, map: F) -> &mut Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        let name = name.into();
        self.mappers
            .insert(name.clone(), FieldMapper::new(name, map));
        self
    }

    /// Look up a mapper. `None` selects the default mapper.
    pub fn resolve(&self, name: Option<&str>) -> Result<FieldMapper> {
        let name = name.unwrap_or(DEFAULT_MAPPER);
        self.mappers.get(name).cloned().ok_or_else(|| {
            Error::new(ErrorKind::Config(format!("Unknown field mapper: {}", name)))
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.mappers.contains_key(name)
    }
}
