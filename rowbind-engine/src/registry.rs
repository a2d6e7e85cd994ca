//! Schema and template cache keyed by record type.

use crate::error::{EngineError, EngineResult};
use rowbind_query::QueryTemplates;
use rowbind_schema::{Record, RecordRef, ReflectOptions, Schema};
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// A registered record type: its schema and the statements built from it.
#[derive(Debug)]
pub struct RegistryEntry {
    pub schema: Schema,
    pub templates: QueryTemplates,
}

/// Options for [`SchemaRegistry::register_with`].
#[derive(Debug, Clone, Default)]
pub struct RegisterOptions {
    /// Forces the table name instead of deriving it.
    pub table_name: Option<String>,
    /// Record type whose annotations are inherited by fields without their own.
    pub base: Option<RecordRef>,
    /// Annotation tag to read instead of the registry's default.
    pub tag: Option<String>,
}

impl RegisterOptions {
    pub fn table_name(mut self, name: &str) -> Self {
        self.table_name = Some(name.to_string());
        self
    }

    pub fn base<B: Record>(mut self) -> Self {
        self.base = Some(RecordRef::of::<B>());
        self
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.tag = Some(tag.to_string());
        self
    }
}

/// Caller-owned cache of derived schemas.
///
/// Entries are built lazily on first use and never evicted. A registered
/// schema is immutable; re-registering replaces it only on request.
#[derive(Debug)]
pub struct SchemaRegistry {
    table_prefix: String,
    tag: String,
    entries: RwLock<HashMap<TypeId, Arc<RegistryEntry>>>,
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new("", rowbind_schema::DEFAULT_TAG)
    }
}

impl SchemaRegistry {
    pub fn new(table_prefix: &str, tag: &str) -> Self {
        Self {
            table_prefix: table_prefix.to_string(),
            tag: tag.to_string(),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the entry for `T`, registering it with default options first.
    pub fn get_or_register<T: Record>(&self) -> EngineResult<Arc<RegistryEntry>> {
        self.get_or_register_ref(RecordRef::of::<T>())
    }

    /// Type-erased form of [`Self::get_or_register`], used to follow child links.
    pub fn get_or_register_ref(&self, record: RecordRef) -> EngineResult<Arc<RegistryEntry>> {
        if let Some(entry) = self.get_ref(record) {
            return Ok(entry);
        }
        self.insert(record, &RegisterOptions::default(), false)
    }

    /// Registers `T` with explicit options.
    ///
    /// An existing entry is kept (and returned) unless `overwrite` is set.
    pub fn register_with<T: Record>(
        &self,
        options: &RegisterOptions,
        overwrite: bool,
    ) -> EngineResult<Arc<RegistryEntry>> {
        self.insert(RecordRef::of::<T>(), options, overwrite)
    }

    pub fn get<T: Record>(&self) -> Option<Arc<RegistryEntry>> {
        self.get_ref(RecordRef::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get_ref(&self, record: RecordRef) -> Option<Arc<RegistryEntry>> {
        self.read().get(&record.type_id()).cloned()
    }

    fn insert(
        &self,
        record: RecordRef,
        options: &RegisterOptions,
        overwrite: bool,
    ) -> EngineResult<Arc<RegistryEntry>> {
        // The base is resolved first so it never re-enters under our write lock.
        let base = match options.base {
            Some(base) => Some(self.get_or_register_ref(base)?),
            None => None,
        };

        let descriptor = record.describe();
        let reflect = ReflectOptions {
            table_prefix: &self.table_prefix,
            table_name: options.table_name.as_deref(),
            base: base.as_ref().map(|entry| &entry.schema),
            tag: Some(options.tag.as_deref().unwrap_or(&self.tag)),
        };
        let schema = Schema::reflect(&descriptor, &reflect).map_err(|source| {
            EngineError::Registration {
                record: descriptor.type_name.clone(),
                source,
            }
        })?;
        let templates = QueryTemplates::build(&schema);

        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !overwrite {
            if let Some(existing) = entries.get(&record.type_id()) {
                debug!(record = %schema.type_name(), "schema already registered");
                return Ok(existing.clone());
            }
        }

        info!(
            record = %schema.type_name(),
            table = %schema.table_name(),
            columns = schema.fields().len(),
            "registered schema"
        );
        let entry = Arc::new(RegistryEntry { schema, templates });
        entries.insert(record.type_id(), entry.clone());
        Ok(entry)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<TypeId, Arc<RegistryEntry>>> {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
