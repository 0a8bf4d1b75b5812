//! Per-instance lifecycle of persistent objects.
//!
//! An [`Object<T>`] pairs the identity columns (`id`, `slug`, `context`,
//! timestamps) with the typed data `T`. It dereferences to `T`, so fields are
//! read and written directly:
//!
//! ```
//! use std::sync::Arc;
//! use serde::{Deserialize, Serialize};
//! use smrt_core::{FieldTable, SmrtObject, fields::text};
//! use smrt_sqlite::{Object, SqliteDatabase};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Page {
//!     name: String,
//! }
//!
//! impl SmrtObject for Page {
//!     const TYPE_NAME: &'static str = "Page";
//!
//!     fn fields() -> FieldTable {
//!         [text("name")].into_iter().collect()
//!     }
//! }
//!
//! let db = Arc::new(SqliteDatabase::open_in_memory().unwrap());
//! let mut page = Object::new(db.clone(), Page { name: "Hello World".into() });
//! page.save().unwrap();
//! assert_eq!(page.slug.as_deref(), Some("hello-world"));
//!
//! page.name = "Hello Again".into();
//! page.save().unwrap();
//!
//! let loaded = Object::<Page>::load_by_slug(db, "hello-world", "").unwrap().unwrap();
//! assert_eq!(loaded.name, "Hello Again");
//! ```

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, LazyLock, Mutex, PoisonError, Weak};

use chrono::{DateTime, Utc};
use serde_json::Value;
use smrt_core::{
    CoreError, HookEvent, ObjectTypeDescriptor, RESERVED_COLUMNS, Record, SmrtObject, compile,
    validate_identifier, validate_record,
};

use crate::convert::{decode_record, parse_timestamp};
use crate::database::Database;
use crate::error::{Result, SmrtError};
use crate::migration::synchronize;
use crate::schema::generate_schema_sql;
use crate::upsert::{build_upsert, derive_slug, resolve_identifier};

/// A descriptor bound to a database, with its memoized schema state.
///
/// Shared by a collection and every object it produces.
pub(crate) struct TypeBinding {
    pub(crate) db: Arc<dyn Database>,
    pub(crate) descriptor: Arc<ObjectTypeDescriptor>,
    schema_ready: Arc<Mutex<bool>>,
}

impl TypeBinding {
    pub(crate) fn new(db: Arc<dyn Database>, descriptor: Arc<ObjectTypeDescriptor>) -> Self {
        Self::with_schema_state(db, descriptor, Arc::new(Mutex::new(false)))
    }

    fn with_schema_state(
        db: Arc<dyn Database>,
        descriptor: Arc<ObjectTypeDescriptor>,
        schema_ready: Arc<Mutex<bool>>,
    ) -> Self {
        Self {
            db,
            descriptor,
            schema_ready,
        }
    }

    /// Synchronizes the schema once. Concurrent callers wait on the lock and
    /// see the recorded result; a failed attempt leaves the state unset so
    /// the next call retries. Returns `true` if this call synchronized.
    pub(crate) fn ensure_schema(&self) -> Result<bool> {
        let mut ready = self
            .schema_ready
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *ready {
            return Ok(false);
        }

        let sql = generate_schema_sql(&self.descriptor)?;
        let report = synchronize(self.db.as_ref(), &sql)?;
        tracing::debug!(
            type_name = %self.descriptor.name,
            tables_created = report.tables_created.len(),
            columns_added = report.columns_added.len(),
            "schema ready"
        );
        *ready = true;
        Ok(true)
    }

    pub(crate) fn table(&self) -> Result<&str> {
        Ok(validate_identifier(&self.descriptor.table_name)?)
    }

    /// Fetches the first row matching `filter`.
    pub(crate) fn fetch_one(&self, filter: &Record) -> Result<Option<Record>> {
        let table = self.table()?;
        let predicate = compile(filter)?;
        let mut sql = format!("SELECT * FROM {table}");
        if !predicate.is_empty() {
            sql.push(' ');
            sql.push_str(&predicate.fragment);
        }
        sql.push_str(" LIMIT 1");
        self.db.single(&sql, &predicate.values)
    }

    fn run_hook(&self, event: HookEvent, record: &mut Record) -> Result<()> {
        self.descriptor
            .config
            .hooks
            .run(event, record)
            .map_err(|message| SmrtError::Hook { event, message })
    }
}

/// A persistent object of type `T`.
pub struct Object<T: SmrtObject> {
    /// Primary key; assigned on first save.
    pub id: Option<String>,
    /// Unique alternate key; derived from `name` on save when unset.
    pub slug: Option<String>,
    /// Scope for slug lookups. Slugs stay unique across contexts.
    pub context: String,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    data: T,
    binding: Arc<TypeBinding>,
}

impl<T: SmrtObject> Object<T> {
    /// Wraps `data` as a new, unsaved object using `T`'s own descriptor.
    pub fn new(db: Arc<dyn Database>, data: T) -> Self {
        Self::with_binding(standalone_binding::<T>(db), data)
    }

    pub(crate) fn with_binding(binding: Arc<TypeBinding>, data: T) -> Self {
        Self {
            id: None,
            slug: None,
            context: String::new(),
            created_at: None,
            updated_at: None,
            data,
            binding,
        }
    }

    /// Builds an object from a record carrying identity keys and field values.
    ///
    /// Field values go through the type's factory. Keys that are not declared
    /// fields are ignored.
    pub(crate) fn from_record(binding: Arc<TypeBinding>, mut record: Record) -> Result<Self> {
        let id = take_string(&mut record, "id");
        let slug = take_string(&mut record, "slug");
        let context = take_string(&mut record, "context").unwrap_or_default();
        let created_at = record.remove("created_at").and_then(|v| parse_timestamp(&v));
        let updated_at = record.remove("updated_at").and_then(|v| parse_timestamp(&v));

        let descriptor = &binding.descriptor;
        decode_record(&descriptor.fields, &mut record);
        record.retain(|key, _| descriptor.fields.contains(key));
        let mut built = descriptor.build(record)?;
        for key in RESERVED_COLUMNS {
            built.remove(key);
        }
        let data: T = serde_json::from_value(Value::Object(built))?;

        Ok(Self {
            id,
            slug,
            context,
            created_at,
            updated_at,
            data,
            binding,
        })
    }

    /// Loads the object with this id.
    pub fn load_by_id(db: Arc<dyn Database>, id: &str) -> Result<Option<Self>> {
        let mut filter = Record::new();
        filter.insert("id".into(), Value::from(id));
        Self::load_where(standalone_binding::<T>(db), &filter)
    }

    /// Loads the object with this slug in this context.
    pub fn load_by_slug(db: Arc<dyn Database>, slug: &str, context: &str) -> Result<Option<Self>> {
        Self::load_where(standalone_binding::<T>(db), &slug_filter(slug, context))
    }

    pub(crate) fn load_where(binding: Arc<TypeBinding>, filter: &Record) -> Result<Option<Self>> {
        binding.ensure_schema()?;
        match binding.fetch_one(filter)? {
            Some(row) => Ok(Some(Self::from_record(binding, row)?)),
            None => Ok(None),
        }
    }

    /// Re-reads this object's row by id, or by slug and context when it has
    /// no id. Returns `false` if there is no such row.
    pub fn reload(&mut self) -> Result<bool> {
        let filter = match (&self.id, &self.slug) {
            (Some(id), _) => {
                let mut filter = Record::new();
                filter.insert("id".into(), Value::from(id.as_str()));
                filter
            }
            (None, Some(slug)) => slug_filter(slug, &self.context),
            (None, None) => return Ok(false),
        };
        let binding = Arc::clone(&self.binding);
        binding.ensure_schema()?;
        match binding.fetch_one(&filter)? {
            Some(row) => {
                *self = Self::from_record(binding, row)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn data(&self) -> &T {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut T {
        &mut self.data
    }

    pub fn into_data(self) -> T {
        self.data
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn descriptor(&self) -> &ObjectTypeDescriptor {
        &self.binding.descriptor
    }

    /// Returns `true` once the object has a stored row.
    pub fn is_saved(&self) -> bool {
        self.created_at.is_some()
    }

    /// Sets the slug from `name` if no slug is set. Returns the slug.
    pub fn derive_slug(&mut self) -> Result<Option<&str>> {
        if self.slug.is_none() {
            self.slug = derive_slug(&self.data_record()?);
        }
        Ok(self.slug.as_deref())
    }

    /// Assigns an id if none is set: the id of the row already stored under
    /// this slug and context, or a new UUID.
    pub fn resolve_identifier(&mut self) -> Result<&str> {
        let id = match self.id.take() {
            Some(id) => id,
            None => resolve_identifier(
                self.binding.db.as_ref(),
                self.binding.table()?,
                self.slug.as_deref(),
                &self.context,
            )?,
        };
        Ok(self.id.insert(id).as_str())
    }

    /// Field values of `T` as a record.
    pub fn data_record(&self) -> Result<Record> {
        match serde_json::to_value(&self.data)? {
            Value::Object(map) => Ok(map),
            other => Err(CoreError::Factory {
                type_name: T::TYPE_NAME.to_string(),
                message: format!("expected an object, got {other}"),
            }
            .into()),
        }
    }

    /// Field values plus identity columns and timestamps.
    pub fn to_record(&self) -> Result<Record> {
        let mut record = Record::new();
        record.insert("id".into(), self.id.as_deref().map_or(Value::Null, Value::from));
        record.insert("slug".into(), self.slug.as_deref().map_or(Value::Null, Value::from));
        record.insert("context".into(), Value::from(self.context.as_str()));
        record.extend(self.data_record()?);
        record.insert("created_at".into(), timestamp_value(self.created_at));
        record.insert("updated_at".into(), timestamp_value(self.updated_at));
        Ok(record)
    }

    /// Overwrites fields (and identity keys) present in `patch`.
    pub fn apply(&mut self, patch: Record) -> Result<()> {
        let mut record = self.data_record()?;
        record.extend(patch);
        self.absorb(record)
    }

    /// Takes identity keys and field values back from a record.
    fn absorb(&mut self, mut record: Record) -> Result<()> {
        if let Some(id) = take_string(&mut record, "id") {
            self.id = Some(id);
        }
        if let Some(slug) = take_string(&mut record, "slug") {
            self.slug = Some(slug);
        }
        if let Some(context) = take_string(&mut record, "context") {
            self.context = context;
        }
        for key in RESERVED_COLUMNS {
            record.remove(key);
        }
        self.data = serde_json::from_value(Value::Object(record))?;
        Ok(())
    }

    /// Writes the object.
    ///
    /// Ensures the schema, derives the slug, resolves the id, runs the
    /// before-hooks (which may edit the record), validates, and executes the
    /// guarded upsert. Timestamps are read back before the after-hooks run.
    ///
    /// # Errors
    ///
    /// [`SmrtError::KeyConflict`] if the id and slug belong to different
    /// stored rows; nothing is written in that case.
    pub fn save(&mut self) -> Result<()> {
        let binding = Arc::clone(&self.binding);
        binding.ensure_schema()?;
        let table = binding.table()?;

        self.derive_slug()?;
        let id = self.resolve_identifier()?.to_string();
        let is_update = binding
            .db
            .pluck(
                &format!("SELECT 1 FROM {table} WHERE id = ?1"),
                &[Value::from(id.as_str())],
            )?
            .is_some();
        let (before, after) = if is_update {
            (HookEvent::BeforeUpdate, HookEvent::AfterUpdate)
        } else {
            (HookEvent::BeforeCreate, HookEvent::AfterCreate)
        };

        let mut record = self.to_record()?;
        binding.run_hook(HookEvent::BeforeSave, &mut record)?;
        binding.run_hook(before, &mut record)?;
        self.absorb(record)?;

        let record = self.data_record()?;
        let errors = validate_record(&binding.descriptor.fields, &record);
        if !errors.is_empty() {
            return Err(SmrtError::Validation {
                type_name: T::TYPE_NAME.to_string(),
                errors,
            });
        }

        let id = self.id.clone().unwrap_or(id);
        let stmt = build_upsert(
            &binding.descriptor,
            &id,
            self.slug.as_deref(),
            &self.context,
            &record,
        )?;
        let changed = binding.db.execute(&stmt.sql, &stmt.params)?;
        if changed == 0 {
            return Err(SmrtError::KeyConflict {
                id,
                slug: self.slug.clone().unwrap_or_default(),
            });
        }
        tracing::debug!(type_name = T::TYPE_NAME, id = %id, update = is_update, "saved object");

        self.id = Some(id);
        self.reload_timestamps()?;

        let mut record = self.to_record()?;
        binding.run_hook(after, &mut record)?;
        binding.run_hook(HookEvent::AfterSave, &mut record)?;
        Ok(())
    }

    fn reload_timestamps(&mut self) -> Result<()> {
        let Some(id) = self.id.as_deref() else {
            return Ok(());
        };
        let table = self.binding.table()?;
        let row = self.binding.db.single(
            &format!("SELECT created_at, updated_at FROM {table} WHERE id = ?1"),
            &[Value::from(id)],
        )?;
        if let Some(row) = row {
            self.created_at = row.get("created_at").and_then(parse_timestamp);
            self.updated_at = row.get("updated_at").and_then(parse_timestamp);
        }
        Ok(())
    }

    /// Deletes the stored row. Returns `false` if no row was removed.
    ///
    /// # Errors
    ///
    /// [`SmrtError::NotSaved`] if the object has no id.
    pub fn delete(&mut self) -> Result<bool> {
        let Some(id) = self.id.clone() else {
            return Err(SmrtError::NotSaved(T::TYPE_NAME.to_string()));
        };
        let binding = Arc::clone(&self.binding);
        binding.ensure_schema()?;
        let table = binding.table()?;

        let mut record = self.to_record()?;
        binding.run_hook(HookEvent::BeforeDelete, &mut record)?;
        let removed = binding.db.execute(
            &format!("DELETE FROM {table} WHERE id = ?1"),
            &[Value::from(id.as_str())],
        )?;
        self.created_at = None;
        self.updated_at = None;
        binding.run_hook(HookEvent::AfterDelete, &mut record)?;

        tracing::debug!(type_name = T::TYPE_NAME, id = %id, removed, "deleted object");
        Ok(removed > 0)
    }
}

impl<T: SmrtObject> Deref for Object<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.data
    }
}

impl<T: SmrtObject> DerefMut for Object<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.data
    }
}

impl<T: SmrtObject + fmt::Debug> fmt::Debug for Object<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("type", &T::TYPE_NAME)
            .field("id", &self.id)
            .field("slug", &self.slug)
            .field("context", &self.context)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .field("data", &self.data)
            .finish()
    }
}

/// Schema state for objects created outside a collection, keyed by database
/// and type. The weak handle keeps the database allocation from being reused
/// while its entry exists, so pointer equality identifies it.
struct StandaloneSchema {
    db: Weak<dyn Database>,
    type_name: &'static str,
    ready: Arc<Mutex<bool>>,
}

static STANDALONE_SCHEMAS: LazyLock<Mutex<Vec<StandaloneSchema>>> =
    LazyLock::new(|| Mutex::new(Vec::new()));

fn standalone_binding<T: SmrtObject>(db: Arc<dyn Database>) -> Arc<TypeBinding> {
    let ready = {
        let mut schemas = STANDALONE_SCHEMAS
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        schemas.retain(|entry| entry.db.strong_count() > 0);

        let handle = Arc::downgrade(&db);
        match schemas
            .iter()
            .find(|entry| entry.type_name == T::TYPE_NAME && entry.db.ptr_eq(&handle))
        {
            Some(entry) => Arc::clone(&entry.ready),
            None => {
                let ready = Arc::new(Mutex::new(false));
                schemas.push(StandaloneSchema {
                    db: handle,
                    type_name: T::TYPE_NAME,
                    ready: Arc::clone(&ready),
                });
                ready
            }
        }
    };
    Arc::new(TypeBinding::with_schema_state(
        db,
        Arc::new(ObjectTypeDescriptor::of::<T>()),
        ready,
    ))
}

pub(crate) fn slug_filter(slug: &str, context: &str) -> Record {
    let mut filter = Record::new();
    filter.insert("slug".into(), Value::from(slug));
    filter.insert("context".into(), Value::from(context));
    filter
}

fn take_string(record: &mut Record, key: &str) -> Option<String> {
    match record.remove(key)? {
        Value::String(s) => Some(s),
        _ => None,
    }
}

fn timestamp_value(ts: Option<DateTime<Utc>>) -> Value {
    ts.map_or(Value::Null, |t| {
        Value::from(t.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::SqliteDatabase;
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use smrt_core::fields::{decimal, integer, text};
    use smrt_core::{FieldTable, Hooks, ObjectConfig};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        name: String,
        #[serde(default)]
        body: Option<String>,
    }

    impl SmrtObject for Note {
        const TYPE_NAME: &'static str = "Note";

        fn fields() -> FieldTable {
            [text("name").required(), text("body")].into_iter().collect()
        }
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Counter {
        name: String,
        hits: i64,
    }

    impl SmrtObject for Counter {
        const TYPE_NAME: &'static str = "Counter";

        fn fields() -> FieldTable {
            [text("name"), integer("hits").min(0.0)].into_iter().collect()
        }

        fn config() -> ObjectConfig {
            ObjectConfig::default().with_hooks(
                Hooks::new()
                    .on(HookEvent::BeforeCreate, |record| {
                        record.insert("hits".into(), json!(1));
                        Ok(())
                    })
                    .on(HookEvent::BeforeDelete, |record| {
                        if record.get("name") == Some(&json!("locked")) {
                            Err("locked counters cannot be deleted".into())
                        } else {
                            Ok(())
                        }
                    }),
            )
        }
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Price {
        amount: f64,
    }

    impl SmrtObject for Price {
        const TYPE_NAME: &'static str = "Price";

        fn fields() -> FieldTable {
            [decimal("amount").min(0.0)].into_iter().collect()
        }
    }

    fn db() -> Arc<dyn Database> {
        Arc::new(SqliteDatabase::open_in_memory().unwrap())
    }

    fn note(name: &str) -> Note {
        Note {
            name: name.to_string(),
            body: None,
        }
    }

    #[test]
    fn test_save_derives_slug_and_id() {
        let db = db();
        let mut obj = Object::new(db, note("Hello World"));
        assert!(!obj.is_saved());
        obj.save().unwrap();
        assert_eq!(obj.slug.as_deref(), Some("hello-world"));
        assert!(smrt_core::is_uuid(obj.id.as_deref().unwrap()));
        assert!(obj.is_saved());
        assert!(obj.created_at().is_some());
    }

    #[test]
    fn test_explicit_slug_is_kept() {
        let db = db();
        let mut obj = Object::new(db, note("Hello World"));
        obj.slug = Some("custom".into());
        obj.save().unwrap();
        assert_eq!(obj.slug.as_deref(), Some("custom"));
    }

    #[test]
    fn test_load_by_id_and_slug() {
        let db = db();
        let mut obj = Object::new(db.clone(), note("Alpha"));
        obj.body = Some("text".into());
        obj.save().unwrap();
        let id = obj.id.clone().unwrap();

        let by_id = Object::<Note>::load_by_id(db.clone(), &id).unwrap().unwrap();
        assert_eq!(by_id.data(), obj.data());
        assert_eq!(by_id.slug.as_deref(), Some("alpha"));

        let by_slug = Object::<Note>::load_by_slug(db.clone(), "alpha", "").unwrap().unwrap();
        assert_eq!(by_slug.id.as_deref(), Some(id.as_str()));
        assert!(Object::<Note>::load_by_slug(db, "alpha", "elsewhere").unwrap().is_none());
    }

    #[test]
    fn test_same_slug_in_new_object_reuses_id() {
        let db = db();
        let mut first = Object::new(db.clone(), note("Same"));
        first.save().unwrap();

        let mut second = Object::new(db.clone(), note("Same"));
        second.body = Some("updated".into());
        second.save().unwrap();
        assert_eq!(first.id, second.id);

        first.reload().unwrap();
        assert_eq!(first.body.as_deref(), Some("updated"));
    }

    #[test]
    fn test_validation_blocks_save() {
        let db = db();
        let mut negative = Object::new(db.clone(), Price { amount: -1.0 });
        let err = negative.save().unwrap_err();
        assert!(matches!(err, SmrtError::Validation { ref type_name, .. } if type_name == "Price"));
        assert!(!negative.is_saved());

        let stored = db.pluck("SELECT COUNT(*) FROM prices", &[]).unwrap();
        assert_eq!(stored, Some(json!(0)));
    }

    #[test]
    fn test_before_create_hook_edits_record() {
        let db = db();
        let mut counter = Object::new(db, Counter { name: "c".into(), hits: 0 });
        counter.save().unwrap();
        assert_eq!(counter.hits, 1);

        counter.hits = 5;
        counter.save().unwrap();
        assert_eq!(counter.hits, 5);
    }

    #[test]
    fn test_hook_error_aborts_delete() {
        let db = db();
        let mut counter = Object::new(db.clone(), Counter { name: "locked".into(), hits: 0 });
        counter.save().unwrap();
        let err = counter.delete().unwrap_err();
        assert!(matches!(err, SmrtError::Hook { event: HookEvent::BeforeDelete, .. }));
        assert!(Object::<Counter>::load_by_id(db, counter.id.as_deref().unwrap())
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_delete_removes_row() {
        let db = db();
        let mut obj = Object::new(db.clone(), note("Gone"));
        assert!(matches!(obj.delete(), Err(SmrtError::NotSaved(_))));
        obj.save().unwrap();
        assert!(obj.delete().unwrap());
        assert!(!obj.is_saved());
        assert!(Object::<Note>::load_by_slug(db, "gone", "").unwrap().is_none());
    }

    #[test]
    fn test_standalone_objects_share_schema_state() {
        let db = db();
        let first = standalone_binding::<Note>(db.clone());
        assert!(first.ensure_schema().unwrap());

        let second = standalone_binding::<Note>(db.clone());
        assert!(!second.ensure_schema().unwrap());

        let other_type = standalone_binding::<Price>(db.clone());
        assert!(other_type.ensure_schema().unwrap());

        let fresh = standalone_binding::<Note>(self::db());
        assert!(fresh.ensure_schema().unwrap());
    }

    #[test]
    fn test_rapid_double_saves_bump_updated_at() {
        let db = db();
        for i in 0..50 {
            let mut obj = Object::new(db.clone(), note(&format!("Rapid {i}")));
            obj.save().unwrap();
            let first = obj.updated_at().unwrap();
            obj.save().unwrap();
            assert!(obj.updated_at().unwrap() > first);
        }
    }

    #[test]
    fn test_slug_taken_in_another_context_conflicts() {
        let db = db();
        let mut home = Object::new(db.clone(), note("Shared"));
        home.save().unwrap();

        let mut away = Object::new(db.clone(), note("Shared"));
        away.context = "away".into();
        let err = away.save().unwrap_err();
        assert!(matches!(err, SmrtError::KeyConflict { ref slug, .. } if slug == "shared"));
        assert!(Object::<Note>::load_by_slug(db, "shared", "away").unwrap().is_none());
    }

    #[test]
    fn test_to_record_shape() {
        let db = db();
        let mut obj = Object::new(db, note("Shape"));
        obj.save().unwrap();
        let record = obj.to_record().unwrap();
        let keys: Vec<&str> = record.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            ["id", "slug", "context", "name", "body", "created_at", "updated_at"]
        );
        assert_eq!(record["body"], Value::Null);
    }
}
