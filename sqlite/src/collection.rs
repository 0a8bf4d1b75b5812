//! Per-type collection façade.
//!
//! A [`Collection<T>`] binds one registered type to a database and offers the
//! set-level operations: lookup, listing, counting, creation, and
//! get-or-upsert. The schema is synchronized lazily, once per collection.
//!
//! [`DynCollection`] is the type-erased JSON view of a collection, stored in
//! the registry so tooling can drive any type by name.

use std::marker::PhantomData;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smrt_core::{
    FieldTable, ObjectTypeDescriptor, RESERVED_COLUMNS, Record, SmrtObject, TypeRegistry, compile,
    is_uuid,
};

use crate::convert::decode_record;
use crate::database::Database;
use crate::error::{Result, SmrtError};
use crate::object::{Object, TypeBinding, slug_filter};

static ORDER_BY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z0-9_]+)(?:\s+((?i:ASC|DESC)))?\s*$")
        .expect("static regex must compile")
});

/// How to find a single object.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// A UUID-shaped string is an id; anything else is a slug in the empty
    /// context.
    Key(String),
    /// A filter object, used as-is.
    Filter(Record),
}

impl Lookup {
    /// Converts the lookup to a filter object.
    pub fn into_filter(self) -> Record {
        match self {
            Lookup::Key(key) if is_uuid(&key) => {
                let mut filter = Record::new();
                filter.insert("id".into(), Value::from(key));
                filter
            }
            Lookup::Key(key) => slug_filter(&key, ""),
            Lookup::Filter(filter) => filter,
        }
    }
}

impl From<&str> for Lookup {
    fn from(key: &str) -> Self {
        Lookup::Key(key.to_string())
    }
}

impl From<String> for Lookup {
    fn from(key: String) -> Self {
        Lookup::Key(key)
    }
}

impl From<Record> for Lookup {
    fn from(filter: Record) -> Self {
        Lookup::Filter(filter)
    }
}

/// Options for [`Collection::list`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListOptions {
    /// Filter object compiled with the predicate compiler.
    #[serde(rename = "where", default)]
    pub filter: Record,
    #[serde(default)]
    pub offset: Option<u64>,
    #[serde(default)]
    pub limit: Option<u64>,
    /// Entries of the form `field [ASC|DESC]`.
    #[serde(default)]
    pub order_by: Vec<String>,
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Record) -> Self {
        self.filter = filter;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn order_by(mut self, entry: impl Into<String>) -> Self {
        self.order_by.push(entry.into());
        self
    }
}

/// Validates `order_by` entries and renders them as `field DIR` terms.
fn order_terms(entries: &[String]) -> Result<Vec<String>> {
    entries
        .iter()
        .map(|entry| {
            let captures = ORDER_BY_RE
                .captures(entry)
                .ok_or_else(|| SmrtError::InvalidOrderBy(entry.clone()))?;
            let field = &captures[1];
            Ok(match captures.get(2) {
                Some(dir) => format!("{field} {}", dir.as_str().to_ascii_uppercase()),
                None => field.to_string(),
            })
        })
        .collect()
}

/// The set-level API for one object type.
pub struct Collection<T: SmrtObject> {
    binding: Arc<TypeBinding>,
    _type: PhantomData<fn() -> T>,
}

impl<T: SmrtObject> Collection<T> {
    /// Opens the collection for `T` as registered in `registry`.
    ///
    /// # Errors
    ///
    /// [`SmrtError::UnknownType`] if `T` is not registered, and
    /// [`SmrtError::MissingFactory`] if its descriptor has no factory.
    pub fn new(registry: &TypeRegistry, db: Arc<dyn Database>) -> Result<Self> {
        let descriptor = registry
            .get(T::TYPE_NAME)
            .ok_or_else(|| SmrtError::UnknownType(T::TYPE_NAME.to_string()))?;
        Self::from_descriptor(descriptor, db)
    }

    /// Opens a collection over an explicit descriptor.
    pub fn from_descriptor(descriptor: Arc<ObjectTypeDescriptor>, db: Arc<dyn Database>) -> Result<Self> {
        if descriptor.factory.is_none() {
            return Err(SmrtError::MissingFactory(descriptor.name.clone()));
        }
        Ok(Self {
            binding: Arc::new(TypeBinding::new(db, descriptor)),
            _type: PhantomData,
        })
    }

    pub fn descriptor(&self) -> &ObjectTypeDescriptor {
        &self.binding.descriptor
    }

    pub fn database(&self) -> &Arc<dyn Database> {
        &self.binding.db
    }

    /// Synchronizes the schema unless a previous call already did. Returns
    /// `true` if this call ran the synchronization.
    pub fn ensure_schema(&self) -> Result<bool> {
        self.binding.ensure_schema()
    }

    /// Fetches one object by id, slug, or filter object.
    ///
    /// ```
    /// # use std::sync::Arc;
    /// # use serde::{Deserialize, Serialize};
    /// # use smrt_core::{FieldTable, SmrtObject, TypeRegistry, fields::text};
    /// # use smrt_sqlite::{Collection, SqliteDatabase};
    /// # #[derive(Serialize, Deserialize)]
    /// # struct Tag { name: String }
    /// # impl SmrtObject for Tag {
    /// #     const TYPE_NAME: &'static str = "Tag";
    /// #     fn fields() -> FieldTable { [text("name")].into_iter().collect() }
    /// # }
    /// let registry = TypeRegistry::new();
    /// registry.register_type::<Tag>().unwrap();
    /// let tags = Collection::<Tag>::new(&registry, Arc::new(SqliteDatabase::open_in_memory().unwrap())).unwrap();
    ///
    /// let mut tag = tags.create(serde_json::json!({"name": "Rust Lang"}).as_object().cloned().unwrap()).unwrap();
    /// tag.save().unwrap();
    ///
    /// let by_slug = tags.get("rust-lang").unwrap().unwrap();
    /// let by_id = tags.get(by_slug.id.clone().unwrap()).unwrap().unwrap();
    /// assert_eq!(by_id.name, "Rust Lang");
    /// ```
    pub fn get(&self, lookup: impl Into<Lookup>) -> Result<Option<Object<T>>> {
        Object::load_where(Arc::clone(&self.binding), &lookup.into().into_filter())
    }

    /// Builds the `SELECT` for [`list`](Self::list) without running it.
    ///
    /// `order_by` is checked before anything else. Limit and offset bind after
    /// the filter values.
    pub fn list_query(&self, options: &ListOptions) -> Result<(String, Vec<Value>)> {
        let order = order_terms(&options.order_by)?;
        let table = self.binding.table()?;
        let predicate = compile(&options.filter)?;

        let mut sql = format!("SELECT * FROM {table}");
        if !predicate.is_empty() {
            sql.push(' ');
            sql.push_str(&predicate.fragment);
        }
        if !order.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&order.join(", "));
        }

        let mut next = predicate.next_index();
        let mut values = predicate.values;
        match (options.limit, options.offset) {
            (Some(limit), offset) => {
                sql.push_str(&format!(" LIMIT ${next}"));
                values.push(Value::from(limit));
                next += 1;
                if let Some(offset) = offset {
                    sql.push_str(&format!(" OFFSET ${next}"));
                    values.push(Value::from(offset));
                }
            }
            (None, Some(offset)) => {
                sql.push_str(&format!(" LIMIT -1 OFFSET ${next}"));
                values.push(Value::from(offset));
            }
            (None, None) => {}
        }
        Ok((sql, values))
    }

    /// Lists objects matching `options`.
    ///
    /// # Errors
    ///
    /// [`SmrtError::InvalidOrderBy`] for an `order_by` entry that is not
    /// `field [ASC|DESC]`; no query runs in that case.
    pub fn list(&self, options: &ListOptions) -> Result<Vec<Object<T>>> {
        let (sql, values) = self.list_query(options)?;
        self.ensure_schema()?;
        self.binding
            .db
            .query(&sql, &values)?
            .into_iter()
            .map(|row| Object::from_record(Arc::clone(&self.binding), row))
            .collect()
    }

    /// Counts objects matching `filter`.
    pub fn count(&self, filter: &Record) -> Result<u64> {
        let table = self.binding.table()?;
        let predicate = compile(filter)?;
        self.ensure_schema()?;
        let mut sql = format!("SELECT COUNT(*) FROM {table}");
        if !predicate.is_empty() {
            sql.push(' ');
            sql.push_str(&predicate.fragment);
        }
        let count = self.binding.db.pluck(&sql, &predicate.values)?;
        Ok(count.and_then(|v| v.as_u64()).unwrap_or(0))
    }

    /// Builds a new, unsaved object from `options` through the type factory.
    ///
    /// `id`, `slug`, and `context` in `options` become the identity keys.
    pub fn create(&self, options: Record) -> Result<Object<T>> {
        Object::from_record(Arc::clone(&self.binding), options)
    }

    /// Finds the object matching `data` and applies changed fields, or
    /// creates one from `defaults` overlaid with `data`.
    ///
    /// The match key is `id` when present, else `slug` (with `context`), else
    /// every declared column in `data`. An existing object is saved only if a
    /// declared field actually differs once `data` is read as `T`, so `9` and
    /// `9.0` for a decimal field are the same value.
    pub fn get_or_upsert(&self, data: Record, defaults: Record) -> Result<Object<T>> {
        if let Some(mut object) = self.find_match(&data)? {
            let current = object.data_record()?;
            let diff = changed_fields::<T>(&self.descriptor().fields, &current, &data)?;
            if !diff.is_empty() {
                tracing::debug!(
                    type_name = T::TYPE_NAME,
                    fields = diff.len(),
                    "updating matched object"
                );
                object.apply(diff)?;
                object.save()?;
            }
            return Ok(object);
        }

        let mut merged = defaults;
        merged.extend(data);
        let mut object = self.create(merged)?;
        object.save()?;
        Ok(object)
    }

    fn find_match(&self, data: &Record) -> Result<Option<Object<T>>> {
        let mut filter = Record::new();
        if let Some(id) = data.get("id").and_then(Value::as_str) {
            filter.insert("id".into(), Value::from(id));
        } else if let Some(slug) = data.get("slug").and_then(Value::as_str) {
            let context = data.get("context").and_then(Value::as_str).unwrap_or("");
            filter = slug_filter(slug, context);
        } else {
            let fields = &self.descriptor().fields;
            for (key, value) in data {
                let is_column = fields.get(key).is_some_and(|f| f.has_column())
                    || RESERVED_COLUMNS.contains(&key.as_str());
                if is_column {
                    filter.insert(key.clone(), value.clone());
                }
            }
        }
        if filter.is_empty() {
            return Ok(None);
        }
        self.get(filter)
    }

    /// Deletes the object found by `lookup`. Returns `false` if none matched.
    pub fn delete(&self, lookup: impl Into<Lookup>) -> Result<bool> {
        match self.get(lookup)? {
            Some(mut object) => object.delete(),
            None => Ok(false),
        }
    }
}

/// Declared fields of `data` whose value differs from `current` after both
/// are normalized through `T`.
fn changed_fields<T: SmrtObject>(
    fields: &FieldTable,
    current: &Record,
    data: &Record,
) -> Result<Record> {
    let mut proposed = current.clone();
    proposed.extend(
        data.iter()
            .filter(|(key, _)| fields.contains(key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone())),
    );
    decode_record(fields, &mut proposed);
    let typed: T = serde_json::from_value(Value::Object(proposed))?;
    let Value::Object(normalized) = serde_json::to_value(typed)? else {
        return Ok(Record::new());
    };
    Ok(normalized
        .into_iter()
        .filter(|(key, value)| current.get(key) != Some(value))
        .collect())
}

impl<T: SmrtObject> std::fmt::Debug for Collection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("type", &T::TYPE_NAME)
            .field("table", &self.binding.descriptor.table_name)
            .finish()
    }
}

/// Object-safe JSON view of a [`Collection`].
pub trait DynCollection: Send + Sync {
    fn type_name(&self) -> &str;

    fn descriptor(&self) -> &ObjectTypeDescriptor;

    fn get_record(&self, lookup: Lookup) -> Result<Option<Record>>;

    fn list_records(&self, options: &ListOptions) -> Result<Vec<Record>>;

    fn count_records(&self, filter: &Record) -> Result<u64>;

    /// Creates and saves an object from `record`.
    fn create_record(&self, record: Record) -> Result<Record>;

    fn upsert_record(&self, data: Record, defaults: Record) -> Result<Record>;

    fn delete_record(&self, lookup: Lookup) -> Result<bool>;
}

impl<T: SmrtObject> DynCollection for Collection<T> {
    fn type_name(&self) -> &str {
        T::TYPE_NAME
    }

    fn descriptor(&self) -> &ObjectTypeDescriptor {
        &self.binding.descriptor
    }

    fn get_record(&self, lookup: Lookup) -> Result<Option<Record>> {
        self.get(lookup)?.map(|o| o.to_record()).transpose()
    }

    fn list_records(&self, options: &ListOptions) -> Result<Vec<Record>> {
        self.list(options)?.iter().map(Object::to_record).collect()
    }

    fn count_records(&self, filter: &Record) -> Result<u64> {
        self.count(filter)
    }

    fn create_record(&self, record: Record) -> Result<Record> {
        let mut object = self.create(record)?;
        object.save()?;
        object.to_record()
    }

    fn upsert_record(&self, data: Record, defaults: Record) -> Result<Record> {
        self.get_or_upsert(data, defaults)?.to_record()
    }

    fn delete_record(&self, lookup: Lookup) -> Result<bool> {
        self.delete(lookup)
    }
}

/// Registers `T` (if needed), opens its collection, and records the erased
/// collection in the registry under `T::TYPE_NAME`.
pub fn register_collection<T: SmrtObject>(
    registry: &TypeRegistry,
    db: Arc<dyn Database>,
) -> Result<Arc<Collection<T>>> {
    registry.register_type::<T>()?;
    let collection = Arc::new(Collection::<T>::new(registry, db)?);
    let erased: Arc<dyn DynCollection> = collection.clone();
    registry.register_collection(T::TYPE_NAME, Arc::new(erased))?;
    Ok(collection)
}

/// Looks up a collection recorded by [`register_collection`].
pub fn open_collection(registry: &TypeRegistry, name: &str) -> Option<Arc<dyn DynCollection>> {
    registry
        .get_collection_as::<Arc<dyn DynCollection>>(name)
        .map(|handle| Arc::clone(&*handle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::SqliteDatabase;
    use serde_json::json;
    use smrt_core::FieldTable;
    use smrt_core::fields::{decimal, text};

    #[derive(Debug, Serialize, Deserialize)]
    struct Item {
        name: String,
        #[serde(default)]
        price: f64,
    }

    impl SmrtObject for Item {
        const TYPE_NAME: &'static str = "Item";

        fn fields() -> FieldTable {
            [text("name"), decimal("price")].into_iter().collect()
        }
    }

    fn collection() -> Collection<Item> {
        let registry = TypeRegistry::new();
        registry.register_type::<Item>().unwrap();
        Collection::new(&registry, Arc::new(SqliteDatabase::open_in_memory().unwrap())).unwrap()
    }

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_lookup_dispatch() {
        let id = "550e8400-e29b-41d4-a716-446655440000";
        assert_eq!(Lookup::from(id).into_filter(), record(json!({"id": id})));
        assert_eq!(
            Lookup::from("my-item").into_filter(),
            record(json!({"slug": "my-item", "context": ""}))
        );
        let filter = record(json!({"price >": 3}));
        assert_eq!(Lookup::from(filter.clone()).into_filter(), filter);
    }

    #[test]
    fn test_order_terms() {
        assert_eq!(
            order_terms(&["price desc".into(), "name".into(), " created_at ASC ".into()]).unwrap(),
            vec!["price DESC", "name", "created_at ASC"]
        );
        for bad in ["price; DROP TABLE items", "price DESC, name", "price sideways", ""] {
            assert!(matches!(
                order_terms(&[bad.to_string()]),
                Err(SmrtError::InvalidOrderBy(_))
            ));
        }
    }

    #[test]
    fn test_list_query_shapes() {
        let items = collection();
        let (sql, values) = items.list_query(&ListOptions::new().limit(10)).unwrap();
        assert_eq!(sql, "SELECT * FROM items LIMIT $1");
        assert_eq!(values, vec![json!(10)]);

        let options = ListOptions::new()
            .filter(record(json!({"price >": 5})))
            .order_by("price DESC")
            .limit(2)
            .offset(4);
        let (sql, values) = items.list_query(&options).unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM items WHERE price > $1 ORDER BY price DESC LIMIT $2 OFFSET $3"
        );
        assert_eq!(values, vec![json!(5), json!(2), json!(4)]);

        let (sql, _) = items.list_query(&ListOptions::new().offset(3)).unwrap();
        assert_eq!(sql, "SELECT * FROM items LIMIT -1 OFFSET $1");
    }

    #[test]
    fn test_create_does_not_persist() {
        let items = collection();
        let item = items
            .create(record(json!({"name": "Draft", "slug": "draft", "price": 1.5})))
            .unwrap();
        assert_eq!(item.slug.as_deref(), Some("draft"));
        assert!(!item.is_saved());
        assert_eq!(items.count(&Record::new()).unwrap(), 0);
    }

    #[test]
    fn test_list_count_and_delete() {
        let items = collection();
        for (name, price) in [("A", 1.0), ("B", 2.0), ("C", 3.0)] {
            items
                .create(record(json!({"name": name, "price": price})))
                .unwrap()
                .save()
                .unwrap();
        }
        let cheap = items
            .list(&ListOptions::new().filter(record(json!({"price <": 2.5}))).order_by("price DESC"))
            .unwrap();
        assert_eq!(cheap.iter().map(|o| o.name.as_str()).collect::<Vec<_>>(), ["B", "A"]);
        assert_eq!(items.count(&record(json!({"price >=": 2}))).unwrap(), 2);

        assert!(items.delete("b").unwrap());
        assert!(!items.delete("b").unwrap());
        assert_eq!(items.count(&Record::new()).unwrap(), 2);
    }

    #[test]
    fn test_changed_fields_normalizes_numbers() {
        let fields = Item::fields();
        let current = record(json!({"name": "Gear", "price": 9.0}));

        let same = changed_fields::<Item>(&fields, &current, &record(json!({"name": "Gear", "price": 9})))
            .unwrap();
        assert!(same.is_empty());

        let diff = changed_fields::<Item>(
            &fields,
            &current,
            &record(json!({"price": 9.5, "undeclared": true})),
        )
        .unwrap();
        assert_eq!(diff, record(json!({"price": 9.5})));
    }

    #[test]
    fn test_missing_type_and_factory() {
        let registry = TypeRegistry::new();
        let db: Arc<dyn Database> = Arc::new(SqliteDatabase::open_in_memory().unwrap());
        assert!(matches!(
            Collection::<Item>::new(&registry, db.clone()),
            Err(SmrtError::UnknownType(name)) if name == "Item"
        ));

        registry
            .register(ObjectTypeDescriptor::new("Item", FieldTable::new()))
            .unwrap();
        assert!(matches!(
            Collection::<Item>::new(&registry, db),
            Err(SmrtError::MissingFactory(_))
        ));
    }

    #[test]
    fn test_dyn_collection_through_registry() {
        let registry = TypeRegistry::new();
        let db: Arc<dyn Database> = Arc::new(SqliteDatabase::open_in_memory().unwrap());
        register_collection::<Item>(&registry, db).unwrap();
        registry.freeze();

        let items = open_collection(&registry, "Item").unwrap();
        assert_eq!(items.type_name(), "Item");
        let created = items
            .create_record(record(json!({"name": "Widget", "price": 9.5})))
            .unwrap();
        assert_eq!(created["slug"], json!("widget"));

        let fetched = items.get_record(Lookup::from("widget")).unwrap().unwrap();
        assert_eq!(fetched["id"], created["id"]);
        assert_eq!(items.list_records(&ListOptions::new()).unwrap().len(), 1);
        assert!(open_collection(&registry, "Ghost").is_none());
    }
}
