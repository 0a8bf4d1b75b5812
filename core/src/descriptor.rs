//! Object type declarations and their registry descriptors.

use std::fmt;
use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::config::{ObjectConfig, Record};
use crate::error::CoreError;
use crate::fields::{FieldTable, RESERVED_COLUMNS};
use crate::naming;

/// A persistent object type.
///
/// Implementors declare their field table statically. The struct's serde
/// representation must use the declared field names; identity columns (`id`,
/// `slug`, `context`, timestamps) live outside the struct.
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use smrt_core::{SmrtObject, FieldTable, fields::{decimal, text}};
///
/// #[derive(Serialize, Deserialize)]
/// struct Product {
///     name: String,
///     price: f64,
/// }
///
/// impl SmrtObject for Product {
///     const TYPE_NAME: &'static str = "Product";
///
///     fn fields() -> FieldTable {
///         [text("name").required(), decimal("price")].into_iter().collect()
///     }
/// }
///
/// assert_eq!(Product::table_name(), "products");
/// ```
pub trait SmrtObject: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Registry key. Case-sensitive.
    const TYPE_NAME: &'static str;

    /// Ordered field declarations.
    fn fields() -> FieldTable;

    fn config() -> ObjectConfig {
        ObjectConfig::default()
    }

    fn table_name() -> String {
        naming::table_name(Self::TYPE_NAME)
    }
}

/// Builds a normalized record from caller-supplied options.
pub type ObjectFactory = Arc<dyn Fn(Record) -> Result<Record, CoreError> + Send + Sync>;

/// Everything the runtime and downstream generators know about one type.
#[derive(Clone)]
pub struct ObjectTypeDescriptor {
    pub name: String,
    pub table_name: String,
    pub fields: FieldTable,
    pub config: ObjectConfig,
    pub factory: Option<ObjectFactory>,
}

impl ObjectTypeDescriptor {
    /// Descriptor with a derived table name, default config, and no factory.
    pub fn new(name: impl Into<String>, fields: FieldTable) -> Self {
        let name = name.into();
        Self {
            table_name: naming::table_name(&name),
            name,
            fields,
            config: ObjectConfig::default(),
            factory: None,
        }
    }

    /// Descriptor for a declared type, with a factory that applies field
    /// defaults and round-trips the record through `T`.
    pub fn of<T: SmrtObject>() -> Self {
        let fields = extract_fields::<T>();
        let factory_fields = fields.clone();
        let factory: ObjectFactory = Arc::new(move |mut record: Record| {
            apply_defaults(&factory_fields, &mut record);
            let typed: T = serde_json::from_value(Value::Object(record.clone())).map_err(|e| {
                CoreError::Factory {
                    type_name: T::TYPE_NAME.to_string(),
                    message: e.to_string(),
                }
            })?;
            let mut normalized = match serde_json::to_value(&typed) {
                Ok(Value::Object(map)) => map,
                Ok(other) => {
                    return Err(CoreError::Factory {
                        type_name: T::TYPE_NAME.to_string(),
                        message: format!("expected an object, got {other}"),
                    });
                }
                Err(e) => {
                    return Err(CoreError::Factory {
                        type_name: T::TYPE_NAME.to_string(),
                        message: e.to_string(),
                    });
                }
            };
            // Identity columns are not part of `T`; carry them through.
            for key in RESERVED_COLUMNS {
                if let Some(value) = record.remove(key) {
                    normalized.insert(key.to_string(), value);
                }
            }
            Ok(normalized)
        });

        Self {
            name: T::TYPE_NAME.to_string(),
            table_name: T::table_name(),
            fields,
            config: T::config(),
            factory: Some(factory),
        }
    }

    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    pub fn with_config(mut self, config: ObjectConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_factory(mut self, factory: ObjectFactory) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Runs the factory, or applies defaults only when there is none.
    pub fn build(&self, mut record: Record) -> Result<Record, CoreError> {
        match &self.factory {
            Some(factory) => factory(record),
            None => {
                apply_defaults(&self.fields, &mut record);
                Ok(record)
            }
        }
    }
}

impl fmt::Debug for ObjectTypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectTypeDescriptor")
            .field("name", &self.name)
            .field("table_name", &self.table_name)
            .field("fields", &self.fields)
            .field("config", &self.config)
            .field("factory", &self.factory.is_some())
            .finish()
    }
}

/// Returns the declared field table of `T`, minus reserved columns.
///
/// A field named like an identity column would shadow it in generated SQL, so
/// it is dropped with a warning instead of failing registration.
pub fn extract_fields<T: SmrtObject>() -> FieldTable {
    let mut table = FieldTable::new();
    for field in T::fields() {
        if RESERVED_COLUMNS.contains(&field.name.as_str()) {
            tracing::warn!(
                type_name = T::TYPE_NAME,
                field = %field.name,
                "dropping field that shadows a reserved column"
            );
            continue;
        }
        if !naming::is_valid_identifier(&field.name) {
            tracing::warn!(
                type_name = T::TYPE_NAME,
                field = %field.name,
                "dropping field with an invalid name"
            );
            continue;
        }
        table.insert(field);
    }
    table
}

/// Fills absent (or null) keys from field defaults.
pub fn apply_defaults(fields: &FieldTable, record: &mut Record) {
    for field in fields {
        let Some(default) = &field.options.default else {
            continue;
        };
        let missing = record.get(&field.name).is_none_or(Value::is_null);
        if missing {
            record.insert(field.name.clone(), default.clone());
        }
    }
}
