//! Per-type surface configuration and lifecycle hooks.
//!
//! Downstream generators (REST, CLI, MCP) read an [`ObjectConfig`] to decide
//! which CRUD verbs to expose. All of them evaluate include/exclude lists the
//! same way, through [`VerbFilter::allows`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;

/// A JSON record as exchanged with hooks and the database layer.
pub type Record = Map<String, Value>;

/// CRUD verbs a surface may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    List,
    Get,
    Create,
    Update,
    Delete,
}

impl Verb {
    pub const ALL: [Verb; 5] = [Verb::List, Verb::Get, Verb::Create, Verb::Update, Verb::Delete];

    pub fn as_str(self) -> &'static str {
        match self {
            Verb::List => "list",
            Verb::Get => "get",
            Verb::Create => "create",
            Verb::Update => "update",
            Verb::Delete => "delete",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Verb::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| CoreError::UnknownVerb(s.to_string()))
    }
}

/// Include/exclude lists over [`Verb`].
///
/// `include: None` means every verb is included. An excluded verb is never
/// allowed, even if it is also listed in `include`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerbFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<Vec<Verb>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<Verb>,
}

impl VerbFilter {
    /// Only the listed verbs.
    pub fn only(verbs: impl IntoIterator<Item = Verb>) -> Self {
        Self {
            include: Some(verbs.into_iter().collect()),
            exclude: Vec::new(),
        }
    }

    /// Every verb except the listed ones.
    pub fn except(verbs: impl IntoIterator<Item = Verb>) -> Self {
        Self {
            include: None,
            exclude: verbs.into_iter().collect(),
        }
    }

    /// Returns `true` if `verb` passes both lists.
    pub fn allows(&self, verb: Verb) -> bool {
        if self.exclude.contains(&verb) {
            return false;
        }
        match &self.include {
            Some(include) => include.contains(&verb),
            None => true,
        }
    }

    /// Allowed verbs in canonical order.
    pub fn allowed(&self) -> Vec<Verb> {
        Verb::ALL.into_iter().filter(|v| self.allows(*v)).collect()
    }
}

/// REST surface configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(flatten)]
    pub filter: VerbFilter,
    /// Middleware names applied to every generated route.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub middleware: Vec<String>,
    /// Per-verb custom handler names replacing the generated handler.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub customize: BTreeMap<Verb, String>,
}

/// MCP tool surface configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpConfig {
    #[serde(flatten)]
    pub filter: VerbFilter,
}

/// CLI surface configuration: a plain switch or a verb filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CliConfig {
    Enabled(bool),
    Filtered(VerbFilter),
}

impl Default for CliConfig {
    fn default() -> Self {
        CliConfig::Enabled(true)
    }
}

impl CliConfig {
    pub fn allows(&self, verb: Verb) -> bool {
        match self {
            CliConfig::Enabled(enabled) => *enabled,
            CliConfig::Filtered(filter) => filter.allows(verb),
        }
    }
}

/// Lifecycle points at which a hook may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HookEvent {
    BeforeSave,
    AfterSave,
    BeforeCreate,
    AfterCreate,
    BeforeUpdate,
    AfterUpdate,
    BeforeDelete,
    AfterDelete,
}

impl HookEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            HookEvent::BeforeSave => "beforeSave",
            HookEvent::AfterSave => "afterSave",
            HookEvent::BeforeCreate => "beforeCreate",
            HookEvent::AfterCreate => "afterCreate",
            HookEvent::BeforeUpdate => "beforeUpdate",
            HookEvent::AfterUpdate => "afterUpdate",
            HookEvent::BeforeDelete => "beforeDelete",
            HookEvent::AfterDelete => "afterDelete",
        }
    }
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A hook receives the object's record and may mutate it. Returning `Err`
/// aborts the surrounding operation.
pub type HookFn = Arc<dyn Fn(&mut Record) -> Result<(), String> + Send + Sync>;

/// Hooks keyed by lifecycle event. At most one hook per event.
#[derive(Clone, Default)]
pub struct Hooks {
    hooks: BTreeMap<HookEvent, HookFn>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the hook for `event`.
    pub fn on<F>(mut self, event: HookEvent, hook: F) -> Self
    where
        F: Fn(&mut Record) -> Result<(), String> + Send + Sync + 'static,
    {
        self.hooks.insert(event, Arc::new(hook));
        self
    }

    pub fn get(&self, event: HookEvent) -> Option<&HookFn> {
        self.hooks.get(&event)
    }

    /// Runs the hook for `event`, if one is set.
    pub fn run(&self, event: HookEvent, record: &mut Record) -> Result<(), String> {
        match self.hooks.get(&event) {
            Some(hook) => hook(record),
            None => Ok(()),
        }
    }

    pub fn events(&self) -> impl Iterator<Item = HookEvent> + '_ {
        self.hooks.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.hooks.keys()).finish()
    }
}

/// Surface and lifecycle configuration for one object type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectConfig {
    /// Display name override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub mcp: McpConfig,
    #[serde(default)]
    pub cli: CliConfig,
    #[serde(skip)]
    pub hooks: Hooks,
}

impl ObjectConfig {
    pub fn api_allows(&self, verb: Verb) -> bool {
        self.api.filter.allows(verb)
    }

    pub fn mcp_allows(&self, verb: Verb) -> bool {
        self.mcp.filter.allows(verb)
    }

    pub fn cli_allows(&self, verb: Verb) -> bool {
        self.cli.allows(verb)
    }

    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }
}

impl PartialEq for ObjectConfig {
    /// Hooks are closures and do not take part in equality.
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.api == other.api
            && self.mcp == other.mcp
            && self.cli == other.cli
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_exclude_wins_over_include() {
        let filter = VerbFilter {
            include: Some(vec![Verb::List, Verb::Delete]),
            exclude: vec![Verb::Delete],
        };
        assert!(filter.allows(Verb::List));
        assert!(!filter.allows(Verb::Delete));
        assert!(!filter.allows(Verb::Get));
    }

    #[test]
    fn test_default_filter_allows_everything() {
        let filter = VerbFilter::default();
        assert_eq!(filter.allowed(), Verb::ALL.to_vec());
        assert_eq!(
            VerbFilter::except([Verb::Delete]).allowed(),
            vec![Verb::List, Verb::Get, Verb::Create, Verb::Update]
        );
    }

    #[test]
    fn test_verb_parsing() {
        assert_eq!("LIST".parse::<Verb>().unwrap(), Verb::List);
        assert_eq!(
            "purge".parse::<Verb>(),
            Err(CoreError::UnknownVerb("purge".to_string()))
        );
    }

    #[test]
    fn test_cli_config_forms() {
        let off: CliConfig = serde_json::from_value(json!(false)).unwrap();
        assert!(!off.allows(Verb::List));

        let filtered: CliConfig = serde_json::from_value(json!({"include": ["get"]})).unwrap();
        assert!(filtered.allows(Verb::Get));
        assert!(!filtered.allows(Verb::List));

        assert!(CliConfig::default().allows(Verb::Delete));
    }

    #[test]
    fn test_object_config_deserializes_flattened_api() {
        let config: ObjectConfig = serde_json::from_value(json!({
            "api": {"exclude": ["delete"], "middleware": ["auth"], "customize": {"list": "listProducts"}},
            "mcp": {"include": ["list", "get"]},
            "cli": true
        }))
        .unwrap();
        assert!(!config.api_allows(Verb::Delete));
        assert!(config.api_allows(Verb::Create));
        assert_eq!(config.api.middleware, vec!["auth"]);
        assert_eq!(config.api.customize.get(&Verb::List).map(String::as_str), Some("listProducts"));
        assert!(config.mcp_allows(Verb::Get));
        assert!(!config.mcp_allows(Verb::Create));
        assert!(config.cli_allows(Verb::Update));
    }

    #[test]
    fn test_hooks_run_and_mutate() {
        let hooks = Hooks::new().on(HookEvent::BeforeSave, |record| {
            record.insert("touched".to_string(), json!(true));
            Ok(())
        });
        let mut record = Record::new();
        hooks.run(HookEvent::BeforeSave, &mut record).unwrap();
        hooks.run(HookEvent::AfterSave, &mut record).unwrap();
        assert_eq!(record.get("touched"), Some(&json!(true)));
        assert_eq!(format!("{hooks:?}"), "{BeforeSave}");
    }
}
