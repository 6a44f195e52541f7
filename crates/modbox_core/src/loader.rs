//! Conditional module script loader.
//!
//! # Responsibility
//! - Read the module enable table.
//! - Inject one `<script src="<base_path><name>.js">` into the body for each
//!   enabled module whose container exists in the document.
//!
//! # Invariants
//! - A value of `0` disables a module; any other value enables it.
//! - Modules are visited in declaration order; no dependency ordering is
//!   applied. A repeated name keeps its first position and its last flag.

use crate::dom::{Attributes, DomAdapter};
use log::{info, warn};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const SCRIPT_EXTENSION: &str = ".js";

/// Module enable table plus script base path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LoaderConfig {
    /// Prefix prepended to every script file name.
    #[serde(default)]
    pub base_path: String,
    /// Module name -> `0` (disabled) or non-zero (enabled), in declaration order.
    #[serde(default, deserialize_with = "ordered_modules")]
    pub modules: Vec<(String, u8)>,
}

impl LoaderConfig {
    /// Parses a JSON loader declaration.
    pub fn from_json_str(value: &str) -> Result<Self, LoaderConfigError> {
        serde_json::from_str(value).map_err(|err| LoaderConfigError::Parse(err.to_string()))
    }

    /// Reads and parses a JSON loader declaration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LoaderConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|err| LoaderConfigError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        Self::from_json_str(&raw)
    }

    /// Enabled module names in declaration order.
    pub fn enabled_modules(&self) -> impl Iterator<Item = &str> + '_ {
        self.modules
            .iter()
            .filter(|(_, flag)| *flag != 0)
            .map(|(name, _)| name.as_str())
    }

    /// Script source for one module name.
    pub fn script_src(&self, module: &str) -> String {
        format!("{}{module}{SCRIPT_EXTENSION}", self.base_path)
    }
}

fn ordered_modules<'de, D>(deserializer: D) -> Result<Vec<(String, u8)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct ModuleTable;

    impl<'de> Visitor<'de> for ModuleTable {
        type Value = Vec<(String, u8)>;

        fn expecting(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            f.write_str("a map of module name to enable flag")
        }

        fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut modules: Vec<(String, u8)> = Vec::new();
            while let Some((name, flag)) = access.next_entry::<String, u8>()? {
                match modules.iter_mut().find(|(existing, _)| *existing == name) {
                    Some(entry) => entry.1 = flag,
                    None => modules.push((name, flag)),
                }
            }
            Ok(modules)
        }
    }

    deserializer.deserialize_map(ModuleTable)
}

/// Loader configuration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoaderConfigError {
    Io { path: PathBuf, message: String },
    Parse(String),
}

impl Display for LoaderConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, message } => {
                write!(f, "failed to read loader config `{}`: {message}", path.display())
            }
            Self::Parse(message) => write!(f, "invalid loader config: {message}"),
        }
    }
}

impl Error for LoaderConfigError {}

/// Injects scripts for enabled modules present in `dom`.
///
/// Returns the injected script sources in injection order.
pub fn load_modules(config: &LoaderConfig, dom: &dyn DomAdapter) -> Vec<String> {
    let Some(body) = dom.body() else {
        warn!("event=load_modules module=loader status=error reason=document has no body");
        return Vec::new();
    };

    let mut injected = Vec::new();
    for module in config.enabled_modules() {
        if dom.element_by_id(module).is_none() {
            continue;
        }
        let src = config.script_src(module);
        let script = dom.create_element("script");
        let mut attributes = Attributes::new();
        attributes.insert("src".to_string(), src.clone());
        dom.apply_attributes(script, &attributes);
        dom.append_child(body, script);
        info!("event=load_module module=loader status=ok name={module} src={src}");
        injected.push(src);
    }
    injected
}
