use crate::utils::error::{Result, ScrapeError};
use regex::Regex;
use serde::de::DeserializeOwned;
use toml::{Table, Value};

/// A parsed configuration file addressed with dotted paths.
///
/// Paths use `.` between keys (`options.max_results`). Several alternatives may
/// be given separated by `,`; the first one that resolves wins. A `:` inside a
/// path matches both the nested form and the flattened `_` form, so
/// `payload:target_folder` finds `payload.target_folder` or `payload_target_folder`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigDocument {
    root: Table,
}

impl ConfigDocument {
    /// 從 TOML 字串解析，先替換 ${VAR} 環境變數
    pub fn parse(content: &str) -> Result<Self> {
        let processed = substitute_env_vars(content)?;

        let root: Table =
            toml::from_str(&processed).map_err(|e| ScrapeError::ConfigValidationError {
                field: "toml_parsing".to_string(),
                message: format!("TOML parsing error: {}", e),
            })?;

        Ok(Self { root })
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        expand_path(path)
            .iter()
            .find_map(|candidate| walk(&self.root, candidate))
    }

    pub fn exists(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    pub fn require(&self, path: &str) -> Result<&Value> {
        self.get(path).ok_or_else(|| ScrapeError::MissingConfigError {
            field: path.to_string(),
        })
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    /// Deserializes the sub-tree at `path`, `None` when it is absent.
    pub fn subset<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        match self.get(path) {
            Some(value) => value
                .clone()
                .try_into()
                .map(Some)
                .map_err(|e| ScrapeError::ConfigValidationError {
                    field: path.to_string(),
                    message: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    /// Sets a value, creating intermediate tables. Existing non-table values on
    /// the way are replaced.
    pub fn set(&mut self, path: &str, value: Value) {
        let keys: Vec<&str> = path.split([':', '.']).filter(|k| !k.is_empty()).collect();
        let Some((last, parents)) = keys.split_last() else {
            return;
        };

        let mut table = &mut self.root;
        for key in parents {
            let entry = table
                .entry(key.to_string())
                .or_insert(Value::Table(Table::new()));
            if !entry.is_table() {
                *entry = Value::Table(Table::new());
            }
            table = match entry {
                Value::Table(inner) => inner,
                _ => return,
            };
        }
        table.insert(last.to_string(), value);
    }

    /// Applies `<PREFIX>__SECTION__KEY=value` environment variables, returning
    /// how many were applied.
    pub fn apply_env_overrides(&mut self, prefix: &str) -> usize {
        self.apply_overrides(prefix, std::env::vars())
    }

    pub fn apply_overrides<I>(&mut self, prefix: &str, vars: I) -> usize
    where
        I: IntoIterator<Item = (String, String)>,
    {
        if prefix.is_empty() {
            return 0;
        }

        let marker = format!("{}__", prefix.to_ascii_lowercase());
        let mut applied = 0;

        for (key, raw) in vars {
            let key = key.to_ascii_lowercase();
            let Some(rest) = key.strip_prefix(&marker) else {
                continue;
            };
            let path = rest.split("__").collect::<Vec<_>>().join(".");
            if path.is_empty() {
                continue;
            }

            // 原本是字串的欄位保持字串，避免 `123` 變成整數
            let value = match self.get(&path) {
                Some(Value::String(_)) => Value::String(raw),
                _ => parse_scalar(&raw),
            };
            tracing::debug!("Config override from environment: {}", path);
            self.set(&path, value);
            applied += 1;
        }

        applied
    }

    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T> {
        Value::Table(self.root)
            .try_into()
            .map_err(|e| ScrapeError::ConfigValidationError {
                field: "config".to_string(),
                message: e.to_string(),
            })
    }
}

/// 展開路徑：`,` 分隔多個候選，`:` 同時匹配 `.` 與 `_`
pub fn expand_path(path: &str) -> Vec<String> {
    let mut paths = Vec::new();
    for part in path.replace(' ', "").split(',') {
        if part.is_empty() {
            continue;
        }
        if part.contains(':') {
            paths.push(part.replace(':', "."));
            paths.push(part.replace(':', "_"));
        } else {
            paths.push(part.to_string());
        }
    }
    paths
}

fn walk<'a>(root: &'a Table, path: &str) -> Option<&'a Value> {
    let mut keys = path.split('.');
    let mut current = root.get(keys.next()?)?;
    for key in keys {
        current = current.as_table()?.get(key)?;
    }
    Some(current)
}

fn parse_scalar(raw: &str) -> Value {
    toml::from_str::<Table>(&format!("v = {}", raw))
        .ok()
        .and_then(|mut table| table.remove("v"))
        .unwrap_or_else(|| Value::String(raw.to_string()))
}

/// 替換環境變數 (例如 ${TARGET_FOLDER})，未定義的保持原樣
fn substitute_env_vars(content: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ScrapeError::config(e.to_string()))?;

    let result = re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
    });

    Ok(result.to_string())
}
