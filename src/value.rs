//! Runtime values and the per-call parameter scope.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A dynamically-typed template value.
///
/// `Auto` is the auto-generate sentinel (written `$AUTO` in template
/// expressions): it renders as the literal SQL text `DEFAULT` and is never
/// appended to the bound parameter list. It is a dedicated variant rather
/// than a magic string so a user-supplied `"$AUTO"` text value cannot
/// collide with it.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Seq(Vec<Value>),
    Record(Arc<dyn Record>),
    Auto,
}

/// Field access capability for structured values.
///
/// Host structures are adapted into records once at the call boundary with
/// an explicit name mapping (see [`FieldRecord`]); the engine never reflects
/// over host types.
pub trait Record: fmt::Debug + Send + Sync {
    fn get(&self, name: &str) -> Option<Value>;
}

impl Value {
    pub fn text(s: impl Into<String>) -> Value {
        Value::Text(s.into())
    }

    pub fn record(r: impl Record + 'static) -> Value {
        Value::Record(Arc::new(r))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric coercion used by the ordering comparisons: numeric kinds
    /// directly, text only when it parses as a number. Booleans do not
    /// coerce.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// The text rendering used by `${...}` interpolation and by the
    /// equality fallback. `Null` renders empty rather than as a
    /// `<nil>`-style marker; anything else would end up inside SQL.
    pub fn render_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => f.write_str(s),
            Value::Seq(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Record(r) => write!(f, "{:?}", r),
            Value::Auto => f.write_str("DEFAULT"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Value {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Value {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Value {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Value {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Value {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Value {
        Value::Text(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Value {
        Value::Seq(items.into_iter().map(Into::into).collect())
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Value {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => {
                Value::Seq(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                let fields = map
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect();
                Value::Record(Arc::new(MapRecord { fields }))
            }
        }
    }
}

/// Plain map-backed record, used for JSON objects and ad-hoc nesting.
#[derive(Debug)]
pub struct MapRecord {
    fields: HashMap<String, Value>,
}

impl MapRecord {
    pub fn new(fields: HashMap<String, Value>) -> MapRecord {
        MapRecord { fields }
    }
}

impl Record for MapRecord {
    fn get(&self, name: &str) -> Option<Value> {
        self.fields.get(name).cloned()
    }
}

/// Record adapter with explicit per-field external aliases.
///
/// Lookup tries the declared alias first and the raw field name second, so a
/// host struct field `Name` exposed under the column alias `name` answers to
/// both spellings in template paths.
#[derive(Debug, Default)]
pub struct FieldRecord {
    fields: Vec<(Option<String>, String, Value)>,
}

impl FieldRecord {
    pub fn new() -> FieldRecord {
        FieldRecord::default()
    }

    pub fn field(mut self, name: &str, value: impl Into<Value>) -> FieldRecord {
        self.fields.push((None, name.to_string(), value.into()));
        self
    }

    pub fn aliased(
        mut self,
        alias: &str,
        name: &str,
        value: impl Into<Value>,
    ) -> FieldRecord {
        self.fields
            .push((Some(alias.to_string()), name.to_string(), value.into()));
        self
    }
}

impl Record for FieldRecord {
    fn get(&self, key: &str) -> Option<Value> {
        for (alias, _, value) in &self.fields {
            if alias.as_deref() == Some(key) {
                return Some(value.clone());
            }
        }
        for (_, name, value) in &self.fields {
            if name == key {
                return Some(value.clone());
            }
        }
        None
    }
}

/// The per-call parameter scope: a mutable name → value map.
///
/// A scope is created fresh for each render invocation. `<foreach>` rebinds
/// its item key here on every iteration, so nested renders always observe
/// the current loop element; the scope must not be retained past the call.
#[derive(Debug, Default)]
pub struct Scope {
    vars: HashMap<String, Value>,
}

impl Scope {
    pub fn new() -> Scope {
        Scope::default()
    }

    /// Build a scope from a JSON object; non-object input yields an empty
    /// scope.
    pub fn from_json(json: serde_json::Value) -> Scope {
        let mut scope = Scope::new();
        if let serde_json::Value::Object(map) = json {
            for (k, v) in map {
                scope.set(k, Value::from(v));
            }
        }
        scope
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Scope {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Scope {
        let mut scope = Scope::new();
        for (k, v) in iter {
            scope.set(k, v);
        }
        scope
    }
}
