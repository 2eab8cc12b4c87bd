//! The template interpreter: a recursive walk over the node tree that
//! builds the SQL text and the ordered bound-parameter list side by side.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};
use crate::eval::{evaluate, resolve_path};
use crate::node::{Element, Node};
use crate::registry::Registry;
use crate::value::{Scope, Value};

/// Both placeholder forms: `#{expr}` binds a parameter, `${expr}` splices
/// raw text.
static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([#$])\{([^}]*)\}").expect("placeholder pattern"));

/// The product of a successful render: SQL text plus the values to bind,
/// in placeholder order. The number of `?` in `sql` always equals
/// `params.len()`.
#[derive(Debug, Clone)]
pub struct Rendered {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Per-render knobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    /// When set, an `<include>` whose `refid` matches nothing becomes
    /// [`Error::MissingFragment`] instead of silently rendering nothing.
    pub strict_include: bool,
}

/// The tree walker. Cheap to copy; holds only borrows and options.
///
/// Rendering is synchronous and deterministic, with no shared mutable
/// state: the tree, root, and registry are read-only, while scope, output,
/// and parameter list belong to the single call.
#[derive(Clone, Copy)]
pub struct Renderer<'a> {
    root: &'a Element,
    registry: &'a Registry,
    options: RenderOptions,
    /// The statement currently being rendered; excluded from `<include>`
    /// lookup so a statement cannot include itself.
    entry: Option<&'a Element>,
}

impl<'a> Renderer<'a> {
    pub fn new(root: &'a Element, registry: &'a Registry) -> Renderer<'a> {
        Renderer {
            root,
            registry,
            options: RenderOptions::default(),
            entry: None,
        }
    }

    pub fn with_options(mut self, options: RenderOptions) -> Renderer<'a> {
        self.options = options;
        self
    }

    /// Render a statement element's children into a fresh output buffer
    /// and parameter list. Any failure aborts the whole call; no partial
    /// result escapes.
    pub fn render(&self, statement: &'a Element, scope: &mut Scope) -> Result<Rendered> {
        let renderer = Renderer {
            entry: Some(statement),
            ..*self
        };
        let mut sql = String::new();
        let mut params = Vec::new();
        renderer.render_children(&statement.children, scope, &mut sql, &mut params)?;
        Ok(Rendered { sql, params })
    }

    /// Render a node sequence into the given destinations. Custom tag
    /// handlers use this to re-enter the walk for their children.
    pub fn render_children(
        &self,
        nodes: &[Node],
        scope: &mut Scope,
        out: &mut String,
        params: &mut Vec<Value>,
    ) -> Result<()> {
        for node in nodes {
            self.render_node(node, scope, out, params)?;
        }
        Ok(())
    }

    fn render_node(
        &self,
        node: &Node,
        scope: &mut Scope,
        out: &mut String,
        params: &mut Vec<Value>,
    ) -> Result<()> {
        match node {
            Node::Text(content) => self.render_text(content, scope, out, params),
            Node::Element(el) => match el.name.as_str() {
                "IF" => self.render_if(el, scope, out, params),
                "FOREACH" => self.render_foreach(el, scope, out, params),
                "WHERE" => self.render_where(el, scope, out, params),
                "SET" => self.render_set(el, scope, out, params),
                // A <sql> fragment reached directly just renders in place;
                // it is normally the target of an <include>.
                "SQL" => self.render_children(&el.children, scope, out, params),
                "INCLUDE" => self.render_include(el, scope, out, params),
                _ => self.render_custom(el, scope, out, params),
            },
        }
    }

    /// Literal text: substitute `#{...}` and `${...}` placeholders.
    fn render_text(
        &self,
        content: &str,
        scope: &mut Scope,
        out: &mut String,
        params: &mut Vec<Value>,
    ) -> Result<()> {
        let mut last = 0;
        for caps in PLACEHOLDER.captures_iter(content) {
            let whole = caps.get(0).expect("match group 0");
            out.push_str(&content[last..whole.start()]);
            last = whole.end();

            let value = self.placeholder_value(caps[2].trim(), scope)?;
            if &caps[1] == "#" {
                if matches!(value, Value::Auto) {
                    // Let the database assign the value; nothing is bound.
                    out.push_str("DEFAULT");
                } else {
                    out.push('?');
                    params.push(value);
                }
            } else {
                // ${...}: raw, unescaped splice. Values must be trusted by
                // the caller; this is the dynamic-identifier path (ORDER BY
                // columns and the like), not a bound parameter.
                out.push_str(&value.render_text());
            }
        }
        out.push_str(&content[last..]);
        Ok(())
    }

    /// A placeholder body with `?` or `(` in it is a real expression
    /// (`id == 0 ? $AUTO : id`, `len(ids)`); anything else is a plain
    /// dotted path and skips the expression pipeline.
    fn placeholder_value(&self, expr: &str, scope: &Scope) -> Result<Value> {
        if expr.contains('?') || expr.contains('(') {
            evaluate(expr, scope, self.registry)
        } else {
            Ok(resolve_path(scope, expr))
        }
    }

    fn render_if(
        &self,
        el: &Element,
        scope: &mut Scope,
        out: &mut String,
        params: &mut Vec<Value>,
    ) -> Result<()> {
        let test = el.attr("test").ok_or_else(|| Error::MissingAttribute {
            tag: "if".to_string(),
            attribute: "test".to_string(),
        })?;
        match evaluate(test, scope, self.registry)? {
            Value::Bool(true) => self.render_children(&el.children, scope, out, params),
            _ => Ok(()),
        }
    }

    fn render_foreach(
        &self,
        el: &Element,
        scope: &mut Scope,
        out: &mut String,
        params: &mut Vec<Value>,
    ) -> Result<()> {
        let collection_key = el.attr_or("collection", "list");
        let item_key = el.attr_or("item", "item");
        let separator = el.attr_or("separator", ",").to_string();
        let open = el.attr_or("open", "").to_string();
        let close = el.attr_or("close", "").to_string();

        let items = match scope.get(collection_key) {
            None => return Err(Error::UnknownCollection(collection_key.to_string())),
            Some(Value::Seq(items)) => items.clone(),
            Some(_) => {
                return Err(Error::WrongCollectionType(collection_key.to_string()))
            }
        };
        let item_key = item_key.to_string();

        // Iterations rebind the item key in the shared scope, so nested
        // nodes see the current element. Text accumulates per iteration;
        // parameters go straight to the shared list, keeping their order.
        let mut body = String::new();
        for item in items {
            scope.set(item_key.clone(), item);
            let mut piece = String::new();
            self.render_children(&el.children, scope, &mut piece, params)?;
            if !piece.is_empty() {
                body.push_str(&piece);
                body.push_str(&separator);
            }
        }
        if !separator.is_empty() && body.ends_with(separator.as_str()) {
            body.truncate(body.len() - separator.len());
        }

        if !open.is_empty() {
            out.push_str(&open);
        }
        out.push_str(&body);
        if !close.is_empty() {
            out.push_str(&close);
        }
        Ok(())
    }

    fn render_where(
        &self,
        el: &Element,
        scope: &mut Scope,
        out: &mut String,
        params: &mut Vec<Value>,
    ) -> Result<()> {
        let mut fragments = Vec::with_capacity(el.children.len());
        for child in &el.children {
            let mut buf = String::new();
            self.render_node(child, scope, &mut buf, params)?;
            fragments.push(buf.trim().to_string());
        }

        // The first surviving fragment loses one leading AND/OR; later
        // fragments keep theirs as connectors.
        let mut joined = String::new();
        let mut first = true;
        for fragment in &fragments {
            if fragment.is_empty() {
                continue;
            }
            let fragment = if first {
                first = false;
                strip_leading_connector(fragment)
            } else {
                fragment.as_str()
            };
            if !joined.is_empty() {
                joined.push(' ');
            }
            joined.push_str(fragment);
        }

        if !joined.is_empty() {
            out.push_str(" where ");
            out.push_str(&joined);
            out.push(' ');
        }
        Ok(())
    }

    fn render_set(
        &self,
        el: &Element,
        scope: &mut Scope,
        out: &mut String,
        params: &mut Vec<Value>,
    ) -> Result<()> {
        let mut buf = String::new();
        self.render_children(&el.children, scope, &mut buf, params)?;
        let trimmed = buf.trim();
        let trimmed = trimmed.strip_suffix(',').unwrap_or(trimmed);
        out.push_str(" set ");
        out.push_str(trimmed);
        out.push(' ');
        Ok(())
    }

    fn render_include(
        &self,
        el: &Element,
        scope: &mut Scope,
        out: &mut String,
        params: &mut Vec<Value>,
    ) -> Result<()> {
        let refid = el.attr("refid").ok_or_else(|| Error::MissingAttribute {
            tag: "include".to_string(),
            attribute: "refid".to_string(),
        })?;
        let fragment = self
            .root
            .children
            .iter()
            .filter_map(Node::as_element)
            .find(|cand| {
                cand.attr("id") == Some(refid)
                    && !self.entry.is_some_and(|entry| std::ptr::eq(entry, *cand))
            });
        match fragment {
            Some(fragment) => {
                self.render_children(&fragment.children, scope, out, params)
            }
            None if self.options.strict_include => {
                Err(Error::MissingFragment(refid.to_string()))
            }
            None => Ok(()),
        }
    }

    fn render_custom(
        &self,
        el: &Element,
        scope: &mut Scope,
        out: &mut String,
        params: &mut Vec<Value>,
    ) -> Result<()> {
        match self.registry.tag(&el.name) {
            Some(handler) => handler(self, el, scope, out, params),
            None => Err(Error::UnregisteredTag(el.name.clone())),
        }
    }
}

fn strip_leading_connector(fragment: &str) -> &str {
    let upper = fragment.to_uppercase();
    if upper.starts_with("AND") {
        fragment[3..].trim_start()
    } else if upper.starts_with("OR") {
        fragment[2..].trim_start()
    } else {
        fragment
    }
}

/// A named template: a root element whose direct children are statements
/// keyed by their `id` attribute. Immutable after construction and safe to
/// share across threads; each render gets its own scope and buffers.
#[derive(Debug, Clone)]
pub struct Template {
    root: Element,
}

impl Template {
    pub fn new(root: Element) -> Template {
        Template { root }
    }

    /// The optional `namespace` attribute of the root element.
    pub fn namespace(&self) -> Option<&str> {
        self.root.attr("namespace")
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Look up a statement by its `id` attribute among the root's direct
    /// children. Children without an `id` are not addressable.
    pub fn statement(&self, id: &str) -> Option<&Element> {
        self.root
            .children
            .iter()
            .filter_map(Node::as_element)
            .find(|el| el.attr("id") == Some(id))
    }

    pub fn render(
        &self,
        id: &str,
        scope: &mut Scope,
        registry: &Registry,
    ) -> Result<Rendered> {
        self.render_with(id, scope, registry, RenderOptions::default())
    }

    pub fn render_with(
        &self,
        id: &str,
        scope: &mut Scope,
        registry: &Registry,
        options: RenderOptions,
    ) -> Result<Rendered> {
        let statement = self
            .statement(id)
            .ok_or_else(|| Error::UnknownStatement(id.to_string()))?;
        let rendered = Renderer::new(&self.root, registry)
            .with_options(options)
            .render(statement, scope)
            .map_err(|e| e.in_statement(id))?;
        log::debug!(
            "[{}] [{}] sql: {} ({} params)",
            self.namespace().unwrap_or(""),
            id,
            rendered.sql,
            rendered.params.len()
        );
        Ok(rendered)
    }
}
