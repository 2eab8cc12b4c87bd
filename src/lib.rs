//! sqlweave: dynamic SQL templating engine.
//!
//! This crate exists to do one job well: take an immutable template tree
//! (literal SQL text mixed with conditional/looping markup and parameter
//! placeholders), resolve it against a runtime parameter scope, and return
//! the finished SQL string together with the ordered list of values to
//! bind. Callers never concatenate SQL by hand, and the emitted text stays
//! syntactically valid for every combination of present and absent
//! optional parameters.
//!
//! Supported markup:
//! - Literal text with `#{expr}` (bound `?` parameter) and `${expr}` (raw
//!   text splice) placeholders.
//! - `<if test="...">`, `<foreach collection=... item=... separator=...
//!   open=... close=...>`, `<where>`, `<set>`, `<sql id=...>` +
//!   `<include refid=...>`, and externally registered custom tags.
//! - A small expression language for `test` attributes and placeholder
//!   bodies: `&& || == != > < >= <= !`, ternary `cond ? a : b`, string and
//!   numeric literals, dotted paths, registered function calls, and the
//!   `$AUTO` auto-generate sentinel (renders as `DEFAULT`, binds nothing).
//!
//! Not supported:
//! - Parsing the markup itself; trees arrive already built (see [`Node`]).
//! - Executing SQL, mapping rows, pagination, or schema work.
//! - Arithmetic in expressions.
//!
//! A note on `${...}`: it splices the value's text into the SQL with no
//! escaping whatsoever. This is the crate's escape hatch for dynamic
//! identifiers such as ORDER BY columns, and it requires the value to come
//! from a trusted source, never from user input.
//!
//! The tree, [`Template`], and [`Registry`] are read-only during rendering
//! and safe to share across concurrent callers; scope, output, and
//! parameter list are created fresh per call.

mod ast;
mod error;
mod eval;
mod lexer;
mod node;
mod parser;
mod registry;
mod render;
mod value;

pub use error::{Error, Result};
pub use eval::{evaluate, resolve_path};
pub use node::{attrs, Element, Node};
pub use registry::{Registry, SqlFunction, TagHandler};
pub use render::{RenderOptions, Rendered, Renderer, Template};
pub use value::{FieldRecord, MapRecord, Record, Scope, Value};

/// Render a standalone statement element against a scope.
///
/// The statement doubles as the fragment-lookup root, so `<include>` can
/// only reference siblings when rendering through [`Template`]; use that
/// for multi-statement documents.
pub fn render(
    statement: &Element,
    scope: &mut Scope,
    registry: &Registry,
) -> Result<Rendered> {
    Renderer::new(statement, registry).render(statement, scope)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_user_template() -> Template {
        // <mapper namespace="UserRepo">
        //   <select id="GetUser">SELECT * FROM user
        //     <where><if test="name != null"> and name = #{name} </if></where>
        //   </select>
        // </mapper>
        Template::new(
            Element {
                name: "MAPPER".to_string(),
                attributes: attrs(&[("namespace", "UserRepo")]),
                children: vec![Node::element(
                    "select",
                    attrs(&[("id", "GetUser")]),
                    vec![
                        Node::text("SELECT * FROM user"),
                        Node::element(
                            "where",
                            vec![],
                            vec![Node::element(
                                "if",
                                attrs(&[("test", "name != null")]),
                                vec![Node::text(" and name = #{name} ")],
                            )],
                        ),
                    ],
                )],
            },
        )
    }

    #[test]
    fn optional_filter_present() {
        let template = get_user_template();
        let registry = Registry::with_builtins();
        let mut scope = Scope::new();
        scope.set("name", "bob");
        let r = template.render("GetUser", &mut scope, &registry).unwrap();
        assert_eq!(r.sql, "SELECT * FROM user where name = ? ");
        assert_eq!(r.params.len(), 1);
        assert_eq!(r.params[0].render_text(), "bob");
    }

    #[test]
    fn optional_filter_absent_drops_where_entirely() {
        let template = get_user_template();
        let registry = Registry::with_builtins();
        let mut scope = Scope::new();
        let r = template.render("GetUser", &mut scope, &registry).unwrap();
        assert_eq!(r.sql, "SELECT * FROM user");
        assert!(r.params.is_empty());
    }

    #[test]
    fn auto_sentinel_in_insert() {
        // INSERT ... VALUES (#{id == 0 ? $AUTO : id}, #{name})
        let statement = match Node::element(
            "insert",
            attrs(&[("id", "InsertUser")]),
            vec![Node::text(
                "INSERT INTO user (id, name) VALUES (#{id == 0 ? $AUTO : id}, #{name})",
            )],
        ) {
            Node::Element(el) => el,
            Node::Text(_) => unreachable!(),
        };
        let registry = Registry::with_builtins();

        let mut scope = Scope::new();
        scope.set("id", 0i64);
        scope.set("name", "bob");
        let r = render(&statement, &mut scope, &registry).unwrap();
        assert_eq!(r.sql, "INSERT INTO user (id, name) VALUES (DEFAULT, ?)");
        assert_eq!(r.params.len(), 1);
        assert_eq!(r.params[0].render_text(), "bob");

        let mut scope = Scope::new();
        scope.set("id", 5i64);
        scope.set("name", "bob");
        let r = render(&statement, &mut scope, &registry).unwrap();
        assert_eq!(r.sql, "INSERT INTO user (id, name) VALUES (?, ?)");
        assert_eq!(r.params.len(), 2);
        assert_eq!(r.params[0].render_text(), "5");
    }

    #[test]
    fn placeholder_count_matches_param_count() {
        let template = get_user_template();
        let registry = Registry::with_builtins();
        let mut scope = Scope::new();
        scope.set("name", "bob");
        let r = template.render("GetUser", &mut scope, &registry).unwrap();
        assert_eq!(r.sql.matches('?').count(), r.params.len());
    }

    #[test]
    fn rendering_is_deterministic() {
        let template = get_user_template();
        let registry = Registry::with_builtins();
        let run = || {
            let mut scope = Scope::new();
            scope.set("name", "bob");
            template.render("GetUser", &mut scope, &registry).unwrap()
        };
        let a = run();
        let b = run();
        assert_eq!(a.sql, b.sql);
        assert_eq!(a.params.len(), b.params.len());
    }

    #[test]
    fn scope_from_json_end_to_end() {
        let template = get_user_template();
        let registry = Registry::with_builtins();
        let mut scope = Scope::from_json(serde_json::json!({"name": "bob"}));
        let r = template.render("GetUser", &mut scope, &registry).unwrap();
        assert_eq!(r.sql, "SELECT * FROM user where name = ? ");
    }
}
