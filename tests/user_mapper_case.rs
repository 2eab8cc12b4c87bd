use sqlweave::{
    attrs, Element, FieldRecord, Node, Registry, Scope, Template, Value,
};

// A realistic user-repository mapper: the statement shapes a metadata-driven
// CRUD layer would generate, rendered end to end.

fn user_mapper() -> Template {
    Template::new(Element {
        name: "MAPPER".to_string(),
        attributes: attrs(&[("namespace", "UserRepo")]),
        children: vec![
            Node::element(
                "sql",
                attrs(&[("id", "UserColumns")]),
                vec![Node::text("id, name")],
            ),
            Node::element(
                "select",
                attrs(&[("id", "GetUser")]),
                vec![
                    Node::text("SELECT id, name FROM user"),
                    Node::element(
                        "where",
                        vec![],
                        vec![
                            Node::text(" and id in ( "),
                            Node::element(
                                "foreach",
                                attrs(&[
                                    ("collection", "ids"),
                                    ("item", "id"),
                                    ("separator", ","),
                                ]),
                                vec![Node::text("#{id}")],
                            ),
                            Node::text(" ) "),
                            Node::element(
                                "if",
                                attrs(&[("test", "name != null")]),
                                vec![Node::text(" and name = #{name} ")],
                            ),
                        ],
                    ),
                ],
            ),
            Node::element(
                "insert",
                attrs(&[("id", "InsertUser")]),
                vec![Node::text(
                    "INSERT INTO user (id, name) VALUES (#{id == 0 ? $AUTO : id}, #{name})",
                )],
            ),
            Node::element(
                "insert",
                attrs(&[("id", "InsertUserBatch")]),
                vec![
                    Node::text("INSERT INTO user (id, name) VALUES "),
                    Node::element(
                        "foreach",
                        attrs(&[("collection", "users"), ("item", "user"), ("separator", ",")]),
                        vec![Node::element(
                            "if",
                            attrs(&[("test", "user.Age >= 10")]),
                            vec![Node::text("(#{user.Id}, #{user.Name})")],
                        )],
                    ),
                ],
            ),
            Node::element(
                "update",
                attrs(&[("id", "UpdateSelective")]),
                vec![
                    Node::text("update user"),
                    Node::element(
                        "set",
                        vec![],
                        vec![
                            Node::element(
                                "if",
                                attrs(&[("test", "name != 0 && name != null && name != ''")]),
                                vec![Node::text("name = #{name},")],
                            ),
                            Node::element(
                                "if",
                                attrs(&[("test", "age != 0 && age != null && age != ''")]),
                                vec![Node::text("age = #{age},")],
                            ),
                        ],
                    ),
                    Node::element(
                        "where",
                        vec![],
                        vec![Node::text(" and id = #{id}")],
                    ),
                ],
            ),
            Node::element(
                "select",
                attrs(&[("id", "SelectAll")]),
                vec![
                    Node::text("select "),
                    Node::element("include", attrs(&[("refid", "UserColumns")]), vec![]),
                    Node::text(" from user"),
                    Node::element(
                        "where",
                        vec![],
                        vec![Node::element(
                            "if",
                            attrs(&[("test", "EQ_name != null && EQ_name != ''")]),
                            vec![Node::text(" and name = #{EQ_name}")],
                        )],
                    ),
                    Node::element(
                        "if",
                        attrs(&[("test", "order != ''")]),
                        vec![Node::text(" order by ${order}")],
                    ),
                    Node::text(" limit #{offset},#{limit}"),
                ],
            ),
        ],
    })
}

fn user(id: i64, name: &str, age: i64) -> Value {
    Value::record(
        FieldRecord::new()
            .aliased("id", "Id", id)
            .aliased("name", "Name", name)
            .aliased("age", "Age", age),
    )
}

#[test]
fn get_user_with_id_list_and_name() {
    let mapper = user_mapper();
    let registry = Registry::with_builtins();
    let mut scope = Scope::new();
    scope.set("ids", vec![1i64, 2, 3]);
    scope.set("name", "bob");
    let r = mapper.render("GetUser", &mut scope, &registry).unwrap();
    assert_eq!(
        r.sql,
        "SELECT id, name FROM user where id in ( ?,?,? ) and name = ? "
    );
    let bound: Vec<String> = r.params.iter().map(|p| p.render_text()).collect();
    assert_eq!(bound, vec!["1", "2", "3", "bob"]);
}

#[test]
fn get_user_without_name_filter() {
    let mapper = user_mapper();
    let registry = Registry::with_builtins();
    let mut scope = Scope::new();
    scope.set("ids", vec![4i64]);
    let r = mapper.render("GetUser", &mut scope, &registry).unwrap();
    assert_eq!(r.sql, "SELECT id, name FROM user where id in ( ? ) ");
    assert_eq!(r.params.len(), 1);
}

#[test]
fn insert_uses_auto_for_zero_primary_key() {
    let mapper = user_mapper();
    let registry = Registry::with_builtins();

    let mut scope = Scope::new();
    scope.set("id", 0i64);
    scope.set("name", "bob");
    let r = mapper.render("InsertUser", &mut scope, &registry).unwrap();
    assert_eq!(r.sql, "INSERT INTO user (id, name) VALUES (DEFAULT, ?)");
    assert_eq!(r.params.len(), 1);

    let mut scope = Scope::new();
    scope.set("id", 42i64);
    scope.set("name", "bob");
    let r = mapper.render("InsertUser", &mut scope, &registry).unwrap();
    assert_eq!(r.sql, "INSERT INTO user (id, name) VALUES (?, ?)");
    assert_eq!(r.params[0].render_text(), "42");
}

#[test]
fn batch_insert_filters_rows_through_record_fields() {
    let mapper = user_mapper();
    let registry = Registry::with_builtins();
    let mut scope = Scope::new();
    scope.set(
        "users",
        Value::Seq(vec![user(1, "bob", 20), user(2, "kid", 9)]),
    );
    let r = mapper
        .render("InsertUserBatch", &mut scope, &registry)
        .unwrap();
    // The under-age row renders nothing, so no dangling separator either.
    assert_eq!(r.sql, "INSERT INTO user (id, name) VALUES (?, ?)");
    let bound: Vec<String> = r.params.iter().map(|p| p.render_text()).collect();
    assert_eq!(bound, vec!["1", "bob"]);
}

#[test]
fn selective_update_skips_absent_columns() {
    let mapper = user_mapper();
    let registry = Registry::with_builtins();
    let mut scope = Scope::new();
    scope.set("name", "bob");
    scope.set("id", 7i64);
    let r = mapper
        .render("UpdateSelective", &mut scope, &registry)
        .unwrap();
    assert_eq!(r.sql, "update user set name = ?  where id = ? ");
    let bound: Vec<String> = r.params.iter().map(|p| p.render_text()).collect();
    assert_eq!(bound, vec!["bob", "7"]);
}

#[test]
fn select_all_with_order_and_paging() {
    let mapper = user_mapper();
    let registry = Registry::with_builtins();
    let mut scope = Scope::new();
    scope.set("EQ_name", "bob");
    scope.set("order", "id desc");
    scope.set("offset", 0i64);
    scope.set("limit", 10i64);
    let r = mapper.render("SelectAll", &mut scope, &registry).unwrap();
    assert_eq!(
        r.sql,
        "select id, name from user where name = ?  order by id desc limit ?,?"
    );
    let bound: Vec<String> = r.params.iter().map(|p| p.render_text()).collect();
    assert_eq!(bound, vec!["bob", "0", "10"]);
}

#[test]
fn select_all_without_filters_or_order() {
    let mapper = user_mapper();
    let registry = Registry::with_builtins();
    let mut scope = Scope::new();
    scope.set("order", "");
    scope.set("offset", 20i64);
    scope.set("limit", 10i64);
    let r = mapper.render("SelectAll", &mut scope, &registry).unwrap();
    assert_eq!(r.sql, "select id, name from user limit ?,?");
    let bound: Vec<String> = r.params.iter().map(|p| p.render_text()).collect();
    assert_eq!(bound, vec!["20", "10"]);
}

#[test]
fn custom_paging_tag_appends_bound_limit() {
    let mapper = user_mapper();
    let registry = Registry::with_builtins();
    registry.register_tag(
        "page",
        |renderer: &sqlweave::Renderer,
         el: &Element,
         scope: &mut Scope,
         out: &mut String,
         params: &mut Vec<Value>| {
            renderer.render_children(&el.children, scope, out, params)?;
            let size = el.attr("size").unwrap_or("10");
            out.push_str(" limit ?");
            params.push(Value::Int(size.parse().unwrap_or(10)));
            Ok(())
        },
    );

    let stmt = match Node::element(
        "select",
        attrs(&[("id", "Paged")]),
        vec![Node::element(
            "page",
            attrs(&[("size", "25")]),
            vec![Node::text("SELECT id, name FROM user")],
        )],
    ) {
        Node::Element(el) => el,
        Node::Text(_) => unreachable!(),
    };
    let mut scope = Scope::new();
    let r = sqlweave::render(&stmt, &mut scope, &registry).unwrap();
    assert_eq!(r.sql, "SELECT id, name FROM user limit ?");
    assert_eq!(r.params[0].render_text(), "25");
    // The mapper itself is untouched by the extra registration.
    let mut scope = Scope::new();
    scope.set("ids", vec![1i64]);
    assert!(mapper.render("GetUser", &mut scope, &registry).is_ok());
}

#[test]
fn statements_are_reusable_across_scopes() {
    let mapper = user_mapper();
    let registry = Registry::with_builtins();
    for id in [1i64, 2, 3] {
        let mut scope = Scope::new();
        scope.set("ids", vec![id]);
        let r = mapper.render("GetUser", &mut scope, &registry).unwrap();
        assert_eq!(r.params.len(), 1);
        assert_eq!(r.params[0].render_text(), id.to_string());
    }
}
