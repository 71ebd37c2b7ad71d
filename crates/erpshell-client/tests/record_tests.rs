//! Wire shapes of the record, workflow, wizard and report operations.

mod common;

use pretty_assertions::assert_eq;
use serde_json::{Value, json};

use common::*;
use erpshell_client::{Error, FieldSpec, Kwargs, Level, SearchOptions, Selector};

fn morice() -> Value {
    json!([["name", "like", "Morice"]])
}

fn kwargs(pairs: &[(&str, Value)]) -> Kwargs {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

/// Answers `search` with ids and `read` with one record per id whose values
/// are `v_<field>`.
fn records_responder(transport: &MockTransport) {
    transport.respond_with(|service, method, args| {
        if service != "object" || method != "execute" {
            return None;
        }
        match args.get(4).and_then(Value::as_str) {
            Some("search") => Some(json!([1, 2])),
            Some("read") => {
                let fields: Vec<String> = args
                    .get(6)
                    .and_then(|f| serde_json::from_value(f.clone()).ok())
                    .unwrap_or_default();
                let record: serde_json::Map<String, Value> =
                    fields.iter().map(|f| (f.clone(), json!(format!("v_{f}")))).collect();
                Some(json!([record.clone(), record]))
            }
            _ => None,
        }
    });
}

#[tokio::test]
async fn test_search_shapes() {
    let harness = connected("6.1").await;
    let client = &harness.client;

    client.search("foo.bar", vec!["name like Morice"], SearchOptions::new()).await.unwrap();
    client.search("foo.bar", vec!["name like Morice"], SearchOptions::new().limit(2)).await.unwrap();
    client
        .search("foo.bar", vec!["name like Morice"], SearchOptions::new().offset(80).limit(99))
        .await
        .unwrap();
    client
        .search("foo.bar", vec!["name like Morice"], SearchOptions::new().order("name ASC"))
        .await
        .unwrap();
    client
        .search("foo.bar", vec!["name = mushroom", "state != draft"], SearchOptions::new())
        .await
        .unwrap();
    client
        .search("foo.bar", vec![("name", "like", "Morice")], SearchOptions::new())
        .await
        .unwrap();
    client
        .execute("foo.bar", "search", vec![json!(["name like Morice"])], SearchOptions::new())
        .await
        .unwrap();
    client.search("foo.bar", Vec::<&str>::new(), SearchOptions::new()).await.unwrap();

    assert_eq!(
        harness.transport.take_calls(),
        vec![
            obj("foo.bar", "search", vec![morice()]),
            obj("foo.bar", "search", vec![morice(), json!(0), json!(2), Value::Null, Value::Null]),
            obj("foo.bar", "search", vec![morice(), json!(80), json!(99), Value::Null, Value::Null]),
            obj("foo.bar", "search", vec![morice(), json!(0), Value::Null, json!("name ASC"), Value::Null]),
            obj(
                "foo.bar",
                "search",
                vec![json!([["name", "=", "mushroom"], ["state", "!=", "draft"]])]
            ),
            obj("foo.bar", "search", vec![morice()]),
            obj("foo.bar", "search", vec![morice()]),
            obj("foo.bar", "search", vec![json!([])]),
        ]
    );
    assert!(harness.reporter.is_empty());
}

#[tokio::test]
async fn test_search_legacy_string_domain_warns_once() {
    let harness = connected("6.1").await;
    harness
        .client
        .search("foo.bar", "name like Morice", SearchOptions::new())
        .await
        .unwrap();

    assert_eq!(harness.transport.take_calls(), vec![obj("foo.bar", "search", vec![morice()])]);
    assert_eq!(
        harness.reporter.messages(Level::Warning),
        vec!["Domain should be a list: ['name like Morice']".to_string()]
    );
}

#[tokio::test]
async fn test_unknown_option_is_ignored_and_reported() {
    let harness = connected("6.1").await;
    harness
        .client
        .call(
            "search",
            vec![json!("foo.bar"), json!(["name like Morice"])],
            kwargs(&[("missingkey", json!(42))]),
        )
        .await
        .unwrap();

    assert_eq!(
        harness.transport.take_calls(),
        vec![obj(
            "foo.bar",
            "search",
            vec![morice(), json!(0), Value::Null, Value::Null, Value::Null]
        )]
    );
    assert_eq!(
        harness.reporter.messages(Level::Notice),
        vec!["Ignoring: missingkey = 42".to_string()]
    );
}

#[tokio::test]
async fn test_malformed_terms_fail_before_any_call() {
    let harness = connected("6.1").await;
    for term in ["abc", "< id", "name Morice"] {
        let err = harness
            .client
            .search("foo.bar", vec![term], SearchOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidDomain(_)), "{term}: {err:?}");
        let err = harness
            .client
            .count("foo.bar", vec![term], SearchOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidDomain(_)), "{term}: {err:?}");
    }
    assert!(harness.transport.take_calls().is_empty());
}

#[tokio::test]
async fn test_count_shapes() {
    let harness = connected("6.1").await;
    harness.transport.respond_with(|_, _, _| Some(json!(4)));
    let client = &harness.client;

    assert_eq!(client.count("foo.bar", vec!["name like Morice"], SearchOptions::new()).await.unwrap(), 4);
    client
        .execute("foo.bar", "search_count", vec![json!(["name like Morice"])], SearchOptions::new())
        .await
        .unwrap();
    client.count("foo.bar", Vec::<&str>::new(), SearchOptions::new()).await.unwrap();
    client
        .count("foo.bar", Vec::<&str>::new(), SearchOptions::new().context(json!({"lang": "fr_FR"})))
        .await
        .unwrap();

    assert_eq!(
        harness.transport.take_calls(),
        vec![
            obj("foo.bar", "search_count", vec![morice()]),
            obj("foo.bar", "search_count", vec![morice()]),
            obj("foo.bar", "search_count", vec![json!([])]),
            obj("foo.bar", "search_count", vec![json!([]), json!({"lang": "fr_FR"})]),
        ]
    );

    for options in [
        SearchOptions::new().limit(2),
        SearchOptions::new().offset(80).limit(99),
        SearchOptions::new().order("name ASC"),
    ] {
        let err = client.count("foo.bar", vec!["name like Morice"], options).await.unwrap_err();
        assert!(matches!(err, Error::Type(_)));
    }
    assert!(harness.transport.take_calls().is_empty());
}

#[tokio::test]
async fn test_read_by_ids_keeps_shape() {
    let harness = connected("6.1").await;
    let client = &harness.client;

    client.read("foo.bar", 42_i64, FieldSpec::All, SearchOptions::new()).await.unwrap();
    client.read("foo.bar", vec![42_i64], FieldSpec::All, SearchOptions::new()).await.unwrap();
    client.read("foo.bar", vec![13_i64, 17], FieldSpec::All, SearchOptions::new()).await.unwrap();
    client.read("foo.bar", vec![42_i64], "first_name", SearchOptions::new()).await.unwrap();

    assert_eq!(
        harness.transport.take_calls(),
        vec![
            obj("foo.bar", "read", vec![json!(42), Value::Null]),
            obj("foo.bar", "read", vec![json!([42]), Value::Null]),
            obj("foo.bar", "read", vec![json!([13, 17]), Value::Null]),
            obj("foo.bar", "read", vec![json!([42]), json!(["first_name"])]),
        ]
    );
}

#[tokio::test]
async fn test_read_by_domain_searches_first() {
    let harness = connected("6.1").await;
    records_responder(&harness.transport);
    let client = &harness.client;
    let ids = json!([1, 2]);

    client
        .read("foo.bar", vec!["name like Morice"], FieldSpec::All, SearchOptions::new())
        .await
        .unwrap();
    client
        .read("foo.bar", vec!["name like Morice"], "birthdate city", SearchOptions::new().limit(2))
        .await
        .unwrap();
    client
        .execute("foo.bar", "read", vec![json!(["name like Morice"])], SearchOptions::new())
        .await
        .unwrap();
    client
        .call(
            "read",
            vec![json!("foo.bar"), json!(["name like Morice"])],
            kwargs(&[("limit", json!(2)), ("fields", json!(["birthdate", "city"]))]),
        )
        .await
        .unwrap();

    assert_eq!(
        harness.transport.take_calls(),
        vec![
            obj("foo.bar", "search", vec![morice()]),
            obj("foo.bar", "read", vec![ids.clone(), Value::Null]),
            obj("foo.bar", "search", vec![morice(), json!(0), json!(2), Value::Null, Value::Null]),
            obj("foo.bar", "read", vec![ids.clone(), json!(["birthdate", "city"])]),
            obj("foo.bar", "search", vec![morice()]),
            obj("foo.bar", "read", vec![ids.clone(), Value::Null]),
            obj("foo.bar", "search", vec![morice(), json!(0), json!(2), Value::Null, Value::Null]),
            obj("foo.bar", "read", vec![ids, json!(["birthdate", "city"])]),
        ]
    );
}

#[tokio::test]
async fn test_read_template_renders_each_record() {
    let harness = connected("6.1").await;
    records_responder(&harness.transport);

    let rendered = harness
        .client
        .read(
            "foo.bar",
            vec!["name like Morice"],
            "aaa %(birthdate)s bbb %(city)s",
            SearchOptions::new().offset(80).limit(99),
        )
        .await
        .unwrap();

    assert_eq!(rendered, json!(["aaa v_birthdate bbb v_city", "aaa v_birthdate bbb v_city"]));
    assert_eq!(
        harness.transport.take_calls(),
        vec![
            obj("foo.bar", "search", vec![morice(), json!(80), json!(99), Value::Null, Value::Null]),
            obj("foo.bar", "read", vec![json!([1, 2]), json!(["birthdate", "city"])]),
        ]
    );
}

#[tokio::test]
async fn test_read_context_is_forwarded() {
    let harness = connected("6.1").await;
    records_responder(&harness.transport);
    let context = json!({"lang": "fr_FR"});

    harness
        .client
        .read(
            "foo.bar",
            Selector::from_value(json!(["name like Morice"])).unwrap(),
            FieldSpec::All,
            SearchOptions::new().context(context.clone()),
        )
        .await
        .unwrap();

    assert_eq!(
        harness.transport.take_calls(),
        vec![
            obj("foo.bar", "search", vec![morice(), json!(0), Value::Null, Value::Null, context.clone()]),
            obj("foo.bar", "read", vec![json!([1, 2]), Value::Null, context]),
        ]
    );
}

#[tokio::test]
async fn test_standard_methods_pass_ids_through() {
    let harness = connected("6.1").await;
    let client = &harness.client;

    for method in ["write", "create", "copy", "unlink", "perm_read", "button_confirm"] {
        for ids in [json!(42), json!([42]), json!([13, 17]), json!([])] {
            client.call(method, vec![json!("foo.bar"), ids], Kwargs::new()).await.unwrap();
        }
        client
            .execute("foo.bar", method, vec![json!([42])], SearchOptions::new())
            .await
            .unwrap();
        assert_eq!(
            harness.transport.take_calls(),
            vec![
                obj("foo.bar", method, vec![json!(42)]),
                obj("foo.bar", method, vec![json!([42])]),
                obj("foo.bar", method, vec![json!([13, 17])]),
                obj("foo.bar", method, vec![json!([])]),
                obj("foo.bar", method, vec![json!([42])]),
            ]
        );

        let err = client.call(method, vec![], Kwargs::new()).await.unwrap_err();
        assert!(matches!(err, Error::Type(_)), "{method}: {err:?}");
        let err = client.call(method, vec![json!(42)], Kwargs::new()).await.unwrap_err();
        assert!(matches!(err, Error::Assertion(_)), "{method}: {err:?}");
    }
}

#[tokio::test]
async fn test_paging_options_on_other_methods_are_reported() {
    let harness = connected("6.1").await;
    let client = &harness.client;

    client
        .call(
            "write",
            vec![json!("foo.bar"), json!(42), json!({"name": "x"})],
            kwargs(&[("limit", json!(5))]),
        )
        .await
        .unwrap();
    client
        .execute("foo.bar", "button_confirm", vec![json!([42])], SearchOptions::new().offset(3).order("name"))
        .await
        .unwrap();

    assert_eq!(
        harness.transport.take_calls(),
        vec![
            obj("foo.bar", "write", vec![json!(42), json!({"name": "x"})]),
            obj("foo.bar", "button_confirm", vec![json!([42])]),
        ]
    );
    assert_eq!(
        harness.reporter.messages(Level::Notice),
        vec![
            "Ignoring: limit = 5".to_string(),
            "Ignoring: offset = 3".to_string(),
            "Ignoring: order = 'name'".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_typed_write_and_create() {
    let harness = connected("6.1").await;
    let client = &harness.client;

    client.write("res.partner", vec![1, 2], json!({"active": false})).await.unwrap();
    client.create("res.partner", json!({"name": "Morice"})).await.unwrap();
    client.copy("res.partner", 7, Some(json!({"name": "Copy"}))).await.unwrap();
    client.unlink("res.partner", Vec::<i64>::new()).await.unwrap();

    assert_eq!(
        harness.transport.take_calls(),
        vec![
            obj("res.partner", "write", vec![json!([1, 2]), json!({"active": false})]),
            obj("res.partner", "create", vec![json!({"name": "Morice"})]),
            obj("res.partner", "copy", vec![json!(7), json!({"name": "Copy"})]),
            obj("res.partner", "unlink", vec![json!([])]),
        ]
    );
}

#[tokio::test]
async fn test_execute_kw() {
    let harness = connected("6.1").await;
    let client = &harness.client;

    client.execute_kw("foo.bar", "any_method", vec![json!(42)]).await.unwrap();
    client.execute_kw("foo.bar", "any_method", vec![json!([13, 17])]).await.unwrap();

    let expected = |arg: Value| authed("object", "execute_kw", vec![json!("foo.bar"), json!("any_method"), arg]);
    assert_eq!(
        harness.transport.take_calls(),
        vec![expected(json!(42)), expected(json!([13, 17]))]
    );
}

#[tokio::test]
async fn test_exec_workflow_arity() {
    let harness = connected("6.1").await;
    let client = &harness.client;

    client
        .call("exec_workflow", vec![json!("foo.bar"), json!("light"), json!(42)], Kwargs::new())
        .await
        .unwrap();

    let type_errors = [
        vec![],
        vec![json!("foo.bar")],
        vec![json!("foo.bar"), json!("rip")],
        vec![json!("foo.bar"), json!("rip"), json!(42), Value::Null],
    ];
    for args in type_errors {
        let err = client.call("exec_workflow", args, Kwargs::new()).await.unwrap_err();
        assert!(matches!(err, Error::Type(_)), "{err:?}");
    }
    for args in [
        vec![json!(42), json!("rip"), json!(42)],
        vec![json!("foo.bar"), json!(42), json!(42)],
    ] {
        let err = client.call("exec_workflow", args, Kwargs::new()).await.unwrap_err();
        assert!(matches!(err, Error::Assertion(_)), "{err:?}");
    }

    assert_eq!(
        harness.transport.take_calls(),
        vec![authed(
            "object",
            "exec_workflow",
            vec![json!("foo.bar"), json!("light"), json!(42)]
        )]
    );
}

#[tokio::test]
async fn test_wizard() {
    let harness = connected("6.1").await;
    harness.transport.push("wizard.create", [json!(3), json!(3)]);
    let client = &harness.client;

    assert_eq!(client.wizard("foo.bar", None, None, None).await.unwrap(), json!(3));
    client.wizard("billy", None, Some("shake"), None).await.unwrap();
    client.wizard(42_i64, None, Some("kick"), None).await.unwrap();
    let err = client.call("wizard", vec![], Kwargs::new()).await.unwrap_err();
    assert!(matches!(err, Error::Type(_)));

    assert_eq!(
        harness.transport.take_calls(),
        vec![
            authed("wizard", "create", vec![json!("foo.bar")]),
            authed("wizard", "create", vec![json!("billy")]),
            authed("wizard", "execute", vec![json!(3), json!({}), json!("shake"), Value::Null]),
            authed("wizard", "execute", vec![json!(42), json!({}), json!("kick"), Value::Null]),
        ]
    );
}

#[tokio::test]
async fn test_reports_and_access() {
    let harness = connected("6.1").await;
    let client = &harness.client;

    client.report("foo.bar", json!([1, 2]), None, None).await.unwrap();
    client.render_report("foo.bar", json!([1, 2]), None, None).await.unwrap();
    client.report_get(5).await.unwrap();
    client.access("foo.bar", "read").await.unwrap();
    client.call("access", vec![json!("foo.bar")], Kwargs::new()).await.unwrap();

    assert_eq!(
        harness.transport.take_calls(),
        vec![
            authed("report", "report", vec![json!("foo.bar"), json!([1, 2])]),
            authed("report", "render_report", vec![json!("foo.bar"), json!([1, 2])]),
            authed("report", "report_get", vec![json!(5)]),
            obj("ir.model.access", "check", vec![json!("foo.bar"), json!("read")]),
            obj("ir.model.access", "check", vec![json!("foo.bar"), json!("read")]),
        ]
    );
}

#[tokio::test]
async fn test_dynamic_search_argument_checks() {
    let harness = connected("6.1").await;
    let client = &harness.client;

    let err = client.call("search", vec![], Kwargs::new()).await.unwrap_err();
    assert!(matches!(err, Error::Type(_)));
    let err = client.call("search", vec![json!({})], Kwargs::new()).await.unwrap_err();
    assert!(matches!(err, Error::Assertion(_)));
    let err = client.call("read", vec![], Kwargs::new()).await.unwrap_err();
    assert!(matches!(err, Error::Type(_)));
    let err = client.call("read", vec![json!("foo.bar")], Kwargs::new()).await.unwrap_err();
    assert!(matches!(err, Error::Assertion(_)));
    let err = client
        .call("count", vec![json!("foo.bar"), json!([])], kwargs(&[("limit", json!(2))]))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Type(_)));
    // paging is rejected before the positional arguments are looked at
    let err = client
        .call("count", vec![json!(["name like Morice"])], kwargs(&[("limit", json!(2))]))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Type(_)), "{err:?}");
    let err = client.call("_private", vec![json!("foo.bar")], Kwargs::new()).await.unwrap_err();
    assert!(matches!(err, Error::MissingAttribute { .. }));

    assert!(harness.transport.take_calls().is_empty());
}
