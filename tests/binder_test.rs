//! Integration tests for argument binding through a built service.

use rpc_schema::{
    Attribute, CallArgs, CallError, IpAddrOptions, MethodDecl, MethodSignature, Service,
    ServiceBuilder, EAGAIN, EINVAL,
};
use serde_json::{json, Map, Value};

fn service(name: &str, params: &[&str], accepts: Vec<Attribute>) -> Service {
    let mut builder = ServiceBuilder::new();
    builder.method(MethodDecl::new(MethodSignature::new(name, params.iter().copied()), accepts).unwrap());
    builder.build().unwrap()
}

fn kwargs(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected object"),
    }
}

// === Dict with required and defaulted children ===

mod dict_method {
    use super::*;

    fn pair_service() -> Service {
        service(
            "pair.set",
            &["data"],
            vec![Attribute::dict(
                "data",
                vec![
                    Attribute::int("a").required(),
                    Attribute::int("b").default(json!(10)),
                ],
            )],
        )
    }

    fn bind(data: Value) -> Result<Vec<Value>, rpc_schema::ValidationErrors> {
        pair_service()
            .method("pair.set")
            .unwrap()
            .bind(&CallArgs::positional(vec![data]))
    }

    #[test]
    fn default_is_filled() {
        assert_eq!(bind(json!({"a": 5})).unwrap(), vec![json!({"a": 5, "b": 10})]);
    }

    #[test]
    fn missing_required_child() {
        let errors = bind(json!({"b": 10})).unwrap_err();
        assert!(errors.contains("a"));
        let entry = errors.for_attribute("a").next().unwrap();
        assert_eq!(entry.errmsg, "attribute required");
    }

    #[test]
    fn wrong_type_child() {
        let errors = bind(json!({"a": "x"})).unwrap_err();
        let entry = errors.for_attribute("a").next().unwrap();
        assert_eq!(entry.errmsg, "Not an integer");
        assert_eq!(entry.errno, EINVAL);
    }

    #[test]
    fn digit_string_is_coerced() {
        assert_eq!(bind(json!({"a": "7"})).unwrap(), vec![json!({"a": 7, "b": 10})]);
    }

    #[test]
    fn unknown_key_is_rejected() {
        let errors = bind(json!({"a": 1, "c": 2})).unwrap_err();
        assert_eq!(errors.for_attribute("c").next().unwrap().errmsg, "Field was not expected");
    }

    #[test]
    fn not_provided_dict_checks_children() {
        let service = pair_service();
        let accepts = service.method("pair.set").unwrap();
        let errors = accepts.bind(&CallArgs::default()).unwrap_err();
        assert_eq!(errors.for_attribute("a").next().unwrap().errmsg, "attribute required");
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn not_provided_dict_fills_child_defaults() {
        let service = service(
            "pool.scrub",
            &["options"],
            vec![Attribute::dict(
                "options",
                vec![
                    Attribute::int("threshold").default(json!(35)),
                    Attribute::dict("inner", vec![Attribute::bool("force").default(json!(false))]),
                ],
            )],
        );
        let bound = service
            .method("pool.scrub")
            .unwrap()
            .bind(&CallArgs::default())
            .unwrap();
        assert_eq!(
            bound,
            vec![json!({"threshold": 35, "inner": {"force": false}})]
        );
    }

    #[test]
    fn default_is_never_aliased() {
        let service = service(
            "m",
            &["tags"],
            vec![Attribute::list("tags", vec![Attribute::str("tag")]).default(json!(["a"]))],
        );
        let accepts = service.method("m").unwrap();
        let mut first = accepts.bind(&CallArgs::default()).unwrap();
        first[0].as_array_mut().unwrap().push(json!("b"));

        let second = accepts.bind(&CallArgs::default()).unwrap();
        assert_eq!(second, vec![json!(["a"])]);
    }
}

// === IP address validation runs after cleaning ===

mod ipaddr_method {
    use super::*;

    #[test]
    fn cidr_is_checked_by_validate_not_clean() {
        let attr = Attribute::ipaddr(
            "address",
            IpAddrOptions {
                cidr: true,
                ..Default::default()
            },
        );
        assert_eq!(attr.clean(Some(json!("192.168.1.1"))).unwrap(), json!("192.168.1.1"));

        let errors = attr.validate(&json!("192.168.1.1")).unwrap_err();
        let entry = errors.for_attribute("address").next().unwrap();
        assert!(entry.errmsg.contains("CIDR"));

        let service = service("iface.alias", &["address"], vec![attr]);
        let errors = service
            .method("iface.alias")
            .unwrap()
            .bind(&CallArgs::positional(vec![json!("192.168.1.1")]))
            .unwrap_err();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn sibling_lists_report_independently() {
        let service = service(
            "network.configure",
            &["data"],
            vec![Attribute::dict(
                "data",
                vec![
                    Attribute::list("aliases", vec![Attribute::ipaddr("address", IpAddrOptions::default())])
                        .unique(),
                    Attribute::list("gateways", vec![Attribute::ipaddr("address", IpAddrOptions::default())]),
                ],
            )],
        );
        let errors = service
            .method("network.configure")
            .unwrap()
            .bind(&CallArgs::positional(vec![json!({
                "aliases": ["10.0.0.1", "10.0.0.1", "10.0.0.2", "10.0.0.1"],
                "gateways": ["10.0.0.254", "not-an-ip"]
            })]))
            .unwrap_err();

        assert!(errors.contains("data.aliases.1"));
        assert!(errors.contains("data.aliases.3"));
        assert!(!errors.contains("data.aliases.0"));
        assert!(!errors.contains("data.aliases.2"));
        assert!(errors.contains("data.gateways.1.address"));
        assert_eq!(errors.len(), 3);
    }
}

// === Positional / keyword binding ===

mod binding {
    use super::*;

    fn create_service() -> Service {
        service(
            "pool.create",
            &["name", "options"],
            vec![
                Attribute::str("name").required().non_empty(),
                Attribute::dict("options", vec![Attribute::bool("force").default(json!(false))]),
            ],
        )
    }

    #[test]
    fn mixed_positional_and_keyword() {
        let service = create_service();
        let accepts = service.method("pool.create").unwrap();
        let args = CallArgs {
            positional: vec![json!("tank")],
            keyword: kwargs(json!({"options": {"force": true}})),
        };
        assert_eq!(
            accepts.bind(&args).unwrap(),
            vec![json!("tank"), json!({"force": true})]
        );
    }

    #[test]
    fn every_parameter_is_attempted() {
        let service = create_service();
        let accepts = service.method("pool.create").unwrap();
        let args = CallArgs::positional(vec![json!(""), json!({"force": "yes"})]);
        let errors = accepts.bind(&args).unwrap_err();
        assert!(errors.contains("name"));
        assert!(errors.contains("force"));
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn wire_encoding() {
        let service = create_service();
        let errors = service
            .method("pool.create")
            .unwrap()
            .bind(&CallArgs::default())
            .unwrap_err();
        let wire = errors.to_wire();
        assert_eq!(wire["error"], json!(EAGAIN));
        assert_eq!(wire["type"], json!("VALIDATION"));
        assert_eq!(wire["extra"], json!([["name", "attribute required", EINVAL]]));
    }
}

// === Calling the wrapped method ===

mod calling {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Job {
        id: u32,
    }

    fn job_service() -> Service {
        let mut builder = ServiceBuilder::new();
        builder.method(
            MethodDecl::new(
                MethodSignature::new("replication.run", ["id"]).job(),
                vec![Attribute::int("id").required()],
            )
            .unwrap(),
        );
        builder.build().unwrap()
    }

    #[test]
    fn sync_method_receives_cleaned_values() {
        let service = job_service();
        let accepts = service.method("replication.run").unwrap();
        let result: Result<u64, CallError<String>> = accepts.call(
            Job { id: 1 },
            &CallArgs::positional(vec![json!("42")]),
            |job, params| {
                assert_eq!(job, Job { id: 1 });
                params[0].as_u64().ok_or_else(|| "bad".to_string())
            },
        );
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn method_error_is_passed_through() {
        let service = job_service();
        let accepts = service.method("replication.run").unwrap();
        let result: Result<(), CallError<String>> =
            accepts.call((), &CallArgs::positional(vec![json!(1)]), |_, _| {
                Err("boom".to_string())
            });
        assert!(matches!(result, Err(CallError::Method(ref e)) if e == "boom"));
    }

    #[tokio::test]
    async fn async_method_runs_after_binding() {
        let service = job_service();
        let accepts = service.method("replication.run").unwrap();

        let ok: Result<u64, CallError<()>> = accepts
            .call_async((), &CallArgs::positional(vec![json!(7)]), |_, params| async move {
                Ok(params[0].as_u64().unwrap_or(0) * 2)
            })
            .await;
        assert_eq!(ok.unwrap(), 14);

        let rejected: Result<u64, CallError<()>> = accepts
            .call_async((), &CallArgs::positional(vec![json!("x")]), |_, _| async move {
                if true {
                    panic!("body must not run");
                }
                Ok(0)
            })
            .await;
        let errors = rejected.unwrap_err();
        assert!(errors.validation().unwrap().contains("id"));
    }
}
