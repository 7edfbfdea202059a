use delmo::mock::{Call, MockTransport};
use delmo::step::{self, StepFuture};
use delmo::{Config, Hooks, Instance, Model, ModelError, Operation, Response};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn user_model(transport: &MockTransport) -> Model {
    Model::new("User", Config::new().transport(transport.clone()))
}

#[tokio::test]
async fn test_insert_with_echoing_transport_returns_input() {
    let transport = MockTransport::echo();
    let user = user_model(&transport);

    let created = user.insert(json!({"username": "taro"})).await.unwrap();
    assert_eq!(created, json!({"username": "taro"}));
    assert_eq!(
        transport.calls(),
        vec![Call::Create {
            body: json!({"username": "taro"})
        }]
    );
}

#[tokio::test]
async fn test_insert_runs_hooks_in_order() {
    let transport = MockTransport::new();
    transport
        .expect_create(json!({"trail": ["validate", "serialize", "demodelize"]}))
        .return_ok(json!({"stored": true}));

    let mark = |name: &'static str| {
        step::from_fn(move |mut data: Value| {
            data["trail"]
                .as_array_mut()
                .ok_or_else(|| ModelError::custom("no trail"))?
                .push(json!(name));
            Ok(data)
        })
    };
    let user = Model::new(
        "User",
        Config::new()
            .transport(transport.clone())
            .validate(mark("validate"))
            .serialize(mark("serialize"))
            .demodelize(mark("demodelize")),
    );

    let body = user.insert(json!({"trail": []})).await.unwrap();
    assert_eq!(body, json!({"stored": true}));
    transport.verify();
}

#[tokio::test]
async fn test_update_calls_replace_with_id_and_document() {
    let transport = MockTransport::new();
    transport
        .expect_replace(json!(12345), json!({"id": 12345, "username": "taro"}))
        .return_ok(json!({"id": 12345, "username": "taro"}));

    let user = user_model(&transport);
    let body = user
        .update(json!({"id": 12345, "username": "taro"}))
        .await
        .unwrap();

    assert_eq!(body["username"], "taro");
    transport.verify();
}

#[tokio::test]
async fn test_save_without_id_inserts() {
    let transport = MockTransport::new();
    transport
        .expect_create(json!({"username": "taro"}))
        .return_ok(json!({"id": 1, "username": "taro"}));

    let user = user_model(&transport);
    let saved = user.save(json!({"username": "taro"})).await.unwrap();

    assert_eq!(saved, json!({"id": 1, "username": "taro"}));
    transport.verify();
}

#[tokio::test]
async fn test_save_with_changed_remote_replaces() {
    let transport = MockTransport::new();
    transport
        .expect_read(json!(7))
        .return_ok(json!({"id": 7, "username": "taro"}));
    transport
        .expect_replace(json!(7), json!({"id": 7, "username": "jiro"}))
        .return_ok(json!({"id": 7, "username": "jiro"}));

    let user = user_model(&transport);
    let saved = user.save(json!({"id": 7, "username": "jiro"})).await.unwrap();

    assert_eq!(saved["username"], "jiro");
    transport.verify();
}

#[tokio::test]
async fn test_save_with_identical_remote_is_rejected() {
    let transport = MockTransport::new();
    transport
        .expect_read(json!(7))
        .return_ok(json!({"id": 7, "username": "taro"}));

    let user = user_model(&transport);
    let err = user
        .save(json!({"id": 7, "username": "taro"}))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "same object.");
    assert!(err.is_same_object());
    match err {
        ModelError::Rejected { params, .. } => assert_eq!(
            params,
            vec![json!([
                {"id": 7, "username": "taro"},
                {"id": 7, "username": "taro"}
            ])]
        ),
        other => panic!("Expected Rejected, got {other:?}"),
    }
    transport.verify();
}

#[tokio::test]
async fn test_save_with_missing_remote_inserts() {
    let transport = MockTransport::new();
    transport.expect_read(json!(7)).return_status(404, json!("not found"));
    transport
        .expect_create(json!({"id": 7, "username": "taro"}))
        .return_ok(json!({"id": 99, "username": "taro"}));
    transport
        .expect_replace(json!(7), json!({"id": 7, "username": "taro"}))
        .return_ok(json!({"id": 7, "username": "taro"}));

    let user = user_model(&transport);
    let saved = user.save(json!({"id": 7, "username": "taro"})).await.unwrap();

    // The insert result differs from the input, so the replace still runs.
    assert_eq!(saved, json!({"id": 7, "username": "taro"}));
    transport.verify();
}

#[tokio::test]
async fn test_save_propagates_other_fetch_failures() {
    let transport = MockTransport::new();
    transport.expect_read(json!(7)).return_status(500, json!(null));

    let user = user_model(&transport);
    let err = user
        .save(json!({"id": 7, "username": "taro"}))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert_eq!(err.to_string(), "Invalid status. 500: Internal Server Error");
    transport.verify();

    let transport = MockTransport::new();
    transport
        .expect_read(json!(7))
        .return_err(ModelError::custom("connection reset"));
    let user = user_model(&transport);
    let err = user.save(json!({"id": 7})).await.unwrap_err();
    assert_eq!(err.to_string(), "connection reset");
}

#[tokio::test]
async fn test_find_keeps_order_through_modelize_and_deserialize() {
    let transport = MockTransport::new();
    transport
        .expect_read(json!({"age": 20}))
        .return_ok(json!([{"n": 1}, {"n": 2}, {"n": 3}]));

    let deserialize = step::from_fn(|mut instance: Instance| {
        let n = instance["n"].as_i64().unwrap_or_default();
        instance["double"] = json!(n * 2);
        Ok(instance)
    });
    let user = Model::new(
        "User",
        Config::new()
            .transport(transport.clone())
            .deserialize(deserialize),
    );

    let found = user.find(json!({"age": 20})).await.unwrap();
    let data: Vec<Value> = found.into_iter().map(Value::from).collect();
    assert_eq!(
        data,
        vec![
            json!({"n": 1, "double": 2}),
            json!({"n": 2, "double": 4}),
            json!({"n": 3, "double": 6}),
        ]
    );
}

#[tokio::test]
async fn test_find_rejects_non_array_body() {
    let transport = MockTransport::new();
    transport.expect_read(json!({})).return_ok(json!({"total": 0}));

    let user = user_model(&transport);
    let err = user.find(json!({})).await.unwrap_err();
    assert!(matches!(err, ModelError::NotAnArray { .. }));
}

#[tokio::test]
async fn test_sync_and_async_hook_failures_propagate() {
    let transport = MockTransport::new();

    let sync_fail = Model::new(
        "SyncFail",
        Config::new()
            .transport(transport.clone())
            .validate(step::from_fn(|_| Err(ModelError::custom("username is required")))),
    );
    let err = sync_fail.insert(json!({})).await.unwrap_err();
    assert_eq!(err.to_string(), "username is required");

    let async_fail = Model::new(
        "AsyncFail",
        Config::new()
            .transport(transport.clone())
            .serialize(step::from_async(|_: Value| async {
                tokio::task::yield_now().await;
                Err(ModelError::custom("serializer unavailable"))
            })),
    );
    let err = async_fail.update(json!({"id": 1})).await.unwrap_err();
    assert_eq!(err.to_string(), "serializer unavailable");

    // Nothing reached the transport.
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn test_response_hook_failure_propagates() {
    let transport = MockTransport::echo();
    let user = Model::new(
        "User",
        Config::new()
            .transport(transport)
            .response(step::from_fn(|response: Response| {
                Err(ModelError::custom(format!("refused {}", response.status)))
            })),
    );
    assert_eq!(user.insert(json!({})).await.unwrap_err().to_string(), "refused 200");
}

#[tokio::test]
async fn test_by_id_is_idempotent() {
    let transport = MockTransport::new();
    transport.expect_read(json!(12)).return_ok(json!({"id": 12, "username": "taro"}));
    transport.expect_read(json!(12)).return_ok(json!({"id": 12, "username": "taro"}));

    let user = user_model(&transport);
    let first = user.by_id(json!(12)).await.unwrap();
    let second = user.by_id(json!({"id": 12})).await.unwrap();

    assert_eq!(first, second);
    assert!(first.model().is_some_and(|model| model.ptr_eq(&user)));
    transport.verify();
}

#[tokio::test]
async fn test_delete_accepts_bare_id_and_document() {
    let transport = MockTransport::new();
    transport.expect_remove(json!("abc")).return_ok(json!({"deleted": 1}));
    transport.expect_remove(json!("abc")).return_ok(json!({"deleted": 1}));

    let user = user_model(&transport);
    user.delete_by_id(json!("abc")).await.unwrap();
    user.delete_by_id(json!({"id": "abc"})).await.unwrap();
    transport.verify();
}

#[tokio::test]
async fn test_missing_transport_verb_reports_unimplemented() {
    let user = Model::new("User", Config::new());
    let err = user.find(json!({})).await.unwrap_err();
    assert_eq!(err.to_string(), "'transport.read' is not implemented");
}

#[tokio::test]
async fn test_custom_id_hook_selects_field() {
    let transport = MockTransport::new();
    transport.expect_read(json!("u-1")).return_ok(json!({"_id": "u-1"}));

    let user = Model::new(
        "User",
        Config::new()
            .transport(transport.clone())
            .id(delmo::identity::field("_id")),
    );
    user.by_id(json!({"_id": "u-1", "id": 5})).await.unwrap();
    transport.verify();
}

#[tokio::test]
async fn test_per_operation_override_only_affects_its_operation() {
    let transport = MockTransport::echo();
    let stamp = step::from_fn(|mut data: Value| {
        data["stamped"] = json!(true);
        Ok(data)
    });
    let user = Model::new(
        "User",
        Config::new()
            .transport(transport)
            .operation(Operation::Insert, Hooks::new().serialize(stamp)),
    );

    let inserted = user.insert(json!({"id": 1})).await.unwrap();
    let updated = user.update(json!({"id": 1})).await.unwrap();
    assert_eq!(inserted, json!({"id": 1, "stamped": true}));
    assert_eq!(updated, json!({"id": 1}));
}

#[tokio::test]
async fn test_child_model_inherits_parent_hooks() {
    let transport = MockTransport::echo();
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = {
        let calls = Arc::clone(&calls);
        step::from_fn(move |data: Value| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(data)
        })
    };

    let base = Model::new(
        "Base",
        Config::new().transport(transport).validate(counted),
    );
    let admin = base.inherits("Admin", Config::new().bind(false));

    admin.insert(json!({"role": "admin"})).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let found = admin.by_id(json!(1)).await.unwrap();
    assert!(!found.is_bound());
}

#[tokio::test]
async fn test_bound_instances_run_operations() {
    let transport = MockTransport::new();
    transport.expect_read(json!(3)).return_ok(json!({"id": 3, "name": "old"}));
    transport.expect_read(json!(3)).return_ok(json!({"id": 3, "name": "old"}));
    transport
        .expect_replace(json!(3), json!({"id": 3, "name": "new"}))
        .return_ok(json!({"id": 3, "name": "new"}));
    transport.expect_remove(json!(3)).return_ok(json!(null));

    let user = user_model(&transport);
    let mut record = user.by_id(json!(3)).await.unwrap();
    record["name"] = json!("new");

    let saved = record.save().await.unwrap();
    assert_eq!(saved["name"], "new");
    record.delete_by_id().await.unwrap();
    transport.verify();
}

#[tokio::test]
async fn test_custom_modelize_controls_instances() {
    let transport = MockTransport::new();
    transport.expect_read(json!(1)).return_ok(json!({"id": 1}));

    let modelize = Arc::new(|_model: Model, data: Value| -> StepFuture<Instance> {
        Box::pin(async move { Ok(Instance::new(json!({"wrapped": data}))) })
    });
    let user = Model::new(
        "User",
        Config::new().transport(transport.clone()).modelize(modelize),
    );

    let found = user.by_id(json!(1)).await.unwrap();
    assert_eq!(found, json!({"wrapped": {"id": 1}}));
    assert!(!found.is_bound());
}

#[tokio::test]
async fn test_save_treats_equal_numbers_as_unchanged() {
    let transport = MockTransport::new();
    transport
        .expect_read(json!(7))
        .return_ok(json!({"id": 7, "score": 1.0}));

    let user = user_model(&transport);
    let err = user.save(json!({"id": 7, "score": 1})).await.unwrap_err();

    assert!(err.is_same_object());
    transport.verify();
}

fn failing_id_model(transport: &MockTransport) -> Model {
    Model::new(
        "User",
        Config::new()
            .transport(transport.clone())
            .id(Arc::new(|_: &Value| -> delmo::Result<Value> {
                Err(ModelError::custom("bad id"))
            })),
    )
}

#[tokio::test]
async fn test_id_hook_failure_stops_update_and_by_id() {
    let transport = MockTransport::new();
    let user = failing_id_model(&transport);

    let err = user.update(json!({"id": 1})).await.unwrap_err();
    assert_eq!(err.to_string(), "bad id");

    let err = user.by_id(json!({"id": 1})).await.unwrap_err();
    assert_eq!(err.to_string(), "bad id");

    let err = user.delete_by_id(json!(1)).await.unwrap_err();
    assert_eq!(err.to_string(), "bad id");

    let err = user.save(json!({"id": 1})).await.unwrap_err();
    assert_eq!(err.to_string(), "bad id");

    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn test_deserialize_failure_fails_find() {
    let transport = MockTransport::new();
    transport
        .expect_read(json!({}))
        .return_ok(json!([{"n": 1}, {"n": 2}]));

    let user = Model::new(
        "User",
        Config::new()
            .transport(transport.clone())
            .deserialize(step::from_fn(|instance: Instance| {
                if instance["n"] == 2 {
                    Err(ModelError::custom("cannot read n=2"))
                } else {
                    Ok(instance)
                }
            })),
    );

    let err = user.find(json!({})).await.unwrap_err();
    assert_eq!(err.to_string(), "cannot read n=2");
    transport.verify();
}

#[tokio::test]
async fn test_modelize_failure_fails_by_id() {
    let transport = MockTransport::new();
    transport.expect_read(json!(1)).return_ok(json!({"id": 1}));

    let modelize = Arc::new(|_model: Model, _data: Value| -> StepFuture<Instance> {
        Box::pin(async { Err(ModelError::custom("no instance")) })
    });
    let user = Model::new(
        "User",
        Config::new().transport(transport.clone()).modelize(modelize),
    );

    let err = user.by_id(json!(1)).await.unwrap_err();
    assert_eq!(err.to_string(), "no instance");
    transport.verify();
}

#[tokio::test]
async fn test_null_body_becomes_bound_instance() {
    let transport = MockTransport::new();
    transport.expect_read(json!(1)).return_ok(json!(null));

    let user = user_model(&transport);
    let found = user.by_id(json!(1)).await.unwrap();

    assert!(found.is_bound());
    assert_eq!(found, json!(null));
    transport.verify();
}
