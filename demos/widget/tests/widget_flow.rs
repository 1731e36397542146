//! End-to-end widget scenarios: happy path, validation, entitlement
//! denial, and event propagation into the audit log.

use relay_core::{DispatchError, Principal};
use relay_testing::{DispatchTest, init_test_tracing};
use std::sync::Arc;
use widget::{
    AuditLog, CreateWidget, ExportWidget, RenameWidget, WidgetStore, build_dispatcher,
    build_event_dispatcher,
};

fn wire() -> (Arc<AuditLog>, relay_runtime::Dispatcher) {
    let audit = Arc::new(AuditLog::default());
    let events = Arc::new(build_event_dispatcher(Arc::clone(&audit)));
    let store = Arc::new(WidgetStore::default());
    let dispatcher = build_dispatcher(store, events);
    (audit, dispatcher)
}

#[tokio::test]
async fn creating_a_widget_returns_its_view_and_audits_the_event() {
    init_test_tracing();
    let (audit, dispatcher) = wire();

    let view = dispatcher
        .dispatch(CreateWidget {
            name: "Foo".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(view.name, "Foo");
    assert_eq!(
        audit.entries(),
        vec![format!("widget {} created as 'Foo'", view.id)]
    );
}

#[tokio::test]
async fn renaming_with_an_empty_name_fails_and_raises_nothing() {
    init_test_tracing();
    let (audit, dispatcher) = wire();

    let view = dispatcher
        .dispatch(CreateWidget {
            name: "Foo".to_string(),
        })
        .await
        .unwrap();

    let err = dispatcher
        .dispatch(RenameWidget {
            id: view.id,
            new_name: String::new(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, DispatchError::Validation { .. }));
    // Only the creation was audited; the failed rename raised no event.
    assert_eq!(audit.entries().len(), 1);

    // The widget kept its original name.
    let exported = dispatcher
        .dispatch_with_context(
            ExportWidget { id: view.id },
            &relay_core::RequestContext::with_principal(
                Principal::new("alice").with_entitlement("export"),
            ),
        )
        .await
        .unwrap();
    assert!(exported.contains("Foo"));
}

#[tokio::test]
async fn renaming_propagates_the_event_with_old_and_new_names() {
    init_test_tracing();
    let (audit, dispatcher) = wire();

    let view = dispatcher
        .dispatch(CreateWidget {
            name: "Foo".to_string(),
        })
        .await
        .unwrap();

    let renamed = dispatcher
        .dispatch(RenameWidget {
            id: view.id,
            new_name: "Bar".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(renamed.name, "Bar");
    assert_eq!(
        audit.entries().last().unwrap(),
        &format!("widget {} renamed 'Foo' -> 'Bar'", view.id)
    );
}

#[tokio::test]
async fn export_is_denied_without_the_entitlement() {
    init_test_tracing();
    let audit = Arc::new(AuditLog::default());
    let events = Arc::new(build_event_dispatcher(Arc::clone(&audit)));
    let store = Arc::new(WidgetStore::default());

    // Rebuild a registry directly so DispatchTest can own it.
    let dispatcher = build_dispatcher(Arc::clone(&store), Arc::clone(&events));
    let view = dispatcher
        .dispatch(CreateWidget {
            name: "Foo".to_string(),
        })
        .await
        .unwrap();

    let err = dispatcher
        .dispatch_with_context(
            ExportWidget { id: view.id },
            &relay_core::RequestContext::with_principal(Principal::new("bob")),
        )
        .await
        .unwrap_err();
    assert!(
        matches!(err, DispatchError::EntitlementDenied { entitlement } if entitlement == "export")
    );
}

struct Noop;

impl relay_core::Request for Noop {
    type Response = ();

    fn name() -> &'static str {
        "Noop"
    }
}

#[tokio::test]
async fn dispatch_test_reports_the_traversed_layers() {
    init_test_tracing();

    let log = relay_testing::InvocationLog::new();
    let mut builder = relay_runtime::Registry::builder();
    builder.register_with::<Noop, _>(
        relay_testing::CountingHandler::new(&log),
        relay_core::CapabilitySet::new(),
        relay_runtime::BehaviorStack::new()
            .push(relay_testing::ProbeBehavior::new("inner", &log))
            .push(relay_testing::ProbeBehavior::new("outer", &log)),
    );

    DispatchTest::new(builder.build())
        .when(Noop)
        .then_ok(|()| {})
        .then_trace(|layers| assert_eq!(layers, ["outer", "inner", "Noop"]))
        .run()
        .await
        .unwrap();
}
