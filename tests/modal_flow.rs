use std::sync::mpsc;

use serde_json::json;

use zis_config_lib::view::modal;
use zis_config_lib::{HostBridge, ModalView};

#[path = "support.rs"]
mod support;
use support::{Hub, ScriptedHost};

#[tokio::test]
async fn modal_receives_payload_and_reads_through_the_opener() {
    let hub = Hub::new();
    let sidebar = ScriptedHost::spawn(&hub, "sidebar-1", "ticket_sidebar");
    sidebar.set_property("ticket", json!({"id": 7, "subject": "Printer on fire"}));

    let sidebar_bridge = HostBridge::new(sidebar.clone());
    sidebar_bridge.on_app_registered(|_| {});
    sidebar.register();

    let modal_client = sidebar_bridge
        .open_modal(json!({"someSampleData": "jira"}), "", "80vw", "80vh")
        .await
        .expect("open modal");

    let (created_action, created_args) = sidebar
        .invocations()
        .into_iter()
        .next()
        .expect("instances.create");
    assert_eq!(created_action, "instances.create");
    assert_eq!(created_args[0]["location"], "modal");
    assert_eq!(
        created_args[0]["size"],
        json!({"width": "80vw", "height": "80vh"})
    );

    let modal_bridge = HostBridge::new(modal_client);
    let (tx, rx) = mpsc::channel();
    modal::connect(&modal_bridge, tx);

    let data = rx.try_recv().expect("payload on modalReady");
    assert_eq!(data["someSampleData"], "jira");
    assert_eq!(data["sidebarContext"]["instanceGuid"], "sidebar-1");

    // modalReady a second time does not resend
    modal_bridge.modal_ready();
    assert!(rx.try_recv().is_err());

    let mut view = ModalView::new();
    let context = view.receive_data(&data).expect("sidebar context");
    let bound = modal_bridge.bind_sidebar_client(&context);
    view.sidebar_bound(bound);
    assert!(view.is_sidebar_bound());
    assert_eq!(view.sample_data_text(), "jira");

    assert!(view.begin_ticket_fetch());
    view.ticket_loaded(modal::fetch_ticket(&modal_bridge).await);
    assert!(view.is_ticket_fetch_complete());
    assert_eq!(
        view.ticket_summary(),
        Some(("7".to_string(), "Printer on fire".to_string()))
    );
}

#[tokio::test]
async fn unknown_opener_leaves_the_modal_unbound() {
    let hub = Hub::new();
    let modal_host = ScriptedHost::spawn(&hub, "modal-1", "modal");
    let bridge = HostBridge::new(modal_host.clone());

    let mut view = ModalView::new();
    let context = view
        .receive_data(&json!({"someSampleData": 1, "sidebarContext": {"instanceGuid": "gone"}}))
        .expect("context");
    assert!(!bridge.bind_sidebar_client(&context));

    // reads fall back to the modal's own client, which has no ticket
    assert!(view.begin_ticket_fetch());
    view.ticket_loaded(modal::fetch_ticket(&bridge).await);
    assert!(view.ticket_error());
    assert!(!view.is_ticket_fetch_complete());
    assert_eq!(modal_host.guid(), "modal-1");
}
