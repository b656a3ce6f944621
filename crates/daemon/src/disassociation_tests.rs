// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::emitter::QueuedMessenger;
use ignite_core::{FakeClock, MemoryStore};

fn handler() -> (
    DisassociationHandler,
    Arc<MemoryStore>,
    tokio::sync::mpsc::UnboundedReceiver<(MessageOut, Value)>,
) {
    let store = Arc::new(MemoryStore::new());
    store.set(keys::LOGIN, "DEV1").unwrap();
    store.set(keys::PASSCODE, "pc").unwrap();
    store.set(keys::LAST_DEVICE_ID, "DEV1").unwrap();

    let (messenger, rx) = QueuedMessenger::channel();
    let handler = DisassociationHandler {
        store: Arc::<MemoryStore>::clone(&store) as Arc<dyn KvStore>,
        activation_state: Arc::new(ActivationState::new(
            store.as_ref(),
            Arc::new(FakeClock::new()),
        )),
        lifecycle: Arc::new(Lifecycle::new()),
        messenger: Arc::new(messenger),
        mqtt: Arc::new(MqttStatus::default()),
    };
    (handler, store, rx)
}

#[tokio::test]
async fn disassociation_clears_credentials_and_requests_exit_100() {
    let (handler, store, mut rx) = handler();

    handler.process_event(&Event::new("1.0", "Disassociation")).unwrap();

    assert_eq!(store.get(keys::LOGIN), None);
    assert_eq!(store.get(keys::PASSCODE), None);
    assert_eq!(store.get(keys::DEVICE_DISASSOCIATED).as_deref(), Some("true"));
    assert!(!handler.activation_state.is_activated());

    let (message, payload) = rx.recv().await.unwrap();
    assert_eq!(message, MessageOut::ActivationDetails);
    assert_eq!(payload["status"], json!(false));

    let exit = handler.lifecycle.wait_exit().await;
    assert_eq!(exit.code, 100);
    assert_eq!(exit.exit_type, ExitType::Normal);
}

#[tokio::test]
async fn notification_form_also_disassociates() {
    let (handler, store, _rx) = handler();
    handler.apply_config(&json!({"disassociate": true})).unwrap();
    assert_eq!(store.get(keys::DEVICE_DISASSOCIATED).as_deref(), Some("true"));
}
