// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ignite_core::MemoryStore;
use parking_lot::Mutex;

struct FakeMessenger {
    delivered: Mutex<Vec<String>>,
    accept: bool,
}

impl DeviceMessenger for FakeMessenger {
    fn deliver_remote_operation(&self, payload: &str) -> bool {
        self.delivered.lock().push(payload.to_string());
        self.accept
    }
}

fn handler(accept: bool) -> (RemoteOperationHandler, Arc<MemoryStore>, Arc<FakeMessenger>) {
    let store = Arc::new(MemoryStore::new());
    let messenger = Arc::new(FakeMessenger { delivered: Mutex::new(Vec::new()), accept });
    let handler = RemoteOperationHandler::new(
        Arc::<MemoryStore>::clone(&store) as Arc<dyn KvStore>,
        Arc::<FakeMessenger>::clone(&messenger) as Arc<dyn DeviceMessenger>,
        "devices/",
    );
    (handler, store, messenger)
}

fn ro_request() -> Event {
    Event::new("1.1", "RemoteOperationEngine")
        .at(1.0, 0)
        .with_field("state", "STARTED")
        .with_field("roRequestId", "req-1")
}

#[test]
fn request_is_forwarded_with_the_response_topic() {
    let (handler, store, messenger) = handler(true);
    store.set(keys::LAST_DEVICE_ID, "DEV42").unwrap();

    handler.process_event(&ro_request()).unwrap();

    let delivered = messenger.delivered.lock();
    assert_eq!(delivered.len(), 1);
    let message = Event::from_json(&delivered[0]).unwrap();
    assert_eq!(message.get_string("topic"), "devices/DEV42/2c/ro");
    assert_eq!(message.get_string("roRequestId"), "req-1");
}

#[test]
fn channel_rejection_surfaces_as_handler_error() {
    let (handler, _, _) = handler(false);
    assert!(handler.process_event(&ro_request()).is_err());
}
