// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The agent root: owns every subsystem and runs the process.

use crate::commands::{CommandBridge, MqttStatus};
use crate::config::{Config, ConfigError};
use crate::controller::ActivationController;
use crate::crypto::GcmIdentityCipher;
use crate::disassociation::DisassociationHandler;
use crate::emitter::{ChannelEmitter, QueuedMessenger};
use crate::lifecycle::{Lifecycle, RECEIVER_CONTROLLER, RECEIVER_IPC, RECEIVER_ROUTER};
use ignite_auth::{ActivationBackoff, ActivationState, BackoffParams, TokenManager};
use ignite_core::store::keys;
use ignite_core::{
    Clock, Event, EventEmitter, ExitType, InvalidEventStore, KvStore, ProductInfo, StoreError,
    SystemClock,
};
use ignite_ipc::{CommandListener, MessageDispatcher, MessageOut};
use ignite_net::{CipherMode, CloudConnector, SessionConfig, SessionPool, SslAttributes};
use ignite_router::handlers::{RemoteOperationHandler, VinHandler};
use ignite_router::pipeline::{ActivityDelay, SessionStatusStage, TimestampValidator};
use ignite_router::{
    DomainEventMap, EventProcessor, EventSink, HandlerError, HandlerRegistry, InboundMessage,
    MessageRouter, TransportPipeline, TransportStage,
};
use ignite_storage::{BoundedInvalidEventStore, EventJournal, LocalConfig};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

const DEFAULT_DB_SIZE_LIMIT: u64 = 10 * 1024 * 1024;
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Terminal pipeline stage: append routed events to the upload journal.
struct JournalSink {
    journal: Arc<EventJournal>,
}

impl EventSink for JournalSink {
    fn persist(&self, event: &Event) -> Result<(), StoreError> {
        self.journal.append(event)
    }
}

/// Registry adapter exposing the backoff machine as a domain handler.
struct BackoffHandler {
    backoff: Arc<ActivationBackoff>,
}

impl EventProcessor for BackoffHandler {
    fn process_event(&self, event: &Event) -> Result<(), HandlerError> {
        self.backoff.process_event(event);
        Ok(())
    }

    fn apply_config(&self, _notif: &Value) -> Result<(), HandlerError> {
        Ok(())
    }

    fn reset(&self) {
        self.backoff.reset();
    }
}

/// All subsystems, wired and ready to run.
pub struct Agent {
    lifecycle: Arc<Lifecycle>,
    router: Arc<MessageRouter>,
    dispatcher: Arc<MessageDispatcher>,
    listener: CommandListener,
    controller: ActivationController,
    activity_delay: Arc<ActivityDelay>,
    mqtt: Arc<MqttStatus>,
    intake_rx: mpsc::UnboundedReceiver<Event>,
    outbound_rx: mpsc::UnboundedReceiver<(MessageOut, Value)>,
}

impl Agent {
    /// Build every subsystem from the configuration and wire them together.
    pub fn bootstrap(config: &Config, product: Arc<dyn ProductInfo>) -> Result<Self, AgentError> {
        let snapshot = config.snapshot();
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
        let lifecycle = Arc::new(Lifecycle::new());

        let store: Arc<dyn KvStore> = Arc::new(LocalConfig::open(config.state_path.clone())?);
        let journal = Arc::new(EventJournal::open(config.journal_path.clone())?);
        let db_size_limit = snapshot.get_u64("DAM.Database.dbSizeLimit", DEFAULT_DB_SIZE_LIMIT);
        let invalid_store: Arc<dyn InvalidEventStore> =
            Arc::new(BoundedInvalidEventStore::new(db_size_limit as usize));

        let (emitter, intake_rx) = ChannelEmitter::channel();
        let emitter: Arc<dyn EventEmitter> = Arc::new(emitter);
        let (messenger, outbound_rx) = QueuedMessenger::channel();
        let messenger = Arc::new(messenger);

        // Transport pipeline, in its fixed order.
        let validator = Arc::new(TimestampValidator::new(
            snapshot.get_string_list("DAM.TimestampValidatorExceptions"),
            snapshot.get_bool("DAM.Database.storeInvalidEvents", true),
            invalid_store,
        ));
        let activity_delay =
            Arc::new(ActivityDelay::from_config(Arc::clone(&clock), &snapshot));
        let session_stage = Arc::new(SessionStatusStage::new(
            Arc::clone(&clock),
            snapshot.get_bool("DAM.UseRpmForIgnition.IgnON", true),
            snapshot.get_bool("DAM.UseRpmForIgnition.IgnOFF", false),
        ));
        let pipeline = TransportPipeline::new(
            vec![
                Arc::<TimestampValidator>::clone(&validator) as Arc<dyn TransportStage>,
                Arc::<ActivityDelay>::clone(&activity_delay) as Arc<dyn TransportStage>,
                Arc::<SessionStatusStage>::clone(&session_stage) as Arc<dyn TransportStage>,
            ],
            Arc::new(JournalSink { journal: Arc::clone(&journal) }),
        );

        let registry = Arc::new(HandlerRegistry::new());
        let router = Arc::new(MessageRouter::new(
            Arc::clone(&registry),
            DomainEventMap::from_config(snapshot.value("MQTT.domainEventMap")),
            pipeline,
        ));

        // Auth stack.
        let activation_state = Arc::new(ActivationState::new(store.as_ref(), Arc::clone(&clock)));
        activation_state.set_emitter(Arc::clone(&emitter));

        let pool = Arc::new(SessionPool::new(SessionConfig {
            ssl: ssl_from_config(&snapshot),
            proxy: None,
            local_port_range: None,
            default_timeout: Duration::from_secs(snapshot.get_u64("HCPAuth.requestTimeout", 30)),
        }));
        let pool_warn_emitter = Arc::clone(&emitter);
        let pool_clock = Arc::clone(&clock);
        pool.set_warning_hook(move |acquired| {
            pool_warn_emitter.emit(
                Event::new("1.0", "HttpSessionThreshold")
                    .at(pool_clock.epoch_ms(), 0)
                    .with_field("acquired", acquired as i64),
            );
        });

        let cipher_mode = if snapshot.get_bool("HCPAuth.useGcmQualifier", true) {
            CipherMode::AesGcm
        } else {
            CipherMode::AesCbc
        };
        let mut connector = CloudConnector::new(
            Arc::clone(&pool),
            Arc::new(GcmIdentityCipher),
            Arc::clone(&clock),
            cipher_mode,
        );
        connector.set_activation_url(&snapshot.get_string("HCPAuth.activationUrl"));
        connector.set_auth_url(&snapshot.get_string("HCPAuth.authUrl"));
        connector.set_health_check_url(&snapshot.get_string("HCPAuth.healthcheck_url"));
        let connector = Arc::new(connector);

        let token_manager = Arc::new(TokenManager::new(
            Arc::clone(&connector),
            Arc::clone(&store),
            Arc::clone(&clock),
            Arc::clone(&product),
            Arc::clone(&activation_state),
            snapshot.get_string("ProductType"),
            snapshot.get_bool("useDeviceType", false),
            snapshot.get_u64("HCPAuth.tokenTTLMargin", 10),
        ));
        token_manager.set_emitter(Arc::clone(&emitter));

        let backoff = Arc::new(ActivationBackoff::new(
            BackoffParams::from_config(&snapshot),
            Arc::clone(&clock),
            Arc::clone(&store),
            Arc::clone(&activation_state),
            &product.serial_number(),
        ));

        // Built-in domain handlers.
        let topic_prefix = snapshot.get_string("MQTT.topicprefix");
        registry.register_event_handler(
            "vinHandler",
            Arc::new(VinHandler::new(
                Arc::clone(&store),
                Arc::clone(&emitter),
                Arc::clone(&clock),
                &topic_prefix,
            )),
        );
        let ro_handler = Arc::new(RemoteOperationHandler::new(
            Arc::clone(&store),
            Arc::<QueuedMessenger>::clone(&messenger),
            &topic_prefix,
        ));
        registry
            .register_event_handler("RemoteOperation", Arc::<RemoteOperationHandler>::clone(&ro_handler) as _);
        registry.register_notif_handler("RemoteOperation", ro_handler as _);
        registry.register_event_handler(
            "activationBackOff",
            Arc::new(BackoffHandler { backoff: Arc::clone(&backoff) }),
        );

        // IPC channel.
        let dispatcher = Arc::new(MessageDispatcher::new(
            &config.push_socket,
            &config.pub_socket,
            Arc::clone(&clock),
        ));
        let mqtt = Arc::new(MqttStatus::default());

        let disassociation = Arc::new(DisassociationHandler {
            store: Arc::clone(&store),
            activation_state: Arc::clone(&activation_state),
            lifecycle: Arc::clone(&lifecycle),
            messenger: Arc::<QueuedMessenger>::clone(&messenger),
            mqtt: Arc::clone(&mqtt),
        });
        registry.register_event_handler(
            "disassociationRequest",
            Arc::<DisassociationHandler>::clone(&disassociation) as _,
        );
        registry.register_notif_handler("disassociationRequest", disassociation as _);

        // Service topics double as notification domains when a handler of
        // the same name exists and is not notification-registered yet.
        if let Value::Array(services) = snapshot.value("MQTT.servicesTopic") {
            for service in services {
                let Some(name) = service.get("serviceName").and_then(Value::as_str) else {
                    continue;
                };
                if registry.notif_handler(name).is_some() {
                    continue;
                }
                match registry.event_handler(name) {
                    Some(handler) => registry.register_notif_handler(name, handler),
                    None => debug!(service = name, "no handler for service topic"),
                }
            }
        }

        let ipc_shutdown = ignite_ipc::ListenerShutdown::new(&config.command_socket);
        let bridge = CommandBridge {
            lifecycle: Arc::clone(&lifecycle),
            activation_state: Arc::clone(&activation_state),
            journal: Arc::clone(&journal),
            db_size_limit,
            mqtt: Arc::clone(&mqtt),
            emitter: Arc::clone(&emitter),
            ipc_shutdown: ipc_shutdown.clone(),
            dispatcher: Arc::clone(&dispatcher),
            store: Arc::clone(&store),
        };
        let listener =
            CommandListener::attach(ipc_shutdown, Arc::new(bridge), Arc::clone(&dispatcher));

        if let Err(error) = store.set(keys::IC_RUNNING_STATUS, "running") {
            warn!(%error, "could not persist running status");
        }

        lifecycle.register(RECEIVER_IPC);
        lifecycle.register(RECEIVER_ROUTER);
        lifecycle.register(RECEIVER_CONTROLLER);

        let controller = ActivationController {
            backoff,
            token_manager,
            connector,
            lifecycle: Arc::clone(&lifecycle),
            poll_interval: DEFAULT_POLL_INTERVAL,
        };

        Ok(Self {
            lifecycle,
            router,
            dispatcher,
            listener,
            controller,
            activity_delay,
            mqtt,
            intake_rx,
            outbound_rx,
        })
    }

    /// How long the uploader should hold the next batch (seconds).
    pub fn upload_defer_secs(&self) -> u64 {
        self.activity_delay.compute_defer_upload()
    }

    pub fn mqtt_status(&self) -> Arc<MqttStatus> {
        Arc::clone(&self.mqtt)
    }

    pub fn router(&self) -> Arc<MessageRouter> {
        Arc::clone(&self.router)
    }

    /// Run the agent until the host asks for shutdown or the process gets a
    /// termination signal. Quick exits leave directly; normal exits return.
    pub async fn run(self) -> Result<i32, AgentError> {
        let Agent {
            lifecycle,
            router,
            dispatcher,
            listener,
            controller,
            mut intake_rx,
            mut outbound_rx,
            ..
        } = self;

        let ipc_shutdown = listener.shutdown_handle();

        // Outbound host messages.
        let outbound_cancel = lifecycle.cancel_token();
        let outbound_dispatcher = Arc::clone(&dispatcher);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = outbound_cancel.cancelled() => break,
                    received = outbound_rx.recv() => match received {
                        Some((message, payload)) => {
                            if !outbound_dispatcher.dispatch(message, &payload).await {
                                warn!(?message, "host message not delivered");
                            }
                        }
                        None => break,
                    }
                }
            }
        });

        // Router intake: synthesized and producer events.
        let intake_cancel = lifecycle.cancel_token();
        let intake_router = Arc::clone(&router);
        let intake_lifecycle = Arc::clone(&lifecycle);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = intake_cancel.cancelled() => break,
                    received = intake_rx.recv() => match received {
                        Some(event) => intake_router.route_event(event),
                        None => break,
                    }
                }
            }
            intake_lifecycle.ready_for_shutdown(RECEIVER_ROUTER);
        });

        // IPC ingress.
        let ipc_lifecycle = Arc::clone(&lifecycle);
        tokio::spawn(async move {
            if let Err(error) = listener.run().await {
                error!(%error, "command listener failed");
            }
            ipc_lifecycle.ready_for_shutdown(RECEIVER_IPC);
        });

        // Activation/auth loop.
        tokio::spawn(controller.run());

        info!("agent up");

        let exit = tokio::select! {
            exit = lifecycle.wait_exit() => exit,
            _ = tokio::signal::ctrl_c() => {
                info!("termination signal");
                lifecycle.notify_shutdown();
                ipc_shutdown.shutdown_notify().await;
                lifecycle.wait_all_ready(Duration::from_secs(5)).await;
                crate::lifecycle::ExitRequest { exit_type: ExitType::Normal, code: 0 }
            }
        };

        match exit.exit_type {
            ExitType::Quick => {
                info!(code = exit.code, "quick exit");
                std::process::exit(exit.code);
            }
            ExitType::Normal => {
                info!(code = exit.code, "normal exit");
                Ok(exit.code)
            }
        }
    }

    /// Feed one inbound message from a producer or the MQTT transport.
    pub fn notify(&self, message: InboundMessage) {
        self.router.notify(message);
    }
}

fn ssl_from_config(snapshot: &ignite_core::ConfigSnapshot) -> SslAttributes {
    let path = |key: &str| -> Option<PathBuf> {
        let value = snapshot.get_string(key);
        (!value.is_empty()).then(|| PathBuf::from(value))
    };
    let name = |key: &str| -> Option<String> {
        let value = snapshot.get_string(key);
        (!value.is_empty()).then_some(value)
    };

    SslAttributes {
        verify_peer: snapshot.get_bool("SSL.verifyPeer", true),
        verify_host: snapshot.get_bool("SSL.verifyHost", true),
        ca_file: path("SSL.caFile"),
        ca_path: path("SSL.caPath"),
        cert_file: path("SSL.certFile"),
        key_file: path("SSL.keyFile"),
        cert_type: name("SSL.certType"),
        key_type: name("SSL.keyType"),
        tls_engine_id: name("SSL.engineId"),
    }
}
