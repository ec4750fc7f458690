mod app;
mod terminal;
mod theme;
mod ui;

use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use crossterm::event::{self, KeyEventKind};
use serde_json::{json, Value};

use crate::bootstrap::Session;
use crate::cli::i18n::texts;
use crate::error::AppError;
use crate::host::{HostBridge, HostNotice, HostRuntime, NoticeKind};
use crate::view::{modal, LoadedBundle, Mounted, SaveRequest};
use crate::zis::{ConfigRecord, Integration};

use app::{Action, App, ToastKind};
use terminal::{Clipboard, PanicRestoreHookGuard, TuiTerminal};

const NOTICE_MS: u64 = 5000;

enum HostReq {
    LoadIntegrations,
    LoadConfig { token: u64, key: String },
    LoadBundle { token: u64, key: String },
    Save(SaveRequest),
    Notify { message: String, kind: NoticeKind },
    Resize { height: u16 },
    OpenModal { payload: Value },
    CloseModal { bridge: Arc<HostBridge> },
    FetchTicket { bridge: Arc<HostBridge> },
}

enum HostMsg {
    IntegrationsLoaded(Result<Vec<Integration>, AppError>),
    ConfigLoaded {
        token: u64,
        result: Result<ConfigRecord, AppError>,
    },
    BundleLoaded {
        token: u64,
        result: Result<LoadedBundle, AppError>,
    },
    Saved(Result<(), AppError>),
    ModalOpened(Result<Arc<dyn HostRuntime>, AppError>),
    ModalClosed(Result<(), AppError>),
    TicketLoaded(Result<Value, AppError>),
    Failed(AppError),
}

struct HostSystem {
    req_tx: mpsc::Sender<HostReq>,
    result_rx: mpsc::Receiver<HostMsg>,
    _handle: std::thread::JoinHandle<()>,
}

/// Open modal surface: its own bridge plus the payload channel.
struct ModalLink {
    bridge: Arc<HostBridge>,
    data_rx: mpsc::Receiver<Value>,
}

impl ModalLink {
    fn connect(bridge: Arc<HostBridge>) -> Self {
        let (tx, data_rx) = mpsc::channel();
        modal::connect(&bridge, tx);
        Self { bridge, data_rx }
    }
}

pub fn run(
    session: Session,
    notices: Option<mpsc::Receiver<HostNotice>>,
    default_integration_key: Option<String>,
) -> Result<(), AppError> {
    let _panic_hook = PanicRestoreHookGuard::install();
    let theme = theme::theme_for_env();

    let mut app = App::new(session.mounted, default_integration_key);
    app.location = session.location.clone();
    app.subdomain = session.bridge.subdomain().map(str::to_string);
    if let Some(name) = session.user_name() {
        app.greeting = texts::hello_person(name);
    }

    let host = start_host_system(session.bridge.clone())?;
    let mut modal_link = match session.mounted {
        Mounted::Modal => Some(ModalLink::connect(session.bridge.clone())),
        Mounted::Config => {
            send(&host, HostReq::LoadIntegrations);
            None
        }
    };

    let mut terminal = TuiTerminal::new()?;
    let tick_rate = Duration::from_millis(1000 / app::TICKS_PER_SECOND);
    let mut last_tick = Instant::now();

    loop {
        let size = terminal.size()?;
        if size != app.last_size {
            send(&host, HostReq::Resize { height: size.height });
            app.last_size = size;
        }
        terminal.draw(|f| ui::render(f, &app, &theme))?;

        while let Ok(msg) = host.result_rx.try_recv() {
            handle_host_msg(&mut app, &host, &mut modal_link, msg);
        }

        if let Some(link) = modal_link.as_ref() {
            while let Ok(data) = link.data_rx.try_recv() {
                receive_modal_data(&mut app, link, &data);
            }
        }

        if let Some(rx) = notices.as_ref() {
            while let Ok(notice) = rx.try_recv() {
                app.push_notice(&notice);
            }
        }

        let timeout = tick_rate.saturating_sub(last_tick.elapsed());
        if event::poll(timeout).map_err(|e| AppError::Message(e.to_string()))? {
            match event::read().map_err(|e| AppError::Message(e.to_string()))? {
                event::Event::Key(key) if key.kind == KeyEventKind::Press => {
                    let action = app.on_key(key);
                    if let Err(err) =
                        handle_action(&terminal, &mut app, &host, modal_link.as_ref(), action)
                    {
                        app.push_toast(err.to_string(), ToastKind::Error);
                    }
                }
                _ => {}
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.on_tick();
            last_tick = Instant::now();
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

fn send(host: &HostSystem, req: HostReq) {
    if host.req_tx.send(req).is_err() {
        log::error!("host worker is gone; request dropped");
    }
}

fn receive_modal_data(app: &mut App, link: &ModalLink, data: &Value) {
    let Some(view) = app.modal.as_mut() else {
        return;
    };
    if let Some(context) = view.receive_data(data) {
        let bound = link.bridge.bind_sidebar_client(&context);
        view.sidebar_bound(bound);
    }
}

fn handle_action(
    clipboard: &dyn Clipboard,
    app: &mut App,
    host: &HostSystem,
    modal_link: Option<&ModalLink>,
    action: Action,
) -> Result<(), AppError> {
    match action {
        Action::None | Action::Quit => {}
        Action::ReloadIntegrations => send(host, HostReq::LoadIntegrations),
        Action::SelectIntegration(key) => {
            let tickets = app.config.select(&key);
            app.sync_integration_cursor();
            send(
                host,
                HostReq::LoadConfig {
                    token: tickets.config_token,
                    key: tickets.integration_key.clone(),
                },
            );
            send(
                host,
                HostReq::LoadBundle {
                    token: tickets.bundle_token,
                    key: tickets.integration_key,
                },
            );
        }
        Action::ApplyField { key, value } => app.config.set_field(&key, &value)?,
        Action::Save => match app.config.begin_save() {
            Some(request) => send(host, HostReq::Save(request)),
            None if app.config.is_form_submit_loading() => {
                app.push_toast(texts::save_busy(), ToastKind::Info);
            }
            None => {}
        },
        Action::CopyConfig => {
            if app.config.state() != crate::view::ConfigState::Configuration {
                app.push_toast(texts::nothing_to_copy(), ToastKind::Info);
                return Ok(());
            }
            let text = app.config.config_json()?;
            copy_and_notify(clipboard, host, &text)?;
        }
        Action::CopyBundle => {
            if app.config.bundle_state() != crate::view::BundleState::Available {
                app.push_toast(texts::nothing_to_copy(), ToastKind::Info);
                return Ok(());
            }
            copy_and_notify(clipboard, host, app.config.bundle_text())?;
        }
        Action::OpenModal => {
            if app.modal_opening || app.modal.is_some() {
                return Ok(());
            }
            app.modal_opening = true;
            app.push_toast(texts::modal_opening(), ToastKind::Info);
            send(
                host,
                HostReq::OpenModal {
                    payload: json!({
                        "someSampleData": app.config.integration_key().unwrap_or_default(),
                    }),
                },
            );
        }
        Action::CloseModal => {
            if let Some(link) = modal_link {
                send(
                    host,
                    HostReq::CloseModal {
                        bridge: link.bridge.clone(),
                    },
                );
            }
        }
        Action::FetchTicket => {
            let (Some(view), Some(link)) = (app.modal.as_mut(), modal_link) else {
                return Ok(());
            };
            if view.begin_ticket_fetch() {
                send(
                    host,
                    HostReq::FetchTicket {
                        bridge: link.bridge.clone(),
                    },
                );
            }
        }
    }
    Ok(())
}

fn copy_and_notify(
    clipboard: &dyn Clipboard,
    host: &HostSystem,
    text: &str,
) -> Result<(), AppError> {
    clipboard.copy_to_clipboard(text)?;
    send(
        host,
        HostReq::Notify {
            message: texts::copied_to_clipboard(),
            kind: NoticeKind::Success,
        },
    );
    Ok(())
}

fn handle_host_msg(
    app: &mut App,
    host: &HostSystem,
    modal_link: &mut Option<ModalLink>,
    msg: HostMsg,
) {
    match msg {
        HostMsg::IntegrationsLoaded(result) => {
            app.config.integrations_loaded(result);
            app.sync_integration_cursor();
        }
        HostMsg::ConfigLoaded { token, result } => {
            if app.config.config_loaded(token, result) {
                app.field_idx = 0;
            }
        }
        HostMsg::BundleLoaded { token, result } => {
            if app.config.bundle_loaded(token, result) {
                app.bundle_scroll = 0;
            }
        }
        HostMsg::Saved(result) => {
            let alert = app.config.finish_save(result);
            send(
                host,
                HostReq::Notify {
                    message: alert.message,
                    kind: alert.kind,
                },
            );
        }
        HostMsg::ModalOpened(result) => {
            app.modal_opening = false;
            match result {
                Ok(instance) => {
                    app.modal = Some(crate::view::ModalView::new());
                    *modal_link = Some(ModalLink::connect(Arc::new(HostBridge::new(instance))));
                }
                Err(e) => {
                    log::error!("failed to open modal: {e}");
                    app.push_toast(e.to_string(), ToastKind::Error);
                }
            }
        }
        HostMsg::ModalClosed(result) => {
            if let Err(e) = result {
                log::warn!("modal close reported an error: {e}");
            }
            app.modal = None;
            *modal_link = None;
        }
        HostMsg::TicketLoaded(result) => {
            if let Some(view) = app.modal.as_mut() {
                view.ticket_loaded(result);
            }
        }
        HostMsg::Failed(e) => {
            app.push_toast(e.to_string(), ToastKind::Error);
        }
    }
}

fn start_host_system(bridge: Arc<HostBridge>) -> Result<HostSystem, AppError> {
    let (result_tx, result_rx) = mpsc::channel::<HostMsg>();
    let (req_tx, req_rx) = mpsc::channel::<HostReq>();

    let handle = std::thread::Builder::new()
        .name("zis-config-host".to_string())
        .spawn(move || host_worker_loop(bridge, req_rx, result_tx))
        .map_err(|e| AppError::IoContext {
            context: "failed to spawn host worker thread".to_string(),
            source: e,
        })?;

    Ok(HostSystem {
        req_tx,
        result_rx,
        _handle: handle,
    })
}

/// Every request runs as its own task, so configuration and bundle
/// fetches overlap; ordering is restored by the view's tokens.
fn host_worker_loop(
    bridge: Arc<HostBridge>,
    rx: mpsc::Receiver<HostReq>,
    tx: mpsc::Sender<HostMsg>,
) {
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            let err = e.to_string();
            while rx.recv().is_ok() {
                let _ = tx.send(HostMsg::Failed(AppError::Message(format!(
                    "async runtime unavailable: {err}"
                ))));
            }
            return;
        }
    };

    while let Ok(req) = rx.recv() {
        let bridge = bridge.clone();
        let tx = tx.clone();
        rt.spawn(async move {
            if let Some(msg) = execute(&bridge, req).await {
                let _ = tx.send(msg);
            }
        });
    }
}

async fn execute(bridge: &HostBridge, req: HostReq) -> Option<HostMsg> {
    let msg = match req {
        HostReq::LoadIntegrations => HostMsg::IntegrationsLoaded(bridge.get_integrations().await),
        HostReq::LoadConfig { token, key } => HostMsg::ConfigLoaded {
            token,
            result: bridge.get_zis_config(&key).await,
        },
        HostReq::LoadBundle { token, key } => HostMsg::BundleLoaded {
            token,
            result: bridge
                .load_bundle(&key)
                .await
                .map(|(descriptor, document)| LoadedBundle {
                    uuid: descriptor.uuid,
                    document,
                }),
        },
        HostReq::Save(request) => HostMsg::Saved(
            bridge
                .update_zis_config(&request.integration_key, &request.config)
                .await
                .map(|_| ()),
        ),
        HostReq::Notify { message, kind } => {
            return bridge
                .notify(&message, kind, NOTICE_MS)
                .await
                .err()
                .map(HostMsg::Failed);
        }
        HostReq::Resize { height } => {
            return bridge
                .resize_frame(u32::from(height))
                .await
                .err()
                .map(HostMsg::Failed);
        }
        HostReq::OpenModal { payload } => {
            HostMsg::ModalOpened(bridge.open_modal(payload, "", "80vw", "80vh").await)
        }
        HostReq::CloseModal { bridge: modal } => HostMsg::ModalClosed(modal.close_modal().await),
        HostReq::FetchTicket { bridge: modal } => {
            HostMsg::TicketLoaded(modal::fetch_ticket(&modal).await)
        }
    };
    Some(msg)
}
