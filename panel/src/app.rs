//! Application root: configuration, session and controller wiring.
//!
//! SYSTEM CONTEXT
//! ==============
//! Everything the chat surface needs is constructed here once and handed to
//! the controller explicitly. The session comes from storage, the store is
//! sized from config, and the browser hosts back the snip capabilities.

use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use leptos_meta::{Title, provide_meta_context};
use snip::{CapturePipeline, LocatorRegistry, SelectionOverlay};

use crate::chat::controller::ChatSurfaceController;
use crate::components::chat_panel::ChatPanel;
use crate::config::ClientConfig;
use crate::host::{DisplayMediaSnapshotter, DomOverlayHost, ObjectUrlRegistry};
use crate::net::api::HttpChatApi;
use crate::state::auth::AuthSession;
use crate::state::conversation::ConversationStore;

/// Controller type used by the browser build.
pub type AppController = ChatSurfaceController<HttpChatApi, DomOverlayHost, DisplayMediaSnapshotter>;

/// Assemble a controller for `config` and an existing session.
pub fn build_controller(config: &ClientConfig, session: AuthSession) -> AppController {
    let locators: Rc<dyn LocatorRegistry> = Rc::new(ObjectUrlRegistry);
    ChatSurfaceController::new(
        HttpChatApi::new(config.api_base_url.clone()),
        Rc::new(RefCell::new(session)),
        Rc::new(RefCell::new(ConversationStore::new(config.history_limit))),
        Rc::clone(&locators),
        SelectionOverlay::new(Rc::new(DomOverlayHost::new())),
        CapturePipeline::new(DisplayMediaSnapshotter, locators),
    )
    .with_release_grace(config.release_grace)
}

fn load_config() -> ClientConfig {
    ClientConfig::from_build_env().unwrap_or_else(|e| {
        log::warn!("{e}; falling back to default configuration");
        ClientConfig::default()
    })
}

/// Root component.
#[component]
pub fn App() -> impl IntoView {
    provide_meta_context();
    let config = load_config();
    log::info!("hypewave panel: api={} history_limit={}", config.api_base_url, config.history_limit);
    let controller = Rc::new(build_controller(&config, AuthSession::restore()));

    #[cfg(feature = "csr")]
    {
        let controller = Rc::clone(&controller);
        leptos::task::spawn_local(async move {
            let outcome = controller.hydrate_history().await;
            log::debug!("history hydration: {outcome:?}");
        });
    }

    view! {
        <Title text="Hypewave"/>
        <main class="hypewave">
            <ChatPanel controller=controller/>
        </main>
    }
}
