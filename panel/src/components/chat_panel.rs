//! Chat surface: conversation log, composer, attachment preview and snip.
//!
//! SYSTEM CONTEXT
//! ==============
//! All behavior lives in `ChatSurfaceController`; this component only renders
//! its snapshots and forwards DOM events. The controller announces changes
//! through a revision signal, which is bumped with `try_update` so a reply that
//! lands after the panel is gone is dropped quietly.

use std::rc::Rc;

use leptos::prelude::*;

use crate::app::AppController;
use crate::state::composer::{ChatNotice, NoticeKind};
use crate::state::conversation::{Message, Role};
use crate::util::markdown::render_markdown_html;

fn notice_class(notice: &ChatNotice) -> &'static str {
    match notice.kind {
        NoticeKind::Capture => "chat-panel__notice chat-panel__notice--capture",
        NoticeKind::Network => "chat-panel__notice chat-panel__notice--network",
        NoticeKind::Selection => "chat-panel__notice chat-panel__notice--selection",
        NoticeKind::Attachment => "chat-panel__notice chat-panel__notice--attachment",
    }
}

/// Rows are keyed by id plus the fields that change in place, so a resolved
/// placeholder re-renders while settled rows (and their images) are kept.
fn message_key(message: &Message) -> (String, bool) {
    (message.id.clone(), message.is_pending())
}

fn render_message(message: Message) -> impl IntoView {
    let is_user = message.role == Role::User;
    let is_pending = message.is_pending();
    let author = if is_user { "You" } else { "Hypewave" };
    let body = if is_pending {
        view! { <span class="chat-panel__thinking">"Thinking..."</span> }.into_any()
    } else if is_user {
        view! { <span class="chat-panel__text">{message.text}</span> }.into_any()
    } else {
        let rendered = render_markdown_html(&message.text);
        view! { <div class="chat-panel__markdown" inner_html=rendered></div> }.into_any()
    };
    let image = message
        .attachment
        .map(|src| view! { <img class="chat-panel__attachment" src=src alt="attached screenshot"/> });

    view! {
        <div
            class="chat-panel__message"
            class:chat-panel__message--user=is_user
            class:chat-panel__message--assistant=!is_user
            class:chat-panel__message--pending=is_pending
        >
            <div class="chat-panel__author">{author}</div>
            {image}
            {body}
        </div>
    }
}

/// The chat panel bound to one controller.
#[component]
pub fn ChatPanel(controller: Rc<AppController>) -> impl IntoView {
    let ctrl = StoredValue::new_local(controller);
    let revision = RwSignal::new(0_u64);
    let messages_ref = NodeRef::<leptos::html::Div>::new();

    if let Some(c) = ctrl.try_get_value() {
        c.set_on_change(move || {
            if revision.try_update(|r| *r = r.wrapping_add(1)).is_none() {
                log::debug!("chat panel disposed; change dropped");
            }
        });
    }

    let messages = Memo::new(move |_| {
        revision.track();
        ctrl.try_get_value().map(|c| c.messages()).unwrap_or_default()
    });
    let composer = Memo::new(move |_| {
        revision.track();
        ctrl.try_get_value().map(|c| c.composer_view()).unwrap_or_default()
    });

    Effect::new(move || {
        let _ = messages.get().len();

        #[cfg(feature = "csr")]
        {
            if let Some(el) = messages_ref.get() {
                el.set_scroll_top(el.scroll_height());
            }
        }
    });

    let do_submit = move || {
        #[cfg(feature = "csr")]
        {
            let Some(c) = ctrl.try_get_value() else {
                return;
            };
            leptos::task::spawn_local(async move {
                let outcome = c.submit().await;
                log::debug!("submit finished: {outcome:?}");
            });
        }
    };

    let on_snip = move |_| {
        #[cfg(feature = "csr")]
        {
            let Some(c) = ctrl.try_get_value() else {
                return;
            };
            leptos::task::spawn_local(async move {
                let outcome = c.snip_and_stage().await;
                log::debug!("snip finished: {outcome:?}");
            });
        }
    };

    let on_input = move |ev: leptos::ev::Event| {
        let value = event_target_value(&ev);
        if let Some(c) = ctrl.try_get_value() {
            c.set_input(value);
        }
    };

    let on_keydown = move |ev: leptos::ev::KeyboardEvent| {
        if ev.key() == "Enter" && !ev.shift_key() {
            ev.prevent_default();
            do_submit();
        }
    };

    let on_file = move |ev: leptos::ev::Event| {
        #[cfg(feature = "csr")]
        {
            let input = event_target::<web_sys::HtmlInputElement>(&ev);
            let picked = crate::host::file::first_file(input.files());
            input.set_value("");
            stage_file(ctrl, picked, false);
        }
        #[cfg(not(feature = "csr"))]
        {
            let _ = ev;
        }
    };

    let on_dragover = move |ev: leptos::ev::DragEvent| ev.prevent_default();

    let on_drop = move |ev: leptos::ev::DragEvent| {
        ev.prevent_default();
        #[cfg(feature = "csr")]
        {
            let dropped = crate::host::file::first_file(ev.data_transfer().and_then(|dt| dt.files()));
            stage_file(ctrl, dropped, true);
        }
    };

    let on_unstage = move |_| {
        if let Some(c) = ctrl.try_get_value() {
            c.unstage();
        }
    };

    let on_dismiss = move |_| {
        if let Some(c) = ctrl.try_get_value() {
            c.dismiss_error();
        }
    };

    view! {
        <div class="chat-panel" on:dragover=on_dragover on:drop=on_drop>
            <div class="chat-panel__messages" node_ref=messages_ref>
                <Show when=move || messages.with(Vec::is_empty)>
                    <div class="chat-panel__empty">"Ask about a setup, or snip a chart to start."</div>
                </Show>
                <For each=move || messages.get() key=message_key children=render_message/>
            </div>

            {move || {
                composer
                    .get()
                    .notice
                    .map(|notice| {
                        let class = notice_class(&notice);
                        view! {
                            <div class=class role="alert">
                                <span>{notice.message}</span>
                                <button class="chat-panel__dismiss" title="Dismiss" on:click=on_dismiss>
                                    "×"
                                </button>
                            </div>
                        }
                    })
            }}

            {move || {
                composer
                    .get()
                    .preview
                    .map(|preview| {
                        view! {
                            <div class="chat-panel__preview">
                                <img src=preview.locator alt=preview.file_name/>
                                <button class="chat-panel__unstage" title="Remove image" on:click=on_unstage>
                                    "×"
                                </button>
                            </div>
                        }
                    })
            }}

            <div class="chat-panel__composer">
                <textarea
                    class="chat-panel__input"
                    placeholder="Ask Hypewave..."
                    prop:value=move || composer.get().input
                    on:input=on_input
                    on:keydown=on_keydown
                ></textarea>
                <label class="chat-panel__file">
                    "Image"
                    <input type="file" accept="image/*" on:change=on_file/>
                </label>
                <button
                    class="chat-panel__snip"
                    title="Select part of the screen"
                    disabled=move || composer.get().snipping
                    on:click=on_snip
                >
                    "Snip"
                </button>
                <button
                    class="chat-panel__send"
                    disabled=move || !composer.get().can_submit
                    on:click=move |_| do_submit()
                >
                    {move || if composer.get().in_flight { "Asking..." } else { "Ask" }}
                </button>
            </div>
        </div>
    }
}

#[cfg(feature = "csr")]
fn stage_file(ctrl: StoredValue<Rc<AppController>, LocalStorage>, file: Option<web_sys::File>, dropped: bool) {
    let (Some(c), Some(file)) = (ctrl.try_get_value(), file) else {
        return;
    };
    leptos::task::spawn_local(async move {
        let staged = match crate::host::file::read_image_file(&file).await {
            Ok(payload) if dropped => c.stage_drop(payload),
            Ok(payload) => c.stage_file(payload),
            Err(e) => {
                c.reject_attachment(&e);
                Err(e)
            }
        };
        if let Err(e) = staged {
            log::debug!("attachment not staged: {e}");
        }
    });
}
