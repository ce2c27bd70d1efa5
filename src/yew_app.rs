use std::cell::RefCell;
use std::rc::Rc;

use js_sys::Date;
use wasm_bindgen_futures::spawn_local;
use web_sys::{
    AbortController, DragEvent, Element, Event, File, HtmlInputElement, InputEvent, MouseEvent,
    SubmitEvent,
};
use yew::prelude::*;

use crate::artifact_url::{self, ConversionArtifacts, SessionUrls};
use crate::engine_client;
use crate::magnifier::{self, PointerPos};
use crate::model::{ConversionParams, CurveMode, PRECISION_MAX, PRECISION_MIN};
use crate::notes_store::{self, LocalNotesStorage};

pub(crate) const DOWNLOAD_FILENAME: &str = "vectoria_logo.svg";
const ADVISORY_TEXT: &str =
    "The engine is waking up or hit an error. Retry in about ten seconds.";

/// One uploaded image from submission through display or reset.
#[derive(Clone)]
struct Session {
    file: File,
    urls: SessionUrls,
}

impl Session {
    fn loaded(&self) -> bool {
        self.urls.artifacts.is_some()
    }
}

/// Everything a conversion needs to update top-level state. Bundled so the
/// upload, drop, and parameter callbacks share one clone-and-move set.
#[derive(Clone)]
struct ConversionDeps {
    session: UseStateHandle<Option<Session>>,
    loading: UseStateHandle<bool>,
    advisory: UseStateHandle<Option<String>>,
    request_token: Rc<RefCell<u64>>,
    abort_handle: Rc<RefCell<Option<AbortController>>>,
}

impl ConversionDeps {
    /// Issues a fresh request token and aborts whatever was in flight. The
    /// response is applied only if its token is still the latest, so an
    /// overlapping conversion can never clobber a newer one.
    fn start(&self, current: Session, params: ConversionParams) {
        let token = {
            let mut slot = self.request_token.borrow_mut();
            *slot += 1;
            *slot
        };
        if let Some(previous) = self.abort_handle.borrow_mut().take() {
            previous.abort();
        }
        let controller = AbortController::new().ok();
        let signal = controller.as_ref().map(|controller| controller.signal());
        *self.abort_handle.borrow_mut() = controller;

        self.loading.set(true);
        self.advisory.set(None);

        let deps = self.clone();
        spawn_local(async move {
            let outcome = engine_client::vectorize(&current.file, &params, signal.as_ref())
                .await
                .and_then(|svg_text| engine_client::build_artifacts(&svg_text));
            let Some(outcome) = deps.claim_outcome(token, outcome) else {
                return;
            };
            match outcome {
                Ok(artifacts) => {
                    let mut next = current;
                    next.urls.replace_artifacts(artifacts);
                    deps.session.set(Some(next));
                    deps.loading.set(false);
                    gloo::console::log!("conversion finished");
                }
                Err(message) => {
                    gloo::console::warn!("conversion failed:", message);
                    let mut failed = current;
                    failed.urls.release();
                    deps.session.set(None);
                    deps.loading.set(false);
                    deps.advisory.set(Some(ADVISORY_TEXT.to_string()));
                }
            }
        });
    }

    /// Gate for finished conversions: only the latest issued token may apply
    /// its outcome. Superseded results are dropped and their artifacts
    /// released immediately.
    fn claim_outcome(
        &self,
        token: u64,
        outcome: Result<ConversionArtifacts, String>,
    ) -> Option<Result<ConversionArtifacts, String>> {
        if *self.request_token.borrow() == token {
            return Some(outcome);
        }
        if let Ok(artifacts) = outcome {
            artifacts.release();
        }
        None
    }

    /// Re-runs the conversion for the held source file, if any.
    fn reconvert(&self, params: ConversionParams) {
        if let Some(current) = (*self.session).clone() {
            self.start(current, params);
        }
    }

    fn accept_file(&self, file: Option<File>, params: ConversionParams) {
        let Some(file) = file else {
            return;
        };
        let source = match artifact_url::create_blob_url(&file) {
            Ok(url) => url,
            Err(error) => {
                gloo::console::warn!("upload failed:", engine_client::js_err(error));
                return;
            }
        };
        if let Some(mut previous) = (*self.session).clone() {
            previous.urls.release();
        }
        let current = Session {
            file,
            urls: SessionUrls::new(source),
        };
        self.session.set(Some(current.clone()));
        self.start(current, params);
    }

    fn reset(&self) {
        // Invalidate any in-flight response before dropping the session.
        *self.request_token.borrow_mut() += 1;
        if let Some(controller) = self.abort_handle.borrow_mut().take() {
            controller.abort();
        }
        if let Some(mut current) = (*self.session).clone() {
            current.urls.release();
        }
        self.session.set(None);
        self.loading.set(false);
        self.advisory.set(None);
    }
}

fn apply_params(
    deps: &ConversionDeps,
    params: &UseStateHandle<ConversionParams>,
    next: ConversionParams,
) {
    if next == **params {
        return;
    }
    params.set(next);
    deps.reconvert(next);
}

fn note_timestamp() -> String {
    String::from(Date::new_0().to_locale_time_string("en-US"))
}

#[cfg(test)]
thread_local! {
    static TEST_DEPS: RefCell<Option<ConversionDeps>> = RefCell::new(None);
}

#[function_component(App)]
pub(crate) fn app() -> Html {
    let session = use_state(|| None::<Session>);
    let loading = use_state(|| false);
    let dragging = use_state(|| false);
    let advisory = use_state(|| None::<String>);
    let params = use_state(ConversionParams::default);
    let notes = use_state(|| notes_store::load_notes(&LocalNotesStorage));
    let note_draft = use_state(String::new);
    let magnifier_active = use_state(|| false);
    let pointer = use_state(PointerPos::default);
    let container_width = use_state(|| 0.0f64);
    let container_ref = use_node_ref();
    let file_input_ref = use_node_ref();
    let request_token = use_mut_ref(|| 0u64);
    let abort_handle = use_mut_ref(|| None::<AbortController>);

    let deps = ConversionDeps {
        session: session.clone(),
        loading: loading.clone(),
        advisory: advisory.clone(),
        request_token,
        abort_handle,
    };
    #[cfg(test)]
    TEST_DEPS.with(|slot| {
        *slot.borrow_mut() = Some(deps.clone());
    });

    let on_drag_over = {
        let dragging = dragging.clone();
        Callback::from(move |event: DragEvent| {
            event.prevent_default();
            dragging.set(true);
        })
    };
    let on_drag_leave = {
        let dragging = dragging.clone();
        Callback::from(move |_: DragEvent| dragging.set(false))
    };
    let on_drop = {
        let deps = deps.clone();
        let dragging = dragging.clone();
        let params = params.clone();
        Callback::from(move |event: DragEvent| {
            event.prevent_default();
            dragging.set(false);
            let file = event
                .data_transfer()
                .and_then(|transfer| transfer.files())
                .and_then(|files| files.get(0));
            deps.accept_file(file, *params);
        })
    };

    let on_browse_click = {
        let file_input_ref = file_input_ref.clone();
        Callback::from(move |_: MouseEvent| {
            if let Some(input) = file_input_ref.cast::<HtmlInputElement>() {
                input.click();
            }
        })
    };
    let on_file_change = {
        let deps = deps.clone();
        let params = params.clone();
        Callback::from(move |event: Event| {
            let input: HtmlInputElement = event.target_unchecked_into();
            let file = input.files().and_then(|files| files.get(0));
            // Clear the input so picking the same file again re-triggers.
            input.set_value("");
            deps.accept_file(file, *params);
        })
    };

    let on_reset = {
        let deps = deps.clone();
        Callback::from(move |_: MouseEvent| deps.reset())
    };

    let on_precision_input = {
        let deps = deps.clone();
        let params = params.clone();
        Callback::from(move |event: InputEvent| {
            let input: HtmlInputElement = event.target_unchecked_into();
            let Ok(raw) = input.value().parse::<i32>() else {
                return;
            };
            let next = ConversionParams {
                precision: ConversionParams::clamp_precision(raw),
                ..*params
            };
            apply_params(&deps, &params, next);
        })
    };
    let on_group_toggle = {
        let deps = deps.clone();
        let params = params.clone();
        Callback::from(move |event: Event| {
            let input: HtmlInputElement = event.target_unchecked_into();
            let next = ConversionParams {
                group_by_color: input.checked(),
                ..*params
            };
            apply_params(&deps, &params, next);
        })
    };
    let on_fill_gaps_toggle = {
        let deps = deps.clone();
        let params = params.clone();
        Callback::from(move |event: Event| {
            let input: HtmlInputElement = event.target_unchecked_into();
            let next = ConversionParams {
                fill_gaps: input.checked(),
                ..*params
            };
            apply_params(&deps, &params, next);
        })
    };

    let on_note_input = {
        let note_draft = note_draft.clone();
        Callback::from(move |event: InputEvent| {
            let input: HtmlInputElement = event.target_unchecked_into();
            note_draft.set(input.value());
        })
    };
    let on_note_submit = {
        let notes = notes.clone();
        let note_draft = note_draft.clone();
        Callback::from(move |event: SubmitEvent| {
            event.prevent_default();
            let id = Date::now() as u64;
            let next = notes_store::add_note(
                &LocalNotesStorage,
                &notes,
                &note_draft,
                id,
                note_timestamp(),
            );
            if let Some(next) = next {
                notes.set(next);
                note_draft.set(String::new());
            }
        })
    };

    let on_mouse_move = {
        let pointer = pointer.clone();
        let container_width = container_width.clone();
        let container_ref = container_ref.clone();
        Callback::from(move |event: MouseEvent| {
            let Some(container) = container_ref.cast::<Element>() else {
                return;
            };
            let rect = container.get_bounding_client_rect();
            container_width.set(rect.width());
            pointer.set(magnifier::pointer_position(
                event.client_x() as f64,
                event.client_y() as f64,
                rect.left(),
                rect.top(),
                rect.width(),
                rect.height(),
            ));
        })
    };
    let on_mouse_enter = {
        let magnifier_active = magnifier_active.clone();
        let container_width = container_width.clone();
        let container_ref = container_ref.clone();
        Callback::from(move |_: MouseEvent| {
            // Seed the width so the first hovered frame has a measured lens.
            if let Some(container) = container_ref.cast::<Element>() {
                container_width.set(container.get_bounding_client_rect().width());
            }
            magnifier_active.set(true);
        })
    };
    let on_mouse_leave = {
        let magnifier_active = magnifier_active.clone();
        Callback::from(move |_: MouseEvent| magnifier_active.set(false))
    };

    let current = (*session).clone();
    let loaded = current.as_ref().map(Session::loaded).unwrap_or(false);
    // The source URL exists from upload; the outline only once loaded.
    let show_lens = magnifier::lens_visible(*magnifier_active, *loading, current.is_some(), loaded)
        && magnifier::lens_ready(*container_width);

    let mode_buttons: Html = CurveMode::ALL
        .iter()
        .map(|mode| {
            let mode = *mode;
            let onclick = {
                let deps = deps.clone();
                let params = params.clone();
                Callback::from(move |_: MouseEvent| {
                    let next = ConversionParams {
                        curve_mode: mode,
                        ..*params
                    };
                    apply_params(&deps, &params, next);
                })
            };
            let active = (params.curve_mode == mode).then_some("active");
            html! {
                <button type="button" class={classes!("mode-button", active)} {onclick}>
                    { mode.label() }
                </button>
            }
        })
        .collect();

    let advisory_banner = match (*advisory).as_ref() {
        Some(message) => html! { <div class="advisory">{ message.clone() }</div> },
        None => Html::default(),
    };

    let loaded_session = current.as_ref().and_then(|session| {
        session
            .urls
            .artifacts
            .clone()
            .map(|artifacts| (session, artifacts))
    });
    let body = if let Some((current, artifacts)) = loaded_session {
        let lens = if show_lens {
            let style = magnifier::lens_style(
                &pointer,
                *container_width,
                &artifacts.outline,
                &current.urls.source,
            );
            html! { <div class="lens" {style}></div> }
        } else {
            Html::default()
        };
        let overlay = if *loading {
            html! {
                <div class="loading-overlay">
                    <div class="loading-badge">{ "SYNCING WITH THE CLOUD..." }</div>
                </div>
            }
        } else {
            Html::default()
        };
        let result_class = if *loading { "result-image dimmed" } else { "result-image" };
        html! {
            <div class="workspace">
                <aside class="panel">
                    <div class="panel-group">
                        <label class="panel-label">{ "Stroke precision" }</label>
                        <input
                            type="range"
                            min={PRECISION_MIN.to_string()}
                            max={PRECISION_MAX.to_string()}
                            value={params.precision.to_string()}
                            oninput={on_precision_input}
                        />
                        <div class="range-legend"><span>{ "COARSE" }</span><span>{ "FINE" }</span></div>
                    </div>
                    <div class="panel-group">
                        <label class="panel-label">{ "Geometry" }</label>
                        <div class="mode-buttons">{ mode_buttons }</div>
                    </div>
                    <div class="panel-group">
                        <label class="toggle">
                            <input
                                type="checkbox"
                                checked={params.group_by_color}
                                onchange={on_group_toggle}
                            />
                            { "Group by color" }
                        </label>
                        <label class="toggle">
                            <input
                                type="checkbox"
                                checked={params.fill_gaps}
                                onchange={on_fill_gaps_toggle}
                            />
                            { "Fill gaps" }
                        </label>
                    </div>
                    <div class="panel-group notes">
                        <form onsubmit={on_note_submit}>
                            <input
                                type="text"
                                placeholder="Quick note..."
                                value={(*note_draft).clone()}
                                oninput={on_note_input}
                            />
                            <button type="submit">{ "SAVE NOTE" }</button>
                        </form>
                        <div class="note-list">
                            { for notes.iter().map(|note| html! {
                                <div key={note.id.to_string()} class="note" title={note.date.clone()}>
                                    { note.text.clone() }
                                </div>
                            }) }
                        </div>
                    </div>
                </aside>
                <section class="result">
                    <div
                        ref={container_ref.clone()}
                        class="result-stage"
                        onmousemove={on_mouse_move}
                        onmouseenter={on_mouse_enter}
                        onmouseleave={on_mouse_leave}
                    >
                        <img class={result_class} src={artifacts.result.clone()} alt="Vectorized result" />
                        { lens }
                        { overlay }
                    </div>
                    <a class="download" href={artifacts.result.clone()} download={DOWNLOAD_FILENAME}>
                        { "DOWNLOAD SVG" }
                    </a>
                </section>
            </div>
        }
    } else {
        let headline = if *loading {
            "THE ENGINE IS WORKING..."
        } else {
            "Drop your image here"
        };
        html! {
            <div class="drop-zone" onclick={on_browse_click}>
                <input
                    ref={file_input_ref.clone()}
                    class="hidden-input"
                    type="file"
                    onchange={on_file_change}
                />
                <div class="drop-copy">
                    <div class="drop-glyph">{ "✨" }</div>
                    <h2>{ headline }</h2>
                    <p>{ "PNG, JPG or WEBP, converted into paths" }</p>
                </div>
            </div>
        }
    };

    let root_class = classes!("app", (*dragging).then_some("dragging"));
    html! {
        <div
            class={root_class}
            ondragover={on_drag_over}
            ondragleave={on_drag_leave}
            ondrop={on_drop}
        >
            <header class="topbar">
                <div class="wordmark" onclick={on_reset.clone()}>
                    <h1>{ "VECTORIA" }<span>{ ".APP" }</span></h1>
                    <p>{ "PRO VECTORIZER" }</p>
                </div>
                { if loaded {
                    html! { <button class="reset-button" onclick={on_reset}>{ "NEW LOGO" }</button> }
                } else {
                    Html::default()
                } }
            </header>
            { advisory_banner }
            <main>{ body }</main>
        </div>
    }
}

pub(crate) fn run() {
    yew::Renderer::<App>::new().render();
}

#[cfg(test)]
mod tests {
    use super::*;
    use console_error_panic_hook::set_once as set_panic_hook;
    use gloo::timers::future::TimeoutFuture;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    const TEST_SVG: &str =
        "<svg xmlns=\"http://www.w3.org/2000/svg\"><path d=\"M0 0 L4 4\"/></svg>";
    const UNROUTABLE_ENGINE: &str = "?engine=http://127.0.0.1:9/vectorize";

    fn mount_test_root() -> Element {
        TEST_DEPS.with(|slot| slot.borrow_mut().take());
        let document = web_sys::window()
            .and_then(|window| window.document())
            .expect("document available");
        let root = document.create_element("div").expect("create test root");
        document
            .body()
            .expect("body available")
            .append_child(&root)
            .expect("append test root");
        root
    }

    async fn wait_for_deps() -> ConversionDeps {
        let start = Date::now();
        loop {
            if let Some(deps) = TEST_DEPS.with(|slot| slot.borrow().clone()) {
                return deps;
            }
            if Date::now() - start > 5000.0 {
                panic!("deps not published (App may not have rendered)");
            }
            TimeoutFuture::new(10).await;
        }
    }

    fn set_page_query(query: &str) {
        let history = web_sys::window()
            .and_then(|window| window.history().ok())
            .expect("history available");
        history
            .replace_state_with_url(&wasm_bindgen::JsValue::NULL, "", Some(query))
            .expect("replace url");
    }

    fn clear_page_query() {
        let pathname = web_sys::window()
            .and_then(|window| window.location().pathname().ok())
            .unwrap_or_else(|| "/".to_string());
        set_page_query(&pathname);
    }

    fn test_image_file() -> File {
        let parts = js_sys::Array::new();
        parts.push(&wasm_bindgen::JsValue::from_str("not really an image"));
        File::new_with_str_sequence(&parts, "logo.png").expect("test file")
    }

    #[wasm_bindgen_test]
    async fn app_starts_on_the_home_view() {
        set_panic_hook();
        let root = mount_test_root();
        let _handle = yew::Renderer::<App>::with_root(root.clone()).render();
        TimeoutFuture::new(50).await;
        assert!(root.query_selector(".drop-zone").expect("query ok").is_some());
        assert!(root.query_selector(".workspace").expect("query ok").is_none());
        assert!(root.query_selector(".lens").expect("query ok").is_none());
        assert!(root.query_selector(".reset-button").expect("query ok").is_none());
        root.remove();
    }

    #[wasm_bindgen_test]
    async fn note_form_is_absent_until_a_result_loads() {
        set_panic_hook();
        let root = mount_test_root();
        let _handle = yew::Renderer::<App>::with_root(root.clone()).render();
        TimeoutFuture::new(50).await;
        assert!(root.query_selector(".note-list").expect("query ok").is_none());
        root.remove();
    }

    #[wasm_bindgen_test]
    async fn engine_failure_resets_to_home_with_advisory() {
        set_panic_hook();
        let root = mount_test_root();
        let _handle = yew::Renderer::<App>::with_root(root.clone()).render();
        let deps = wait_for_deps().await;

        set_page_query(UNROUTABLE_ENGINE);
        deps.accept_file(Some(test_image_file()), ConversionParams::default());

        let start = Date::now();
        loop {
            if root.query_selector(".advisory").expect("query ok").is_some() {
                break;
            }
            if Date::now() - start > 8000.0 {
                clear_page_query();
                panic!("advisory not shown after engine failure");
            }
            TimeoutFuture::new(25).await;
        }
        clear_page_query();

        assert!(root.query_selector(".drop-zone").expect("query ok").is_some());
        assert!(root.query_selector(".workspace").expect("query ok").is_none());
        assert!(root.query_selector(".lens").expect("query ok").is_none());
        root.remove();
    }

    #[wasm_bindgen_test]
    async fn stale_conversion_outcome_is_discarded() {
        set_panic_hook();
        let root = mount_test_root();
        let _handle = yew::Renderer::<App>::with_root(root.clone()).render();
        let deps = wait_for_deps().await;

        let fresh = engine_client::build_artifacts(TEST_SVG).expect("artifacts built");
        let token = *deps.request_token.borrow();
        let claimed = deps.claim_outcome(token, Ok(fresh.clone()));
        assert_eq!(claimed, Some(Ok(fresh.clone())));
        fresh.release();

        *deps.request_token.borrow_mut() += 1;
        let stale = engine_client::build_artifacts(TEST_SVG).expect("artifacts built");
        assert_eq!(deps.claim_outcome(token, Ok(stale)), None);
        assert_eq!(
            deps.claim_outcome(token, Err("late failure".to_string())),
            None
        );
        root.remove();
    }

    #[wasm_bindgen_test]
    async fn reset_during_conversion_suppresses_the_failure() {
        set_panic_hook();
        let root = mount_test_root();
        let _handle = yew::Renderer::<App>::with_root(root.clone()).render();
        let deps = wait_for_deps().await;

        set_page_query(UNROUTABLE_ENGINE);
        deps.accept_file(Some(test_image_file()), ConversionParams::default());
        deps.reset();

        TimeoutFuture::new(1500).await;
        clear_page_query();

        assert!(root.query_selector(".advisory").expect("query ok").is_none());
        assert!(root.query_selector(".drop-zone").expect("query ok").is_some());
        assert!(root.query_selector(".workspace").expect("query ok").is_none());
        root.remove();
    }
}
