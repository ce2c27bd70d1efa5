use console_error_panic_hook::set_once as set_panic_hook;

mod artifact_url;
mod engine_client;
mod magnifier;
mod model;
mod notes_store;
mod yew_app;

fn main() {
    set_panic_hook();
    yew_app::run();
}
