use eframe::egui;
use once_cell::sync::Lazy;
use std::sync::Mutex;

mod api;
mod config;
mod gui;
mod models;
mod tally;
mod websocket;

use config::Config;
use gui::state::AppState;

pub static APP_STATE: Lazy<Mutex<AppState>> =
    Lazy::new(|| Mutex::new(AppState::new(Config::load())));

fn main() -> eframe::Result {
    env_logger::init();

    let builder = egui::ViewportBuilder::default()
        .with_title("SMS Voting Board")
        .with_inner_size(egui::vec2(480.0, 640.0));

    let options = eframe::NativeOptions {
        viewport: builder,
        ..Default::default()
    };

    eframe::run_simple_native("SMS Voting Board", options, move |ctx, _frame| {
        gui::ui_main(ctx);
    })
}
