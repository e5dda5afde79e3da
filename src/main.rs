mod app;
mod config;
mod core;
mod input;
mod io;
mod suggest;
mod ui;

fn main() -> anyhow::Result<()> {
    app::run()
}
