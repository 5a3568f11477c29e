mod app;
mod audio;
mod config;
mod download;
mod error;
mod library;
mod mpris;
mod runtime;
mod search;
mod ui;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    runtime::run()
}
