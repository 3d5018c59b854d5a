#![forbid(unsafe_code)]

//! statewire playground binary entry point.

use statewire_core::logging;
use statewire_playground::app::ContentView;
use statewire_playground::cli;
use statewire_playground::render::Renderer;
use tracing::{debug, info};

fn main() {
    let opts = cli::Opts::parse();

    if let Err(e) = logging::init(&opts.log) {
        eprintln!("Failed to initialize logging: {e}");
        std::process::exit(1);
    }
    debug!(?opts, env_keys = ?cli::env_keys(), "options parsed");

    let view = ContentView::new();
    let mut renderer = match Renderer::attach(&view) {
        Ok(renderer) => renderer,
        Err(e) => {
            eprintln!("Failed to attach renderer: {e}");
            std::process::exit(1);
        }
    };

    if let Some(frame) = renderer.frame(&view) {
        println!("{frame}\n");
    }
    for _ in 0..opts.repeat {
        for &counter in &opts.presses {
            view.press(counter);
            if let Some(frame) = renderer.frame(&view) {
                println!("> {counter}\n{frame}\n");
            }
        }
    }
    info!(
        renders = renderer.render_count(),
        pulses = renderer.pulse_count(),
        "playground finished"
    );

    if opts.json {
        match serde_json::to_string_pretty(&view.snapshot()) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Failed to serialize snapshot: {e}");
                std::process::exit(1);
            }
        }
    }
}
