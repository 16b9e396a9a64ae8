use anyhow::{Context, Result};
use tui_story_deck::api::build_sources;
use tui_story_deck::config::{AppConfig, LogConfig};
use tui_story_deck::internal::clock::system_clock;
use tui_story_deck::internal::removals::open_store;
use tui_story_deck::internal::ui::app::App;
use tui_story_deck::internal::ui::keybinding_validator::detect_conflicts;
use tui_story_deck::tui;

fn env_filter(logging: &LogConfig) -> tracing_subscriber::EnvFilter {
    // RUST_LOG wins over the configured levels
    match std::env::var("RUST_LOG") {
        Ok(_) => tracing_subscriber::EnvFilter::from_default_env(),
        Err(_) => tracing_subscriber::EnvFilter::new(logging.filter_directive()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load();

    // Sources are built before touching the terminal so failures land on a
    // usable console.
    let clock = system_clock();
    let sources = build_sources(&config, clock.clone()).context("Failed to build sources")?;

    // While the TUI owns the screen, logs go to a daily rotating file only.
    match tui::init() {
        Ok(terminal) => {
            let file_appender =
                tracing_appender::rolling::daily(config.logging.directory(), "tui-story-deck.log");
            let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

            tracing_subscriber::fmt()
                .with_env_filter(env_filter(&config.logging))
                .with_writer(non_blocking)
                .with_ansi(false)
                .compact()
                .init();

            for conflict in detect_conflicts(&config.keybindings) {
                tracing::warn!(context = %conflict.context, keys = %conflict.keys, "{}", conflict.description);
            }
            if sources.is_empty() {
                tracing::warn!("No sources enabled; check config.ron");
            }

            let store = open_store(config.data_dir().as_deref());
            let mut app = App::new(&config, sources, store, clock);
            let res = app.run(terminal).await;

            tui::restore()?;

            if let Err(err) = res {
                eprintln!("{err:?}");
            }

            Ok(())
        }
        Err(e) => {
            tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .init();

            eprintln!("Failed to initialize TUI: {e:?}");
            Err(e.into())
        }
    }
}
