use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{Terminal, backend::TestBackend};
use tui_story_deck::api::{FetchOptions, SourceInfo, StorySource};
use tui_story_deck::config::AppConfig;
use tui_story_deck::internal::clock::{Clock, ManualClock};
use tui_story_deck::internal::models::Story;
use tui_story_deck::internal::removals::MemoryRemovalStore;
use tui_story_deck::internal::ui::app::{App, Command};
use tui_story_deck::internal::ui::view;

struct BlogSource {
    scores: bool,
}

#[async_trait]
impl StorySource for BlogSource {
    fn info(&self) -> SourceInfo {
        SourceInfo {
            id: "blog".to_string(),
            name: "Blog".to_string(),
            supports_comments: self.scores,
            supports_scores: self.scores,
        }
    }

    async fn fetch_stories(
        &self,
        _removed: &HashSet<String>,
        _options: FetchOptions,
    ) -> anyhow::Result<Vec<Story>> {
        Ok((1..=20)
            .map(|n| Story {
                id: n.to_string(),
                title: format!("Post {n}"),
                author: "writer".to_string(),
                url: Some(format!("https://www.example.org/{n}")),
                score: 10,
                comments_count: n,
                date: 1_700_000_000,
                ..Default::default()
            })
            .collect())
    }
}

async fn loaded_app(scores: bool) -> App {
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(1_700_007_200));
    let sources: Vec<Arc<dyn StorySource>> = vec![Arc::new(BlogSource { scores })];
    let mut app = App::new(
        &AppConfig::default(),
        sources,
        Arc::new(MemoryRemovalStore::new()),
        clock,
    );
    if let Some(Command::Fetch(request)) = app.start() {
        let event = request.run().await;
        app.apply_event(event);
    }
    app
}

fn render(app: &App) -> String {
    let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
    terminal.draw(|f| view::draw(app, f)).unwrap();

    let buffer = terminal.backend().buffer();
    let mut text = String::new();
    for y in 0..buffer.area.height {
        for x in 0..buffer.area.width {
            text.push_str(buffer[(x, y)].symbol());
        }
        text.push('\n');
    }
    text
}

fn press(app: &mut App, code: KeyCode) {
    app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
}

#[tokio::test]
async fn test_list_and_footer_render() {
    let app = loaded_app(true).await;
    let screen = render(&app);

    assert!(screen.contains("Showing 15 of 20 stories • Selected: 1"));
    assert!(screen.contains("Post 20 (example.org)"));
    assert!(screen.contains("10 points by writer | 2h ago | 20 comments"));
    assert!(screen.contains("Sort: comments"));
    assert!(!screen.contains("Post 5 "));
}

#[tokio::test]
async fn test_sources_without_scores_hide_points_and_comments() {
    let app = loaded_app(false).await;
    let screen = render(&app);

    assert!(screen.contains("by writer | 2h ago"));
    assert!(!screen.contains("points"));
    assert!(!screen.contains("comments |"));
    assert!(screen.contains("Sort: date (desc)"));
}

#[tokio::test]
async fn test_search_footer_mentions_total() {
    let mut app = loaded_app(true).await;
    press(&mut app, KeyCode::Char('/'));
    press(&mut app, KeyCode::Char('1'));
    let screen = render(&app);

    // "1", "10".."19" match
    assert!(screen.contains("Showing 11 of 11 stories • Selected: 1 • Filtered from 20 total"));
    assert!(screen.contains("Search"));
}

#[tokio::test]
async fn test_drawer_and_help_overlays() {
    let mut app = loaded_app(true).await;

    press(&mut app, KeyCode::Enter);
    let screen = render(&app);
    assert!(screen.contains("Open discussion"));
    assert!(screen.contains("Open article"));
    assert!(screen.contains("Remove from list"));
    assert!(screen.contains("https://www.example.org/20"));

    press(&mut app, KeyCode::Esc);
    press(&mut app, KeyCode::Char('?'));
    let screen = render(&app);
    assert!(screen.contains("Keyboard Shortcuts"));
    assert!(screen.contains("Remove story"));
}
