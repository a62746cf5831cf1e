use agix::app::AppContext;
use agix::chat::{ChatWidgetHandle, HEADER_TITLE, INPUT_PLACEHOLDER, Role};
use agix::settings::SettingsStore;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

/// Terminal host for the chat widget.
///
/// Lines are submitted as messages; `/open`, `/close`, `/toggle` change
/// visibility and `/quit` exits. Turns received while the widget is closed are
/// printed once it is opened again.
#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = SettingsStore::load();
    if let Some(path) = settings.config_path() {
        tracing::info!("settings resolved from {:?}", path);
    }

    let context = AppContext::new(settings);
    if !context.sessions().is_configured() {
        tracing::warn!("no API key configured; replies will report systems offline");
    }

    let widget = context.mount_widget();
    widget.lock().await.open();

    println!("== {HEADER_TITLE} ==  ({INPUT_PLACEHOLDER})");
    let mut printed = render(&widget, 0).await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(error) => {
                tracing::error!(error = %error, "failed to read from stdin");
                break;
            }
        };

        match line.trim() {
            "/quit" => break,
            "/open" => widget.lock().await.open(),
            "/close" => widget.lock().await.close(),
            "/toggle" => widget.lock().await.toggle(),
            _ => {
                widget.lock().await.set_input(line.as_str());
                if let Some(pending) = widget.submit().await {
                    printed = render(&widget, printed).await;
                    if widget.lock().await.is_open() {
                        println!("   ...");
                    }
                    if let Err(error) = pending.await {
                        tracing::error!(error = %error, "chat exchange task failed");
                    }
                }
            }
        }

        printed = render(&widget, printed).await;
    }
}

/// Prints turns added since `printed` while the widget is open. Returns the
/// new count of printed turns.
async fn render(widget: &ChatWidgetHandle, printed: usize) -> usize {
    let mut widget = widget.lock().await;
    if !widget.is_open() {
        return printed;
    }

    for turn in widget.turns().iter().skip(printed) {
        let speaker = match turn.role() {
            Role::User => "you ",
            Role::Model => "agix",
        };
        println!("{speaker}> {}", turn.text());
    }

    widget.take_scroll_request();
    widget.turns().len()
}
