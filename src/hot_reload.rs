use std::{path::Path, sync::Arc, time::Duration};

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use notify_debouncer_full::{
    new_debouncer, DebouncedEvent,
    notify::{RecursiveMode, Watcher, Error as NotifyError},
};
use tracing::{debug, error, info};

use crate::state::{AppState, RefreshBroadcaster};

pub const HOT_RELOAD_SCRIPT: &str = r#"
<script>
    const socket = new WebSocket("ws://" + window.location.host + "/ws");
    socket.onmessage = (event) => {
        if (event.data === "reload") {
            window.location.reload();
        }
    };
</script>
"#;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(tx): State<RefreshBroadcaster>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, tx))
}

async fn handle_socket(mut socket: WebSocket, tx: RefreshBroadcaster) {
    let mut rx = tx.subscribe();

    if rx.recv().await.is_ok() {
        if socket.send(Message::Text("reload".to_string().into())).await.is_err() {
            debug!("Client disconnected before reload message could be sent");
        }
    }
}

/// Editor scratch files (Emacs `.#foo`, `foo~` backups) never trigger a rebuild.
fn is_temp_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map_or(false, |s| s.starts_with(".#") || s.ends_with('~'))
}

fn is_relevant(event: &DebouncedEvent) -> bool {
    let kind_matters = event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove();
    kind_matters && !event.event.paths.iter().any(|path| is_temp_file(path))
}

pub fn start_content_watcher(tx: RefreshBroadcaster, app_state: Arc<AppState>) {
    info!("Starting content watcher for hot-reload...");
    tokio::spawn(async move {
        let (watcher_tx, mut watcher_rx) = tokio::sync::mpsc::channel(1);

        let debouncer = new_debouncer(Duration::from_millis(200), None, move |res: Result<Vec<DebouncedEvent>, Vec<NotifyError>>| {
            match res {
                Ok(events) => {
                    let changed: Vec<_> = events
                        .iter()
                        .filter(|event| is_relevant(event))
                        .flat_map(|event| &event.event.paths)
                        .map(|path| path.display().to_string())
                        .collect();

                    if !changed.is_empty() {
                        debug!(?changed, "Relevant content change detected");
                        // A full channel already holds a pending rebuild.
                        let _ = watcher_tx.try_send(());
                    }
                }
                Err(errors) => {
                    for e in errors {
                        error!("Watcher error: {}", e);
                    }
                }
            }
        });

        let mut debouncer = match debouncer {
            Ok(debouncer) => debouncer,
            Err(e) => {
                error!("Failed to create debouncer: {}", e);
                return;
            }
        };

        if let Err(e) = debouncer
            .watcher()
            .watch(&app_state.content_dir, RecursiveMode::Recursive)
        {
            error!("Failed to watch {}: {}", app_state.content_dir.display(), e);
            return;
        }

        while watcher_rx.recv().await.is_some() {
            info!("Content change detected, regenerating and sending reload signal...");

            app_state.regenerate().await;

            // No subscribers just means no browser tab is open.
            if tx.send(()).is_err() {
                debug!("No clients to notify of reload");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::is_temp_file;

    #[test]
    fn editor_scratch_files_are_ignored() {
        assert!(is_temp_file(Path::new("content/posts/.#draft.md")));
        assert!(is_temp_file(Path::new("content/posts/draft.md~")));
        assert!(!is_temp_file(Path::new("content/posts/draft.md")));
    }
}
