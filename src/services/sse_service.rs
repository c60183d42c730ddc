use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc, watch,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};

use crate::{
    dao::{document::CollectionPath, repository::SessionRepository},
    dto::{
        player::PlayerView,
        song::SongView,
        sse::{GAME_STATE_EVENT, PLAYERS_EVENT, SONGS_EVENT, SYSTEM_STATUS_EVENT, ServerEvent, SystemStatus},
    },
    error::ServiceError,
    playback::gateway::GameStateGateway,
    services::session_service::ensure_session,
    state::SharedState,
};

/// Live subscription to one session: the current values followed by every change.
pub struct SessionSubscription {
    code: String,
    snapshot: Vec<ServerEvent>,
    receiver: broadcast::Receiver<ServerEvent>,
    degraded: watch::Receiver<bool>,
}

/// Subscribe to session `code`. The hub subscription is taken before the snapshot is read
/// so no write committed in between is lost.
pub async fn subscribe_session(
    state: &SharedState,
    code: &str,
) -> Result<SessionSubscription, ServiceError> {
    let store = state.require_store().await?;
    let repository = SessionRepository::new(store.clone());
    ensure_session(&repository, code).await?;

    let hub = state.session_hub(code);
    let receiver = hub.subscribe();
    let game_state = GameStateGateway::new(store, hub, code).load().await?;
    let songs: Vec<SongView> = repository
        .list_songs(&CollectionPath::session_songs(code))
        .await?
        .into_iter()
        .map(SongView::from)
        .collect();
    let players: Vec<PlayerView> = repository
        .list_players(code)
        .await?
        .into_iter()
        .map(PlayerView::from)
        .collect();

    let snapshot = vec![
        ServerEvent::json(GAME_STATE_EVENT.to_owned(), &game_state),
        ServerEvent::json(SONGS_EVENT.to_owned(), &songs),
        ServerEvent::json(PLAYERS_EVENT.to_owned(), &players),
    ]
    .into_iter()
    .collect::<Result<Vec<_>, _>>()
    .map_err(|err| ServiceError::Internal(format!("failed to encode snapshot: {err}")))?;

    info!(%code, subscribers = state.session_hub(code).subscriber_count(), "session SSE subscription");
    Ok(SessionSubscription {
        code: code.to_owned(),
        snapshot,
        receiver,
        degraded: state.degraded_watcher(),
    })
}

fn to_event(payload: ServerEvent) -> Event {
    let event = Event::default().data(payload.data);
    match payload.event {
        Some(name) => event.event(name),
        None => event,
    }
}

fn status_event(degraded: bool) -> Option<Event> {
    ServerEvent::json(SYSTEM_STATUS_EVENT.to_owned(), &SystemStatus { degraded })
        .ok()
        .map(to_event)
}

/// Convert a subscription into an SSE response, forwarding events until the client disconnects.
pub fn to_sse_stream(
    subscription: SessionSubscription,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let SessionSubscription {
        code,
        snapshot,
        mut receiver,
        mut degraded,
    } = subscription;
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(16);

    tokio::spawn(async move {
        for payload in snapshot {
            if tx.send(Ok(to_event(payload))).await.is_err() {
                return;
            }
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                changed = degraded.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let value = *degraded.borrow_and_update();
                    if let Some(event) = status_event(value) {
                        if tx.send(Ok(event)).await.is_err() {
                            break;
                        }
                    }
                }
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            if tx.send(Ok(to_event(payload))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            debug!(%code, skipped, "SSE subscriber lagged");
                            continue;
                        }
                    }
                }
            }
        }

        info!(%code, "session SSE stream disconnected");
    });

    Sse::new(ReceiverStream::new(rx)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
