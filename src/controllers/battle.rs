use axum::{
    Json, response::IntoResponse,
    extract::{Path, State},
    extract::ws::{close_code, Message, WebSocket, WebSocketUpgrade},
    http::StatusCode,
};
//use axum_macros::debug_handler;
use log::{error, info};
use serde_json::json;

use crate::actor::BattleActor;
use crate::errors::CustomError;
use crate::protocol::ClientMessage;
use crate::AppState;

//handler for minting a new battle address.
pub async fn create_battle(State(state): State<AppState>) -> Result<impl IntoResponse, CustomError> {

    info!("create battle request");

    let battle = state.store.create_battle();

    Ok((StatusCode::OK, Json(json!({ "ws_address": battle.address }))))
}

/////////////////////////////////////////////////////////////////////////////////////////////////////////////////
//handler for attaching a websocket to a battle.
pub async fn ws_battle( Path(address): Path<String>,
                        State(state): State<AppState>,
                        ws: WebSocketUpgrade
                        ) -> Result<impl IntoResponse, CustomError> {

    info!("websocket request for battle {}", address);

    // check before upgrading, so a bad address gets a plain HTTP error.
    // The slot itself is only claimed once the socket task joins; a racing
    // second socket is turned away there with the same message.
    let battle = match state.store.battle(&address) {
        Some(battle) => battle,
        None => {
            info!("battle {} does not exist", address);
            return Err(CustomError::BattleNotFound);
        }
    };
    if battle.is_full() {
        info!("battle {} is full", address);
        return Err(CustomError::BattleFull);
    }

    Ok(ws.on_upgrade(move |socket| battle_session(socket, state, address)))
}

/////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// One task per accepted socket. It registers a relay mailbox, joins the
// battle, then feeds client frames and peer events through the actor one at
// a time until the connection ends.
async fn battle_session(mut socket: WebSocket, state: AppState, address: String) {
    let (channel, mut inbox) = state.relay.register();

    let joined = BattleActor::join(state.store.clone(), state.relay.clone(), &address, channel);
    let (mut actor, replies) = match joined {
        Ok(joined) => joined,
        Err(err) => {
            info!("join refused for battle {}: {}", address, err);
            let _ = send_frames(&mut socket, vec![ClientMessage::error(err)]).await;
            state.relay.unregister(channel);
            let _ = socket.close().await;
            return;
        }
    };

    let mut clean = false;
    if send_frames(&mut socket, replies).await.is_ok() {
        loop {
            tokio::select! {
                frame = socket.recv() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        let replies = actor.handle_frame(&text);
                        if send_frames(&mut socket, replies).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        // a close frame without a code counts as a normal close
                        clean = match frame {
                            Some(frame) => frame.code == close_code::NORMAL,
                            None => true,
                        };
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        error!("websocket error on battle {}: {}", address, err);
                        break;
                    }
                    None => break,
                },
                event = inbox.recv() => match event {
                    Some(event) => {
                        let frames = actor.handle_peer(event);
                        if send_frames(&mut socket, frames).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }
    }

    state.relay.unregister(channel);
    actor.disconnect(clean);
    let _ = socket.close().await;
}

/////////////////////////////////////////////////////////////////////////////////////////////////////////////////
async fn send_frames(socket: &mut WebSocket, frames: Vec<ClientMessage>) -> Result<(), axum::Error> {
    for frame in frames {
        match serde_json::to_string(&frame) {
            Ok(text) => socket.send(Message::Text(text)).await?,
            Err(err) => error!("unserializable frame skipped: {}", err),
        }
    }
    Ok(())
}
