use crate::channel::{InboundSignals, SignalChannel, SignalConnector};
use crate::error::{ClientError, Result};
use crate::web::describe;
use async_trait::async_trait;
use futures::channel::{mpsc, oneshot};
use mirrorlink_core::SignalMessage;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, info};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{MessageEvent, WebSocket};

type OpenResult = std::result::Result<(), String>;

#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

pub struct WebSocketChannel {
    ws: WebSocket,
    _on_message: Closure<dyn FnMut(MessageEvent)>,
    _on_close: Closure<dyn FnMut(JsValue)>,
}

/// First of open, error or timeout settles the connect attempt.
fn settle(slot: &Rc<RefCell<Option<oneshot::Sender<OpenResult>>>>, outcome: OpenResult) {
    if let Some(tx) = slot.borrow_mut().take() {
        let _ = tx.send(outcome);
    }
}

#[async_trait(?Send)]
impl SignalConnector for WebSocketConnector {
    type Channel = WebSocketChannel;

    async fn connect(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<(WebSocketChannel, InboundSignals)> {
        let ws = WebSocket::new(url).map_err(|e| ClientError::TransportUnreachable(describe(&e)))?;

        let (open_tx, open_rx) = oneshot::channel::<OpenResult>();
        let slot = Rc::new(RefCell::new(Some(open_tx)));

        let on_open = {
            let slot = slot.clone();
            Closure::<dyn FnMut(JsValue)>::new(move |_| settle(&slot, Ok(())))
        };
        let on_error = {
            let slot = slot.clone();
            let url = url.to_owned();
            Closure::<dyn FnMut(JsValue)>::new(move |_| {
                settle(&slot, Err(format!("could not reach {url}")))
            })
        };
        let on_timeout = {
            let slot = slot.clone();
            let millis = timeout.as_millis();
            Closure::<dyn FnMut()>::new(move || {
                settle(&slot, Err(format!("no answer within {millis}ms")))
            })
        };

        let (inbound_tx, inbound_rx) = mpsc::unbounded::<SignalMessage>();
        let on_message = {
            let inbound_tx = inbound_tx.clone();
            Closure::<dyn FnMut(MessageEvent)>::new(move |e: MessageEvent| {
                let Ok(text) = e.data().dyn_into::<js_sys::JsString>() else {
                    return;
                };
                let text: String = text.into();
                match SignalMessage::from_json(&text) {
                    Ok(msg) => {
                        let _ = inbound_tx.unbounded_send(msg);
                    }
                    Err(err) => debug!("Dropping undecodable frame: {}", err),
                }
            })
        };
        let on_close = Closure::<dyn FnMut(JsValue)>::new(move |_| {
            debug!("Signaling socket closed");
            inbound_tx.close_channel();
        });

        ws.set_onopen(Some(on_open.as_ref().unchecked_ref()));
        ws.set_onerror(Some(on_error.as_ref().unchecked_ref()));
        ws.set_onmessage(Some(on_message.as_ref().unchecked_ref()));
        ws.set_onclose(Some(on_close.as_ref().unchecked_ref()));

        let window = web_sys::window()
            .ok_or_else(|| ClientError::TransportUnreachable("no window".into()))?;
        let timer = window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                on_timeout.as_ref().unchecked_ref(),
                i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX),
            )
            .map_err(|e| ClientError::TransportUnreachable(describe(&e)))?;

        // Owned before the wait so an abandoned connect closes the socket.
        let channel = WebSocketChannel {
            ws,
            _on_message: on_message,
            _on_close: on_close,
        };
        let outcome = open_rx.await;
        window.clear_timeout_with_handle(timer);
        channel.ws.set_onopen(None);
        channel.ws.set_onerror(None);

        match outcome {
            Ok(Ok(())) => {
                info!("Signaling socket connected to {}", url);
                Ok((channel, inbound_rx))
            }
            Ok(Err(reason)) => {
                channel.close();
                Err(ClientError::TransportUnreachable(reason))
            }
            Err(_) => {
                channel.close();
                Err(ClientError::TransportUnreachable("connect abandoned".into()))
            }
        }
    }
}

impl SignalChannel for WebSocketChannel {
    fn send(&self, msg: &SignalMessage) -> Result<()> {
        if !self.is_open() {
            return Err(ClientError::ChannelClosed);
        }
        let text = msg
            .to_json()
            .map_err(|e| ClientError::ProtocolViolation(e.to_string()))?;
        self.ws.send_with_str(&text).map_err(|e| {
            debug!("Socket refused frame: {}", describe(&e));
            ClientError::ChannelClosed
        })
    }

    fn is_open(&self) -> bool {
        self.ws.ready_state() == WebSocket::OPEN
    }

    fn close(&self) {
        self.ws.set_onopen(None);
        self.ws.set_onerror(None);
        self.ws.set_onmessage(None);
        self.ws.set_onclose(None);
        if matches!(self.ws.ready_state(), WebSocket::CONNECTING | WebSocket::OPEN) {
            let _ = self.ws.close();
        }
    }
}

impl Drop for WebSocketChannel {
    fn drop(&mut self) {
        self.close();
    }
}
