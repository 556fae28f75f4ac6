//! WebSocket connection to the Socket Mode endpoint.
//!
//! [`connect`] splits the socket into a [`FrameReader`] owned by the
//! receive loop and a cloneable [`AckWriter`] shared by every component
//! that needs to acknowledge envelopes.

use std::sync::Arc;

use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

use super::ClientError;
use crate::objects::Ack;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Open a WebSocket to a URL returned by `apps.connections.open`.
pub async fn connect(url: &Url) -> Result<(FrameReader, AckWriter), ClientError> {
    let (stream, _response) = connect_async(url.as_str()).await?;
    let (sink, stream) = stream.split();
    Ok((
        FrameReader { stream },
        AckWriter {
            sink: Arc::new(Mutex::new(sink)),
        },
    ))
}

/// Read half of the socket.
pub struct FrameReader {
    stream: SplitStream<WsStream>,
}

impl FrameReader {
    /// Wait for the next data frame.
    ///
    /// Control frames are skipped. Returns `None` once the server closes
    /// the connection.
    pub async fn next_frame(&mut self) -> Option<Result<Bytes, ClientError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(Bytes::from(text))),
                Ok(Message::Binary(data)) => return Some(Ok(Bytes::from(data))),
                Ok(Message::Close(_)) => return None,
                Ok(_) => continue,
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}

/// Write half of the socket.
#[derive(Clone)]
pub struct AckWriter {
    sink: Arc<Mutex<SplitSink<WsStream, Message>>>,
}

impl AckWriter {
    /// Send an acknowledgement frame.
    pub async fn send_ack(&self, ack: &Ack) -> Result<(), ClientError> {
        let text = serde_json::to_string(ack)?;
        self.sink.lock().await.send(Message::Text(text)).await?;
        Ok(())
    }

    /// Send a close frame.
    pub async fn close(&self) -> Result<(), ClientError> {
        self.sink.lock().await.close().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    /// Accept one WebSocket on a local port and hand it to `server`.
    async fn serve_once<F, Fut>(server: F) -> (Url, tokio::task::JoinHandle<()>)
    where
        F: FnOnce(WebSocketStream<TcpStream>) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = Url::parse(&format!("ws://{}", listener.local_addr().unwrap())).unwrap();
        let handle = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            server(accept_async(tcp).await.unwrap()).await;
        });
        (url, handle)
    }

    #[tokio::test]
    async fn test_reader_skips_control_frames_and_ends_on_close() {
        let (url, server) = serve_once(|mut ws| async move {
            ws.send(Message::Ping(b"are you there".to_vec())).await.unwrap();
            ws.send(Message::Text(r#"{"type":"hello"}"#.to_string())).await.unwrap();
            ws.send(Message::Binary(b"{\"type\":\"disconnect\"}".to_vec()))
                .await
                .unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let (mut reader, _writer) = connect(&url).await.unwrap();
        assert_eq!(
            reader.next_frame().await.unwrap().unwrap(),
            Bytes::from_static(br#"{"type":"hello"}"#)
        );
        assert_eq!(
            reader.next_frame().await.unwrap().unwrap(),
            Bytes::from_static(br#"{"type":"disconnect"}"#)
        );
        assert!(reader.next_frame().await.is_none());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_writer_sends_ack_as_text_frame() {
        let (frames_tx, mut frames_rx) = tokio::sync::mpsc::unbounded_channel();
        let (url, server) = serve_once(move |mut ws| async move {
            while let Some(Ok(message)) = ws.next().await {
                if let Message::Text(text) = message {
                    frames_tx.send(text).unwrap();
                }
            }
        })
        .await;

        let (_reader, writer) = connect(&url).await.unwrap();
        let shared = writer.clone();
        writer.send_ack(&Ack::new("env-1")).await.unwrap();
        shared
            .send_ack(&Ack::new("env-2").with_payload(serde_json::json!({"text": "ok"})))
            .await
            .unwrap();

        let first: serde_json::Value = serde_json::from_str(&frames_rx.recv().await.unwrap()).unwrap();
        assert_eq!(first, serde_json::json!({"envelope_id": "env-1"}));
        let second: serde_json::Value =
            serde_json::from_str(&frames_rx.recv().await.unwrap()).unwrap();
        assert_eq!(
            second,
            serde_json::json!({"envelope_id": "env-2", "payload": {"text": "ok"}})
        );

        writer.close().await.unwrap();
        server.await.unwrap();
    }
}
