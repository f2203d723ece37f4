//! Upstream connection establishment
//!
//! One HTTP GET per connection epoch. The response must carry a
//! success status and declare a multipart content type with a boundary;
//! the body then becomes a [`MultipartStream`].
//!
//! There is no cooperative cancellation: closing the [`StreamHandle`] is
//! the only way to stop a reader. It makes the in-flight body read fail,
//! and the reader runs its normal termination path from there.

use std::io;

use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::ReceiverStream;

use crate::camera::CameraConfig;
use crate::error::{ProtocolError, Result, TransportError};
use crate::multipart::{parse_boundary, MultipartStream};

/// Body chunk stream handed to the multipart parser
pub(crate) type BodyStream = ReceiverStream<io::Result<Bytes>>;

/// Force-close handle for one connection epoch
pub(crate) struct StreamHandle {
    shutdown: watch::Sender<bool>,
}

impl StreamHandle {
    /// Fail the in-flight body read.
    pub(crate) fn close(&self) {
        let _ = self.shutdown.send(true);
    }
}

/// An established connection: the part iterator plus its close handle
pub(crate) struct OpenStream {
    pub(crate) parts: MultipartStream<BodyStream>,
    pub(crate) handle: StreamHandle,
}

/// Issue the HTTP GET and validate the response into an [`OpenStream`].
pub(crate) async fn open(config: &CameraConfig) -> Result<OpenStream> {
    let client = reqwest::Client::builder()
        .connect_timeout(config.connect_timeout)
        .build()
        .map_err(TransportError::Http)?;

    let mut request = client.get(&config.url);
    if let Some(ref username) = config.username {
        request = request.basic_auth(username, config.password.as_deref());
    }

    let response = request.send().await.map_err(TransportError::Http)?;

    let status = response.status();
    if !status.is_success() {
        return Err(TransportError::Status(status.as_u16()).into());
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .ok_or(ProtocolError::MissingContentType)?;
    let boundary = parse_boundary(content_type)?;

    let (handle, body) = guard(response.bytes_stream().boxed());
    Ok(OpenStream {
        parts: MultipartStream::new(body, &boundary),
        handle,
    })
}

/// Wrap the response body so [`StreamHandle::close`] fails the next read.
///
/// The forwarder task exits when the close signal fires, when the handle
/// is dropped (camera torn down), when the parser side is dropped, or
/// when the body itself ends.
fn guard(mut body: BoxStream<'static, reqwest::Result<Bytes>>) -> (StreamHandle, BodyStream) {
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let (tx, rx) = mpsc::channel::<io::Result<Bytes>>(1);

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    let _ = tx
                        .send(Err(io::Error::new(
                            io::ErrorKind::ConnectionAborted,
                            "stream handle closed",
                        )))
                        .await;
                    return;
                }
                chunk = body.next() => match chunk {
                    Some(Ok(chunk)) => {
                        if tx.send(Ok(chunk)).await.is_err() {
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        let _ = tx
                            .send(Err(io::Error::new(io::ErrorKind::Other, e)))
                            .await;
                        return;
                    }
                    // Dropping the sender ends the stream cleanly.
                    None => return,
                },
            }
        }
    });

    (StreamHandle { shutdown: shutdown_tx }, ReceiverStream::new(rx))
}
