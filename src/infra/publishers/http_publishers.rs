// Builds the HTTP platform clients. One reqwest client (and its connection
// pool) is shared by every publisher instance.

use reqwest::Client;
use std::sync::Arc;

use crate::core::publishing::{PlatformPublisher, PublisherFactory};
use crate::infra::facebook::FacebookGraphPublisher;
use crate::infra::youtube::YoutubeDataPublisher;

pub struct HttpPublisherFactory {
    client: Client,
    graph_version: String,
}

impl HttpPublisherFactory {
    pub fn new(client: Client, graph_version: impl Into<String>) -> Self {
        Self {
            client,
            graph_version: graph_version.into(),
        }
    }
}

impl PublisherFactory for HttpPublisherFactory {
    fn facebook(&self, page_id: &str, access_token: &str) -> Arc<dyn PlatformPublisher> {
        Arc::new(FacebookGraphPublisher::new(
            self.client.clone(),
            self.graph_version.clone(),
            page_id,
            access_token,
        ))
    }

    fn youtube(&self, access_token: &str) -> Arc<dyn PlatformPublisher> {
        Arc::new(YoutubeDataPublisher::new(self.client.clone(), access_token))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Answers exactly one HTTP request on a loopback port with a canned reply.
    ///
    /// Returns the server's base URL and a receiver for the raw request head
    /// (lowercased), so tests can check the headers a client sent.
    pub async fn one_shot_server(
        status_line: &'static str,
        extra_headers: &'static [(&'static str, &'static str)],
        body: &'static str,
    ) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 8192];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                if let Some(end) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                    let head = String::from_utf8_lossy(&request[..end]).to_ascii_lowercase();
                    let length = head
                        .lines()
                        .find_map(|line| line.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if request.len() >= end + 4 + length {
                        let _ = tx.send(head);
                        break;
                    }
                }
            }

            let mut reply = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n",
                status_line,
                body.len()
            );
            for (name, value) in extra_headers {
                reply.push_str(&format!("{}: {}\r\n", name, value));
            }
            reply.push_str("\r\n");
            reply.push_str(body);
            socket.write_all(reply.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });

        (base, rx)
    }
}
