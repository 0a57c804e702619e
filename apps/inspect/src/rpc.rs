use anyhow::{Result, anyhow};
use log::{debug, warn};
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;
use tokio::time::sleep;

#[derive(Clone)]
pub struct RpcClient {
    http: Client,
    url: String,
    max_attempts: u32,
}

impl RpcClient {
    pub fn new(url: String, timeout: Duration, max_attempts: u32) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow!("reqwest client: {e:?}"))?;
        Ok(Self {
            http,
            url,
            max_attempts: max_attempts.max(1),
        })
    }

    /// `getTransaction` with plain `json` encoding, so `meta.logMessages`
    /// comes back untouched.
    pub async fn get_transaction(&self, signature: &str) -> Result<Value> {
        let result = self.call("getTransaction", get_transaction_params(signature)).await?;
        if result.is_null() {
            return Err(anyhow!("transaction not found: {signature}"));
        }
        Ok(result)
    }

    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let body = request_body(method, params);
        let mut backoff = Duration::from_millis(250);

        for attempt in 1..=self.max_attempts {
            let retry = attempt < self.max_attempts;
            debug!("rpc {method} attempt {attempt}/{}", self.max_attempts);

            let resp = self.http.post(&self.url).json(&body).send().await;

            match resp {
                Ok(r) => {
                    let status = r.status();

                    if !status.is_success() {
                        // usually 429/5xx; gateways often answer with text or html
                        if retry {
                            warn!("rpc http status {status}, backing off {}ms", backoff.as_millis());
                            sleep(backoff).await;
                            backoff = (backoff * 2).min(Duration::from_secs(5));
                            continue;
                        }
                        let body = r.text().await.unwrap_or_default();
                        return Err(anyhow!("rpc http error status={status} body={body}"));
                    }

                    let v: Value = r.json().await.map_err(|e| anyhow!("rpc decode error: {e:?}"))?;
                    return extract_result(v);
                }
                Err(e) => {
                    if retry {
                        warn!("rpc request failed: {e:?}, retrying in {}ms", backoff.as_millis());
                        sleep(backoff).await;
                        backoff = (backoff * 2).min(Duration::from_secs(5));
                        continue;
                    }
                    return Err(anyhow!("rpc request failed: {e:?}"));
                }
            }
        }

        Err(anyhow!("rpc {method}: no attempts made"))
    }
}

fn get_transaction_params(signature: &str) -> Value {
    json!([signature, "json"])
}

fn request_body(method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": method,
        "params": params
    })
}

/// JSON-RPC envelope: an `error` member wins over `result`.
fn extract_result(v: Value) -> Result<Value> {
    if let Some(err) = v.get("error") {
        return Err(anyhow!("rpc returned error: {err}"));
    }
    v.get("result")
        .cloned()
        .ok_or_else(|| anyhow!("missing result field"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    /// Serves one canned HTTP reply per connection, in order, and counts requests.
    fn serve(replies: Vec<(&'static str, &'static str, String)>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        thread::spawn(move || {
            for (status, content_type, body) in replies {
                let Ok((mut stream, _)) = listener.accept() else {
                    return;
                };
                read_request(&mut stream);
                counter.fetch_add(1, Ordering::SeqCst);
                let resp = format!(
                    "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(resp.as_bytes());
            }
        });

        (url, hits)
    }

    fn read_request(stream: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).unwrap_or(0);
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);

            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                let len = head
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + len {
                    return;
                }
            }
        }
    }

    fn client(url: String, max_attempts: u32) -> RpcClient {
        RpcClient::new(url, Duration::from_secs(5), max_attempts).unwrap()
    }

    #[tokio::test]
    async fn test_plaintext_429_is_retried() {
        let (url, hits) = serve(vec![
            ("429 Too Many Requests", "text/plain", "Too many requests".to_string()),
            (
                "200 OK",
                "application/json",
                json!({"jsonrpc": "2.0", "id": 1, "result": {"slot": 7}}).to_string(),
            ),
        ]);

        let result = client(url, 3).call("getSlot", json!([])).await.unwrap();
        assert_eq!(result, json!({"slot": 7}));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_html_5xx_exhausts_attempts() {
        let page = "<html>bad gateway</html>".to_string();
        let (url, hits) = serve(vec![
            ("502 Bad Gateway", "text/html", page.clone()),
            ("502 Bad Gateway", "text/html", page),
        ]);

        let err = client(url, 2).call("getSlot", json!([])).await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("502"), "{msg}");
        assert!(msg.contains("bad gateway"), "{msg}");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_rpc_error_is_not_retried() {
        let (url, hits) = serve(vec![(
            "200 OK",
            "application/json",
            json!({"jsonrpc": "2.0", "id": 1, "error": {"code": -32602, "message": "Invalid param"}})
                .to_string(),
        )]);

        let err = client(url, 3).call("getTransaction", json!(["x", "json"])).await.unwrap_err();
        assert!(err.to_string().contains("Invalid param"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_null_transaction_is_not_found() {
        let (url, _) = serve(vec![(
            "200 OK",
            "application/json",
            json!({"jsonrpc": "2.0", "id": 1, "result": null}).to_string(),
        )]);

        let err = client(url, 1).get_transaction("sig123").await.unwrap_err();
        assert!(err.to_string().contains("transaction not found: sig123"));
    }

    #[test]
    fn test_get_transaction_body() {
        let body = request_body("getTransaction", get_transaction_params("sig123"));
        assert_eq!(
            body,
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "getTransaction",
                "params": ["sig123", "json"]
            })
        );
    }

    #[test]
    fn test_extract_result() {
        let v = json!({"jsonrpc": "2.0", "id": 1, "result": {"slot": 5}});
        assert_eq!(extract_result(v).unwrap(), json!({"slot": 5}));
    }

    #[test]
    fn test_extract_null_result() {
        let v = json!({"jsonrpc": "2.0", "id": 1, "result": null});
        assert!(extract_result(v).unwrap().is_null());
    }

    #[test]
    fn test_extract_error() {
        let v = json!({"jsonrpc": "2.0", "id": 1, "error": {"code": -32602, "message": "Invalid param"}});
        let err = extract_result(v).unwrap_err();
        assert!(err.to_string().contains("Invalid param"));
    }

    #[test]
    fn test_missing_result() {
        assert!(extract_result(json!({"jsonrpc": "2.0", "id": 1})).is_err());
    }
}
