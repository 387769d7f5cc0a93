//! Loopback listener that receives the OAuth authorization redirect.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use super::error::AuthError;

/// How long `bb auth login` waits for the browser to come back.
pub const CALLBACK_TIMEOUT: Duration = Duration::from_secs(5 * 60);

const CALLBACK_PATH: &str = "/callback";

const SUCCESS_PAGE: &str = "<html><body><h2>Authentication Successful!</h2>\
<p>You can close this window and return to the terminal.</p></body></html>";

/// Local HTTP endpoint bound to an ephemeral port on 127.0.0.1.
///
/// The consumer's callback URL must be `http://localhost`; Bitbucket accepts
/// any port on it, so the `redirect_uri` sent with the authorize request
/// routes the browser back here.
#[derive(Debug)]
pub struct CallbackServer {
    listener: TcpListener,
    redirect_uri: String,
}

impl CallbackServer {
    pub async fn bind() -> Result<Self, AuthError> {
        let listener = TcpListener::bind("127.0.0.1:0").await.map_err(|err| {
            AuthError::Io(format!("failed to start local callback server: {err}"))
        })?;
        let port = listener.local_addr()?.port();
        Ok(Self {
            listener,
            redirect_uri: format!("http://localhost:{port}{CALLBACK_PATH}"),
        })
    }

    /// Redirect URI to pass to both the authorize URL and the code exchange.
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Serve requests until the callback arrives, then return its `code`.
    ///
    /// Requests for other paths get a 404 and the wait continues.
    pub async fn wait_for_code(self, timeout: Duration) -> Result<String, AuthError> {
        match tokio::time::timeout(timeout, self.accept_callback()).await {
            Ok(outcome) => outcome,
            Err(_) => Err(AuthError::AuthorizationTimeout {
                minutes: timeout.as_secs() / 60,
            }),
        }
    }

    async fn accept_callback(&self) -> Result<String, AuthError> {
        loop {
            let (mut stream, peer) = self.listener.accept().await?;
            let Some(target) = read_request_target(&mut stream).await? else {
                continue;
            };
            tracing::debug!(%peer, %target, "Callback request");

            match parse_callback(&target) {
                None => respond(&mut stream, "404 Not Found", "<html><body>Not found</body></html>")
                    .await?,
                Some(Ok(code)) => {
                    respond(&mut stream, "200 OK", SUCCESS_PAGE).await?;
                    return Ok(code);
                }
                Some(Err(message)) => {
                    let page = format!(
                        "<html><body><h2>Authentication Failed</h2><p>{}</p>\
<p>You can close this window.</p></body></html>",
                        escape_html(&message)
                    );
                    respond(&mut stream, "200 OK", &page).await?;
                    return Err(AuthError::AuthorizationFailed(message));
                }
            }
        }
    }
}

/// Read the request line and drain the headers; returns the request target.
async fn read_request_target(stream: &mut TcpStream) -> Result<Option<String>, AuthError> {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).await? == 0 {
        return Ok(None);
    }
    let mut header = String::new();
    loop {
        header.clear();
        let read = reader.read_line(&mut header).await?;
        if read == 0 || header.trim_end().is_empty() {
            break;
        }
    }
    Ok(request_line.split_whitespace().nth(1).map(str::to_string))
}

/// `None` for paths other than the callback; otherwise the code or the
/// provider's error text.
fn parse_callback(target: &str) -> Option<Result<String, String>> {
    let url = reqwest::Url::parse(&format!("http://localhost{target}")).ok()?;
    if url.path() != CALLBACK_PATH {
        return None;
    }
    let query = |name: &str| {
        url.query_pairs()
            .find(|(key, value)| key == name && !value.is_empty())
            .map(|(_, value)| value.into_owned())
    };
    Some(match query("code") {
        Some(code) => Ok(code),
        None => Err(query("error_description")
            .or_else(|| query("error"))
            .unwrap_or_else(|| "no authorization code received".to_string())),
    })
}

async fn respond(stream: &mut TcpStream, status: &str, body: &str) -> Result<(), AuthError> {
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html; charset=utf-8\r\n\
Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}

fn escape_html(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' => output.push_str("&quot;"),
            '\'' => output.push_str("&#39;"),
            _ => output.push(ch),
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    async fn send(port: u16, target: &str) -> String {
        let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        let request = format!("GET {target} HTTP/1.1\r\nHost: localhost:{port}\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    fn port_of(server: &CallbackServer) -> u16 {
        server
            .redirect_uri()
            .trim_start_matches("http://localhost:")
            .trim_end_matches(CALLBACK_PATH)
            .parse()
            .unwrap()
    }

    #[tokio::test]
    async fn redirect_uri_points_at_the_bound_port() {
        let server = CallbackServer::bind().await.unwrap();
        let port = server.listener.local_addr().unwrap().port();
        assert_eq!(
            server.redirect_uri(),
            format!("http://localhost:{port}/callback")
        );
    }

    #[tokio::test]
    async fn returns_the_code_and_skips_other_paths() {
        let server = CallbackServer::bind().await.unwrap();
        let port = port_of(&server);
        let browser = tokio::spawn(async move {
            let favicon = send(port, "/favicon.ico").await;
            let callback = send(port, "/callback?code=abc%2B123&state=x").await;
            (favicon, callback)
        });

        let code = server.wait_for_code(CALLBACK_TIMEOUT).await.unwrap();
        assert_eq!(code, "abc+123");

        let (favicon, callback) = browser.await.unwrap();
        assert!(favicon.starts_with("HTTP/1.1 404"));
        assert!(callback.starts_with("HTTP/1.1 200 OK"));
        assert!(callback.contains("Authentication Successful!"));
    }

    #[tokio::test]
    async fn provider_error_is_escaped_in_the_page() {
        let server = CallbackServer::bind().await.unwrap();
        let port = port_of(&server);
        let browser = tokio::spawn(async move {
            send(
                port,
                "/callback?error=access_denied&error_description=%3Cscript%3Ealert(1)%3C%2Fscript%3E",
            )
            .await
        });

        let err = server.wait_for_code(CALLBACK_TIMEOUT).await.unwrap_err();
        assert!(
            matches!(&err, AuthError::AuthorizationFailed(message) if message == "<script>alert(1)</script>"),
            "unexpected error: {err:?}"
        );

        let page = browser.await.unwrap();
        assert!(page.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(!page.contains("<script>"));
    }

    #[test]
    fn error_falls_back_to_error_code_then_default() {
        assert_eq!(
            parse_callback("/callback?error=access_denied"),
            Some(Err("access_denied".to_string()))
        );
        assert_eq!(
            parse_callback("/callback"),
            Some(Err("no authorization code received".to_string()))
        );
        assert_eq!(parse_callback("/other?code=abc"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_the_timeout() {
        let server = CallbackServer::bind().await.unwrap();
        let err = server.wait_for_code(CALLBACK_TIMEOUT).await.unwrap_err();
        assert!(matches!(err, AuthError::AuthorizationTimeout { minutes: 5 }));
        assert_eq!(
            err.to_string(),
            "authorization timed out after 5 minutes"
        );
    }
}
