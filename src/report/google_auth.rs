//! First-time authorization for [GoogleCalendar](super::google_calendar::GoogleCalendar).
//! Runs Google's installed-app flow: the user consents in a browser, Google redirects to a
//! loopback listener with a code and the code is exchanged for the token saved as `token.json`.

use std::{path::Path, time::Duration};

use chrono::{TimeDelta, Utc};
use reqwest::{Client, Url};
use serde::Deserialize;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
};
use tracing::{debug, info, warn};

use super::{
    calendar::CalendarError,
    google_calendar::{check_status, http_client, StoredToken, DEFAULT_TOKEN_URI},
};

pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar.readonly";
const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const CONSENT_TIMEOUT: Duration = Duration::from_secs(300);

/// OAuth client of type "Desktop app" as found in `credentials.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub auth_uri: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
}

#[derive(Deserialize)]
struct CredentialsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

#[derive(Debug, Deserialize)]
struct CodeExchangeResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    scope: Option<String>,
}

impl ClientSecrets {
    pub fn parse(content: &str) -> Result<Self, CalendarError> {
        let file: CredentialsFile = serde_json::from_str(content)?;
        file.installed.or(file.web).ok_or_else(|| {
            CalendarError::Authorization("credentials have neither an installed nor a web client".into())
        })
    }

    pub async fn load(path: &Path) -> Result<Self, CalendarError> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Self::parse(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(CalendarError::Authorization(
                format!(
                    "no OAuth client at {}, download it from the Google Cloud console",
                    path.display()
                ),
            )),
            Err(e) => Err(e.into()),
        }
    }

    fn token_uri(&self) -> &str {
        self.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI)
    }

    /// Page where the user grants read access to their calendars.
    pub fn consent_url(&self, redirect_uri: &str, state: &str) -> Result<Url, CalendarError> {
        Url::parse_with_params(
            self.auth_uri.as_deref().unwrap_or(DEFAULT_AUTH_URI),
            [
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("scope", CALENDAR_SCOPE),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("state", state),
            ],
        )
        .map_err(|e| CalendarError::Other(e.to_string()))
    }
}

/// Trades the authorization code for tokens, in the shape Google's client libraries store.
pub async fn exchange_code(
    client: &Client,
    secrets: &ClientSecrets,
    code: &str,
    redirect_uri: &str,
) -> Result<StoredToken, CalendarError> {
    let response = client
        .post(secrets.token_uri())
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", secrets.client_id.as_str()),
            ("client_secret", secrets.client_secret.as_str()),
            ("redirect_uri", redirect_uri),
        ])
        .send()
        .await?;
    let exchanged: CodeExchangeResponse = check_status(response).await?.json().await?;

    let scopes = exchanged
        .scope
        .as_deref()
        .unwrap_or(CALENDAR_SCOPE)
        .split_whitespace()
        .map(|s| serde_json::Value::String(s.to_string()))
        .collect::<Vec<_>>();
    let mut extra = serde_json::Map::new();
    extra.insert("scopes".into(), serde_json::Value::Array(scopes));

    Ok(StoredToken {
        token: Some(exchanged.access_token),
        refresh_token: exchanged.refresh_token,
        token_uri: Some(secrets.token_uri().to_string()),
        client_id: Some(secrets.client_id.clone()),
        client_secret: Some(secrets.client_secret.clone()),
        expiry: exchanged
            .expires_in
            .map(|secs| Utc::now() + TimeDelta::seconds(secs)),
        extra,
    })
}

/// Waits for the browser to come back to the loopback redirect and returns the code it
/// carries. Requests without a code or an error, like a favicon, are answered and ignored.
pub async fn receive_code(listener: &TcpListener, state: &str) -> Result<String, CalendarError> {
    loop {
        let (stream, peer) = listener.accept().await?;
        debug!("Redirect connection from {peer}");
        let (target, mut stream) = read_request_target(stream).await?;

        let url = Url::parse(&format!("http://127.0.0.1{target}"))
            .map_err(|e| CalendarError::Other(e.to_string()))?;
        let param = |name: &str| {
            url.query_pairs()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.into_owned())
        };

        let outcome = match (param("code"), param("error")) {
            (_, Some(error)) => Err(CalendarError::Authorization(error)),
            (Some(_), None) if param("state").as_deref() != Some(state) => Err(
                CalendarError::Authorization("state of the redirect doesn't match".into()),
            ),
            (Some(code), None) => Ok(code),
            (None, None) => {
                respond(&mut stream, "404 Not Found", "").await?;
                continue;
            }
        };

        let body = match &outcome {
            Ok(_) => "dayscribe is authorized, this tab can be closed.",
            Err(_) => "Authorization failed, see the terminal for details.",
        };
        respond(&mut stream, "200 OK", body).await?;
        return outcome;
    }
}

async fn read_request_target(stream: TcpStream) -> Result<(String, TcpStream), CalendarError> {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;
    loop {
        let mut header = String::new();
        if reader.read_line(&mut header).await? == 0 || header.trim().is_empty() {
            break;
        }
    }
    let target = request_line
        .split_whitespace()
        .nth(1)
        .unwrap_or("/")
        .to_string();
    Ok((target, reader.into_inner()))
}

async fn respond(stream: &mut TcpStream, status: &str, body: &str) -> Result<(), CalendarError> {
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}

/// Best effort, the URL is printed as well.
fn open_browser(url: &str) {
    let mut command = if cfg!(target_os = "macos") {
        std::process::Command::new("open")
    } else if cfg!(windows) {
        let mut command = std::process::Command::new("cmd");
        command.args(["/C", "start", ""]);
        command
    } else {
        std::process::Command::new("xdg-open")
    };
    command
        .arg(url)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null());
    if let Err(e) = command.spawn() {
        warn!("Couldn't open a browser {e}");
    }
}

/// Runs the whole flow and writes the resulting token to `token_path`.
pub async fn authorize(credentials_path: &Path, token_path: &Path) -> Result<(), CalendarError> {
    let secrets = ClientSecrets::load(credentials_path).await?;
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let redirect_uri = format!("http://127.0.0.1:{}", listener.local_addr()?.port());
    let state = uuid::Uuid::new_v4().simple().to_string();

    let url = secrets.consent_url(&redirect_uri, &state)?;
    println!("Grant dayscribe read access to your calendar:\n\n{url}\n");
    open_browser(url.as_str());

    let code = tokio::time::timeout(CONSENT_TIMEOUT, receive_code(&listener, &state))
        .await
        .map_err(|_| {
            CalendarError::Authorization(format!("no consent within {CONSENT_TIMEOUT:?}"))
        })??;

    let token = exchange_code(&http_client()?, &secrets, &code, &redirect_uri).await?;
    token.save(token_path).await?;
    info!("Calendar authorized, token saved to {token_path:?}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::Utc;
    use tempfile::tempdir;
    use tokio::{
        io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader},
        net::{TcpListener, TcpStream},
        sync::oneshot,
    };

    use crate::report::{calendar::CalendarError, google_calendar::StoredToken};

    use super::{exchange_code, receive_code, ClientSecrets, CALENDAR_SCOPE};

    const CREDENTIALS: &str = r#"{
        "installed": {
            "client_id": "id.apps.googleusercontent.com",
            "project_id": "dayscribe",
            "auth_uri": "https://accounts.google.com/o/oauth2/auth",
            "token_uri": "https://oauth2.googleapis.com/token",
            "client_secret": "secret",
            "redirect_uris": ["http://localhost"]
        }
    }"#;

    /// Serves a single JSON response and hands the raw request back.
    async fn spawn_token_server(body: &'static str) -> Result<(String, oneshot::Receiver<String>)> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let (sender, receiver) = oneshot::channel();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut reader = BufReader::new(stream);
            let mut request = String::new();
            let mut content_length = 0;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).await.unwrap();
                if let Some(value) = line.to_lowercase().strip_prefix("content-length:") {
                    content_length = value.trim().parse().unwrap();
                }
                request.push_str(&line);
                if line.trim().is_empty() {
                    break;
                }
            }
            let mut request_body = vec![0; content_length];
            reader.read_exact(&mut request_body).await.unwrap();
            request.push_str(&String::from_utf8_lossy(&request_body));

            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            reader.into_inner().write_all(response.as_bytes()).await.unwrap();
            let _ = sender.send(request);
        });
        Ok((format!("http://{addr}/token"), receiver))
    }

    async fn redirect(port: u16, target: &str) -> Result<String> {
        let mut stream = TcpStream::connect(("127.0.0.1", port)).await?;
        stream
            .write_all(format!("GET {target} HTTP/1.1\r\nHost: 127.0.0.1\r\n\r\n").as_bytes())
            .await?;
        let mut response = String::new();
        stream.read_to_string(&mut response).await?;
        Ok(response)
    }

    #[test]
    fn test_consent_url() -> Result<()> {
        let secrets = ClientSecrets::parse(CREDENTIALS)?;

        let url = secrets.consent_url("http://127.0.0.1:8765", "xyz")?;

        assert!(url.as_str().starts_with("https://accounts.google.com/o/oauth2/auth?"));
        let pairs = url.query_pairs().into_owned().collect::<Vec<_>>();
        for expected in [
            ("client_id", "id.apps.googleusercontent.com"),
            ("redirect_uri", "http://127.0.0.1:8765"),
            ("scope", CALENDAR_SCOPE),
            ("access_type", "offline"),
            ("state", "xyz"),
        ] {
            assert!(pairs.contains(&(expected.0.to_string(), expected.1.to_string())));
        }
        Ok(())
    }

    #[test]
    fn test_credentials_without_client() {
        assert!(matches!(
            ClientSecrets::parse(r#"{ "other": {} }"#),
            Err(CalendarError::Authorization(_))
        ));
    }

    #[tokio::test]
    async fn test_receive_code() -> Result<()> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();

        let browser = tokio::spawn(async move {
            let favicon = redirect(port, "/favicon.ico").await?;
            let callback = redirect(port, "/?state=s1&code=4%2F0Ab&scope=x").await?;
            anyhow::Ok((favicon, callback))
        });

        let code = receive_code(&listener, "s1").await?;
        let (favicon, callback) = browser.await??;

        assert_eq!(code, "4/0Ab");
        assert!(favicon.starts_with("HTTP/1.1 404"));
        assert!(callback.starts_with("HTTP/1.1 200 OK"));
        Ok(())
    }

    #[tokio::test]
    async fn test_receive_code_rejects_foreign_state() -> Result<()> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        let browser = tokio::spawn(async move { redirect(port, "/?state=other&code=abc").await });

        let result = receive_code(&listener, "s1").await;
        browser.await??;

        assert!(matches!(result, Err(CalendarError::Authorization(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_receive_code_denied() -> Result<()> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        let browser =
            tokio::spawn(async move { redirect(port, "/?state=s1&error=access_denied").await });

        let result = receive_code(&listener, "s1").await;
        browser.await??;

        assert!(matches!(result, Err(CalendarError::Authorization(e)) if e == "access_denied"));
        Ok(())
    }

    #[tokio::test]
    async fn test_exchange_code_and_save() -> Result<()> {
        let (token_uri, request) = spawn_token_server(
            r#"{"access_token":"ya29.new","expires_in":3599,"refresh_token":"1//r","scope":"https://www.googleapis.com/auth/calendar.readonly","token_type":"Bearer"}"#,
        )
        .await?;
        let secrets = ClientSecrets {
            token_uri: Some(token_uri.clone()),
            ..ClientSecrets::parse(CREDENTIALS)?
        };

        let token = exchange_code(
            &reqwest::Client::new(),
            &secrets,
            "4/0Ab",
            "http://127.0.0.1:8765",
        )
        .await?;

        let request = request.await?;
        assert!(request.starts_with("POST /token"));
        assert!(request.contains("grant_type=authorization_code"));
        assert!(request.contains("code=4%2F0Ab"));
        assert!(request.contains("redirect_uri=http%3A%2F%2F127.0.0.1%3A8765"));

        let dir = tempdir()?;
        let path = dir.path().join("token.json");
        token.save(&path).await?;

        let stored: StoredToken = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        assert_eq!(stored.token.as_deref(), Some("ya29.new"));
        assert_eq!(stored.refresh_token.as_deref(), Some("1//r"));
        assert_eq!(stored.client_secret.as_deref(), Some("secret"));
        assert_eq!(stored.token_uri.as_deref(), Some(token_uri.as_str()));
        assert_eq!(stored.extra["scopes"][0], CALENDAR_SCOPE);
        assert!(stored.is_usable(Utc::now()));
        Ok(())
    }
}
