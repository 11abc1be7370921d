//! Console relay between a terminal user and a remote chat endpoint.
//!
//! Each line the user types is sent as `GET <endpoint>?question=<text>` and
//! the plain-text reply is echoed back. The loop owns no conversation state;
//! the server keeps whatever memory it needs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use smiles_core::config::{ChatConfig, DEFAULT_CHAT_ENDPOINT};

pub const BANNER_TITLE: &str = "Miles of Smiles - Console Chat Client";
pub const PROMPT: &str = "You> ";
pub const EXIT_MESSAGE: &str = "Exiting chat.";
const QUIT_COMMAND: &str = "/quit";

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("invalid chat endpoint `{endpoint}`: {message}")]
    InvalidEndpoint { endpoint: String, message: String },
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatReply {
    pub status: u16,
    pub body: String,
}

impl ChatReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Transcript line for this reply.
    pub fn render(&self) -> String {
        if self.is_success() {
            format!("Assistant> {}", self.body)
        } else {
            format!("Assistant> [HTTP {}] {}", self.status, self.body)
        }
    }
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn ask(&self, question: &str) -> Result<ChatReply, RelayError>;
}

pub struct HttpChatTransport {
    client: Client,
    endpoint: Url,
}

impl HttpChatTransport {
    pub fn new(
        endpoint: &str,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, RelayError> {
        let endpoint = Url::parse(endpoint).map_err(|error| RelayError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            message: error.to_string(),
        })?;
        let client =
            Client::builder().connect_timeout(connect_timeout).timeout(request_timeout).build()?;

        Ok(Self { client, endpoint })
    }

    pub fn from_config(endpoint: &str, config: &ChatConfig) -> Result<Self, RelayError> {
        Self::new(
            endpoint,
            Duration::from_secs(config.connect_timeout_secs),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// Endpoint with `question` appended as a form-encoded query parameter.
    pub fn question_url(&self, question: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("question", question);
        url
    }
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    async fn ask(&self, question: &str) -> Result<ChatReply, RelayError> {
        let url = self.question_url(question);
        debug!(event_name = "chat.request", url = %url, "relaying question");

        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(ChatReply { status, body })
    }
}

/// Positional argument first, then configuration, then the built-in default.
/// Blank values are skipped.
pub fn resolve_endpoint(argument: Option<&str>, config: &ChatConfig) -> String {
    [argument, Some(config.endpoint.as_str())]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|candidate| !candidate.is_empty())
        .unwrap_or(DEFAULT_CHAT_ENDPOINT)
        .to_string()
}

pub async fn write_banner<W>(output: &mut W, endpoint: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let banner = format!(
        "{BANNER_TITLE}\nEndpoint: {endpoint}\nType your message and press Enter.\nCommands: /quit to exit.\n\n"
    );
    output.write_all(banner.as_bytes()).await?;
    output.flush().await
}

fn is_exit(line: &str) -> bool {
    line.is_empty() || line.eq_ignore_ascii_case(QUIT_COMMAND)
}

/// Runs the prompt loop until end of input, an empty line, or `/quit`.
/// Transport failures are printed and the loop keeps going.
/// Returns the number of questions relayed.
pub async fn run_chat_loop<R, W, T>(
    endpoint: &str,
    transport: &T,
    input: R,
    output: &mut W,
) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    T: ChatTransport + ?Sized,
{
    write_banner(output, endpoint).await?;

    let mut lines = input.lines();
    let mut relayed = 0;

    loop {
        output.write_all(PROMPT.as_bytes()).await?;
        output.flush().await?;

        let Some(line) = lines.next_line().await? else {
            output.write_all(format!("\n{EXIT_MESSAGE}\n").as_bytes()).await?;
            break;
        };

        let question = line.trim();
        if is_exit(question) {
            output.write_all(format!("{EXIT_MESSAGE}\n").as_bytes()).await?;
            break;
        }

        let rendered = match transport.ask(question).await {
            Ok(reply) => reply.render(),
            Err(error) => {
                warn!(event_name = "chat.transport_failed", error = %error, "chat request failed");
                format!("Assistant> [Error] {error}")
            }
        };
        relayed += 1;

        output.write_all(rendered.as_bytes()).await?;
        output.write_all(b"\n").await?;
    }

    output.flush().await?;
    Ok(relayed)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    use smiles_core::config::{AppConfig, DEFAULT_CHAT_ENDPOINT};

    use super::{
        resolve_endpoint, run_chat_loop, ChatReply, ChatTransport, HttpChatTransport, RelayError,
    };

    const ENDPOINT: &str = "http://localhost:7001/car-booking/api/car-booking/chat";

    /// Replays canned replies and records the questions it was asked.
    struct ScriptedTransport {
        replies: Mutex<Vec<Result<ChatReply, RelayError>>>,
        questions: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn new(mut replies: Vec<Result<ChatReply, RelayError>>) -> Self {
            replies.reverse();
            Self { replies: Mutex::new(replies), questions: Mutex::new(Vec::new()) }
        }

        fn questions(&self) -> Vec<String> {
            self.questions.lock().expect("questions lock").clone()
        }
    }

    #[async_trait]
    impl ChatTransport for ScriptedTransport {
        async fn ask(&self, question: &str) -> Result<ChatReply, RelayError> {
            self.questions.lock().expect("questions lock").push(question.to_string());
            self.replies
                .lock()
                .expect("replies lock")
                .pop()
                .unwrap_or_else(|| Ok(ChatReply { status: 200, body: String::new() }))
        }
    }

    fn secs(value: u64) -> Duration {
        Duration::from_secs(value)
    }

    fn ok(body: &str) -> Result<ChatReply, RelayError> {
        Ok(ChatReply { status: 200, body: body.to_string() })
    }

    async fn transcript(input: &str, transport: &ScriptedTransport) -> (String, usize) {
        let mut output = Vec::new();
        let relayed = run_chat_loop(ENDPOINT, transport, input.as_bytes(), &mut output)
            .await
            .expect("loop runs");
        (String::from_utf8(output).expect("utf8 transcript"), relayed)
    }

    #[tokio::test]
    async fn prints_banner_and_relays_until_quit() {
        let transport = ScriptedTransport::new(vec![ok("Your booking is BK100.")]);

        let (output, relayed) =
            transcript("  what is my booking?  \n/QUIT\nnever sent\n", &transport).await;

        assert!(output.starts_with(
            "Miles of Smiles - Console Chat Client\nEndpoint: http://localhost:7001/car-booking/api/car-booking/chat\n"
        ));
        assert!(output.contains("Commands: /quit to exit.\n"));
        assert!(output.contains("You> Assistant> Your booking is BK100.\n"));
        assert!(output.ends_with("You> Exiting chat.\n"));
        assert_eq!(relayed, 1);
        assert_eq!(transport.questions(), vec!["what is my booking?"]);
    }

    #[tokio::test]
    async fn empty_line_and_end_of_input_both_exit() {
        let transport = ScriptedTransport::new(Vec::new());
        let (output, relayed) = transcript("   \nhello\n", &transport).await;
        assert!(output.ends_with("You> Exiting chat.\n"));
        assert_eq!(relayed, 0);

        let (output, relayed) = transcript("", &transport).await;
        assert!(output.ends_with("You> \nExiting chat.\n"));
        assert_eq!(relayed, 0);
        assert!(transport.questions().is_empty());
    }

    #[tokio::test]
    async fn non_success_status_and_transport_errors_keep_looping() {
        let transport = ScriptedTransport::new(vec![
            Ok(ChatReply { status: 503, body: "busy".to_string() }),
            Err(RelayError::InvalidEndpoint {
                endpoint: "nowhere".to_string(),
                message: "relative URL without a base".to_string(),
            }),
            ok("done"),
        ]);

        let (output, relayed) = transcript("one\ntwo\nthree\n", &transport).await;

        assert!(output.contains("Assistant> [HTTP 503] busy\n"));
        assert!(output.contains(
            "Assistant> [Error] invalid chat endpoint `nowhere`: relative URL without a base\n"
        ));
        assert!(output.contains("Assistant> done\n"));
        assert!(output.ends_with("You> \nExiting chat.\n"));
        assert_eq!(relayed, 3);
    }

    #[test]
    fn endpoint_precedence_skips_blank_values() {
        let mut config = AppConfig::default().chat;

        assert_eq!(
            resolve_endpoint(Some(" http://argument/chat "), &config),
            "http://argument/chat"
        );
        assert_eq!(resolve_endpoint(Some("   "), &config), DEFAULT_CHAT_ENDPOINT);

        config.endpoint = "http://configured/chat".to_string();
        assert_eq!(resolve_endpoint(None, &config), "http://configured/chat");

        config.endpoint = String::new();
        assert_eq!(resolve_endpoint(None, &config), DEFAULT_CHAT_ENDPOINT);
    }

    #[test]
    fn question_is_form_url_encoded() {
        let transport = HttpChatTransport::new(ENDPOINT, secs(1), secs(1)).expect("valid endpoint");

        let url = transport.question_url("cancel BK100 for Jane & Doe?");

        assert_eq!(
            url.as_str(),
            "http://localhost:7001/car-booking/api/car-booking/chat?question=cancel+BK100+for+Jane+%26+Doe%3F"
        );
    }

    #[test]
    fn rejects_unparseable_endpoints() {
        let error =
            HttpChatTransport::new("not a url", secs(1), secs(1)).err().expect("invalid endpoint");

        assert!(matches!(
            error,
            RelayError::InvalidEndpoint { ref endpoint, .. } if endpoint == "not a url"
        ));
    }

    /// Serves one canned HTTP response and returns the request line it saw.
    async fn one_shot_server(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let address = listener.local_addr().expect("local addr");

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let mut request = Vec::new();
            let mut buffer = [0u8; 1024];
            while !request.windows(4).any(|window| window == b"\r\n\r\n") {
                let read = socket.read(&mut buffer).await.expect("read request");
                if read == 0 {
                    break;
                }
                request.extend_from_slice(&buffer[..read]);
            }

            let response = format!(
                "{status_line}\r\ncontent-type: text/plain\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.expect("write response");
            socket.shutdown().await.ok();

            String::from_utf8_lossy(&request).lines().next().unwrap_or_default().to_string()
        });

        (format!("http://{address}/car-booking/api/car-booking/chat"), handle)
    }

    #[tokio::test]
    async fn http_transport_sends_get_with_question_parameter() {
        let (endpoint, server) =
            one_shot_server("HTTP/1.1 200 OK", "Booking BK100 canceled.").await;
        let transport = HttpChatTransport::new(&endpoint, secs(5), secs(5)).expect("transport");

        let reply = transport.ask("cancel BK100").await.expect("reply");

        assert_eq!(reply, ChatReply { status: 200, body: "Booking BK100 canceled.".to_string() });
        let request_line = server.await.expect("server task");
        assert_eq!(
            request_line,
            "GET /car-booking/api/car-booking/chat?question=cancel+BK100 HTTP/1.1"
        );
    }

    #[tokio::test]
    async fn http_transport_reports_non_success_status() {
        let (endpoint, server) =
            one_shot_server("HTTP/1.1 500 Internal Server Error", "model offline").await;
        let transport = HttpChatTransport::new(&endpoint, secs(5), secs(5)).expect("transport");

        let reply = transport.ask("hello").await.expect("reply");

        assert_eq!(reply.render(), "Assistant> [HTTP 500] model offline");
        server.await.expect("server task");
    }

    #[tokio::test]
    async fn http_transport_surfaces_connection_failures() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let address = listener.local_addr().expect("local addr");
        drop(listener);

        let transport = HttpChatTransport::new(&format!("http://{address}/chat"), secs(2), secs(2))
            .expect("transport");

        let error = transport.ask("hello").await.expect_err("nothing is listening");
        assert!(matches!(error, RelayError::Transport(_)));
    }
}
