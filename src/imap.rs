use crate::auth::Credentials;
use crate::config::MailboxConfig;
use crate::error::{Error, Result};
use crate::models::MessageId;
use async_imap::types::Fetch;
use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::ClientConfig;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};
use tracing::{debug, info, warn};

type ImapSession = async_imap::Session<Compat<TlsStream<TcpStream>>>;

/// The remote side of a sync run.
#[async_trait]
pub trait Mailbox: Send {
    /// Every message in `folder`, in ascending sequence order.
    async fn list_all(&mut self, folder: &str) -> Result<Vec<MessageId>>;

    /// The complete raw message, headers included.
    async fn fetch_raw(&mut self, id: MessageId) -> Result<Vec<u8>>;

    /// Releases the connection. Calling it again does nothing.
    async fn close(&mut self) -> Result<()>;
}

pub struct ImapMailbox {
    session: Option<ImapSession>,
    selected: bool,
}

impl ImapMailbox {
    /// Connects over TLS and logs in. Every failure here is reported as an
    /// authentication error since no session exists yet.
    pub async fn open(config: &MailboxConfig, credentials: &Credentials) -> Result<Self> {
        let addr = format!("{}:{}", config.host, config.port);
        info!("connecting to {}", addr);

        let tcp = TcpStream::connect(&addr)
            .await
            .map_err(|e| Error::Authentication(format!("TCP connect to {} failed: {}", addr, e)))?;

        let tls_config = ClientConfig::builder()
            .with_root_certificates(tokio_rustls::rustls::RootCertStore::from_iter(
                webpki_roots::TLS_SERVER_ROOTS.iter().cloned(),
            ))
            .with_no_client_auth();
        let connector = TlsConnector::from(Arc::new(tls_config));
        let server_name = ServerName::try_from(config.host.clone())
            .map_err(|e| Error::Authentication(format!("invalid server name: {}", e)))?;
        let tls = connector
            .connect(server_name, tcp)
            .await
            .map_err(|e| Error::Authentication(format!("TLS handshake with {} failed: {}", config.host, e)))?;

        let mut client = async_imap::Client::new(tls.compat());
        let _greeting = client
            .read_response()
            .await
            .map_err(|e| Error::Authentication(format!("no server greeting: {}", e)))?;

        let session = client
            .login(&credentials.address, &credentials.secret)
            .await
            .map_err(|(e, _)| Error::Authentication(format!("login failed for {}: {}", credentials.address, e)))?;

        info!("session established for {}", credentials.address);
        Ok(Self {
            session: Some(session),
            selected: false,
        })
    }

    fn session(&mut self) -> Result<&mut ImapSession> {
        self.session
            .as_mut()
            .ok_or_else(|| Error::Protocol("session already closed".to_string()))
    }
}

#[async_trait]
impl Mailbox for ImapMailbox {
    async fn list_all(&mut self, folder: &str) -> Result<Vec<MessageId>> {
        let session = self.session()?;
        let mailbox = session
            .select(folder)
            .await
            .map_err(|e| Error::Protocol(format!("SELECT {} failed: {}", folder, e)))?;
        debug!("{} reports {} messages", folder, mailbox.exists);
        self.selected = true;

        let session = self.session()?;
        let found = session
            .search("ALL")
            .await
            .map_err(|e| Error::Protocol(format!("SEARCH ALL failed: {}", e)))?;

        let mut ids: Vec<MessageId> = found.into_iter().map(MessageId).collect();
        ids.sort();
        Ok(ids)
    }

    async fn fetch_raw(&mut self, id: MessageId) -> Result<Vec<u8>> {
        let session = self.session()?;
        let stream = session
            .fetch(id.to_string(), "RFC822")
            .await
            .map_err(|e| Error::Protocol(format!("FETCH {} failed: {}", id, e)))?;

        let fetches: Vec<Fetch> = stream
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::Protocol(format!("FETCH {} failed: {}", id, e)))?;

        fetches
            .iter()
            .find_map(|f| f.body())
            .map(<[u8]>::to_vec)
            .ok_or_else(|| Error::Protocol(format!("FETCH {} returned no body", id)))
    }

    async fn close(&mut self) -> Result<()> {
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };

        let mut outcome = Ok(());
        if self.selected {
            self.selected = false;
            if let Err(e) = session.close().await {
                warn!("CLOSE failed: {}", e);
                outcome = Err(Error::Protocol(format!("CLOSE failed: {}", e)));
            }
        }
        if let Err(e) = session.logout().await {
            warn!("LOGOUT failed: {}", e);
            if outcome.is_ok() {
                outcome = Err(Error::Protocol(format!("LOGOUT failed: {}", e)));
            }
        }
        info!("session closed");
        outcome
    }
}
