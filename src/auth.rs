use anyhow::{Context, Result};
use keyring::Entry;
use std::io::{BufRead, Write};
use tracing::{debug, warn};

const APP_NAME: &str = "mailstash";

#[derive(Clone)]
pub struct Credentials {
    pub address: String,
    pub secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("address", &self.address)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Prints `label` and reads one line, without the trailing newline.
pub fn prompt_line<R: BufRead, W: Write>(input: &mut R, output: &mut W, label: &str) -> Result<String> {
    write!(output, "{}", label).context("Failed to write prompt")?;
    output.flush().context("Failed to flush prompt")?;

    let mut line = String::new();
    let read = input.read_line(&mut line).context("Failed to read input")?;
    if read == 0 {
        anyhow::bail!("input closed before {} was entered", label.trim_end_matches([':', ' ']));
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Asks for the address, then for the secret unless a store is given and
/// already has one for that address.
pub fn prompt_credentials<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    store: Option<&CredentialStore>,
) -> Result<(Credentials, bool)> {
    let address = prompt_line(input, output, "Enter your email address: ")?;

    if let Some(secret) = store.and_then(|s| s.get(&address)) {
        debug!("using remembered secret for {}", address);
        return Ok((Credentials { address, secret }, true));
    }

    let secret = prompt_line(input, output, "Enter your password: ")?;
    Ok((Credentials { address, secret }, false))
}

/// Remembers secrets in the OS keyring, one entry per address.
/// Every failure is logged and treated as "nothing stored".
pub struct CredentialStore {
    service: String,
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self {
            service: APP_NAME.to_string(),
        }
    }
}

impl CredentialStore {
    fn entry(&self, address: &str) -> Option<Entry> {
        Entry::new(&self.service, address)
            .map_err(|e| warn!("Keyring error: {}", e))
            .ok()
    }

    pub fn get(&self, address: &str) -> Option<String> {
        match self.entry(address)?.get_password() {
            Ok(secret) => Some(secret),
            Err(keyring::Error::NoEntry) => None,
            Err(e) => {
                warn!("Keyring error: {}", e);
                None
            }
        }
    }

    pub fn set(&self, credentials: &Credentials) {
        if let Some(entry) = self.entry(&credentials.address) {
            if let Err(e) = entry.set_password(&credentials.secret) {
                warn!("Keyring error: {}", e);
            }
        }
    }

    /// Drops a remembered secret that the server rejected. Failures are only logged.
    pub fn forget(&self, address: &str) -> bool {
        match self.clear(address) {
            Ok(()) => true,
            Err(e) => {
                warn!("could not remove the remembered password for {}: {}", address, e);
                false
            }
        }
    }

    pub fn clear(&self, address: &str) -> Result<()> {
        let entry = Entry::new(&self.service, address)
            .map_err(|e| anyhow::anyhow!("Keyring error: {}", e))?;
        match entry.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(anyhow::anyhow!("Keyring error: {}", e)),
        }
    }
}
