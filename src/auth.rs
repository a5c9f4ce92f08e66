use secrecy::SecretString;
use tokio::sync::watch;

pub trait TokenSource: Send + Sync {
    fn token(&self) -> Option<SecretString>;
}

/// Fixed token, mostly for the CLI and tests.
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    pub fn none() -> Self {
        Self(None)
    }
}

impl TokenSource for StaticToken {
    fn token(&self) -> Option<SecretString> {
        self.0
            .clone()
            .filter(|token| !token.is_empty())
            .map(SecretString::from)
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("StaticToken")
            .field(&self.0.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Login state published through a watch channel.
#[derive(Clone)]
pub struct SessionToken {
    tx: watch::Sender<Option<String>>,
}

impl SessionToken {
    pub fn new(token: Option<String>) -> Self {
        let (tx, _rx) = watch::channel(token);
        Self { tx }
    }

    pub fn sign_in(&self, token: impl Into<String>) {
        self.tx.send_replace(Some(token.into()));
    }

    pub fn sign_out(&self) {
        self.tx.send_replace(None);
    }

    pub fn is_signed_in(&self) -> bool {
        self.tx.borrow().is_some()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.tx.subscribe()
    }
}

impl Default for SessionToken {
    fn default() -> Self {
        Self::new(None)
    }
}

impl TokenSource for SessionToken {
    fn token(&self) -> Option<SecretString> {
        self.tx
            .borrow()
            .as_deref()
            .filter(|token| !token.is_empty())
            .map(|token| SecretString::from(token.to_string()))
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionToken")
            .field("signed_in", &self.is_signed_in())
            .finish()
    }
}
