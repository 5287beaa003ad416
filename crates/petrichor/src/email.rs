//! Player email addresses, verification/recovery tokens and outbound mail.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::cache::TtlCache;
use crate::{Error, Result};

pub const MAX_EMAIL_COUNT: usize = 3;

pub const VERIFY_EMAIL_TOKEN_KEY: &str = "ve";
pub const RECOVER_PASSWORD_TOKEN_KEY: &str = "rp";
pub const RECOVER_PASSWORD_SUCCESS_TOKEN_KEY: &str = "rps";
pub const USERNAME_RECOVERY_SUCCESS_TOKEN_KEY: &str = "rus";
pub const USERNAME_TOKEN_KEY: &str = "un";

pub const VERIFY_TTL_S: u64 = 30 * 60;
pub const RECOVER_PASSWORD_TTL_S: u64 = 30 * 60;
pub const RECOVER_PASSWORD_SUCCESS_TTL_S: u64 = 30 * 60;
pub const USERNAME_RECOVERY_SUCCESS_TTL_S: u64 = 5 * 60;
pub const USERNAME_CACHE_TTL_S: u64 = 32 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerEmail {
    pub id: i64,
    pub pid: i64,
    pub address: String,
    #[serde(default)]
    pub verified: bool,
}

pub fn verified(emails: &[PlayerEmail]) -> Vec<PlayerEmail> {
    emails.iter().filter(|e| e.verified).cloned().collect()
}

/// Lowercase hex sha256 of the normalized address, as Gravatar expects.
pub fn gravatar_hash(address: &str) -> String {
    let mut h = Sha256::new();
    h.update(address.trim().to_lowercase().as_bytes());
    h.finalize().iter().map(|b| format!("{b:02x}")).collect()
}

/// A bare address the mail transport can deliver to. Display names and
/// angle brackets are not accepted.
pub fn is_address_valid(address: &str) -> bool {
    address.trim().parse::<Address>().is_ok()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Emails {
    #[serde(default)]
    emails: BTreeMap<i64, PlayerEmail>,
    #[serde(default)]
    last_id: i64,
}

impl Emails {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: i64) -> Option<&PlayerEmail> {
        self.emails.get(&id)
    }

    pub fn list_for(&self, pid: i64) -> Vec<PlayerEmail> {
        self.emails.values().filter(|e| e.pid == pid).cloned().collect()
    }

    pub fn list_verified(&self, pid: i64) -> Vec<PlayerEmail> {
        verified(&self.list_for(pid))
    }

    /// A verified row for `address`, owned by anyone.
    pub fn get_verified_by_address(&self, address: &str) -> Option<&PlayerEmail> {
        let a = address.trim().to_lowercase();
        self.emails
            .values()
            .find(|e| e.verified && e.address.to_lowercase() == a)
    }

    pub fn add(&mut self, pid: i64, address: &str) -> Result<PlayerEmail> {
        let address = address.trim();
        if !is_address_valid(address) {
            return Err(Error::InvalidInput);
        }
        if self.list_for(pid).len() >= MAX_EMAIL_COUNT {
            return Err(Error::TooManyEmails);
        }
        if self.get_verified_by_address(address).is_some() {
            return Err(Error::Conflict);
        }
        self.last_id += 1;
        let e = PlayerEmail {
            id: self.last_id,
            pid,
            address: address.to_string(),
            verified: false,
        };
        self.emails.insert(e.id, e.clone());
        Ok(e)
    }

    fn owned_mut(&mut self, pid: i64, id: i64) -> Result<&mut PlayerEmail> {
        let e = self.emails.get_mut(&id).ok_or(Error::NotFound("email"))?;
        if e.pid != pid {
            return Err(Error::Forbidden);
        }
        Ok(e)
    }

    /// Changing an address drops its verification.
    pub fn edit(&mut self, pid: i64, id: i64, address: &str) -> Result<PlayerEmail> {
        let address = address.trim();
        if !is_address_valid(address) {
            return Err(Error::InvalidInput);
        }
        let current = self.owned_mut(pid, id)?.address.clone();
        if current.eq_ignore_ascii_case(address) {
            return Err(Error::Forbidden);
        }
        if self.get_verified_by_address(address).is_some() {
            return Err(Error::Conflict);
        }
        let e = self.owned_mut(pid, id)?;
        e.address = address.to_string();
        e.verified = false;
        Ok(e.clone())
    }

    pub fn delete(&mut self, pid: i64, id: i64) -> Result<()> {
        self.owned_mut(pid, id)?;
        self.emails.remove(&id);
        Ok(())
    }

    pub fn mark_verified(&mut self, id: i64) -> Result<PlayerEmail> {
        let e = self.emails.get(&id).ok_or(Error::NotFound("email"))?;
        if e.verified {
            return Err(Error::Conflict);
        }
        if self.get_verified_by_address(&e.address).is_some() {
            return Err(Error::Conflict);
        }
        let e = self.emails.get_mut(&id).ok_or(Error::NotFound("email"))?;
        e.verified = true;
        info!(id, pid = e.pid, "email verified");
        Ok(e.clone())
    }
}

/// Short-lived tokens for verification and recovery flows. Kept in the
/// store with their expiry so a link outlives the process that issued it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tokens {
    #[serde(default)]
    verify: TtlCache<i64>,
    #[serde(default)]
    recover_password: TtlCache<i64>,
    #[serde(default)]
    recover_password_success: TtlCache<String>,
    #[serde(default)]
    username_recovery: TtlCache<String>,
    #[serde(default)]
    usernames: TtlCache<String>,
}

fn key(prefix: &str, token: &str) -> String {
    format!("{prefix}:{token}")
}

impl Tokens {
    pub fn new() -> Self {
        Self::default()
    }

    /// New token that verifies email `id` when redeemed.
    pub fn issue_verification(&mut self, id: i64, now: u64) -> anyhow::Result<String> {
        let token = crate::random_b64url(24)?;
        self.verify
            .set(key(VERIFY_EMAIL_TOKEN_KEY, &token), id, VERIFY_TTL_S, now);
        Ok(token)
    }

    pub fn redeem_verification(&mut self, token: &str, now: u64) -> Option<i64> {
        self.verify.take(&key(VERIFY_EMAIL_TOKEN_KEY, token), now)
    }

    pub fn issue_password_recovery(&mut self, pid: i64, now: u64) -> anyhow::Result<String> {
        let token = crate::random_b64url(24)?;
        self.recover_password.set(
            key(RECOVER_PASSWORD_TOKEN_KEY, &token),
            pid,
            RECOVER_PASSWORD_TTL_S,
            now,
        );
        Ok(token)
    }

    pub fn redeem_password_recovery(&mut self, token: &str, now: u64) -> Option<i64> {
        self.recover_password
            .take(&key(RECOVER_PASSWORD_TOKEN_KEY, token), now)
    }

    /// Remembers which address a password recovery was requested for. The
    /// id is handed out whether or not a mail was sent, so it does not
    /// reveal which addresses are registered.
    pub fn issue_password_recovery_success(&mut self, address: &str, now: u64) -> anyhow::Result<String> {
        let id = crate::random_b64url(24)?;
        self.recover_password_success.set(
            key(RECOVER_PASSWORD_SUCCESS_TOKEN_KEY, &id),
            address.to_string(),
            RECOVER_PASSWORD_SUCCESS_TTL_S,
            now,
        );
        Ok(id)
    }

    pub fn password_recovery_success_address(&self, id: &str, now: u64) -> Option<String> {
        self.recover_password_success
            .get(&key(RECOVER_PASSWORD_SUCCESS_TOKEN_KEY, id), now)
    }

    /// Remembers which address a username recovery went to, for the
    /// confirmation page. Returns the lookup id.
    pub fn issue_username_recovery(&mut self, address: &str, now: u64) -> anyhow::Result<String> {
        let id = crate::random_b64url(24)?;
        self.username_recovery.set(
            key(USERNAME_RECOVERY_SUCCESS_TOKEN_KEY, &id),
            address.to_string(),
            USERNAME_RECOVERY_SUCCESS_TTL_S,
            now,
        );
        Ok(id)
    }

    pub fn username_recovery_address(&self, id: &str, now: u64) -> Option<String> {
        self.username_recovery
            .get(&key(USERNAME_RECOVERY_SUCCESS_TOKEN_KEY, id), now)
    }

    pub fn cache_username(&mut self, pid: i64, username: &str, now: u64) {
        self.usernames.set(
            key(USERNAME_TOKEN_KEY, &pid.to_string()),
            username.to_string(),
            USERNAME_CACHE_TTL_S,
            now,
        );
    }

    pub fn cached_username(&self, pid: i64, now: u64) -> Option<String> {
        self.usernames
            .get(&key(USERNAME_TOKEN_KEY, &pid.to_string()), now)
    }

    pub fn purge_expired(&mut self, now: u64) -> usize {
        self.verify.purge_expired(now)
            + self.recover_password.purge_expired(now)
            + self.recover_password_success.purge_expired(now)
            + self.username_recovery.purge_expired(now)
            + self.usernames.purge_expired(now)
    }
}

pub fn verification_link(base_url: &str, token: &str) -> String {
    format!("{}/verify?t={token}", base_url.trim_end_matches('/'))
}

pub fn password_recovery_link(base_url: &str, token: &str) -> String {
    format!("{}/reset/password?t={token}", base_url.trim_end_matches('/'))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

pub fn verification_mail(address: &str, link: &str) -> Mail {
    Mail {
        to: address.to_string(),
        subject: format!("[PetrichorMUD] Verify {address}"),
        body: format!(
            "Welcome to PetrichorMUD! Please visit the link below to verify your email address.\n\n{link}\n"
        ),
    }
}

pub fn username_recovery_mail(address: &str, username: &str) -> Mail {
    Mail {
        to: address.to_string(),
        subject: "[PetrichorMUD] Username Recovery".to_string(),
        body: format!("The username associated with this email is: {username}\n"),
    }
}

pub fn password_recovery_mail(address: &str, link: &str) -> Mail {
    Mail {
        to: address.to_string(),
        subject: "[PetrichorMUD] Password Recovery".to_string(),
        body: format!(
            "Someone asked to reset the password for this account. If that was you, visit the link below within thirty minutes.\n\n{link}\n"
        ),
    }
}

pub const DEFAULT_EMAIL_FROM: &str = "verify@petrichormud.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmailMode {
    #[default]
    Disabled,
    Smtp,
    /// Writes `.eml` files to a local outbox instead of sending.
    File,
}

impl FromStr for EmailMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "disabled" => Ok(EmailMode::Disabled),
            "smtp" => Ok(EmailMode::Smtp),
            "file" => Ok(EmailMode::File),
            other => anyhow::bail!("unknown email mode {other:?}"),
        }
    }
}

#[derive(Clone)]
pub struct SmtpAuth {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for SmtpAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub mode: EmailMode,
    pub from: String,
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_auth: Option<SmtpAuth>,
    pub outbox: PathBuf,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            mode: EmailMode::Disabled,
            from: DEFAULT_EMAIL_FROM.to_string(),
            smtp_host: None,
            smtp_port: DEFAULT_SMTP_PORT,
            smtp_auth: None,
            outbox: std::env::temp_dir().join("petrichor_outbox"),
        }
    }
}

pub enum EmailSender {
    Smtp {
        transport: Arc<AsyncSmtpTransport<Tokio1Executor>>,
        from: String,
    },
    File {
        dir: PathBuf,
        from: String,
    },
    Disabled,
}

impl EmailSender {
    pub fn from_config(cfg: &EmailConfig) -> anyhow::Result<Self> {
        if !is_address_valid(&cfg.from) {
            anyhow::bail!("invalid sender address {:?}", cfg.from);
        }
        let from = cfg.from.trim().to_string();
        match cfg.mode {
            EmailMode::Disabled => Ok(EmailSender::Disabled),
            EmailMode::Smtp => {
                let host = cfg
                    .smtp_host
                    .as_deref()
                    .context("smtp mode needs PETRICHOR_SMTP_HOST")?;
                let mut builder =
                    AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?.port(cfg.smtp_port);
                if let Some(auth) = &cfg.smtp_auth {
                    builder = builder
                        .credentials(Credentials::new(auth.username.clone(), auth.password.clone()));
                }
                Ok(EmailSender::Smtp {
                    transport: Arc::new(builder.build()),
                    from,
                })
            }
            EmailMode::File => Ok(EmailSender::File {
                dir: cfg.outbox.clone(),
                from,
            }),
        }
    }

    fn build(from: &str, mail: &Mail) -> anyhow::Result<Message> {
        Ok(Message::builder()
            .from(from.parse::<Mailbox>()?)
            .to(mail.to.parse::<Mailbox>()?)
            .subject(mail.subject.as_str())
            .body(mail.body.clone())?)
    }

    pub async fn send(&self, mail: &Mail) -> anyhow::Result<()> {
        match self {
            EmailSender::Disabled => anyhow::bail!("email sender disabled"),
            EmailSender::Smtp { transport, from } => {
                let msg = Self::build(from, mail)?;
                transport.send(msg).await.map_err(|e| anyhow::anyhow!(e))?;
                info!(to = %mail.to, subject = %mail.subject, "email sent");
                Ok(())
            }
            EmailSender::File { dir, from } => {
                let msg = Self::build(from, mail)?;
                tokio::fs::create_dir_all(dir)
                    .await
                    .with_context(|| format!("create outbox {dir:?}"))?;
                let name = format!(
                    "{}-{}.eml",
                    chrono::Utc::now().format("%Y%m%dT%H%M%S"),
                    crate::random_b64url(6)?
                );
                let path = dir.join(name);
                tokio::fs::write(&path, msg.formatted())
                    .await
                    .with_context(|| format!("write {path:?}"))?;
                info!(to = %mail.to, path = ?path, "email written to outbox");
                Ok(())
            }
        }
    }

    /// Sends, logging instead of failing. For flows where the user-facing
    /// outcome must not depend on the mail relay.
    pub async fn send_best_effort(&self, mail: &Mail) {
        if let Err(e) = self.send(mail).await {
            warn!(err = ?e, to = %mail.to, "email send failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verified_filter() {
        let es = vec![
            PlayerEmail {
                id: 1,
                pid: 1,
                address: "a@example.com".into(),
                verified: true,
            },
            PlayerEmail {
                id: 2,
                pid: 1,
                address: "b@example.com".into(),
                verified: false,
            },
        ];
        let v = verified(&es);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].id, 1);
    }

    #[test]
    fn test_gravatar_hash() {
        let h = gravatar_hash(" Test@Example.com ");
        assert_eq!(h.len(), 64);
        assert_eq!(h, gravatar_hash("test@example.com"));
        assert!(h.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_address_validity() {
        assert!(is_address_valid("test@example.com"));
        assert!(is_address_valid(" test.name+tag@mail.example.com "));
        assert!(!is_address_valid("@example.com"));
        assert!(!is_address_valid("test@"));
        assert!(!is_address_valid("te st@example.com"));
        assert!(!is_address_valid("a,b@example.com"));
        assert!(!is_address_valid("a\"b@example.com"));
        assert!(!is_address_valid("Test <test@example.com>"));
    }

    #[test]
    fn add_rejects_undeliverable_addresses() {
        let mut emails = Emails::new();
        assert_eq!(emails.add(1, "a,b@example.com"), Err(Error::InvalidInput));
        assert_eq!(emails.add(1, "a\"b@example.com"), Err(Error::InvalidInput));
        let e = emails.add(1, "a@example.com").unwrap();
        assert_eq!(
            emails.edit(1, e.id, "a b@example.com"),
            Err(Error::InvalidInput)
        );
    }

    #[test]
    fn add_limits_and_conflicts() {
        let mut emails = Emails::new();
        for i in 0..MAX_EMAIL_COUNT {
            emails.add(1, &format!("t{i}@example.com")).unwrap();
        }
        assert_eq!(emails.add(1, "t9@example.com"), Err(Error::TooManyEmails));

        let e = emails.add(2, "shared@example.com").unwrap();
        emails.mark_verified(e.id).unwrap();
        assert_eq!(emails.add(3, "Shared@example.com"), Err(Error::Conflict));
        assert_eq!(emails.mark_verified(e.id), Err(Error::Conflict));
    }

    #[test]
    fn verifying_a_taken_address_conflicts() {
        let mut emails = Emails::new();
        let a = emails.add(1, "same@example.com").unwrap();
        let b = emails.add(2, "same@example.com").unwrap();
        emails.mark_verified(a.id).unwrap();
        assert_eq!(emails.mark_verified(b.id), Err(Error::Conflict));
    }

    #[test]
    fn edit_and_delete_require_ownership() {
        let mut emails = Emails::new();
        let e = emails.add(1, "old@example.com").unwrap();
        emails.mark_verified(e.id).unwrap();

        assert_eq!(emails.edit(2, e.id, "new@example.com"), Err(Error::Forbidden));
        assert_eq!(emails.edit(1, e.id, "OLD@example.com"), Err(Error::Forbidden));

        let edited = emails.edit(1, e.id, "new@example.com").unwrap();
        assert_eq!(edited.address, "new@example.com");
        assert!(!edited.verified);

        assert_eq!(emails.delete(2, e.id), Err(Error::Forbidden));
        emails.delete(1, e.id).unwrap();
        assert!(emails.get(e.id).is_none());
        assert_eq!(emails.delete(1, e.id), Err(Error::NotFound("email")));
    }

    #[test]
    fn tokens_are_single_use_and_expire() {
        let mut t = Tokens::new();
        let tok = t.issue_verification(5, 1_000).unwrap();
        assert_eq!(t.redeem_verification(&tok, 1_001), Some(5));
        assert_eq!(t.redeem_verification(&tok, 1_001), None);

        let tok = t.issue_password_recovery(9, 1_000).unwrap();
        assert_eq!(
            t.redeem_password_recovery(&tok, 1_000 + RECOVER_PASSWORD_TTL_S),
            None
        );

        let id = t.issue_username_recovery("a@example.com", 0).unwrap();
        assert_eq!(
            t.username_recovery_address(&id, 299).as_deref(),
            Some("a@example.com")
        );
        assert_eq!(t.username_recovery_address(&id, 300), None);

        let id = t.issue_password_recovery_success("b@example.com", 0).unwrap();
        assert_eq!(
            t.password_recovery_success_address(&id, RECOVER_PASSWORD_SUCCESS_TTL_S - 1)
                .as_deref(),
            Some("b@example.com")
        );
        assert_eq!(
            t.password_recovery_success_address(&id, RECOVER_PASSWORD_SUCCESS_TTL_S),
            None
        );

        t.cache_username(3, "testing", 0);
        assert_eq!(t.cached_username(3, 60).as_deref(), Some("testing"));
        assert_eq!(t.cached_username(3, USERNAME_CACHE_TTL_S), None);
    }

    #[test]
    fn mail_composition() {
        let link = verification_link("https://petrichormud.com/", "abc");
        assert_eq!(link, "https://petrichormud.com/verify?t=abc");
        let m = verification_mail("a@example.com", &link);
        assert_eq!(m.subject, "[PetrichorMUD] Verify a@example.com");
        assert!(m.body.contains(&link));

        assert_eq!(
            password_recovery_link("http://x", "k"),
            "http://x/reset/password?t=k"
        );
        let m = username_recovery_mail("a@example.com", "testing");
        assert_eq!(m.subject, "[PetrichorMUD] Username Recovery");
        assert!(m.body.contains("testing"));
    }

    #[test]
    fn tokens_survive_serialization() {
        let mut t = Tokens::new();
        let tok = t.issue_verification(4, 100).unwrap();
        let raw = serde_json::to_string(&t).unwrap();
        let mut back: Tokens = serde_json::from_str(&raw).unwrap();
        assert_eq!(back.redeem_verification(&tok, 101), Some(4));

        let empty: Tokens = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.cached_username(1, 0), None);
    }

    #[test]
    fn email_mode_parsing() {
        assert_eq!("".parse::<EmailMode>().unwrap(), EmailMode::Disabled);
        assert_eq!(" SMTP ".parse::<EmailMode>().unwrap(), EmailMode::Smtp);
        assert_eq!("file".parse::<EmailMode>().unwrap(), EmailMode::File);
        assert!("pigeon".parse::<EmailMode>().is_err());
    }

    #[test]
    fn smtp_auth_debug_redacts_password() {
        let cfg = EmailConfig {
            smtp_auth: Some(SmtpAuth {
                username: "mailer".into(),
                password: "hunter2".into(),
            }),
            ..EmailConfig::default()
        };
        let s = format!("{cfg:?}");
        assert!(s.contains("mailer"));
        assert!(!s.contains("hunter2"));
        assert!(s.contains("<redacted>"));
    }

    #[test]
    fn sender_from_config() {
        assert!(matches!(
            EmailSender::from_config(&EmailConfig::default()).unwrap(),
            EmailSender::Disabled
        ));
        let smtp_without_host = EmailConfig {
            mode: EmailMode::Smtp,
            ..EmailConfig::default()
        };
        assert!(EmailSender::from_config(&smtp_without_host).is_err());
        let bad_from = EmailConfig {
            mode: EmailMode::File,
            from: "not an address".into(),
            ..EmailConfig::default()
        };
        assert!(EmailSender::from_config(&bad_from).is_err());
        assert!(matches!(
            EmailSender::from_config(&EmailConfig {
                mode: EmailMode::File,
                ..EmailConfig::default()
            })
            .unwrap(),
            EmailSender::File { .. }
        ));
    }

    #[tokio::test]
    async fn file_outbox_writes_message() {
        let dir = std::env::temp_dir().join(format!(
            "petrichor_outbox_test_{}",
            crate::random_b64url(6).unwrap()
        ));
        let sender = EmailSender::File {
            dir: dir.clone(),
            from: "verify@petrichormud.com".into(),
        };
        let mail = verification_mail("player@example.com", "http://x/verify?t=1");
        sender.send(&mail).await.unwrap();

        let mut entries = std::fs::read_dir(&dir).unwrap();
        let path = entries.next().unwrap().unwrap().path();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("player@example.com"));
        assert!(raw.contains("Verify"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn disabled_sender_refuses() {
        let mail = username_recovery_mail("a@example.com", "testing");
        assert!(EmailSender::Disabled.send(&mail).await.is_err());
    }
}
