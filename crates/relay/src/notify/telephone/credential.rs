use chrono::{DateTime, Duration, Utc};
use std::fmt;

use super::client::TokenGrant;

/// Tokens are refreshed after this age no matter what the provider says
/// about their expiry. Provider tokens live 48 hours.
pub const STALE_AFTER_HOURS: i64 = 47;

pub fn stale_after() -> Duration {
    Duration::hours(STALE_AFTER_HOURS)
}

/// Provider bearer credential. Empty until the first acquisition.
#[derive(Clone, Default)]
pub struct Credential {
    pub(super) access_token: String,
    pub(super) refresh_token: String,
    pub(super) issued_at: Option<DateTime<Utc>>,
    pub(super) expires_in_secs: i64,
}

impl Credential {
    pub fn from_grant(grant: TokenGrant, now: DateTime<Utc>) -> Self {
        let mut credential = Self::default();
        credential.renew(grant, now);
        credential
    }

    pub fn renew(&mut self, grant: TokenGrant, now: DateTime<Utc>) {
        self.access_token = grant.access_token;
        self.refresh_token = grant.refresh_token;
        self.expires_in_secs = grant.expires_in_secs;
        self.issued_at = Some(now);
    }

    pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        if self.access_token.is_empty() {
            return true;
        }
        self.issued_at
            .map_or(true, |issued_at| now - issued_at >= stale_after())
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.issued_at
    }

    pub fn expires_in_secs(&self) -> i64 {
        self.expires_in_secs
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("acquired", &!self.access_token.is_empty())
            .field("issued_at", &self.issued_at)
            .field("expires_in_secs", &self.expires_in_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn grant(token: &str) -> TokenGrant {
        TokenGrant {
            access_token: token.to_string(),
            refresh_token: format!("{}-refresh", token),
            expires_in_secs: 172_800,
        }
    }

    #[test]
    fn test_empty_credential_is_stale() {
        assert!(Credential::default().is_stale_at(Utc::now()));
    }

    #[test]
    fn test_staleness_threshold() {
        let issued = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let credential = Credential::from_grant(grant("a"), issued);

        assert!(!credential.is_stale_at(issued));
        assert!(!credential.is_stale_at(issued + Duration::hours(47) - Duration::seconds(1)));
        assert!(credential.is_stale_at(issued + Duration::hours(47)));
        assert!(credential.is_stale_at(issued + Duration::hours(48)));
    }

    #[test]
    fn test_staleness_ignores_provider_expiry() {
        let issued = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let mut g = grant("a");
        g.expires_in_secs = 60;
        let credential = Credential::from_grant(g, issued);
        assert!(!credential.is_stale_at(issued + Duration::hours(1)));
    }

    #[test]
    fn test_renew_replaces_everything() {
        let issued = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let mut credential = Credential::from_grant(grant("a"), issued);
        let later = issued + Duration::hours(48);
        credential.renew(grant("b"), later);

        assert_eq!(credential.access_token(), "b");
        assert_eq!(credential.refresh_token(), "b-refresh");
        assert_eq!(credential.issued_at(), Some(later));
        assert_eq!(credential.expires_in_secs(), 172_800);
        assert!(!credential.is_stale_at(later));
    }

    #[test]
    fn test_debug_hides_tokens() {
        let credential = Credential::from_grant(grant("secret-token"), Utc::now());
        assert!(!format!("{:?}", credential).contains("secret-token"));
    }
}
