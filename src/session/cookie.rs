//! `Set-Cookie` directives for the session token.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    Strict,
    #[default]
    Lax,
    None,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        })
    }
}

impl FromStr for SameSite {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(SameSite::Strict),
            "lax" => Ok(SameSite::Lax),
            "none" => Ok(SameSite::None),
            other => Err(format!("unknown SameSite value '{}'", other)),
        }
    }
}

/// When to add the `Secure` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecureCookies {
    /// Only on secure connections.
    #[default]
    Auto,
    Always,
    Never,
}

#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub name: String,
    pub path: String,
    pub same_site: SameSite,
    pub secure: SecureCookies,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            name: "session".to_string(),
            path: "/".to_string(),
            same_site: SameSite::Lax,
            secure: SecureCookies::Auto,
        }
    }
}

/// An outbound cookie directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub path: String,
    pub max_age_secs: u64,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSite,
}

impl Cookie {
    /// Session cookie living for `ttl` (rounded up to whole seconds).
    pub fn session(settings: &CookieSettings, value: impl Into<String>, ttl: Duration, connection_secure: bool) -> Self {
        let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
        Self {
            name: settings.name.clone(),
            value: value.into(),
            path: settings.path.clone(),
            max_age_secs: secs.max(1),
            http_only: true,
            secure: is_secure(settings, connection_secure),
            same_site: settings.same_site,
        }
    }

    /// Directive telling the client to drop the session cookie now.
    pub fn expired(settings: &CookieSettings, connection_secure: bool) -> Self {
        Self {
            name: settings.name.clone(),
            value: String::new(),
            path: settings.path.clone(),
            max_age_secs: 0,
            http_only: true,
            secure: is_secure(settings, connection_secure),
            same_site: settings.same_site,
        }
    }

    pub fn is_expiring(&self) -> bool {
        self.max_age_secs == 0
    }
}

fn is_secure(settings: &CookieSettings, connection_secure: bool) -> bool {
    match settings.secure {
        SecureCookies::Always => true,
        SecureCookies::Never => false,
        // Browsers reject SameSite=None without Secure.
        SecureCookies::Auto => connection_secure || settings.same_site == SameSite::None,
    }
}

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}; Path={}; Max-Age={}", self.name, self.value, self.path, self.max_age_secs)?;
        if self.is_expiring() {
            f.write_str("; Expires=Thu, 01 Jan 1970 00:00:00 GMT")?;
        }
        if self.http_only {
            f.write_str("; HttpOnly")?;
        }
        write!(f, "; SameSite={}", self.same_site)?;
        if self.secure {
            f.write_str("; Secure")?;
        }
        Ok(())
    }
}

/// Value of cookie `name` in a `Cookie` request header.
pub fn find_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key.trim() == name).then(|| value.trim())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_attributes() {
        let settings = CookieSettings::default();
        let cookie = Cookie::session(&settings, "tok", Duration::from_secs(3600), false);
        assert_eq!(
            cookie.to_string(),
            "session=tok; Path=/; Max-Age=3600; HttpOnly; SameSite=Lax"
        );

        let secure = Cookie::session(&settings, "tok", Duration::from_secs(3600), true);
        assert!(secure.to_string().ends_with("; Secure"));
    }

    #[test]
    fn test_sub_second_ttl_rounds_up() {
        let cookie = Cookie::session(&CookieSettings::default(), "t", Duration::from_millis(1), false);
        assert_eq!(cookie.max_age_secs, 1);
    }

    #[test]
    fn test_expired_cookie() {
        let cookie = Cookie::expired(&CookieSettings::default(), false);
        let text = cookie.to_string();
        assert!(text.starts_with("session=; Path=/; Max-Age=0"));
        assert!(text.contains("Expires=Thu, 01 Jan 1970"));
    }

    #[test]
    fn test_secure_policy() {
        let mut settings = CookieSettings::default();
        settings.secure = SecureCookies::Always;
        assert!(Cookie::expired(&settings, false).secure);
        settings.secure = SecureCookies::Never;
        assert!(!Cookie::expired(&settings, true).secure);
        settings.secure = SecureCookies::Auto;
        settings.same_site = SameSite::None;
        assert!(Cookie::expired(&settings, false).secure);
    }

    #[test]
    fn test_find_cookie() {
        assert_eq!(find_cookie("a=1; session=abc; b=2", "session"), Some("abc"));
        assert_eq!(find_cookie("sessionx=1", "session"), None);
        assert_eq!(find_cookie("", "session"), None);
    }

    #[test]
    fn test_same_site_parse() {
        assert_eq!("STRICT".parse::<SameSite>().unwrap(), SameSite::Strict);
        assert!("sideways".parse::<SameSite>().is_err());
    }
}
