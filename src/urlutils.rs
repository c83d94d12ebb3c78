//! URL grammars used by installation sources: NFS and harddrive
//! specifiers, proxy strings with credential encoding, and protocol
//! splitting.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use regex::Regex;

/// Schemes a proxy may use.
const PROXY_SCHEMES: &[&str] = &["http", "https", "ftp"];
/// Default squid port, appended when the proxy string omits one.
pub const DEFAULT_PROXY_PORT: u16 = 3128;

/// Split a leading `scheme://` off a URL.  Returns
/// `(protocol_with_separator, remainder)`; the protocol part is empty
/// when the URL has none.  More than one `://` is an error.
pub fn split_protocol(url: &str) -> Result<(&str, &str)> {
    if url.matches("://").count() > 1 {
        bail!("URL has multiple protocol separators: {url}");
    }
    match url.find("://") {
        Some(idx) => Ok((&url[..idx + 3], &url[idx + 3..])),
        None => Ok(("", url)),
    }
}

/// Parse an NFS URL of the form `nfs:[<options>:]<host>[:<path>]` or
/// `nfs://<host>[/<path>]`.  Missing parts come back as empty strings.
pub fn parse_nfs_url(url: &str) -> (String, String, String) {
    if let Some(rest) = url.strip_prefix("nfs://") {
        let (host, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, ""),
        };
        return (String::new(), host.to_string(), path.to_string());
    }
    let rest = url.strip_prefix("nfs:").unwrap_or(url);
    let parts: Vec<&str> = rest.splitn(3, ':').collect();
    match parts.as_slice() {
        [options, host, path] => (options.to_string(), host.to_string(), path.to_string()),
        [host, path] => (String::new(), host.to_string(), path.to_string()),
        [host] => (String::new(), host.to_string(), String::new()),
        _ => (String::new(), String::new(), String::new()),
    }
}

/// Compose an NFS URL.  With options present the path slot is always
/// emitted so the result parses back unambiguously.
pub fn create_nfs_url(host: &str, path: &str, options: &str) -> Result<String> {
    if host.is_empty() {
        bail!("NFS URL requires a host");
    }
    if !options.is_empty() {
        Ok(format!("nfs:{options}:{host}:{path}"))
    } else if path.is_empty() {
        Ok(format!("nfs:{host}"))
    } else {
        Ok(format!("nfs:{host}:{path}"))
    }
}

/// Parse `hd:<device>[:<path>]`.  The path keeps its leading `/`.
pub fn parse_hd_url(url: &str) -> (String, String) {
    let rest = url.strip_prefix("hd:").unwrap_or(url);
    match rest.split_once(':') {
        Some((device, path)) => (device.to_string(), path.to_string()),
        None => (rest.to_string(), String::new()),
    }
}

pub fn create_hd_url(device: &str, path: &str) -> Result<String> {
    if device.is_empty() {
        bail!("harddrive URL requires a device");
    }
    if path.is_empty() {
        Ok(format!("hd:{device}"))
    } else {
        Ok(format!("hd:{device}:{path}"))
    }
}

fn percent_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

fn percent_decode(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut idx = 0;
    while idx < bytes.len() {
        if bytes[idx] == b'%'
            && idx + 2 < bytes.len()
            && bytes[idx + 1].is_ascii_hexdigit()
            && bytes[idx + 2].is_ascii_hexdigit()
        {
            if let Ok(byte) = u8::from_str_radix(&value[idx + 1..idx + 3], 16) {
                out.push(byte);
                idx += 3;
                continue;
            }
        }
        out.push(bytes[idx]);
        idx += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

static PROXY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^(?:(?P<scheme>[A-Za-z][A-Za-z0-9+.-]*)://)?",
        r"(?:(?P<user>[^:@/]*)(?::(?P<password>[^@/]*))?@)?",
        r"(?P<host>[^:@/?#]+)",
        r"(?::(?P<port>\d+))?",
        r"(?P<rest>[/?#].*)?$",
    ))
    .unwrap()
});

/// A parsed proxy specifier:
/// `[scheme://][user[:password]@]host[:port]`.
///
/// Credentials are URL-decoded on parse and re-encoded by [`Self::url`];
/// [`Self::noauth_url`] never contains them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyString {
    pub scheme: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub host: String,
    pub port: Option<u16>,
}

impl ProxyString {
    pub fn new(
        scheme: &str,
        host: &str,
        port: Option<u16>,
        user: Option<&str>,
        password: Option<&str>,
    ) -> Result<Self> {
        let this = Self {
            scheme: scheme.to_string(),
            user: user.map(|s| s.to_string()),
            password: password.map(|s| s.to_string()),
            host: host.to_string(),
            port,
        };
        this.check()?;
        Ok(this)
    }

    pub fn parse(input: &str) -> Result<Self> {
        let Some(caps) = PROXY_RE.captures(input) else {
            bail!("malformed proxy string \"{input}\"");
        };
        if let Some(rest) = caps.name("rest") {
            if rest.as_str() != "/" {
                bail!("proxy string \"{input}\" must not carry a path, query or fragment");
            }
        }
        let scheme = caps
            .name("scheme")
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| "http".to_string());
        let port = match caps.name("port") {
            Some(m) => Some(m.as_str().parse::<u16>()?),
            None => None,
        };
        let this = Self {
            scheme,
            user: caps.name("user").map(|m| percent_decode(m.as_str())),
            password: caps.name("password").map(|m| percent_decode(m.as_str())),
            host: caps.name("host").map(|m| m.as_str().to_string()).unwrap_or_default(),
            port,
        };
        this.check()?;
        Ok(this)
    }

    fn check(&self) -> Result<()> {
        if !PROXY_SCHEMES.contains(&self.scheme.as_str()) {
            bail!("unsupported proxy scheme \"{}\"", self.scheme);
        }
        if self.host.is_empty() {
            bail!("proxy string requires a host");
        }
        Ok(())
    }

    /// Fail when credentials are present but the caller's context
    /// forbids authenticated proxies.
    pub fn require_no_auth(&self) -> Result<()> {
        if self.user.is_some() || self.password.is_some() {
            bail!("proxy authentication is not allowed here");
        }
        Ok(())
    }

    fn port_or_default(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PROXY_PORT)
    }

    /// The full proxy URL, credentials included (percent-encoded).
    pub fn url(&self) -> String {
        let mut out = format!("{}://", self.scheme);
        if let Some(user) = &self.user {
            out.push_str(&percent_encode(user));
            if let Some(password) = &self.password {
                out.push(':');
                out.push_str(&percent_encode(password));
            }
            out.push('@');
        }
        out.push_str(&self.host);
        out.push(':');
        out.push_str(&self.port_or_default().to_string());
        out
    }

    /// The proxy URL with credentials omitted.
    pub fn noauth_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_protocol() {
        assert_eq!(
            split_protocol("http://example.com/tree").unwrap(),
            ("http://", "example.com/tree")
        );
        assert_eq!(split_protocol("/srv/tree").unwrap(), ("", "/srv/tree"));
        assert!(split_protocol("http://a://b").is_err());
    }

    #[test]
    fn test_nfs_parse_forms() {
        assert_eq!(
            parse_nfs_url("nfs:ro,nolock:server:/export"),
            ("ro,nolock".into(), "server".into(), "/export".into())
        );
        assert_eq!(
            parse_nfs_url("nfs:server:/export"),
            ("".into(), "server".into(), "/export".into())
        );
        assert_eq!(
            parse_nfs_url("nfs:server"),
            ("".into(), "server".into(), "".into())
        );
        assert_eq!(
            parse_nfs_url("nfs://server/export"),
            ("".into(), "server".into(), "/export".into())
        );
        assert_eq!(
            parse_nfs_url("nfs://server"),
            ("".into(), "server".into(), "".into())
        );
    }

    #[test]
    fn test_nfs_round_trip() {
        for (options, host, path) in [
            ("", "server", ""),
            ("", "server", "/export"),
            ("ro", "server", "/export"),
            ("ro,vers=4", "server", ""),
        ] {
            let url = create_nfs_url(host, path, options).unwrap();
            assert_eq!(
                parse_nfs_url(&url),
                (options.to_string(), host.to_string(), path.to_string()),
                "{url}"
            );
        }
        assert!(create_nfs_url("", "/export", "").is_err());
    }

    #[test]
    fn test_hd_round_trip() {
        for (device, path) in [("sda1", ""), ("sda1", "/isos"), ("disk/by-label/X", "/d")] {
            let url = create_hd_url(device, path).unwrap();
            assert_eq!(parse_hd_url(&url), (device.to_string(), path.to_string()));
        }
        assert!(create_hd_url("", "/isos").is_err());
    }

    #[test]
    fn test_proxy_parse_basic() {
        let proxy = ProxyString::parse("http://u:p@pr.example/").unwrap();
        assert_eq!(proxy.scheme, "http");
        assert_eq!(proxy.user.as_deref(), Some("u"));
        assert_eq!(proxy.password.as_deref(), Some("p"));
        assert_eq!(proxy.host, "pr.example");
        assert_eq!(proxy.port, None);
        assert_eq!(proxy.url(), "http://u:p@pr.example:3128");
        assert_eq!(proxy.noauth_url(), "http://pr.example:3128");
    }

    #[test]
    fn test_proxy_defaults_scheme() {
        let proxy = ProxyString::parse("squid.example:8080").unwrap();
        assert_eq!(proxy.scheme, "http");
        assert_eq!(proxy.port, Some(8080));
        assert_eq!(proxy.url(), "http://squid.example:8080");
    }

    #[test]
    fn test_proxy_rejections() {
        assert!(ProxyString::parse("gopher://h").is_err());
        assert!(ProxyString::parse("http://h/path/deep").is_err());
        assert!(ProxyString::parse("http://h/?q=1").is_err());
        let with_auth = ProxyString::parse("http://u@h").unwrap();
        assert!(with_auth.require_no_auth().is_err());
        assert!(ProxyString::parse("http://h:80").unwrap().require_no_auth().is_ok());
    }

    #[test]
    fn test_proxy_round_trip_with_reserved_chars() {
        let proxy = ProxyString::new("https", "pr.example", Some(8080), Some("a@b"), Some("p:w%"))
            .unwrap();
        let reparsed = ProxyString::parse(&proxy.url()).unwrap();
        assert_eq!(reparsed, proxy);
        let noauth = proxy.noauth_url();
        assert!(!noauth.contains('@'));
        assert!(!noauth.contains("a%40b"));
        assert_eq!(noauth, "https://pr.example:8080");
    }
}
