use crate::config::Settings;
use anyhow::{Context, Result};
use encoding_rs::{Encoding, UTF_8};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, COOKIE};

const USER_AGENT: &str = concat!("carteira/", env!("CARGO_PKG_VERSION"));

pub fn build_client(settings: &Settings) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    if let Some(cookie) = &settings.cookie {
        headers.insert(
            COOKIE,
            HeaderValue::from_str(cookie).context("CARTEIRA_COOKIE is not a valid header value")?,
        );
    }

    reqwest::Client::builder()
        .timeout(settings.http_timeout)
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .build()
        .context("failed to build http client")
}

/// GET `url` and decode the body with the charset the server declares.
pub async fn get_text(http: &reqwest::Client, url: &str) -> Result<String> {
    let res = http
        .get(url)
        .send()
        .await
        .with_context(|| format!("request to {url} failed"))?;

    let status = res.status();
    let charset = res
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(charset_of)
        .map(str::to_string);
    let bytes = res
        .bytes()
        .await
        .with_context(|| format!("failed to read response from {url}"))?;

    let text = decode(&bytes, charset.as_deref());
    if !status.is_success() {
        anyhow::bail!("HTTP {status} from {url}: {}", snippet(&text));
    }
    Ok(text)
}

fn charset_of(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|part| {
        let (k, v) = part.split_once('=')?;
        k.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| v.trim().trim_matches('"'))
    })
}

pub fn decode(bytes: &[u8], charset: Option<&str>) -> String {
    let encoding = charset
        .and_then(|c| Encoding::for_label(c.as_bytes()))
        .unwrap_or(UTF_8);
    let (cow, _, _) = encoding.decode(bytes);
    cow.into_owned()
}

fn snippet(text: &str) -> &str {
    match text.char_indices().nth(200) {
        Some((i, _)) => &text[..i],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_charset_from_content_type() {
        assert_eq!(charset_of("text/html; charset=ISO-8859-1"), Some("ISO-8859-1"));
        assert_eq!(charset_of("text/html;Charset=\"utf-8\""), Some("utf-8"));
        assert_eq!(charset_of("application/json"), None);
    }

    #[test]
    fn decodes_latin1_bodies() {
        let bytes = b"Pre\xe7o M\xe9dio";
        assert_eq!(decode(bytes, Some("iso-8859-1")), "Preço Médio");
        assert_eq!(decode("Preço".as_bytes(), None), "Preço");
    }
}
