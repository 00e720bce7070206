use std::borrow::Cow;

use url::form_urlencoded;

pub(super) fn has_header(headers: &[(String, String)], name: &str) -> bool {
    headers.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
}

/// Percent-encode the value of every `key=value` pair in the query string of `url`.
///
/// Keys, value-less pairs and pairs with more than one `=` are left untouched. Values are
/// decoded before being encoded again, so escaping an already escaped URL is a no-op.
pub fn escape_query(url: &str) -> Cow<'_, str> {
    let Some((base, query)) = url.split_once('?') else {
        return Cow::Borrowed(url);
    };

    let mut out = String::with_capacity(url.len() + 8);
    out.push_str(base);
    out.push('?');

    for (idx, pair) in query.split('&').enumerate() {
        if idx > 0 {
            out.push('&');
        }

        let mut parts = pair.split('=');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(key), Some(value), None) => {
                out.push_str(key);
                out.push('=');
                out.extend(form_urlencoded::byte_serialize(form_decode(value).as_bytes()));
            }
            _ => out.push_str(pair),
        }
    }

    Cow::Owned(out)
}

// `+` and well-formed `%XX` sequences are decoded; malformed escapes are kept verbatim.
// The value holds no `&` or `=`, so it parses as a single key.
fn form_decode(value: &str) -> Cow<'_, str> {
    form_urlencoded::parse(value.as_bytes())
        .next()
        .map(|(decoded, _)| decoded)
        .unwrap_or_default()
}
