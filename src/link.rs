use reqwest::header::{HeaderMap, LINK};
use url::Url;

/// Target of the `rel="next"` entry of an RFC 5988 `Link` header.
///
/// Relative targets are resolved against `base`, the URL that answered.
pub(crate) fn next_link(headers: &HeaderMap, base: &Url) -> Option<Url> {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(split_links)
        .find_map(|entry| {
            let (target, params) = parse_entry(entry)?;
            if !has_next_rel(params) {
                return None;
            }
            base.join(target).ok()
        })
}

/// Splits a header value on the commas that separate link entries.
fn split_links(value: &str) -> Vec<&str> {
    let mut entries = Vec::new();
    let mut in_target = false;
    let mut in_quotes = false;
    let mut start = 0;
    for (index, ch) in value.char_indices() {
        match ch {
            '<' if !in_quotes => in_target = true,
            '>' if !in_quotes => in_target = false,
            '"' if !in_target => in_quotes = !in_quotes,
            ',' if !in_target && !in_quotes => {
                entries.push(&value[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    entries.push(&value[start..]);
    entries
}

fn parse_entry(entry: &str) -> Option<(&str, &str)> {
    let entry = entry.trim();
    let rest = entry.strip_prefix('<')?;
    let end = rest.find('>')?;
    Some((rest[..end].trim(), &rest[end + 1..]))
}

fn has_next_rel(params: &str) -> bool {
    params.split(';').any(|param| {
        let Some((name, value)) = param.split_once('=') else {
            return false;
        };
        name.trim().eq_ignore_ascii_case("rel")
            && value
                .trim()
                .trim_matches('"')
                .split_ascii_whitespace()
                .any(|rel| rel.eq_ignore_ascii_case("next"))
    })
}

#[cfg(test)]
mod tests {
    use reqwest::header::{HeaderMap, HeaderValue, LINK};
    use url::Url;

    use super::next_link;

    fn base() -> Url {
        Url::parse("https://api.ciscospark.com/v1/rooms?max=2").expect("static url")
    }

    fn headers(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(LINK, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn finds_next_among_other_relations() {
        let headers = headers(
            r#"<https://api.ciscospark.com/v1/rooms?cursor=a,b>; rel="prev", <https://api.ciscospark.com/v1/rooms?cursor=Y3Vy>; rel="next""#,
        );
        assert_eq!(
            next_link(&headers, &base()).map(String::from),
            Some("https://api.ciscospark.com/v1/rooms?cursor=Y3Vy".to_owned())
        );
    }

    #[test]
    fn accepts_bare_and_multi_value_rel() {
        let bare = headers("<https://api.ciscospark.com/v1/rooms?page=2>; rel=next");
        assert!(next_link(&bare, &base()).is_some());

        let multi = headers(r#"<https://api.ciscospark.com/v1/rooms?page=2>; rel="last next""#);
        assert!(next_link(&multi, &base()).is_some());
    }

    #[test]
    fn resolves_relative_targets() {
        let headers = headers(r#"</v1/rooms?cursor=2>; rel="next""#);
        assert_eq!(
            next_link(&headers, &base()).map(String::from),
            Some("https://api.ciscospark.com/v1/rooms?cursor=2".to_owned())
        );
    }

    #[test]
    fn none_without_next() {
        assert!(next_link(&HeaderMap::new(), &base()).is_none());
        let first = headers(r#"<https://api.ciscospark.com/v1/rooms>; rel="first""#);
        assert!(next_link(&first, &base()).is_none());
    }
}
