//! Helpers shared by the platform adapters for reading loosely shaped
//! documents: ordered field fallbacks, text objects, durations and counts.

use regex::Regex;
use serde_json::Value;

use crate::error::{ExtractionError, Result};

type Strategy<'a, T> = Box<dyn Fn(&Value) -> Result<Option<T>> + 'a>;

/// Ordered list of places a field may live in a record.
///
/// Each strategy answers `Ok(None)` when the location is absent or has the
/// wrong shape, so the next one is tried. An `Err` is a real failure and is
/// returned as is.
pub struct FieldChain<'a, T> {
    field: &'static str,
    strategies: Vec<Strategy<'a, T>>,
}

impl<'a, T> FieldChain<'a, T> {
    pub fn new(field: &'static str) -> Self {
        Self {
            field,
            strategies: Vec::new(),
        }
    }

    pub fn or_try(mut self, strategy: impl Fn(&Value) -> Result<Option<T>> + 'a) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    /// Infallible lookup, such as a JSON pointer.
    pub fn or_lookup(self, lookup: impl Fn(&Value) -> Option<T> + 'a) -> Self {
        self.or_try(move |v| Ok(lookup(v)))
    }

    pub fn extract(&self, value: &Value) -> Result<T> {
        for strategy in &self.strategies {
            if let Some(found) = strategy(value)? {
                return Ok(found);
            }
        }
        Err(ExtractionError::parsing(self.field, "no candidate location matched"))
    }

    /// Like [`FieldChain::extract`], but a missing field is `None`.
    pub fn extract_optional(&self, value: &Value) -> Result<Option<T>> {
        match self.extract(value) {
            Ok(found) => Ok(Some(found)),
            Err(ExtractionError::Parsing { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl<'a> FieldChain<'a, String> {
    /// Try each pointer as a text object and keep the first non-empty text.
    pub fn texts(field: &'static str, pointers: &'a [&'a str]) -> Self {
        pointers.iter().fold(Self::new(field), |chain, pointer| {
            chain.or_lookup(move |v| v.pointer(pointer).and_then(text_from_object))
        })
    }

    /// Try each pointer as a plain non-empty string.
    pub fn strings(field: &'static str, pointers: &'a [&'a str]) -> Self {
        pointers.iter().fold(Self::new(field), |chain, pointer| {
            chain.or_lookup(move |v| non_empty_str(v.pointer(pointer)))
        })
    }
}

/// Non-empty string at a location.
pub fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

/// Required string at a JSON pointer.
pub fn required_str(value: &Value, pointer: &str, field: &str) -> Result<String> {
    non_empty_str(value.pointer(pointer))
        .ok_or_else(|| ExtractionError::parsing(field, format!("missing {pointer}")))
}

/// Integer that may be encoded as a JSON number or a numeric string.
pub fn number_at(value: &Value, pointer: &str) -> Option<i64> {
    match value.pointer(pointer)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Text of a `{"simpleText": …}` or `{"runs": [{"text": …}]}` object.
pub fn text_from_object(value: &Value) -> Option<String> {
    if let Some(simple) = value.get("simpleText").and_then(Value::as_str) {
        return Some(simple.to_string()).filter(|s| !s.is_empty());
    }
    if let Some(content) = value.get("content").and_then(Value::as_str) {
        return Some(content.to_string()).filter(|s| !s.is_empty());
    }
    let runs = value.get("runs")?.as_array()?;
    let text: String = runs
        .iter()
        .filter_map(|run| run.get("text").and_then(Value::as_str))
        .collect();
    Some(text).filter(|s| !s.is_empty())
}

/// Absolute URL a navigation endpoint points at.
pub fn url_from_navigation_endpoint(endpoint: &Value) -> Option<String> {
    if let Some(url) = endpoint.pointer("/urlEndpoint/url").and_then(Value::as_str) {
        if let Some(query) = url.strip_prefix("/redirect?") {
            return url::form_urlencoded::parse(query.as_bytes())
                .find(|(k, _)| k == "q")
                .map(|(_, v)| v.into_owned());
        }
        if url.starts_with("http") {
            return Some(url.to_string());
        }
        return None;
    }
    if let Some(browse) = endpoint.get("browseEndpoint") {
        if let Some(base) = browse.get("canonicalBaseUrl").and_then(Value::as_str) {
            return Some(format!("https://www.youtube.com{base}"));
        }
        if let Some(id) = browse.get("browseId").and_then(Value::as_str)
            && id.starts_with("UC")
        {
            return Some(format!("https://www.youtube.com/channel/{id}"));
        }
    }
    if let Some(watch) = endpoint.get("watchEndpoint") {
        let video_id = watch.get("videoId")?.as_str()?;
        let mut url = format!("https://www.youtube.com/watch?v={video_id}");
        if let Some(list) = watch.get("playlistId").and_then(Value::as_str) {
            url.push_str("&list=");
            url.push_str(list);
        }
        if let Some(t) = watch.get("startTimeSeconds").and_then(Value::as_i64) {
            url.push_str(&format!("&t={t}"));
        }
        return Some(url);
    }
    endpoint
        .pointer("/commandMetadata/webCommandMetadata/url")
        .and_then(Value::as_str)
        .filter(|u| u.starts_with('/'))
        .map(|u| format!("https://www.youtube.com{u}"))
}

pub fn replace_http_with_https(url: &str) -> String {
    match url.strip_prefix("http://") {
        Some(rest) => format!("https://{rest}"),
        None => url.to_string(),
    }
}

/// Make protocol-relative and scheme-less thumbnail URLs absolute https.
pub fn fix_thumbnail_url(url: &str) -> String {
    let url = url.strip_prefix("//").unwrap_or(url);
    if url.starts_with("http://") {
        replace_http_with_https(url)
    } else if url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

/// Parse `[[[d:]h:]m:]s`; `.` is accepted as separator when no `:` is present.
pub fn parse_duration_string(input: &str) -> Result<i64> {
    let input = input.trim();
    let parts: Vec<&str> = if input.contains(':') {
        input.split(':').collect()
    } else {
        input.split('.').collect()
    };
    let bad = || ExtractionError::parsing("duration", format!("unknown format {input:?}"));

    let numbers = parts
        .iter()
        .map(|p| p.trim().parse::<i64>().map_err(|_| bad()))
        .collect::<Result<Vec<_>>>()?;

    let (days, hours, minutes, seconds) = match numbers.as_slice() {
        [d, h, m, s] => (*d, *h, *m, *s),
        [h, m, s] => (0, *h, *m, *s),
        [m, s] => (0, 0, *m, *s),
        [s] => (0, 0, 0, *s),
        _ => return Err(bad()),
    };
    days.checked_mul(24)
        .and_then(|h| h.checked_add(hours))
        .and_then(|h| h.checked_mul(60))
        .and_then(|m| m.checked_add(minutes))
        .and_then(|m| m.checked_mul(60))
        .and_then(|s| s.checked_add(seconds))
        .ok_or_else(|| ExtractionError::parsing("duration", format!("out of range {input:?}")))
}

pub fn remove_non_digit_characters(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}

/// Parse counts such as `1.2M subscribers`, `12K` or `1,234 views`.
pub fn mixed_number_word_to_long(input: &str) -> Result<i64> {
    let bad = || ExtractionError::parsing("count", format!("not a number {input:?}"));
    let trimmed = input.trim();
    let number_end = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == ','))
        .unwrap_or(trimmed.len());
    let (number, rest) = trimmed.split_at(number_end);
    if number.is_empty() {
        return Err(bad());
    }

    let multiplier = match rest.trim_start().chars().next() {
        Some('K' | 'k') => 1e3,
        Some('M') => 1e6,
        Some('B') => 1e9,
        _ => 1.0,
    };
    if multiplier == 1.0 {
        return remove_non_digit_characters(number).parse().map_err(|_| bad());
    }
    let value: f64 = number.replace(',', ".").parse().map_err(|_| bad())?;
    Ok((value * multiplier).round() as i64)
}

/// First capture group of `pattern` in `input`.
pub fn match_group1(pattern: &str, input: &str) -> Result<String> {
    let re = Regex::new(pattern)?;
    re.captures(input)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| ExtractionError::parsing(pattern.to_string(), "pattern did not match"))
}

/// Cut the JSON object following `marker` out of an HTML page.
///
/// Braces inside string literals do not count towards nesting.
pub fn extract_json_after(html: &str, marker: &str) -> Result<Value> {
    let not_found = || ExtractionError::parsing(marker.to_string(), "not found in page");
    let start = html.find(marker).ok_or_else(not_found)? + marker.len();
    let rest = &html[start..];
    let open = rest.find('{').ok_or_else(not_found)?;
    let body = &rest[open..];

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in body.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return serde_json::from_str(&body[..=i]).map_err(ExtractionError::from);
                }
            }
            _ => {}
        }
    }
    Err(ExtractionError::parsing(marker.to_string(), "unterminated object"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_chain_falls_through_in_order() {
        let record = json!({
            "ownerText": {"runs": [{"text": "Owner"}]},
            "shortBylineText": {"simpleText": "Short"}
        });
        let chain = FieldChain::texts(
            "uploader name",
            &["/longBylineText", "/ownerText", "/shortBylineText"],
        );
        assert_eq!(chain.extract(&record).unwrap(), "Owner");

        let empty = json!({"longBylineText": {"simpleText": ""}});
        let err = chain.extract(&empty).unwrap_err();
        assert!(matches!(err, ExtractionError::Parsing { ref field, .. } if field == "uploader name"));
        assert_eq!(chain.extract_optional(&empty).unwrap(), None);
    }

    #[test]
    fn test_field_chain_surfaces_real_errors() {
        let chain = FieldChain::<i64>::new("duration")
            .or_try(|v| match v.get("lengthText").and_then(text_from_object) {
                Some(text) => parse_duration_string(&text).map(Some),
                None => Ok(None),
            })
            .or_lookup(|_| Some(0));

        let ok = json!({"lengthText": {"simpleText": "1:02:03"}});
        assert_eq!(chain.extract(&ok).unwrap(), 3723);

        let absent = json!({});
        assert_eq!(chain.extract(&absent).unwrap(), 0);

        let broken = json!({"lengthText": {"simpleText": "soon"}});
        assert!(chain.extract(&broken).is_err());
    }

    #[test]
    fn test_text_from_object() {
        assert_eq!(text_from_object(&json!({"simpleText": "a"})).as_deref(), Some("a"));
        assert_eq!(
            text_from_object(&json!({"runs": [{"text": "a"}, {"text": "b"}]})).as_deref(),
            Some("ab")
        );
        assert_eq!(text_from_object(&json!({"runs": []})), None);
    }

    #[test]
    fn test_navigation_endpoint() {
        let redirect = json!({"urlEndpoint": {"url": "/redirect?event=x&q=https%3A%2F%2Fexample.com%2F"}});
        assert_eq!(
            url_from_navigation_endpoint(&redirect).as_deref(),
            Some("https://example.com/")
        );
        let browse = json!({"browseEndpoint": {"browseId": "UCabc", "canonicalBaseUrl": "/@abc"}});
        assert_eq!(
            url_from_navigation_endpoint(&browse).as_deref(),
            Some("https://www.youtube.com/@abc")
        );
        let watch = json!({"watchEndpoint": {"videoId": "dQw4w9WgXcQ", "playlistId": "PL1"}});
        assert_eq!(
            url_from_navigation_endpoint(&watch).as_deref(),
            Some("https://www.youtube.com/watch?v=dQw4w9WgXcQ&list=PL1")
        );
    }

    #[test]
    fn test_thumbnail_urls() {
        assert_eq!(fix_thumbnail_url("//i.ytimg.com/a.jpg"), "https://i.ytimg.com/a.jpg");
        assert_eq!(fix_thumbnail_url("http://i.ytimg.com/a.jpg"), "https://i.ytimg.com/a.jpg");
        assert_eq!(fix_thumbnail_url("i.ytimg.com/a.jpg"), "https://i.ytimg.com/a.jpg");
    }

    #[test]
    fn test_parse_duration_string() {
        assert_eq!(parse_duration_string("42").unwrap(), 42);
        assert_eq!(parse_duration_string("3:05").unwrap(), 185);
        assert_eq!(parse_duration_string("1.00.00").unwrap(), 3600);
        assert_eq!(parse_duration_string("1:00:00:00").unwrap(), 86400);
        assert!(parse_duration_string("1:2:3:4:5").is_err());
        assert!(matches!(
            parse_duration_string("999999999999999:00:00:00"),
            Err(ExtractionError::Parsing { .. })
        ));
        assert!(parse_duration_string("9223372036854775807:1").is_err());
    }

    #[test]
    fn test_counts() {
        assert_eq!(mixed_number_word_to_long("1,234 views").unwrap(), 1234);
        assert_eq!(mixed_number_word_to_long("1.2M subscribers").unwrap(), 1_200_000);
        assert_eq!(mixed_number_word_to_long("12K").unwrap(), 12_000);
        assert!(mixed_number_word_to_long("No views").is_err());
        assert_eq!(remove_non_digit_characters("$31,133.124"), "31133124");
    }

    #[test]
    fn test_extract_json_after() {
        let html = r#"<script>var ytInitialData = {"a":{"b":"};{"},"c":[1,2]};var x = 1;</script>"#;
        let value = extract_json_after(html, "var ytInitialData = ").unwrap();
        assert_eq!(value["a"]["b"], "};{");
        assert_eq!(value["c"][1], 2);
        assert!(extract_json_after(html, "ytInitialPlayerResponse").is_err());
    }

    #[test]
    fn test_match_group1() {
        let js = r#"foo,client_id:"abc123",bar"#;
        assert_eq!(match_group1(r#"client_id:"([^"]+)""#, js).unwrap(), "abc123");
        assert!(match_group1(r#"secret:"([^"]+)""#, js).is_err());
    }
}
