use crate::{
    error::{FixtureError, FixtureResult},
    pixel::{self, PixelBuffer},
};

/// Largest accepted image dimension (inclusive).
pub const MAX_DIMENSION: u32 = 1 << 16;

/// Longest accepted capture path segment, excluding the leading slash.
pub const MAX_PATH_LEN: usize = 32;

/// One inbound pixel-transfer exchange, parsed but not yet validated.
///
/// Lives only for the duration of one HTTP request; [`decode`](Self::decode)
/// either converts it into a [`PixelBuffer`] or rejects it.
#[derive(Clone, Debug)]
pub struct CaptureRequest {
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CaptureRequest {
    /// Splits a request URL (`/path?width=2&height=2`) into path and query
    /// pairs. No percent-decoding: the renderer's bootstrap program emits
    /// plain ASCII URLs.
    pub fn from_url(url: &str, body: Vec<u8>) -> Self {
        let (path, query_str) = match url.split_once('?') {
            Some((p, q)) => (p, q),
            None => (url, ""),
        };
        let query = query_str
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((k, v)) => (k.to_string(), v.to_string()),
                None => (pair.to_string(), String::new()),
            })
            .collect();
        Self {
            path: path.to_string(),
            query,
            body,
        }
    }

    fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Runs the full validation chain in order: path, width, height, body
    /// length. First failure wins. Returns the declared dimensions.
    pub fn validate(&self) -> FixtureResult<(u32, u32)> {
        check_path(&self.path)?;

        let width = parse_dimension(self.query_value("width"), "width")
            .map_err(FixtureError::invalid_width)?;
        let height = parse_dimension(self.query_value("height"), "height")
            .map_err(FixtureError::invalid_height)?;

        let expected = u64::from(width) * u64::from(height) * 4;
        if self.body.len() as u64 != expected {
            return Err(FixtureError::InvalidBody {
                expected,
                actual: self.body.len() as u64,
            });
        }

        Ok((width, height))
    }

    /// Validates the request and decodes the body into an RGBA buffer.
    pub fn decode(&self) -> FixtureResult<PixelBuffer> {
        let (width, height) = self.validate()?;
        pixel::decode_argb(&self.body, width, height)
    }
}

/// The capture path must be a single lowercase ASCII segment of 1–32
/// characters: `/[a-z]{1,32}`, anchored.
fn check_path(path: &str) -> FixtureResult<()> {
    let Some(segment) = path.strip_prefix('/') else {
        return Err(FixtureError::invalid_path(format!(
            "'{path}' does not start with '/'"
        )));
    };
    if segment.is_empty() || segment.len() > MAX_PATH_LEN {
        return Err(FixtureError::invalid_path(format!(
            "'{path}' segment length must be 1..={MAX_PATH_LEN}"
        )));
    }
    if !segment.bytes().all(|b| b.is_ascii_lowercase()) {
        return Err(FixtureError::invalid_path(format!(
            "'{path}' must be a single lowercase ascii segment"
        )));
    }
    Ok(())
}

/// Declared dimensions must be plain integers in `(0, 65536]`.
fn parse_dimension(value: Option<&str>, name: &str) -> Result<u32, String> {
    let Some(raw) = value else {
        return Err(format!("missing {name} parameter"));
    };
    let parsed: u32 = raw
        .parse()
        .map_err(|_| format!("{name} '{raw}' is not an integer"))?;
    if parsed == 0 || parsed > MAX_DIMENSION {
        return Err(format!("{name} {parsed} out of range (0, {MAX_DIMENSION}]"));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(url: &str, body_len: usize) -> CaptureRequest {
        CaptureRequest::from_url(url, vec![0u8; body_len])
    }

    #[test]
    fn accepts_minimal_and_maximal_paths() {
        req("/a?width=1&height=1", 4).validate().unwrap();
        let long = format!("/{}?width=1&height=1", "a".repeat(32));
        req(&long, 4).validate().unwrap();
    }

    #[test]
    fn rejects_bad_paths() {
        for url in [
            "/?width=1&height=1",
            "/ABC?width=1&height=1",
            "/a/b?width=1&height=1",
        ] {
            let err = req(url, 4).validate().unwrap_err();
            assert!(matches!(err, FixtureError::InvalidPath(_)), "{url}: {err}");
        }

        let too_long = format!("/{}?width=1&height=1", "a".repeat(33));
        let err = req(&too_long, 4).validate().unwrap_err();
        assert!(matches!(err, FixtureError::InvalidPath(_)));
    }

    #[test]
    fn dimension_bounds_are_inclusive_above_zero() {
        req("/ok?width=1&height=1", 4).validate().unwrap();

        // 65536 x 1 is accepted; the body must still match w*h*4.
        let body_len = 65536usize * 4;
        req("/ok?width=65536&height=1", body_len).validate().unwrap();

        for (url, want_width_kind) in [
            ("/ok?width=0&height=1", true),
            ("/ok?width=65537&height=1", true),
            ("/ok?width=3.5&height=1", true),
            ("/ok?width=abc&height=1", true),
            ("/ok?height=1", true),
            ("/ok?width=1&height=0", false),
            ("/ok?width=1&height=65537", false),
            ("/ok?width=1&height=x", false),
            ("/ok?width=1", false),
        ] {
            let err = req(url, 4).validate().unwrap_err();
            if want_width_kind {
                assert!(matches!(err, FixtureError::InvalidWidth(_)), "{url}: {err}");
            } else {
                assert!(matches!(err, FixtureError::InvalidHeight(_)), "{url}: {err}");
            }
        }
    }

    #[test]
    fn rejects_body_length_mismatch() {
        let err = req("/ok?width=2&height=2", 15).validate().unwrap_err();
        assert!(matches!(
            err,
            FixtureError::InvalidBody {
                expected: 16,
                actual: 15
            }
        ));
    }

    #[test]
    fn path_failure_wins_over_later_checks() {
        let err = req("/ABC?width=0&height=0", 0).validate().unwrap_err();
        assert!(matches!(err, FixtureError::InvalidPath(_)));
    }

    #[test]
    fn decode_produces_reordered_buffer() {
        let request = CaptureRequest::from_url(
            "/ok?width=1&height=1",
            vec![0xAA, 0xBB, 0xCC, 0xDD],
        );
        let buf = request.decode().unwrap();
        assert_eq!(buf.data, vec![0xBB, 0xCC, 0xDD, 0xAA]);
    }

    #[test]
    fn url_without_query_parses_to_empty_query() {
        let request = CaptureRequest::from_url("/crossdomain.xml", vec![]);
        assert_eq!(request.path, "/crossdomain.xml");
        assert!(request.query.is_empty());
    }
}
