use devmatch_core::error::{BoxError, ErrorContext as _};
use devmatch_data::{BackendKind, FormatVersion};
use serde::Serialize;
use std::io::Write as _;

/// Write `value` as one json line to stdout.
pub fn write_json(value: &impl Serialize, pretty: bool) -> Result<(), BoxError> {
    let mut out = std::io::stdout().lock();
    if pretty {
        serde_json::to_writer_pretty(&mut out, value).context("write json to stdout")?;
    } else {
        serde_json::to_writer(&mut out, value).context("write json to stdout")?;
    }
    writeln!(out).context("write newline to stdout")?;
    Ok(())
}

/// Parse a `Name: value` header argument.
pub fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("header {raw:?} is not of the form `Name: value`"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("header {raw:?} has no name"));
    }
    Ok((name.to_owned(), value.trim().to_owned()))
}

pub fn parse_backend(raw: &str) -> Result<BackendKind, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "memory" => Ok(BackendKind::Memory),
        "stream" => Ok(BackendKind::Stream),
        other => Err(format!("unknown backend {other:?}, expected memory or stream")),
    }
}

pub fn parse_format(raw: &str) -> Result<FormatVersion, String> {
    raw.parse::<FormatVersion>().map_err(|_ignored| {
        format!("unknown format {raw:?}, expected v31, v32, triev30 or triev32")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_arguments() {
        assert_eq!(
            parse_header("User-Agent: Mozilla/5.0 (Linux; Android 14)").unwrap(),
            ("User-Agent".to_owned(), "Mozilla/5.0 (Linux; Android 14)".to_owned())
        );
        assert_eq!(
            parse_header("Device-Stock-UA:").unwrap(),
            ("Device-Stock-UA".to_owned(), String::new())
        );
        assert!(parse_header("User-Agent").is_err());
        assert!(parse_header(": value").is_err());
    }

    #[test]
    fn backend_and_format_arguments() {
        assert_eq!(parse_backend("Stream"), Ok(BackendKind::Stream));
        assert!(parse_backend("disk").is_err());
        assert_eq!(parse_format("v31"), Ok(FormatVersion::PatternV31));
        assert_eq!(parse_format("TrieV3.2"), Ok(FormatVersion::TrieV32));
        assert!(parse_format("v4").is_err());
    }
}
