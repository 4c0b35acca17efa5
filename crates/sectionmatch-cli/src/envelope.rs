use sectionmatch::core::Error;
use serde::Serialize;

pub(crate) fn warning_hint(code: &'static str) -> Option<&'static str> {
    match code {
        "empty_catalog" => Some(
            "The master document produced no templates. Check that the container selectors point at the annotated tables and that every START comment has a matching END.",
        ),
        "no_target_rows" => Some(
            "No non-empty rows were found in the target containers. Check --main-table/--footer-table.",
        ),
        "group_not_found" => Some(
            "The --group value does not name any catalogued group (names are exact). Run `sectionmatch groups` to list them.",
        ),
        "no_matches_above_cutoff" => Some(
            "No row had a candidate at or above --min-cutoff. Lower the cutoff or try --mode both.",
        ),
        "already_matches" => Some(
            "The row already scores 100 against this template; replacing it would change nothing.",
        ),
        _ => None,
    }
}

pub(crate) fn warning_hints_from(codes: &[&'static str]) -> serde_json::Value {
    let mut m = serde_json::Map::new();
    for c in codes {
        if let Some(h) = warning_hint(c) {
            m.insert((*c).to_string(), serde_json::json!(h));
        }
    }
    serde_json::Value::Object(m)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    InvalidParams,
    NotFound,
    ContainerNotFound,
    ParseFailed,
    IoError,
    UnexpectedError,
}

impl ErrorCode {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::InvalidParams => "invalid_params",
            Self::NotFound => "not_found",
            Self::ContainerNotFound => "container_not_found",
            Self::ParseFailed => "parse_failed",
            Self::IoError => "io_error",
            Self::UnexpectedError => "unexpected_error",
        }
    }

    pub(crate) fn for_error(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<Error>() {
            Some(Error::InvalidLabel(_))
            | Some(Error::InvalidTemplate(_))
            | Some(Error::InvalidGroup(_))
            | Some(Error::InvalidMode(_))
            | Some(Error::InvalidSelector(_)) => Self::InvalidParams,
            Some(Error::NotFound(_)) => Self::NotFound,
            Some(Error::ContainerNotFound(_)) => Self::ContainerNotFound,
            Some(Error::Parse(_)) => Self::ParseFailed,
            Some(Error::Io(_)) => Self::IoError,
            None if err.downcast_ref::<UsageError>().is_some() => Self::InvalidParams,
            None => Self::UnexpectedError,
        }
    }

    fn hint(self) -> &'static str {
        match self {
            Self::InvalidParams => "Check the command-line arguments.",
            Self::NotFound => "Check the --master/--target paths (or SECTIONMATCH_MASTER/SECTIONMATCH_TARGET).",
            Self::ContainerNotFound => {
                "None of the container selectors matched. Set --main-table/--footer-table for this layout."
            }
            Self::ParseFailed => "The document could not be read as UTF-8 HTML.",
            Self::IoError => "The document exists but could not be read.",
            Self::UnexpectedError => "",
        }
    }
}

/// Bad argument combinations detected by the CLI itself (e.g. an out-of-range `--row`).
#[derive(Debug)]
pub(crate) struct UsageError(pub(crate) String);

impl std::fmt::Display for UsageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for UsageError {}

pub(crate) fn add_envelope_fields(payload: &mut serde_json::Value, kind: &str, elapsed_ms: u128) {
    payload["schema_version"] = serde_json::json!(super::SCHEMA_VERSION);
    payload["kind"] = serde_json::json!(kind);
    payload["elapsed_ms"] = serde_json::json!(elapsed_ms);
    if payload.get("ok").is_none() {
        payload["ok"] = serde_json::json!(true);
    }
    if payload.get("request").is_none() {
        payload["request"] = serde_json::Value::Null;
    }
}

pub(crate) fn error_obj(err: &anyhow::Error) -> serde_json::Value {
    #[derive(Serialize)]
    struct ErrorObject {
        code: &'static str,
        message: String,
        hint: &'static str,
    }

    let code = ErrorCode::for_error(err);
    let e = ErrorObject {
        code: code.as_str(),
        message: format!("{err:#}"),
        hint: code.hint(),
    };
    serde_json::to_value(e).unwrap_or_else(|_| {
        serde_json::json!({
            "code": code.as_str(),
            "message": err.to_string(),
            "hint": code.hint(),
        })
    })
}
