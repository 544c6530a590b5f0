use cf_core::CfmlError;
use std::fmt::Display;

fn map_error(code: &'static str, error: impl Display) -> CfmlError {
    CfmlError::new(code, error.to_string())
}

pub(crate) fn emit_error(error: CfmlError) -> i32 {
    println!("RESULT:ERROR");
    println!("ERROR_CODE:{}", error.code);
    println!(
        "ERROR_MSG_JSON:{}",
        serde_json::to_string(&error.message).unwrap_or_else(|_| "\"Unknown error\"".to_string())
    );
    1
}

pub(crate) fn map_cli_source_path(error: std::io::Error) -> CfmlError {
    map_error("CLI_SOURCE_PATH", error)
}

pub(crate) fn map_cli_source_scan(error: std::path::StripPrefixError) -> CfmlError {
    map_error("CLI_SOURCE_SCAN", error)
}

pub(crate) fn map_cli_walk(error: walkdir::Error) -> CfmlError {
    map_error("CLI_SOURCE_SCAN", error)
}

pub(crate) fn map_cli_prefs_read(error: std::io::Error) -> CfmlError {
    map_error("CLI_PREFS_READ", error)
}

pub(crate) fn map_cli_output(error: serde_json::Error) -> CfmlError {
    map_error("CLI_OUTPUT", error)
}

#[cfg(test)]
mod error_map_tests {
    use super::*;

    #[test]
    fn emit_error_returns_non_zero_exit_code() {
        let code = emit_error(CfmlError::new("ERR", "failed"));
        assert_eq!(code, 1);
    }

    #[test]
    fn mapping_helpers_keep_error_codes() {
        assert_eq!(
            map_cli_source_path(std::io::Error::other("path")).code,
            "CLI_SOURCE_PATH"
        );

        let strip_error = std::path::Path::new("/a")
            .strip_prefix("/b")
            .expect_err("strip prefix");
        assert_eq!(map_cli_source_scan(strip_error).code, "CLI_SOURCE_SCAN");

        assert_eq!(
            map_cli_prefs_read(std::io::Error::other("read")).code,
            "CLI_PREFS_READ"
        );

        let invalid = serde_json::from_str::<serde_json::Value>("{").expect_err("invalid json");
        assert_eq!(map_cli_output(invalid).code, "CLI_OUTPUT");
    }
}
