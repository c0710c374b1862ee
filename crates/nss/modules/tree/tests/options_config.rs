#![cfg(test)]

use nss_tree::options::{DumpLineNumbers, MathMode, Options, RewriteUrls};

#[test]
fn options_deserialize_from_partial_config() -> Result<(), serde_json::Error> {
    let parsed: Options = serde_json::from_str(
        r#"{
            "compress": true,
            "math": "strict-legacy",
            "rewrite_urls": "local"
        }"#,
    )?;
    assert!(parsed.compress);
    assert_eq!(parsed.math, MathMode::StrictLegacy);
    assert_eq!(parsed.rewrite_urls, RewriteUrls::Local);
    // Everything omitted keeps its default.
    assert!(!parsed.strict_units);
    assert_eq!(parsed.numeric_precision, Some(8));
    assert_eq!(parsed.dump_line_numbers, DumpLineNumbers::None);
    assert_eq!(parsed.url_args, None);
    Ok(())
}

#[test]
fn options_round_trip_through_json() -> Result<(), serde_json::Error> {
    let options = Options {
        compress: true,
        strict_units: true,
        math: MathMode::Always,
        numeric_precision: None,
        dump_line_numbers: DumpLineNumbers::Comments,
        rewrite_urls: RewriteUrls::All,
        url_args: Some("v=3".to_owned()),
    };
    let encoded = serde_json::to_string(&options)?;
    let decoded: Options = serde_json::from_str(&encoded)?;
    assert_eq!(decoded.math, options.math);
    assert_eq!(decoded.numeric_precision, options.numeric_precision);
    assert_eq!(decoded.url_args, options.url_args);
    assert!(decoded.compress);
    assert!(decoded.strict_units);
    Ok(())
}
