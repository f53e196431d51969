//! Handshake-level tests: a server reading a client's `Sec-WebSocket-Extensions`
//! offer and producing its response header.

use rsws_pmd::extensions::{ParamMap, find_offer};
use rsws_pmd::{DeflateOptions, EXTENSION_NAME, Environment, Error};

fn init_logger() {
    env_logger::try_init().ok();
}

/// Server-side negotiation: accept the offer if the environment allows it,
/// always asking for `server_no_context_takeover`.
fn respond(request_header: &str, env: &Environment) -> Result<String, Error> {
    let offer = DeflateOptions::from_header(request_header)?;
    if !offer.is_enabled() || !env.supports_permessage_deflate() {
        return Ok(String::new());
    }
    Ok(offer.with_server_no_context_takeover().render_header())
}

#[test]
fn test_browser_offer() {
    init_logger();

    let header = "permessage-deflate; client_max_window_bits";
    let env = Environment::new(true, None);
    assert_eq!(
        respond(header, &env).unwrap(),
        "permessage-deflate; server_no_context_takeover"
    );
}

#[test]
fn test_offer_after_other_extensions() {
    init_logger();

    let header = "x-webkit-deflate-frame, permessage-deflate; client_no_context_takeover; \
                  server_max_window_bits=10";
    let options = DeflateOptions::from_header(header).unwrap();
    assert!(options.is_enabled());
    assert_eq!(options.client_no_context_takeover(), Some(true));
    assert_eq!(options.server_max_window_bits(), Some(10));
    assert_eq!(
        options.render_header(),
        "permessage-deflate; server_max_window_bits=10; client_no_context_takeover"
    );
}

#[test]
fn test_unsupported_environment_omits_header() {
    init_logger();

    let header = "permessage-deflate";
    assert_eq!(respond(header, &Environment::new(false, None)).unwrap(), "");
    assert_eq!(
        respond(header, &Environment::new(true, Some("7.1.1".into()))).unwrap(),
        ""
    );
    assert_eq!(
        respond(header, &Environment::new(true, Some("7.0.20".into()))).unwrap(),
        "permessage-deflate; server_no_context_takeover"
    );
}

#[test]
fn test_no_offer_omits_header() {
    init_logger();

    let env = Environment::new(true, None);
    assert_eq!(respond("", &env).unwrap(), "");
    assert_eq!(respond("x-custom; a=b", &env).unwrap(), "");
}

#[test]
fn test_invalid_offer_surfaces_error() {
    init_logger();

    let env = Environment::new(true, None);
    let err = respond("permessage-deflate; server_max_window_bits=7", &env).unwrap_err();
    assert_eq!(
        err,
        Error::InvalidWindowBits {
            param: "server_max_window_bits",
            value: "7".to_string(),
        }
    );
}

#[test]
fn test_tokenizer_exposes_raw_params() {
    init_logger();

    let header = "foo, Permessage-Deflate; Client_Max_Window_Bits=9; x=1";
    let params = find_offer(header, EXTENSION_NAME).map(ParamMap::parse).unwrap();
    assert_eq!(params.value("Client_Max_Window_Bits"), Some("9"));
    assert_eq!(params.value("x"), Some("1"));

    // Parameter names are case-sensitive.
    let options = DeflateOptions::from_header(header).unwrap();
    assert_eq!(options, DeflateOptions::create_enabled());
}
