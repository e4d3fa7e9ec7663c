//! Tests for response materialization and the error-handler chain
//!
//! # Test Coverage
//!
//! - Text, JSON and HTML return values and their content types
//! - Case-insensitive request headers and request cookies
//! - Response cookies rendered as `set-cookie` headers
//! - Redirects, 404, unclassified failures
//! - Custom error kinds and handler overrides (404/400/500)
//! - Error handlers that fail themselves

mod common;

use common::{app, app_request};
use cuproute::dependency::builtin;
use cuproute::error::{EXCEPTION, HTTP, QUERY_PARAM_MISSING};
use cuproute::prelude::*;
use serde_json::json;
use std::rc::Rc;

static KEY_ERROR: ErrorKind = ErrorKind::new("key_error", &EXCEPTION);
static TEAPOT: ErrorKind = ErrorKind::new("teapot", &HTTP);

fn key_error() -> Error {
    Error::custom(&KEY_ERROR, anyhow::anyhow!("missing key 'user'"))
}

fn json_body(response: &Response) -> serde_json::Value {
    serde_json::from_str(response.body()).unwrap()
}

#[test]
fn test_ok() {
    let mut app = app();
    app.route("/", Handler::new(|_| Ok("ok"))).unwrap();

    let response = app.serve(app_request("get").build());
    assert_eq!(response.status(), 200);
    assert_eq!(response.get_single_header("Content-Type"), Some("text/plain"));
    assert_eq!(response.body(), "ok");
}

#[test]
fn test_json() {
    let mut app = app();
    app.route("/", Handler::new(|_| Ok(json!({"status": "ok"}))))
        .unwrap();

    let response = app.serve(app_request("get").build());
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.get_single_header("Content-Type"),
        Some("application/json")
    );
    assert_eq!(json_body(&response), json!({"status": "ok"}));
}

#[test]
fn test_json_array() {
    let mut app = app();
    app.route("/", Handler::new(|_| Ok(json!([1, 2, 3])))).unwrap();

    let response = app.serve(app_request("get").build());
    assert_eq!(response.body(), "[1,2,3]");
}

#[test]
fn test_unsupported_return_type() {
    let mut app = app();
    app.route("/", Handler::new(|_| Ok(json!(42)))).unwrap();

    let response = app.serve(app_request("get").build());
    assert_eq!(response.status(), 500);
    assert_eq!(response.body(), "");
}

#[test]
fn test_empty_reply() {
    let mut app = app();
    app.route("/", Handler::new(|_| Ok(()))).unwrap();

    let response = app.serve(app_request("get").build());
    assert_eq!(response.status(), 200);
    assert_eq!(response.body(), "");
    assert_eq!(response.get_single_header("content-type"), None);
}

#[test]
fn test_html() {
    let mut app = app();
    app.route("/", Handler::new(|_| Ok(html("<html></html>"))))
        .unwrap();

    let response = app.serve(app_request("get").build());
    assert_eq!(response.status(), 200);
    assert_eq!(response.get_single_header("Content-Type"), Some("text/html"));
    assert_eq!(response.body(), "<html></html>");
}

#[test]
fn test_headers() {
    let mut app = app();
    app.route(
        "/",
        Handler::new(|args| {
            let request: Rc<Request> = args.take("request")?;
            assert_eq!(request.get_header("cAsE"), Some("value"));
            assert_eq!(request.get_header_or("missing", "fallback"), "fallback");
            Ok("ok")
        })
        .inject("request", builtin::request()),
    )
    .unwrap();

    let response = app.serve(app_request("get").header("CaSe", "value").build());
    assert_eq!(response.status(), 200);
    assert_eq!(response.body(), "ok");
}

#[test]
fn test_cookies() {
    let mut app = app();
    app.route(
        "/",
        Handler::new(|args| {
            let cookies: builtin::Cookies = args.take("cookies")?;
            assert_eq!(cookies.get("test1").as_deref(), Some("value1"));
            assert_eq!(cookies.get("test2").as_deref(), Some("value2"));
            cookies.set("param1", "value1");
            cookies.set_with("param2", "value2", "/", None, Some(true));
            Ok("ok")
        })
        .inject("cookies", builtin::cookies()),
    )
    .unwrap();

    let response = app.serve(
        app_request("get")
            .header("cookie", "test1=value1; test2=value2")
            .build(),
    );
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.get_header("set-cookie"),
        vec!["param1=value1; Path=/", "param2=value2; HttpOnly; Path=/"]
    );
    assert_eq!(response.body(), "ok");
}

#[test]
fn test_cookie_attributes() {
    let mut app = app();
    app.route(
        "/",
        Handler::new(|args| {
            let cookies: builtin::Cookies = args.take("cookies")?;
            cookies.set_with("session", "abc", "/app", Some(3600), None);
            cookies.set("session", "def");
            Ok(())
        })
        .inject("cookies", builtin::cookies()),
    )
    .unwrap();

    let response = app.serve(app_request("get").build());
    assert_eq!(
        response.get_header("set-cookie"),
        vec!["session=def; Max-Age=3600; Path=/"]
    );
}

#[test]
fn test_redirect() {
    let mut app = app();
    app.route(
        "/",
        Handler::new(|_| -> Result<()> { Err(Error::redirect("localhost")) }),
    )
    .unwrap();

    let response = app.serve(app_request("get").build());
    assert_eq!(response.status(), 307);
    assert_eq!(response.get_single_header("Content-Type"), Some("text/plain"));
    assert_eq!(response.get_single_header("Location"), Some("localhost"));
    assert_eq!(response.body(), "");
}

#[test]
fn test_permanent_redirect() {
    let mut app = app();
    app.route(
        "/old",
        Handler::new(|_| -> Result<()> {
            Err(Error::Redirect {
                to: "/new".to_string(),
                status: 301,
            })
        }),
    )
    .unwrap();

    let response = app.serve(app_request("get").path("/old").build());
    assert_eq!(response.status(), 301);
    assert_eq!(response.get_single_header("location"), Some("/new"));
}

#[test]
fn test_not_found() {
    let app = app();
    let response = app.serve(app_request("get").build());
    assert_eq!(response.status(), 404);
    assert_eq!(json_body(&response), json!({"detail": {"msg": "Page not found"}}));
}

#[test]
fn test_http_error() {
    let mut app = app();
    app.route(
        "/",
        Handler::new(|_| -> Result<()> { Err(Error::http(409, "Already exists")) }),
    )
    .unwrap();

    let response = app.serve(app_request("get").build());
    assert_eq!(response.status(), 409);
    assert_eq!(json_body(&response), json!({"detail": {"msg": "Already exists"}}));
}

#[test]
fn test_failed() {
    let mut app = app();
    app.route("/", Handler::new(|_| -> Result<()> { Err(key_error()) }))
        .unwrap();

    let response = app.serve(app_request("get").build());
    assert_eq!(response.status(), 500);
    assert_eq!(response.body(), "");
}

#[test]
fn test_anyhow_error_is_unclassified() {
    let mut app = app();
    app.route(
        "/",
        Handler::new(|_| -> Result<()> {
            let _parsed: i64 = "nope".parse().map_err(anyhow::Error::from)?;
            Ok(())
        }),
    )
    .unwrap();

    let response = app.serve(app_request("get").build());
    assert_eq!(response.status(), 500);
}

#[test]
fn test_custom_error_handler() {
    let mut app = app();
    app.exception_handler(
        &KEY_ERROR,
        Handler::new(|args| {
            let http: builtin::StatusCode = args.take("http")?;
            assert_eq!(args.error()?.kind(), &KEY_ERROR);
            http.set(200);
            Ok("http 200")
        })
        .inject("http", builtin::status_code(None)),
    );
    app.route("/", Handler::new(|_| -> Result<()> { Err(key_error()) }))
        .unwrap();

    let response = app.serve(app_request("get").build());
    assert_eq!(response.status(), 200);
    assert_eq!(response.body(), "http 200");
}

#[test]
fn test_custom_http_kind_uses_http_handler() {
    let mut app = app();
    app.route(
        "/",
        Handler::new(|_| -> Result<()> {
            Err(Error::custom_http(&TEAPOT, 418, "short and stout"))
        }),
    )
    .unwrap();

    let response = app.serve(app_request("get").build());
    assert_eq!(response.status(), 418);
    assert_eq!(
        json_body(&response),
        json!({"detail": {"msg": "short and stout"}})
    );
}

#[test]
fn test_custom_http_kind_with_own_handler() {
    let mut app = app();
    app.exception_handler(
        &TEAPOT,
        Handler::new(|args| {
            let response: cuproute::server::SharedResponse = args.take("response")?;
            let err = args.error()?;
            response.borrow_mut().set_status(err.status_code());
            Ok("I'm a teapot")
        })
        .inject("response", builtin::response()),
    );
    app.route(
        "/",
        Handler::new(|_| -> Result<()> {
            Err(Error::custom_http(&TEAPOT, 418, "short and stout"))
        }),
    )
    .unwrap();

    let response = app.serve(app_request("get").build());
    assert_eq!(response.status(), 418);
    assert_eq!(response.body(), "I'm a teapot");
}

#[test]
fn test_custom_500() {
    let mut app = app();
    app.handle_500(
        Handler::new(|args| {
            let http: builtin::StatusCode = args.take("http")?;
            http.set(500);
            Ok("http 500")
        })
        .inject("http", builtin::status_code(None)),
    );
    app.route("/", Handler::new(|_| -> Result<()> { Err(key_error()) }))
        .unwrap();

    let response = app.serve(app_request("get").build());
    assert_eq!(response.status(), 500);
    assert_eq!(response.body(), "http 500");
}

#[test]
fn test_custom_404() {
    let mut app = app();
    app.handle_404(
        Handler::new(|args| {
            let http: builtin::StatusCode = args.take("http")?;
            http.set(404);
            Ok("http 404")
        })
        .inject("http", builtin::status_code(None)),
    );

    let response = app.serve(app_request("get").build());
    assert_eq!(response.status(), 404);
    assert_eq!(response.body(), "http 404");
}

#[test]
fn test_custom_400_receives_error() {
    let mut app = app();
    app.handle_400(
        Handler::new(|args| {
            let response: cuproute::server::SharedResponse = args.take("response")?;
            let err = args.error()?;
            response.borrow_mut().set_status(err.status_code());
            Ok(json!({ "error": err.to_string() }))
        })
        .inject("response", builtin::response()),
    );
    app.route(
        "/",
        Handler::new(|_| Ok("ok")).inject("q", builtin::query_named("required")),
    )
    .unwrap();

    let response = app.serve(app_request("get").build());
    assert_eq!(response.status(), 400);
    assert_eq!(
        json_body(&response),
        json!({"error": "Query parameter 'required' is mandatory"})
    );
}

#[test]
fn test_subkind_handler_wins_when_registered_first() {
    let mut app = app();
    app.exception_handler(
        &QUERY_PARAM_MISSING,
        Handler::new(|args| {
            let response: cuproute::server::SharedResponse = args.take("response")?;
            response.borrow_mut().set_status(422);
            Ok("query param missing")
        })
        .inject("response", builtin::response()),
    );
    app.handle_400(Handler::new(|_| Ok("bad request")));
    app.exception_handler(&HTTP, Handler::new(|_| Ok("http")));
    app.route(
        "/",
        Handler::new(|_| Ok("ok")).inject("q", builtin::query_named("required")),
    )
    .unwrap();

    let response = app.serve(app_request("get").build());
    assert_eq!(response.status(), 422);
    assert_eq!(response.body(), "query param missing");
}

#[test]
fn test_error_in_500_handler() {
    let mut app = app();
    app.handle_500(Handler::new(|_| -> Result<()> {
        Err(Error::custom(&EXCEPTION, anyhow::anyhow!("handler broke")))
    }));
    app.route("/", Handler::new(|_| -> Result<()> { Err(key_error()) }))
        .unwrap();

    let response = app.serve(app_request("get").build());
    assert_eq!(response.status(), 500);
    assert_eq!(response.body(), "");
}

#[test]
fn test_error_in_404_handler_falls_back_to_http_handler() {
    let mut app = app();
    app.handle_404(Handler::new(|_| -> Result<()> {
        Err(Error::custom(&EXCEPTION, anyhow::anyhow!("handler broke")))
    }));

    let response = app.serve(app_request("get").build());
    assert_eq!(response.status(), 404);
    assert_eq!(json_body(&response), json!({"detail": {"msg": "Page not found"}}));
}

#[test]
fn test_into_parts() {
    let mut app = app();
    app.route("/", Handler::new(|_| Ok("ok"))).unwrap();

    let (status, headers, body) = app.serve(app_request("get").build()).into_parts();
    assert_eq!(status, 200);
    assert_eq!(
        headers,
        vec![("content-type".to_string(), "text/plain".to_string())]
    );
    assert_eq!(body, "ok");
}
