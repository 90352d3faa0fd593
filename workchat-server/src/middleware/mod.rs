pub mod auth;
pub mod cors;

use actix_web::http::header;
use actix_web::HttpRequest;

pub trait TokenLocation {
    fn get_from_request(req: &HttpRequest) -> Option<&str>;
}

/// `Authorization: Bearer <token>`
pub struct FromHeader {}

/// `?token=<token>`, for clients that cannot set headers (browser WebSockets)
pub struct FromQuery {}

impl TokenLocation for FromHeader {
    fn get_from_request(req: &HttpRequest) -> Option<&str> {
        let header = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
        let token = header.strip_prefix("Bearer ").unwrap_or(header).trim();

        if token.is_empty() {
            None
        } else {
            Some(token)
        }
    }
}

impl TokenLocation for FromQuery {
    fn get_from_request(req: &HttpRequest) -> Option<&str> {
        const KEY: &str = "token";

        req.query_string()
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == KEY)
            .map(|(_, value)| value)
            .filter(|value| !value.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use actix_web::test::TestRequest;

    #[test]
    fn test_token_from_header() {
        let req = TestRequest::default()
            .insert_header(("Authorization", "Bearer abc.def"))
            .to_http_request();
        assert_eq!(FromHeader::get_from_request(&req), Some("abc.def"));

        let req = TestRequest::default()
            .insert_header(("Authorization", "abc.def"))
            .to_http_request();
        assert_eq!(FromHeader::get_from_request(&req), Some("abc.def"));

        let req = TestRequest::default()
            .insert_header(("Authorization", "Bearer "))
            .to_http_request();
        assert_eq!(FromHeader::get_from_request(&req), None);

        let req = TestRequest::default().to_http_request();
        assert_eq!(FromHeader::get_from_request(&req), None);
    }

    #[test]
    fn test_token_from_query() {
        let req = TestRequest::default()
            .uri("/api/ws?other=1&token=abc-def&x=2")
            .to_http_request();
        assert_eq!(FromQuery::get_from_request(&req), Some("abc-def"));

        let req = TestRequest::default()
            .uri("/api/ws?mytoken=abc")
            .to_http_request();
        assert_eq!(FromQuery::get_from_request(&req), None);

        let req = TestRequest::default().uri("/api/ws?token=").to_http_request();
        assert_eq!(FromQuery::get_from_request(&req), None);
    }
}
