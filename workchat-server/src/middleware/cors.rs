use std::future::{ready, Ready};

use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{self, HeaderValue},
    http::Method,
    Error,
};
use futures::future::LocalBoxFuture;

use crate::handlers::CORS_ALLOWED_HEADERS_VALUE;

/// Allows any origin. Preflight (OPTIONS) requests are answered directly with the methods the
/// wrapped scope accepts; every other response gets `Access-Control-Allow-Origin: *`.
pub struct CorsMiddleware {
    allowed_methods: &'static str,
}

impl CorsMiddleware {
    pub fn new(allowed_methods: &'static str) -> Self {
        Self { allowed_methods }
    }
}

impl<S, B> Transform<S, ServiceRequest> for CorsMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type InitError = ();
    type Transform = CorsMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(CorsMiddlewareService {
            service,
            allowed_methods: HeaderValue::from_static(self.allowed_methods),
        }))
    }
}

pub struct CorsMiddlewareService<S> {
    service: S,
    allowed_methods: HeaderValue,
}

impl<S, B> Service<ServiceRequest> for CorsMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if req.method() == Method::OPTIONS {
            let (req_parts, _) = req.into_parts();

            let res = actix_web::HttpResponse::Ok()
                .insert_header((header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*")))
                .insert_header((header::ACCESS_CONTROL_ALLOW_METHODS, self.allowed_methods.clone()))
                .insert_header((
                    header::ACCESS_CONTROL_ALLOW_HEADERS,
                    HeaderValue::from_static(CORS_ALLOWED_HEADERS_VALUE),
                ))
                .finish();

            let res = ServiceResponse::new(req_parts, res).map_into_boxed_body();
            return Box::pin(async move { Ok(res) });
        }

        let req_fut = self.service.call(req);

        Box::pin(async move {
            let mut res = req_fut.await?.map_into_boxed_body();
            res.headers_mut().insert(
                header::ACCESS_CONTROL_ALLOW_ORIGIN,
                HeaderValue::from_static("*"),
            );

            Ok(res)
        })
    }
}
