/// HTTP middleware utilities for blog-service
///
/// Provides session resolution (who is making the request) and simple
/// request timing logs. Session resolution never rejects a request: routes
/// decide for themselves whether an anonymous requester may proceed, see
/// [`permissions`].
pub mod permissions;

pub use permissions::*;

use crate::auth::{AuthUser, SessionKeys};
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

// =====================================================================
// Session resolution
// =====================================================================

/// The requester as resolved by [`SessionMiddleware`]; `None` when anonymous.
#[derive(Debug, Clone, Default)]
pub struct Viewer(pub Option<AuthUser>);

impl Viewer {
    pub fn user(&self) -> Option<&AuthUser> {
        self.0.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.0.is_some()
    }
}

/// Actix middleware that attaches a [`Viewer`] to every request.
#[derive(Clone)]
pub struct SessionMiddleware {
    keys: Arc<SessionKeys>,
    cookie_name: Rc<str>,
}

impl SessionMiddleware {
    pub fn new(keys: Arc<SessionKeys>, cookie_name: &str) -> Self {
        Self {
            keys,
            cookie_name: Rc::from(cookie_name),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SessionMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = SessionMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SessionMiddlewareService {
            service: Rc::new(service),
            keys: self.keys.clone(),
            cookie_name: self.cookie_name.clone(),
        }))
    }
}

pub struct SessionMiddlewareService<S> {
    service: Rc<S>,
    keys: Arc<SessionKeys>,
    cookie_name: Rc<str>,
}

impl<S> SessionMiddlewareService<S> {
    fn session_token(&self, req: &ServiceRequest) -> Option<String> {
        let bearer = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(|t| t.trim().to_string());

        bearer.or_else(|| req.cookie(&self.cookie_name).map(|c| c.value().to_string()))
    }
}

impl<S, B> Service<ServiceRequest> for SessionMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let viewer = match self.session_token(&req) {
            Some(token) => match self.keys.verify(&token) {
                Ok(user) => Viewer(Some(user)),
                Err(err) => {
                    tracing::debug!(path = %req.path(), "ignoring session token: {}", err);
                    Viewer(None)
                }
            },
            None => Viewer(None),
        };
        req.extensions_mut().insert(viewer);

        let service = self.service.clone();
        Box::pin(async move { service.call(req).await })
    }
}

impl FromRequest for Viewer {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        ready(Ok(req.extensions().get::<Viewer>().cloned().unwrap_or_default()))
    }
}

// =====================================================================
// Request timing
// =====================================================================

pub struct RequestTimingMiddleware;

impl<S, B> Transform<S, ServiceRequest> for RequestTimingMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestTimingMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestTimingMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct RequestTimingMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RequestTimingMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let path = req.path().to_string();
        let method = req.method().to_string();
        let start = Instant::now();

        Box::pin(async move {
            let res = service.call(req).await;
            let elapsed_ms = start.elapsed().as_millis();
            match &res {
                Ok(resp) => tracing::debug!(
                    %method,
                    %path,
                    status = resp.status().as_u16(),
                    %elapsed_ms,
                    "request completed"
                ),
                Err(err) => tracing::debug!(%method, %path, %elapsed_ms, "request failed: {}", err),
            }
            res
        })
    }
}
