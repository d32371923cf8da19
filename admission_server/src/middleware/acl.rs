//! Access control list middleware.
//! This middleware can be placed on any route or service.
//!
//! It verifies the request's bearer token and then checks the role in the token against the roles the route
//! accepts. If the token is valid and carries one of the roles, the request is allowed to continue. Otherwise an
//! error response is returned (401 for a missing or invalid token, 403 for the wrong role).
use std::{future::Future, pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures::future::{ok, Ready};
use log::*;

use crate::{
    auth::claims_from_request,
    errors::{AuthError, ServerError},
};

pub struct AclMiddlewareFactory {
    allowed_roles: Vec<&'static str>,
}

impl AclMiddlewareFactory {
    pub fn new(allowed_roles: &[&'static str]) -> Self {
        AclMiddlewareFactory { allowed_roles: allowed_roles.to_vec() }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AclMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AclMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AclMiddlewareService { allowed_roles: self.allowed_roles.clone(), service: Rc::new(service) })
    }
}

pub struct AclMiddlewareService<S> {
    allowed_roles: Vec<&'static str>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AclMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let allowed_roles = self.allowed_roles.clone();
        Box::pin(async move {
            let claims = claims_from_request(req.request())?;
            if allowed_roles.iter().any(|role| claims.has_role(role)) {
                service.call(req).await
            } else {
                debug!("💻️ User {} ({}) may not access {}", claims.id, claims.role, req.path());
                let e = AuthError::InsufficientPermissions(format!("{} access required", allowed_roles.join(" or ")));
                Err(ServerError::from(e).into())
            }
        })
    }
}
