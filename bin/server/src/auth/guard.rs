//! Request guard chain for protected routes.
//!
//! A [`GuardChain`] is an ordered list of [`GuardStage`]s run as axum
//! middleware. Each stage either passes the request scope on (possibly
//! enriched) or rejects the request; the first rejection ends evaluation.
//! Routes are typically guarded by [`Authenticate`] followed by at most one
//! authorization stage.

use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use iag_platform_access::{
    AccessControl, AuthenticationError, AuthorizationError, Identity, Role, TokenCodec,
};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

/// Per-request state threaded through the guard stages.
#[derive(Debug, Clone, Default)]
pub struct RequestScope {
    identity: Option<Identity>,
}

impl RequestScope {
    /// Returns the verified identity, if a stage has attached one.
    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Attaches a verified identity.
    #[must_use]
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    fn require_identity(&self) -> Result<&Identity, GuardRejection> {
        self.identity
            .as_ref()
            .ok_or(AuthenticationError::MissingIdentity.into())
    }
}

/// One step of a guard chain.
pub trait GuardStage: Send + Sync {
    /// Evaluates the request, returning the scope for the next stage.
    ///
    /// # Errors
    ///
    /// Returns a rejection that ends the chain.
    fn evaluate(
        &self,
        headers: &HeaderMap,
        scope: RequestScope,
    ) -> Result<RequestScope, GuardRejection>;
}

/// Verifies the bearer token and attaches the identity it carries.
#[derive(Debug, Clone)]
pub struct Authenticate {
    codec: TokenCodec,
}

impl Authenticate {
    #[must_use]
    pub fn new(codec: TokenCodec) -> Self {
        Self { codec }
    }
}

impl GuardStage for Authenticate {
    fn evaluate(
        &self,
        headers: &HeaderMap,
        scope: RequestScope,
    ) -> Result<RequestScope, GuardRejection> {
        let value = headers
            .get(header::AUTHORIZATION)
            .ok_or(AuthenticationError::MissingHeader)?;
        let token = bearer_token(value).ok_or(AuthenticationError::MalformedHeader)?;

        let claims = self.codec.verify(token).map_err(|report| {
            let reason = report.current_context().to_string();
            debug!(%reason, "bearer token rejected");
            AuthenticationError::InvalidToken { reason }
        })?;

        Ok(scope.with_identity(claims.into_identity()))
    }
}

/// Extracts the token from a header of exactly the form `Bearer <token>`.
fn bearer_token(value: &HeaderValue) -> Option<&str> {
    let value = value.to_str().ok()?;
    match value.split_once(' ') {
        Some(("Bearer", token)) if !token.is_empty() && !token.contains(' ') => Some(token),
        _ => None,
    }
}

/// Passes if the identity holds any of the listed roles.
#[derive(Debug, Clone)]
pub struct RequireAnyRole {
    access: AccessControl,
    roles: Vec<Role>,
}

impl RequireAnyRole {
    #[must_use]
    pub fn new(access: AccessControl, roles: Vec<Role>) -> Self {
        Self { access, roles }
    }
}

impl GuardStage for RequireAnyRole {
    fn evaluate(
        &self,
        _headers: &HeaderMap,
        scope: RequestScope,
    ) -> Result<RequestScope, GuardRejection> {
        let identity = scope.require_identity()?;
        if !self.access.has_any_role(identity, &self.roles) {
            debug!(user_id = %identity.id(), required = ?self.roles, "missing role");
            return Err(AuthorizationError::MissingRole {
                required: self.roles.clone(),
            }
            .into());
        }
        Ok(scope)
    }
}

/// Passes if the identity is granted `action` on `resource`.
#[derive(Debug, Clone)]
pub struct RequirePermission {
    access: AccessControl,
    resource: String,
    action: String,
}

impl RequirePermission {
    #[must_use]
    pub fn new(
        access: AccessControl,
        resource: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            access,
            resource: resource.into(),
            action: action.into(),
        }
    }
}

impl GuardStage for RequirePermission {
    fn evaluate(
        &self,
        _headers: &HeaderMap,
        scope: RequestScope,
    ) -> Result<RequestScope, GuardRejection> {
        let identity = scope.require_identity()?;
        if !self
            .access
            .has_permission(identity, &self.resource, &self.action)
        {
            debug!(
                user_id = %identity.id(),
                resource = %self.resource,
                action = %self.action,
                "missing permission"
            );
            return Err(AuthorizationError::MissingPermission {
                resource: self.resource.clone(),
                action: self.action.clone(),
            }
            .into());
        }
        Ok(scope)
    }
}

/// Ordered guard stages applied to a route.
#[derive(Clone, Default)]
pub struct GuardChain {
    stages: Vec<Arc<dyn GuardStage>>,
}

impl GuardChain {
    /// Creates an empty chain, which admits every request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage.
    #[must_use]
    pub fn with_stage(mut self, stage: impl GuardStage + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Runs every stage in order, stopping at the first rejection.
    ///
    /// # Errors
    ///
    /// Returns the first stage's rejection.
    pub fn evaluate(&self, headers: &HeaderMap) -> Result<RequestScope, GuardRejection> {
        self.stages
            .iter()
            .try_fold(RequestScope::default(), |scope, stage| {
                stage.evaluate(headers, scope)
            })
    }

    /// Axum middleware running the chain before the wrapped handler.
    ///
    /// Use with `axum::middleware::from_fn_with_state(Arc<GuardChain>, GuardChain::enforce)`.
    pub async fn enforce(
        State(chain): State<Arc<GuardChain>>,
        mut request: Request,
        next: Next,
    ) -> Response {
        match chain.evaluate(request.headers()) {
            Ok(scope) => {
                if let Some(identity) = scope.identity {
                    request.extensions_mut().insert(CurrentIdentity(identity));
                }
                next.run(request).await
            }
            Err(rejection) => rejection.into_response(),
        }
    }
}

/// Extractor for the identity attached by the guard chain.
#[derive(Debug, Clone)]
pub struct CurrentIdentity(pub Identity);

impl<S> FromRequestParts<S> for CurrentIdentity
where
    S: Send + Sync,
{
    type Rejection = GuardRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentIdentity>()
            .cloned()
            .ok_or(AuthenticationError::MissingIdentity.into())
    }
}

/// Rejection produced by a guard stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardRejection {
    Unauthenticated(AuthenticationError),
    Forbidden(AuthorizationError),
}

impl From<AuthenticationError> for GuardRejection {
    fn from(error: AuthenticationError) -> Self {
        Self::Unauthenticated(error)
    }
}

impl From<AuthorizationError> for GuardRejection {
    fn from(error: AuthorizationError) -> Self {
        Self::Forbidden(error)
    }
}

impl IntoResponse for GuardRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthenticated(error) => (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, "Bearer")],
                Json(json!({
                    "error": "Unauthorized",
                    "reason": error.to_string(),
                })),
            )
                .into_response(),
            Self::Forbidden(AuthorizationError::MissingRole { required }) => (
                StatusCode::FORBIDDEN,
                Json(json!({
                    "error": "Insufficient permissions",
                    "required_roles": required,
                })),
            )
                .into_response(),
            Self::Forbidden(AuthorizationError::MissingPermission { resource, action }) => (
                StatusCode::FORBIDDEN,
                Json(json!({
                    "error": "Insufficient permissions",
                    "resource": resource,
                    "action": action,
                })),
            )
                .into_response(),
        }
    }
}
