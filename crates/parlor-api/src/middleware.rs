use axum::extract::{Request, State};
use axum::{Extension, middleware::Next, response::Response};
use axum_extra::extract::CookieJar;
use uuid::Uuid;

use parlor_types::models::Account;

use crate::error::ApiError;
use crate::session::SESSION_COOKIE;
use crate::state::{AppState, blocking};

/// Identity attached to the request by `require_auth`. Deliberately just
/// the id; the account record is only fetched where a guard or handler
/// actually needs it.
#[derive(Debug, Clone, Copy)]
pub struct AccountId(pub Uuid);

/// The live account fetched by `require_admin`, for handlers that need the
/// acting admin (promo creation records its creator).
#[derive(Debug, Clone)]
pub struct AdminAccount(pub Account);

/// Resolve the session cookie to an account id. Fails closed with
/// `Unauthenticated` and no side effect.
pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = jar
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or(ApiError::Unauthenticated)?;

    let account_id = state
        .sessions
        .resolve(&token)
        .await
        .ok_or(ApiError::Unauthenticated)?;

    req.extensions_mut().insert(AccountId(account_id));
    Ok(next.run(req).await)
}

/// Admin gate, layered on `require_auth`. Always re-fetches the account:
/// privilege can change between requests, so a level cached at login time
/// is never trusted.
pub async fn require_admin(
    State(state): State<AppState>,
    Extension(AccountId(account_id)): Extension<AccountId>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let account = check_admin_level(&state, account_id, 1).await?;
    req.extensions_mut().insert(AdminAccount(account));
    Ok(next.run(req).await)
}

/// Fetch the live account and enforce a minimum privilege tier.
async fn check_admin_level(
    state: &AppState,
    account_id: Uuid,
    min_level: i64,
) -> Result<Account, ApiError> {
    let db = state.db.clone();
    let row = blocking(move || db.get_account_by_id(&account_id.to_string()))
        .await?
        .ok_or(ApiError::Forbidden)?;

    let account = row.into_account().map_err(ApiError::Internal)?;
    if account.admin_level < min_level {
        return Err(ApiError::Forbidden);
    }
    Ok(account)
}
