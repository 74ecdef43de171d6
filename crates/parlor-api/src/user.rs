use axum::{Extension, Json, extract::State};

use parlor_db::ledger::RedeemOutcome;
use parlor_types::api::{RedeemRequest, RedeemResponse};
use parlor_types::models::Account;

use crate::error::{ApiError, ApiResult};
use crate::middleware::AccountId;
use crate::state::{AppState, blocking};

/// The authenticated account, digest-free. An account deleted out from
/// under a live session reads as unauthenticated.
pub async fn profile(
    State(state): State<AppState>,
    Extension(AccountId(account_id)): Extension<AccountId>,
) -> ApiResult<Json<Account>> {
    let db = state.db.clone();
    let row = blocking(move || db.get_account_by_id(&account_id.to_string()))
        .await?
        .ok_or(ApiError::Unauthenticated)?;

    Ok(Json(row.into_account().map_err(ApiError::Internal)?))
}

pub async fn redeem_code(
    State(state): State<AppState>,
    Extension(AccountId(account_id)): Extension<AccountId>,
    Json(req): Json<RedeemRequest>,
) -> ApiResult<Json<RedeemResponse>> {
    let code = req.code.trim().to_string();
    if code.is_empty() {
        return Err(ApiError::Validation("code must not be empty".into()));
    }

    let db = state.db.clone();
    let outcome = blocking(move || db.redeem_promo(&code, &account_id.to_string())).await?;
    match outcome {
        RedeemOutcome::Credited(reward) => Ok(Json(RedeemResponse { reward })),
        RedeemOutcome::NotFound => Err(ApiError::CodeNotFound),
        RedeemOutcome::Exhausted => Err(ApiError::CodeExhausted),
    }
}
