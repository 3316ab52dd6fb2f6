use axum::{
    extract::{Form, Query, State},
    response::{Json, Redirect},
};
use serde::Deserialize;
use tracing::debug;

use shellac_core::Album;

use crate::infra::{
    app_state::AppState,
    errors::{AppError, AppResult},
};

#[derive(Debug, Deserialize)]
pub struct AlbumQuery {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LikeForm {
    id: Option<String>,
}

/// Album ids are externally provisioned decimal integers; anything else is a
/// caller error the repository never sees.
fn validate_id(id: Option<&str>) -> Result<&str, AppError> {
    let id = id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::bad_request("missing album id"))?;
    if !id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::bad_request("album id must be a decimal integer"));
    }
    Ok(id)
}

/// `GET /album?id=<n>`
pub async fn show_album(
    State(state): State<AppState>,
    Query(query): Query<AlbumQuery>,
) -> AppResult<Json<Album>> {
    let id = validate_id(query.id.as_deref())?;
    let album = state.repository.find(id).await?;
    Ok(Json(album))
}

/// `POST /like` with an urlencoded `id` field. Redirects to the album so the
/// caller sees the effect of the like.
pub async fn add_like(
    State(state): State<AppState>,
    Form(form): Form<LikeForm>,
) -> AppResult<Redirect> {
    let id = validate_id(form.id.as_deref())?;
    state.repository.add_like(id).await?;
    debug!(album = id, "like recorded");
    Ok(Redirect::to(&format!("/album?id={id}")))
}

/// `GET /popular` — up to three albums, most liked first.
pub async fn list_popular(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Album>>> {
    let albums = state.repository.top_three().await?;
    Ok(Json(albums))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_validation_accepts_decimal_integers_only() {
        assert_eq!(validate_id(Some("42")).unwrap(), "42");
        assert!(validate_id(Some("4a")).is_err());
        assert!(validate_id(Some("-1")).is_err());
        assert!(validate_id(Some("")).is_err());
        assert!(validate_id(None).is_err());
    }
}
