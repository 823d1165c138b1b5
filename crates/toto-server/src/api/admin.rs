//! Admin surface. Every route here sits behind [`super::middleware::require_admin`],
//! and every successful mutation appends an activity entry.

use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use toto_core::db::unix_millis;
use toto_core::locale::{self, activity};
use toto_core::{ActivityKind, Audience, MatchCategory, MatchStatus, validate};
use tracing::{info, instrument};

use super::auth::create_admin_account;
use super::error::ApiError;
use super::middleware::client_ip;
use super::state::AppState;
use super::views::{MatchView, Profile};
use crate::auth::Claims;
use crate::storage::{
    Account, Activity, Broadcast, Counter, DashboardStats, DatabaseError, MatchParams,
    NewBroadcast, Period, ProfileUpdate, Settings, SettingsUpdate, UserQuery,
};

pub const USERS_PER_PAGE: u32 = 10;
pub const ACTIVITY_LIST_LIMIT: u32 = 50;
pub const BROADCAST_HISTORY: u32 = 10;
/// Activity entries older than this are removed by a clear.
pub const ACTIVITY_RETENTION_MS: i64 = 30 * 24 * 60 * 60 * 1000;

#[derive(Debug, Default, Deserialize)]
pub struct Confirm {
    #[serde(default)]
    pub confirm: bool,
}

impl Confirm {
    fn require(&self) -> Result<(), ApiError> {
        if self.confirm {
            Ok(())
        } else {
            Err(ApiError::ConfirmationRequired)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub deleted: bool,
}

/// Who did it and from where, for the activity log.
struct Actor {
    email: String,
    ip: String,
}

impl Actor {
    fn new(claims: &Claims, headers: &HeaderMap) -> Self {
        Self {
            email: claims.email.clone(),
            ip: client_ip(headers),
        }
    }
}

async fn record(
    state: &AppState,
    actor: &Actor,
    kind: ActivityKind,
    message: &str,
) -> Result<(), ApiError> {
    state
        .db
        .log_activity(kind, message, &actor.email, &actor.ip)
        .await?;
    Ok(())
}

/// `GET /api/admin/dashboard`
pub async fn dashboard(State(state): State<AppState>) -> Result<Json<DashboardStats>, ApiError> {
    Ok(Json(state.db.dashboard_stats().await?))
}

// =========================================================================
// Matches
// =========================================================================

#[derive(Debug, Deserialize)]
pub struct MatchSearch {
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub video_url: String,
    pub category: MatchCategory,
    pub status: MatchStatus,
    #[serde(default)]
    pub premium_only: bool,
}

impl MatchForm {
    /// Validate every field before anything is written.
    fn params(&self) -> Result<MatchParams<'_>, ApiError> {
        let title = validate::required(&self.title, locale::TITLE_REQUIRED)?;
        let thumbnail = validate::required(&self.thumbnail, locale::THUMBNAIL_REQUIRED)?;
        let video_url = validate::required(&self.video_url, locale::VIDEO_URL_REQUIRED)?;
        validate::url(thumbnail)?;
        validate::url(video_url)?;

        Ok(MatchParams {
            title,
            thumbnail,
            video_url,
            category: self.category,
            status: self.status,
            premium_only: self.premium_only,
        })
    }
}

fn matches_search(view: &MatchView, needle: &str) -> bool {
    view.inner.title.to_lowercase().contains(needle)
        || view.category_label.to_lowercase().contains(needle)
        || view.inner.category.as_str().contains(needle)
}

/// `GET /api/admin/matches?search=`
pub async fn list_matches(
    State(state): State<AppState>,
    Query(query): Query<MatchSearch>,
) -> Result<Json<Vec<MatchView>>, ApiError> {
    let needle = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    let views = state
        .db
        .list_matches()
        .await?
        .into_iter()
        .map(MatchView::from)
        .filter(|v| needle.as_deref().is_none_or(|n| matches_search(v, n)))
        .collect();
    Ok(Json(views))
}

/// `POST /api/admin/matches`
#[instrument(skip(state, claims, headers, form), fields(route = "create_match"))]
pub async fn create_match(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
    Json(form): Json<MatchForm>,
) -> Result<(StatusCode, Json<MatchView>), ApiError> {
    let params = form.params()?;
    let actor = Actor::new(&claims, &headers);

    let id = uuid::Uuid::new_v4().to_string();
    let created = state.db.create_match(&id, &params, &actor.email).await?;
    record(
        &state,
        &actor,
        ActivityKind::MatchAdd,
        &activity::match_added(&created.title),
    )
    .await?;

    info!(match_id = %created.id, "Match created");
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// `GET /api/admin/matches/{id}`
pub async fn get_match(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
) -> Result<Json<MatchView>, ApiError> {
    Ok(Json(state.db.get_match(&match_id).await?.into()))
}

/// `PUT /api/admin/matches/{id}`
#[instrument(skip(state, claims, headers, form), fields(route = "update_match", match_id = %match_id))]
pub async fn update_match(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
    Path(match_id): Path<String>,
    Json(form): Json<MatchForm>,
) -> Result<Json<MatchView>, ApiError> {
    let params = form.params()?;
    let updated = state.db.update_match(&match_id, &params).await?;
    record(
        &state,
        &Actor::new(&claims, &headers),
        ActivityKind::MatchEdit,
        &activity::match_updated(&updated.title),
    )
    .await?;

    Ok(Json(updated.into()))
}

/// `DELETE /api/admin/matches/{id}?confirm=true`
#[instrument(skip(state, claims, headers, confirm), fields(route = "delete_match", match_id = %match_id))]
pub async fn delete_match(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
    Path(match_id): Path<String>,
    Query(confirm): Query<Confirm>,
) -> Result<Json<Deleted>, ApiError> {
    confirm.require()?;
    let existing = state.db.get_match(&match_id).await?;

    let deleted = state.db.delete_match(&existing.id).await?;
    state.chat.close(&existing.id);
    record(
        &state,
        &Actor::new(&claims, &headers),
        ActivityKind::MatchDelete,
        &activity::match_deleted(&existing.title),
    )
    .await?;

    info!("Match deleted");
    Ok(Json(Deleted { deleted }))
}

// =========================================================================
// Users
// =========================================================================

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub filter: Option<Audience>,
    pub search: Option<String>,
    pub page: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPage {
    pub users: Vec<Profile>,
    pub total: i64,
    pub page: u32,
    pub total_pages: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub profile_pic: Option<String>,
    pub telegram_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum XpOp {
    Add,
    Remove,
}

#[derive(Debug, Deserialize)]
pub struct XpChange {
    pub amount: i64,
    pub op: XpOp,
}

#[derive(Debug, Deserialize)]
pub struct PremiumChange {
    pub premium: bool,
}

/// `GET /api/admin/users?filter=&search=&page=`
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<UserPage>, ApiError> {
    let page = query.page.unwrap_or(1).max(1);
    let search = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let (users, total) = state
        .db
        .list_users(&UserQuery {
            filter: query.filter.unwrap_or(Audience::All),
            search,
            page,
            per_page: USERS_PER_PAGE,
        })
        .await?;

    let per_page = i64::from(USERS_PER_PAGE);
    Ok(Json(UserPage {
        users: users.into_iter().map(Profile::from).collect(),
        total,
        page,
        total_pages: (total + per_page - 1) / per_page,
    }))
}

/// `GET /api/admin/users/{id}`
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Profile>, ApiError> {
    Ok(Json(state.db.get_user(&user_id).await?.into()))
}

/// `PATCH /api/admin/users/{id}`: fields left out keep their value.
#[instrument(skip(state, claims, headers, patch), fields(route = "edit_user", user_id = %user_id))]
pub async fn edit_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
    Json(patch): Json<ProfilePatch>,
) -> Result<Json<Profile>, ApiError> {
    let current = state.db.get_user(&user_id).await?;

    let name = patch.name.as_deref().map_or(current.name.as_str(), str::trim);
    let email = match patch.email.as_deref().map(str::trim) {
        Some("") => "",
        Some(email) => validate::email(email)?,
        None => current.email.as_str(),
    };
    let profile_pic = match patch.profile_pic.as_deref() {
        Some(pic) => validate::optional_url(pic)?,
        None => current.profile_pic.as_str(),
    };
    let update = ProfileUpdate {
        name: if name.is_empty() {
            locale::DEFAULT_VIEWER_NAME
        } else {
            name
        },
        email,
        phone: patch.phone.as_deref().map_or(current.phone.as_str(), str::trim),
        profile_pic,
        telegram_id: patch
            .telegram_id
            .as_deref()
            .map_or(current.telegram_id.as_str(), str::trim),
    };

    let updated = state.db.update_profile(&current.id, &update).await?;
    record(
        &state,
        &Actor::new(&claims, &headers),
        ActivityKind::UserEdit,
        &activity::user_edited(&updated.id),
    )
    .await?;

    Ok(Json(updated.into()))
}

/// `DELETE /api/admin/users/{id}?confirm=true`
#[instrument(skip(state, claims, headers, confirm), fields(route = "delete_user", user_id = %user_id))]
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
    Query(confirm): Query<Confirm>,
) -> Result<Json<Deleted>, ApiError> {
    confirm.require()?;
    let existing = state.db.get_user(&user_id).await?;

    let deleted = state.db.delete_user(&existing.id).await?;
    for match_id in state.presence.forget_viewer(&existing.id) {
        match state.db.decrement(Counter::MatchWatching, &match_id, 1).await {
            Ok(_) | Err(DatabaseError::NotFound(_)) => state.meters.viewer_left(),
            Err(e) => return Err(e.into()),
        }
    }
    record(
        &state,
        &Actor::new(&claims, &headers),
        ActivityKind::UserDelete,
        &activity::user_deleted(&existing.name),
    )
    .await?;

    info!("User deleted");
    Ok(Json(Deleted { deleted }))
}

/// `POST /api/admin/users/{id}/xp`
#[instrument(skip(state, claims, headers, change), fields(route = "change_xp", user_id = %user_id))]
pub async fn change_xp(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
    Json(change): Json<XpChange>,
) -> Result<Json<Profile>, ApiError> {
    let amount = validate::xp_amount(change.amount)?;
    let user = state.db.get_user(&user_id).await?;

    let (kind, message) = match change.op {
        XpOp::Add => {
            state.db.increment(Counter::UserXp, &user.id, amount).await?;
            (ActivityKind::XpAdd, activity::xp_added(amount, &user.id))
        }
        XpOp::Remove => {
            state.db.decrement(Counter::UserXp, &user.id, amount).await?;
            (ActivityKind::XpRemove, activity::xp_removed(amount, &user.id))
        }
    };
    record(&state, &Actor::new(&claims, &headers), kind, &message).await?;

    Ok(Json(state.db.get_user(&user.id).await?.into()))
}

/// `POST /api/admin/users/{id}/premium`
#[instrument(skip(state, claims, headers, change), fields(route = "set_premium", user_id = %user_id))]
pub async fn set_premium(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
    Json(change): Json<PremiumChange>,
) -> Result<Json<Profile>, ApiError> {
    let updated = state.db.set_premium(&user_id, change.premium).await?;
    record(
        &state,
        &Actor::new(&claims, &headers),
        ActivityKind::UserEdit,
        &activity::premium_toggled(change.premium, &updated.id),
    )
    .await?;

    Ok(Json(updated.into()))
}

// =========================================================================
// Settings and broadcasts
// =========================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsForm {
    #[serde(default)]
    pub logo_url: String,
    #[serde(default)]
    pub site_title: String,
    #[serde(default)]
    pub telegram_bot: String,
    pub premium_price: i64,
    pub default_xp: i64,
    #[serde(default)]
    pub welcome_message: String,
}

/// `PUT /api/admin/settings`
#[instrument(skip(state, claims, headers, form), fields(route = "update_settings"))]
pub async fn update_settings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
    Json(form): Json<SettingsForm>,
) -> Result<Json<Settings>, ApiError> {
    if form.premium_price <= 0 {
        return Err(ApiError::validation(locale::INVALID_PRICE));
    }
    if form.default_xp <= 0 {
        return Err(ApiError::validation(locale::INVALID_DEFAULT_XP));
    }
    let logo_url = validate::optional_url(&form.logo_url)?;

    let actor = Actor::new(&claims, &headers);
    let settings = state
        .db
        .update_settings(
            &SettingsUpdate {
                logo_url,
                site_title: form.site_title.trim(),
                telegram_bot: form.telegram_bot.trim(),
                premium_price: form.premium_price,
                default_xp: form.default_xp,
                welcome_message: form.welcome_message.trim(),
            },
            &actor.email,
        )
        .await?;
    record(
        &state,
        &actor,
        ActivityKind::Settings,
        activity::SETTINGS_UPDATED,
    )
    .await?;

    Ok(Json(settings))
}

#[derive(Debug, Deserialize)]
pub struct BroadcastForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    pub target: Audience,
}

/// `GET /api/admin/broadcasts`
pub async fn list_broadcasts(
    State(state): State<AppState>,
) -> Result<Json<Vec<Broadcast>>, ApiError> {
    Ok(Json(state.db.recent_broadcasts(BROADCAST_HISTORY).await?))
}

/// `POST /api/admin/broadcasts`
#[instrument(skip(state, claims, headers, form), fields(route = "send_broadcast"))]
pub async fn send_broadcast(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
    Json(form): Json<BroadcastForm>,
) -> Result<(StatusCode, Json<Broadcast>), ApiError> {
    let title = validate::required(&form.title, locale::BROADCAST_FIELDS_REQUIRED)?;
    let message = validate::message(&form.message, locale::BROADCAST_FIELDS_REQUIRED)?;

    let actor = Actor::new(&claims, &headers);
    let broadcast = state
        .db
        .create_broadcast(&NewBroadcast {
            title,
            message,
            target: form.target,
            sent_by: &actor.email,
        })
        .await?;
    record(
        &state,
        &actor,
        ActivityKind::Broadcast,
        &activity::broadcast_sent(&broadcast.title),
    )
    .await?;

    info!(audience = %broadcast.target, "Broadcast sent");
    Ok((StatusCode::CREATED, Json(broadcast)))
}

// =========================================================================
// Activity log
// =========================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ActivityQuery {
    #[serde(rename = "type")]
    pub kind: Option<ActivityKind>,
    #[serde(default)]
    pub period: Period,
}

#[derive(Debug, Serialize)]
pub struct Cleared {
    pub removed: u64,
}

/// `GET /api/admin/activities?type=&period=`
pub async fn list_activities(
    State(state): State<AppState>,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<Vec<Activity>>, ApiError> {
    let since = query.period.since(unix_millis());
    Ok(Json(
        state
            .db
            .list_activities(query.kind, since, Some(ACTIVITY_LIST_LIMIT))
            .await?,
    ))
}

/// `DELETE /api/admin/activities?confirm=true`: drop entries past retention.
#[instrument(skip(state, claims, headers, confirm), fields(route = "clear_activities"))]
pub async fn clear_activities(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
    Query(confirm): Query<Confirm>,
) -> Result<Json<Cleared>, ApiError> {
    confirm.require()?;
    let removed = state
        .db
        .clear_activities_before(unix_millis() - ACTIVITY_RETENTION_MS)
        .await?;
    record(
        &state,
        &Actor::new(&claims, &headers),
        ActivityKind::Settings,
        activity::LOGS_CLEARED,
    )
    .await?;

    info!(removed, "Activity log cleared");
    Ok(Json(Cleared { removed }))
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn activities_csv(activities: &[Activity]) -> String {
    let mut out = String::from("id,type,message,actor,ip,timestamp\n");
    for a in activities {
        let time = DateTime::from_timestamp_millis(a.timestamp)
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();
        let row = [
            a.id.to_string(),
            a.kind.to_string(),
            csv_field(&a.message),
            csv_field(&a.actor),
            csv_field(&a.ip),
            time,
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

/// `GET /api/admin/activities/export?type=&period=`: the filtered log as
/// CSV, without the list cap.
pub async fn export_activities(
    State(state): State<AppState>,
    Query(query): Query<ActivityQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let since = query.period.since(unix_millis());
    let activities = state.db.list_activities(query.kind, since, None).await?;

    Ok((
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8"),
            (CONTENT_DISPOSITION, "attachment; filename=\"activities.csv\""),
        ],
        activities_csv(&activities),
    ))
}

// =========================================================================
// Admin accounts
// =========================================================================

#[derive(Debug, Deserialize)]
pub struct NewAdmin {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// `POST /api/admin/admins`
#[instrument(skip(state, claims, headers, req), fields(route = "create_admin"))]
pub async fn create_admin(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
    Json(req): Json<NewAdmin>,
) -> Result<(StatusCode, Json<Account>), ApiError> {
    let account = create_admin_account(&state.db, &req.email, &req.password).await?;
    record(
        &state,
        &Actor::new(&claims, &headers),
        ActivityKind::UserEdit,
        &activity::admin_created(&account.email),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(account)))
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(title: &str, thumbnail: &str, video_url: &str) -> MatchForm {
        MatchForm {
            title: title.into(),
            thumbnail: thumbnail.into(),
            video_url: video_url.into(),
            category: MatchCategory::Football,
            status: MatchStatus::Active,
            premium_only: false,
        }
    }

    fn message_of(err: ApiError) -> String {
        match err {
            ApiError::Validation(m) => m,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn match_form_trims_and_validates() {
        let f = form("  Final ", "https://img.test/a.jpg", "https://youtu.be/dQw4w9WgXcQ");
        let params = f.params().unwrap();
        assert_eq!(params.title, "Final");

        let err = form(" ", "https://img.test/a.jpg", "https://v.test/x").params().unwrap_err();
        assert_eq!(message_of(err), locale::TITLE_REQUIRED);

        let err = form("Final", "", "https://v.test/x").params().unwrap_err();
        assert_eq!(message_of(err), locale::THUMBNAIL_REQUIRED);

        let err = form("Final", "https://img.test/a.jpg", "").params().unwrap_err();
        assert_eq!(message_of(err), locale::VIDEO_URL_REQUIRED);

        let err = form("Final", "img.jpg", "https://v.test/x").params().unwrap_err();
        assert_eq!(message_of(err), locale::INVALID_URL);
    }

    #[test]
    fn confirm_flag_gate() {
        assert!(matches!(
            Confirm::default().require(),
            Err(ApiError::ConfirmationRequired)
        ));
        assert!(Confirm { confirm: true }.require().is_ok());
    }

    #[test]
    fn csv_quotes_only_when_needed() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn csv_export_has_header_and_rows() {
        let rows = [Activity {
            id: 7,
            kind: ActivityKind::MatchAdd,
            message: "ম্যাচ যোগ, final".into(),
            actor: "admin@toto.live".into(),
            ip: String::new(),
            timestamp: 0,
        }];
        let csv = activities_csv(&rows);
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("id,type,message,actor,ip,timestamp"));
        assert_eq!(
            lines.next(),
            Some("7,match_add,\"ম্যাচ যোগ, final\",admin@toto.live,,1970-01-01T00:00:00+00:00")
        );
        assert_eq!(lines.next(), None);
    }
}
