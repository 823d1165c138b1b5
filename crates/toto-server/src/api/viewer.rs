//! Viewer surface: bootstrap, matches, presence, chat, leaderboard.

use std::convert::Infallible;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use toto_core::db::unix_millis;
use toto_core::leaderboard::{self, Leaderboard};
use toto_core::video::{self, Embed};
use toto_core::{MatchStatus, locale, validate};
use tracing::{debug, info, instrument};

use super::error::ApiError;
use super::state::AppState;
use super::views::{LeaderEntry, MatchView, Profile};
use crate::presence::Presence;
use crate::storage::{Broadcast, ChatMessage, Counter, Match, NewChatMessage, NewUser, Settings, User};

/// XP granted once when a viewer subscribes to premium.
pub const PREMIUM_BONUS_XP: i64 = 1000;
pub const BROADCAST_HISTORY: u32 = 10;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerQuery {
    pub viewer_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerBody {
    pub viewer_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatBody {
    pub viewer_id: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapResponse {
    #[serde(flatten)]
    pub profile: Profile,
    pub created: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchList {
    pub matches: Vec<MatchView>,
    pub total_watching: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenMatch {
    #[serde(rename = "match")]
    pub inner: MatchView,
    pub embed: Embed,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinResponse {
    pub joined: bool,
    pub watching: i64,
}

#[derive(Debug, Serialize)]
pub struct HeartbeatResponse {
    pub alive: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveResponse {
    pub left: bool,
    pub watching: i64,
}

#[derive(Debug, Serialize)]
pub struct PresenceResponse {
    pub count: usize,
    pub viewers: Vec<Presence>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_watching: i64,
    pub online_users: i64,
}

/// Fail unless `viewer` may watch `m`.
fn ensure_access(m: &Match, viewer: Option<&User>) -> Result<(), ApiError> {
    if m.premium_only && !viewer.is_some_and(|u| u.premium) {
        return Err(ApiError::PremiumRequired);
    }
    Ok(())
}

/// Load a match viewers may see. Inactive and upcoming matches are hidden.
async fn active_match(state: &AppState, match_id: &str) -> Result<Match, ApiError> {
    let m = state.db.get_match(match_id).await?;
    if m.status != MatchStatus::Active {
        return Err(ApiError::NotFound(format!("Match {match_id}")));
    }
    Ok(m)
}

async fn viewer(state: &AppState, viewer_id: &str) -> Result<User, ApiError> {
    let viewer_id = validate::viewer_id(viewer_id)?;
    Ok(state.db.get_user(viewer_id).await?)
}

async fn bootstrap(state: &AppState, viewer_id: &str) -> Result<(User, bool), ApiError> {
    let settings = state.db.get_settings().await?;
    let (user, created) = state
        .db
        .upsert_user(&NewUser {
            id: viewer_id,
            name: locale::DEFAULT_VIEWER_NAME,
            profile_pic: locale::DEFAULT_AVATAR,
            xp: settings.default_xp,
        })
        .await?;
    if created {
        info!(viewer_id, "Viewer created");
    }
    Ok((user, created))
}

// =========================================================================
// Viewer identity
// =========================================================================

/// `POST /api/viewers`: mint a fresh anonymous viewer.
#[instrument(skip(state), fields(route = "create_viewer"))]
pub async fn create_viewer(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<BootstrapResponse>), ApiError> {
    let id = validate::mint_viewer_id(unix_millis(), uuid::Uuid::new_v4().as_u128());
    let (user, created) = bootstrap(&state, &id).await?;
    Ok((
        StatusCode::CREATED,
        Json(BootstrapResponse {
            profile: user.into(),
            created,
        }),
    ))
}

/// `PUT /api/viewers/{id}`: create if absent, otherwise mark as seen.
#[instrument(skip(state), fields(route = "bootstrap_viewer"))]
pub async fn bootstrap_viewer(
    State(state): State<AppState>,
    Path(viewer_id): Path<String>,
) -> Result<Json<BootstrapResponse>, ApiError> {
    let viewer_id = validate::viewer_id(&viewer_id)?;
    let (user, created) = bootstrap(&state, viewer_id).await?;
    Ok(Json(BootstrapResponse {
        profile: user.into(),
        created,
    }))
}

/// `GET /api/viewers/{id}`
pub async fn get_viewer(
    State(state): State<AppState>,
    Path(viewer_id): Path<String>,
) -> Result<Json<Profile>, ApiError> {
    Ok(Json(viewer(&state, &viewer_id).await?.into()))
}

/// `POST /api/viewers/{id}/premium`: subscribe. The bonus is granted once;
/// subscribing again is a no-op.
#[instrument(skip(state), fields(route = "subscribe_premium"))]
pub async fn subscribe_premium(
    State(state): State<AppState>,
    Path(viewer_id): Path<String>,
) -> Result<Json<Profile>, ApiError> {
    let user = viewer(&state, &viewer_id).await?;
    if !state.db.grant_premium(&user.id).await? {
        return Ok(Json(state.db.get_user(&user.id).await?.into()));
    }

    state
        .db
        .increment(Counter::UserXp, &user.id, PREMIUM_BONUS_XP)
        .await?;

    info!(viewer_id = %user.id, "Premium subscription activated");
    Ok(Json(state.db.get_user(&user.id).await?.into()))
}

/// `GET /api/viewers/{id}/broadcasts`
pub async fn viewer_broadcasts(
    State(state): State<AppState>,
    Path(viewer_id): Path<String>,
) -> Result<Json<Vec<Broadcast>>, ApiError> {
    let user = viewer(&state, &viewer_id).await?;
    Ok(Json(state.db.broadcasts_for(&user, BROADCAST_HISTORY).await?))
}

// =========================================================================
// Public
// =========================================================================

/// `GET /api/settings`
pub async fn get_settings(State(state): State<AppState>) -> Result<Json<Settings>, ApiError> {
    Ok(Json(state.db.get_settings().await?))
}

/// `GET /api/stats`
pub async fn stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, ApiError> {
    let (total_watching, online_users) = state.db.public_stats().await?;
    Ok(Json(StatsResponse {
        total_watching,
        online_users,
    }))
}

// =========================================================================
// Matches and presence
// =========================================================================

/// `GET /api/matches`: active matches only.
pub async fn list_matches(State(state): State<AppState>) -> Result<Json<MatchList>, ApiError> {
    let matches = state.db.list_matches_with_status(MatchStatus::Active).await?;
    let total_watching = matches.iter().map(|m| m.watching).sum();
    Ok(Json(MatchList {
        matches: matches.into_iter().map(MatchView::from).collect(),
        total_watching,
    }))
}

/// `GET /api/matches/{id}?viewerId=`: the match and how to play it.
pub async fn open_match(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
    Query(query): Query<ViewerQuery>,
) -> Result<Json<OpenMatch>, ApiError> {
    let m = active_match(&state, &match_id).await?;
    let user = match query.viewer_id.as_deref() {
        Some(id) => Some(viewer(&state, id).await?),
        None => None,
    };
    ensure_access(&m, user.as_ref())?;

    let embed = video::resolve(&m.video_url);
    Ok(Json(OpenMatch {
        inner: m.into(),
        embed,
    }))
}

/// `POST /api/matches/{id}/join`
#[instrument(skip(state, body), fields(route = "join", match_id = %match_id))]
pub async fn join(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
    Json(body): Json<ViewerBody>,
) -> Result<Json<JoinResponse>, ApiError> {
    let m = active_match(&state, &match_id).await?;
    let user = viewer(&state, &body.viewer_id).await?;
    ensure_access(&m, Some(&user))?;

    // The record and the counter slot are separate: a chat stream or an
    // expired lease can drop the record while the slot is still held.
    state.presence.join(&m.id, &user.id, &user.name);
    if !state.presence.count_in(&m.id, &user.id) {
        return Ok(Json(JoinResponse {
            joined: false,
            watching: m.watching,
        }));
    }

    let watching = state.db.increment(Counter::MatchWatching, &m.id, 1).await?;
    state
        .db
        .increment(Counter::UserTotalWatched, &user.id, 1)
        .await?;
    state.db.touch_user(&user.id).await?;
    state.meters.viewer_joined();

    debug!(viewer_id = %user.id, watching, "Viewer joined");
    Ok(Json(JoinResponse {
        joined: true,
        watching,
    }))
}

/// `POST /api/matches/{id}/heartbeat`
pub async fn heartbeat(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
    Json(body): Json<ViewerBody>,
) -> Result<Json<HeartbeatResponse>, ApiError> {
    let viewer_id = validate::viewer_id(&body.viewer_id)?;
    let alive = state.presence.heartbeat(&match_id, viewer_id);
    if alive {
        state.db.touch_user(viewer_id).await?;
    }
    Ok(Json(HeartbeatResponse { alive }))
}

/// `POST /api/matches/{id}/leave`
#[instrument(skip(state, body), fields(route = "leave", match_id = %match_id))]
pub async fn leave(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
    Json(body): Json<ViewerBody>,
) -> Result<Json<LeaveResponse>, ApiError> {
    let viewer_id = validate::viewer_id(&body.viewer_id)?;
    state.presence.leave(&match_id, viewer_id);
    if !state.presence.count_out(&match_id, viewer_id) {
        let watching = state.db.get_match(&match_id).await?.watching;
        return Ok(Json(LeaveResponse {
            left: false,
            watching,
        }));
    }

    let watching = state.db.decrement(Counter::MatchWatching, &match_id, 1).await?;
    state.meters.viewer_left();

    debug!(viewer_id, watching, "Viewer left");
    Ok(Json(LeaveResponse {
        left: true,
        watching,
    }))
}

/// `GET /api/matches/{id}/presence`
pub async fn presence(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
) -> Result<Json<PresenceResponse>, ApiError> {
    let viewers = state.presence.viewers(&match_id);
    Ok(Json(PresenceResponse {
        count: viewers.len(),
        viewers,
    }))
}

// =========================================================================
// Chat
// =========================================================================

/// `GET /api/matches/{id}/chat`: recent history, oldest first.
pub async fn chat_history(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    let m = state.db.get_match(&match_id).await?;
    let history = state
        .db
        .recent_chat(&m.id, state.config.chat.history_limit)
        .await?;
    Ok(Json(history))
}

/// `POST /api/matches/{id}/chat`
#[instrument(skip(state, body), fields(route = "post_chat", match_id = %match_id))]
pub async fn post_chat(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
    Json(body): Json<ChatBody>,
) -> Result<(StatusCode, Json<ChatMessage>), ApiError> {
    let text = validate::message(&body.text, locale::MESSAGE_REQUIRED)?;
    let user = viewer(&state, &body.viewer_id).await?;
    let m = state.db.get_match(&match_id).await?;

    let message = state
        .db
        .append_chat(&NewChatMessage {
            match_id: &m.id,
            user_id: &user.id,
            name: &user.name,
            avatar: &user.profile_pic,
            text,
            premium: user.premium,
        })
        .await?;
    state.chat.publish(&message);

    state
        .db
        .increment(Counter::UserXp, &user.id, state.config.chat.xp_per_message)
        .await?;
    state
        .db
        .increment(Counter::UserTotalChats, &user.id, 1)
        .await?;
    state.db.touch_user(&user.id).await?;
    state.meters.chat_message();

    Ok((StatusCode::CREATED, Json(message)))
}

/// `GET /api/matches/{id}/chat/stream?viewerId=`: live chat as SSE.
///
/// The open stream also holds the viewer's presence; closing it removes
/// the record.
pub async fn chat_stream(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
    Query(query): Query<ViewerQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let viewer_id = query
        .viewer_id
        .ok_or_else(|| ApiError::validation(locale::INVALID_VIEWER_ID))?;
    let user = viewer(&state, &viewer_id).await?;
    let m = active_match(&state, &match_id).await?;
    ensure_access(&m, Some(&user))?;

    let rx = state.chat.subscribe(&m.id);
    let guard = state.presence.attach(&m.id, &user.id, &user.name);
    debug!(match_id = %m.id, viewer_id = %user.id, "Chat stream opened");

    let stream = BroadcastStream::new(rx)
        .filter_map(Result::ok)
        .filter_map(move |msg| {
            let _held = &guard;
            Event::default().event("message").json_data(&msg).ok()
        })
        .map(Ok);

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

// =========================================================================
// Leaderboard
// =========================================================================

/// `GET /api/leaderboard?viewerId=`
pub async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<ViewerQuery>,
) -> Result<Json<Leaderboard<LeaderEntry>>, ApiError> {
    let users = state.db.top_users(state.config.leaderboard.limit).await?;
    let entries = users.into_iter().map(LeaderEntry::from).collect();
    Ok(Json(leaderboard::rank(entries, query.viewer_id.as_deref())))
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use toto_core::MatchCategory;

    fn a_match(premium_only: bool) -> Match {
        Match {
            id: "m1".into(),
            title: "Derby".into(),
            thumbnail: String::new(),
            video_url: String::new(),
            category: MatchCategory::Cricket,
            status: MatchStatus::Active,
            premium_only,
            watching: 0,
            created_at: 0,
            created_by: String::new(),
            updated_at: 0,
            version: 0,
        }
    }

    fn a_user(premium: bool) -> User {
        User {
            id: "user_1_a".into(),
            name: String::new(),
            email: String::new(),
            phone: String::new(),
            profile_pic: String::new(),
            xp: 0,
            premium,
            premium_since: premium.then_some(1),
            telegram_id: String::new(),
            total_watched: 0,
            total_chats: 0,
            last_seen: 0,
            created_at: 0,
            version: 0,
        }
    }

    #[test]
    fn premium_gate() {
        assert!(ensure_access(&a_match(false), None).is_ok());
        assert!(matches!(
            ensure_access(&a_match(true), None),
            Err(ApiError::PremiumRequired)
        ));
        assert!(matches!(
            ensure_access(&a_match(true), Some(&a_user(false))),
            Err(ApiError::PremiumRequired)
        ));
        assert!(ensure_access(&a_match(true), Some(&a_user(true))).is_ok());
    }
}
