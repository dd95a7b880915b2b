use std::collections::HashSet;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing;
use axum::{Json, Router};
use axum_session::Session;
use axum_session_sqlx::SessionSqlitePool;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use agora_auth::session::SESSION_USERNAME_KEY;
use agora_auth::user::User;
use agora_core::aggregation::DisplayPost;
use agora_core::category::{list_categories, Category};
use agora_core::comment::{self, Comment};
use agora_core::moderation::{
    self, CandidacyDecision, ContentState, FlagDecision, ModerationPanel, ModerationRequest,
};
use agora_core::page::{load_filtered_page, load_forum_page, load_reported_posts, ForumPage, PageScope};
use agora_core::post::{self, Post};
use agora_core::vote::{vote_on_content, VoteCount, VoteDirection, VoteTarget};

use crate::error::ApiError;
use crate::state::AppState;
use crate::viewer::Viewer;

#[derive(Debug, Default, Deserialize)]
pub struct PostQuery {
    #[serde(default)]
    pub scope: PageScope,
}

#[derive(Debug, Deserialize)]
pub struct FilterRequest {
    pub category_ids: HashSet<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub content: String,
    #[serde(default)]
    pub category_ids: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub post_id: i64,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub target: VoteTarget,
    pub direction: VoteDirection,
}

#[derive(Debug, Deserialize)]
pub struct ReportRequest {
    pub post_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct ResolveReportRequest {
    pub post_id: i64,
    pub decision: FlagDecision,
}

#[derive(Debug, Deserialize)]
pub struct ResolveModerationRequest {
    pub username: String,
    pub decision: CandidacyDecision,
}

#[derive(Debug, Deserialize)]
pub struct RevokeModeratorRequest {
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    #[serde(default)]
    pub apply_for_moderation: bool,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user: User,
    pub moderation_request: Option<ModerationRequest>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/register", routing::post(register))
        .route("/api/logout", routing::post(logout))
        .route("/api/categories", routing::get(get_categories))
        .route("/api/posts", routing::get(get_posts).post(create_post))
        .route("/api/posts/filter", routing::post(filter_posts))
        .route("/api/comments", routing::post(create_comment))
        .route("/api/votes", routing::post(vote))
        .route("/api/reports", routing::get(get_reports).post(report_post))
        .route("/api/reports/resolve", routing::post(resolve_report))
        .route("/api/moderation/apply", routing::post(apply_for_moderation))
        .route("/api/admin/moderation", routing::get(get_moderation_panel))
        .route("/api/admin/moderation/resolve", routing::post(resolve_moderation))
        .route("/api/admin/moderators/revoke", routing::post(revoke_moderator))
}

async fn register(
    State(app_state): State<AppState>,
    session: Session<SessionSqlitePool>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let (user, moderation_request) = moderation::register_user(
        &request.username,
        request.apply_for_moderation,
        &app_state.db_pool,
    ).await?;
    session.set(SESSION_USERNAME_KEY, user.username.clone());
    log::info!("Registered user {}", user.username);
    Ok((StatusCode::CREATED, Json(RegisterResponse { user, moderation_request })))
}

async fn logout(session: Session<SessionSqlitePool>) -> StatusCode {
    session.remove(SESSION_USERNAME_KEY);
    StatusCode::NO_CONTENT
}

async fn get_categories(
    State(app_state): State<AppState>,
) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(list_categories(&app_state.db_pool).await?))
}

async fn get_posts(
    State(app_state): State<AppState>,
    Viewer(viewer): Viewer,
    Query(query): Query<PostQuery>,
) -> Result<Json<ForumPage>, ApiError> {
    let forum_page = load_forum_page(query.scope, viewer.as_ref(), Utc::now(), &app_state.db_pool).await?;
    Ok(Json(forum_page))
}

async fn filter_posts(
    State(app_state): State<AppState>,
    Viewer(viewer): Viewer,
    Json(request): Json<FilterRequest>,
) -> Result<Json<ForumPage>, ApiError> {
    let forum_page = load_filtered_page(&request.category_ids, viewer.as_ref(), Utc::now(), &app_state.db_pool).await?;
    Ok(Json(forum_page))
}

async fn create_post(
    State(app_state): State<AppState>,
    Viewer(viewer): Viewer,
    Json(request): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<Post>), ApiError> {
    let post = post::create_post(&request.content, &request.category_ids, viewer.as_ref(), &app_state.db_pool).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

async fn create_comment(
    State(app_state): State<AppState>,
    Viewer(viewer): Viewer,
    Json(request): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    let comment = comment::create_comment(request.post_id, &request.content, viewer.as_ref(), &app_state.db_pool).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn vote(
    State(app_state): State<AppState>,
    Viewer(viewer): Viewer,
    Json(request): Json<VoteRequest>,
) -> Result<Json<VoteCount>, ApiError> {
    let vote_count = vote_on_content(request.target, request.direction, viewer.as_ref(), &app_state.db_pool).await?;
    Ok(Json(vote_count))
}

async fn report_post(
    State(app_state): State<AppState>,
    Viewer(viewer): Viewer,
    Json(request): Json<ReportRequest>,
) -> Result<Json<ContentState>, ApiError> {
    let content_state = moderation::flag_post(request.post_id, viewer.as_ref(), &app_state.db_pool).await?;
    Ok(Json(content_state))
}

async fn get_reports(
    State(app_state): State<AppState>,
    Viewer(viewer): Viewer,
) -> Result<Json<Vec<DisplayPost>>, ApiError> {
    let display_post_vec = load_reported_posts(viewer.as_ref(), Utc::now(), &app_state.db_pool).await?;
    Ok(Json(display_post_vec))
}

async fn resolve_report(
    State(app_state): State<AppState>,
    Viewer(viewer): Viewer,
    Json(request): Json<ResolveReportRequest>,
) -> Result<Json<ContentState>, ApiError> {
    let content_state = moderation::resolve_flag(request.post_id, request.decision, viewer.as_ref(), &app_state.db_pool).await?;
    Ok(Json(content_state))
}

async fn apply_for_moderation(
    State(app_state): State<AppState>,
    Viewer(viewer): Viewer,
) -> Result<Json<ModerationRequest>, ApiError> {
    let moderation_request = moderation::apply_for_moderation(viewer.as_ref(), &app_state.db_pool).await?;
    Ok(Json(moderation_request))
}

async fn get_moderation_panel(
    State(app_state): State<AppState>,
    Viewer(viewer): Viewer,
) -> Result<Json<ModerationPanel>, ApiError> {
    let moderation_panel = moderation::load_moderation_panel(viewer.as_ref(), &app_state.db_pool).await?;
    Ok(Json(moderation_panel))
}

async fn resolve_moderation(
    State(app_state): State<AppState>,
    Viewer(viewer): Viewer,
    Json(request): Json<ResolveModerationRequest>,
) -> Result<Json<ModerationRequest>, ApiError> {
    let moderation_request = moderation::resolve_moderation_request(
        &request.username,
        request.decision,
        viewer.as_ref(),
        &app_state.db_pool,
    ).await?;
    Ok(Json(moderation_request))
}

async fn revoke_moderator(
    State(app_state): State<AppState>,
    Viewer(viewer): Viewer,
    Json(request): Json<RevokeModeratorRequest>,
) -> Result<Json<User>, ApiError> {
    let user = moderation::revoke_moderator(&request.username, viewer.as_ref(), &app_state.db_pool).await?;
    Ok(Json(user))
}
