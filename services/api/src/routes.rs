//! HTTP surface of the storyteller.
//!
//! Every route is served under `/api` and, for the older frontend, at the
//! bare path as well.
use crate::error::ApiError;
use crate::state::AppState;
use axum::body::Body;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use storyteller_core::archive::ArchivedScene;
use storyteller_core::background::BackgroundImage;
use storyteller_core::session::SessionHandle;
use storyteller_core::turn::TurnInput;
use storyteller_core::{GameSetup, SceneReply, Session, StoryError};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

type JsonBody<T> = Result<Json<T>, JsonRejection>;

#[derive(Debug, Deserialize)]
pub struct RunStepRequest {
    assistant_id: Option<String>,
    thread_id: Option<String>,
    message: Option<String>,
    #[serde(default)]
    is_buffer: bool,
}

#[derive(Debug, Deserialize)]
pub struct SessionRequest {
    assistant_id: Option<String>,
    thread_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SceneRequest {
    scene_id: Option<u64>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VoiceRequest {
    text: Option<String>,
    voice: Option<String>,
    model: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GeneratedScenes {
    scenes: Vec<ArchivedScene>,
}

pub fn router(state: AppState) -> Router {
    let mut routes = Router::new()
        .route("/setup_game", post(setup_game))
        .route("/run_step", post(run_step))
        .route("/end_game", post(end_game))
        .route("/generate_background", post(generate_background))
        .route("/voice", post(voice));
    if state.archive.is_some() {
        routes = routes
            .route("/scene/{scene_id}", get(load_scene))
            .route("/generate", post(generate_scenes));
    }

    // The frontend is served from a different origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", routes.clone())
        .merge(routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn session_from(assistant_id: Option<String>, thread_id: Option<String>) -> Result<Session, StoryError> {
    let assistant_id = assistant_id
        .filter(|id| !id.trim().is_empty())
        .ok_or(StoryError::MissingField("assistant_id"))?;
    let thread_id = thread_id
        .filter(|id| !id.trim().is_empty())
        .ok_or(StoryError::MissingField("thread_id"))?;
    Ok(Session {
        assistant_id,
        thread_id,
    })
}

async fn setup_game(State(state): State<AppState>, body: JsonBody<GameSetup>) -> Result<Json<SessionHandle>, ApiError> {
    let Json(setup) = body?;
    let handle = state.sessions.create(&setup).await?;
    Ok(Json(handle))
}

async fn run_step(State(state): State<AppState>, body: JsonBody<RunStepRequest>) -> Result<Json<SceneReply>, ApiError> {
    let Json(request) = body?;
    let session = session_from(request.assistant_id, request.thread_id)?;
    let message = request.message.ok_or(StoryError::MissingField("message"))?;
    let input = TurnInput {
        message,
        speculative: request.is_buffer,
    };
    let scene = state.turns.run_turn(&session, &input).await?;
    Ok(Json(scene))
}

async fn end_game(State(state): State<AppState>, body: JsonBody<SessionRequest>) -> Result<Json<Value>, ApiError> {
    let Json(request) = body?;
    let session = session_from(request.assistant_id, request.thread_id)?;
    state.sessions.destroy(&session).await?;
    Ok(Json(json!({ "status": "deleted" })))
}

async fn generate_background(
    State(state): State<AppState>,
    body: JsonBody<SceneRequest>,
) -> Result<Json<BackgroundImage>, ApiError> {
    let Json(request) = body?;
    let image = state
        .backgrounds
        .request(request.scene_id, request.description.as_deref())
        .await?;
    Ok(Json(image))
}

async fn voice(State(state): State<AppState>, body: JsonBody<VoiceRequest>) -> Result<Response, ApiError> {
    let Json(request) = body?;
    let text = request.text.unwrap_or_default();
    let stream = state
        .speech
        .stream(&text, request.voice.as_deref(), request.model.as_deref())
        .await?;
    Ok(([(header::CONTENT_TYPE, "audio/mpeg")], Body::from_stream(stream)).into_response())
}

async fn load_scene(
    State(state): State<AppState>,
    path: Result<Path<u64>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let Path(scene_id) = path?;
    let archive = state.archive.ok_or(StoryError::SceneNotFound(scene_id))?;
    let scene = archive.load(scene_id).await?;
    Ok(Json(scene))
}

async fn generate_scenes(
    State(state): State<AppState>,
    body: JsonBody<SceneRequest>,
) -> Result<Json<GeneratedScenes>, ApiError> {
    let Json(request) = body?;
    let scene_id = request.scene_id.ok_or(StoryError::MissingField("scene_id"))?;
    let description = request.description.ok_or(StoryError::MissingField("description"))?;
    let archive = state.archive.ok_or(StoryError::SceneNotFound(scene_id))?;
    let scenes = archive.generate_branches(scene_id, &description).await?;
    Ok(Json(GeneratedScenes { scenes }))
}
