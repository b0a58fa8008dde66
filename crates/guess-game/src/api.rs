//! HTTP API for the guessing game.
//!
//! Players are identified by the `x-player-id` header. Starting a game
//! without one assigns a fresh identity, returned in the response body and
//! header.
//!
//! # Endpoints
//!
//! - `POST /api/game/start` - Start (or restart) the player's game
//! - `POST /api/game/guess` - Submit a guess (`{"number": 42}` or `number=42`)
//! - `GET /api/game/status` - Get the player's game state
//! - `POST /api/table` - Multiplication table for a number
//! - `GET|POST /api/dispatch` - Single-endpoint router selecting the
//!   exercise and action from parameters
//!
//! # Example
//!
//! ```no_run
//! use guess_game::{create_router, AppState, Config};
//!
//! # async fn example() {
//! let router = create_router(AppState::new(Config::default()));
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await.unwrap();
//! axum::serve(listener, router).await.unwrap();
//! # }
//! ```

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{
        rejection::QueryRejection, FromRequest, FromRequestParts, Query, Request, State,
    },
    http::{header::CONTENT_TYPE, request::Parts, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::{
    game::{self, GuessOutcome, GuessVerdict, StateSnapshot},
    random::{SecretSource, ThreadRngSource},
    store::{PlayerId, SessionStore},
    table::{multiplication_table, MultiplicationTable},
    Config, GameError,
};

/// Header carrying the player identity.
pub const PLAYER_ID_HEADER: &str = "x-player-id";

// ============================================================================
// Request/Response Types
// ============================================================================

/// A number as submitted by a client.
///
/// JSON integers, JSON floats and numeric strings are all accepted. Form
/// fields always arrive as text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumberInput {
    /// A JSON integer.
    Integer(i64),
    /// A JSON float, or an integer too large for `i64`.
    Float(f64),
    /// A string that may hold a number.
    Text(String),
}

impl NumberInput {
    /// The value as an integer, truncating any fractional part.
    ///
    /// Returns `None` for text that is not numeric and for non-finite values.
    ///
    /// # Examples
    ///
    /// ```
    /// use guess_game::NumberInput;
    ///
    /// assert_eq!(NumberInput::Text(" 42 ".into()).as_integer(), Some(42));
    /// assert_eq!(NumberInput::Float(42.9).as_integer(), Some(42));
    /// assert_eq!(NumberInput::Text("abc".into()).as_integer(), None);
    /// ```
    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            Self::Float(f) => truncate(*f),
            Self::Text(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(truncate))
            }
        }
    }

    /// The value as a finite float.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Integer(n) => Some(*n as f64),
            Self::Float(f) => Some(*f).filter(|f| f.is_finite()),
            Self::Text(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn truncate(value: f64) -> Option<i64> {
    value.is_finite().then(|| value.trunc() as i64)
}

/// Request body carrying a single number.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NumberRequest {
    /// The submitted number.
    #[serde(default)]
    pub number: Option<NumberInput>,
}

/// Parameters of the single-endpoint router.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DispatchRequest {
    /// Which exercise to run: `table` or `guess`.
    #[serde(default)]
    pub exercise: Option<String>,
    /// What to do within the exercise.
    #[serde(default)]
    pub action: Option<String>,
    /// Number for `table/generate` and `guess/guess`.
    #[serde(default)]
    pub number: Option<NumberInput>,
}

/// Response body for a started game.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    /// Identity the game is stored under.
    pub player_id: PlayerId,
    /// State of the fresh game.
    #[serde(flatten)]
    pub state: StateSnapshot,
}

/// Response body for the multiplication table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableResponse {
    /// Human readable summary.
    pub message: String,
    /// The number the table was built for.
    pub base: f64,
    /// Products `base * 1` through `base * 25`, five per row.
    pub table: MultiplicationTable,
}

/// Error response body returned on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Description of the error.
    pub error: String,
}

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for the HTTP server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,
    /// Every player's game session.
    pub sessions: Arc<SessionStore>,
    /// Source of secrets for new games.
    pub secrets: Arc<dyn SecretSource>,
}

impl AppState {
    /// Creates a new `AppState` drawing secrets from the thread RNG.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self::with_secret_source(config, Arc::new(ThreadRngSource::new()))
    }

    /// Creates a new `AppState` with a specific secret source.
    #[must_use]
    pub fn with_secret_source(config: Config, secrets: Arc<dyn SecretSource>) -> Self {
        let sessions = Arc::new(SessionStore::new(config.consistency));
        Self {
            config,
            sessions,
            secrets,
        }
    }
}

// ============================================================================
// API Error Type
// ============================================================================

/// Error type for API handlers.
#[derive(Debug)]
pub enum ApiError {
    /// The request was malformed or had invalid parameters.
    BadRequest(String),
    /// The requested exercise does not exist.
    NotFound(String),
    /// The action requires a different HTTP method.
    MethodNotAllowed(String),
    /// Something failed on the server side.
    Internal(String),
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }
}

impl From<GameError> for ApiError {
    fn from(err: GameError) -> Self {
        if err.is_client_error() {
            Self::BadRequest(err.to_string())
        } else {
            Self::Internal(err.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::MethodNotAllowed(msg) => (StatusCode::METHOD_NOT_ALLOWED, msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}

// ============================================================================
// Extractors
// ============================================================================

/// The player identity from the `x-player-id` header, if present.
#[derive(Debug, Clone)]
pub struct Player(pub Option<PlayerId>);

#[async_trait]
impl<S> FromRequestParts<S> for Player
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(PLAYER_ID_HEADER) else {
            return Ok(Self(None));
        };
        let value = value
            .to_str()
            .map_err(|_| ApiError::bad_request("x-player-id header is not valid text"))?;
        Ok(Self(Some(PlayerId::new(value)?)))
    }
}

/// A body decoded from JSON, or from a form when the request is
/// `application/x-www-form-urlencoded`.
#[derive(Debug, Clone)]
pub struct JsonOrForm<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonOrForm<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"));

        if is_form {
            let Form(value) = Form::<T>::from_request(req, state)
                .await
                .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
            Ok(Self(value))
        } else {
            let Json(value) = Json::<T>::from_request(req, state)
                .await
                .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
            Ok(Self(value))
        }
    }
}

// ============================================================================
// Router Setup
// ============================================================================

/// Creates the HTTP router with all API endpoints.
///
/// The router carries CORS middleware allowing any origin and tracing
/// middleware for request logging.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/game/start", post(handle_start))
        .route("/game/guess", post(handle_guess))
        .route("/game/status", get(handle_status))
        .route("/table", post(handle_table))
        .route(
            "/dispatch",
            get(handle_dispatch_query).post(handle_dispatch_body),
        );

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(Arc::new(state))
}

// ============================================================================
// Handlers
// ============================================================================

/// Handler for `POST /api/game/start`.
async fn handle_start(
    State(state): State<Arc<AppState>>,
    Player(player): Player,
) -> Result<Response, ApiError> {
    start_game(&state, player).await
}

/// Handler for `POST /api/game/guess`.
async fn handle_guess(
    State(state): State<Arc<AppState>>,
    Player(player): Player,
    JsonOrForm(request): JsonOrForm<NumberRequest>,
) -> Result<Response, ApiError> {
    submit_guess(&state, player, request.number).await
}

/// Handler for `GET /api/game/status`.
async fn handle_status(
    State(state): State<Arc<AppState>>,
    Player(player): Player,
) -> Json<StateSnapshot> {
    Json(game_status(&state, player).await)
}

/// Handler for `POST /api/table`.
async fn handle_table(
    JsonOrForm(request): JsonOrForm<NumberRequest>,
) -> Result<Json<TableResponse>, ApiError> {
    build_table(request.number).map(Json)
}

/// Handler for `GET /api/dispatch`.
async fn handle_dispatch_query(
    State(state): State<Arc<AppState>>,
    player: Player,
    query: Result<Query<DispatchRequest>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(request) = query.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    dispatch(&state, &Method::GET, player, request).await
}

/// Handler for `POST /api/dispatch`.
async fn handle_dispatch_body(
    State(state): State<Arc<AppState>>,
    player: Player,
    JsonOrForm(request): JsonOrForm<DispatchRequest>,
) -> Result<Response, ApiError> {
    dispatch(&state, &Method::POST, player, request).await
}

// ============================================================================
// Actions
// ============================================================================

async fn start_game(state: &AppState, player: Option<PlayerId>) -> Result<Response, ApiError> {
    let player = player.unwrap_or_else(PlayerId::generate);
    let secrets = Arc::clone(&state.secrets);

    let snapshot = state
        .sessions
        .update(&player, |slot| game::start(slot, secrets.as_ref()))
        .await
        .map_err(|e| {
            warn!(player = %player, error = %e, "Failed to start game");
            ApiError::from(e)
        })?;

    info!(player = %player, "Game started");

    let header = HeaderValue::from_str(player.as_str())
        .map_err(|e| ApiError::Internal(format!("cannot encode player id header: {e}")))?;
    let body = StartResponse {
        player_id: player,
        state: snapshot,
    };
    Ok(([(PLAYER_ID_HEADER, header)], Json(body)).into_response())
}

async fn submit_guess(
    state: &AppState,
    player: Option<PlayerId>,
    number: Option<NumberInput>,
) -> Result<Response, ApiError> {
    let Some(number) = number else {
        return Err(ApiError::bad_request("missing parameter 'number'"));
    };
    let Some(value) = number.as_integer() else {
        warn!(number = ?number, "Rejected non-numeric guess");
        return Err(ApiError::bad_request("parameter 'number' is not numeric"));
    };

    let outcome: GuessOutcome = match &player {
        Some(player) => {
            state
                .sessions
                .update(player, |slot| game::submit_guess(slot, value))
                .await
        }
        None => game::submit_guess(&mut None, value),
    };

    if outcome.error {
        warn!(
            player = ?player.as_ref().map(PlayerId::as_str),
            value,
            verdict = ?outcome.verdict,
            "Guess rejected"
        );
    } else {
        info!(
            player = ?player.as_ref().map(PlayerId::as_str),
            attempts = outcome.attempts,
            verdict = ?outcome.verdict,
            "Guess processed"
        );
    }

    let status = if outcome.verdict == GuessVerdict::OutOfRange {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::OK
    };
    Ok((status, Json(outcome)).into_response())
}

async fn game_status(state: &AppState, player: Option<PlayerId>) -> StateSnapshot {
    let session = match &player {
        Some(player) => state.sessions.load(player).await,
        None => None,
    };
    game::get_state(session.as_ref())
}

fn build_table(number: Option<NumberInput>) -> Result<TableResponse, ApiError> {
    let Some(number) = number else {
        return Err(ApiError::bad_request("missing parameter 'number'"));
    };
    let Some(base) = number.as_float() else {
        return Err(ApiError::bad_request("parameter 'number' is not numeric"));
    };
    let table = multiplication_table(base)?;

    Ok(TableResponse {
        message: format!("Multiplication table for {base} generated."),
        base,
        table,
    })
}

fn require_method(method: &Method, expected: &Method, action: &str) -> Result<(), ApiError> {
    if method == expected {
        Ok(())
    } else {
        Err(ApiError::MethodNotAllowed(format!(
            "action '{action}' requires {expected}"
        )))
    }
}

async fn dispatch(
    state: &AppState,
    method: &Method,
    Player(player): Player,
    request: DispatchRequest,
) -> Result<Response, ApiError> {
    let action = request.action.as_deref().unwrap_or_default();

    match request.exercise.as_deref() {
        None => Err(ApiError::bad_request("parameter 'exercise' is required")),
        Some("table") => match action {
            "generate" => {
                require_method(method, &Method::POST, action)?;
                Ok(Json(build_table(request.number)?).into_response())
            }
            _ => Err(ApiError::bad_request(format!(
                "invalid action '{action}' for exercise 'table'"
            ))),
        },
        Some("guess") => match action {
            "start" => {
                require_method(method, &Method::POST, action)?;
                start_game(state, player).await
            }
            "guess" => {
                require_method(method, &Method::POST, action)?;
                submit_guess(state, player, request.number).await
            }
            "status" => {
                require_method(method, &Method::GET, action)?;
                Ok(Json(game_status(state, player).await).into_response())
            }
            _ => Err(ApiError::bad_request(format!(
                "invalid action '{action}' for exercise 'guess'"
            ))),
        },
        Some(other) => Err(ApiError::NotFound(format!("unknown exercise '{other}'"))),
    }
}

// ============================================================================
// Tests
// ============================================================================
