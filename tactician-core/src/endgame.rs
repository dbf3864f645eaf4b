//! Endgame training against a tablebase-backed opponent
//!
//! The user plays one side of a known-won (or known-lost) endgame; every
//! move is sent to a backend [`MoveService`] that rates it, reports the
//! distance to mate before and after, and answers with the opponent's move.
//! The opponent's move is shown after a short delay through the
//! [`ActionScheduler`], so navigation stays locked until it lands.

use crate::config::EndgameConfig;
use crate::error::{Error, Result};
use crate::moves_list::MoveAnnotationList;
use crate::rules::{RulesEngine, ShakmatyRules};
use crate::scheduler::ActionScheduler;
use crate::timeline::{MoveOutcome, Timeline};
use crate::types::{Annotation, MoveQuality, MoveRecord, MoveSpec, Side, TablebaseDistance};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::time::{Duration, Instant};

// ============================================
// Wire types
// ============================================

/// Opponent temperature: 0 plays randomly, infinity plays perfectly
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Beta(pub f64);

impl Beta {
    /// Map a difficulty in `[0, 1]` to `d / (1 - d)`.
    pub fn from_difficulty(difficulty: f64) -> Self {
        let d = difficulty.clamp(0.0, 1.0);
        if d >= 1.0 {
            Beta(f64::INFINITY)
        } else {
            Beta(d / (1.0 - d))
        }
    }
}

impl Serialize for Beta {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if self.0.is_infinite() {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_f64(self.0)
        }
    }
}

/// Body of `POST /endgame/move`
#[derive(Debug, Clone, Serialize)]
pub struct MoveRequest {
    /// Position before the user's move
    pub fen: String,
    #[serde(rename = "move")]
    pub uci: String,
    pub beta: Beta,
}

/// Reply to [`MoveRequest`]
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MoveReply {
    /// Position after the opponent's move
    pub fen: String,
    #[serde(default)]
    pub uci: Option<String>,
    #[serde(default)]
    pub san: Option<String>,
    /// Distance after the user's move
    #[serde(default)]
    pub previous_dtm: Option<i32>,
    /// Distance after the opponent's move
    #[serde(default)]
    pub current_dtm: Option<i32>,
    #[serde(default)]
    pub previous_rating: String,
    #[serde(default)]
    pub current_rating: String,
}

/// Body of `POST /endgame/start`
#[derive(Debug, Clone, Serialize)]
pub struct StudyRequest {
    pub layout: EndgameLayout,
    pub dtm: i32,
    /// `None` lets the server pick a side
    pub white: Option<bool>,
    /// Light-squared bishop; `None` for random
    pub bishop_color: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StudyReply {
    pub fen: String,
}

/// Material layouts the backend can generate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndgameLayout {
    KRvK,
    KQvK,
    KPvK,
    KRRvK,
    KBBvK,
    KBNvK,
}

impl EndgameLayout {
    pub const ALL: [EndgameLayout; 6] = [
        EndgameLayout::KRvK,
        EndgameLayout::KQvK,
        EndgameLayout::KPvK,
        EndgameLayout::KRRvK,
        EndgameLayout::KBBvK,
        EndgameLayout::KBNvK,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EndgameLayout::KRvK => "KRvK",
            EndgameLayout::KQvK => "KQvK",
            EndgameLayout::KPvK => "KPvK",
            EndgameLayout::KRRvK => "KRRvK",
            EndgameLayout::KBBvK => "KBBvK",
            EndgameLayout::KBNvK => "KBNvK",
        }
    }

    /// Longest forced mate, in moves, the layout allows
    pub fn max_mate_in(&self) -> u32 {
        match self {
            EndgameLayout::KRvK => 16,
            EndgameLayout::KQvK => 10,
            EndgameLayout::KPvK => 28,
            EndgameLayout::KRRvK => 7,
            EndgameLayout::KBBvK => 19,
            EndgameLayout::KBNvK => 33,
        }
    }

    /// Plies to mate for a mate in `mate_in`, capped by the layout
    pub fn dtm(&self, mate_in: u32) -> i32 {
        let mate_in = mate_in.clamp(1, self.max_mate_in());
        (2 * mate_in - 1) as i32
    }
}

impl FromStr for EndgameLayout {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        EndgameLayout::ALL
            .into_iter()
            .find(|layout| layout.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::Config(format!("unknown endgame layout: {}", s)))
    }
}

impl fmt::Display for EndgameLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================
// Move service
// ============================================

/// Backend that plays the opponent and rates the user's moves.
pub trait MoveService: Send + Sync {
    fn request_move(
        &self,
        request: &MoveRequest,
    ) -> impl Future<Output = Result<MoveReply>> + Send;

    fn start_study(
        &self,
        request: &StudyRequest,
    ) -> impl Future<Output = Result<StudyReply>> + Send;
}

/// [`MoveService`] over HTTP/JSON
pub struct HttpMoveService {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpMoveService {
    /// Returns an error if the configuration is invalid or missing required fields.
    pub fn new(config: &EndgameConfig) -> Result<Self> {
        config.validate()?;

        let base_url = config
            .server_url
            .clone()
            .ok_or_else(|| Error::Config("endgame.server_url is required".to_string()))?
            .trim_end_matches('/')
            .to_string();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .http_client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Service(format!("HTTP request failed: {}", e)))?;

        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| Error::Service(format!("failed to parse response: {}", e)))
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            Err(Error::Service(format!(
                "API error ({}): {}",
                status, error_text
            )))
        }
    }
}

impl MoveService for HttpMoveService {
    async fn request_move(&self, request: &MoveRequest) -> Result<MoveReply> {
        self.post("/endgame/move", request).await
    }

    async fn start_study(&self, request: &StudyRequest) -> Result<StudyReply> {
        self.post("/endgame/start", request).await
    }
}

// ============================================
// Session
// ============================================

/// Delayed effects of the endgame trainer
#[derive(Debug, Clone, PartialEq)]
pub enum EndgameAction {
    /// Show the opponent's answer from a backend reply
    PlayReply(MoveReply),
}

/// Result of [`EndgameSession::play`]
#[derive(Debug, Clone, PartialEq)]
pub enum PlayOutcome {
    /// Previous reply still pending
    Busy,
    /// Game over, or the opponent is to move
    NotYourTurn,
    Illegal,
    /// A newer request or a new study superseded this one; nothing changed
    Stale,
    Played {
        record: MoveRecord,
        /// Whether an opponent move is scheduled
        reply_pending: bool,
    },
}

/// Study parameters for [`EndgameSession::start`]
#[derive(Debug, Clone)]
pub struct StudyOptions {
    pub layout: EndgameLayout,
    pub mate_in: u32,
    pub white: Option<bool>,
    pub bishop_color: Option<bool>,
}

/// One endgame game against the backend
pub struct EndgameSession<M, R = ShakmatyRules> {
    service: M,
    timeline: Timeline<R>,
    moves: MoveAnnotationList,
    scheduler: ActionScheduler<EndgameAction>,
    player: Side,
    beta: Beta,
    delay: Duration,
}

impl<M: MoveService> EndgameSession<M, ShakmatyRules> {
    /// Ask the backend for a fresh study position and start from it.
    pub async fn start(service: M, options: &StudyOptions, config: &EndgameConfig) -> Result<Self> {
        let dtm = options.layout.dtm(options.mate_in);
        let request = StudyRequest {
            layout: options.layout,
            dtm,
            white: options.white,
            bishop_color: options.bishop_color,
        };
        let reply = service.start_study(&request).await?;
        tracing::info!(layout = %options.layout, dtm, fen = %reply.fen, "Endgame study started");

        Self::from_position(service, ShakmatyRules::new(), &reply.fen, Some(dtm), config)
    }
}

impl<M: MoveService, R: RulesEngine> EndgameSession<M, R> {
    /// Start from a known position. The user plays the side to move.
    pub fn from_position(
        service: M,
        rules: R,
        fen: &str,
        dtm: Option<i32>,
        config: &EndgameConfig,
    ) -> Result<Self> {
        let player = rules
            .side_to_move(fen)
            .ok_or_else(|| Error::Position(format!("invalid study position: {}", fen)))?;
        let root = dtm.map(|d| Annotation {
            tablebase: Some(TablebaseDistance(d)),
            ..Default::default()
        });

        Ok(Self {
            service,
            timeline: Timeline::new(rules, fen, root),
            moves: MoveAnnotationList::new(player == Side::Black),
            scheduler: ActionScheduler::new(),
            player,
            beta: Beta::from_difficulty(config.difficulty),
            delay: Duration::from_millis(config.delay_ms),
        })
    }

    /// Play the user's move: validate locally, ask the backend, commit.
    ///
    /// A service failure leaves the timeline untouched and is returned as
    /// `Err`; the session is no longer busy afterwards.
    pub async fn play(&mut self, spec: &MoveSpec) -> Result<PlayOutcome> {
        if self.scheduler.is_busy() {
            return Ok(PlayOutcome::Busy);
        }
        let position = self.timeline.position().to_string();
        let rules = self.timeline.rules();
        if rules.result(&position).is_some() || rules.side_to_move(&position) != Some(self.player) {
            return Ok(PlayOutcome::NotYourTurn);
        }
        let Some(applied) = rules.apply_move(&position, spec) else {
            return Ok(PlayOutcome::Illegal);
        };

        let request = MoveRequest {
            fen: position,
            uci: applied.record.uci.clone(),
            beta: self.beta,
        };
        let token = self.scheduler.begin_request();
        let reply = self.service.request_move(&request).await;
        let current = self.scheduler.finish_request(token);

        let reply = match reply {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(uci = %request.uci, error = %e, "Move service failed");
                return Err(e);
            }
        };
        if !current {
            tracing::debug!(uci = %request.uci, "Dropping stale move reply");
            return Ok(PlayOutcome::Stale);
        }

        let annotation = rated(&reply.previous_rating, reply.previous_dtm);
        let Some(record) = self.commit(spec, annotation) else {
            return Ok(PlayOutcome::Illegal);
        };

        let reply_pending = reply.uci.is_some();
        if reply_pending {
            self.scheduler
                .schedule(EndgameAction::PlayReply(reply), self.delay);
        }
        Ok(PlayOutcome::Played {
            record,
            reply_pending,
        })
    }

    /// Apply a due opponent move, if any.
    pub fn poll(&mut self, now: Instant) -> Option<MoveRecord> {
        let EndgameAction::PlayReply(reply) = self.scheduler.poll(now)?;
        let uci = reply.uci.as_deref()?;

        let Some(spec) = MoveSpec::parse_uci(uci) else {
            tracing::warn!(uci, "Backend replied with malformed move");
            return None;
        };
        let annotation = rated(&reply.current_rating, reply.current_dtm);
        let record = self.commit(&spec, annotation);
        match &record {
            Some(_) if self.timeline.position() != reply.fen => tracing::warn!(
                expected = %reply.fen,
                actual = %self.timeline.position(),
                "Backend position differs after its move"
            ),
            Some(_) => {}
            None => tracing::warn!(uci, "Backend replied with illegal move"),
        }
        record
    }

    fn commit(&mut self, spec: &MoveSpec, annotation: Annotation) -> Option<MoveRecord> {
        match self.timeline.advance(spec, Some(annotation.clone())) {
            MoveOutcome::Applied { index, record, .. } => {
                self.moves.truncate(index - 1);
                self.moves.add_move(&record.uci, &record.san, Some(annotation));
                Some(record)
            }
            MoveOutcome::Illegal => None,
        }
    }

    pub fn backward(&mut self) -> bool {
        !self.scheduler.is_busy() && self.timeline.retreat()
    }

    pub fn forward(&mut self) -> bool {
        !self.scheduler.is_busy() && self.timeline.replay_forward()
    }

    pub fn jump(&mut self, index: usize) -> bool {
        !self.scheduler.is_busy() && self.timeline.jump(index)
    }

    /// Mate counter for the current entry: the game result once over,
    /// otherwise the tablebase distance.
    pub fn mate_counter(&self) -> String {
        if let Some(result) = self.timeline.result() {
            return result.display().to_string();
        }
        self.timeline
            .current_entry()
            .annotation
            .as_ref()
            .and_then(|a| a.tablebase)
            .map(|d| d.mate_counter())
            .unwrap_or_else(|| "-".to_string())
    }

    pub fn is_busy(&self) -> bool {
        self.scheduler.is_busy()
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.scheduler.next_due()
    }

    pub fn player(&self) -> Side {
        self.player
    }

    pub fn timeline(&self) -> &Timeline<R> {
        &self.timeline
    }

    pub fn moves(&self) -> &MoveAnnotationList {
        &self.moves
    }
}

fn rated(rating: &str, dtm: Option<i32>) -> Annotation {
    let quality = rating.parse().unwrap_or(MoveQuality::None);
    Annotation {
        quality,
        tablebase: dtm.map(TablebaseDistance),
        ..Default::default()
    }
}
