use std::io::{Error, ErrorKind};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use clap::Parser;
use log::{info, error};
use tokio::net::{TcpListener, TcpStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::protocol::Message;
use tictactoe_engine::{
    Control, Engine, GameConfig, MoveRequest, MoveResponse, ProtocolError, RuleViolation,
    SearchConfig, SearchOutcome, SearchRequest, SearchResponse, Session,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(long, default_value = "localhost")]
    host: String,
    #[arg(long, default_value_t = 999)]
    port: u16,
    #[arg(long, default_value = "info", value_parser = parse_level)]
    log_level: log::Level,
    /// Thinking time per computer turn when the game does not set one
    #[arg(long, default_value_t = 2000)]
    time_budget_ms: u64,
}

fn parse_level(text: &str) -> Result<log::Level, String> {
    text.parse().map_err(|_| format!("unknown log level: {}", text))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();
    simple_logger::init_with_level(args.log_level).map_err(|e| Error::new(ErrorKind::Other, e.to_string()))?;

    let address = format!("{}:{}", args.host, args.port);
    let time_budget = Duration::from_millis(args.time_budget_ms);

    let listener = TcpListener::bind(address.clone()).await?;
    info!("Listening on: {}", address);

    while let Ok((stream, _)) = listener.accept().await {
        tokio::spawn(async move {
            if let Err(e) = accept_connection(stream, time_budget).await {
                error!("Connection failed: {}", e);
            }
        });
    }

    Ok(())
}

struct Game {
    session: Option<Session>,
    time_budget: Duration,
}

impl Game {
    fn new(time_budget: Duration) -> Self {
        Self {
            session: None,
            time_budget,
        }
    }
}

type SharedGame = Arc<Mutex<Game>>;

fn lock(game: &SharedGame) -> Result<MutexGuard<'_, Game>, ProtocolError> {
    game.lock().map_err(|_| ProtocolError::Poisoned)
}

async fn accept_connection(stream: TcpStream, time_budget: Duration) -> Result<(), Error> {
    let addr = stream.peer_addr()?;
    info!("Peer address: {}", addr);

    let ws_stream = tokio_tungstenite::accept_async(stream)
        .await
        .map_err(|e| Error::new(ErrorKind::ConnectionAborted, e))?;
    info!("New WebSocket connection: {}", addr);

    let (mut write, mut read) = ws_stream.split();

    // one game per connection; messages are handled strictly in arrival order
    let game: SharedGame = Arc::new(Mutex::new(Game::new(time_budget)));

    while let Some(raw_message) = read.next().await {
        match raw_message {
            Ok(text_message) => {
                if !text_message.is_text() && !text_message.is_binary() { continue; }
                let response = match serde_json::from_slice::<Value>(&text_message.into_data()) {
                    Ok(data) => {
                        info!("Received: {}", data);
                        match handle_message(&game, data).await {
                            Ok(resp) => resp,
                            Err(e) => {
                                error!("Error handling message: {}", e);
                                json!({"error": e.to_string()})
                            }
                        }
                    },
                    Err(e) => {
                        error!("Error parsing JSON: {:?}", e);
                        json!({"error": ProtocolError::from(e).to_string()})
                    }
                };
                let response_str = response.to_string();
                if let Err(e) = write.send(Message::text(response_str.clone())).await {
                    error!("Failed to send message {}: {}", response_str, e);
                    break;
                }
                info!("Sent: {}", response_str);
            }
            Err(e) => { error!("Error reading websocket message: {:?}", e); }
        }
    }

    info!("Connection closed: {}", addr);
    Ok(())
}

async fn handle_message(game: &SharedGame, data: Value) -> Result<Value, ProtocolError> {
    let map = data.as_object().ok_or(ProtocolError::NotAnObject)?;

    // client message protocol: "start", "move", "reset", "state", "search"
    // server message protocol: "state", "moves", "search", "error"
    if let Some(config) = map.get("start") {
        let config: GameConfig = serde_json::from_value(config.clone())?;
        handle_start(game, config).await
    } else if let Some(request) = map.get("move") {
        let request: MoveRequest = serde_json::from_value(request.clone())?;
        handle_move(game, request).await
    } else if map.contains_key("reset") {
        reset_session(game)?;
        let moves = run_computer_turns(game).await?;
        state_reply(game, moves)
    } else if map.contains_key("state") {
        state_reply(game, Vec::new())
    } else if let Some(request) = map.get("search") {
        let request: SearchRequest = serde_json::from_value(request.clone())?;
        handle_search(game, request).await
    } else {
        Err(ProtocolError::UnknownMessage(data.to_string()))
    }
}

async fn handle_start(game: &SharedGame, config: GameConfig) -> Result<Value, ProtocolError> {
    let session = Session::new(config)?;
    lock(game)?.session = Some(session);
    let moves = run_computer_turns(game).await?;
    state_reply(game, moves)
}

async fn handle_move(game: &SharedGame, request: MoveRequest) -> Result<Value, ProtocolError> {
    let mut moves = vec![apply_human_move(game, &request)?];
    moves.extend(run_computer_turns(game).await?);
    state_reply(game, moves)
}

async fn handle_search(game: &SharedGame, request: SearchRequest) -> Result<Value, ProtocolError> {
    let default_budget = lock(game)?.time_budget;
    let mut config = request.into_config()?;
    if config.time_budget().is_none() {
        config = config.with_time_budget(Some(default_budget));
    }
    let searched = search(config).await?;
    Ok(json!({ "search": serde_json::to_value(SearchResponse::from(&searched))? }))
}

fn apply_human_move(game: &SharedGame, request: &MoveRequest) -> Result<MoveResponse, ProtocolError> {
    let mut game = lock(game)?;
    let session = game.session.as_mut().ok_or(ProtocolError::NoSession)?;
    let seat = session.current_player();
    if seat.control != Control::Human {
        return Err(RuleViolation::NotYourTurn(seat.symbol).into());
    }
    let symbol = seat.symbol;
    Ok(session.apply(symbol, request)?)
}

fn reset_session(game: &SharedGame) -> Result<(), ProtocolError> {
    let mut game = lock(game)?;
    game.session.as_mut().ok_or(ProtocolError::NoSession)?.reset();
    Ok(())
}

fn state_reply(game: &SharedGame, moves: Vec<MoveResponse>) -> Result<Value, ProtocolError> {
    let game = lock(game)?;
    let session = game.session.as_ref().ok_or(ProtocolError::NoSession)?;
    Ok(json!({
        "moves": serde_json::to_value(moves)?,
        "state": serde_json::to_value(session.state())?,
    }))
}

/// Plays computer seats until a human is to move or the game ends.
/// The lock is released while a search runs.
async fn run_computer_turns(game: &SharedGame) -> Result<Vec<MoveResponse>, ProtocolError> {
    let mut moves = Vec::new();
    while let Some(config) = next_search(game)? {
        let mover = config.mover();
        let searched = search(config).await?;
        info!(
            "{} plays {:?} (score {}, depth {}, {} nodes, {:?})",
            mover, searched.best_move, searched.best_score, searched.depth, searched.nodes, searched.elapsed
        );
        moves.push(apply_searched(game, &searched)?);
    }
    Ok(moves)
}

fn next_search(game: &SharedGame) -> Result<Option<SearchConfig>, ProtocolError> {
    let game = lock(game)?;
    let session = game.session.as_ref().ok_or(ProtocolError::NoSession)?;
    Ok(session.pending_search(Some(game.time_budget))?)
}

fn apply_searched(game: &SharedGame, searched: &SearchOutcome) -> Result<MoveResponse, ProtocolError> {
    let mut game = lock(game)?;
    let session = game.session.as_mut().ok_or(ProtocolError::NoSession)?;
    Ok(session.apply_search_outcome(searched)?)
}

async fn search(config: SearchConfig) -> Result<SearchOutcome, ProtocolError> {
    tokio::task::spawn_blocking(move || Engine::new().best_move(&config))
        .await
        .map_err(|e| ProtocolError::Task(e.to_string()))
}
