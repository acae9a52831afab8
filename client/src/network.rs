use crate::game::ClientGameState;
use crate::input::InputManager;
use crate::rendering::Renderer;
use crate::BoxError;
use log::{debug, info, warn};
use shared::{Connection, PlayerState, Record};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

pub struct Client<S> {
    connection: Connection<S>,
    game_state: ClientGameState,
    input_manager: InputManager,
    renderer: Renderer,
    /// Answer to the setter prompt; asked from the input when unset
    players: Option<u32>,
}

impl Client<TcpStream> {
    pub async fn connect(
        server_addr: &str,
        input_manager: InputManager,
        renderer: Renderer,
    ) -> Result<Self, BoxError> {
        info!("Connecting to {}...", server_addr);
        let stream = TcpStream::connect(server_addr).await?;
        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY: {}", e);
        }
        info!("Connected to {}", stream.peer_addr()?);

        Ok(Client::new(stream, input_manager, renderer))
    }
}

impl<S> Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, input_manager: InputManager, renderer: Renderer) -> Self {
        Self {
            connection: Connection::new(stream),
            game_state: ClientGameState::new(),
            input_manager,
            renderer,
            players: None,
        }
    }

    pub fn with_players(mut self, players: Option<u32>) -> Self {
        self.players = players;
        self
    }

    pub fn game_state(&self) -> &ClientGameState {
        &self.game_state
    }

    /// Plays one session to the end and returns the final role.
    pub async fn run(&mut self) -> Result<PlayerState, BoxError> {
        let mut record = self.connection.recv().await?;

        if record.player_state == PlayerState::Setter {
            record = self.configure_session().await?;
        }

        self.game_state.apply_opening(record);
        self.renderer.game_started(&self.game_state);

        while !self.game_state.is_over() {
            if self.game_state.is_my_turn() {
                self.renderer.turn_prompt(&self.game_state);
                let color = self.input_manager.pick_color(&self.game_state).await?;
                debug!("Sending color {}", color);
                self.connection.send(&Record::pick(color)).await?;
            }

            let update = self.connection.recv().await?;
            let result = self.game_state.apply_update(update);
            self.renderer.round_result(&self.game_state, result);
        }

        self.renderer.outcome(&self.game_state);
        let role = self.game_state.player_state();
        info!(
            "Session over as {:?}, sequence of {} colors",
            role,
            self.game_state.sequence().len()
        );

        if let Err(e) = self.connection.close().await {
            debug!("Error closing connection: {}", e);
        }
        Ok(role)
    }

    /// Answers the setter prompt and waits for the game to start.
    async fn configure_session(&mut self) -> Result<Record, BoxError> {
        let players = match self.players {
            Some(players) => players,
            None => {
                self.renderer.setter_prompt();
                self.input_manager.player_count().await?
            }
        };

        info!("Configuring session for {} players", players);
        self.connection.send(&Record::configure(players)).await?;
        self.renderer.waiting_for_players(players);

        // The server closes the connection when it rejects the count
        match self.connection.recv().await {
            Ok(record) => Ok(record),
            Err(e) => {
                warn!("Server did not accept {} players", players);
                Err(e.into())
            }
        }
    }
}
