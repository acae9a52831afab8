//! Integration tests for the color recall server and client
//!
//! These tests run whole sessions across crate boundaries, over in-memory
//! pipes and over real TCP sockets.

use client::input::{BotInput, InputManager};
use client::network::Client;
use client::rendering::Renderer;
use server::lobby::{GameReport, Lobby};
use server::network::{Server, ServerConfig};
use shared::{Connection, GameState, PlayerState, Record, RECORD_SIZE};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::net::TcpStream;
use tokio::time::timeout;

const TEST_TIMEOUT: Duration = Duration::from_secs(10);

fn bot(stream: DuplexStream, seed: u64, mistake_rate: f64, players: u32) -> Client<DuplexStream> {
    Client::new(
        stream,
        InputManager::bot(BotInput::seeded(seed, mistake_rate, players)),
        Renderer::new(false),
    )
}

/// Admits in-memory connections in order, the first one as setter
async fn admit_all(lobby: &mut Lobby<DuplexStream>, server_ends: Vec<DuplexStream>) {
    for server_end in server_ends {
        lobby.admit(server_end).await.unwrap();
    }
}

async fn start_server(config: ServerConfig) -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let server = Server::bind(ServerConfig {
        addr: "127.0.0.1:0".to_string(),
        ..config
    })
    .await
    .unwrap();
    let addr = server.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        server.run().await.unwrap();
    });
    (addr, handle)
}

/// WIRE PROTOCOL TESTS
mod protocol_tests {
    use super::*;

    /// The setter prompt arrives as exactly one fixed-width record
    #[tokio::test]
    async fn setter_prompt_on_the_wire() {
        let (addr, _server) = start_server(ServerConfig {
            once: true,
            ..ServerConfig::default()
        })
        .await;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        let mut buffer = [0u8; RECORD_SIZE];
        timeout(TEST_TIMEOUT, stream.read_exact(&mut buffer))
            .await
            .unwrap()
            .unwrap();

        let mut expected = [0u8; RECORD_SIZE];
        expected[4] = 1; // player_state = Setter
        assert_eq!(buffer, expected);
        assert_eq!(shared::decode(&buffer).unwrap(), Record::setter_prompt());
    }

    /// A rejected setter is disconnected and the next connection is asked instead
    #[tokio::test]
    async fn invalid_setter_answer_is_rejected() {
        let (addr, server) = start_server(ServerConfig {
            max_players: 4,
            once: true,
            ..ServerConfig::default()
        })
        .await;

        let mut first = Connection::new(TcpStream::connect(addr).await.unwrap());
        assert_eq!(first.recv().await.unwrap().player_state, PlayerState::Setter);
        first.send(&Record::configure(0)).await.unwrap();
        assert!(timeout(TEST_TIMEOUT, first.recv()).await.unwrap().is_err());

        let mut second = Connection::new(TcpStream::connect(addr).await.unwrap());
        assert_eq!(
            second.recv().await.unwrap().player_state,
            PlayerState::Setter
        );
        second.send(&Record::configure(1)).await.unwrap();

        let opening = second.recv().await.unwrap();
        assert_eq!(opening.player_state, PlayerState::Active);
        assert_eq!(opening.game_state, GameState::Active);
        assert_eq!(opening.expected_players, 1);

        second.send(&Record::pick(2)).await.unwrap();
        second.recv().await.unwrap();
        second.send(&Record::pick(3)).await.unwrap();
        let last = second.recv().await.unwrap();
        assert_eq!(last.player_state, PlayerState::Eliminated);
        assert_eq!(last.game_state, GameState::Ended);

        timeout(TEST_TIMEOUT, server).await.unwrap().unwrap();
    }

    /// Half a record followed by a hang-up does not take the server down
    #[tokio::test]
    async fn truncated_setter_answer() {
        let (addr, server) = start_server(ServerConfig {
            once: true,
            ..ServerConfig::default()
        })
        .await;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        let mut buffer = [0u8; RECORD_SIZE];
        stream.read_exact(&mut buffer).await.unwrap();
        stream.write_all(&[1, 0, 0]).await.unwrap();
        drop(stream);

        let mut setter = Connection::new(TcpStream::connect(addr).await.unwrap());
        assert_eq!(
            setter.recv().await.unwrap().player_state,
            PlayerState::Setter
        );
        setter.send(&Record::configure(1)).await.unwrap();
        setter.recv().await.unwrap();
        setter.send(&Record::pick(0)).await.unwrap();
        assert!(setter.recv().await.unwrap().wrong_color);

        timeout(TEST_TIMEOUT, server).await.unwrap().unwrap();
    }
}

/// FULL SESSION TESTS OVER IN-MEMORY PIPES
mod session_tests {
    use super::*;

    /// Two players replay and extend in turn until one of them misses
    #[tokio::test]
    async fn scripted_two_player_game() {
        let mut lobby = Lobby::new(4);

        let (server_end, client_end) = duplex(256);
        let mut p0 = Connection::new(client_end);
        let setter = tokio::spawn(async move {
            p0.recv().await.unwrap();
            p0.send(&Record::configure(2)).await.unwrap();
            p0
        });
        lobby.admit(server_end).await.unwrap();
        let mut p0 = setter.await.unwrap();

        let (server_end, client_end) = duplex(256);
        let mut p1 = Connection::new(client_end);
        lobby.admit(server_end).await.unwrap();

        let game = tokio::spawn(lobby.into_game(None).unwrap().play());

        let opening = p0.recv().await.unwrap();
        assert_eq!(opening.player_state, PlayerState::Active);
        assert!(opening.new_color);
        assert_eq!(p1.recv().await.unwrap().player_state, PlayerState::Waiting);

        // p0 extends with 3, the turn passes
        p0.send(&Record::pick(3)).await.unwrap();
        for (client, role) in [(&mut p0, PlayerState::Waiting), (&mut p1, PlayerState::Active)] {
            let update = client.recv().await.unwrap();
            assert_eq!(update.color, 3);
            assert!(update.new_round);
            assert!(!update.new_color);
            assert_eq!(update.player_state, role);
        }

        // p1 replays 3, then may add a color
        p1.send(&Record::pick(3)).await.unwrap();
        for client in [&mut p0, &mut p1] {
            let update = client.recv().await.unwrap();
            assert!(!update.wrong_color);
            assert!(update.new_color);
            assert!(!update.new_round);
        }

        p1.send(&Record::pick(5)).await.unwrap();
        assert_eq!(p0.recv().await.unwrap().player_state, PlayerState::Active);
        assert_eq!(p1.recv().await.unwrap().player_state, PlayerState::Waiting);

        // p0 replays 3 correctly, then misses 5
        p0.send(&Record::pick(3)).await.unwrap();
        for client in [&mut p0, &mut p1] {
            let update = client.recv().await.unwrap();
            assert_eq!(update.color, 3);
            assert!(!update.new_color);
        }

        p0.send(&Record::pick(1)).await.unwrap();
        let lost = p0.recv().await.unwrap();
        assert!(lost.wrong_color);
        assert_eq!(lost.player_state, PlayerState::Eliminated);
        let won = p1.recv().await.unwrap();
        assert_eq!(won.player_state, PlayerState::Winner);
        assert_eq!(won.game_state, GameState::Ended);

        let report: GameReport = timeout(TEST_TIMEOUT, game).await.unwrap().unwrap();
        assert_eq!(report.winner, Some(1));
        assert_eq!(report.sequence, vec![3, 5]);
        assert_eq!(
            report.roles,
            vec![PlayerState::Eliminated, PlayerState::Winner]
        );
    }

    /// The only bot that never misses wins against two that always do
    #[tokio::test]
    async fn bots_play_to_a_winner() {
        let mut lobby = Lobby::new(8);
        let mut bots = Vec::new();
        let mut server_ends = Vec::new();

        for (seed, mistake_rate) in [(1, 0.0), (2, 1.0), (3, 1.0)] {
            let (server_end, client_end) = duplex(256);
            server_ends.push(server_end);
            let mut client = bot(client_end, seed, mistake_rate, 3);
            bots.push(tokio::spawn(async move { client.run().await.unwrap() }));
        }

        admit_all(&mut lobby, server_ends).await;
        let report = timeout(TEST_TIMEOUT, lobby.into_game(None).unwrap().play())
            .await
            .unwrap();

        assert_eq!(report.winner, Some(0));
        assert_eq!(report.sequence.len(), 1);
        assert_eq!(report.workers.len(), 3);
        assert!(report.workers.iter().all(|w| w.connected));

        let roles: Vec<_> = collect_roles(bots).await;
        assert_eq!(
            roles,
            vec![
                PlayerState::Winner,
                PlayerState::Eliminated,
                PlayerState::Eliminated
            ]
        );
    }

    /// A waiting player that hangs up is dropped without stalling the others
    #[tokio::test]
    async fn waiting_player_disconnects() {
        let mut lobby = Lobby::new(8);
        let mut server_ends = Vec::new();

        let (server_end, client_end) = duplex(256);
        server_ends.push(server_end);
        let mut winner = bot(client_end, 5, 0.0, 3);
        let winner = tokio::spawn(async move { winner.run().await.unwrap() });

        let (server_end, client_end) = duplex(256);
        server_ends.push(server_end);
        let mut loser = bot(client_end, 6, 1.0, 3);
        let loser = tokio::spawn(async move { loser.run().await.unwrap() });

        // third player leaves before the game starts
        let (server_end, client_end) = duplex(256);
        server_ends.push(server_end);
        drop(client_end);

        admit_all(&mut lobby, server_ends).await;
        let report = timeout(TEST_TIMEOUT, lobby.into_game(None).unwrap().play())
            .await
            .unwrap();

        assert_eq!(report.winner, Some(0));
        assert!(!report.workers[2].connected);
        assert_eq!(report.roles[2], PlayerState::Eliminated);
        assert_eq!(winner.await.unwrap(), PlayerState::Winner);
        assert_eq!(loser.await.unwrap(), PlayerState::Eliminated);
    }

    async fn collect_roles(
        handles: Vec<tokio::task::JoinHandle<PlayerState>>,
    ) -> Vec<PlayerState> {
        let mut roles = Vec::new();
        for handle in handles {
            roles.push(handle.await.unwrap());
        }
        roles
    }
}

/// CLIENT-SERVER TESTS OVER TCP
mod client_server_tests {
    use super::*;

    async fn tcp_bot(addr: SocketAddr, seed: u64, mistake_rate: f64, players: u32) -> Client<TcpStream> {
        let input = InputManager::bot(BotInput::seeded(seed, mistake_rate, players));
        Client::connect(&addr.to_string(), input, Renderer::new(false))
            .await
            .unwrap()
    }

    /// Bot clients play a full session against the real server
    #[tokio::test]
    async fn bots_over_tcp() {
        let (addr, server) = start_server(ServerConfig {
            once: true,
            ..ServerConfig::default()
        })
        .await;

        let mut handles = Vec::new();
        for (seed, mistake_rate) in [(10, 1.0), (11, 0.0), (12, 1.0)] {
            let mut client = tcp_bot(addr, seed, mistake_rate, 3).await;
            handles.push(tokio::spawn(async move { client.run().await.unwrap() }));
        }

        let mut roles = Vec::new();
        for handle in handles {
            roles.push(timeout(TEST_TIMEOUT, handle).await.unwrap().unwrap());
        }
        assert_eq!(
            roles,
            vec![
                PlayerState::Eliminated,
                PlayerState::Winner,
                PlayerState::Eliminated
            ]
        );

        timeout(TEST_TIMEOUT, server).await.unwrap().unwrap();
    }

    /// A solo session ends without a winner
    #[tokio::test]
    async fn solo_session_has_no_winner() {
        let (addr, server) = start_server(ServerConfig {
            once: true,
            ..ServerConfig::default()
        })
        .await;

        let mut client = tcp_bot(addr, 20, 1.0, 1).await;
        let role = timeout(TEST_TIMEOUT, client.run()).await.unwrap().unwrap();
        assert_eq!(role, PlayerState::Eliminated);
        assert_eq!(client.game_state().sequence().len(), 1);

        timeout(TEST_TIMEOUT, server).await.unwrap().unwrap();
    }

    /// A silent active player is eliminated when a turn timeout is set
    #[tokio::test]
    async fn silent_player_times_out() {
        let (addr, server) = start_server(ServerConfig {
            turn_timeout: Some(Duration::from_millis(100)),
            once: true,
            ..ServerConfig::default()
        })
        .await;

        let mut setter = Connection::new(TcpStream::connect(addr).await.unwrap());
        setter.recv().await.unwrap();
        setter.send(&Record::configure(2)).await.unwrap();

        let mut other = tcp_bot(addr, 30, 0.0, 2).await;
        let other = tokio::spawn(async move { other.run().await.unwrap() });

        // the setter moves first but never picks
        assert_eq!(
            setter.recv().await.unwrap().player_state,
            PlayerState::Active
        );
        let update = timeout(TEST_TIMEOUT, setter.recv()).await.unwrap().unwrap();
        assert!(update.wrong_color);
        assert_eq!(update.player_state, PlayerState::Eliminated);

        assert_eq!(
            timeout(TEST_TIMEOUT, other).await.unwrap().unwrap(),
            PlayerState::Winner
        );
        timeout(TEST_TIMEOUT, server).await.unwrap().unwrap();
    }
}

/// ROUND DELIVERY TESTS
mod delivery_tests {
    use super::*;
    use client::game::ClientGameState;
    use server::barrier::RoundBarrier;
    use server::session::Session;
    use server::worker::{PlayerWorker, WorkerReport};
    use shared::COLOR_COUNT;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    /// Plays from raw records and keeps every record received.
    ///
    /// The player replays correctly until the sequence reaches `forget_at`
    /// colors, then picks a wrong color on its next replay.
    async fn recording_player(
        mut connection: Connection<DuplexStream>,
        forget_at: usize,
        start_delay: Duration,
    ) -> Vec<Record> {
        tokio::time::sleep(start_delay).await;

        let mut game = ClientGameState::new();
        let opening = connection.recv().await.unwrap();
        let mut records = vec![opening];
        game.apply_opening(opening);

        while !game.is_over() {
            if game.is_my_turn() {
                let color = match game.next_expected() {
                    Some(expected) if game.sequence().len() >= forget_at => {
                        expected % COLOR_COUNT + 1
                    }
                    Some(expected) => expected,
                    None => game.sequence().len() as u32 % COLOR_COUNT + 1,
                };
                connection.send(&Record::pick(color)).await.unwrap();
            }

            let update = connection.recv().await.unwrap();
            records.push(update);
            game.apply_update(update);
        }
        records
    }

    /// Every client gets one record per round it took part in, and every
    /// client present in a round got the same round result.
    fn assert_every_round_delivered(records: &[Vec<Record>], workers: &[WorkerReport]) {
        for (received, report) in records.iter().zip(workers) {
            assert_eq!(
                received.len() as u64,
                report.rounds + 1,
                "player {} received {} records over {} rounds",
                report.player,
                received.len(),
                report.rounds
            );
        }

        let longest = records.iter().map(Vec::len).max().unwrap_or(0);
        for index in 1..longest {
            let round = index as u64 - 1;
            let present = workers.iter().filter(|w| w.rounds > round).count();
            let results: Vec<_> = records
                .iter()
                .filter_map(|received| received.get(index))
                .map(|r| (r.color, r.wrong_color, r.new_color, r.new_round, r.game_state))
                .collect();

            assert_eq!(results.len(), present, "round {}", round);
            assert!(
                results.windows(2).all(|pair| pair[0] == pair[1]),
                "round {} differs between clients: {:?}",
                round,
                results
            );
        }
    }

    const FORGET_AT: [usize; 3] = [usize::MAX, 3, 2];

    /// Clients that start reading late still get every round
    #[tokio::test]
    async fn records_per_round_with_slow_clients() {
        let mut lobby = Lobby::new(4);
        let mut players = Vec::new();

        for (id, forget_at) in FORGET_AT.into_iter().enumerate() {
            let (server_end, client_end) = duplex(1024);
            let mut connection = Connection::new(client_end);
            if id == 0 {
                let answer = tokio::spawn(async move {
                    connection.recv().await.unwrap();
                    connection.send(&Record::configure(3)).await.unwrap();
                    connection
                });
                lobby.admit(server_end).await.unwrap();
                connection = answer.await.unwrap();
            } else {
                lobby.admit(server_end).await.unwrap();
            }
            let delay = Duration::from_millis(30 * id as u64);
            players.push(tokio::spawn(recording_player(connection, forget_at, delay)));
        }

        let report = timeout(TEST_TIMEOUT, lobby.into_game(None).unwrap().play())
            .await
            .unwrap();

        let mut records = Vec::new();
        for player in players {
            records.push(player.await.unwrap());
        }

        assert_eq!(report.winner, Some(0));
        assert_eq!(report.sequence.len(), 3);
        assert_every_round_delivered(&records, &report.workers);
    }

    /// Workers that start after the first round was already played still
    /// deliver it, and nobody drives a round twice
    #[tokio::test]
    async fn records_per_round_with_staggered_workers() {
        let mut session = Session::new();
        session.register_player().unwrap();
        session.configure(3).unwrap();
        session.register_player().unwrap();
        session.register_player().unwrap();
        session.start().unwrap();

        let openings: Vec<Record> = (0..3).map(|id| session.snapshot_for(id).unwrap()).collect();
        let session = Arc::new(Mutex::new(session));
        let barrier = Arc::new(RoundBarrier::new(3));

        let mut workers = Vec::new();
        let mut players = Vec::new();
        for (id, opening) in openings.into_iter().enumerate() {
            let (server_end, client_end) = duplex(1024);
            workers.push(PlayerWorker::new(
                id,
                opening,
                Connection::new(server_end),
                Arc::clone(&session),
                Arc::clone(&barrier),
            ));
            players.push(tokio::spawn(recording_player(
                Connection::new(client_end),
                FORGET_AT[id],
                Duration::ZERO,
            )));
        }

        let mut handles = Vec::new();
        for worker in workers {
            handles.push(tokio::spawn(worker.run()));
            tokio::time::sleep(Duration::from_millis(40)).await;
        }

        let mut reports = Vec::new();
        for handle in handles {
            reports.push(timeout(TEST_TIMEOUT, handle).await.unwrap().unwrap().unwrap());
        }
        let mut records = Vec::new();
        for player in players {
            records.push(timeout(TEST_TIMEOUT, player).await.unwrap().unwrap());
        }

        assert_eq!(session.lock().await.winner(), Some(0));
        assert_eq!(reports[0].role, PlayerState::Winner);
        assert_every_round_delivered(&records, &reports);
    }
}
