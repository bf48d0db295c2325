use crate::api::votes::{get_all_votes, get_vote};
use crate::config::Config;
use crate::models::events::Event;
use crate::models::votes::{VoteStatus, VotingItem};
use crate::tally;
use crate::websocket::{run_websocket, WsHandle};
use crate::APP_STATE;

pub struct AppState {
    pub config: Config,
    pub server_address: String,
    pub vote_id: String,
    pub loaded: bool,
    pub title: String,
    pub description: Option<String>,
    pub status: Option<VoteStatus>,
    pub sms_number: Option<String>,
    pub participants: Vec<VotingItem>,
    pub connected: bool,
    pub status_message: String,
    pub logs: Vec<String>,
    pub ws_event_receiver: Option<std::sync::mpsc::Receiver<Event>>,
    pub ws_handle: Option<WsHandle>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let server_address = config.api_base_url.clone();
        Self {
            config,
            server_address,
            vote_id: String::new(),
            loaded: false,
            title: String::new(),
            description: None,
            status: None,
            sms_number: None,
            participants: Vec::new(),
            connected: false,
            status_message: "Idle".to_owned(),
            logs: Vec::new(),
            ws_event_receiver: None,
            ws_handle: None,
        }
    }

    pub fn load_voting(&mut self) {
        let client = reqwest::Client::new();
        let base_url = self.server_address.clone();
        let vote_id = self.vote_id.trim().to_owned();
        self.status_message = "Loading voting...".to_owned();

        std::thread::spawn(move || {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let result = if vote_id.is_empty() {
                rt.block_on(get_all_votes(&client, &base_url))
            } else {
                rt.block_on(get_vote(&client, &base_url, &vote_id))
            };

            match result {
                Ok(response) => {
                    {
                        let mut state = APP_STATE.lock().unwrap();
                        state.loaded = true;
                        match response.data {
                            Some(data) => {
                                state.participants = tally::rank(data.voting_items);
                                state.title = data.title;
                                state.description = data.description;
                                state.status = data.status;
                                state.sms_number = data.sms_number;
                                state.status_message = "Voting loaded.".to_owned();
                            }
                            None => {
                                state.participants = Vec::new();
                                state.status_message = "No voting published.".to_owned();
                            }
                        }
                    }
                    // Live updates only make sense once we know the short-code.
                    APP_STATE.lock().unwrap().start_live_updates();
                }
                Err(e) => {
                    let mut state = APP_STATE.lock().unwrap();
                    state.status_message = format!("Failed to load voting: {}", e);
                }
            }
        });
    }

    pub fn start_live_updates(&mut self) {
        // At most one live connection per short-code.
        if self.ws_handle.is_some() {
            return;
        }
        let sms_number = match &self.sms_number {
            Some(number) if !number.is_empty() => number.clone(),
            _ => return,
        };
        let sync = self.config.sync.clone();

        let (sender, receiver) = std::sync::mpsc::channel();
        self.ws_event_receiver = Some(receiver);

        let (handle, shutdown_rx) = WsHandle::new();
        self.ws_handle = Some(handle);

        std::thread::spawn(move || {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let result = rt.block_on(run_websocket(&sync, &sms_number, sender, shutdown_rx));

            if let Err(e) = result {
                let mut state = APP_STATE.lock().unwrap();
                state.connected = false;
                state.ws_handle = None;
                state.status_message = format!("WebSocket error: {}", e);
            }
        });
    }

    pub fn disconnect(&mut self) {
        if let Some(handle) = self.ws_handle.take() {
            handle.shutdown();
        }
        self.connected = false;
        self.status_message = "Disconnected".to_owned();
        self.logs.clear();
        self.ws_event_receiver = None;
    }

    /// Dev helper: dump a pile of votes onto the sixth entry to eyeball the
    /// re-ranking animation without a live feed.
    #[cfg(debug_assertions)]
    pub fn seed_votes(&mut self) {
        use crate::models::websocket::TallyEvent;

        if let Some(target) = self.participants.get(5).map(|item| item.id) {
            let items = std::mem::take(&mut self.participants);
            self.participants = tally::apply(
                items,
                &TallyEvent {
                    voting_item_id: target,
                    increment: 10_000,
                },
            );
        }
    }
}
