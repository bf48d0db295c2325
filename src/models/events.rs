use crate::models::websocket::TallyEvent;

#[derive(Debug)]
pub enum Event {
    ConnectionEstablished,
    ConnectionLost,
    Tally(TallyEvent),
}
