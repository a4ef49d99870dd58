use std::sync::Arc;

use crate::{
    db::{DbPool, OrmConn},
    events::EventBus,
    notifications::SocketHub,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub events: Arc<EventBus>,
    pub sockets: SocketHub,
    pub restock_on_cancel: bool,
}

impl AppState {
    pub fn new(
        pool: DbPool,
        orm: OrmConn,
        events: EventBus,
        sockets: SocketHub,
        restock_on_cancel: bool,
    ) -> Self {
        Self {
            pool,
            orm,
            events: Arc::new(events),
            sockets,
            restock_on_cancel,
        }
    }
}
