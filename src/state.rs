use std::sync::Arc;

use crate::{db::OrmConn, notify::Notifier};

#[derive(Clone)]
pub struct AppState {
    pub orm: OrmConn,
    pub notifier: Arc<dyn Notifier>,
    pub jwt_secret: Arc<str>,
}
