pub mod admin;
pub mod attendance;
pub mod auth;
pub mod conversations;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod tasks;
pub mod users;

use std::sync::Arc;

use relevo_core::Core;
use relevo_db::Database;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub core: Core,
    pub jwt_secret: String,
}
