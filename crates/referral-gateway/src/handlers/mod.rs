mod health;
mod referral;
mod user;

pub use health::{health_handler, root_handler};
pub use referral::{generate_referral_handler, get_referral_handler};
pub use user::{login_handler, register_handler};
