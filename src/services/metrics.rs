use lazy_static::lazy_static;
use prometheus::{register_counter_vec, CounterVec};

lazy_static! {
    pub static ref LOGINS_COUNTER: CounterVec = register_counter_vec!(
        "api_logins_total",
        "Login attempts by status",
        &["status"]
    ).unwrap();

    pub static ref INVITATIONS_COUNTER: CounterVec = register_counter_vec!(
        "api_invitations_total",
        "Invitation requests by outcome",
        &["outcome"]
    ).unwrap();

    pub static ref INVITATION_ACCEPTS_COUNTER: CounterVec = register_counter_vec!(
        "api_invitation_accepts_total",
        "Invitation redemptions by outcome",
        &["outcome"]
    ).unwrap();
}

/// Label for an operation result: `ok`, or the failure's HTTP status code.
pub fn outcome<T>(res: &Result<T, crate::error::AuthError>) -> String {
    match res {
        Ok(_) => "ok".to_string(),
        Err(e) => e.status().as_u16().to_string(),
    }
}
