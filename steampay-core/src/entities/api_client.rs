/// One integration account. Immutable reference data: the core only ever
/// reads these rows, they are provisioned out of band.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ApiAccount {
    pub api_login: String,
    pub api_key: String,
    /// Gateway endpoint used for payments created by this account.
    pub second_server_url: String,
    /// Routes the account's purchases to the sandbox table.
    pub test: bool,
}
